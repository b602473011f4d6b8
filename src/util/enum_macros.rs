/// Generates an open BACnet enumeration.
///
/// BACnet enumerations such as object types, property identifiers, error
/// classes and error codes reserve a range of values for vendor extensions.
/// The generated enum therefore carries, besides the named standard values,
/// a `Custom` variant for values inside the proprietary range and a
/// `Reserved` variant for every other unnamed value. Conversions in both
/// directions are lossless.
///
/// # Arguments
///
/// * `$name` - name of the generated enum.
/// * `$variant = $value` - the named standard values (integer literals).
/// * `$unit` - the underlying integer type (`u16`, `u32`, ...).
/// * `$custom_range` - range of values available for proprietary extensions.
///
/// # Example
///
/// ```rust
/// use bacnet_device::generate_custom_enum;
///
/// generate_custom_enum! {
///     /// Fan speed stages.
///     FanStage {
///         Off = 0,
///         Low = 1,
///         High = 2,
///     },
///     u16,
///     256..=511
/// }
///
/// assert_eq!(u16::from(FanStage::High), 2);
/// assert_eq!(FanStage::from(1u16), FanStage::Low);
/// assert!(matches!(FanStage::from(300u16), FanStage::Custom(v) if v.value() == 300));
/// assert!(matches!(FanStage::from(12u16), FanStage::Reserved(v) if v.value() == 12));
/// assert_eq!(FanStage::Low.to_string(), "Low");
/// assert_eq!(FanStage::from(300u16).to_string(), "Custom(300)");
/// ```
///
/// # Generated items
///
/// * the enum itself, deriving `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`
///   and `Hash`,
/// * a `<Name>Value` newtype wrapping the raw value of `Custom`/`Reserved`,
/// * `Display` (variant name, `Custom(n)` or `Reserved(n)`),
/// * `From<Name> for unit` and `From<unit> for Name`,
/// * `Name::is_standard()`, true for the named variants.
#[macro_export]
macro_rules! generate_custom_enum {
    ($(#[$doc:meta])* $name:ident { $($(#[$vdoc:meta])* $variant:ident = $value:literal,)+ }, $unit:ident, $custom_range:expr) => {
        $crate::__private::paste! {
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $name {
                $($(#[$vdoc])* $variant,)*
                Custom( [<$name Value>] ),
                Reserved( [<$name Value>] ),
            }

            #[doc = concat!("Raw value of an unnamed [`", stringify!($name), "`].")]
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct [<$name Value>] { value: $unit }

            impl [<$name Value>] {
                fn new(value: $unit) -> Self {
                    Self { value }
                }

                pub fn value(&self) -> $unit {
                    self.value
                }
            }

            impl $name {
                /// Whether this is one of the named standard values.
                pub fn is_standard(&self) -> bool {
                    !matches!(self, $name::Custom(_) | $name::Reserved(_))
                }
            }

            impl std::fmt::Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    match self {
                        $($name::$variant => f.write_str(stringify!($variant)),)*
                        $name::Custom( value ) => write!(f, "Custom({})", value.value()),
                        $name::Reserved( value ) => write!(f, "Reserved({})", value.value()),
                    }
                }
            }

            impl From<$name> for $unit {
                fn from(value: $name) -> Self {
                    match value {
                        $($name::$variant => $value,)*
                        $name::Custom( value ) | $name::Reserved( value ) => value.value(),
                    }
                }
            }

            impl From<$unit> for $name {
                fn from(value: $unit) -> Self {
                    match value {
                        $($value => $name::$variant,)*
                        v if ($custom_range).contains(&v) => $name::Custom( [<$name Value>]::new(v) ),
                        v => $name::Reserved( [<$name Value>]::new(v) ),
                    }
                }
            }
        }
    };
}
