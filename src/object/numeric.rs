//! Numeric value objects.
//!
//! Analog, Integer and Positive Integer objects share one shape: a present
//! value, its engineering units, a COV increment used for notification
//! hysteresis, and the bounds the present value must stay within.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{BacnetObject, EngineeringUnits, ObjectNode, ObjectType, PropertyIdentifier};
use crate::error::{BacnetError, Result};
use crate::property::{ApplicationTag, Property, PropertyData, PropertyValue, SingletProperty};

/// Rust type stored in a numeric present value.
pub trait NumericValue: Copy + PartialOrd + Default + Send + Sync + 'static {
    /// Tag of the present value and its bounds
    const TAG: ApplicationTag;
    /// Tag of COV_Increment
    const INCREMENT_TAG: ApplicationTag;
    const MIN: Self;
    const MAX: Self;

    fn to_value(self) -> PropertyValue;

    /// COV_Increment value for an increment of `increment`
    fn increment(increment: f64) -> PropertyValue;
}

impl NumericValue for f32 {
    const TAG: ApplicationTag = ApplicationTag::Real;
    const INCREMENT_TAG: ApplicationTag = ApplicationTag::Real;
    const MIN: Self = f32::MIN;
    const MAX: Self = f32::MAX;

    fn to_value(self) -> PropertyValue {
        PropertyValue::Real(self)
    }

    fn increment(increment: f64) -> PropertyValue {
        PropertyValue::Real(increment as f32)
    }
}

impl NumericValue for i32 {
    const TAG: ApplicationTag = ApplicationTag::SignedInt;
    const INCREMENT_TAG: ApplicationTag = ApplicationTag::UnsignedInt;
    const MIN: Self = i32::MIN;
    const MAX: Self = i32::MAX;

    fn to_value(self) -> PropertyValue {
        PropertyValue::SignedInt(self)
    }

    fn increment(increment: f64) -> PropertyValue {
        PropertyValue::UnsignedInteger(increment.max(0.0) as u32)
    }
}

impl NumericValue for u32 {
    const TAG: ApplicationTag = ApplicationTag::UnsignedInt;
    const INCREMENT_TAG: ApplicationTag = ApplicationTag::UnsignedInt;
    const MIN: Self = u32::MIN;
    const MAX: Self = u32::MAX;

    fn to_value(self) -> PropertyValue {
        PropertyValue::UnsignedInteger(self)
    }

    fn increment(increment: f64) -> PropertyValue {
        PropertyValue::UnsignedInteger(increment.max(0.0) as u32)
    }
}

/// Construction options of a numeric object
#[derive(Debug, Clone, PartialEq)]
pub struct NumericOptions<T> {
    pub name: String,
    pub units: EngineeringUnits,
    pub description: Option<String>,
    /// Whether the network may write the present value
    pub writable: bool,
    pub present_value: T,
    pub cov_increment: f64,
    pub min_present_value: T,
    pub max_present_value: T,
}

impl<T: NumericValue> NumericOptions<T> {
    pub fn new(name: impl Into<String>, units: EngineeringUnits) -> Self {
        Self {
            name: name.into(),
            units,
            description: None,
            writable: false,
            present_value: T::default(),
            cov_increment: 0.0,
            min_present_value: T::MIN,
            max_present_value: T::MAX,
        }
    }
}

/// Object with a bounded numeric present value
#[derive(Debug, Clone)]
pub struct NumericObject {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
    pub units: Arc<SingletProperty>,
    pub cov_increment: Arc<SingletProperty>,
    pub min_present_value: Arc<SingletProperty>,
    pub max_present_value: Arc<SingletProperty>,
}

impl NumericObject {
    pub fn new<T: NumericValue>(object_type: ObjectType, options: NumericOptions<T>) -> Result<Self> {
        let ordered = options.min_present_value.partial_cmp(&options.max_present_value);
        if !matches!(ordered, Some(Ordering::Less | Ordering::Equal)) {
            return Err(BacnetError::inconsistent_parameters(
                "minimum present value above maximum",
            ));
        }
        check_bounds(
            &PropertyData::Single(options.present_value.to_value()),
            (
                options.min_present_value.to_value().as_f64(),
                options.max_present_value.to_value().as_f64(),
            ),
        )?;
        let node = ObjectNode::new(object_type, options.name, options.description.as_deref());

        let present_value = node.add_property(SingletProperty::new(
            PropertyIdentifier::PresentValue,
            T::TAG,
            options.writable,
            options.present_value.to_value(),
        ));
        let units = node.add_property(SingletProperty::new(
            PropertyIdentifier::Units,
            ApplicationTag::Enumerated,
            false,
            PropertyValue::Enumerated(options.units.into()),
        ));
        let cov_increment = node.add_property(SingletProperty::new(
            PropertyIdentifier::CovIncrement,
            T::INCREMENT_TAG,
            true,
            T::increment(options.cov_increment),
        ));
        let max_present_value = node.add_property(SingletProperty::new(
            PropertyIdentifier::MaxPresValue,
            T::TAG,
            false,
            options.max_present_value.to_value(),
        ));
        let min_present_value = node.add_property(SingletProperty::new(
            PropertyIdentifier::MinPresValue,
            T::TAG,
            false,
            options.min_present_value.to_value(),
        ));

        let (min, max) = (min_present_value.clone(), max_present_value.clone());
        present_value.hooks().on_before_change(move |change| {
            let bounds = (min.value().as_f64(), max.value().as_f64());
            async move { check_bounds(&change.data, bounds) }
        });

        Ok(Self {
            node,
            present_value,
            units,
            cov_increment,
            min_present_value,
            max_present_value,
        })
    }
}

fn check_bounds(data: &PropertyData, (min, max): (Option<f64>, Option<f64>)) -> Result<()> {
    let Some(value) = data.as_f64() else {
        return Ok(());
    };
    if value.is_nan() {
        return Err(BacnetError::value_out_of_range("present value is NaN"));
    }
    if min.is_some_and(|min| value < min) || max.is_some_and(|max| value > max) {
        return Err(BacnetError::value_out_of_range(format!(
            "{value} outside [{}, {}]",
            min.unwrap_or(f64::MIN),
            max.unwrap_or(f64::MAX)
        )));
    }
    Ok(())
}

impl BacnetObject for NumericObject {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

/// Declares a typed numeric object around [`NumericObject`].
macro_rules! numeric_object {
    ($(#[$doc:meta])* $name:ident, $value:ty, $object_type:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name(NumericObject);

        impl $name {
            pub fn new(options: NumericOptions<$value>) -> Result<Self> {
                NumericObject::new(ObjectType::$object_type, options).map(Self)
            }
        }

        impl std::ops::Deref for $name {
            type Target = NumericObject;

            fn deref(&self) -> &NumericObject {
                &self.0
            }
        }

        impl BacnetObject for $name {
            fn node(&self) -> &ObjectNode {
                self.0.node()
            }
        }
    };
}

pub(crate) use numeric_object;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn setpoint() -> NumericObject {
        let mut options = NumericOptions::<f32>::new("Setpoint", EngineeringUnits::DegreesCelsius);
        options.writable = true;
        options.present_value = 21.0;
        options.cov_increment = 0.5;
        options.min_present_value = 10.0;
        options.max_present_value = 30.0;
        NumericObject::new(ObjectType::AnalogValue, options).unwrap()
    }

    #[tokio::test]
    async fn test_present_value_bounds() {
        let sp = setpoint();
        sp.present_value
            .write(PropertyData::Single(PropertyValue::Real(25.0)))
            .await
            .unwrap();

        let err = sp
            .present_value
            .write(PropertyData::Single(PropertyValue::Real(35.0)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);

        let err = sp.present_value.set_value(PropertyValue::Real(9.5)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);
        assert_eq!(sp.present_value.value(), PropertyValue::Real(25.0));
    }

    #[tokio::test]
    async fn test_nan_present_value_rejected() {
        let sp = setpoint();
        let err = sp
            .present_value
            .write(PropertyData::Single(PropertyValue::Real(f32::NAN)))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);

        let err = sp
            .present_value
            .set_value(PropertyValue::Real(f32::NAN))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);
        assert_eq!(sp.present_value.value(), PropertyValue::Real(21.0));

        // unbounded objects reject it too
        let mut options = NumericOptions::<f32>::new("Flow", EngineeringUnits::NoUnits);
        options.writable = true;
        let flow = NumericObject::new(ObjectType::AnalogValue, options).unwrap();
        let err = flow
            .present_value
            .set_value(PropertyValue::Real(f32::NAN))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_nan_options_rejected() {
        let mut options = NumericOptions::<f32>::new("Flow", EngineeringUnits::NoUnits);
        options.present_value = f32::NAN;
        let err = NumericObject::new(ObjectType::AnalogValue, options).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);

        let mut options = NumericOptions::<f32>::new("Flow", EngineeringUnits::NoUnits);
        options.max_present_value = f32::NAN;
        let err = NumericObject::new(ObjectType::AnalogValue, options).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InconsistentParameters);
    }

    #[test]
    fn test_cov_increment() {
        let sp = setpoint();
        assert_eq!(sp.node().cov_increment(), Some(0.5));
        assert_eq!(sp.units.value(), PropertyValue::Enumerated(62));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let mut options = NumericOptions::<i32>::new("Count", EngineeringUnits::NoUnits);
        options.min_present_value = 5;
        options.max_present_value = -5;
        let err = NumericObject::new(ObjectType::IntegerValue, options).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InconsistentParameters);
    }

    #[test]
    fn test_signed_increment_is_unsigned() {
        let mut options = NumericOptions::<i32>::new("Count", EngineeringUnits::NoUnits);
        options.cov_increment = 2.0;
        let count = NumericObject::new(ObjectType::IntegerValue, options).unwrap();
        assert_eq!(count.cov_increment.value(), PropertyValue::UnsignedInteger(2));
        assert_eq!(count.present_value.value_tag(), ApplicationTag::SignedInt);
    }
}
