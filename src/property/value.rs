//! Property values and application tags.

use std::fmt;

use chrono::{DateTime, Local};

use crate::cov::CovSubscriptionRecord;
use crate::object::{Date, ObjectIdentifier, Time};

/// Application tag of a property value.
///
/// The primitive tags carry their wire number; `DateTime` and
/// `CovSubscription` are constructed values with no tag number of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplicationTag {
    Null,
    Boolean,
    UnsignedInt,
    SignedInt,
    Real,
    Double,
    OctetString,
    CharacterString,
    BitString,
    Enumerated,
    Date,
    Time,
    ObjectIdentifier,
    DateTime,
    CovSubscription,
}

impl ApplicationTag {
    /// Wire tag number, `None` for constructed values
    pub fn number(&self) -> Option<u8> {
        let number = match self {
            Self::Null => 0,
            Self::Boolean => 1,
            Self::UnsignedInt => 2,
            Self::SignedInt => 3,
            Self::Real => 4,
            Self::Double => 5,
            Self::OctetString => 6,
            Self::CharacterString => 7,
            Self::BitString => 8,
            Self::Enumerated => 9,
            Self::Date => 10,
            Self::Time => 11,
            Self::ObjectIdentifier => 12,
            Self::DateTime | Self::CovSubscription => return None,
        };
        Some(number)
    }
}

impl TryFrom<u8> for ApplicationTag {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::Boolean),
            2 => Ok(Self::UnsignedInt),
            3 => Ok(Self::SignedInt),
            4 => Ok(Self::Real),
            5 => Ok(Self::Double),
            6 => Ok(Self::OctetString),
            7 => Ok(Self::CharacterString),
            8 => Ok(Self::BitString),
            9 => Ok(Self::Enumerated),
            10 => Ok(Self::Date),
            11 => Ok(Self::Time),
            12 => Ok(Self::ObjectIdentifier),
            other => Err(other),
        }
    }
}

/// A single BACnet application value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    UnsignedInteger(u32),
    SignedInt(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString(Vec<bool>),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    DateTime(Date, Time),
    ObjectIdentifier(ObjectIdentifier),
    CovSubscription(CovSubscriptionRecord),
}

impl PropertyValue {
    pub fn tag(&self) -> ApplicationTag {
        match self {
            Self::Null => ApplicationTag::Null,
            Self::Boolean(_) => ApplicationTag::Boolean,
            Self::UnsignedInteger(_) => ApplicationTag::UnsignedInt,
            Self::SignedInt(_) => ApplicationTag::SignedInt,
            Self::Real(_) => ApplicationTag::Real,
            Self::Double(_) => ApplicationTag::Double,
            Self::OctetString(_) => ApplicationTag::OctetString,
            Self::CharacterString(_) => ApplicationTag::CharacterString,
            Self::BitString(_) => ApplicationTag::BitString,
            Self::Enumerated(_) => ApplicationTag::Enumerated,
            Self::Date(_) => ApplicationTag::Date,
            Self::Time(_) => ApplicationTag::Time,
            Self::DateTime(_, _) => ApplicationTag::DateTime,
            Self::ObjectIdentifier(_) => ApplicationTag::ObjectIdentifier,
            Self::CovSubscription(_) => ApplicationTag::CovSubscription,
        }
    }

    /// Check if this is a numeric value
    pub fn is_numeric(&self) -> bool {
        self.as_f64().is_some()
    }

    /// Get numeric value as f64 if possible
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real(f) => Some(*f as f64),
            Self::Double(d) => Some(*d),
            Self::UnsignedInteger(u) => Some(*u as f64),
            Self::SignedInt(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::UnsignedInteger(u) => write!(f, "{u}"),
            Self::SignedInt(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r:.2}"),
            Self::Double(d) => write!(f, "{d:.2}"),
            Self::OctetString(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            Self::CharacterString(s) => write!(f, "{s:?}"),
            Self::BitString(bits) => {
                let bits: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
                write!(f, "Bits({bits})")
            }
            Self::Enumerated(e) => write!(f, "Enum({e})"),
            Self::Date(d) => write!(f, "{:04}-{:02}-{:02}", d.year, d.month, d.day),
            Self::Time(t) => write!(
                f,
                "{:02}:{:02}:{:02}.{:02}",
                t.hour, t.minute, t.second, t.hundredths
            ),
            Self::DateTime(d, t) => write!(
                f,
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:02}",
                d.year, d.month, d.day, t.hour, t.minute, t.second, t.hundredths
            ),
            Self::ObjectIdentifier(id) => write!(f, "{id}"),
            Self::CovSubscription(sub) => write!(
                f,
                "Subscription({} pid {} -> {})",
                sub.recipient, sub.process_id, sub.monitored_object
            ),
        }
    }
}

/// Value carried by a property: a singlet holds one value, an array a list.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyData {
    Single(PropertyValue),
    List(Vec<PropertyValue>),
}

impl PropertyData {
    pub fn as_single(&self) -> Option<&PropertyValue> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[PropertyValue]> {
        match self {
            Self::Single(_) => None,
            Self::List(values) => Some(values),
        }
    }

    /// The values as a list, wrapping a single value.
    pub fn into_list(self) -> Vec<PropertyValue> {
        match self {
            Self::Single(value) => vec![value],
            Self::List(values) => values,
        }
    }

    /// Numeric view of a single value.
    pub fn as_f64(&self) -> Option<f64> {
        self.as_single().and_then(PropertyValue::as_f64)
    }
}

impl From<PropertyValue> for PropertyData {
    fn from(value: PropertyValue) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<PropertyValue>> for PropertyData {
    fn from(values: Vec<PropertyValue>) -> Self {
        Self::List(values)
    }
}

/// Context handed to polled properties when they are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessContext {
    pub time: DateTime<Local>,
}

impl AccessContext {
    pub fn now() -> Self {
        Self { time: Local::now() }
    }

    pub fn at(time: DateTime<Local>) -> Self {
        Self { time }
    }
}

impl Default for AccessContext {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_tags() {
        assert_eq!(PropertyValue::Real(1.0).tag(), ApplicationTag::Real);
        assert_eq!(
            PropertyValue::UnsignedInteger(1).tag(),
            ApplicationTag::UnsignedInt
        );
        assert_eq!(ApplicationTag::Enumerated.number(), Some(9));
        assert_eq!(ApplicationTag::DateTime.number(), None);
        assert_eq!(ApplicationTag::try_from(4), Ok(ApplicationTag::Real));
        assert_eq!(ApplicationTag::try_from(13), Err(13));
    }

    #[test]
    fn test_numeric_view() {
        assert_eq!(PropertyValue::SignedInt(-4).as_f64(), Some(-4.0));
        assert_eq!(PropertyValue::Enumerated(1).as_f64(), None);
        assert_eq!(PropertyData::Single(PropertyValue::Real(2.5)).as_f64(), Some(2.5));
        assert_eq!(PropertyData::List(vec![PropertyValue::Real(2.5)]).as_f64(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(PropertyValue::Real(21.456).to_string(), "21.46");
        assert_eq!(PropertyValue::OctetString(vec![0xde, 0xad]).to_string(), "0xdead");
        assert_eq!(PropertyValue::BitString(vec![true, false]).to_string(), "Bits(10)");
    }
}
