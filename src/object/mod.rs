//! BACnet Objects
//!
//! This module holds the object side of the device runtime: the identifiers and
//! enumerations shared by every object, the [`ObjectNode`] that stores an
//! object's properties, the [`Device`](device::Device) root, and the concrete
//! value objects a device can expose.
//!
//! # Overview
//!
//! An object is created on its own, detached from any device, and then handed
//! to [`Device::add_object`](device::Device::add_object). Attaching an object
//! assigns its identifier (the next free instance number for its object type,
//! starting at 1), registers it in the device's Object_List, and links it to
//! the device so that committed property changes are forwarded to the COV
//! dispatcher.
//!
//! Every object carries the standard properties:
//!
//! - **Object_Identifier**: computed on read, reports instance 4194303 until attached
//! - **Object_Name** and **Object_Type**
//! - **Description**, when one was given
//! - **Property_List**: every property except Object_Identifier, Object_Name,
//!   Object_Type and Property_List itself
//!
//! # Value Objects
//!
//! - [`AnalogValue`](analog::AnalogValue), [`AnalogInput`](analog::AnalogInput),
//!   [`AnalogOutput`](analog::AnalogOutput): Real present value
//! - [`IntegerValue`](integer::IntegerValue) and
//!   [`PositiveIntegerValue`](integer::PositiveIntegerValue)
//! - [`BinaryValue`](binary::BinaryValue)
//! - [`MultiStateValue`](multistate::MultiStateValue)
//! - [`CharacterStringValue`](character_string::CharacterStringValue)
//! - [`DateValue`](temporal::DateValue), [`TimeValue`](temporal::TimeValue),
//!   [`DateTimeValue`](temporal::DateTimeValue)
//! - [`StructuredView`](structured_view::StructuredView) to organize the others
//!
//! # Examples
//!
//! ## Creating Object Identifiers
//!
//! ```rust
//! use bacnet_device::object::{ObjectIdentifier, ObjectType};
//!
//! // Analog value #1
//! let setpoint = ObjectIdentifier::new(ObjectType::AnalogValue, 1);
//! assert_eq!(setpoint.instance, 1);
//! assert!(setpoint.is_valid());
//!
//! // Round trip through the 32-bit wire form
//! let raw: u32 = setpoint.into();
//! assert_eq!(ObjectIdentifier::from(raw), setpoint);
//! ```
//!
//! ## Building a Custom Object
//!
//! ```rust
//! use bacnet_device::object::{BacnetObject, ObjectNode, ObjectType, PropertyIdentifier};
//! use bacnet_device::property::{ApplicationTag, PropertyValue, SingletProperty};
//!
//! struct Occupancy {
//!     node: ObjectNode,
//! }
//!
//! impl BacnetObject for Occupancy {
//!     fn node(&self) -> &ObjectNode {
//!         &self.node
//!     }
//! }
//!
//! let node = ObjectNode::new(ObjectType::BinaryValue, "Occupancy", None);
//! node.add_property(SingletProperty::new(
//!     PropertyIdentifier::PresentValue,
//!     ApplicationTag::Enumerated,
//!     true,
//!     PropertyValue::Enumerated(0),
//! ));
//! let occupancy = Occupancy { node };
//! assert!(occupancy.identifier().is_none());
//! ```

use std::fmt;

use bitflags::bitflags;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{BacnetError, Result};
use crate::util::MAX_INSTANCE;

pub mod analog;
pub mod binary;
pub mod character_string;
pub mod device;
mod engineering_units;
pub mod integer;
pub mod multistate;
mod node;
pub mod numeric;
mod object_type;
mod property_identifier;
pub mod structured_view;
pub mod temporal;

pub use engineering_units::{EngineeringUnits, EngineeringUnitsValue};
pub use node::{ObjectLink, ObjectNode};
pub use object_type::{ObjectType, ObjectTypeValue};
pub use property_identifier::{PropertyIdentifier, PropertyIdentifierValue};

pub(crate) use node::DeviceHandle;

/// Instance number reported by an object that is not attached to a device.
pub const UNINITIALIZED_INSTANCE: u32 = MAX_INSTANCE;

/// Object identifier (type + instance number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectIdentifier {
    pub object_type: ObjectType,
    pub instance: u32,
}

impl ObjectIdentifier {
    /// Create a new object identifier
    pub fn new(object_type: ObjectType, instance: u32) -> Self {
        Self {
            object_type,
            instance,
        }
    }

    /// Check if instance number is valid (0-4194303)
    pub fn is_valid(&self) -> bool {
        self.instance <= MAX_INSTANCE && u16::from(self.object_type) <= 0x3FF
    }
}

impl fmt::Display for ObjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object_type, self.instance)
    }
}

impl From<u32> for ObjectIdentifier {
    /// Convert from 32-bit object identifier.
    /// See clause 20.2.14 of the BACnet specification.
    fn from(value: u32) -> Self {
        let object_type = ((value >> 22) & 0x3FF) as u16;
        Self::new(object_type.into(), value & MAX_INSTANCE)
    }
}

impl From<ObjectIdentifier> for u32 {
    /// Convert to 32-bit object identifier.
    /// See clause 20.2.14 of the BACnet specification.
    fn from(value: ObjectIdentifier) -> Self {
        let object_type: u16 = value.object_type.into();
        ((object_type as u32) << 22) | (value.instance & MAX_INSTANCE)
    }
}

/// Trait for all BACnet objects
///
/// Objects are thin typed handles around an [`ObjectNode`]; the node owns the
/// properties and the link to the device.
pub trait BacnetObject: Send + Sync {
    fn node(&self) -> &ObjectNode;

    /// Identifier assigned when the object was attached to a device
    fn identifier(&self) -> Option<ObjectIdentifier> {
        self.node().identifier()
    }
}

impl BacnetObject for ObjectNode {
    fn node(&self) -> &ObjectNode {
        self
    }
}

/// BACnet date representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Date {
    pub year: u16,   // 1900-2155, 255 = unspecified
    pub month: u8,   // 1-12, 13 = odd months, 14 = even months, 255 = unspecified
    pub day: u8,     // 1-31, 32 = last day of month, 255 = unspecified
    pub weekday: u8, // 1-7 (Mon-Sun), 255 = unspecified
}

/// BACnet time representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Time {
    pub hour: u8,       // 0-23, 255 = unspecified
    pub minute: u8,     // 0-59, 255 = unspecified
    pub second: u8,     // 0-59, 255 = unspecified
    pub hundredths: u8, // 0-99, 255 = unspecified
}

impl From<NaiveDate> for Date {
    fn from(value: NaiveDate) -> Self {
        Self {
            year: value.year().clamp(0, u16::MAX as i32) as u16,
            month: value.month() as u8,
            day: value.day() as u8,
            weekday: value.weekday().number_from_monday() as u8,
        }
    }
}

impl From<NaiveTime> for Time {
    fn from(value: NaiveTime) -> Self {
        Self {
            hour: value.hour() as u8,
            minute: value.minute() as u8,
            second: value.second() as u8,
            // leap seconds report up to 1999 ms
            hundredths: (value.nanosecond() / 10_000_000).min(99) as u8,
        }
    }
}

impl From<NaiveDateTime> for Date {
    fn from(value: NaiveDateTime) -> Self {
        value.date().into()
    }
}

impl From<NaiveDateTime> for Time {
    fn from(value: NaiveDateTime) -> Self {
        value.time().into()
    }
}

/// Device status enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceStatus {
    Operational = 0,
    OperationalReadOnly = 1,
    DownloadRequired = 2,
    DownloadInProgress = 3,
    NonOperational = 4,
    BackupInProgress = 5,
}

/// Segmentation support enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[repr(u32)]
pub enum Segmentation {
    #[default]
    Both = 0,
    Transmit = 1,
    Receive = 2,
    NoSegmentation = 3,
}

impl TryFrom<u32> for Segmentation {
    type Error = BacnetError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            0 => Ok(Self::Both),
            1 => Ok(Self::Transmit),
            2 => Ok(Self::Receive),
            3 => Ok(Self::NoSegmentation),
            _ => Err(BacnetError::value_out_of_range(format!(
                "unknown segmentation: {value}"
            ))),
        }
    }
}

impl fmt::Display for Segmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Both => write!(f, "Both"),
            Self::Transmit => write!(f, "Transmit"),
            Self::Receive => write!(f, "Receive"),
            Self::NoSegmentation => write!(f, "None"),
        }
    }
}

/// Expands a flag set into the BACnet bit string of its defined bits.
fn flag_bits(bits: u128, all: u128) -> Vec<bool> {
    let len = (128 - all.leading_zeros()) as usize;
    (0..len).map(|i| bits & (1u128 << i) != 0).collect()
}

bitflags! {
    /// Protocol services supported bitfield
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct ProtocolServicesSupported: u64 {
        const ACKNOWLEDGE_ALARM = 1 << 0;
        const CONFIRMED_COV_NOTIFICATION = 1 << 1;
        const CONFIRMED_EVENT_NOTIFICATION = 1 << 2;
        const GET_ALARM_SUMMARY = 1 << 3;
        const GET_ENROLLMENT_SUMMARY = 1 << 4;
        const SUBSCRIBE_COV = 1 << 5;
        const ATOMIC_READ_FILE = 1 << 6;
        const ATOMIC_WRITE_FILE = 1 << 7;
        const ADD_LIST_ELEMENT = 1 << 8;
        const REMOVE_LIST_ELEMENT = 1 << 9;
        const CREATE_OBJECT = 1 << 10;
        const DELETE_OBJECT = 1 << 11;
        const READ_PROPERTY = 1 << 12;
        const READ_PROPERTY_CONDITIONAL = 1 << 13;
        const READ_PROPERTY_MULTIPLE = 1 << 14;
        const WRITE_PROPERTY = 1 << 15;
        const WRITE_PROPERTY_MULTIPLE = 1 << 16;
        const DEVICE_COMMUNICATION_CONTROL = 1 << 17;
        const CONFIRMED_PRIVATE_TRANSFER = 1 << 18;
        const CONFIRMED_TEXT_MESSAGE = 1 << 19;
        const REINITIALIZE_DEVICE = 1 << 20;
        const VT_OPEN = 1 << 21;
        const VT_CLOSE = 1 << 22;
        const VT_DATA = 1 << 23;
        const I_AM = 1 << 26;
        const I_HAVE = 1 << 27;
        const UNCONFIRMED_COV_NOTIFICATION = 1 << 28;
        const UNCONFIRMED_EVENT_NOTIFICATION = 1 << 29;
        const UNCONFIRMED_PRIVATE_TRANSFER = 1 << 30;
        const UNCONFIRMED_TEXT_MESSAGE = 1 << 31;
        const TIME_SYNCHRONIZATION = 1 << 32;
        const WHO_HAS = 1 << 33;
        const WHO_IS = 1 << 34;
        const READ_RANGE = 1 << 35;
        const UTC_TIME_SYNCHRONIZATION = 1 << 36;
        const LIFE_SAFETY_OPERATION = 1 << 37;
        const SUBSCRIBE_COV_PROPERTY = 1 << 38;
        const GET_EVENT_INFORMATION = 1 << 39;
        const WRITE_GROUP = 1 << 40;
        const SUBSCRIBE_COV_PROPERTY_MULTIPLE = 1 << 41;
        const CONFIRMED_COV_NOTIFICATION_MULTIPLE = 1 << 42;
        const UNCONFIRMED_COV_NOTIFICATION_MULTIPLE = 1 << 43;
        const CONFIRMED_AUDIT_NOTIFICATION = 1 << 44;
        const AUDIT_LOG_QUERY = 1 << 45;
        const UNCONFIRMED_AUDIT_NOTIFICATION = 1 << 46;
        const WHO_AM_I = 1 << 47;
        const YOU_ARE = 1 << 48;
        const AUTH_REQUEST = 1 << 49;
    }
}

impl ProtocolServicesSupported {
    /// Services this runtime answers
    pub fn device_runtime() -> Self {
        Self::WHO_IS
            | Self::I_AM
            | Self::READ_PROPERTY
            | Self::READ_PROPERTY_MULTIPLE
            | Self::WRITE_PROPERTY
            | Self::SUBSCRIBE_COV
            | Self::CONFIRMED_COV_NOTIFICATION
            | Self::UNCONFIRMED_COV_NOTIFICATION
    }

    pub fn to_bool_vec(&self) -> Vec<bool> {
        flag_bits(self.bits() as u128, Self::all().bits() as u128)
    }
}

bitflags! {
    /// Protocol object types supported bitfield, one bit per object type
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct ObjectTypesSupported: u128 {
        const ANALOG_INPUT = 1 << 0;
        const ANALOG_OUTPUT = 1 << 1;
        const ANALOG_VALUE = 1 << 2;
        const BINARY_INPUT = 1 << 3;
        const BINARY_OUTPUT = 1 << 4;
        const BINARY_VALUE = 1 << 5;
        const DEVICE = 1 << 8;
        const MULTI_STATE_VALUE = 1 << 19;
        const STRUCTURED_VIEW = 1 << 29;
        const CHARACTERSTRING_VALUE = 1 << 40;
        const DATE_VALUE = 1 << 42;
        const DATETIME_VALUE = 1 << 44;
        const INTEGER_VALUE = 1 << 45;
        const POSITIVE_INTEGER_VALUE = 1 << 48;
        const TIME_VALUE = 1 << 50;
        const COLOR_TEMPERATURE = 1 << 64;
    }
}

impl ObjectTypesSupported {
    /// Object types this crate provides an implementation for
    pub fn device_runtime() -> Self {
        Self::ANALOG_INPUT
            | Self::ANALOG_OUTPUT
            | Self::ANALOG_VALUE
            | Self::BINARY_VALUE
            | Self::DEVICE
            | Self::MULTI_STATE_VALUE
            | Self::STRUCTURED_VIEW
            | Self::CHARACTERSTRING_VALUE
            | Self::DATE_VALUE
            | Self::DATETIME_VALUE
            | Self::INTEGER_VALUE
            | Self::POSITIVE_INTEGER_VALUE
            | Self::TIME_VALUE
    }

    /// Bit string covering every standard object type (0..=64)
    pub fn to_bool_vec(&self) -> Vec<bool> {
        flag_bits(self.bits(), Self::all().bits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_identifier_wire_form() {
        let id = ObjectIdentifier::new(ObjectType::Device, 123);
        let raw: u32 = id.into();
        assert_eq!(raw, (8 << 22) | 123);
        assert_eq!(ObjectIdentifier::from(raw), id);
        assert_eq!(id.to_string(), "Device:123");
    }

    #[test]
    fn test_date_time_from_chrono() {
        // 2024-03-14 was a Thursday
        let date = NaiveDate::from_ymd_opt(2024, 3, 14).unwrap();
        let date = Date::from(date);
        assert_eq!((date.year, date.month, date.day, date.weekday), (2024, 3, 14, 4));

        let time = NaiveTime::from_hms_milli_opt(13, 5, 9, 870).unwrap();
        let time = Time::from(time);
        assert_eq!((time.hour, time.minute, time.second, time.hundredths), (13, 5, 9, 87));
    }

    #[test]
    fn test_services_bit_string() {
        let bits = ProtocolServicesSupported::device_runtime().to_bool_vec();
        assert_eq!(bits.len(), 50);
        assert!(bits[12] && bits[14] && bits[15] && bits[34]);
        assert!(!bits[33]);
    }

    #[test]
    fn test_object_types_bit_string() {
        let bits = ObjectTypesSupported::device_runtime().to_bool_vec();
        assert_eq!(bits.len(), 65);
        assert!(bits[8] && bits[29] && bits[45]);
        assert!(!bits[64]);
    }

    #[test]
    fn test_segmentation_conversion() {
        assert_eq!(Segmentation::try_from(3).unwrap(), Segmentation::NoSegmentation);
        assert!(Segmentation::try_from(9).is_err());
        assert_eq!(Segmentation::default().to_string(), "Both");
    }
}
