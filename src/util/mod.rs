//! Utility Functions Module
//!
//! Small helpers shared by the rest of the crate:
//!
//! - object identifier packing and instance validation
//! - local time helpers backing the device's time related properties
//! - the [`generate_custom_enum!`](crate::generate_custom_enum) macro
//!
//! # Example
//!
//! ```
//! use bacnet_device::util::{decode_object_id, encode_object_id, is_valid_instance_number};
//!
//! let packed = encode_object_id(8, 1234).unwrap();
//! assert_eq!(decode_object_id(packed), (8, 1234));
//! assert!(is_valid_instance_number(4_194_303));
//! assert!(!is_valid_instance_number(4_194_304));
//! ```

use chrono::{DateTime, Datelike, Offset, TimeZone};

pub mod enum_macros;

/// Highest instance number an object identifier can carry.
pub const MAX_INSTANCE: u32 = 0x3FFFFF;

/// Highest object type an object identifier can carry.
pub const MAX_OBJECT_TYPE: u16 = 0x3FF;

/// Check if an instance number fits the 22 bits of an object identifier
pub fn is_valid_instance_number(instance: u32) -> bool {
    instance <= MAX_INSTANCE
}

/// Convert object type and instance to object identifier (32-bit)
pub fn encode_object_id(object_type: u16, instance: u32) -> Option<u32> {
    if object_type > MAX_OBJECT_TYPE || instance > MAX_INSTANCE {
        return None;
    }
    Some(((object_type as u32) << 22) | instance)
}

/// Decode object identifier to object type and instance
pub fn decode_object_id(object_id: u32) -> (u16, u32) {
    let object_type = (object_id >> 22) as u16;
    let instance = object_id & MAX_INSTANCE;
    (object_type, instance)
}

/// Offset of `date`'s time zone from UTC in minutes, positive east of
/// Greenwich.
pub fn utc_offset_minutes<Tz: TimeZone>(date: &DateTime<Tz>) -> i32 {
    date.offset().fix().local_minus_utc() / 60
}

/// Whether daylight saving time is in effect at `date`.
///
/// The standard offset of a zone is the smaller of its offsets on the first
/// of January and the first of July of the same year; any larger offset means
/// the clocks have been moved forward.
pub fn is_dst_in_effect<Tz: TimeZone>(date: &DateTime<Tz>) -> bool {
    let zone = date.timezone();
    let year = date.year();
    let offset_at = |month: u32| {
        zone.with_ymd_and_hms(year, month, 1, 0, 0, 0)
            .earliest()
            .map(|d| utc_offset_minutes(&d))
    };
    match (offset_at(1), offset_at(7)) {
        (Some(january), Some(july)) => utc_offset_minutes(date) > january.min(july),
        _ => false,
    }
}
