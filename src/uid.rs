//! Identity scheme.
//!
//! Objects and properties are looked up through compact scalar keys. An
//! [`ObjectUid`] is the 32-bit wire form of the object identifier (10 bits of
//! object type, 22 bits of instance) and a [`PropertyUid`] widens it to 64
//! bits with the property identifier in the low half, so no two distinct
//! (object, property) pairs can share a key.

use std::fmt;

use crate::error::{BacnetError, Result};
use crate::object::{ObjectIdentifier, PropertyIdentifier};
use crate::util::{encode_object_id, MAX_INSTANCE};

/// Lookup key of an object within a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectUid(u32);

/// Lookup key of a property of a given object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyUid(u64);

impl ObjectUid {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl PropertyUid {
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The object half of the key.
    pub fn object(&self) -> ObjectUid {
        ObjectUid((self.0 >> 32) as u32)
    }
}

impl fmt::Display for ObjectUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Display for PropertyUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Key of `identifier`.
///
/// Fails with `VALUE_OUT_OF_RANGE` for instance numbers above 4194303 and
/// object types that do not fit in 10 bits.
pub fn object_uid(identifier: &ObjectIdentifier) -> Result<ObjectUid> {
    let object_type: u16 = identifier.object_type.into();
    encode_object_id(object_type, identifier.instance)
        .map(ObjectUid)
        .ok_or_else(|| {
            BacnetError::value_out_of_range(format!(
                "object identifier {}:{} outside 0..={}",
                identifier.object_type, identifier.instance, MAX_INSTANCE
            ))
        })
}

/// Key of `property` on the object `identifier`.
pub fn property_uid(
    identifier: &ObjectIdentifier,
    property: PropertyIdentifier,
) -> Result<PropertyUid> {
    let object = object_uid(identifier)?;
    let property: u32 = property.into();
    Ok(PropertyUid(((object.0 as u64) << 32) | property as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use proptest::prelude::*;

    #[test]
    fn test_object_uid_rejects_out_of_range_instance() {
        let id = ObjectIdentifier::new(ObjectType::AnalogValue, MAX_INSTANCE + 1);
        assert!(object_uid(&id).is_err());

        let id = ObjectIdentifier::new(ObjectType::AnalogValue, MAX_INSTANCE);
        assert!(object_uid(&id).is_ok());
    }

    #[test]
    fn test_property_uid_contains_object_uid() {
        let id = ObjectIdentifier::new(ObjectType::Device, 1234);
        let key = property_uid(&id, PropertyIdentifier::ObjectList).unwrap();
        assert_eq!(key.object(), object_uid(&id).unwrap());
        assert_eq!(key.value() & 0xFFFF_FFFF, 76);
    }

    #[test]
    fn test_large_instances_do_not_collide() {
        // (type 0, instance 4_000_000) and (type 1, instance 0) are distinct
        let a = ObjectIdentifier::new(ObjectType::AnalogInput, 4_000_000);
        let b = ObjectIdentifier::new(ObjectType::AnalogOutput, 0);
        assert_ne!(object_uid(&a).unwrap(), object_uid(&b).unwrap());
    }

    proptest! {
        #[test]
        fn prop_object_uid_is_injective(
            t1 in 0u16..1024, i1 in 0u32..=MAX_INSTANCE,
            t2 in 0u16..1024, i2 in 0u32..=MAX_INSTANCE,
        ) {
            let a = ObjectIdentifier::new(ObjectType::from(t1), i1);
            let b = ObjectIdentifier::new(ObjectType::from(t2), i2);
            let equal_keys = object_uid(&a).unwrap() == object_uid(&b).unwrap();
            prop_assert_eq!(equal_keys, (t1, i1) == (t2, i2));
        }

        #[test]
        fn prop_property_uid_is_injective(
            i1 in 0u32..=MAX_INSTANCE, p1 in 0u32..=MAX_INSTANCE,
            i2 in 0u32..=MAX_INSTANCE, p2 in 0u32..=MAX_INSTANCE,
        ) {
            let a = ObjectIdentifier::new(ObjectType::AnalogValue, i1);
            let b = ObjectIdentifier::new(ObjectType::AnalogValue, i2);
            let ka = property_uid(&a, PropertyIdentifier::from(p1)).unwrap();
            let kb = property_uid(&b, PropertyIdentifier::from(p2)).unwrap();
            prop_assert_eq!(ka == kb, (i1, p1) == (i2, p2));
        }
    }
}
