//! Per-device instance number allocation.

use std::collections::HashMap;

use crate::error::{BacnetError, ErrorClass, ErrorCode, Result};
use crate::object::{ObjectType, UNINITIALIZED_INSTANCE};

/// Hands out instance numbers per object type, starting at 1. Numbers are
/// never handed out twice, even after the object holding one is gone.
#[derive(Debug, Default)]
pub(crate) struct InstanceAllocator {
    next: HashMap<ObjectType, u32>,
}

impl InstanceAllocator {
    /// Next free instance of `object_type`, skipping the numbers for which
    /// `taken` returns true.
    pub(crate) fn next(
        &mut self,
        object_type: ObjectType,
        taken: impl Fn(u32) -> bool,
    ) -> Result<u32> {
        let next = self.next.entry(object_type).or_insert(1);
        while *next < UNINITIALIZED_INSTANCE {
            let instance = *next;
            *next += 1;
            if !taken(instance) {
                return Ok(instance);
            }
        }
        Err(BacnetError::new(
            format!("no instance left for {object_type}"),
            ErrorClass::Resources,
            ErrorCode::NoSpaceForObject,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instances_start_at_one_per_type() {
        let mut allocator = InstanceAllocator::default();
        let free = |_| false;
        assert_eq!(allocator.next(ObjectType::AnalogValue, free).unwrap(), 1);
        assert_eq!(allocator.next(ObjectType::AnalogValue, free).unwrap(), 2);
        assert_eq!(allocator.next(ObjectType::BinaryValue, free).unwrap(), 1);
        assert_eq!(allocator.next(ObjectType::AnalogValue, free).unwrap(), 3);
    }

    #[test]
    fn test_taken_instances_are_skipped() {
        let mut allocator = InstanceAllocator::default();
        assert_eq!(allocator.next(ObjectType::Device, |i| i == 1).unwrap(), 2);
        assert_eq!(allocator.next(ObjectType::Device, |_| false).unwrap(), 3);
    }

    #[test]
    fn test_exhaustion() {
        let mut allocator = InstanceAllocator::default();
        allocator
            .next
            .insert(ObjectType::AnalogValue, UNINITIALIZED_INSTANCE - 1);
        assert_eq!(
            allocator.next(ObjectType::AnalogValue, |_| false).unwrap(),
            UNINITIALIZED_INSTANCE - 1
        );
        let err = allocator.next(ObjectType::AnalogValue, |_| false).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoSpaceForObject);
    }
}
