//! Integer Value and Positive Integer Value objects.

use super::numeric::{numeric_object, NumericObject, NumericOptions};
use super::{BacnetObject, ObjectNode, ObjectType};
use crate::error::Result;

numeric_object!(
    /// Integer Value object, signed present value
    IntegerValue,
    i32,
    IntegerValue
);

numeric_object!(
    /// Positive Integer Value object, unsigned present value
    PositiveIntegerValue,
    u32,
    PositiveIntegerValue
);
