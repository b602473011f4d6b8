//! Analog Object Types Implementation
//!
//! Analog Input, Analog Output and Analog Value objects represent continuous
//! values with a Real present value. Analog Output also carries the command
//! properties: a 16 level Priority_Array, Relinquish_Default and
//! Current_Command_Priority.
//!
//! ```rust
//! use bacnet_device::object::analog::AnalogValue;
//! use bacnet_device::object::numeric::NumericOptions;
//! use bacnet_device::object::EngineeringUnits;
//!
//! let mut options = NumericOptions::new("Zone Temp", EngineeringUnits::DegreesCelsius);
//! options.present_value = 21.5;
//! options.cov_increment = 0.5;
//! let zone = AnalogValue::new(options).unwrap();
//! assert_eq!(zone.present_value.value().as_f64(), Some(21.5));
//! ```

use std::sync::Arc;

use super::numeric::{numeric_object, NumericObject, NumericOptions};
use super::{BacnetObject, ObjectNode, ObjectType, PropertyIdentifier};
use crate::error::Result;
use crate::property::{ApplicationTag, ArrayProperty, PropertyValue, SingletProperty};

/// Number of levels in a command priority array
pub const PRIORITY_LEVELS: u32 = 16;

numeric_object!(
    /// Analog Input object
    AnalogInput,
    f32,
    AnalogInput
);

/// Analog Output object
#[derive(Debug, Clone)]
pub struct AnalogOutput {
    numeric: NumericObject,
    /// Commands by priority, all slots Null until commanded
    pub priority_array: Arc<ArrayProperty>,
    pub relinquish_default: Arc<SingletProperty>,
    pub current_command_priority: Arc<SingletProperty>,
}

impl AnalogOutput {
    pub fn new(options: NumericOptions<f32>) -> Result<Self> {
        let numeric = NumericObject::new(ObjectType::AnalogOutput, options)?;
        let node = numeric.node();

        let priority_array = node.add_property(ArrayProperty::nullable(
            PropertyIdentifier::PriorityArray,
            ApplicationTag::Real,
            false,
            vec![PropertyValue::Null; PRIORITY_LEVELS as usize],
        ));
        let relinquish_default = node.add_property(SingletProperty::new(
            PropertyIdentifier::RelinquishDefault,
            ApplicationTag::Real,
            false,
            PropertyValue::Real(0.0),
        ));
        let current_command_priority = node.add_property(SingletProperty::new(
            PropertyIdentifier::CurrentCommandPriority,
            ApplicationTag::UnsignedInt,
            false,
            PropertyValue::UnsignedInteger(PRIORITY_LEVELS),
        ));

        Ok(Self {
            numeric,
            priority_array,
            relinquish_default,
            current_command_priority,
        })
    }
}

impl std::ops::Deref for AnalogOutput {
    type Target = NumericObject;

    fn deref(&self) -> &NumericObject {
        &self.numeric
    }
}

impl BacnetObject for AnalogOutput {
    fn node(&self) -> &ObjectNode {
        self.numeric.node()
    }
}

numeric_object!(
    /// Analog Value object
    AnalogValue,
    f32,
    AnalogValue
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::object::EngineeringUnits;
    use crate::property::{AccessContext, Property, PropertyData};

    #[test]
    fn test_analog_types() {
        let options = NumericOptions::new("Valve", EngineeringUnits::Percent);
        let input = AnalogInput::new(options.clone()).unwrap();
        let output = AnalogOutput::new(options.clone()).unwrap();
        let value = AnalogValue::new(options).unwrap();
        assert_eq!(input.node().object_type(), ObjectType::AnalogInput);
        assert_eq!(output.node().object_type(), ObjectType::AnalogOutput);
        assert_eq!(value.node().object_type(), ObjectType::AnalogValue);
    }

    #[test]
    fn test_default_present_value() {
        let value = AnalogValue::new(NumericOptions::new("Flow", EngineeringUnits::NoUnits)).unwrap();
        assert_eq!(
            value
                .node()
                .read_property(PropertyIdentifier::PresentValue, None, &AccessContext::now())
                .unwrap(),
            PropertyData::Single(PropertyValue::Real(0.0))
        );
        assert!(!value.present_value.is_writable());
    }

    #[tokio::test]
    async fn test_output_command_properties() {
        let mut options = NumericOptions::new("Damper", EngineeringUnits::Percent);
        options.writable = true;
        let damper = AnalogOutput::new(options).unwrap();
        let node = damper.node();
        let ctx = AccessContext::now();

        assert_eq!(
            node.read_property(PropertyIdentifier::PriorityArray, Some(0), &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(16))
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::PriorityArray, Some(8), &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::Null)
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::CurrentCommandPriority, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(16))
        );
        assert_eq!(damper.relinquish_default.value(), PropertyValue::Real(0.0));
        assert_eq!(damper.priority_array.value_tag(), ApplicationTag::Real);

        let err = node
            .write_property(
                PropertyIdentifier::PriorityArray,
                PropertyData::Single(PropertyValue::Real(50.0)),
                Some(8),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WriteAccessDenied);

        // the numeric shape is unchanged
        damper
            .present_value
            .write(PropertyData::Single(PropertyValue::Real(75.0)))
            .await
            .unwrap();
        assert_eq!(damper.present_value.value(), PropertyValue::Real(75.0));
    }
}
