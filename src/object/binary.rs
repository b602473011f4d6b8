//! Binary Value object.

use std::sync::Arc;

use super::{BacnetObject, ObjectNode, ObjectType, PropertyIdentifier};
use crate::error::{BacnetError, Result};
use crate::property::{ApplicationTag, Property, PropertyValue, SingletProperty};

/// Binary values enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum BinaryPV {
    #[default]
    Inactive = 0,
    Active = 1,
}

impl From<bool> for BinaryPV {
    fn from(value: bool) -> Self {
        if value {
            BinaryPV::Active
        } else {
            BinaryPV::Inactive
        }
    }
}

impl From<BinaryPV> for bool {
    fn from(value: BinaryPV) -> Self {
        value == BinaryPV::Active
    }
}

impl From<BinaryPV> for PropertyValue {
    fn from(value: BinaryPV) -> Self {
        PropertyValue::Enumerated(value as u32)
    }
}

impl TryFrom<&PropertyValue> for BinaryPV {
    type Error = BacnetError;

    fn try_from(value: &PropertyValue) -> Result<Self> {
        match value {
            PropertyValue::Enumerated(0) => Ok(BinaryPV::Inactive),
            PropertyValue::Enumerated(1) => Ok(BinaryPV::Active),
            other => Err(BacnetError::value_out_of_range(format!(
                "not a binary value: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BinaryValueOptions {
    pub name: String,
    pub description: Option<String>,
    pub writable: bool,
    pub present_value: BinaryPV,
}

/// Binary Value object
#[derive(Debug, Clone)]
pub struct BinaryValue {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
}

impl BinaryValue {
    pub fn new(options: BinaryValueOptions) -> Self {
        let node = ObjectNode::new(
            ObjectType::BinaryValue,
            options.name,
            options.description.as_deref(),
        );
        let present_value = node.add_property(SingletProperty::new(
            PropertyIdentifier::PresentValue,
            ApplicationTag::Enumerated,
            options.writable,
            options.present_value.into(),
        ));
        present_value.hooks().on_before_change(|change| async move {
            match change.data.as_single() {
                Some(value) => BinaryPV::try_from(value).map(|_| ()),
                None => Ok(()),
            }
        });
        Self {
            node,
            present_value,
        }
    }

    /// Current state
    pub fn state(&self) -> BinaryPV {
        BinaryPV::try_from(&self.present_value.value()).unwrap_or_default()
    }

    pub async fn set_state(&self, state: BinaryPV) -> Result<()> {
        self.present_value.set_value(state.into()).await
    }
}

impl BacnetObject for BinaryValue {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[tokio::test]
    async fn test_binary_value_states() {
        let fan = BinaryValue::new(BinaryValueOptions {
            name: "Fan Enable".into(),
            writable: true,
            ..Default::default()
        });
        assert_eq!(fan.state(), BinaryPV::Inactive);

        fan.set_state(BinaryPV::Active).await.unwrap();
        assert_eq!(fan.state(), BinaryPV::Active);
        assert!(bool::from(fan.state()));

        let err = fan
            .present_value
            .set_value(PropertyValue::Enumerated(2))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);
        assert_eq!(fan.state(), BinaryPV::Active);
    }
}
