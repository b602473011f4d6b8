//! CharacterString Value object.

use std::sync::Arc;

use super::{BacnetObject, ObjectNode, ObjectType, PropertyIdentifier};
use crate::error::Result;
use crate::property::{ApplicationTag, PropertyValue, SingletProperty};

#[derive(Debug, Clone, Default)]
pub struct CharacterStringValueOptions {
    pub name: String,
    pub description: Option<String>,
    pub writable: bool,
    pub present_value: String,
}

/// CharacterString Value object
#[derive(Debug, Clone)]
pub struct CharacterStringValue {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
}

impl CharacterStringValue {
    pub fn new(options: CharacterStringValueOptions) -> Self {
        let node = ObjectNode::new(
            ObjectType::CharacterStringValue,
            options.name,
            options.description.as_deref(),
        );
        let present_value = node.add_property(SingletProperty::new(
            PropertyIdentifier::PresentValue,
            ApplicationTag::CharacterString,
            options.writable,
            PropertyValue::CharacterString(options.present_value),
        ));
        Self {
            node,
            present_value,
        }
    }

    pub fn text(&self) -> String {
        match self.present_value.value() {
            PropertyValue::CharacterString(text) => text,
            _ => String::new(),
        }
    }

    pub async fn set_text(&self, text: impl Into<String>) -> Result<()> {
        self.present_value
            .set_value(PropertyValue::CharacterString(text.into()))
            .await
    }
}

impl BacnetObject for CharacterStringValue {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::{Property, PropertyData};

    #[tokio::test]
    async fn test_text_updates() {
        let status = CharacterStringValue::new(CharacterStringValueOptions {
            name: "Status Message".into(),
            present_value: "starting".into(),
            ..Default::default()
        });
        assert_eq!(status.text(), "starting");

        status.set_text("running").await.unwrap();
        assert_eq!(status.text(), "running");

        assert!(status
            .present_value
            .write(PropertyData::Single(PropertyValue::CharacterString("x".into())))
            .await
            .is_err());
    }
}
