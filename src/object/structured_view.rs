//! Structured View object.
//!
//! A structured view groups other objects of its device. Subordinates are
//! attached to the view's device when they are added, so a view must itself
//! be attached before it can take subordinates. Views may be nested, forming
//! a DAG rooted at the device's Structured_Object_List.

use std::sync::Arc;

use parking_lot::RwLock;

use super::{BacnetObject, ObjectIdentifier, ObjectNode, ObjectType, PropertyIdentifier};
use crate::error::{BacnetError, Result};
use crate::property::{
    ApplicationTag, PolledArrayProperty, PropertyValue, SingletProperty,
};

/// Node type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum NodeType {
    #[default]
    Unknown = 0,
    System = 1,
    Network = 2,
    Device = 3,
    Organizational = 4,
    Area = 5,
    Equipment = 6,
    Point = 7,
    Collection = 8,
    Property = 9,
    Functional = 10,
    Other = 11,
    Subsystem = 12,
    Building = 13,
    Floor = 14,
    Section = 15,
    Module = 16,
    Tree = 17,
    Member = 18,
    Protocol = 19,
    Room = 20,
    Zone = 21,
}

#[derive(Debug, Clone, Default)]
pub struct StructuredViewOptions {
    pub name: String,
    pub description: Option<String>,
    pub node_type: NodeType,
}

/// Structured View object
#[derive(Debug, Clone)]
pub struct StructuredView {
    node: ObjectNode,
    pub node_type: Arc<SingletProperty>,
    pub subordinate_list: Arc<PolledArrayProperty>,
    subordinates: Arc<RwLock<Vec<ObjectIdentifier>>>,
}

impl StructuredView {
    pub fn new(options: StructuredViewOptions) -> Self {
        let node = ObjectNode::new(
            ObjectType::StructuredView,
            options.name,
            options.description.as_deref(),
        );
        let node_type = node.add_property(SingletProperty::new(
            PropertyIdentifier::NodeType,
            ApplicationTag::Enumerated,
            false,
            PropertyValue::Enumerated(options.node_type as u32),
        ));
        let subordinates: Arc<RwLock<Vec<ObjectIdentifier>>> = Arc::default();
        let listed = subordinates.clone();
        let subordinate_list = node.add_property(PolledArrayProperty::new(
            PropertyIdentifier::SubordinateList,
            ApplicationTag::ObjectIdentifier,
            move |_| {
                listed
                    .read()
                    .iter()
                    .map(|id| PropertyValue::ObjectIdentifier(*id))
                    .collect()
            },
        ));
        Self {
            node,
            node_type,
            subordinate_list,
            subordinates,
        }
    }

    /// Adds `subordinate` to the view's device, unless it already belongs to
    /// it, and lists it in Subordinate_List.
    pub fn add_subordinate<O: BacnetObject>(&self, subordinate: O) -> Result<O> {
        if subordinate.node().ptr_eq(&self.node) {
            return Err(BacnetError::inconsistent_parameters(
                "a structured view cannot be its own subordinate",
            ));
        }
        let core = self
            .node
            .link()
            .device()
            .and_then(|handle| handle.upgrade())
            .ok_or_else(|| {
                BacnetError::inconsistent_parameters(format!(
                    "structured view {} is not attached to a device",
                    self.node.name()
                ))
            })?;
        let identifier = core.attach_object(subordinate.node())?;

        let mut subordinates = self.subordinates.write();
        if !subordinates.contains(&identifier) {
            subordinates.push(identifier);
        }
        Ok(subordinate)
    }

    /// Identifiers of the subordinates, in insertion order
    pub fn subordinates(&self) -> Vec<ObjectIdentifier> {
        self.subordinates.read().clone()
    }
}

impl BacnetObject for StructuredView {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_detached_view_rejects_subordinates() {
        let view = StructuredView::new(StructuredViewOptions {
            name: "Floor 1".into(),
            node_type: NodeType::Floor,
            ..Default::default()
        });
        let err = view
            .add_subordinate(ObjectNode::new(ObjectType::AnalogValue, "Temp", None))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InconsistentParameters);

        let err = view.add_subordinate(view.node().clone()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InconsistentParameters);
        assert_eq!(view.node_type.value(), PropertyValue::Enumerated(14));
    }
}
