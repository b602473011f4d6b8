//! Multi-state Value object.
//!
//! The present value is the 1-based index of the active state in State_Text.

use std::sync::Arc;

use super::{BacnetObject, ObjectNode, ObjectType, PropertyIdentifier};
use crate::error::{BacnetError, ErrorClass, ErrorCode, Result};
use crate::property::{
    ApplicationTag, PolledArrayProperty, PolledSingletProperty, Property, PropertyData,
    PropertyValue, SingletProperty,
};

#[derive(Debug, Clone, Default)]
pub struct MultiStateValueOptions {
    pub name: String,
    pub description: Option<String>,
    /// State texts, at least one
    pub states: Vec<String>,
    pub writable: bool,
    /// Initial state, 1 when unset
    pub present_value: Option<u32>,
}

/// Multi-state Value object
#[derive(Debug, Clone)]
pub struct MultiStateValue {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
    pub number_of_states: Arc<PolledSingletProperty>,
    pub state_text: Arc<PolledArrayProperty>,
}

fn state_out_of_range(state: u32, count: u32) -> BacnetError {
    BacnetError::new(
        format!("state {state} outside 1..={count}"),
        ErrorClass::Property,
        ErrorCode::InconsistentParameters,
    )
}

fn check_state(data: &PropertyData, count: u32) -> Result<()> {
    match data.as_single() {
        Some(PropertyValue::UnsignedInteger(state)) if (1..=count).contains(state) => Ok(()),
        Some(PropertyValue::UnsignedInteger(state)) => Err(state_out_of_range(*state, count)),
        _ => Ok(()),
    }
}

impl MultiStateValue {
    pub fn new(options: MultiStateValueOptions) -> Result<Self> {
        if options.states.is_empty() {
            return Err(BacnetError::inconsistent_parameters(
                "a multi-state value needs at least one state",
            ));
        }
        let count = options.states.len() as u32;
        let initial = options.present_value.unwrap_or(1);
        if !(1..=count).contains(&initial) {
            return Err(state_out_of_range(initial, count));
        }

        let node = ObjectNode::new(
            ObjectType::MultiStateValue,
            options.name,
            options.description.as_deref(),
        );
        let number_of_states = node.add_property(PolledSingletProperty::new(
            PropertyIdentifier::NumberOfStates,
            ApplicationTag::UnsignedInt,
            move |_| PropertyValue::UnsignedInteger(count),
        ));
        let texts: Vec<PropertyValue> = options
            .states
            .into_iter()
            .map(PropertyValue::CharacterString)
            .collect();
        let state_text = node.add_property(PolledArrayProperty::new(
            PropertyIdentifier::StateText,
            ApplicationTag::CharacterString,
            move |_| texts.clone(),
        ));
        let present_value = node.add_property(SingletProperty::new(
            PropertyIdentifier::PresentValue,
            ApplicationTag::UnsignedInt,
            options.writable,
            PropertyValue::UnsignedInteger(initial),
        ));
        present_value
            .hooks()
            .on_before_change(move |change| async move { check_state(&change.data, count) });

        Ok(Self {
            node,
            present_value,
            number_of_states,
            state_text,
        })
    }

    /// Active state, 1-based
    pub fn state(&self) -> u32 {
        match self.present_value.value() {
            PropertyValue::UnsignedInteger(state) => state,
            _ => 1,
        }
    }

    pub async fn set_state(&self, state: u32) -> Result<()> {
        self.present_value
            .set_value(PropertyValue::UnsignedInteger(state))
            .await
    }
}

impl BacnetObject for MultiStateValue {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}
