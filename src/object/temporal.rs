//! Date Value, Time Value and DateTime Value objects.
//!
//! Each holds a writable-or-not present value initialized from the given
//! timestamp, or from the local clock when none is given.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};

use super::{BacnetObject, Date, ObjectNode, ObjectType, PropertyIdentifier, Time};
use crate::error::Result;
use crate::property::{ApplicationTag, PropertyValue, SingletProperty};

#[derive(Debug, Clone, Default)]
pub struct TemporalValueOptions {
    pub name: String,
    pub description: Option<String>,
    pub writable: bool,
    /// Initial value, the current local time when unset
    pub present_value: Option<NaiveDateTime>,
}

impl TemporalValueOptions {
    fn initial(&self) -> NaiveDateTime {
        self.present_value
            .unwrap_or_else(|| Local::now().naive_local())
    }
}

fn temporal_node(
    object_type: ObjectType,
    options: &TemporalValueOptions,
    tag: ApplicationTag,
    value: PropertyValue,
) -> (ObjectNode, Arc<SingletProperty>) {
    let node = ObjectNode::new(
        object_type,
        options.name.clone(),
        options.description.as_deref(),
    );
    let present_value = node.add_property(SingletProperty::new(
        PropertyIdentifier::PresentValue,
        tag,
        options.writable,
        value,
    ));
    (node, present_value)
}

/// Date Value object
#[derive(Debug, Clone)]
pub struct DateValue {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
}

impl DateValue {
    pub fn new(options: TemporalValueOptions) -> Self {
        let value = PropertyValue::Date(options.initial().into());
        let (node, present_value) =
            temporal_node(ObjectType::DateValue, &options, ApplicationTag::Date, value);
        Self {
            node,
            present_value,
        }
    }

    pub async fn set_date(&self, date: Date) -> Result<()> {
        self.present_value.set_value(PropertyValue::Date(date)).await
    }
}

/// Time Value object
#[derive(Debug, Clone)]
pub struct TimeValue {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
}

impl TimeValue {
    pub fn new(options: TemporalValueOptions) -> Self {
        let value = PropertyValue::Time(options.initial().into());
        let (node, present_value) =
            temporal_node(ObjectType::TimeValue, &options, ApplicationTag::Time, value);
        Self {
            node,
            present_value,
        }
    }

    pub async fn set_time(&self, time: Time) -> Result<()> {
        self.present_value.set_value(PropertyValue::Time(time)).await
    }
}

/// DateTime Value object
#[derive(Debug, Clone)]
pub struct DateTimeValue {
    node: ObjectNode,
    pub present_value: Arc<SingletProperty>,
}

impl DateTimeValue {
    pub fn new(options: TemporalValueOptions) -> Self {
        let initial = options.initial();
        let value = PropertyValue::DateTime(initial.into(), initial.into());
        let (node, present_value) = temporal_node(
            ObjectType::DateTimeValue,
            &options,
            ApplicationTag::DateTime,
            value,
        );
        Self {
            node,
            present_value,
        }
    }

    pub async fn set_date_time(&self, value: NaiveDateTime) -> Result<()> {
        self.present_value
            .set_value(PropertyValue::DateTime(value.into(), value.into()))
            .await
    }
}

impl BacnetObject for DateValue {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

impl BacnetObject for TimeValue {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

impl BacnetObject for DateTimeValue {
    fn node(&self) -> &ObjectNode {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_initial_values() {
        let options = TemporalValueOptions {
            name: "Commissioned".into(),
            present_value: Some(noon()),
            ..Default::default()
        };
        let date = DateValue::new(options.clone());
        assert_eq!(
            date.present_value.value(),
            PropertyValue::Date(Date {
                year: 2024,
                month: 3,
                day: 15,
                weekday: 5
            })
        );

        let time = TimeValue::new(options.clone());
        assert_eq!(
            time.present_value.value(),
            PropertyValue::Time(Time {
                hour: 12,
                minute: 30,
                second: 0,
                hundredths: 0
            })
        );

        let stamp = DateTimeValue::new(options);
        assert_eq!(stamp.node().object_type(), ObjectType::DateTimeValue);
        assert!(matches!(
            stamp.present_value.value(),
            PropertyValue::DateTime(d, _) if d.day == 15
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_tag() {
        let stamp = DateTimeValue::new(TemporalValueOptions {
            name: "Last Service".into(),
            ..Default::default()
        });
        stamp.set_date_time(noon()).await.unwrap();
        assert!(matches!(
            stamp.present_value.value(),
            PropertyValue::DateTime(_, t) if t.hour == 12
        ));

        let err = stamp
            .present_value
            .set_value(PropertyValue::Date(noon().into()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::InvalidDataType);
    }
}
