use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    read_index, AccessContext, ApplicationTag, Property, PropertyCore, PropertyData,
    PropertyHooks, PropertyShape, PropertyValue,
};
use crate::error::{BacnetError, Result};
use crate::object::{ObjectLink, PropertyIdentifier};
use crate::queue::TaskQueue;
use crate::BACNET_ARRAY_ALL;

/// Stored array property.
#[derive(Debug)]
pub struct ArrayProperty {
    core: PropertyCore,
    values: RwLock<Vec<PropertyValue>>,
}

impl ArrayProperty {
    pub fn new(
        identifier: PropertyIdentifier,
        tag: ApplicationTag,
        writable: bool,
        values: Vec<PropertyValue>,
    ) -> Self {
        Self {
            core: PropertyCore::new(identifier, tag, writable),
            values: RwLock::new(values),
        }
    }

    /// Array whose elements may also be Null, like a priority array.
    pub fn nullable(
        identifier: PropertyIdentifier,
        tag: ApplicationTag,
        writable: bool,
        values: Vec<PropertyValue>,
    ) -> Self {
        Self {
            core: PropertyCore::new(identifier, tag, writable).with_null(),
            values: RwLock::new(values),
        }
    }

    /// Current elements, read without queueing.
    pub fn values(&self) -> Vec<PropertyValue> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }

    /// Replaces the elements from the owning application, ignoring the
    /// network writability flag.
    pub async fn set_values(&self, values: Vec<PropertyValue>) -> Result<()> {
        self.core.queue().run(self.store(values)).await
    }

    async fn store(&self, values: Vec<PropertyValue>) -> Result<()> {
        for value in &values {
            self.core.check_tag(value)?;
        }
        self.core
            .commit(PropertyData::List(values), |data| {
                if let PropertyData::List(values) = data {
                    *self.values.write() = values.clone();
                }
            })
            .await
    }

    /// Copy of the elements with element `index` (1-based) replaced.
    fn replaced(&self, index: u32, value: PropertyValue) -> Result<Vec<PropertyValue>> {
        let mut values = self.values();
        let slot = values
            .get_mut(index as usize - 1)
            .ok_or_else(BacnetError::invalid_array_index)?;
        *slot = value;
        Ok(values)
    }
}

#[async_trait]
impl Property for ArrayProperty {
    fn identifier(&self) -> PropertyIdentifier {
        self.core.identifier()
    }

    fn shape(&self) -> PropertyShape {
        PropertyShape::Array
    }

    fn value_tag(&self) -> ApplicationTag {
        self.core.tag()
    }

    fn is_writable(&self) -> bool {
        self.core.writable()
    }

    fn hooks(&self) -> &PropertyHooks {
        self.core.hooks()
    }

    fn queue(&self) -> TaskQueue {
        self.core.queue()
    }

    fn set_queue(&self, queue: TaskQueue) {
        self.core.set_queue(queue)
    }

    fn attach(&self, link: Arc<ObjectLink>) {
        self.core.attach(link)
    }

    fn read_data(&self, index: Option<u32>, _ctx: &AccessContext) -> Result<PropertyData> {
        read_index(&self.values.read(), index)
    }

    async fn write_data(&self, data: PropertyData, index: Option<u32>) -> Result<()> {
        if !self.core.writable() {
            return Err(BacnetError::write_access_denied(format!(
                "{} is read-only",
                self.core.identifier()
            )));
        }
        match index {
            None | Some(BACNET_ARRAY_ALL) => self.store(data.into_list()).await,
            Some(0) => Err(BacnetError::write_access_denied(
                "array length cannot be written",
            )),
            Some(k) => {
                let value = match data {
                    PropertyData::Single(value) => value,
                    PropertyData::List(mut values) if values.len() == 1 => values.remove(0),
                    PropertyData::List(_) => {
                        return Err(BacnetError::write_access_denied(
                            "indexed write takes a single value",
                        ))
                    }
                };
                self.core.check_tag(&value)?;
                let values = self.replaced(k, value)?;
                self.store(values).await
            }
        }
    }
}

/// Supplier backing a [`PolledArrayProperty`].
pub type ArraySupplier = Arc<dyn Fn(&AccessContext) -> Vec<PropertyValue> + Send + Sync>;

/// Array property computed on every read.
pub struct PolledArrayProperty {
    core: PropertyCore,
    supplier: ArraySupplier,
}

impl PolledArrayProperty {
    pub fn new<F>(identifier: PropertyIdentifier, tag: ApplicationTag, supplier: F) -> Self
    where
        F: Fn(&AccessContext) -> Vec<PropertyValue> + Send + Sync + 'static,
    {
        Self {
            core: PropertyCore::new(identifier, tag, false),
            supplier: Arc::new(supplier),
        }
    }
}

impl std::fmt::Debug for PolledArrayProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolledArrayProperty")
            .field("identifier", &self.core.identifier())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Property for PolledArrayProperty {
    fn identifier(&self) -> PropertyIdentifier {
        self.core.identifier()
    }

    fn shape(&self) -> PropertyShape {
        PropertyShape::Array
    }

    fn value_tag(&self) -> ApplicationTag {
        self.core.tag()
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn hooks(&self) -> &PropertyHooks {
        self.core.hooks()
    }

    fn queue(&self) -> TaskQueue {
        self.core.queue()
    }

    fn set_queue(&self, queue: TaskQueue) {
        self.core.set_queue(queue)
    }

    fn attach(&self, link: Arc<ObjectLink>) {
        self.core.attach(link)
    }

    fn read_data(&self, index: Option<u32>, ctx: &AccessContext) -> Result<PropertyData> {
        read_index(&(self.supplier)(ctx), index)
    }

    async fn write_data(&self, _data: PropertyData, _index: Option<u32>) -> Result<()> {
        Err(BacnetError::write_access_denied(format!(
            "{} is computed on read",
            self.core.identifier()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn text(s: &str) -> PropertyValue {
        PropertyValue::CharacterString(s.to_string())
    }

    fn state_text(writable: bool) -> ArrayProperty {
        ArrayProperty::new(
            PropertyIdentifier::StateText,
            ApplicationTag::CharacterString,
            writable,
            vec![text("Off"), text("Low"), text("High")],
        )
    }

    #[tokio::test]
    async fn test_indexed_reads() {
        let prop = state_text(false);
        let ctx = AccessContext::now();
        assert_eq!(
            prop.read_indexed(0, &ctx).await.unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(3))
        );
        assert_eq!(
            prop.read_indexed(2, &ctx).await.unwrap(),
            PropertyData::Single(text("Low"))
        );
        assert_eq!(
            prop.read_indexed(BACNET_ARRAY_ALL, &ctx).await.unwrap(),
            PropertyData::List(vec![text("Off"), text("Low"), text("High")])
        );
        assert_eq!(
            prop.read_indexed(4, &ctx).await.unwrap_err().code(),
            ErrorCode::InvalidArrayIndex
        );
    }

    #[tokio::test]
    async fn test_indexed_write_replaces_element() {
        let prop = state_text(true);
        prop.write_data(PropertyData::Single(text("Medium")), Some(2))
            .await
            .unwrap();
        assert_eq!(prop.values(), vec![text("Off"), text("Medium"), text("High")]);

        let err = prop
            .write_data(PropertyData::Single(text("x")), Some(0))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::WriteAccessDenied);

        let err = prop
            .write_data(PropertyData::Single(text("x")), Some(4))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArrayIndex);
    }

    #[tokio::test]
    async fn test_whole_write_wraps_single_value() {
        let prop = state_text(true);
        prop.write(PropertyData::Single(text("Only"))).await.unwrap();
        assert_eq!(prop.values(), vec![text("Only")]);

        let err = prop
            .write(PropertyData::List(vec![text("a"), PropertyValue::Real(1.0)]))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDataType);
        assert_eq!(prop.len(), 1);
    }

    #[tokio::test]
    async fn test_nullable_elements() {
        let prop = ArrayProperty::nullable(
            PropertyIdentifier::PriorityArray,
            ApplicationTag::Real,
            true,
            vec![PropertyValue::Null; 4],
        );
        prop.write_data(PropertyData::Single(PropertyValue::Real(42.0)), Some(3))
            .await
            .unwrap();
        prop.write_data(PropertyData::Single(PropertyValue::Null), Some(3))
            .await
            .unwrap();
        assert_eq!(prop.values(), vec![PropertyValue::Null; 4]);

        let err = prop
            .write_data(PropertyData::Single(PropertyValue::Boolean(true)), Some(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDataType);

        // plain arrays still reject Null
        let err = state_text(true)
            .write_data(PropertyData::Single(PropertyValue::Null), Some(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidDataType);
    }

    #[tokio::test]
    async fn test_read_only_array() {
        let prop = state_text(false);
        let err = prop.write(PropertyData::List(vec![])).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::WriteAccessDenied);

        prop.set_values(vec![]).await.unwrap();
        assert!(prop.is_empty());
    }

    #[tokio::test]
    async fn test_polled_array() {
        let prop = PolledArrayProperty::new(
            PropertyIdentifier::ObjectList,
            ApplicationTag::ObjectIdentifier,
            |_| vec![PropertyValue::Null; 4],
        );
        let ctx = AccessContext::now();
        assert_eq!(
            prop.read_data(Some(0), &ctx).unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(4))
        );
        assert!(prop.write(PropertyData::List(vec![])).await.is_err());
    }
}
