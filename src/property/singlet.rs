use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{
    check_singlet_index, AccessContext, ApplicationTag, Property, PropertyCore, PropertyData,
    PropertyHooks, PropertyShape, PropertyValue,
};
use crate::error::{BacnetError, Result};
use crate::object::{ObjectLink, PropertyIdentifier};
use crate::queue::TaskQueue;

/// Stored single-valued property.
#[derive(Debug)]
pub struct SingletProperty {
    core: PropertyCore,
    value: RwLock<PropertyValue>,
}

impl SingletProperty {
    pub fn new(
        identifier: PropertyIdentifier,
        tag: ApplicationTag,
        writable: bool,
        value: PropertyValue,
    ) -> Self {
        Self {
            core: PropertyCore::new(identifier, tag, writable),
            value: RwLock::new(value),
        }
    }

    /// Current value, read without queueing.
    pub fn value(&self) -> PropertyValue {
        self.value.read().clone()
    }

    /// Updates the value from the owning application.
    ///
    /// Runs through the queue and the change hooks but ignores the network
    /// writability flag.
    pub async fn set_value(&self, value: PropertyValue) -> Result<()> {
        self.core.queue().run(self.store(value)).await
    }

    async fn store(&self, value: PropertyValue) -> Result<()> {
        self.core.check_tag(&value)?;
        self.core
            .commit(PropertyData::Single(value), |data| {
                if let PropertyData::Single(value) = data {
                    *self.value.write() = value.clone();
                }
            })
            .await
    }
}

#[async_trait]
impl Property for SingletProperty {
    fn identifier(&self) -> PropertyIdentifier {
        self.core.identifier()
    }

    fn shape(&self) -> PropertyShape {
        PropertyShape::Singlet
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
        check_singlet_index(index)?;
        Ok(PropertyData::Single(self.value()))
    }

    async fn write_data(&self, data: PropertyData, index: Option<u32>) -> Result<()> {
        if !self.core.writable() {
            return Err(BacnetError::write_access_denied(format!(
                "{} is read-only",
                self.core.identifier()
            )));
        }
        check_singlet_index(index)?;
        let value = match data {
            PropertyData::Single(value) => value,
            PropertyData::List(mut values) if values.len() == 1 => values.remove(0),
            PropertyData::List(values) => {
                return Err(BacnetError::write_access_denied(format!(
                    "{} takes a single value, got {}",
                    self.core.identifier(),
                    values.len()
                )))
            }
        };
        self.store(value).await
    }
}

/// Supplier backing a [`PolledSingletProperty`].
pub type SingletSupplier = Arc<dyn Fn(&AccessContext) -> PropertyValue + Send + Sync>;

/// Single-valued property computed on every read.
pub struct PolledSingletProperty {
    core: PropertyCore,
    supplier: SingletSupplier,
}

impl PolledSingletProperty {
    pub fn new<F>(identifier: PropertyIdentifier, tag: ApplicationTag, supplier: F) -> Self
    where
        F: Fn(&AccessContext) -> PropertyValue + Send + Sync + 'static,
    {
        Self {
            core: PropertyCore::new(identifier, tag, false),
            supplier: Arc::new(supplier),
        }
    }
}

impl std::fmt::Debug for PolledSingletProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolledSingletProperty")
            .field("identifier", &self.core.identifier())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Property for PolledSingletProperty {
    fn identifier(&self) -> PropertyIdentifier {
        self.core.identifier()
    }

    fn shape(&self) -> PropertyShape {
        PropertyShape::Singlet
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
        check_singlet_index(index)?;
        Ok(PropertyData::Single((self.supplier)(ctx)))
    }

    async fn write_data(&self, _data: PropertyData, _index: Option<u32>) -> Result<()> {
        Err(BacnetError::write_access_denied(format!(
            "{} is computed on read",
            self.core.identifier()
        )))
    }
}
