//! Property Model
//!
//! Properties come in two shapes and two storage kinds:
//!
//! | | stored | computed on read |
//! |---|---|---|
//! | **singlet** | [`SingletProperty`] | [`PolledSingletProperty`] |
//! | **array** | [`ArrayProperty`] | [`PolledArrayProperty`] |
//!
//! Stored properties hold their value and may be writable from the network.
//! Polled properties call a supplier with an [`AccessContext`] on every read
//! and reject every write.
//!
//! # Access paths
//!
//! [`Property::read`], [`Property::read_indexed`] and [`Property::write`] are
//! the consumer facing operations: they run inside the property's
//! [`TaskQueue`](crate::queue::TaskQueue) so they never interleave with other
//! queued work on the same object. [`Property::read_data`] and
//! [`Property::write_data`] are the network facing operations used by request
//! handlers that already run inside the queue. Both paths run the same change
//! hooks.
//!
//! # Array indices
//!
//! For an array holding `[v1..vn]`: no index or [`BACNET_ARRAY_ALL`] selects
//! the whole list, index 0 yields `n`, index `k` in `1..=n` yields `vk`, and
//! anything else fails with `INVALID_ARRAY_INDEX`. Singlets accept no index
//! other than [`BACNET_ARRAY_ALL`].
//!
//! ```rust
//! use bacnet_device::object::PropertyIdentifier;
//! use bacnet_device::property::{
//!     AccessContext, ApplicationTag, ArrayProperty, Property, PropertyData, PropertyValue,
//! };
//!
//! let states = ArrayProperty::new(
//!     PropertyIdentifier::StateText,
//!     ApplicationTag::CharacterString,
//!     false,
//!     vec![
//!         PropertyValue::CharacterString("Off".into()),
//!         PropertyValue::CharacterString("On".into()),
//!     ],
//! );
//! let ctx = AccessContext::now();
//! assert_eq!(
//!     states.read_data(Some(0), &ctx).unwrap(),
//!     PropertyData::Single(PropertyValue::UnsignedInteger(2))
//! );
//! assert!(states.read_data(Some(3), &ctx).is_err());
//! ```

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{BacnetError, Result};
use crate::object::{ObjectLink, PropertyIdentifier};
use crate::queue::TaskQueue;
use crate::BACNET_ARRAY_ALL;

mod array;
mod hooks;
mod singlet;
mod value;

pub use array::{ArrayProperty, ArraySupplier, PolledArrayProperty};
pub use hooks::{PropertyChange, PropertyHooks};
pub use singlet::{PolledSingletProperty, SingletProperty, SingletSupplier};
pub use value::{AccessContext, ApplicationTag, PropertyData, PropertyValue};

/// Whether a property holds one value or an array of values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyShape {
    Singlet,
    Array,
}

/// A property of a BACnet object
#[async_trait]
pub trait Property: Send + Sync {
    fn identifier(&self) -> PropertyIdentifier;

    fn shape(&self) -> PropertyShape;

    /// Application tag of the value, or of every element for arrays
    fn value_tag(&self) -> ApplicationTag;

    /// Whether the network may write this property
    fn is_writable(&self) -> bool;

    fn hooks(&self) -> &PropertyHooks;

    fn queue(&self) -> TaskQueue;

    fn set_queue(&self, queue: TaskQueue);

    /// Links the property to its owning object. Only the first call has an
    /// effect.
    fn attach(&self, link: Arc<ObjectLink>);

    /// Reads the value without going through the queue.
    fn read_data(&self, index: Option<u32>, ctx: &AccessContext) -> Result<PropertyData>;

    /// Writes the value without going through the queue, honoring
    /// writability, tag validation and the change hooks.
    async fn write_data(&self, data: PropertyData, index: Option<u32>) -> Result<()>;

    async fn read(&self, ctx: &AccessContext) -> Result<PropertyData> {
        self.queue().run(async { self.read_data(None, ctx) }).await
    }

    async fn read_indexed(&self, index: u32, ctx: &AccessContext) -> Result<PropertyData> {
        self.queue()
            .run(async { self.read_data(Some(index), ctx) })
            .await
    }

    async fn write(&self, data: PropertyData) -> Result<()> {
        self.queue().run(self.write_data(data, None)).await
    }
}

/// State shared by every property variant.
#[derive(Debug)]
pub(crate) struct PropertyCore {
    identifier: PropertyIdentifier,
    tag: ApplicationTag,
    /// Null is accepted alongside `tag`
    nullable: bool,
    writable: bool,
    hooks: PropertyHooks,
    queue: RwLock<TaskQueue>,
    link: OnceLock<Arc<ObjectLink>>,
}

impl PropertyCore {
    pub(crate) fn new(identifier: PropertyIdentifier, tag: ApplicationTag, writable: bool) -> Self {
        Self {
            identifier,
            tag,
            nullable: false,
            writable,
            hooks: PropertyHooks::default(),
            queue: RwLock::new(TaskQueue::new()),
            link: OnceLock::new(),
        }
    }

    pub(crate) fn with_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub(crate) fn identifier(&self) -> PropertyIdentifier {
        self.identifier
    }

    pub(crate) fn tag(&self) -> ApplicationTag {
        self.tag
    }

    pub(crate) fn writable(&self) -> bool {
        self.writable
    }

    pub(crate) fn hooks(&self) -> &PropertyHooks {
        &self.hooks
    }

    pub(crate) fn queue(&self) -> TaskQueue {
        self.queue.read().clone()
    }

    pub(crate) fn set_queue(&self, queue: TaskQueue) {
        *self.queue.write() = queue;
    }

    pub(crate) fn attach(&self, link: Arc<ObjectLink>) {
        let _ = self.link.set(link);
    }

    pub(crate) fn check_tag(&self, value: &PropertyValue) -> Result<()> {
        if value.tag() == self.tag || (self.nullable && value.tag() == ApplicationTag::Null) {
            Ok(())
        } else {
            Err(BacnetError::invalid_data_type(format!(
                "{} expects {:?}, got {:?}",
                self.identifier,
                self.tag,
                value.tag()
            )))
        }
    }

    /// Runs the before hooks, stores the value, runs the after hooks and
    /// forwards the change to the owning object.
    pub(crate) async fn commit<F>(&self, data: PropertyData, store: F) -> Result<()>
    where
        F: FnOnce(&PropertyData) + Send,
    {
        let change = PropertyChange {
            object: self.link.get().and_then(|link| link.identifier()),
            property: self.identifier,
            data,
        };
        self.hooks.run_before(&change).await?;
        store(&change.data);
        self.hooks.run_after(&change).await;
        if let Some(link) = self.link.get() {
            link.notify(self.identifier, change.data);
        }
        Ok(())
    }
}

/// Singlets only accept the whole-array index.
pub(crate) fn check_singlet_index(index: Option<u32>) -> Result<()> {
    match index {
        None | Some(BACNET_ARRAY_ALL) => Ok(()),
        Some(_) => Err(BacnetError::not_an_array()),
    }
}

/// Applies the array index semantics to `values`.
pub(crate) fn read_index(values: &[PropertyValue], index: Option<u32>) -> Result<PropertyData> {
    match index {
        None | Some(BACNET_ARRAY_ALL) => Ok(PropertyData::List(values.to_vec())),
        Some(0) => Ok(PropertyData::Single(PropertyValue::UnsignedInteger(
            values.len() as u32,
        ))),
        Some(k) => values
            .get(k as usize - 1)
            .cloned()
            .map(PropertyData::Single)
            .ok_or_else(BacnetError::invalid_array_index),
    }
}
