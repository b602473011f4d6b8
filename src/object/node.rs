//! Object base: the property container shared by every object type.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::RwLock;

use super::device::DeviceCore;
use super::{ObjectIdentifier, ObjectType, PropertyIdentifier, UNINITIALIZED_INSTANCE};
use crate::cov::QueuedCov;
use crate::error::{BacnetError, Result};
use crate::property::{
    AccessContext, ApplicationTag, PolledArrayProperty, PolledSingletProperty, Property,
    PropertyData, PropertyValue, SingletProperty,
};
use crate::queue::TaskQueue;
use crate::service::{PropertyReference, ReadResult};

/// Non-owning reference from an object to the device it is attached to.
#[derive(Debug, Clone)]
pub(crate) struct DeviceHandle {
    core: Weak<DeviceCore>,
    device: ObjectIdentifier,
}

impl DeviceHandle {
    pub(crate) fn new(core: Weak<DeviceCore>, device: ObjectIdentifier) -> Self {
        Self { core, device }
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<DeviceCore>> {
        self.core.upgrade()
    }

    pub(crate) fn device(&self) -> ObjectIdentifier {
        self.device
    }

    /// Whether this handle points at `core`.
    pub(crate) fn belongs_to(&self, core: &Weak<DeviceCore>) -> bool {
        Weak::ptr_eq(&self.core, core)
    }
}

/// Connects an object, and every property it holds, to its device.
///
/// Both the identifier and the device handle are set exactly once, when the
/// object is attached.
#[derive(Debug, Default)]
pub struct ObjectLink {
    identifier: OnceLock<ObjectIdentifier>,
    device: OnceLock<DeviceHandle>,
}

impl ObjectLink {
    pub fn identifier(&self) -> Option<ObjectIdentifier> {
        self.identifier.get().copied()
    }

    pub fn is_attached(&self) -> bool {
        self.device.get().is_some()
    }

    pub(crate) fn device(&self) -> Option<&DeviceHandle> {
        self.device.get()
    }

    pub(crate) fn attach(&self, identifier: ObjectIdentifier, device: DeviceHandle) -> Result<()> {
        let device_id = device.device();
        self.device.set(device).map_err(|_| {
            BacnetError::already_attached(format!("object already attached, not adding to {device_id}"))
        })?;
        let _ = self.identifier.set(identifier);
        Ok(())
    }

    /// Forwards a committed change to the device's COV dispatcher.
    pub(crate) fn notify(&self, property: PropertyIdentifier, data: PropertyData) {
        let (Some(object), Some(device)) = (self.identifier.get(), self.device.get()) else {
            return;
        };
        if let Some(core) = device.upgrade() {
            core.enqueue_cov(QueuedCov {
                object: *object,
                property,
                data,
            });
        }
    }
}

struct NodeInner {
    object_type: ObjectType,
    name: String,
    description: Option<String>,
    properties: RwLock<Vec<Arc<dyn Property>>>,
    listed: Arc<RwLock<Vec<PropertyIdentifier>>>,
    queue: RwLock<TaskQueue>,
    explicit_queue: AtomicBool,
    link: Arc<ObjectLink>,
}

/// Property container backing every BACnet object.
///
/// Cloning a node yields another handle to the same object.
#[derive(Clone)]
pub struct ObjectNode {
    inner: Arc<NodeInner>,
}

/// Properties never reported in Property_List.
const UNLISTED: [PropertyIdentifier; 4] = [
    PropertyIdentifier::ObjectIdentifier,
    PropertyIdentifier::ObjectName,
    PropertyIdentifier::ObjectType,
    PropertyIdentifier::PropertyList,
];

impl ObjectNode {
    pub fn new(object_type: ObjectType, name: impl Into<String>, description: Option<&str>) -> Self {
        let name = name.into();
        let node = Self {
            inner: Arc::new(NodeInner {
                object_type,
                name: name.clone(),
                description: description.map(str::to_string),
                properties: RwLock::new(Vec::new()),
                listed: Arc::new(RwLock::new(Vec::new())),
                queue: RwLock::new(TaskQueue::new()),
                explicit_queue: AtomicBool::new(false),
                link: Arc::new(ObjectLink::default()),
            }),
        };

        let link = node.inner.link.clone();
        node.add_property(PolledSingletProperty::new(
            PropertyIdentifier::ObjectIdentifier,
            ApplicationTag::ObjectIdentifier,
            move |_| {
                PropertyValue::ObjectIdentifier(link.identifier().unwrap_or_else(|| {
                    ObjectIdentifier::new(object_type, UNINITIALIZED_INSTANCE)
                }))
            },
        ));
        node.add_property(SingletProperty::new(
            PropertyIdentifier::ObjectName,
            ApplicationTag::CharacterString,
            false,
            PropertyValue::CharacterString(name),
        ));
        node.add_property(SingletProperty::new(
            PropertyIdentifier::ObjectType,
            ApplicationTag::Enumerated,
            false,
            PropertyValue::Enumerated(u16::from(object_type) as u32),
        ));
        if let Some(description) = description {
            node.add_property(SingletProperty::new(
                PropertyIdentifier::Description,
                ApplicationTag::CharacterString,
                false,
                PropertyValue::CharacterString(description.to_string()),
            ));
        }
        let listed = node.inner.listed.clone();
        node.add_property(PolledArrayProperty::new(
            PropertyIdentifier::PropertyList,
            ApplicationTag::Enumerated,
            move |_| {
                listed
                    .read()
                    .iter()
                    .map(|id| PropertyValue::Enumerated((*id).into()))
                    .collect()
            },
        ));
        node
    }

    pub fn object_type(&self) -> ObjectType {
        self.inner.object_type
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> Option<&str> {
        self.inner.description.as_deref()
    }

    /// Identifier assigned by the device, `None` until attached.
    pub fn identifier(&self) -> Option<ObjectIdentifier> {
        self.inner.link.identifier()
    }

    pub fn is_attached(&self) -> bool {
        self.inner.link.is_attached()
    }

    pub(crate) fn link(&self) -> &Arc<ObjectLink> {
        &self.inner.link
    }

    /// Adds `property` to the object, replacing any property with the same
    /// identifier, and returns a shared handle to it.
    pub fn add_property<P: Property + 'static>(&self, property: P) -> Arc<P> {
        property.set_queue(self.queue());
        property.attach(self.inner.link.clone());
        let property = Arc::new(property);
        let id = property.identifier();

        let mut properties = self.inner.properties.write();
        let shared: Arc<dyn Property> = property.clone();
        match properties.iter_mut().find(|p| p.identifier() == id) {
            Some(slot) => *slot = shared,
            None => {
                properties.push(shared);
                if !UNLISTED.contains(&id) {
                    self.inner.listed.write().push(id);
                }
            }
        }
        property
    }

    pub fn property(&self, id: PropertyIdentifier) -> Option<Arc<dyn Property>> {
        self.inner
            .properties
            .read()
            .iter()
            .find(|p| p.identifier() == id)
            .cloned()
    }

    pub fn property_or_err(&self, id: PropertyIdentifier) -> Result<Arc<dyn Property>> {
        self.property(id).ok_or_else(BacnetError::unknown_property)
    }

    /// Properties in insertion order
    pub fn properties(&self) -> Vec<Arc<dyn Property>> {
        self.inner.properties.read().clone()
    }

    pub fn queue(&self) -> TaskQueue {
        self.inner.queue.read().clone()
    }

    /// Assigns the queue used by every property of this object. An explicit
    /// queue is kept when the object is added to a device.
    pub fn set_queue(&self, queue: TaskQueue) {
        self.inner.explicit_queue.store(true, Ordering::Release);
        self.assign_queue(queue);
    }

    pub(crate) fn adopt_queue(&self, queue: &TaskQueue) {
        if !self.inner.explicit_queue.load(Ordering::Acquire) {
            self.assign_queue(queue.clone());
        }
    }

    fn assign_queue(&self, queue: TaskQueue) {
        for property in self.inner.properties.read().iter() {
            property.set_queue(queue.clone());
        }
        *self.inner.queue.write() = queue;
    }

    /// Runs `work` inside the object's queue.
    pub async fn transaction<F: Future>(&self, work: F) -> F::Output {
        self.queue().run(work).await
    }

    /// Network facing read, to be called from inside the object's queue.
    pub fn read_property(
        &self,
        id: PropertyIdentifier,
        index: Option<u32>,
        ctx: &AccessContext,
    ) -> Result<PropertyData> {
        self.property_or_err(id)?.read_data(index, ctx)
    }

    /// Network facing write, to be called from inside the object's queue.
    pub async fn write_property(
        &self,
        id: PropertyIdentifier,
        data: PropertyData,
        index: Option<u32>,
    ) -> Result<()> {
        self.property_or_err(id)?.write_data(data, index).await
    }

    /// Reads every referenced property, reporting failures per property.
    ///
    /// `All`, `Required` and `Optional` expand to every property of the
    /// object.
    pub fn read_property_multiple(
        &self,
        references: &[PropertyReference],
        ctx: &AccessContext,
    ) -> Vec<ReadResult> {
        let mut results = Vec::new();
        for reference in references {
            if reference.property_identifier.is_special() {
                for property in self.properties() {
                    results.push(ReadResult {
                        property_identifier: property.identifier(),
                        property_array_index: None,
                        value: property.read_data(None, ctx),
                    });
                }
            } else {
                results.push(ReadResult {
                    property_identifier: reference.property_identifier,
                    property_array_index: reference.property_array_index,
                    value: self.read_property(
                        reference.property_identifier,
                        reference.property_array_index,
                        ctx,
                    ),
                });
            }
        }
        results
    }

    /// Numeric COV_Increment of the object, if it has one.
    pub fn cov_increment(&self) -> Option<f64> {
        self.read_property(PropertyIdentifier::CovIncrement, None, &AccessContext::now())
            .ok()
            .and_then(|data| data.as_f64())
    }

    pub fn ptr_eq(&self, other: &ObjectNode) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectNode")
            .field("object_type", &self.inner.object_type)
            .field("name", &self.inner.name)
            .field("identifier", &self.identifier())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn node() -> ObjectNode {
        let node = ObjectNode::new(ObjectType::AnalogValue, "Supply Temp", Some("AHU-1 supply"));
        node.add_property(SingletProperty::new(
            PropertyIdentifier::PresentValue,
            ApplicationTag::Real,
            true,
            PropertyValue::Real(12.0),
        ));
        node
    }

    #[test]
    fn test_standard_properties() {
        let node = node();
        let ctx = AccessContext::now();
        assert_eq!(
            node.read_property(PropertyIdentifier::ObjectIdentifier, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::ObjectIdentifier(ObjectIdentifier::new(
                ObjectType::AnalogValue,
                UNINITIALIZED_INSTANCE
            )))
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::ObjectType, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::Enumerated(2))
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::PropertyList, None, &ctx)
                .unwrap(),
            PropertyData::List(vec![
                PropertyValue::Enumerated(28),
                PropertyValue::Enumerated(85),
            ])
        );
        assert_eq!(node.description(), Some("AHU-1 supply"));
    }

    #[test]
    fn test_unknown_property() {
        let err = node()
            .read_property(PropertyIdentifier::Units, None, &AccessContext::now())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownProperty);
    }

    #[test]
    fn test_read_property_multiple_reports_errors_inline() {
        let node = node();
        let refs = vec![
            PropertyReference::new(PropertyIdentifier::PresentValue),
            PropertyReference::new(PropertyIdentifier::Units),
        ];
        let results = node.read_property_multiple(&refs, &AccessContext::now());
        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].value,
            Ok(PropertyData::Single(PropertyValue::Real(12.0)))
        );
        assert_eq!(
            results[1].value.as_ref().unwrap_err().code(),
            ErrorCode::UnknownProperty
        );

        let all = node.read_property_multiple(
            &[PropertyReference::new(PropertyIdentifier::All)],
            &AccessContext::now(),
        );
        assert_eq!(all.len(), node.properties().len());
    }

    #[test]
    fn test_added_properties_share_object_queue() {
        let node = node();
        let queue = TaskQueue::new();
        node.set_queue(queue.clone());
        for property in node.properties() {
            assert!(property.queue().same_queue(&queue));
        }

        node.adopt_queue(&TaskQueue::new());
        assert!(node.queue().same_queue(&queue));
    }

    #[test]
    fn test_replacing_a_property_keeps_list_unique() {
        let node = node();
        node.add_property(SingletProperty::new(
            PropertyIdentifier::PresentValue,
            ApplicationTag::Real,
            false,
            PropertyValue::Real(0.0),
        ));
        let listed = node
            .read_property(PropertyIdentifier::PropertyList, Some(0), &AccessContext::now())
            .unwrap();
        assert_eq!(listed, PropertyData::Single(PropertyValue::UnsignedInteger(2)));
        assert!(!node.property(PropertyIdentifier::PresentValue).unwrap().is_writable());
    }

    #[tokio::test]
    async fn test_write_property() {
        let node = node();
        node.write_property(
            PropertyIdentifier::PresentValue,
            PropertyData::Single(PropertyValue::Real(18.5)),
            None,
        )
        .await
        .unwrap();
        assert_eq!(node.cov_increment(), None);
        assert_eq!(
            node.read_property(PropertyIdentifier::PresentValue, None, &AccessContext::now())
                .unwrap(),
            PropertyData::Single(PropertyValue::Real(18.5))
        );
    }
}
