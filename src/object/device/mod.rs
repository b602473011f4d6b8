//! Device Object
//!
//! The [`Device`] is the root of a device's object tree. It owns the object
//! registry behind Object_List, the structured views behind
//! Structured_Object_List, the COV [`SubscriptionStore`], the COV dispatcher,
//! and the [`Codec`] every answer and notification goes out through.
//!
//! # Creating a Device
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bacnet_device::object::analog::AnalogValue;
//! use bacnet_device::object::device::{Device, DeviceOptions};
//! use bacnet_device::object::numeric::NumericOptions;
//! use bacnet_device::object::{BacnetObject, EngineeringUnits};
//! # use bacnet_device::service::Codec;
//! # async fn example(codec: Arc<dyn Codec>) -> bacnet_device::Result<()> {
//! let device = Device::new(1234, DeviceOptions::named("AHU-1 Controller"), codec)?;
//!
//! let supply = device.add_object(AnalogValue::new(NumericOptions::new(
//!     "Supply Temp",
//!     EngineeringUnits::DegreesCelsius,
//! ))?)?;
//! assert_eq!(supply.identifier().map(|id| id.instance), Some(1));
//! # Ok(())
//! # }
//! ```
//!
//! A device needs a running tokio runtime: the COV dispatcher and the
//! subscription expiry timer are tokio tasks.

mod instances;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use parking_lot::RwLock;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use self::instances::InstanceAllocator;
use super::structured_view::StructuredView;
use super::{
    BacnetObject, DeviceHandle, DeviceStatus, ObjectIdentifier, ObjectNode, ObjectType,
    ObjectTypesSupported, PropertyIdentifier, ProtocolServicesSupported, Segmentation,
    UNINITIALIZED_INSTANCE,
};
use crate::app::HandlerError;
use crate::cov::{CovDispatcher, CovJob, QueuedCov, SubscriptionStore};
use crate::error::{BacnetError, Result};
use crate::property::{
    ApplicationTag, ArrayProperty, PolledArrayProperty, PolledSingletProperty, PropertyValue,
    SingletProperty,
};
use crate::queue::TaskQueue;
use crate::service::{Address, Codec, CodecError, IAmRequest, ServiceChoice};
use crate::uid::{object_uid, ObjectUid};
use crate::util::{is_dst_in_effect, utc_offset_minutes};
use crate::{BACNET_MAX_APDU, BACNET_PROTOCOL_VERSION};

const EVENT_CAPACITY: usize = 64;

/// Device configuration.
///
/// Every field has a default, so a configuration file only needs to name
/// what differs.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DeviceOptions {
    pub name: String,
    pub description: Option<String>,
    /// Assigned by ASHRAE
    pub vendor_identifier: u16,
    pub vendor_name: String,
    pub model_name: String,
    pub firmware_revision: String,
    pub application_software_version: String,
    pub database_revision: u32,
    pub location: String,
    pub serial_number: String,
    pub max_apdu_length_accepted: u32,
    /// Milliseconds
    pub apdu_timeout: u32,
    pub apdu_retries: u32,
    /// Milliseconds
    pub apdu_segment_timeout: u32,
    pub segmentation_supported: Segmentation,
    pub max_segments_accepted: u32,
    pub protocol_revision: u32,
    /// Dispatcher backlog above which every new change is logged as a warning
    pub cov_backlog_warning: usize,
    /// Send the current value to a new subscriber right away
    pub send_initial_cov_notification: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            name: "BACnet Device".to_string(),
            description: None,
            vendor_identifier: 0,
            vendor_name: "bacnet-device".to_string(),
            model_name: "bacnet-device".to_string(),
            firmware_revision: env!("CARGO_PKG_VERSION").to_string(),
            application_software_version: env!("CARGO_PKG_VERSION").to_string(),
            database_revision: 1,
            location: String::new(),
            serial_number: String::new(),
            max_apdu_length_accepted: BACNET_MAX_APDU as u32,
            apdu_timeout: 6000,
            apdu_retries: 3,
            apdu_segment_timeout: 2000,
            segmentation_supported: Segmentation::Both,
            max_segments_accepted: 16,
            protocol_revision: 24,
            cov_backlog_warning: 1024,
            send_initial_cov_notification: false,
        }
    }
}

impl DeviceOptions {
    /// Defaults with the given device name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Notifications published by a device, see [`Device::events`]
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A request handler failed with something other than a protocol error
    Error {
        service: ServiceChoice,
        error: HandlerError,
    },
    /// A COV notification could not be delivered
    CovDeliveryFailed {
        subscriber: Address,
        process_id: u32,
        object: ObjectIdentifier,
        error: CodecError,
    },
    /// A peer announced itself with I-Am
    DeviceDiscovered(IAmRequest),
}

#[derive(Debug, Default)]
struct Registry {
    objects: HashMap<ObjectUid, ObjectNode>,
    object_list: Vec<ObjectIdentifier>,
    structured: Vec<ObjectIdentifier>,
    instances: InstanceAllocator,
}

/// Stored device properties the application may update.
#[derive(Debug)]
struct StoredProperties {
    system_status: Arc<SingletProperty>,
    database_revision: Arc<SingletProperty>,
    location: Arc<SingletProperty>,
}

pub(crate) struct DeviceCore {
    this: Weak<DeviceCore>,
    identifier: ObjectIdentifier,
    node: ObjectNode,
    stored: StoredProperties,
    options: DeviceOptions,
    registry: RwLock<Registry>,
    subscriptions: SubscriptionStore,
    dispatcher: CovDispatcher,
    known_devices: RwLock<BTreeMap<u32, IAmRequest>>,
    default_queue: TaskQueue,
    events: broadcast::Sender<DeviceEvent>,
    codec: Arc<dyn Codec>,
}

impl DeviceCore {
    pub(crate) fn identifier(&self) -> ObjectIdentifier {
        self.identifier
    }

    pub(crate) fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }

    pub(crate) fn codec(&self) -> &Arc<dyn Codec> {
        &self.codec
    }

    pub(crate) fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub(crate) fn object(&self, identifier: &ObjectIdentifier) -> Option<ObjectNode> {
        let uid = object_uid(identifier).ok()?;
        self.registry.read().objects.get(&uid).cloned()
    }

    pub(crate) fn enqueue_cov(&self, change: QueuedCov) {
        self.dispatcher.enqueue(CovJob::Change(change));
    }

    pub(crate) fn enqueue_job(&self, job: CovJob) {
        self.dispatcher.enqueue(job);
    }

    pub(crate) fn publish(&self, event: DeviceEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn remember_device(&self, i_am: IAmRequest) -> bool {
        let instance = i_am.device_identifier.instance;
        if i_am.device_identifier == self.identifier {
            return false;
        }
        let mut known = self.known_devices.write();
        if known.get(&instance) == Some(&i_am) {
            return false;
        }
        if known.insert(instance, i_am.clone()).is_some() {
            debug!("device {} announced again with new parameters", instance);
        }
        drop(known);
        self.publish(DeviceEvent::DeviceDiscovered(i_am));
        true
    }

    /// Attaches `node` to this device and returns its identifier. A node
    /// already attached to this device keeps its identifier.
    pub(crate) fn attach_object(&self, node: &ObjectNode) -> Result<ObjectIdentifier> {
        if let Some(handle) = node.link().device() {
            if handle.belongs_to(&self.this) {
                return node.identifier().ok_or_else(|| {
                    BacnetError::internal(format!("{} attached without identifier", node.name()))
                });
            }
            return Err(BacnetError::already_attached(format!(
                "{} already belongs to {}",
                node.name(),
                handle.device()
            )));
        }

        let object_type = node.object_type();
        let mut registry = self.registry.write();
        let Registry {
            objects,
            object_list,
            instances,
            ..
        } = &mut *registry;
        let instance = instances.next(object_type, |instance| {
            object_uid(&ObjectIdentifier::new(object_type, instance))
                .map(|uid| objects.contains_key(&uid))
                .unwrap_or(true)
        })?;
        let identifier = ObjectIdentifier::new(object_type, instance);
        let uid = object_uid(&identifier)?;

        node.link()
            .attach(identifier, DeviceHandle::new(self.this.clone(), self.identifier))?;
        node.adopt_queue(&self.default_queue);
        objects.insert(uid, node.clone());
        object_list.push(identifier);

        info!("added {} ({}) to device {}", identifier, node.name(), self.identifier);
        Ok(identifier)
    }

    fn i_am(&self) -> IAmRequest {
        IAmRequest::new(
            self.identifier,
            self.options.max_apdu_length_accepted,
            self.options.segmentation_supported,
            self.options.vendor_identifier,
        )
    }
}

fn text(value: &str) -> PropertyValue {
    PropertyValue::CharacterString(value.to_string())
}

fn unsigned(value: u32) -> PropertyValue {
    PropertyValue::UnsignedInteger(value)
}

/// Builds the device object with its mandatory properties. Computed
/// properties reach the rest of the device through `core`.
fn device_node(
    core: &Weak<DeviceCore>,
    options: &DeviceOptions,
    subscriptions: &SubscriptionStore,
) -> (ObjectNode, StoredProperties) {
    let node = ObjectNode::new(
        ObjectType::Device,
        options.name.clone(),
        options.description.as_deref(),
    );
    let fixed = |id, tag, value| {
        node.add_property(SingletProperty::new(id, tag, false, value))
    };

    // child objects
    let objects = core.clone();
    node.add_property(PolledArrayProperty::new(
        PropertyIdentifier::ObjectList,
        ApplicationTag::ObjectIdentifier,
        move |_| {
            objects
                .upgrade()
                .map(|core| {
                    core.registry
                        .read()
                        .object_list
                        .iter()
                        .map(|id| PropertyValue::ObjectIdentifier(*id))
                        .collect()
                })
                .unwrap_or_default()
        },
    ));
    let views = core.clone();
    node.add_property(PolledArrayProperty::new(
        PropertyIdentifier::StructuredObjectList,
        ApplicationTag::ObjectIdentifier,
        move |_| {
            views
                .upgrade()
                .map(|core| {
                    core.registry
                        .read()
                        .structured
                        .iter()
                        .map(|id| PropertyValue::ObjectIdentifier(*id))
                        .collect()
                })
                .unwrap_or_default()
        },
    ));

    // protocol
    fixed(
        PropertyIdentifier::ProtocolVersion,
        ApplicationTag::UnsignedInt,
        unsigned(BACNET_PROTOCOL_VERSION as u32),
    );
    fixed(
        PropertyIdentifier::ProtocolRevision,
        ApplicationTag::UnsignedInt,
        unsigned(options.protocol_revision),
    );
    fixed(
        PropertyIdentifier::ProtocolServicesSupported,
        ApplicationTag::BitString,
        PropertyValue::BitString(ProtocolServicesSupported::device_runtime().to_bool_vec()),
    );
    fixed(
        PropertyIdentifier::ProtocolObjectTypesSupported,
        ApplicationTag::BitString,
        PropertyValue::BitString(ObjectTypesSupported::device_runtime().to_bool_vec()),
    );

    // subscriptions
    let store = subscriptions.clone();
    node.add_property(PolledArrayProperty::new(
        PropertyIdentifier::ActiveCovSubscriptions,
        ApplicationTag::CovSubscription,
        move |_| {
            store
                .snapshot()
                .into_iter()
                .map(PropertyValue::CovSubscription)
                .collect()
        },
    ));

    // metadata
    fixed(
        PropertyIdentifier::VendorIdentifier,
        ApplicationTag::UnsignedInt,
        unsigned(options.vendor_identifier as u32),
    );
    fixed(
        PropertyIdentifier::VendorName,
        ApplicationTag::CharacterString,
        text(&options.vendor_name),
    );
    fixed(
        PropertyIdentifier::ModelName,
        ApplicationTag::CharacterString,
        text(&options.model_name),
    );
    fixed(
        PropertyIdentifier::FirmwareRevision,
        ApplicationTag::CharacterString,
        text(&options.firmware_revision),
    );
    fixed(
        PropertyIdentifier::ApplicationSoftwareVersion,
        ApplicationTag::CharacterString,
        text(&options.application_software_version),
    );
    let database_revision = fixed(
        PropertyIdentifier::DatabaseRevision,
        ApplicationTag::UnsignedInt,
        unsigned(options.database_revision),
    );
    // bindings are learned through Who-Is/I-Am; no static ones
    node.add_property(ArrayProperty::new(
        PropertyIdentifier::DeviceAddressBinding,
        ApplicationTag::Null,
        false,
        Vec::new(),
    ));
    let location = fixed(
        PropertyIdentifier::Location,
        ApplicationTag::CharacterString,
        text(&options.location),
    );
    fixed(
        PropertyIdentifier::SerialNumber,
        ApplicationTag::CharacterString,
        text(&options.serial_number),
    );

    // APDU
    fixed(
        PropertyIdentifier::MaxApduLengthAccepted,
        ApplicationTag::UnsignedInt,
        unsigned(options.max_apdu_length_accepted),
    );
    fixed(
        PropertyIdentifier::ApduTimeout,
        ApplicationTag::UnsignedInt,
        unsigned(options.apdu_timeout),
    );
    fixed(
        PropertyIdentifier::NumberOfApduRetries,
        ApplicationTag::UnsignedInt,
        unsigned(options.apdu_retries),
    );
    fixed(
        PropertyIdentifier::ApduSegmentTimeout,
        ApplicationTag::UnsignedInt,
        unsigned(options.apdu_segment_timeout),
    );
    fixed(
        PropertyIdentifier::SegmentationSupported,
        ApplicationTag::Enumerated,
        PropertyValue::Enumerated(options.segmentation_supported as u32),
    );
    fixed(
        PropertyIdentifier::MaxSegmentsAccepted,
        ApplicationTag::UnsignedInt,
        unsigned(options.max_segments_accepted),
    );

    // time
    node.add_property(PolledSingletProperty::new(
        PropertyIdentifier::UtcOffset,
        ApplicationTag::SignedInt,
        |ctx| PropertyValue::SignedInt(utc_offset_minutes(&ctx.time)),
    ));
    node.add_property(PolledSingletProperty::new(
        PropertyIdentifier::LocalDate,
        ApplicationTag::Date,
        |ctx| PropertyValue::Date(ctx.time.date_naive().into()),
    ));
    node.add_property(PolledSingletProperty::new(
        PropertyIdentifier::LocalTime,
        ApplicationTag::Time,
        |ctx| PropertyValue::Time(ctx.time.time().into()),
    ));
    node.add_property(PolledSingletProperty::new(
        PropertyIdentifier::DaylightSavingsStatus,
        ApplicationTag::Boolean,
        |ctx| PropertyValue::Boolean(is_dst_in_effect(&ctx.time)),
    ));

    // status
    let system_status = fixed(
        PropertyIdentifier::SystemStatus,
        ApplicationTag::Enumerated,
        PropertyValue::Enumerated(DeviceStatus::Operational as u32),
    );

    let stored = StoredProperties {
        system_status,
        database_revision,
        location,
    };
    (node, stored)
}

/// BACnet Device object and the runtime around it.
///
/// Cloning a device yields another handle to the same device.
#[derive(Clone)]
pub struct Device {
    core: Arc<DeviceCore>,
}

impl Device {
    /// Creates device `instance` with its own default queue.
    pub fn new(instance: u32, options: DeviceOptions, codec: Arc<dyn Codec>) -> Result<Self> {
        Self::with_queue(instance, options, codec, TaskQueue::new())
    }

    /// Creates device `instance` whose objects default to `queue`. Passing
    /// the same queue to several devices serializes access across them.
    pub fn with_queue(
        instance: u32,
        options: DeviceOptions,
        codec: Arc<dyn Codec>,
        queue: TaskQueue,
    ) -> Result<Self> {
        if instance >= UNINITIALIZED_INSTANCE {
            return Err(BacnetError::value_out_of_range(format!(
                "device instance {instance} outside 0..{UNINITIALIZED_INSTANCE}"
            )));
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(BacnetError::internal("a device needs a running tokio runtime"));
        }
        let identifier = ObjectIdentifier::new(ObjectType::Device, instance);
        let uid = object_uid(&identifier)?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let subscriptions = SubscriptionStore::new();
        let core = Arc::new_cyclic(|this: &Weak<DeviceCore>| {
            let (node, stored) = device_node(this, &options, &subscriptions);
            let dispatcher = CovDispatcher::spawn(
                this.clone(),
                codec.clone(),
                events.clone(),
                options.cov_backlog_warning,
            );
            DeviceCore {
                this: this.clone(),
                identifier,
                node,
                stored,
                options,
                registry: RwLock::new(Registry::default()),
                subscriptions,
                dispatcher,
                known_devices: RwLock::new(BTreeMap::new()),
                default_queue: queue,
                events,
                codec,
            }
        });

        core.node
            .link()
            .attach(identifier, DeviceHandle::new(Arc::downgrade(&core), identifier))?;
        core.node.adopt_queue(&core.default_queue);
        {
            let mut registry = core.registry.write();
            registry.objects.insert(uid, core.node.clone());
            registry.object_list.push(identifier);
        }

        info!("device {} ({}) created", identifier, core.node.name());
        Ok(Self { core })
    }

    pub(crate) fn core(&self) -> &Arc<DeviceCore> {
        &self.core
    }

    pub fn identifier(&self) -> ObjectIdentifier {
        self.core.identifier
    }

    pub fn instance(&self) -> u32 {
        self.core.identifier.instance
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.core.options
    }

    /// Queue adopted by objects added without an explicit queue
    pub fn default_queue(&self) -> &TaskQueue {
        &self.core.default_queue
    }

    /// Attaches `object` to the device: assigns the next instance number of
    /// its type, lists it in Object_List and routes its property changes to
    /// the COV dispatcher.
    pub fn add_object<O: BacnetObject>(&self, object: O) -> Result<O> {
        if object.node().is_attached() {
            let name = object.node().name().to_string();
            return Err(BacnetError::already_attached(format!(
                "{name} is already attached to a device"
            )));
        }
        self.core.attach_object(object.node())?;
        Ok(object)
    }

    /// Adds `view` like [`add_object`](Self::add_object) and lists it in
    /// Structured_Object_List.
    pub fn add_subordinate(&self, view: StructuredView) -> Result<StructuredView> {
        let identifier = self.core.attach_object(view.node())?;
        let mut registry = self.core.registry.write();
        if !registry.structured.contains(&identifier) {
            registry.structured.push(identifier);
        }
        Ok(view)
    }

    pub fn object(&self, identifier: &ObjectIdentifier) -> Option<ObjectNode> {
        self.core.object(identifier)
    }

    /// Looks up an attached object, failing with `UNKNOWN_OBJECT`.
    pub fn get_object_by_identifier(&self, identifier: &ObjectIdentifier) -> Result<ObjectNode> {
        self.core
            .object(identifier)
            .ok_or_else(BacnetError::unknown_object)
    }

    /// Identifiers in Object_List order, the device first
    pub fn object_list(&self) -> Vec<ObjectIdentifier> {
        self.core.registry.read().object_list.clone()
    }

    pub fn structured_object_list(&self) -> Vec<ObjectIdentifier> {
        self.core.registry.read().structured.clone()
    }

    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.core.subscriptions
    }

    /// Peers that announced themselves with I-Am, by instance
    pub fn known_devices(&self) -> Vec<IAmRequest> {
        self.core.known_devices.read().values().cloned().collect()
    }

    /// Subscribes to the device's events. Events published while nobody
    /// listens are dropped.
    pub fn events(&self) -> broadcast::Receiver<DeviceEvent> {
        self.core.events.subscribe()
    }

    /// Changes waiting in the COV dispatcher
    pub fn cov_backlog(&self) -> usize {
        self.core.dispatcher.backlog()
    }

    /// I-Am announcement of this device
    pub fn i_am(&self) -> IAmRequest {
        self.core.i_am()
    }

    pub fn system_status(&self) -> &Arc<SingletProperty> {
        &self.core.stored.system_status
    }

    pub fn database_revision(&self) -> &Arc<SingletProperty> {
        &self.core.stored.database_revision
    }

    pub fn location(&self) -> &Arc<SingletProperty> {
        &self.core.stored.location
    }

    /// Updates System_Status.
    pub async fn set_system_status(&self, status: DeviceStatus) -> Result<()> {
        if status != DeviceStatus::Operational {
            warn!("device {} status set to {:?}", self.identifier(), status);
        }
        self.core
            .stored
            .system_status
            .set_value(PropertyValue::Enumerated(status as u32))
            .await
    }
}

impl BacnetObject for Device {
    fn node(&self) -> &ObjectNode {
        &self.core.node
    }
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("identifier", &self.core.identifier)
            .field("name", &self.core.node.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::object::analog::AnalogValue;
    use crate::object::binary::{BinaryValue, BinaryValueOptions};
    use crate::object::numeric::NumericOptions;
    use crate::object::structured_view::StructuredViewOptions;
    use crate::object::EngineeringUnits;
    use crate::property::{AccessContext, PropertyData};
    use crate::service::testing::RecordingCodec;

    fn device() -> Device {
        Device::new(
            1234,
            DeviceOptions::named("Test Device"),
            Arc::new(RecordingCodec::default()),
        )
        .unwrap()
    }

    fn analog(name: &str) -> AnalogValue {
        AnalogValue::new(NumericOptions::new(name, EngineeringUnits::DegreesCelsius)).unwrap()
    }

    #[tokio::test]
    async fn test_instances_increase_per_type() {
        let device = device();
        let a = device.add_object(analog("a")).unwrap();
        let b = device.add_object(analog("b")).unwrap();
        let c = device
            .add_object(BinaryValue::new(BinaryValueOptions {
                name: "c".into(),
                ..Default::default()
            }))
            .unwrap();
        assert_eq!(a.identifier().unwrap().instance, 1);
        assert_eq!(b.identifier().unwrap().instance, 2);
        assert_eq!(c.identifier().unwrap().instance, 1);
        assert_eq!(device.object_list().len(), 4);
        assert_eq!(device.object_list()[0], device.identifier());
    }

    #[tokio::test]
    async fn test_object_added_twice_is_rejected() {
        let device = device();
        let a = device.add_object(analog("a")).unwrap();
        let err = device.add_object(a.clone()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ObjectIdentifierAlreadyExists);

        let other = Device::new(
            99,
            DeviceOptions::default(),
            Arc::new(RecordingCodec::default()),
        )
        .unwrap();
        assert!(other.add_object(a).is_err());
        assert_eq!(other.object_list().len(), 1);
    }

    #[tokio::test]
    async fn test_lookup() {
        let device = device();
        let a = device.add_object(analog("a")).unwrap();
        let id = a.identifier().unwrap();
        assert!(device.get_object_by_identifier(&id).unwrap().ptr_eq(a.node()));
        assert!(device
            .get_object_by_identifier(&device.identifier())
            .unwrap()
            .ptr_eq(device.node()));

        let err = device
            .get_object_by_identifier(&ObjectIdentifier::new(ObjectType::AnalogValue, 7))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownObject);
    }

    #[tokio::test]
    async fn test_added_objects_adopt_default_queue() {
        let device = device();
        let a = device.add_object(analog("a")).unwrap();
        assert!(a.node().queue().same_queue(device.default_queue()));

        let own = TaskQueue::new();
        let b = analog("b");
        b.node().set_queue(own.clone());
        let b = device.add_object(b).unwrap();
        assert!(b.node().queue().same_queue(&own));
    }

    #[tokio::test]
    async fn test_device_properties() {
        let device = device();
        let ctx = AccessContext::now();
        let node = device.node();
        assert_eq!(
            node.read_property(PropertyIdentifier::ObjectIdentifier, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::ObjectIdentifier(device.identifier()))
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::ProtocolVersion, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(1))
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::MaxApduLengthAccepted, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(1476))
        );
        assert_eq!(
            node.read_property(PropertyIdentifier::DeviceAddressBinding, Some(0), &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(0))
        );
        assert!(matches!(
            node.read_property(PropertyIdentifier::LocalDate, None, &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::Date(_))
        ));

        device.add_object(analog("a")).unwrap();
        assert_eq!(
            node.read_property(PropertyIdentifier::ObjectList, Some(0), &ctx)
                .unwrap(),
            PropertyData::Single(PropertyValue::UnsignedInteger(2))
        );
    }

    #[tokio::test]
    async fn test_structured_views() {
        let device = device();
        let floor = device
            .add_subordinate(StructuredView::new(StructuredViewOptions {
                name: "Floor 1".into(),
                ..Default::default()
            }))
            .unwrap();
        let room = floor
            .add_subordinate(StructuredView::new(StructuredViewOptions {
                name: "Room 101".into(),
                ..Default::default()
            }))
            .unwrap();
        let temp = room.add_subordinate(analog("Room Temp")).unwrap();
        // an object may sit under several views
        floor.add_subordinate(temp.clone()).unwrap();

        assert_eq!(device.structured_object_list(), vec![floor.identifier().unwrap()]);
        assert_eq!(
            floor.subordinates(),
            vec![room.identifier().unwrap(), temp.identifier().unwrap()]
        );
        assert_eq!(room.subordinates(), vec![temp.identifier().unwrap()]);
        assert_eq!(device.object_list().len(), 4);
    }

    #[tokio::test]
    async fn test_invalid_instance() {
        let err = Device::new(
            UNINITIALIZED_INSTANCE,
            DeviceOptions::default(),
            Arc::new(RecordingCodec::default()),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn test_requires_runtime() {
        let err = Device::new(
            1,
            DeviceOptions::default(),
            Arc::new(RecordingCodec::default()),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn test_option_defaults() {
        let options = DeviceOptions {
            name: "Boiler".into(),
            ..Default::default()
        };
        assert_eq!(options.apdu_timeout, 6000);
        assert_eq!(options.segmentation_supported, Segmentation::Both);
        assert!(!options.send_initial_cov_notification);
    }
}
