//! BACnet Application Layer Services
//!
//! This module describes the services a device exchanges with its peers at
//! the level the runtime needs them: decoded, strongly typed requests coming
//! in, and typed responses and notifications going out. Byte level encoding,
//! transport, segmentation and retries belong to the [`Codec`] collaborator.
//!
//! # Inbound requests
//!
//! Every request the codec decodes is delivered as an [`InboundRequest`]: a
//! [`RequestHeader`] (sender, whether a reply is expected, invoke id) plus one
//! [`ServiceRequest`] variant. The set is closed: adding a service is a
//! compile-time checked change to the device's dispatch.
//!
//! ## Answered services
//! - **Who-Is** / **I-Am**: device discovery
//! - **ReadProperty** / **ReadPropertyMultiple** / **WriteProperty**: object access
//! - **SubscribeCOV**: change of value subscriptions
//!
//! ## Denied services
//! Who-Has, I-Have, ReadRange, DeviceCommunicationControl, AddListElement,
//! RemoveListElement, SubscribeCOVProperty, GetEventInformation and any
//! service the codec could not map are answered with a
//! `SERVICE_REQUEST_DENIED` error when a reply is expected.
//!
//! # Examples
//!
//! ```rust
//! use bacnet_device::object::{ObjectIdentifier, ObjectType, PropertyIdentifier};
//! use bacnet_device::service::{
//!     Address, ConfirmedServiceChoice, InboundRequest, ReadPropertyRequest, RequestHeader,
//!     ServiceChoice, ServiceRequest,
//! };
//!
//! let request = InboundRequest {
//!     header: RequestHeader::confirmed(Address::local(vec![10, 0, 0, 7, 0xBA, 0xC0]), 3),
//!     request: ServiceRequest::ReadProperty(ReadPropertyRequest::new(
//!         ObjectIdentifier::new(ObjectType::AnalogValue, 1),
//!         PropertyIdentifier::PresentValue,
//!     )),
//! };
//! assert_eq!(
//!     request.request.service_choice(),
//!     ServiceChoice::Confirmed(ConfirmedServiceChoice::ReadProperty)
//! );
//! ```

use std::fmt;

use crate::error::{BacnetError, Result};
use crate::object::{ObjectIdentifier, PropertyIdentifier, Segmentation};
use crate::property::{PropertyData, PropertyValue};

mod codec;

pub use codec::{Codec, CodecError};

#[cfg(test)]
pub(crate) use codec::testing;

/// Confirmed service choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConfirmedServiceChoice {
    // Alarm and Event Services
    AcknowledgeAlarm = 0,
    ConfirmedCOVNotification = 1,
    ConfirmedEventNotification = 2,
    GetAlarmSummary = 3,
    GetEnrollmentSummary = 4,
    GetEventInformation = 29,
    SubscribeCOV = 5,
    SubscribeCOVProperty = 28,

    // Object Access Services
    AddListElement = 8,
    RemoveListElement = 9,
    CreateObject = 10,
    DeleteObject = 11,
    ReadProperty = 12,
    ReadPropertyMultiple = 14,
    WriteProperty = 15,
    WritePropertyMultiple = 16,
    ReadRange = 26,

    // Remote Device Management Services
    DeviceCommunicationControl = 17,
    ReinitializeDevice = 20,
}

impl TryFrom<u8> for ConfirmedServiceChoice {
    type Error = BacnetError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::AcknowledgeAlarm),
            1 => Ok(Self::ConfirmedCOVNotification),
            2 => Ok(Self::ConfirmedEventNotification),
            3 => Ok(Self::GetAlarmSummary),
            4 => Ok(Self::GetEnrollmentSummary),
            5 => Ok(Self::SubscribeCOV),
            8 => Ok(Self::AddListElement),
            9 => Ok(Self::RemoveListElement),
            10 => Ok(Self::CreateObject),
            11 => Ok(Self::DeleteObject),
            12 => Ok(Self::ReadProperty),
            14 => Ok(Self::ReadPropertyMultiple),
            15 => Ok(Self::WriteProperty),
            16 => Ok(Self::WritePropertyMultiple),
            17 => Ok(Self::DeviceCommunicationControl),
            20 => Ok(Self::ReinitializeDevice),
            26 => Ok(Self::ReadRange),
            28 => Ok(Self::SubscribeCOVProperty),
            29 => Ok(Self::GetEventInformation),
            _ => Err(BacnetError::service_request_denied()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum UnconfirmedServiceChoice {
    IAm = 0,
    IHave = 1,
    UnconfirmedCOVNotification = 2,
    UnconfirmedEventNotification = 3,
    UnconfirmedPrivateTransfer = 4,
    UnconfirmedTextMessage = 5,
    TimeSynchronization = 6,
    WhoHas = 7,
    WhoIs = 8,
    UtcTimeSynchronization = 9,
}

impl TryFrom<u8> for UnconfirmedServiceChoice {
    type Error = BacnetError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::IAm),
            1 => Ok(Self::IHave),
            2 => Ok(Self::UnconfirmedCOVNotification),
            3 => Ok(Self::UnconfirmedEventNotification),
            4 => Ok(Self::UnconfirmedPrivateTransfer),
            5 => Ok(Self::UnconfirmedTextMessage),
            6 => Ok(Self::TimeSynchronization),
            7 => Ok(Self::WhoHas),
            8 => Ok(Self::WhoIs),
            9 => Ok(Self::UtcTimeSynchronization),
            _ => Err(BacnetError::service_request_denied()),
        }
    }
}

/// Service of an inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceChoice {
    Confirmed(ConfirmedServiceChoice),
    Unconfirmed(UnconfirmedServiceChoice),
}

impl fmt::Display for ServiceChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed(service) => write!(f, "{service:?}"),
            Self::Unconfirmed(service) => write!(f, "{service:?}"),
        }
    }
}

/// Reject reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Other = 0,
    BufferOverflow = 1,
    InconsistentParameters = 2,
    InvalidParameterDataType = 3,
    InvalidTag = 4,
    MissingRequiredParameter = 5,
    ParameterOutOfRange = 6,
    TooManyArguments = 7,
    UndefinedEnumeration = 8,
    UnrecognizedService = 9,
}

/// Abort reason codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    Other = 0,
    BufferOverflow = 1,
    InvalidApduInThisState = 2,
    PreemptedByHigherPriorityTask = 3,
    SegmentationNotSupported = 4,
}

/// Network address of a peer: optional remote network number and MAC.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub network: Option<u16>,
    pub mac: Vec<u8>,
}

impl Address {
    /// Peer on the local network
    pub fn local(mac: Vec<u8>) -> Self {
        Self { network: None, mac }
    }

    /// Peer behind a router on network `network`
    pub fn remote(network: u16, mac: Vec<u8>) -> Self {
        Self {
            network: Some(network),
            mac,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.network {
            Some(network) => write!(f, "{}:{}", network, hex::encode(&self.mac)),
            None => write!(f, "{}", hex::encode(&self.mac)),
        }
    }
}

/// Header shared by every inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub sender: Address,
    pub expecting_reply: bool,
    pub invoke_id: Option<u8>,
}

impl RequestHeader {
    /// Header of a confirmed request
    pub fn confirmed(sender: Address, invoke_id: u8) -> Self {
        Self {
            sender,
            expecting_reply: true,
            invoke_id: Some(invoke_id),
        }
    }

    /// Header of an unconfirmed request
    pub fn unconfirmed(sender: Address) -> Self {
        Self {
            sender,
            expecting_reply: false,
            invoke_id: None,
        }
    }
}

/// Who-Is request (unconfirmed service)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WhoIsRequest {
    /// Low limit of device instance range (optional)
    pub device_instance_range_low_limit: Option<u32>,
    /// High limit of device instance range (optional)
    pub device_instance_range_high_limit: Option<u32>,
}

impl WhoIsRequest {
    /// Create a new Who-Is request for all devices
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new Who-Is request for a specific device
    pub fn for_device(device_instance: u32) -> Self {
        Self::for_range(device_instance, device_instance)
    }

    /// Create a new Who-Is request for a range of devices
    pub fn for_range(low: u32, high: u32) -> Self {
        Self {
            device_instance_range_low_limit: Some(low),
            device_instance_range_high_limit: Some(high),
        }
    }

    /// Whether `device_instance` falls inside the requested range. A missing
    /// limit leaves that side open.
    pub fn matches(&self, device_instance: u32) -> bool {
        let low = self.device_instance_range_low_limit.unwrap_or(0);
        let high = self.device_instance_range_high_limit.unwrap_or(u32::MAX);
        (low..=high).contains(&device_instance)
    }
}

/// I-Am announcement (unconfirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_identifier: ObjectIdentifier,
    pub max_apdu_length_accepted: u32,
    pub segmentation_supported: Segmentation,
    pub vendor_identifier: u16,
}

impl IAmRequest {
    pub fn new(
        device_identifier: ObjectIdentifier,
        max_apdu_length_accepted: u32,
        segmentation_supported: Segmentation,
        vendor_identifier: u16,
    ) -> Self {
        Self {
            device_identifier,
            max_apdu_length_accepted,
            segmentation_supported,
            vendor_identifier,
        }
    }
}

/// Object searched for by a Who-Has request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoHasObject {
    Identifier(ObjectIdentifier),
    Name(String),
}

/// Who-Has request (unconfirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoHasRequest {
    pub device_instance_range_low_limit: Option<u32>,
    pub device_instance_range_high_limit: Option<u32>,
    pub object: WhoHasObject,
}

/// I-Have announcement (unconfirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IHaveRequest {
    pub device_identifier: ObjectIdentifier,
    pub object_identifier: ObjectIdentifier,
    pub object_name: String,
}

/// Read Property request (confirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPropertyRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
}

impl ReadPropertyRequest {
    pub fn new(object_identifier: ObjectIdentifier, property_identifier: PropertyIdentifier) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: None,
        }
    }

    pub fn with_array_index(
        object_identifier: ObjectIdentifier,
        property_identifier: PropertyIdentifier,
        array_index: u32,
    ) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: Some(array_index),
        }
    }
}

/// Read Property acknowledgement
#[derive(Debug, Clone, PartialEq)]
pub struct ReadPropertyResponse {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    pub property_value: PropertyData,
}

/// Write Property request (confirmed service)
#[derive(Debug, Clone, PartialEq)]
pub struct WritePropertyRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    /// Decoded value, `None` if the request carried none
    pub property_value: Option<PropertyData>,
    /// Priority (optional, 1-16)
    pub priority: Option<u8>,
}

impl WritePropertyRequest {
    pub fn new(
        object_identifier: ObjectIdentifier,
        property_identifier: PropertyIdentifier,
        property_value: PropertyData,
    ) -> Self {
        Self {
            object_identifier,
            property_identifier,
            property_array_index: None,
            property_value: Some(property_value),
            priority: None,
        }
    }

    pub fn with_array_index(
        object_identifier: ObjectIdentifier,
        property_identifier: PropertyIdentifier,
        array_index: u32,
        property_value: PropertyData,
    ) -> Self {
        Self {
            property_array_index: Some(array_index),
            ..Self::new(object_identifier, property_identifier, property_value)
        }
    }
}

/// Read Property Multiple request (confirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPropertyMultipleRequest {
    pub read_access_specifications: Vec<ReadAccessSpecification>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadAccessSpecification {
    pub object_identifier: ObjectIdentifier,
    pub property_references: Vec<PropertyReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyReference {
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
}

impl ReadPropertyMultipleRequest {
    pub fn new(read_access_specifications: Vec<ReadAccessSpecification>) -> Self {
        Self {
            read_access_specifications,
        }
    }
}

impl ReadAccessSpecification {
    pub fn new(
        object_identifier: ObjectIdentifier,
        property_references: Vec<PropertyReference>,
    ) -> Self {
        Self {
            object_identifier,
            property_references,
        }
    }
}

impl PropertyReference {
    pub fn new(property_identifier: PropertyIdentifier) -> Self {
        Self {
            property_identifier,
            property_array_index: None,
        }
    }

    pub fn with_array_index(property_identifier: PropertyIdentifier, array_index: u32) -> Self {
        Self {
            property_identifier,
            property_array_index: Some(array_index),
        }
    }
}

/// Result of reading one property within ReadPropertyMultiple
#[derive(Debug, Clone, PartialEq)]
pub struct ReadResult {
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    pub value: std::result::Result<PropertyData, BacnetError>,
}

/// Results for one object within ReadPropertyMultiple
#[derive(Debug, Clone, PartialEq)]
pub struct ReadAccessResult {
    pub object_identifier: ObjectIdentifier,
    pub results: Vec<ReadResult>,
}

/// Subscribe COV request (confirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeCovRequest {
    pub subscriber_process_identifier: u32,
    pub monitored_object_identifier: ObjectIdentifier,
    pub issue_confirmed_notifications: bool,
    /// Lifetime in seconds, 0 = no expiry
    pub lifetime: u32,
}

impl SubscribeCovRequest {
    pub fn new(
        subscriber_process_identifier: u32,
        monitored_object_identifier: ObjectIdentifier,
        issue_confirmed_notifications: bool,
        lifetime: u32,
    ) -> Self {
        Self {
            subscriber_process_identifier,
            monitored_object_identifier,
            issue_confirmed_notifications,
            lifetime,
        }
    }
}

/// Subscribe COV Property request (confirmed service)
#[derive(Debug, Clone, PartialEq)]
pub struct SubscribeCovPropertyRequest {
    pub subscriber_process_identifier: u32,
    pub monitored_object_identifier: ObjectIdentifier,
    pub issue_confirmed_notifications: Option<bool>,
    pub lifetime: Option<u32>,
    pub monitored_property: PropertyReference,
    pub cov_increment: Option<f32>,
}

/// Read Range request (confirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRangeRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
}

/// Device Communication Control request (confirmed service)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommunicationControlRequest {
    /// Minutes, `None` for indefinite
    pub time_duration: Option<u16>,
    pub enable_disable: u32,
    pub password: Option<String>,
}

/// AddListElement / RemoveListElement request (confirmed service)
#[derive(Debug, Clone, PartialEq)]
pub struct ListElementRequest {
    pub object_identifier: ObjectIdentifier,
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    pub list_of_elements: Vec<PropertyValue>,
}

/// Get Event Information request (confirmed service)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetEventInformationRequest {
    pub last_received_object_identifier: Option<ObjectIdentifier>,
}

/// One property value carried by a COV notification
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyValueEntry {
    pub property_identifier: PropertyIdentifier,
    pub property_array_index: Option<u32>,
    pub value: PropertyData,
    pub priority: Option<u8>,
}

/// Confirmed or unconfirmed COV notification
#[derive(Debug, Clone, PartialEq)]
pub struct CovNotification {
    pub subscriber_process_identifier: u32,
    pub initiating_device_identifier: ObjectIdentifier,
    pub monitored_object_identifier: ObjectIdentifier,
    /// Seconds, 0 for subscriptions without expiry
    pub time_remaining: u32,
    pub list_of_values: Vec<PropertyValueEntry>,
}

/// Decoded service payload of an inbound request
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRequest {
    WhoIs(WhoIsRequest),
    IAm(IAmRequest),
    IHave(IHaveRequest),
    WhoHas(WhoHasRequest),
    ReadProperty(ReadPropertyRequest),
    ReadPropertyMultiple(ReadPropertyMultipleRequest),
    WriteProperty(WritePropertyRequest),
    SubscribeCov(SubscribeCovRequest),
    SubscribeCovProperty(SubscribeCovPropertyRequest),
    ReadRange(ReadRangeRequest),
    DeviceCommunicationControl(DeviceCommunicationControlRequest),
    AddListElement(ListElementRequest),
    RemoveListElement(ListElementRequest),
    GetEventInformation(GetEventInformationRequest),
    /// A service the codec decoded but has no payload type for
    Unhandled(ServiceChoice),
}

impl ServiceRequest {
    pub fn service_choice(&self) -> ServiceChoice {
        use ConfirmedServiceChoice as C;
        use UnconfirmedServiceChoice as U;

        match self {
            Self::WhoIs(_) => ServiceChoice::Unconfirmed(U::WhoIs),
            Self::IAm(_) => ServiceChoice::Unconfirmed(U::IAm),
            Self::IHave(_) => ServiceChoice::Unconfirmed(U::IHave),
            Self::WhoHas(_) => ServiceChoice::Unconfirmed(U::WhoHas),
            Self::ReadProperty(_) => ServiceChoice::Confirmed(C::ReadProperty),
            Self::ReadPropertyMultiple(_) => ServiceChoice::Confirmed(C::ReadPropertyMultiple),
            Self::WriteProperty(_) => ServiceChoice::Confirmed(C::WriteProperty),
            Self::SubscribeCov(_) => ServiceChoice::Confirmed(C::SubscribeCOV),
            Self::SubscribeCovProperty(_) => ServiceChoice::Confirmed(C::SubscribeCOVProperty),
            Self::ReadRange(_) => ServiceChoice::Confirmed(C::ReadRange),
            Self::DeviceCommunicationControl(_) => {
                ServiceChoice::Confirmed(C::DeviceCommunicationControl)
            }
            Self::AddListElement(_) => ServiceChoice::Confirmed(C::AddListElement),
            Self::RemoveListElement(_) => ServiceChoice::Confirmed(C::RemoveListElement),
            Self::GetEventInformation(_) => ServiceChoice::Confirmed(C::GetEventInformation),
            Self::Unhandled(choice) => *choice,
        }
    }
}

/// A decoded request handed to the device by the codec
#[derive(Debug, Clone, PartialEq)]
pub struct InboundRequest {
    pub header: RequestHeader,
    pub request: ServiceRequest,
}

impl InboundRequest {
    pub fn new(header: RequestHeader, request: ServiceRequest) -> Self {
        Self { header, request }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;

    #[test]
    fn test_who_is_ranges() {
        let everyone = WhoIsRequest::new();
        assert!(everyone.matches(0));
        assert!(everyone.matches(4_194_302));

        let one = WhoIsRequest::for_device(1000);
        assert!(one.matches(1000));
        assert!(!one.matches(1001));

        let range = WhoIsRequest::for_range(1000, 1099);
        assert!(range.matches(1000) && range.matches(1099));
        assert!(!range.matches(999) && !range.matches(1100));

        let open_ended = WhoIsRequest {
            device_instance_range_low_limit: Some(500),
            device_instance_range_high_limit: None,
        };
        assert!(open_ended.matches(4_000_000));
        assert!(!open_ended.matches(499));
    }

    #[test]
    fn test_service_choice_conversions() {
        assert_eq!(
            ConfirmedServiceChoice::try_from(12).unwrap(),
            ConfirmedServiceChoice::ReadProperty
        );
        assert_eq!(
            UnconfirmedServiceChoice::try_from(8).unwrap(),
            UnconfirmedServiceChoice::WhoIs
        );
        let err = ConfirmedServiceChoice::try_from(200).unwrap_err();
        assert_eq!(err.code(), crate::error::ErrorCode::ServiceRequestDenied);
    }

    #[test]
    fn test_request_service_choice() {
        let request = ServiceRequest::ReadRange(ReadRangeRequest {
            object_identifier: ObjectIdentifier::new(ObjectType::TrendLog, 1),
            property_identifier: PropertyIdentifier::from(131u32),
            property_array_index: None,
        });
        assert_eq!(
            request.service_choice(),
            ServiceChoice::Confirmed(ConfirmedServiceChoice::ReadRange)
        );
        assert_eq!(request.service_choice().to_string(), "ReadRange");
    }

    #[test]
    fn test_address_display() {
        let local = Address::local(vec![0xc0, 0xa8, 0x01, 0x0a, 0xba, 0xc0]);
        assert_eq!(local.to_string(), "c0a8010abac0");
        let remote = Address::remote(5, vec![0x21]);
        assert_eq!(remote.to_string(), "5:21");
    }
}
