use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bacnet_device::object::analog::AnalogValue;
use bacnet_device::object::multistate::{MultiStateValue, MultiStateValueOptions};
use bacnet_device::object::numeric::NumericOptions;
use bacnet_device::object::EngineeringUnits;
use bacnet_device::service::{
    Address, Codec, CodecError, ConfirmedServiceChoice, CovNotification, IAmRequest,
    InboundRequest, ReadAccessResult, ReadPropertyResponse, RequestHeader, ServiceChoice,
    ServiceRequest, SubscribeCovRequest,
};
use bacnet_device::{
    BacnetError, BacnetObject, Device, DeviceOptions, ObjectIdentifier, PropertyData,
    PropertyValue,
};
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Frame {
    Ack(ConfirmedServiceChoice),
    Error(ServiceChoice),
    Cov(Address, CovNotification),
    Other,
}

#[derive(Default)]
struct CaptureCodec {
    frames: Mutex<Vec<Frame>>,
}

impl CaptureCodec {
    fn record(&self, frame: Frame) -> Result<(), CodecError> {
        self.frames.lock().push(frame);
        Ok(())
    }

    fn notifications(&self) -> Vec<(Address, CovNotification)> {
        self.frames
            .lock()
            .iter()
            .filter_map(|frame| match frame {
                Frame::Cov(address, notification) => Some((address.clone(), notification.clone())),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Codec for CaptureCodec {
    async fn simple_ack(
        &self,
        _header: &RequestHeader,
        service: ConfirmedServiceChoice,
    ) -> Result<(), CodecError> {
        self.record(Frame::Ack(service))
    }

    async fn error(
        &self,
        _header: &RequestHeader,
        service: ServiceChoice,
        _error: &BacnetError,
    ) -> Result<(), CodecError> {
        self.record(Frame::Error(service))
    }

    async fn read_property_ack(
        &self,
        _header: &RequestHeader,
        _response: &ReadPropertyResponse,
    ) -> Result<(), CodecError> {
        self.record(Frame::Other)
    }

    async fn read_property_multiple_ack(
        &self,
        _header: &RequestHeader,
        _results: &[ReadAccessResult],
    ) -> Result<(), CodecError> {
        self.record(Frame::Other)
    }

    async fn i_am(&self, _header: &RequestHeader, _i_am: &IAmRequest) -> Result<(), CodecError> {
        self.record(Frame::Other)
    }

    async fn confirmed_cov_notification(
        &self,
        receiver: &Address,
        notification: &CovNotification,
    ) -> Result<(), CodecError> {
        self.record(Frame::Cov(receiver.clone(), notification.clone()))
    }

    async fn unconfirmed_cov_notification(
        &self,
        receiver: &Address,
        notification: &CovNotification,
    ) -> Result<(), CodecError> {
        self.record(Frame::Cov(receiver.clone(), notification.clone()))
    }
}

fn peer(last: u8) -> Address {
    Address::local(vec![10, 0, 0, last, 0xBA, 0xC0])
}

fn subscribe(from: Address, object: ObjectIdentifier, lifetime: u32) -> InboundRequest {
    InboundRequest::new(
        RequestHeader::confirmed(from, 1),
        ServiceRequest::SubscribeCov(SubscribeCovRequest::new(11, object, false, lifetime)),
    )
}

async fn settle(device: &Device) {
    tokio::task::yield_now().await;
    while device.cov_backlog() > 0 {
        tokio::task::yield_now().await;
    }
}

fn setup() -> (Device, Arc<CaptureCodec>, AnalogValue) {
    let codec = Arc::new(CaptureCodec::default());
    let device = Device::new(77, DeviceOptions::named("Plant"), codec.clone()).unwrap();
    let mut options = NumericOptions::new("Chilled Water Temp", EngineeringUnits::DegreesCelsius);
    options.present_value = 7.0;
    options.cov_increment = 1.0;
    let sensor = device.add_object(AnalogValue::new(options).unwrap()).unwrap();
    (device, codec, sensor)
}

#[tokio::test(start_paused = true)]
async fn test_notifications_follow_increment_and_lifetime() {
    let (device, codec, sensor) = setup();
    let id = sensor.identifier().unwrap();

    device.handle(subscribe(peer(5), id, 30)).await;
    assert_eq!(
        codec.frames.lock().as_slice(),
        [Frame::Ack(ConfirmedServiceChoice::SubscribeCOV)]
    );

    sensor.present_value.set_value(PropertyValue::Real(7.4)).await.unwrap();
    settle(&device).await;
    assert!(codec.notifications().is_empty());

    sensor.present_value.set_value(PropertyValue::Real(8.2)).await.unwrap();
    settle(&device).await;
    let notifications = codec.notifications();
    assert_eq!(notifications.len(), 1);
    let (receiver, notification) = &notifications[0];
    assert_eq!(receiver, &peer(5));
    assert_eq!(notification.monitored_object_identifier, id);
    assert_eq!(notification.time_remaining, 30);
    assert_eq!(
        notification.list_of_values[0].value,
        PropertyData::Single(PropertyValue::Real(8.2))
    );

    // measured from the last sent value, not the previous write
    sensor.present_value.set_value(PropertyValue::Real(8.9)).await.unwrap();
    settle(&device).await;
    assert_eq!(codec.notifications().len(), 1);

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert!(device.subscriptions().is_empty());
    sensor.present_value.set_value(PropertyValue::Real(20.0)).await.unwrap();
    settle(&device).await;
    assert_eq!(codec.notifications().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_each_subscriber_is_notified() {
    let (device, codec, sensor) = setup();
    let id = sensor.identifier().unwrap();

    device.handle(subscribe(peer(5), id, 0)).await;
    device.handle(subscribe(peer(6), id, 60)).await;
    // resubscribing refreshes instead of adding a third subscriber
    device.handle(subscribe(peer(6), id, 120)).await;
    assert_eq!(device.subscriptions().len(), 2);

    sensor.present_value.set_value(PropertyValue::Real(12.0)).await.unwrap();
    settle(&device).await;

    let mut receivers: Vec<Address> = codec
        .notifications()
        .into_iter()
        .map(|(receiver, _)| receiver)
        .collect();
    receivers.sort_by_key(|address| address.mac.clone());
    assert_eq!(receivers, vec![peer(5), peer(6)]);
}

#[tokio::test]
async fn test_non_numeric_changes_always_notify() {
    let codec = Arc::new(CaptureCodec::default());
    let device = Device::new(78, DeviceOptions::default(), codec.clone()).unwrap();
    let mode = device
        .add_object(
            MultiStateValue::new(MultiStateValueOptions {
                name: "Plant Mode".into(),
                states: vec!["Off".into(), "Cooling".into(), "Free Cooling".into()],
                ..Default::default()
            })
            .unwrap(),
        )
        .unwrap();

    device
        .handle(subscribe(peer(9), mode.identifier().unwrap(), 300))
        .await;
    mode.set_state(2).await.unwrap();
    mode.set_state(3).await.unwrap();
    settle(&device).await;

    let values: Vec<PropertyData> = codec
        .notifications()
        .into_iter()
        .map(|(_, notification)| notification.list_of_values[0].value.clone())
        .collect();
    assert_eq!(
        values,
        vec![
            PropertyData::Single(PropertyValue::UnsignedInteger(2)),
            PropertyData::Single(PropertyValue::UnsignedInteger(3)),
        ]
    );
}
