//! COV Device Example
//!
//! Runs a small device with a simulated peer instead of a network:
//! - Who-Is discovery
//! - SubscribeCOV on a temperature sensor
//! - sensor updates below and above the COV increment
//! - a WriteProperty to a setpoint
//!
//! Every frame the device would send is printed by a logging codec. Run with
//! `RUST_LOG=debug` to see the device's own log output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bacnet_device::object::analog::{AnalogInput, AnalogValue};
use bacnet_device::object::numeric::NumericOptions;
use bacnet_device::object::EngineeringUnits;
use bacnet_device::service::{
    Address, Codec, CodecError, ConfirmedServiceChoice, CovNotification, IAmRequest,
    InboundRequest, ReadAccessResult, ReadPropertyResponse, RequestHeader, ServiceChoice,
    ServiceRequest, SubscribeCovRequest, WhoIsRequest, WritePropertyRequest,
};
use bacnet_device::{
    BacnetError, BacnetObject, Device, DeviceEvent, DeviceOptions, PropertyData,
    PropertyIdentifier, PropertyValue,
};
use tokio::sync::mpsc;

/// Prints outgoing frames instead of encoding them.
struct LoggingCodec;

#[async_trait]
impl Codec for LoggingCodec {
    async fn simple_ack(
        &self,
        header: &RequestHeader,
        service: ConfirmedServiceChoice,
    ) -> Result<(), CodecError> {
        println!("-> {} SimpleACK {:?}", header.sender, service);
        Ok(())
    }

    async fn error(
        &self,
        header: &RequestHeader,
        service: ServiceChoice,
        error: &BacnetError,
    ) -> Result<(), CodecError> {
        println!("-> {} Error {}: {}", header.sender, service, error);
        Ok(())
    }

    async fn read_property_ack(
        &self,
        header: &RequestHeader,
        response: &ReadPropertyResponse,
    ) -> Result<(), CodecError> {
        println!(
            "-> {} ReadProperty-ACK {} {} = {:?}",
            header.sender,
            response.object_identifier,
            response.property_identifier,
            response.property_value
        );
        Ok(())
    }

    async fn read_property_multiple_ack(
        &self,
        header: &RequestHeader,
        results: &[ReadAccessResult],
    ) -> Result<(), CodecError> {
        println!("-> {} ReadPropertyMultiple-ACK ({} objects)", header.sender, results.len());
        Ok(())
    }

    async fn i_am(&self, header: &RequestHeader, i_am: &IAmRequest) -> Result<(), CodecError> {
        println!(
            "-> {} I-Am {} (max APDU {}, vendor {})",
            header.sender, i_am.device_identifier, i_am.max_apdu_length_accepted, i_am.vendor_identifier
        );
        Ok(())
    }

    async fn confirmed_cov_notification(
        &self,
        receiver: &Address,
        notification: &CovNotification,
    ) -> Result<(), CodecError> {
        print_notification("Confirmed", receiver, notification);
        Ok(())
    }

    async fn unconfirmed_cov_notification(
        &self,
        receiver: &Address,
        notification: &CovNotification,
    ) -> Result<(), CodecError> {
        print_notification("Unconfirmed", receiver, notification);
        Ok(())
    }
}

fn print_notification(kind: &str, receiver: &Address, notification: &CovNotification) {
    for entry in &notification.list_of_values {
        println!(
            "-> {} {}COVNotification {} {} = {:?} ({}s left)",
            receiver,
            kind,
            notification.monitored_object_identifier,
            entry.property_identifier,
            entry.value,
            notification.time_remaining
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("BACnet COV Device Example");
    println!("=========================\n");

    let mut options = DeviceOptions::named("Demo AHU");
    options.vendor_name = "bacnet-device".to_string();
    options.model_name = "COV demo".to_string();
    let device = Device::new(2001, options, Arc::new(LoggingCodec))?;

    let mut sensor_options =
        NumericOptions::new("Supply Air Temp", EngineeringUnits::DegreesCelsius);
    sensor_options.present_value = 18.0;
    sensor_options.cov_increment = 0.5;
    let sensor = device.add_object(AnalogInput::new(sensor_options)?)?;

    let mut setpoint_options = NumericOptions::new("Setpoint", EngineeringUnits::DegreesCelsius);
    setpoint_options.present_value = 21.0;
    setpoint_options.writable = true;
    setpoint_options.min_present_value = 15.0;
    setpoint_options.max_present_value = 28.0;
    let setpoint = device.add_object(AnalogValue::new(setpoint_options)?)?;

    let mut events = device.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let DeviceEvent::Error { service, error } = event {
                eprintln!("handler for {} failed: {}", service, error);
            }
        }
    });

    let (requests, inbox) = mpsc::channel(16);
    let server = device.clone();
    let serving = tokio::spawn(async move { server.serve(inbox).await });

    let peer = Address::local(vec![192, 168, 1, 20, 0xBA, 0xC0]);
    let sensor_id = sensor
        .identifier()
        .ok_or("sensor is not attached")?;
    let setpoint_id = setpoint
        .identifier()
        .ok_or("setpoint is not attached")?;

    println!("<- Who-Is");
    requests
        .send(InboundRequest::new(
            RequestHeader::unconfirmed(peer.clone()),
            ServiceRequest::WhoIs(WhoIsRequest::new()),
        ))
        .await?;

    println!("<- SubscribeCOV {}", sensor_id);
    requests
        .send(InboundRequest::new(
            RequestHeader::confirmed(peer.clone(), 1),
            ServiceRequest::SubscribeCov(SubscribeCovRequest::new(1, sensor_id, false, 300)),
        ))
        .await?;

    println!("<- WriteProperty {} = 35.0 (out of range)", setpoint_id);
    requests
        .send(InboundRequest::new(
            RequestHeader::confirmed(peer.clone(), 2),
            ServiceRequest::WriteProperty(WritePropertyRequest::new(
                setpoint_id,
                PropertyIdentifier::PresentValue,
                PropertyData::Single(PropertyValue::Real(35.0)),
            )),
        ))
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;

    for reading in [18.2, 18.4, 18.7, 19.5, 19.6] {
        println!("sensor reads {reading}");
        sensor
            .present_value
            .set_value(PropertyValue::Real(reading))
            .await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    println!("\nActive COV subscriptions:");
    for record in device.subscriptions().snapshot() {
        println!(
            "  {} process {} on {} ({}s left)",
            record.recipient, record.process_id, record.monitored_object, record.time_remaining
        );
    }

    drop(requests);
    serving.await?;
    Ok(())
}
