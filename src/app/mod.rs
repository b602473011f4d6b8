//! BACnet Application Layer Module
//!
//! Request handling of a [`Device`]. The codec collaborator decodes APDUs
//! into [`InboundRequest`]s; the device answers each one through the same
//! codec.
//!
//! # Overview
//!
//! [`Device::handle`] runs a single request to completion:
//!
//! - Who-Is is answered with I-Am when the device falls inside the range
//! - I-Am from other devices is remembered in [`Device::known_devices`]
//! - ReadProperty, ReadPropertyMultiple and WriteProperty run inside the
//!   addressed object's queue
//! - SubscribeCOV creates or refreshes a subscription on Present_Value
//! - every other service is denied
//!
//! # Failures
//!
//! A handler failing with a [`BacnetError`] answers with an Error-PDU carrying
//! its class and code. Any other failure, including a panic inside the
//! handler, answers with `DEVICE / INTERNAL_ERROR` and is published as
//! [`DeviceEvent::Error`]. Nothing a handler does stops [`Device::serve`].
//!
//! # Example
//!
//! ```no_run
//! use bacnet_device::object::device::Device;
//! use bacnet_device::service::InboundRequest;
//! use tokio::sync::mpsc;
//!
//! async fn run(device: Device, requests: mpsc::Receiver<InboundRequest>) {
//!     // returns once the codec drops its sender
//!     device.serve(requests).await;
//! }
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::cov::{CovJob, Subscription};
use crate::error::BacnetError;
use crate::object::device::{Device, DeviceEvent};
use crate::object::PropertyIdentifier;
use crate::property::AccessContext;
use crate::service::{
    CodecError, ConfirmedServiceChoice, IAmRequest, InboundRequest, ReadAccessResult,
    ReadPropertyMultipleRequest, ReadPropertyRequest, ReadPropertyResponse, ReadResult,
    RequestHeader, ServiceChoice, ServiceRequest, SubscribeCovRequest, WhoIsRequest,
    WritePropertyRequest,
};

/// Failure of a request handler
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HandlerError {
    /// Protocol error, reported to the requester as is
    #[error(transparent)]
    Bacnet(#[from] BacnetError),
    #[error("codec failure: {0}")]
    Codec(#[from] CodecError),
    #[error("handler panicked: {0}")]
    Panic(String),
}

type HandlerResult = std::result::Result<(), HandlerError>;

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl Device {
    /// Processes requests until the sending side of `requests` is dropped.
    pub async fn serve(&self, mut requests: mpsc::Receiver<InboundRequest>) {
        info!("device {} serving requests", self.identifier());
        while let Some(request) = requests.recv().await {
            self.handle(request).await;
        }
        info!("request channel of device {} closed", self.identifier());
    }

    /// Processes one request, answering it through the codec.
    pub async fn handle(&self, request: InboundRequest) {
        let InboundRequest { header, request } = request;
        let service = request.service_choice();
        debug!(
            "req #{:?} from {}: {}",
            header.invoke_id, header.sender, service
        );

        let outcome = AssertUnwindSafe(self.dispatch(&header, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(HandlerError::Panic(panic_message(panic))));

        if let Err(error) = outcome {
            self.report(&header, service, error).await;
        }
    }

    async fn dispatch(&self, header: &RequestHeader, request: ServiceRequest) -> HandlerResult {
        let service = request.service_choice();
        match request {
            ServiceRequest::WhoIs(request) => self.who_is(header, request).await,
            ServiceRequest::IAm(announcement) => {
                self.i_am_received(announcement);
                Ok(())
            }
            ServiceRequest::ReadProperty(request) => self.read_property(header, request).await,
            ServiceRequest::ReadPropertyMultiple(request) => {
                self.read_property_multiple(header, request).await
            }
            ServiceRequest::WriteProperty(request) => self.write_property(header, request).await,
            ServiceRequest::SubscribeCov(request) => self.subscribe_cov(header, request).await,
            ServiceRequest::IHave(_)
            | ServiceRequest::WhoHas(_)
            | ServiceRequest::SubscribeCovProperty(_)
            | ServiceRequest::ReadRange(_)
            | ServiceRequest::DeviceCommunicationControl(_)
            | ServiceRequest::AddListElement(_)
            | ServiceRequest::RemoveListElement(_)
            | ServiceRequest::GetEventInformation(_)
            | ServiceRequest::Unhandled(_) => self.unsupported(header, service).await,
        }
    }

    /// Translates a handler failure into an answer and, for non protocol
    /// failures, an event.
    async fn report(&self, header: &RequestHeader, service: ServiceChoice, error: HandlerError) {
        let answer = match &error {
            HandlerError::Bacnet(err) => {
                debug!("req #{:?} {}: {}", header.invoke_id, service, err);
                err.clone()
            }
            other => {
                error!(
                    "unexpected failure handling {} from {}: {}",
                    service, header.sender, other
                );
                self.core().publish(DeviceEvent::Error {
                    service,
                    error: other.clone(),
                });
                BacnetError::internal(other.to_string())
            }
        };
        if !header.expecting_reply {
            return;
        }
        if let Err(err) = self.core().codec().error(header, service, &answer).await {
            warn!("could not send error for {} to {}: {}", service, header.sender, err);
        }
    }

    async fn unsupported(&self, header: &RequestHeader, service: ServiceChoice) -> HandlerResult {
        info!("req #{:?}: {} (not supported)", header.invoke_id, service);
        if header.expecting_reply {
            self.core()
                .codec()
                .error(header, service, &BacnetError::service_request_denied())
                .await?;
        }
        Ok(())
    }

    async fn who_is(&self, header: &RequestHeader, request: WhoIsRequest) -> HandlerResult {
        if !request.matches(self.instance()) {
            debug!("who-is from {} does not cover {}", header.sender, self.instance());
            return Ok(());
        }
        self.core().codec().i_am(header, &self.i_am()).await?;
        Ok(())
    }

    fn i_am_received(&self, announcement: IAmRequest) {
        let identifier = announcement.device_identifier;
        if self.core().remember_device(announcement) {
            info!("discovered device {}", identifier);
        }
    }

    async fn read_property(&self, header: &RequestHeader, request: ReadPropertyRequest) -> HandlerResult {
        let object = self.get_object_by_identifier(&request.object_identifier)?;
        let ctx = AccessContext::now();
        let property_value = object
            .transaction(async {
                object.read_property(
                    request.property_identifier,
                    request.property_array_index,
                    &ctx,
                )
            })
            .await?;
        let response = ReadPropertyResponse {
            object_identifier: request.object_identifier,
            property_identifier: request.property_identifier,
            property_array_index: request.property_array_index,
            property_value,
        };
        self.core().codec().read_property_ack(header, &response).await?;
        Ok(())
    }

    async fn read_property_multiple(
        &self,
        header: &RequestHeader,
        request: ReadPropertyMultipleRequest,
    ) -> HandlerResult {
        let ctx = AccessContext::now();
        let mut results = Vec::with_capacity(request.read_access_specifications.len());
        for access in request.read_access_specifications {
            let object_results = match self.object(&access.object_identifier) {
                Some(object) => {
                    object
                        .transaction(async {
                            object.read_property_multiple(&access.property_references, &ctx)
                        })
                        .await
                }
                None => access
                    .property_references
                    .iter()
                    .map(|reference| ReadResult {
                        property_identifier: reference.property_identifier,
                        property_array_index: reference.property_array_index,
                        value: Err(BacnetError::unknown_object()),
                    })
                    .collect(),
            };
            results.push(ReadAccessResult {
                object_identifier: access.object_identifier,
                results: object_results,
            });
        }
        self.core()
            .codec()
            .read_property_multiple_ack(header, &results)
            .await?;
        Ok(())
    }

    async fn write_property(
        &self,
        header: &RequestHeader,
        request: WritePropertyRequest,
    ) -> HandlerResult {
        let Some(data) = request.property_value else {
            return Err(BacnetError::inconsistent_parameters("write without a value").into());
        };
        if let Some(priority) = request.priority {
            debug!("ignoring write priority {}", priority);
        }
        let object = self.get_object_by_identifier(&request.object_identifier)?;
        object
            .transaction(object.write_property(
                request.property_identifier,
                data,
                request.property_array_index,
            ))
            .await?;
        if header.expecting_reply {
            self.core()
                .codec()
                .simple_ack(header, ConfirmedServiceChoice::WriteProperty)
                .await?;
        }
        Ok(())
    }

    async fn subscribe_cov(
        &self,
        header: &RequestHeader,
        request: SubscribeCovRequest,
    ) -> HandlerResult {
        let object = self.get_object_by_identifier(&request.monitored_object_identifier)?;
        let present_value = object.property_or_err(PropertyIdentifier::PresentValue)?;
        let subscription = Subscription::new(
            header.sender.clone(),
            request.subscriber_process_identifier,
            request.monitored_object_identifier,
            PropertyIdentifier::PresentValue,
            request.issue_confirmed_notifications,
            Duration::from_secs(request.lifetime as u64),
        )?;

        // registered inside the queue so no write lands between the seed
        // read and the subscription becoming visible
        let ctx = AccessContext::now();
        object
            .transaction(async {
                let current = present_value.read_data(None, &ctx)?;
                let (subscription, refreshed) = self.subscriptions().add(subscription);
                if !refreshed {
                    subscription.seed(current.clone());
                    if self.core().options().send_initial_cov_notification {
                        self.core().enqueue_job(CovJob::Initial {
                            subscription,
                            data: current,
                        });
                    }
                }
                Ok::<_, BacnetError>(())
            })
            .await?;

        if header.expecting_reply {
            self.core()
                .codec()
                .simple_ack(header, ConfirmedServiceChoice::SubscribeCOV)
                .await?;
        }
        Ok(())
    }
}
