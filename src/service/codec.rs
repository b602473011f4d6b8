//! Outbound side of the wire codec collaborator.

use async_trait::async_trait;
use thiserror::Error;

use super::{
    AbortReason, Address, ConfirmedServiceChoice, CovNotification, IAmRequest, ReadAccessResult,
    ReadPropertyResponse, RejectReason, RequestHeader, ServiceChoice,
};
use crate::error::{BacnetError, ErrorClass, ErrorCode};

/// Failure reported by the codec while sending
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("no acknowledgement before timeout")]
    Timeout,
    #[error("remote error {class}: {code}")]
    Remote { class: ErrorClass, code: ErrorCode },
    #[error("rejected by remote: {0:?}")]
    Rejected(RejectReason),
    #[error("aborted by remote: {0:?}")]
    Aborted(AbortReason),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Encoder and transport the device answers and notifies through.
///
/// Implementations own addressing, APDU encoding, segmentation and retries.
/// Replies take the header of the request they answer so the codec can pick
/// the destination and invoke id.
#[async_trait]
pub trait Codec: Send + Sync {
    /// Simple-ACK for a confirmed request.
    async fn simple_ack(
        &self,
        header: &RequestHeader,
        service: ConfirmedServiceChoice,
    ) -> Result<(), CodecError>;

    /// Error-PDU carrying the class and code of `error`.
    async fn error(
        &self,
        header: &RequestHeader,
        service: ServiceChoice,
        error: &BacnetError,
    ) -> Result<(), CodecError>;

    async fn read_property_ack(
        &self,
        header: &RequestHeader,
        response: &ReadPropertyResponse,
    ) -> Result<(), CodecError>;

    async fn read_property_multiple_ack(
        &self,
        header: &RequestHeader,
        results: &[ReadAccessResult],
    ) -> Result<(), CodecError>;

    /// I-Am in answer to the Who-Is carried by `header`.
    async fn i_am(&self, header: &RequestHeader, i_am: &IAmRequest) -> Result<(), CodecError>;

    /// Resolves once the receiver acknowledged the notification.
    async fn confirmed_cov_notification(
        &self,
        receiver: &Address,
        notification: &CovNotification,
    ) -> Result<(), CodecError>;

    /// Resolves once the notification was handed to the transport.
    async fn unconfirmed_cov_notification(
        &self,
        receiver: &Address,
        notification: &CovNotification,
    ) -> Result<(), CodecError>;
}
