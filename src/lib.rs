#![doc = include_str!("../README.md")]

pub mod app;
pub mod cov;
pub mod error;
pub mod object;
pub mod property;
pub mod queue;
pub mod service;
pub mod uid;
pub mod util;

// Re-export main types without glob imports to avoid conflicts
pub use app::HandlerError;
pub use cov::{CovSubscriptionRecord, Subscription, SubscriptionStore};
pub use error::{BacnetError, ErrorClass, ErrorCode, Result};
pub use object::device::{Device, DeviceEvent, DeviceOptions};
pub use object::{BacnetObject, ObjectIdentifier, ObjectNode, ObjectType, PropertyIdentifier};
pub use property::{AccessContext, ApplicationTag, Property, PropertyData, PropertyValue};
pub use queue::TaskQueue;
pub use service::{Codec, CodecError, ConfirmedServiceChoice, InboundRequest, UnconfirmedServiceChoice};

#[doc(hidden)]
pub mod __private {
    pub use pastey::paste;
}

pub const BACNET_PROTOCOL_VERSION: u8 = 1;
pub const BACNET_MAX_APDU: usize = 1476;

/// Array index addressing a whole array property
pub const BACNET_ARRAY_ALL: u32 = 0xFFFF_FFFF;
