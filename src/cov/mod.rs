//! Change of Value (COV) subscriptions and notification dispatch.
//!
//! A peer subscribes to an object's Present_Value with SubscribeCOV. The
//! resulting [`Subscription`] lives in the device's [`SubscriptionStore`]
//! until its lifetime elapses. Every committed property change of an attached
//! object is handed to the device's dispatcher as a [`QueuedCov`]; the
//! dispatcher looks up the subscriptions of that property, filters numeric
//! changes smaller than the object's COV_Increment, and sends confirmed or
//! unconfirmed notifications through the [`Codec`](crate::service::Codec).

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::Result;
use crate::object::{ObjectIdentifier, PropertyIdentifier};
use crate::property::PropertyData;
use crate::service::Address;
use crate::uid::{property_uid, PropertyUid};

mod dispatcher;
mod store;

pub(crate) use dispatcher::{CovDispatcher, CovJob};
pub use store::SubscriptionStore;

/// A committed property change waiting to be dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedCov {
    pub object: ObjectIdentifier,
    pub property: PropertyIdentifier,
    pub data: PropertyData,
}

/// Entry of the device's Active_COV_Subscriptions property.
#[derive(Debug, Clone, PartialEq)]
pub struct CovSubscriptionRecord {
    pub recipient: Address,
    pub process_id: u32,
    pub monitored_object: ObjectIdentifier,
    pub monitored_property: PropertyIdentifier,
    pub issue_confirmed_notifications: bool,
    /// Whole seconds left, 0 for subscriptions without expiry
    pub time_remaining: u32,
    pub cov_increment: Option<f32>,
}

#[derive(Debug)]
struct SubscriptionState {
    expires_at: Option<Instant>,
    last_value_sent: Option<PropertyData>,
    notification_count: u64,
}

/// An active COV subscription.
#[derive(Debug)]
pub struct Subscription {
    subscriber: Address,
    process_id: u32,
    monitored_object: ObjectIdentifier,
    monitored_property: PropertyIdentifier,
    issue_confirmed: bool,
    uid: PropertyUid,
    state: Mutex<SubscriptionState>,
}

impl Subscription {
    /// Creates a subscription expiring `lifetime` from now. A zero lifetime
    /// never expires.
    pub fn new(
        subscriber: Address,
        process_id: u32,
        monitored_object: ObjectIdentifier,
        monitored_property: PropertyIdentifier,
        issue_confirmed: bool,
        lifetime: Duration,
    ) -> Result<Self> {
        let uid = property_uid(&monitored_object, monitored_property)?;
        Ok(Self {
            subscriber,
            process_id,
            monitored_object,
            monitored_property,
            issue_confirmed,
            uid,
            state: Mutex::new(SubscriptionState {
                expires_at: expiry(lifetime),
                last_value_sent: None,
                notification_count: 0,
            }),
        })
    }

    pub fn subscriber(&self) -> &Address {
        &self.subscriber
    }

    pub fn process_id(&self) -> u32 {
        self.process_id
    }

    pub fn monitored_object(&self) -> ObjectIdentifier {
        self.monitored_object
    }

    pub fn monitored_property(&self) -> PropertyIdentifier {
        self.monitored_property
    }

    pub fn issue_confirmed(&self) -> bool {
        self.issue_confirmed
    }

    pub fn uid(&self) -> PropertyUid {
        self.uid
    }

    /// `None` for subscriptions without expiry
    pub fn expires_at(&self) -> Option<Instant> {
        self.state.lock().expires_at
    }

    pub fn time_remaining(&self) -> Duration {
        self.expires_at()
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at().is_some_and(|at| at <= now)
    }

    pub fn last_value_sent(&self) -> Option<PropertyData> {
        self.state.lock().last_value_sent.clone()
    }

    pub fn notification_count(&self) -> u64 {
        self.state.lock().notification_count
    }

    /// Same subscriber, process and monitored property.
    pub fn same_subscriber(&self, other: &Subscription) -> bool {
        self.uid == other.uid
            && self.process_id == other.process_id
            && self.subscriber == other.subscriber
    }

    pub(crate) fn refresh(&self, expires_at: Option<Instant>) {
        self.state.lock().expires_at = expires_at;
    }

    pub(crate) fn seed(&self, data: PropertyData) {
        self.state.lock().last_value_sent = Some(data);
    }

    /// Whether a change to `data` is worth a notification given the
    /// hysteresis `increment` of the monitored object.
    pub(crate) fn should_notify(
        &self,
        property: PropertyIdentifier,
        data: &PropertyData,
        increment: Option<f64>,
    ) -> bool {
        if property != PropertyIdentifier::PresentValue {
            return true;
        }
        let state = self.state.lock();
        let last = state.last_value_sent.as_ref().and_then(PropertyData::as_f64);
        match (last, data.as_f64(), increment) {
            (Some(last), Some(new), Some(increment)) => (new - last).abs() >= increment,
            _ => true,
        }
    }

    /// Records `data` as sent and returns the updated notification count.
    pub(crate) fn record_sent(&self, data: PropertyData) -> u64 {
        let mut state = self.state.lock();
        state.last_value_sent = Some(data);
        state.notification_count += 1;
        state.notification_count
    }

    pub fn record(&self) -> CovSubscriptionRecord {
        CovSubscriptionRecord {
            recipient: self.subscriber.clone(),
            process_id: self.process_id,
            monitored_object: self.monitored_object,
            monitored_property: self.monitored_property,
            issue_confirmed_notifications: self.issue_confirmed,
            time_remaining: self.time_remaining().as_secs() as u32,
            cov_increment: None,
        }
    }
}

pub(crate) fn expiry(lifetime: Duration) -> Option<Instant> {
    if lifetime.is_zero() {
        None
    } else {
        Some(Instant::now() + lifetime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use crate::property::PropertyValue;

    fn subscription(lifetime: u64) -> Subscription {
        Subscription::new(
            Address::local(vec![192, 168, 1, 20, 0xBA, 0xC0]),
            7,
            ObjectIdentifier::new(ObjectType::AnalogValue, 1),
            PropertyIdentifier::PresentValue,
            false,
            Duration::from_secs(lifetime),
        )
        .unwrap()
    }

    fn real(v: f32) -> PropertyData {
        PropertyData::Single(PropertyValue::Real(v))
    }

    #[test]
    fn test_hysteresis() {
        let sub = subscription(60);
        let pv = PropertyIdentifier::PresentValue;

        // nothing sent yet
        assert!(sub.should_notify(pv, &real(0.1), Some(1.0)));

        sub.record_sent(real(0.0));
        assert!(!sub.should_notify(pv, &real(0.5), Some(1.0)));
        assert!(sub.should_notify(pv, &real(1.0), Some(1.0)));
        assert!(sub.should_notify(pv, &real(-2.0), Some(1.0)));
        assert!(sub.should_notify(pv, &real(0.5), None));
        assert!(sub.should_notify(PropertyIdentifier::StatusFlags, &real(0.5), Some(1.0)));
        assert_eq!(sub.notification_count(), 1);
    }

    #[test]
    fn test_non_numeric_values_always_notify() {
        let sub = subscription(60);
        sub.record_sent(PropertyData::Single(PropertyValue::Enumerated(0)));
        assert!(sub.should_notify(
            PropertyIdentifier::PresentValue,
            &PropertyData::Single(PropertyValue::Enumerated(0)),
            Some(1.0)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_remaining() {
        let sub = subscription(60);
        tokio::time::advance(Duration::from_millis(10_500)).await;
        assert_eq!(sub.record().time_remaining, 49);
        assert!(!sub.is_expired_at(Instant::now()));
        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(sub.is_expired_at(Instant::now()));
        assert_eq!(sub.time_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_lifetime_never_expires() {
        let sub = subscription(0);
        assert_eq!(sub.expires_at(), None);
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(!sub.is_expired_at(Instant::now()));
    }
}
