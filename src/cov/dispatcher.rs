//! COV dispatcher.
//!
//! Property changes are handed over through an unbounded channel and
//! processed one at a time, in order, by a worker task owned by the device.
//! Writers never wait for delivery. The number of queued jobs is tracked so
//! that a growing backlog is visible through
//! [`Device::cov_backlog`](crate::object::device::Device::cov_backlog) and in
//! the log.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, warn};
use tokio::sync::{broadcast, mpsc};

use super::{QueuedCov, Subscription};
use crate::object::device::{DeviceCore, DeviceEvent};
use crate::object::PropertyIdentifier;
use crate::property::PropertyData;
use crate::service::{Codec, CovNotification, PropertyValueEntry};
use crate::uid::property_uid;

/// Unit of work of the dispatcher.
#[derive(Debug)]
pub(crate) enum CovJob {
    /// A committed change, checked against every subscription of the property
    Change(QueuedCov),
    /// First notification of a new subscription, sent without hysteresis
    Initial {
        subscription: Arc<Subscription>,
        data: PropertyData,
    },
}

/// Sending half of the dispatcher.
#[derive(Debug)]
pub(crate) struct CovDispatcher {
    sender: mpsc::UnboundedSender<CovJob>,
    backlog: Arc<AtomicUsize>,
    warn_above: usize,
}

impl CovDispatcher {
    /// Starts the worker for the device behind `core`. The worker stops once
    /// the dispatcher is dropped.
    pub(crate) fn spawn(
        core: Weak<DeviceCore>,
        codec: Arc<dyn Codec>,
        events: broadcast::Sender<DeviceEvent>,
        warn_above: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let backlog = Arc::new(AtomicUsize::new(0));
        let worker = Worker {
            core,
            codec,
            events,
            backlog: backlog.clone(),
        };
        tokio::spawn(worker.run(receiver));
        Self {
            sender,
            backlog,
            warn_above,
        }
    }

    /// Queues `job` without waiting for it to be processed.
    pub(crate) fn enqueue(&self, job: CovJob) {
        let depth = self.backlog.fetch_add(1, Ordering::AcqRel) + 1;
        if depth > self.warn_above {
            warn!("COV backlog at {depth} jobs, subscribers are not keeping up");
        }
        if self.sender.send(job).is_err() {
            self.backlog.fetch_sub(1, Ordering::AcqRel);
            debug!("COV dispatcher stopped, dropping change");
        }
    }

    pub(crate) fn backlog(&self) -> usize {
        self.backlog.load(Ordering::Acquire)
    }
}

struct Worker {
    core: Weak<DeviceCore>,
    codec: Arc<dyn Codec>,
    events: broadcast::Sender<DeviceEvent>,
    backlog: Arc<AtomicUsize>,
}

impl Worker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<CovJob>) {
        while let Some(job) = receiver.recv().await {
            let Some(core) = self.core.upgrade() else {
                break;
            };
            match job {
                CovJob::Change(change) => self.process(&core, change).await,
                CovJob::Initial { subscription, data } => {
                    subscription.record_sent(data.clone());
                    self.deliver(&core, &subscription, data).await;
                }
            }
            self.backlog.fetch_sub(1, Ordering::AcqRel);
        }
        debug!("COV dispatcher finished");
    }

    async fn process(&self, core: &DeviceCore, change: QueuedCov) {
        let uid = match property_uid(&change.object, change.property) {
            Ok(uid) => uid,
            Err(err) => {
                warn!("cannot dispatch change of {}: {}", change.object, err);
                return;
            }
        };
        let subscriptions = core.subscriptions().subscriptions_for(uid);
        if subscriptions.is_empty() {
            return;
        }

        let increment = if change.property == PropertyIdentifier::PresentValue {
            core.object(&change.object)
                .and_then(|object| object.cov_increment())
        } else {
            None
        };

        for subscription in subscriptions {
            if !subscription.should_notify(change.property, &change.data, increment) {
                debug!(
                    "change of {} {} below COV increment for {}",
                    change.object,
                    change.property,
                    subscription.subscriber()
                );
                continue;
            }
            subscription.record_sent(change.data.clone());
            self.deliver(core, &subscription, change.data.clone()).await;
        }
    }

    async fn deliver(&self, core: &DeviceCore, subscription: &Subscription, data: PropertyData) {
        let notification = CovNotification {
            subscriber_process_identifier: subscription.process_id(),
            initiating_device_identifier: core.identifier(),
            monitored_object_identifier: subscription.monitored_object(),
            time_remaining: subscription.time_remaining().as_secs() as u32,
            list_of_values: vec![PropertyValueEntry {
                property_identifier: subscription.monitored_property(),
                property_array_index: None,
                value: data,
                priority: None,
            }],
        };
        let receiver = subscription.subscriber();

        let sent = if subscription.issue_confirmed() {
            self.codec
                .confirmed_cov_notification(receiver, &notification)
                .await
        } else {
            self.codec
                .unconfirmed_cov_notification(receiver, &notification)
                .await
        };

        match sent {
            Ok(()) => debug!(
                "COV notification for {} sent to {} (process {})",
                notification.monitored_object_identifier,
                receiver,
                notification.subscriber_process_identifier
            ),
            Err(error) => {
                warn!(
                    "COV notification for {} to {} failed: {}",
                    notification.monitored_object_identifier, receiver, error
                );
                let _ = self.events.send(DeviceEvent::CovDeliveryFailed {
                    subscriber: receiver.clone(),
                    process_id: notification.subscriber_process_identifier,
                    object: notification.monitored_object_identifier,
                    error,
                });
            }
        }
    }
}
