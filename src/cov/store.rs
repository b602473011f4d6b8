//! Subscription store.
//!
//! Subscriptions are indexed twice: a global list and a per-property map,
//! both kept sorted by ascending expiry. One timer task is armed for the
//! earliest expiry; when it fires every elapsed subscription is removed and
//! the timer is rearmed for the next one.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use log::{debug, info, warn};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{CovSubscriptionRecord, Subscription};
use crate::uid::PropertyUid;

#[derive(Debug)]
struct ExpiryTimer {
    deadline: Instant,
    task: JoinHandle<()>,
}

#[derive(Debug, Default)]
struct StoreState {
    all: Vec<Arc<Subscription>>,
    by_property: HashMap<PropertyUid, Vec<Arc<Subscription>>>,
    timer: Option<ExpiryTimer>,
}

// Subscriptions without expiry sort last.
fn sort_by_expiry(subscriptions: &mut [Arc<Subscription>]) {
    subscriptions.sort_by_key(|s| {
        let expires_at = s.expires_at();
        (expires_at.is_none(), expires_at)
    });
}

impl StoreState {
    fn sort(&mut self, uid: PropertyUid) {
        sort_by_expiry(&mut self.all);
        if let Some(subscriptions) = self.by_property.get_mut(&uid) {
            sort_by_expiry(subscriptions);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.all.first().and_then(|s| s.expires_at())
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    state: Mutex<StoreState>,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Some(timer) = self.state.get_mut().timer.take() {
            timer.task.abort();
        }
    }
}

/// Active COV subscriptions of a device.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionStore {
    inner: Arc<StoreInner>,
}

impl SubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `subscription`, or refreshes the expiry of the existing
    /// subscription of the same subscriber and process on the same property.
    ///
    /// Returns the stored subscription and whether it was a refresh.
    pub fn add(&self, subscription: Subscription) -> (Arc<Subscription>, bool) {
        let uid = subscription.uid();
        let mut state = self.inner.state.lock();

        let existing = state
            .by_property
            .get(&uid)
            .and_then(|subs| subs.iter().find(|s| s.same_subscriber(&subscription)))
            .cloned();

        let (stored, refreshed) = match existing {
            Some(existing) => {
                existing.refresh(subscription.expires_at());
                info!(
                    "refreshed COV subscription of {} (process {}) on {}",
                    existing.subscriber(),
                    existing.process_id(),
                    existing.monitored_object()
                );
                (existing, true)
            }
            None => {
                let stored = Arc::new(subscription);
                state.all.push(stored.clone());
                state.by_property.entry(uid).or_default().push(stored.clone());
                info!(
                    "new COV subscription of {} (process {}) on {}",
                    stored.subscriber(),
                    stored.process_id(),
                    stored.monitored_object()
                );
                (stored, false)
            }
        };

        state.sort(uid);
        self.rearm(&mut state);
        (stored, refreshed)
    }

    /// Active subscriptions of a property, soonest expiry first.
    pub fn subscriptions_for(&self, uid: PropertyUid) -> Vec<Arc<Subscription>> {
        let now = Instant::now();
        self.inner
            .state
            .lock()
            .by_property
            .get(&uid)
            .map(|subs| {
                subs.iter()
                    .filter(|s| !s.is_expired_at(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every active subscription with its remaining time, soonest expiry
    /// first.
    pub fn snapshot(&self) -> Vec<CovSubscriptionRecord> {
        let now = Instant::now();
        self.inner
            .state
            .lock()
            .all
            .iter()
            .filter(|s| !s.is_expired_at(now))
            .map(|s| s.record())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state.lock().all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Earliest expiry the timer is armed for.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.inner.state.lock().timer.as_ref().map(|t| t.deadline)
    }

    fn rearm(&self, state: &mut StoreState) {
        let next = state.next_deadline();
        if state.timer.as_ref().map(|t| t.deadline) == next {
            return;
        }
        if let Some(timer) = state.timer.take() {
            timer.task.abort();
        }
        let Some(deadline) = next else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            warn!("no tokio runtime, subscription expiry is only applied on lookup");
            return;
        };
        let store = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            expire(store, deadline);
        });
        state.timer = Some(ExpiryTimer { deadline, task });
    }
}

fn expire(store: Weak<StoreInner>, fired: Instant) {
    let Some(inner) = store.upgrade() else {
        return;
    };
    let store = SubscriptionStore { inner };
    let mut state = store.inner.state.lock();
    if state.timer.as_ref().is_some_and(|t| t.deadline == fired) {
        // this task; dropping the handle only detaches it
        state.timer = None;
    }

    let now = Instant::now();
    let before = state.all.len();
    state.all.retain(|s| !s.is_expired_at(now));
    state.by_property.retain(|_, subs| {
        subs.retain(|s| !s.is_expired_at(now));
        !subs.is_empty()
    });
    debug!("pruned {} expired COV subscription(s)", before - state.all.len());

    store.rearm(&mut state);
}
