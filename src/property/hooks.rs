//! Change hooks.
//!
//! A property runs its "before" hooks ahead of committing a new value and its
//! "after" hooks once the value is stored. A failing before-hook vetoes the
//! change; after-hook failures are only logged.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::warn;
use parking_lot::RwLock;

use super::PropertyData;
use crate::error::Result;
use crate::object::{ObjectIdentifier, PropertyIdentifier};

/// A pending or committed change of a property value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyChange {
    /// Owning object, `None` while the object is not attached to a device
    pub object: Option<ObjectIdentifier>,
    pub property: PropertyIdentifier,
    pub data: PropertyData,
}

type Hook = Arc<dyn Fn(PropertyChange) -> BoxFuture<'static, Result<()>> + Send + Sync>;

#[derive(Default)]
pub struct PropertyHooks {
    before: RwLock<Vec<Hook>>,
    after: RwLock<Vec<Hook>>,
}

fn boxed<F, Fut>(hook: F) -> Hook
where
    F: Fn(PropertyChange) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    Arc::new(move |change| hook(change).boxed())
}

impl PropertyHooks {
    /// Registers a hook that may reject a change by returning an error.
    pub fn on_before_change<F, Fut>(&self, hook: F)
    where
        F: Fn(PropertyChange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.before.write().push(boxed(hook));
    }

    /// Registers a hook that observes committed changes.
    pub fn on_after_change<F, Fut>(&self, hook: F)
    where
        F: Fn(PropertyChange) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.after.write().push(boxed(hook));
    }

    pub(crate) async fn run_before(&self, change: &PropertyChange) -> Result<()> {
        let hooks = self.before.read().clone();
        for hook in hooks {
            hook(change.clone()).await?;
        }
        Ok(())
    }

    pub(crate) async fn run_after(&self, change: &PropertyChange) {
        let hooks = self.after.read().clone();
        for hook in hooks {
            if let Err(err) = hook(change.clone()).await {
                warn!(
                    "after-change hook of {} failed: {}",
                    change.property, err
                );
            }
        }
    }
}

impl std::fmt::Debug for PropertyHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyHooks")
            .field("before", &self.before.read().len())
            .field("after", &self.after.read().len())
            .finish()
    }
}
