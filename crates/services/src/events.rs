//! In-process publish/subscribe for "progress updated".
//!
//! Delivery is synchronous and in subscription order. Each subscriber is isolated: an
//! error or a panic in one handler is logged and the remaining handlers still run.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};

use course_core::model::ModuleProgress;

use crate::error::ObserverError;

pub type Handler<T> = Arc<dyn Fn(&T) -> Result<(), ObserverError> + Send + Sync>;

/// Bus carrying ledger snapshots after every ledger write.
pub type ProgressBus = EventBus<ModuleProgress>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Outcome of one `publish`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Subscriber<T> {
    id: SubscriptionId,
    name: String,
    handler: Handler<T>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

struct Registry<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
}

pub struct EventBus<T> {
    registry: Mutex<Registry<T>>,
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
            }),
        }
    }
}

impl<T> EventBus<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler`; it will see every event published from now on.
    ///
    /// `name` only shows up in logs.
    pub fn subscribe<F>(&self, name: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(&T) -> Result<(), ObserverError> + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.subscribers.push(Subscriber {
            id,
            name: name.into(),
            handler: Arc::new(handler),
        });
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = registry.subscribers.len();
        registry.subscribers.retain(|sub| sub.id != id);
        registry.subscribers.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .len()
    }

    /// Deliver `event` to every subscriber before returning.
    pub fn publish(&self, event: &T) -> DeliveryReport {
        // Snapshot so handlers may (un)subscribe without deadlocking.
        let subscribers = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribers
            .clone();

        let mut report = DeliveryReport::default();
        for sub in subscribers {
            match catch_unwind(AssertUnwindSafe(|| (sub.handler)(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    tracing::warn!(
                        subscriber = %sub.name,
                        error = %err,
                        "progress subscriber failed"
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    tracing::warn!(subscriber = %sub.name, "progress subscriber panicked");
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl Fn(&u32) -> Result<(), ObserverError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |value: &u32| {
            log.lock().unwrap().push(format!("{tag}:{value}"));
            Ok(())
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let bus = EventBus::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("first", recorder(&log, "a"));
        bus.subscribe("second", recorder(&log, "b"));

        let report = bus.publish(&7);

        assert_eq!(report, DeliveryReport { delivered: 2, failed: 0 });
        assert_eq!(*log.lock().unwrap(), vec!["a:7".to_string(), "b:7".to_string()]);
    }

    #[test]
    fn failing_subscriber_does_not_block_the_rest() {
        let bus = EventBus::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.subscribe("broken", |_: &u32| {
            Err(ObserverError::Subscriber("no mount".into()))
        });
        bus.subscribe("panicky", |_: &u32| -> Result<(), ObserverError> {
            panic!("observer bug")
        });
        bus.subscribe("healthy", recorder(&log, "ok"));

        let report = bus.publish(&1);

        assert_eq!(report, DeliveryReport { delivered: 1, failed: 2 });
        assert_eq!(*log.lock().unwrap(), vec!["ok:1".to_string()]);
    }

    #[test]
    fn unsubscribed_handlers_stop_receiving() {
        let bus = EventBus::<u32>::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = bus.subscribe("temp", recorder(&log, "t"));
        bus.publish(&1);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&2);

        assert_eq!(*log.lock().unwrap(), vec!["t:1".to_string()]);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn publishing_without_subscribers_is_a_no_op() {
        let bus = ProgressBus::new();
        assert_eq!(bus.publish(&ModuleProgress::new()), DeliveryReport::default());
    }
}
