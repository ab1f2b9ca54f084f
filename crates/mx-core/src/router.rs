//! Push-frame router.
//!
//! Holds every active subscription keyed by its stable id. `route` takes a
//! snapshot of the handlers under the read lock and dispatches after the lock
//! is dropped, so handlers may register or unregister from any thread while a
//! frame is being delivered.

use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;

/// Capability set of a subscription as seen by the router.
pub trait EventHandler<F>: Send + Sync {
    /// Stable key derived from the stream parameters.
    fn id(&self) -> &str;

    /// Whether `frame` belongs to this subscription.
    fn accept_event(&self, frame: &F) -> bool;

    /// Handle an accepted frame. Runs on the read loop; keep it short.
    fn handle_event(&self, frame: &F);
}

pub struct Router<H: ?Sized> {
    handlers: RwLock<AHashMap<String, Arc<H>>>,
}

impl<H: ?Sized> Router<H> {
    pub fn new() -> Self {
        Self { handlers: RwLock::new(AHashMap::new()) }
    }

    /// Register `handler` under `key`. Returns `false` and leaves the existing
    /// entry untouched if the key is taken.
    pub fn register(&self, key: impl Into<String>, handler: Arc<H>) -> bool {
        let mut handlers = self.handlers.write();
        match handlers.entry(key.into()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(handler);
                true
            }
        }
    }

    pub fn unregister(&self, key: &str) -> Option<Arc<H>> {
        self.handlers.write().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.handlers.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    /// Deliver `frame` to every handler that accepts it. Returns the number
    /// of handlers that handled the frame.
    pub fn route<F>(&self, frame: &F) -> usize
    where
        H: EventHandler<F>,
    {
        let snapshot: Vec<Arc<H>> = self.handlers.read().values().cloned().collect();
        let mut delivered = 0;
        for handler in snapshot {
            if handler.accept_event(frame) {
                handler.handle_event(frame);
                delivered += 1;
            }
        }
        delivered
    }
}

impl<H: ?Sized> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Prefix {
        key: String,
        hits: AtomicUsize,
    }

    impl Prefix {
        fn new(key: &str) -> Arc<Self> {
            Arc::new(Self { key: key.to_string(), hits: AtomicUsize::new(0) })
        }
    }

    impl EventHandler<String> for Prefix {
        fn id(&self) -> &str {
            &self.key
        }
        fn accept_event(&self, frame: &String) -> bool {
            frame.starts_with(&self.key)
        }
        fn handle_event(&self, _frame: &String) {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn routes_to_accepting_handlers_only() {
        let router: Router<dyn EventHandler<String>> = Router::new();
        let depth = Prefix::new("depth");
        let deals = Prefix::new("deals");
        assert!(router.register("depth", depth.clone()));
        assert!(router.register("deals", deals.clone()));

        assert_eq!(router.route(&"depth@BTCUSDT".to_string()), 1);
        assert_eq!(router.route(&"kline@BTCUSDT".to_string()), 0);
        assert_eq!(depth.hits.load(Ordering::Relaxed), 1);
        assert_eq!(deals.hits.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn duplicate_register_keeps_first() {
        let router: Router<Prefix> = Router::new();
        let first = Prefix::new("depth");
        let second = Prefix::new("depth");
        assert!(router.register("depth", first.clone()));
        assert!(!router.register("depth", second));

        let kept = router.unregister("depth").unwrap();
        assert!(Arc::ptr_eq(&kept, &first));
        assert!(router.is_empty());
    }

    #[test]
    fn unregistered_handler_receives_nothing() {
        let router: Router<Prefix> = Router::new();
        let depth = Prefix::new("depth");
        router.register("depth", depth.clone());
        router.route(&"depth".to_string());
        router.unregister("depth");
        router.route(&"depth".to_string());
        assert_eq!(depth.hits.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn concurrent_register_and_route() {
        let router: Arc<Router<Prefix>> = Arc::new(Router::new());
        let workers: Vec<_> = (0..4)
            .map(|t| {
                let router = router.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let key = format!("k{t}-{i}");
                        router.register(key.clone(), Prefix::new(&key));
                        router.route(&key);
                        router.unregister(&key);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }
        assert_eq!(router.len(), 0);
    }
}
