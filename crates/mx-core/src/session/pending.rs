//! Table of requests waiting for a reply.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SessionError;
use crate::promise::{Promise, Verdict};

pub(super) enum Claim<F> {
    /// A pending promise took the frame.
    Settled,
    /// No promise wanted the frame.
    Unclaimed(F),
    /// The frame carried an id nobody is waiting for.
    Orphaned(u64),
}

struct Slots<F> {
    map: BTreeMap<u64, Arc<Promise<F>>>,
    closed: bool,
}

pub(super) struct PendingTable<F> {
    slots: Mutex<Slots<F>>,
}

/// Removes its entry from the table when dropped.
pub(super) struct PendingGuard<'a, F> {
    table: &'a PendingTable<F>,
    id: u64,
}

impl<F> Drop for PendingGuard<'_, F> {
    fn drop(&mut self) {
        self.table.slots.lock().map.remove(&self.id);
    }
}

impl<F: Send + 'static> PendingTable<F> {
    pub(super) fn new() -> Self {
        Self { slots: Mutex::new(Slots { map: BTreeMap::new(), closed: false }) }
    }

    /// Add a promise under `id`. Fails once the table has been released.
    pub(super) fn insert(
        &self,
        id: u64,
        promise: Arc<Promise<F>>,
    ) -> Result<PendingGuard<'_, F>, SessionError> {
        let mut slots = self.slots.lock();
        if slots.closed {
            return Err(SessionError::SessionClosed);
        }
        slots.map.insert(id, promise);
        Ok(PendingGuard { table: self, id })
    }

    /// Offer a frame carrying `id` to the promise registered under it.
    pub(super) fn claim_by_id(&self, id: u64, frame: F) -> Claim<F> {
        let promise = self.slots.lock().map.get(&id).cloned();
        let Some(promise) = promise else {
            return Claim::Orphaned(id);
        };
        match promise.check(&frame) {
            Verdict::Accept => {
                promise.resolve(frame);
                Claim::Settled
            }
            Verdict::Reject(reason) => {
                promise.reject(reason);
                Claim::Settled
            }
            Verdict::Pass => Claim::Unclaimed(frame),
        }
    }

    /// Offer a frame to pending promises oldest first; the first one that
    /// does not pass takes it.
    pub(super) fn claim_in_order(&self, frame: F) -> Claim<F> {
        let waiting: Vec<Arc<Promise<F>>> = self.slots.lock().map.values().cloned().collect();
        for promise in waiting.into_iter().filter(|p| !p.is_settled()) {
            match promise.check(&frame) {
                Verdict::Pass => continue,
                Verdict::Accept => {
                    promise.resolve(frame);
                    return Claim::Settled;
                }
                Verdict::Reject(reason) => {
                    promise.reject(reason);
                    return Claim::Settled;
                }
            }
        }
        Claim::Unclaimed(frame)
    }

    /// Release every pending promise and refuse further inserts. Returns the
    /// number of promises released.
    pub(super) fn release_all(&self) -> usize {
        let drained: Vec<Arc<Promise<F>>> = {
            let mut slots = self.slots.lock();
            slots.closed = true;
            std::mem::take(&mut slots.map).into_values().collect()
        };
        drained.iter().filter(|p| p.release()).count()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.slots.lock().map.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use super::*;
    use crate::error::PromiseError;

    fn exact(want: u32) -> Arc<Promise<u32>> {
        Arc::new(Promise::new(move |v: &u32| match *v {
            v if v == want => Verdict::Accept,
            0 => Verdict::Reject("error frame".into()),
            _ => Verdict::Pass,
        }))
    }

    #[tokio::test]
    async fn guard_removes_entry() {
        let table = PendingTable::new();
        {
            let _g = table.insert(7, exact(1)).unwrap();
            assert_eq!(table.len(), 1);
        }
        assert_eq!(table.len(), 0);
    }

    #[tokio::test]
    async fn claim_by_id_routes_to_owner() {
        let table = PendingTable::new();
        let p = exact(5);
        let _g = table.insert(3, p.clone()).unwrap();

        assert!(matches!(table.claim_by_id(9, 5), Claim::Orphaned(9)));
        assert!(matches!(table.claim_by_id(3, 4), Claim::Unclaimed(4)));
        assert!(matches!(table.claim_by_id(3, 5), Claim::Settled));
        assert_eq!(p.wait(Instant::now() + Duration::from_secs(1)).await, Ok(5));
    }

    #[tokio::test]
    async fn claim_in_order_prefers_oldest() {
        let table = PendingTable::new();
        let first = exact(1);
        let second = exact(2);
        let _a = table.insert(1, first.clone()).unwrap();
        let _b = table.insert(2, second.clone()).unwrap();

        assert!(matches!(table.claim_in_order(2), Claim::Settled));
        assert!(second.is_settled());
        assert!(!first.is_settled());

        // An error frame goes to the oldest waiter.
        assert!(matches!(table.claim_in_order(0), Claim::Settled));
        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(first.wait(deadline).await, Err(PromiseError::Rejected("error frame".into())));

        assert!(matches!(table.claim_in_order(9), Claim::Unclaimed(9)));
    }

    #[tokio::test]
    async fn release_all_blocks_later_inserts() {
        let table = PendingTable::new();
        let p = exact(1);
        let _g = table.insert(1, p.clone()).unwrap();
        assert_eq!(table.release_all(), 1);
        assert!(matches!(table.insert(2, exact(2)), Err(SessionError::SessionClosed)));

        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(p.wait(deadline).await, Err(PromiseError::Released));
    }
}
