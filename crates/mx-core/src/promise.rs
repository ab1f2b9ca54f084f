//! Write-once reply slot for one outstanding request.
//!
//! A [`Promise`] pairs a matcher with a oneshot channel. The read loop offers
//! inbound frames to [`Promise::check`]; the first `resolve`, `reject` or
//! `release` wins and every later call is a silent no-op. The requester
//! blocks in [`Promise::wait`] until the promise settles or its deadline
//! passes.
//!
//! ```text
//!   Pending ──resolve──► Resolved
//!      │  ──reject───► Rejected
//!      │  ──release──► Released
//!      └──deadline───► TimedOut   (late settlement ignored)
//! ```

use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::error::PromiseError;

/// Outcome of offering a frame to a promise's matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Not a reply to this request.
    Pass,
    /// The awaited reply.
    Accept,
    /// A reply refusing the request.
    Reject(String),
}

/// Frame predicate deciding whether a frame settles a promise.
pub type Matcher<T> = Box<dyn Fn(&T) -> Verdict + Send + Sync>;

const PENDING: u8 = 0;
const RESOLVED: u8 = 1;
const REJECTED: u8 = 2;
const RELEASED: u8 = 3;
const TIMED_OUT: u8 = 4;

type Outcome<T> = Result<T, PromiseError>;

pub struct Promise<T> {
    matcher: Matcher<T>,
    state: AtomicU8,
    tx: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
    rx: Mutex<Option<oneshot::Receiver<Outcome<T>>>>,
}

impl<T: Send + 'static> Promise<T> {
    pub fn new(matcher: impl Fn(&T) -> Verdict + Send + Sync + 'static) -> Self {
        Self::from_matcher(Box::new(matcher))
    }

    pub fn from_matcher(matcher: Matcher<T>) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            matcher,
            state: AtomicU8::new(PENDING),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Run the matcher against `frame`. Does not settle the promise.
    pub fn check(&self, frame: &T) -> Verdict {
        (self.matcher)(frame)
    }

    /// Settle with a value. Returns `false` if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(RESOLVED, Ok(value))
    }

    /// Settle with a remote refusal. Returns `false` if already settled.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        self.settle(REJECTED, Err(PromiseError::Rejected(reason.into())))
    }

    /// Settle because the owner is going away. Returns `false` if already settled.
    pub fn release(&self) -> bool {
        self.settle(RELEASED, Err(PromiseError::Released))
    }

    pub fn is_settled(&self) -> bool {
        self.state.load(Ordering::Acquire) != PENDING
    }

    fn settle(&self, to: u8, outcome: Outcome<T>) -> bool {
        if self.state.compare_exchange(PENDING, to, Ordering::AcqRel, Ordering::Acquire).is_err() {
            return false;
        }
        if let Some(tx) = self.tx.lock().take() {
            // The waiter may have given up already.
            let _ = tx.send(outcome);
        }
        true
    }

    /// Wait for the promise to settle, at most until `deadline`.
    ///
    /// Can be called once; later calls return [`PromiseError::Consumed`].
    pub async fn wait(&self, deadline: Instant) -> Result<T, PromiseError> {
        let Some(rx) = self.rx.lock().take() else {
            return Err(PromiseError::Consumed);
        };
        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(PromiseError::Released),
            Err(_) => {
                let _ = self.state.compare_exchange(
                    PENDING,
                    TIMED_OUT,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                );
                Err(PromiseError::TimedOut)
            }
        }
    }
}

impl<T> std::fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state.load(Ordering::Acquire) {
            PENDING => "pending",
            RESOLVED => "resolved",
            REJECTED => "rejected",
            RELEASED => "released",
            _ => "timed-out",
        };
        f.debug_struct("Promise").field("state", &state).finish()
    }
}
