//! Session engine: one transport, many subscriptions.
//!
//! # Architecture
//!
//! ```text
//!   subscribe ──► reserve key ──► pending.insert(promise) ──► write ──► wait(deadline)
//!                                                                          ▲
//!   transport ──► read loop ──► decode ──► pending.claim ── settled ───────┘
//!                                              │
//!                                              └─ unclaimed ──► router.route ──► handlers
//!
//!   heartbeat ──► ping (same request path) ──► latency hook / close on failure
//! ```
//!
//! A [`Protocol`] describes one stream family: how frames are decoded, how
//! replies are correlated, how subscribe/unsubscribe/ping requests look, and
//! how unsubscribe behaves. [`Session`] is generic over it.
//!
//! Locks on the active map, the pending table and the router are
//! `parking_lot` locks and are never held across an await.

mod heartbeat;
mod pending;

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::sync::{OnceCell, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::{DecodeError, SessionError, TransportError};
use crate::latency::{LatencyCollector, LatencyStats};
use crate::promise::{Matcher, Promise, Verdict};
use crate::router::{EventHandler, Router};
use crate::transport::Transport;

use pending::{Claim, PendingTable};

/// Request id used by heartbeat pings. Regular requests start at 1.
pub const PING_ID: u64 = 0;

/// How replies are matched to requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// Replies echo the request id.
    ById,
    /// Replies carry no id; they are offered to pending requests in request
    /// order and at most one request is outstanding at a time.
    InOrder,
}

/// What `unsubscribe` sends to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsubscribeMode {
    /// Send the request and wait for the ack.
    AwaitAck,
    /// Send the request; the write is bounded by the deadline, no ack awaited.
    WriteOnly,
    /// Nothing is sent; only local state changes.
    LocalOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionOp {
    Subscribe,
    Unsubscribe,
}

/// An encoded request plus the matcher recognising its reply.
pub struct Request<F> {
    pub id: u64,
    pub payload: Vec<u8>,
    pub matcher: Matcher<F>,
}

impl<F> Request<F> {
    pub fn new(
        id: u64,
        payload: impl Into<Vec<u8>>,
        matcher: impl Fn(&F) -> Verdict + Send + Sync + 'static,
    ) -> Self {
        Self { id, payload: payload.into(), matcher: Box::new(matcher) }
    }
}

impl<F> std::fmt::Debug for Request<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("payload", &String::from_utf8_lossy(&self.payload))
            .finish()
    }
}

/// Wire protocol of one stream family.
pub trait Protocol: Send + Sync + 'static {
    /// Decoded inbound frame.
    type Frame: Send + Sync + 'static;

    /// Subscription capability set, usually a trait object.
    type Spec: ?Sized + EventHandler<Self::Frame> + 'static;

    /// Log prefix.
    const FAMILY: &'static str;
    const MAX_SUBSCRIPTIONS: usize;
    const CORRELATION: Correlation;
    const UNSUBSCRIBE: UnsubscribeMode;

    fn decode(&self, raw: &[u8]) -> Result<Self::Frame, DecodeError>;

    /// Request id echoed by a reply frame, if the family has one.
    fn correlation_id(&self, _frame: &Self::Frame) -> Option<u64> {
        None
    }

    /// Heartbeat ping.
    fn ping(&self, id: u64) -> Request<Self::Frame>;

    /// Subscribe or unsubscribe request for `spec`; `None` when the family
    /// sends nothing for this op.
    fn subscription(
        &self,
        id: u64,
        op: SubscriptionOp,
        spec: &Self::Spec,
    ) -> Option<Request<Self::Frame>>;

    /// Request sent right after connect; the session closes if it fails.
    fn login(&self, _id: u64) -> Option<Request<Self::Frame>> {
        None
    }
}

/// Called once when the read loop dies on a transport error.
pub type DisconnectHook = Arc<dyn Fn(&SessionError) + Send + Sync>;

/// Called with every successful heartbeat round trip.
pub type LatencyHook = Arc<dyn Fn(Duration) + Send + Sync>;

/// Optional session callbacks.
#[derive(Clone, Default)]
pub struct Hooks {
    on_disconnect: Option<DisconnectHook>,
    on_latency: Option<LatencyHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_disconnect(mut self, f: impl Fn(&SessionError) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_latency(mut self, f: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_latency = Some(Arc::new(f));
        self
    }
}

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Created = 0,
    Connecting = 1,
    Connected = 2,
    Closed = 3,
}

impl SessionState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Subscribe request in flight.
    Reserved,
    /// Acked and registered with the router.
    Active,
}

/// A connection plus its subscriptions. Cheap to clone.
pub struct Session<P: Protocol> {
    inner: Arc<Inner<P>>,
}

impl<P: Protocol> Clone for Session<P> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

struct Inner<P: Protocol> {
    protocol: P,
    transport: Arc<dyn Transport>,
    config: SessionConfig,
    hooks: Hooks,
    state: AtomicU8,
    active: Mutex<AHashMap<String, Slot>>,
    router: Router<P::Spec>,
    pending: PendingTable<P::Frame>,
    /// Serializes request/reply for [`Correlation::InOrder`] families.
    gate: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
    shutdown: watch::Sender<bool>,
    closed: OnceCell<Result<(), SessionError>>,
    latency: Mutex<LatencyCollector>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<P: Protocol> Session<P> {
    pub fn new(protocol: P, transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        Self::with_hooks(protocol, transport, config, Hooks::default())
    }

    pub fn with_hooks(
        protocol: P,
        transport: Arc<dyn Transport>,
        config: SessionConfig,
        hooks: Hooks,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                protocol,
                transport,
                config,
                hooks,
                state: AtomicU8::new(SessionState::Created as u8),
                active: Mutex::new(AHashMap::new()),
                router: Router::new(),
                pending: PendingTable::new(),
                gate: tokio::sync::Mutex::new(()),
                next_id: AtomicU64::new(PING_ID + 1),
                shutdown,
                closed: OnceCell::new(),
                latency: Mutex::new(LatencyCollector::new()),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Open the transport, start the read loop, log in if the family
    /// requires it, then start the heartbeat.
    ///
    /// Only valid once; a failed connect returns the session to `Created`.
    pub async fn connect(&self) -> Result<(), SessionError> {
        let inner = &self.inner;
        if let Err(current) = inner.state.compare_exchange(
            SessionState::Created as u8,
            SessionState::Connecting as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return Err(match SessionState::from_u8(current) {
                SessionState::Closed => SessionError::SessionClosed,
                _ => SessionError::AlreadyConnected,
            });
        }

        info!("[{}] connecting", P::FAMILY);
        let opened = match tokio::time::timeout(inner.config.connect_timeout, inner.transport.connect()).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::NetworkIssue("connect timed out".into())),
        };
        if let Err(e) = opened {
            warn!("[{}] connect failed: {e}", P::FAMILY);
            let _ = inner.state.compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Created as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            );
            return Err(SessionError::Connection(e));
        }

        if inner
            .state
            .compare_exchange(
                SessionState::Connecting as u8,
                SessionState::Connected as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            // Closed while the transport was opening.
            let _ = inner.transport.close().await;
            return Err(SessionError::SessionClosed);
        }

        let reader = tokio::spawn(read_loop(inner.clone(), inner.shutdown.subscribe()));
        inner.tasks.lock().push(reader);

        if let Some(request) = inner.protocol.login(inner.next_id()) {
            if let Err(e) = inner.send_and_await(request, inner.config.await_timeout, "login").await {
                error!("[{}] login failed: {e}", P::FAMILY);
                let _ = inner.close().await;
                return Err(e);
            }
            info!("[{}] logged in", P::FAMILY);
        }

        let monitor = tokio::spawn(heartbeat::run(inner.clone(), inner.shutdown.subscribe()));
        inner.tasks.lock().push(monitor);
        info!("[{}] connected", P::FAMILY);
        Ok(())
    }

    /// Subscribe `spec`, waiting for the server ack under `timeout` (or the
    /// configured default).
    pub async fn subscribe(
        &self,
        spec: Arc<P::Spec>,
        timeout: Option<Duration>,
    ) -> Result<SubscriptionHandle<P>, SessionError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        let key = spec.id().to_string();
        let reservation = inner.reserve(&key)?;

        let timeout = timeout.unwrap_or(inner.config.await_timeout);
        if let Some(request) = inner.protocol.subscription(inner.next_id(), SubscriptionOp::Subscribe, &spec) {
            debug!("[{}] subscribe {key}: {request:?}", P::FAMILY);
            inner.send_and_await(request, timeout, "subscribe").await?;
        }

        reservation.commit(spec.clone());
        info!("[{}] subscribed {key}", P::FAMILY);
        Ok(SubscriptionHandle { inner: inner.clone(), key, spec, outcome: OnceCell::new() })
    }

    /// Close the session. Idempotent; every caller gets the first result.
    pub async fn close(&self) -> Result<(), SessionError> {
        self.inner.close().await
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Number of subscriptions registered with the router.
    pub fn active_count(&self) -> usize {
        self.inner.router.len()
    }

    pub fn is_subscribed(&self, key: &str) -> bool {
        self.inner.router.contains(key)
    }

    pub fn latency_stats(&self) -> Option<LatencyStats> {
        self.inner.latency.lock().stats()
    }

    pub fn family(&self) -> &'static str {
        P::FAMILY
    }
}

impl<P: Protocol> Inner<P> {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == SessionState::Closed as u8
    }

    fn ensure_connected(&self) -> Result<(), SessionError> {
        match SessionState::from_u8(self.state.load(Ordering::Acquire)) {
            SessionState::Connected => Ok(()),
            SessionState::Closed => Err(SessionError::SessionClosed),
            _ => Err(SessionError::NotConnected),
        }
    }

    /// Reserve `key` for an in-flight subscribe.
    fn reserve(&self, key: &str) -> Result<Reservation<'_, P>, SessionError> {
        let mut active = self.active.lock();
        if active.contains_key(key) {
            return Err(SessionError::DuplicateSubscription(key.to_string()));
        }
        if active.len() >= P::MAX_SUBSCRIPTIONS {
            return Err(SessionError::SubscriptionLimit { max: P::MAX_SUBSCRIPTIONS });
        }
        active.insert(key.to_string(), Slot::Reserved);
        Ok(Reservation { inner: self, key: key.to_string(), committed: false })
    }

    /// Drop `key` from the active map and the router.
    fn forget(&self, key: &str) {
        let mut active = self.active.lock();
        if active.get(key) == Some(&Slot::Active) {
            active.remove(key);
        }
        self.router.unregister(key);
    }

    /// Write `request` and wait for its reply until `timeout` elapses.
    async fn send_and_await(
        &self,
        request: Request<P::Frame>,
        timeout: Duration,
        op: &str,
    ) -> Result<P::Frame, SessionError> {
        let deadline = Instant::now() + timeout;
        let _gate = match P::CORRELATION {
            Correlation::InOrder => Some(
                tokio::time::timeout_at(deadline, self.gate.lock())
                    .await
                    .map_err(|_| SessionError::MessageTimeout { op: op.to_string() })?,
            ),
            Correlation::ById => None,
        };
        self.ensure_connected()?;

        let Request { id, payload, matcher } = request;
        let promise = Arc::new(Promise::from_matcher(matcher));
        let _pending = self.pending.insert(id, promise.clone())?;

        self.transport.write_frame(&payload).await.map_err(SessionError::Write)?;
        promise.wait(deadline).await.map_err(|e| SessionError::from_promise(op, e))
    }

    /// Write `payload` without waiting for a reply, bounded by `timeout`.
    async fn send_only(&self, payload: &[u8], timeout: Duration, op: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;
        match tokio::time::timeout(timeout, self.transport.write_frame(payload)).await {
            Ok(result) => result.map_err(SessionError::Write),
            Err(_) => Err(SessionError::MessageTimeout { op: op.to_string() }),
        }
    }

    async fn unsubscribe(&self, key: &str, spec: &P::Spec, timeout: Option<Duration>) -> Result<(), SessionError> {
        let timeout = timeout.unwrap_or(self.config.await_timeout);
        let result = match P::UNSUBSCRIBE {
            UnsubscribeMode::LocalOnly => Ok(()),
            mode => match self.ensure_connected() {
                Err(e) => Err(e),
                Ok(()) => match self.protocol.subscription(self.next_id(), SubscriptionOp::Unsubscribe, spec) {
                    None => Ok(()),
                    Some(request) if mode == UnsubscribeMode::AwaitAck => {
                        self.send_and_await(request, timeout, "unsubscribe").await.map(|_| ())
                    }
                    Some(request) => self.send_only(&request.payload, timeout, "unsubscribe").await,
                },
            },
        };

        self.forget(key);
        match &result {
            Ok(()) => info!("[{}] unsubscribed {key}", P::FAMILY),
            Err(e) => warn!("[{}] unsubscribe {key} failed, removed locally: {e}", P::FAMILY),
        }
        result
    }

    /// Decode one raw frame and hand it to a pending request or the router.
    fn dispatch(&self, raw: &[u8]) {
        let frame = match self.protocol.decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                debug!("[{}] dropping undecodable frame: {e}", P::FAMILY);
                return;
            }
        };

        let claim = match (P::CORRELATION, self.protocol.correlation_id(&frame)) {
            (Correlation::ById, Some(id)) => self.pending.claim_by_id(id, frame),
            (Correlation::ById, None) => Claim::Unclaimed(frame),
            (Correlation::InOrder, _) => self.pending.claim_in_order(frame),
        };

        match claim {
            Claim::Settled => {}
            Claim::Orphaned(id) => debug!("[{}] reply for unknown request {id}", P::FAMILY),
            Claim::Unclaimed(frame) => {
                if self.router.route(&frame) == 0 {
                    debug!("[{}] no subscription accepted frame", P::FAMILY);
                }
            }
        }
    }

    fn record_latency(&self, rtt: Duration) {
        self.latency.lock().record(rtt);
        if let Some(hook) = &self.hooks.on_latency {
            hook(rtt);
        }
    }

    async fn close(&self) -> Result<(), SessionError> {
        self.closed
            .get_or_init(|| async {
                self.state.store(SessionState::Closed as u8, Ordering::Release);
                self.shutdown.send_replace(true);
                let released = self.pending.release_all();
                if released > 0 {
                    debug!("[{}] released {released} pending request(s)", P::FAMILY);
                }

                let result = self.transport.close().await.map_err(SessionError::Close);
                match &result {
                    Ok(()) => info!("[{}] closed", P::FAMILY),
                    Err(e) => warn!("[{}] close: {e}", P::FAMILY),
                }
                let stats = self.latency.lock().stats();
                if let Some(stats) = stats {
                    info!("[{}] heartbeat rtt {stats}", P::FAMILY);
                }
                result
            })
            .await
            .clone()
    }
}

/// Single read loop: frames are processed strictly in arrival order.
async fn read_loop<P: Protocol>(inner: Arc<Inner<P>>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        let raw = tokio::select! {
            _ = shutdown.changed() => break,
            raw = inner.transport.read_frame() => raw,
        };

        match raw {
            Ok(raw) => inner.dispatch(&raw),
            Err(e) => {
                if inner.is_closed() {
                    debug!("[{}] read loop stopped: {e}", P::FAMILY);
                    break;
                }
                let err = SessionError::Read(e);
                error!("[{}] {err}, closing session", P::FAMILY);
                if let Some(hook) = &inner.hooks.on_disconnect {
                    hook(&err);
                }
                let _ = inner.close().await;
                break;
            }
        }
    }
    debug!("[{}] read loop exited", P::FAMILY);
}

/// Key held for an in-flight subscribe; released on drop unless committed.
struct Reservation<'a, P: Protocol> {
    inner: &'a Inner<P>,
    key: String,
    committed: bool,
}

impl<P: Protocol> Reservation<'_, P> {
    fn commit(mut self, spec: Arc<P::Spec>) {
        let mut active = self.inner.active.lock();
        self.inner.router.register(self.key.clone(), spec);
        active.insert(self.key.clone(), Slot::Active);
        self.committed = true;
    }
}

impl<P: Protocol> Drop for Reservation<'_, P> {
    fn drop(&mut self) {
        if !self.committed {
            let mut active = self.inner.active.lock();
            if active.get(&self.key) == Some(&Slot::Reserved) {
                active.remove(&self.key);
            }
        }
    }
}

/// Caller's handle on an active subscription.
pub struct SubscriptionHandle<P: Protocol> {
    inner: Arc<Inner<P>>,
    key: String,
    spec: Arc<P::Spec>,
    outcome: OnceCell<Result<(), SessionError>>,
}

impl<P: Protocol> SubscriptionHandle<P> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn spec(&self) -> &Arc<P::Spec> {
        &self.spec
    }

    /// Unsubscribe. Runs once; repeated calls return the first outcome. The
    /// subscription is removed locally even when the remote step fails.
    pub async fn unsubscribe(&self, timeout: Option<Duration>) -> Result<(), SessionError> {
        self.outcome
            .get_or_init(|| self.inner.unsubscribe(&self.key, &self.spec, timeout))
            .await
            .clone()
    }
}

impl<P: Protocol> std::fmt::Debug for SubscriptionHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("family", &P::FAMILY)
            .field("key", &self.key)
            .finish()
    }
}
