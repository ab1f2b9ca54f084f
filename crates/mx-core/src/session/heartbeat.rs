//! Heartbeat monitor.
//!
//! Sends the family's ping through the normal request path at a fixed
//! interval. A successful ping records its round trip; any failure closes
//! the session and ends the monitor.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::{Inner, PING_ID, Protocol};

pub(super) async fn run<P: Protocol>(inner: Arc<Inner<P>>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(inner.config.heartbeat_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        if inner.is_closed() {
            break;
        }

        let started = Instant::now();
        let ping = inner.protocol.ping(PING_ID);
        match inner.send_and_await(ping, inner.config.ping_timeout, "ping").await {
            Ok(_) => {
                let rtt = started.elapsed();
                debug!("[{}] pong in {rtt:?}", P::FAMILY);
                inner.record_latency(rtt);
            }
            Err(e) => {
                if !inner.is_closed() {
                    warn!("[{}] heartbeat failed: {e}, closing session", P::FAMILY);
                    let _ = inner.close().await;
                }
                break;
            }
        }
    }
    debug!("[{}] heartbeat stopped", P::FAMILY);
}
