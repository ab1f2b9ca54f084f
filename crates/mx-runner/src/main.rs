//! # mx-runner
//!
//! Opens one session per configured block, subscribes its streams and logs
//! everything received until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! mx-runner config.json --log-level info
//! ```

mod streams;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use mx_core::config::{Family, SessionBlock};
use mx_core::{EventHandler, Hooks, Protocol, Session};
use mx_md::futures::FuturesMarket;
use mx_md::spot::SpotMarket;
use mx_td::{FuturesUser, SpotUser};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// Exchange WebSocket session runner.
#[derive(Parser)]
#[command(name = "mx-runner", about = "Exchange WebSocket session runner")]
struct Cli {
    /// Configuration file path (JSON).
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output (overrides `app.log_path`).
    #[arg(long)]
    log_dir: Option<String>,
}

fn hooks(label: &str) -> Hooks {
    let on_disconnect = label.to_string();
    let on_latency = label.to_string();
    Hooks::new()
        .on_disconnect(move |e| error!("[{on_disconnect}] disconnected: {e}"))
        .on_latency(move |rtt| debug!("[{on_latency}] heartbeat rtt {rtt:?}"))
}

/// Connect, subscribe every spec, then wait for shutdown or session loss.
async fn drive<P: Protocol>(
    label: String,
    session: Session<P>,
    specs: Vec<Arc<P::Spec>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    session.connect().await?;
    info!("[{label}] {} session connected", session.family());

    let mut handles = Vec::with_capacity(specs.len());
    for spec in specs {
        match session.subscribe(spec, None).await {
            Ok(handle) => {
                debug!("[{label}] subscribed {}", handle.spec().id());
                handles.push(handle);
            }
            Err(e) => warn!("[{label}] subscribe failed: {e}"),
        }
    }
    info!("[{label}] {} subscription(s) active", handles.len());

    let mut report = tokio::time::interval(REPORT_INTERVAL);
    report.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            _ = report.tick() => {
                if session.is_closed() {
                    warn!("[{label}] session closed");
                    return Ok(());
                }
                if let Some(stats) = session.latency_stats() {
                    info!("[{label}] heartbeat rtt {stats}");
                }
            }
        }
    }

    for handle in &handles {
        if let Err(e) = handle.unsubscribe(None).await {
            warn!("[{label}] {e}");
        }
    }
    session.close().await?;
    Ok(())
}

fn spawn_session(block: &SessionBlock, shutdown: watch::Receiver<bool>) -> Result<JoinHandle<Result<()>>> {
    let label = block.label();
    let config = block.session_config();
    let url = block.url.as_deref();
    let hooks = hooks(&label);

    let task = match block.family {
        Family::Spot => {
            let session = SpotMarket::session(url, config, hooks);
            tokio::spawn(drive(label, session, streams::spot_specs(block)?, shutdown))
        }
        Family::Futures => {
            let session = FuturesMarket::session(url, config, hooks);
            tokio::spawn(drive(label, session, streams::futures_specs(block)?, shutdown))
        }
        Family::User => {
            let (api_key, secret_key) = block.credentials()?;
            let session = FuturesUser::new(api_key, secret_key)?.session(url, config, hooks);
            tokio::spawn(drive(label, session, streams::user_specs(block)?, shutdown))
        }
        Family::SpotUser => {
            let session = SpotUser::new(block.listen_key()?)?.session(url, config, hooks)?;
            tokio::spawn(drive(label, session, streams::spot_user_specs(block)?, shutdown))
        }
    };
    Ok(task)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = mx_core::config::load_config(&cli.config)?;

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    let _guard = mx_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name())?;
    info!(
        "mx-runner starting, config={}, log_level={}, {} session(s)",
        cli.config.display(),
        cli.log_level,
        config.sessions.len()
    );

    // 3. Start one task per session
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();
    for (idx, block) in config.sessions.iter().enumerate() {
        match spawn_session(block, shutdown_rx.clone()) {
            Ok(task) => tasks.push((block.label(), task)),
            Err(e) => error!("session[{idx}] '{}': {e}", block.label()),
        }
    }

    // 4. Wait for shutdown signal
    info!("{} session(s) started, press Ctrl+C to stop", tasks.len());
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    shutdown_tx.send_replace(true);

    // 5. Unsubscribe and close
    for (label, task) in tasks {
        match task.await {
            Ok(Ok(())) => info!("[{label}] stopped"),
            Ok(Err(e)) => error!("[{label}] {e}"),
            Err(e) => error!("[{label}] task failed: {e}"),
        }
    }

    info!("all sessions stopped");
    Ok(())
}
