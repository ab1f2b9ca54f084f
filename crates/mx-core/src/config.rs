//! Configuration for sessions and the runner.
//!
//! [`SessionConfig`] holds the engine timings and has usable defaults. The
//! runner reads everything else from a single JSON file: logging metadata and
//! a `sessions` array where each entry describes one connection.
//!
//! # Example config
//!
//! ```json
//! {
//!   "app": { "module_name": "mxlink", "log_path": "/tmp/log" },
//!   "sessions": [
//!     { "family": "spot", "symbols": ["BTCUSDT"], "streams": ["depth:5", "deals:100ms"] },
//!     { "family": "futures", "symbols": ["BTC_USDT"], "streams": ["ticker", "kline:Min1"],
//!       "heartbeat_interval_ms": 15000 },
//!     { "family": "user", "api_key": "...", "secret_key": "...", "streams": ["order"] },
//!     { "family": "spot_user", "listen_key": "...", "streams": ["account", "orders"] }
//!   ]
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::MxError;

/// Engine timings and queue sizes for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Default deadline for a request/reply round trip.
    pub await_timeout: Duration,
    /// Deadline for a heartbeat ping.
    pub ping_timeout: Duration,
    /// Interval between heartbeat pings.
    pub heartbeat_interval: Duration,
    /// Capacity of the transport's inbound queue.
    pub read_queue_capacity: usize,
    /// Deadline for a single transport write.
    pub write_timeout: Duration,
    /// Deadline for opening the transport.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            await_timeout: Duration::from_secs(1),
            ping_timeout: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(20),
            read_queue_capacity: 1000,
            write_timeout: Duration::from_millis(300),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Stream family of a session block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    Spot,
    Futures,
    /// Futures personal channels, signed login.
    User,
    /// Spot account streams, authorized by a listen key.
    SpotUser,
}

impl std::fmt::Display for Family {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::Futures => write!(f, "futures"),
            Self::User => write!(f, "user"),
            Self::SpotUser => write!(f, "spot_user"),
        }
    }
}

/// Top-level application config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Module metadata (name, log path).
    pub app: Option<ModuleMeta>,

    /// One entry per session to open.
    pub sessions: Vec<SessionBlock>,
}

/// Module metadata block.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleMeta {
    pub module_name: Option<String>,
    pub log_path: Option<String>,
}

/// A single session configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionBlock {
    /// Label used in logs (defaults to the family).
    pub name: Option<String>,

    pub family: Family,

    /// Endpoint override.
    pub url: Option<String>,

    pub await_timeout_ms: Option<u64>,
    pub ping_timeout_ms: Option<u64>,
    pub heartbeat_interval_ms: Option<u64>,
    pub read_queue_capacity: Option<usize>,
    pub write_timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,

    /// Symbols to subscribe (market families).
    #[serde(default)]
    pub symbols: Vec<String>,

    /// Streams to subscribe, as `kind` or `kind:arg` (e.g. `"kline:Min1"`).
    #[serde(default)]
    pub streams: Vec<String>,

    /// API key (user family only).
    pub api_key: Option<String>,

    /// API secret (user family only).
    pub secret_key: Option<String>,

    /// Listen key obtained out of band (spot user family only).
    pub listen_key: Option<String>,
}

impl SessionBlock {
    /// Engine timings with unset fields taken from [`SessionConfig::default`].
    pub fn session_config(&self) -> SessionConfig {
        let d = SessionConfig::default();
        let ms = |v: Option<u64>, fallback: Duration| v.map(Duration::from_millis).unwrap_or(fallback);
        SessionConfig {
            await_timeout: ms(self.await_timeout_ms, d.await_timeout),
            ping_timeout: ms(self.ping_timeout_ms, d.ping_timeout),
            heartbeat_interval: ms(self.heartbeat_interval_ms, d.heartbeat_interval),
            read_queue_capacity: self.read_queue_capacity.unwrap_or(d.read_queue_capacity),
            write_timeout: ms(self.write_timeout_ms, d.write_timeout),
            connect_timeout: ms(self.connect_timeout_ms, d.connect_timeout),
        }
    }

    /// Returns the log label.
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.family.to_string())
    }

    /// Returns `(api_key, secret_key)` or an error if either is missing or empty.
    pub fn credentials(&self) -> Result<(&str, &str), MxError> {
        match (self.api_key.as_deref(), self.secret_key.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => Ok((key, secret)),
            _ => Err(MxError::Credentials(format!("{}: api_key and secret_key are required", self.label()))),
        }
    }

    /// Returns the listen key or an error if it is missing or blank.
    pub fn listen_key(&self) -> Result<&str, MxError> {
        match self.listen_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(MxError::Credentials(format!("{}: listen_key is required", self.label()))),
        }
    }

    /// Configured streams split into `(kind, arg)`.
    pub fn stream_specs(&self) -> Vec<(&str, Option<&str>)> {
        self.streams
            .iter()
            .map(|s| match s.split_once(':') {
                Some((kind, arg)) => (kind.trim(), Some(arg.trim())),
                None => (s.trim(), None),
            })
            .collect()
    }
}

impl AppConfig {
    /// Returns the module name, defaulting to `"mxlink"`.
    pub fn module_name(&self) -> String {
        self.app.as_ref().and_then(|m| m.module_name.clone()).unwrap_or_else(|| "mxlink".to_string())
    }

    /// Returns the log path.
    pub fn log_path(&self) -> Option<String> {
        self.app.as_ref().and_then(|m| m.log_path.clone())
    }

    /// Reject blocks that cannot produce a working session.
    pub fn validate(&self) -> Result<(), MxError> {
        for block in &self.sessions {
            match block.family {
                Family::User => {
                    block.credentials()?;
                }
                Family::SpotUser => {
                    block.listen_key()?;
                }
                Family::Spot | Family::Futures => {
                    if block.symbols.is_empty() && !block.streams.is_empty() {
                        return Err(MxError::Config(format!("{}: streams configured without symbols", block.label())));
                    }
                }
            }
            if block.symbols.iter().any(|s| s.trim().is_empty()) {
                return Err(MxError::Config(format!("{}: symbols must not be blank", block.label())));
            }
            if block.read_queue_capacity == Some(0) {
                return Err(MxError::Config(format!("{}: read_queue_capacity must be positive", block.label())));
            }
        }
        Ok(())
    }
}

/// Load, parse and validate a JSON config file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let config: AppConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = SessionConfig::default();
        assert_eq!(c.await_timeout, Duration::from_secs(1));
        assert_eq!(c.ping_timeout, Duration::from_secs(1));
        assert_eq!(c.heartbeat_interval, Duration::from_secs(20));
        assert_eq!(c.read_queue_capacity, 1000);
        assert_eq!(c.write_timeout, Duration::from_millis(300));
    }

    #[test]
    fn parse_sessions_with_overrides() {
        let json = r#"{
            "app": { "module_name": "md" },
            "sessions": [
                { "family": "spot", "symbols": ["BTCUSDT"], "streams": ["depth:20", "deals"],
                  "heartbeat_interval_ms": 5000 },
                { "family": "user", "name": "acct", "api_key": "k", "secret_key": "s" }
            ]
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.module_name(), "md");
        assert!(config.log_path().is_none());

        let spot = &config.sessions[0];
        assert_eq!(spot.family, Family::Spot);
        assert_eq!(spot.label(), "spot");
        assert_eq!(spot.session_config().heartbeat_interval, Duration::from_secs(5));
        assert_eq!(spot.session_config().await_timeout, Duration::from_secs(1));
        assert_eq!(spot.stream_specs(), vec![("depth", Some("20")), ("deals", None)]);

        let user = &config.sessions[1];
        assert_eq!(user.label(), "acct");
        assert_eq!(user.credentials().unwrap(), ("k", "s"));
    }

    #[test]
    fn user_block_requires_credentials() {
        let json = r#"{ "sessions": [ { "family": "user", "api_key": "k" } ] }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(MxError::Credentials(_))));
    }

    #[test]
    fn blank_symbols_are_rejected() {
        for symbols in [r#"[""]"#, r#"["BTCUSDT", "   "]"#] {
            let json = format!(r#"{{ "sessions": [ {{ "family": "spot", "symbols": {symbols}, "streams": ["depth"] }} ] }}"#);
            let config: AppConfig = serde_json::from_str(&json).unwrap();
            match config.validate() {
                Err(MxError::Config(msg)) => assert!(msg.contains("symbols must not be blank"), "{msg}"),
                other => panic!("expected config error, got {other:?}"),
            }
        }
    }

    #[test]
    fn spot_user_block_requires_listen_key() {
        let json = r#"{ "sessions": [ { "family": "spot_user", "listen_key": " " } ] }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(MxError::Credentials(_))));

        let json = r#"{ "sessions": [ { "family": "spot_user", "listen_key": "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1" } ] }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.sessions[0].family, Family::SpotUser);
        assert_eq!(config.sessions[0].label(), "spot_user");
    }

    #[test]
    fn unknown_family_is_rejected() {
        let json = r#"{ "sessions": [ { "family": "options" } ] }"#;
        assert!(serde_json::from_str::<AppConfig>(json).is_err());
    }
}
