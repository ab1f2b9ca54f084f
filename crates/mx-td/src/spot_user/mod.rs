//! Spot account streams.
//!
//! Same wire format as the spot market family: JSON requests and replies,
//! protobuf pushes. The connection itself is authorized by a listen key in
//! the query string:
//!
//! ```text
//! wss://wbs-api.mexc.com/ws?listenKey=pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1
//! → {"id":1,"method":"SUBSCRIPTION","params":["spot@private.orders.v3.api.pb"]}
//! ← {"id":1,"code":0,"msg":"spot@private.orders.v3.api.pb"}
//! ```
//!
//! Creating and renewing the listen key is a REST call and is left to the
//! caller.

pub mod streams;

use std::sync::Arc;

use mx_core::{
    Correlation, DecodeError, EventHandler, Hooks, MxError, Protocol, Request, Session, SessionConfig,
    SubscriptionOp, UnsubscribeMode, WsTransport,
};
use mx_md::spot::{self, ENDPOINT, SpotFrame, SpotMarket};
use url::Url;

pub use streams::{
    AccountDeal, AccountOrder, AccountUpdate, SpotOrderStatus, SpotOrderType, account_deals, account_orders,
    account_updates,
};

/// Spot user [`Protocol`]; requests and matching are those of [`SpotMarket`].
#[derive(Clone)]
pub struct SpotUser {
    listen_key: String,
}

impl SpotUser {
    pub fn new(listen_key: &str) -> Result<Self, MxError> {
        let listen_key = listen_key.trim();
        if listen_key.is_empty() {
            return Err(MxError::Credentials("listen key is empty".into()));
        }
        Ok(Self { listen_key: listen_key.to_string() })
    }

    /// `base` (or [`ENDPOINT`]) with the listen key appended.
    pub fn endpoint(&self, base: Option<&str>) -> Result<String, MxError> {
        let base = base.unwrap_or(ENDPOINT);
        let url = Url::parse_with_params(base, [("listenKey", self.listen_key.as_str())])
            .map_err(|e| MxError::Config(format!("invalid url {base}: {e}")))?;
        Ok(url.into())
    }

    /// Session over a WebSocket to [`endpoint`](Self::endpoint).
    pub fn session(self, url: Option<&str>, config: SessionConfig, hooks: Hooks) -> Result<Session<Self>, MxError> {
        let transport = Arc::new(WsTransport::new(
            self.endpoint(url)?,
            Self::FAMILY,
            config.read_queue_capacity,
            config.write_timeout,
        ));
        Ok(Session::with_hooks(self, transport, config, hooks))
    }
}

impl std::fmt::Debug for SpotUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotUser").finish_non_exhaustive()
    }
}

impl Protocol for SpotUser {
    type Frame = SpotFrame;
    type Spec = dyn EventHandler<SpotFrame>;

    const FAMILY: &'static str = "spot_user";
    const MAX_SUBSCRIPTIONS: usize = SpotMarket::MAX_SUBSCRIPTIONS;
    const CORRELATION: Correlation = Correlation::ById;
    const UNSUBSCRIBE: UnsubscribeMode = UnsubscribeMode::AwaitAck;

    fn decode(&self, raw: &[u8]) -> Result<SpotFrame, DecodeError> {
        spot::decode_frame(raw)
    }

    fn correlation_id(&self, frame: &SpotFrame) -> Option<u64> {
        SpotMarket.correlation_id(frame)
    }

    fn ping(&self, id: u64) -> Request<SpotFrame> {
        SpotMarket.ping(id)
    }

    fn subscription(&self, id: u64, op: SubscriptionOp, spec: &Self::Spec) -> Option<Request<SpotFrame>> {
        SpotMarket.subscription(id, op, spec)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use mx_core::transport::mock::MockTransport;
    use mx_md::spot::SpotPush;
    use mx_md::spot::proto::PrivateAccountV3Api;
    use mx_md::spot::proto::push_data_v3_api_wrapper::Body;
    use parking_lot::Mutex;
    use prost::Message;
    use serde_json::{Value, json};

    use super::*;

    const LISTEN_KEY: &str = "pqia91ma19a5s61cv6a81va65sdf19v8a65a1a5s61cv6a81va65sdf19v8a65a1";

    fn config() -> SessionConfig {
        SessionConfig { heartbeat_interval: Duration::from_secs(3600), ..SessionConfig::default() }
    }

    /// Acks private streams, refuses anything else.
    fn server() -> Arc<MockTransport> {
        let mock = Arc::new(MockTransport::new());
        mock.respond_with(|raw| {
            let req: Value = serde_json::from_slice(raw).unwrap();
            let Some(id) = req["id"].as_u64() else { return Vec::new() };
            let stream = req["params"][0].as_str().unwrap_or_default();
            let msg = if stream.starts_with("spot@private.") { stream.to_string() } else { "no permission".into() };
            vec![json!({"id": id, "code": 0, "msg": msg}).to_string().into_bytes()]
        });
        mock
    }

    #[test]
    fn listen_key_is_required_and_appended() {
        assert!(matches!(SpotUser::new("  "), Err(MxError::Credentials(_))));

        let user = SpotUser::new(LISTEN_KEY).unwrap();
        assert_eq!(user.endpoint(None).unwrap(), format!("wss://wbs-api.mexc.com/ws?listenKey={LISTEN_KEY}"));
        assert_eq!(user.endpoint(Some("ws://127.0.0.1:9000/ws")).unwrap(), format!("ws://127.0.0.1:9000/ws?listenKey={LISTEN_KEY}"));
        assert!(matches!(user.endpoint(Some("not a url")), Err(MxError::Config(_))));
        assert!(!format!("{user:?}").contains(LISTEN_KEY));
    }

    #[test]
    fn requests_match_spot_market() {
        let user = SpotUser::new(LISTEN_KEY).unwrap();
        let stream = account_updates(|_| {});
        let req = user.subscription(3, SubscriptionOp::Subscribe, &stream).unwrap();
        let payload: Value = serde_json::from_slice(&req.payload).unwrap();
        assert_eq!(payload, json!({"id": 3, "method": "SUBSCRIPTION", "params": ["spot@private.account.v3.api.pb"]}));
        assert_eq!(user.ping(0).payload, br#"{"method":"PING"}"#.to_vec());
    }

    #[tokio::test]
    async fn subscribe_and_receive_account_updates() {
        let mock = server();
        let session = Session::new(SpotUser::new(LISTEN_KEY).unwrap(), mock.clone(), config());
        session.connect().await.unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let stream: Arc<dyn EventHandler<SpotFrame>> =
            Arc::new(account_updates(move |u: AccountUpdate| sink.lock().push(u)));
        let handle = session.subscribe(stream, None).await.unwrap();
        assert_eq!(handle.key(), "spot@private.account.v3.api.pb");

        let push = SpotPush {
            channel: "spot@private.account.v3.api.pb".into(),
            create_time: Some(1736417034305),
            send_time: Some(1736417034307),
            body: Some(Body::PrivateAccount(PrivateAccountV3Api {
                vcoin_name: "USDT".into(),
                coin_id: "128f589271cb4951b03e71e6323eb7be".into(),
                balance_amount: "21.94210356004384".into(),
                balance_amount_change: "10".into(),
                frozen_amount: "0".into(),
                frozen_amount_change: "0".into(),
                r#type: "CONTRACT_TRANSFER".into(),
                time: 1736416910000,
            })),
            ..Default::default()
        };
        mock.push(push.encode_to_vec());
        for _ in 0..100 {
            if !seen.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(seen.lock()[0].balance_amount_change, 10.0);

        handle.unsubscribe(None).await.unwrap();
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn refused_stream_is_rejected() {
        let mock = server();
        let session = Session::new(SpotUser::new(LISTEN_KEY).unwrap(), mock.clone(), config());
        session.connect().await.unwrap();

        let stream: Arc<dyn EventHandler<SpotFrame>> =
            Arc::new(mx_md::spot::book_ticker_batch("BTCUSDT", |_| {}));
        let err = session.subscribe(stream, None).await.unwrap_err();
        assert!(err.is_rejected(), "{err}");
        session.close().await.unwrap();
    }
}
