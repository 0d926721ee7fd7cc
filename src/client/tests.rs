//! Unit tests for the client control surface that need no live connection.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use rstest::{fixture, rstest};
use tracing::Level;

use super::*;
use crate::transport::{Connector, Transport, TransportError};

#[derive(Clone, Default)]
struct RefusingConnector {
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Connector for RefusingConnector {
    async fn connect(&self, addr: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(TransportError::Connect(format!("{addr} refused")))
    }
}

#[fixture]
fn connector() -> RefusingConnector { RefusingConnector::default() }

#[rstest]
#[tokio::test]
async fn dial_without_addresses_is_rejected(connector: RefusingConnector) {
    let client = Client::builder().connector(connector.clone()).build();
    let empty: [&str; 0] = [];
    let err = client.dial(&empty).await.expect_err("empty dial must fail");
    assert!(matches!(err, ClientError::NoAddresses));
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
}

#[rstest]
#[tokio::test]
async fn dial_failure_names_every_address(connector: RefusingConnector) {
    let client = Client::builder().connector(connector.clone()).build();
    let err = client
        .dial(&["ws://a.invalid", "ws://b.invalid"])
        .await
        .expect_err("dial must fail");
    let ClientError::Dial { addrs, source } = err else {
        panic!("expected dial error, got {err:?}");
    };
    assert_eq!(addrs, vec!["ws://a.invalid", "ws://b.invalid"]);
    assert_eq!(
        source,
        TransportError::Connect("ws://b.invalid refused".to_owned())
    );
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
    assert!(!client.is_connected());
}

#[test]
fn run_requires_connection() {
    let client = Client::builder().build();
    let err = client.run().expect_err("run without connection must fail");
    assert!(matches!(err, ClientError::NotConnected));
}

#[tokio::test]
async fn close_without_connection_still_notifies_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    let client = Client::builder()
        .on_close(move |_, reason| {
            assert_eq!(reason, CloseReason::Actively);
            seen.fetch_add(1, Ordering::SeqCst);
        })
        .build();

    client.close(CloseReason::Actively).await.expect("close");
    client.close(CloseReason::Unknown).await.expect("second close");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(client.is_closed());
}

#[rstest]
#[tokio::test]
async fn closed_client_refuses_dial_until_reset(connector: RefusingConnector) {
    let client = Client::builder().connector(connector.clone()).build();
    client.auth_success();
    client.close(CloseReason::Actively).await.expect("close");

    let err = client
        .dial(&["ws://a.invalid"])
        .await
        .expect_err("dial after close must fail");
    assert!(matches!(err, ClientError::Closed));
    assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);

    client.reset().expect("reset");
    assert!(!client.is_closed());
    assert!(!client.is_authed());
    let err = client
        .dial(&["ws://a.invalid"])
        .await
        .expect_err("refusing connector fails");
    assert!(matches!(err, ClientError::Dial { .. }));
}

#[test]
fn auth_flag_follows_success() {
    let client = Client::builder().build();
    assert!(!client.is_authed());
    client.auth_success();
    assert!(client.is_authed());
}

#[test]
fn builder_normalizes_config() {
    let client = Client::builder()
        .config(ClientConfig {
            queue_capacity: 0,
            ..ClientConfig::default()
        })
        .build();
    assert_eq!(client.config().queue_capacity, 1);
}

#[test]
fn builder_rejects_duplicate_route() {
    let err = Client::builder()
        .route(7, |_| Ok(()))
        .and_then(|b| b.route(7, |_| Ok(())))
        .expect_err("duplicate route must fail");
    assert!(matches!(err, ClientError::DuplicateRoute(7)));
}

#[test]
fn tracing_config_defaults() {
    let config = TracingConfig::default();
    assert_eq!(config.dial_level, Level::INFO);
    assert_eq!(config.send_level, Level::DEBUG);
    assert_eq!(config.close_level, Level::INFO);
    assert!(!config.dial_timing && !config.send_timing && !config.close_timing);
}

#[test]
fn tracing_config_bulk_setters() {
    let config = TracingConfig::default()
        .with_all_levels(Level::TRACE)
        .with_all_timing(true);
    assert_eq!(config.dial_level, Level::TRACE);
    assert_eq!(config.loop_level, Level::TRACE);
    assert!(config.dial_timing && config.send_timing && config.close_timing);
}

#[test]
fn debug_hides_internals() {
    let client = Client::builder().build();
    let rendered = format!("{client:?}");
    assert!(rendered.starts_with("Client {"));
    assert!(rendered.contains("connected: false"));
}
