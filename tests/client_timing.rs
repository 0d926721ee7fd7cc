//! Tests for the authentication deadline and heartbeat schedule.
//!
//! Each test runs on a paused clock so the ten-second deadline and the
//! heartbeat interval elapse instantly.

use std::time::Duration;

use opframe::{
    client::{Client, ClientConfig, CloseReason},
    proto::{DEFAULT_SEQUENCE, Message, op},
    transport::Frame,
};
use opframe_testing::{CloseRecorder, close_recorder, connected_client};
use rstest::rstest;
use tokio::time::{self, Instant};

#[rstest]
#[tokio::test(start_paused = true)]
async fn missing_auth_closes_after_deadline(close_recorder: CloseRecorder) {
    let (client, mut peer, _) =
        connected_client(Client::builder().on_close(close_recorder.handler())).await;
    let start = Instant::now();
    client.run().expect("run");

    close_recorder.wait_for(1).await;

    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(close_recorder.reasons(), vec![CloseReason::AuthFailed]);
    assert_eq!(peer.try_sent(), Some(Frame::Close), "no heartbeat before the deadline");
    assert_eq!(peer.try_sent(), None);
    assert_eq!(peer.close_calls(), 1);
    assert_eq!(client.active_loops(), 0);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn auth_before_deadline_keeps_connection(close_recorder: CloseRecorder) {
    let (client, _peer, _) =
        connected_client(Client::builder().on_close(close_recorder.handler())).await;
    client.run().expect("run");

    time::sleep(Duration::from_secs(9)).await;
    client.auth_success();
    time::sleep(Duration::from_secs(60)).await;

    assert!(close_recorder.reasons().is_empty());
    assert!(!client.is_closed());
    assert_eq!(client.active_loops(), 2);
}

#[tokio::test(start_paused = true)]
async fn heartbeats_follow_interval() {
    let config = ClientConfig {
        heartbeat_interval: Duration::from_secs(5),
        ..ClientConfig::default()
    };
    let (client, mut peer, _) = connected_client(Client::builder().config(config)).await;
    client.auth_success();
    let start = Instant::now();
    client.run().expect("run");

    for n in 1..=3u32 {
        let heartbeat = peer.next_message().await.expect("heartbeat");
        assert_eq!(heartbeat, Message::new(DEFAULT_SEQUENCE, op::HEARTBEAT, ""));
        assert_eq!(start.elapsed(), Duration::from_secs(5) * n);
    }
    client.close(CloseReason::Actively).await.expect("close");
}

#[tokio::test(start_paused = true)]
async fn inbound_messages_do_not_delay_heartbeats() {
    let config = ClientConfig {
        heartbeat_interval: Duration::from_secs(5),
        ..ClientConfig::default()
    };
    let (client, mut peer, _) = connected_client(Client::builder().config(config)).await;
    client.auth_success();
    let start = Instant::now();
    client.run().expect("run");

    for _ in 0..4 {
        time::sleep(Duration::from_secs(1)).await;
        peer.push_messages(&[Message::new(1, op::SEND_MSG_REPLY, "noise")]);
    }

    let heartbeat = peer.next_message().await.expect("heartbeat");
    assert_eq!(heartbeat.operation(), op::HEARTBEAT);
    assert_eq!(start.elapsed(), Duration::from_secs(5));
    client.close(CloseReason::Actively).await.expect("close");
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn close_does_not_wait_for_stalled_heartbeat(close_recorder: CloseRecorder) {
    let config = ClientConfig {
        heartbeat_interval: Duration::from_secs(1),
        ..ClientConfig::default()
    };
    let (client, peer, _) = connected_client(
        Client::builder()
            .config(config)
            .on_close(close_recorder.handler()),
    )
    .await;
    client.auth_success();
    client.run().expect("run");
    peer.stall_sends();

    // The first heartbeat is now stuck in the transport.
    time::sleep(Duration::from_secs(2)).await;

    time::timeout(Duration::from_secs(600), client.close(CloseReason::Actively))
        .await
        .expect("close finishes while the heartbeat is stuck")
        .expect("close");
    assert_eq!(close_recorder.reasons(), vec![CloseReason::Actively]);
    assert_eq!(client.active_loops(), 0);
    assert_eq!(peer.close_calls(), 1);
}
