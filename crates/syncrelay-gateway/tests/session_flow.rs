//! Full sessions over fake sockets: join, relay, tolerate noise, always leave.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use axum::extract::ws::Message as WsMessage;
use serde_json::json;

use syncrelay_core::error::SyncRelayError;
use syncrelay_gateway::realtime::{Broker, ClientReader};
use syncrelay_gateway::transport::ws::drive_session;

use common::{find, inbound, settle, text, wait_until, Peer};

#[tokio::test]
async fn two_sessions_catch_up_and_chat() {
    let (broker, _workers) = Broker::spawn_sharded(1);

    let mut a = Peer::new("room1");
    let (a_in, a_stream) = inbound();
    let a_session = tokio::spawn(drive_session(
        broker.clone(),
        a.client.clone(),
        ClientReader::new(a.id(), a_stream),
    ));
    wait_until(&broker, |s| find(s, "room1").map(|c| c.members) == Some(1)).await;

    let mut b = Peer::new("room1");
    let (b_in, b_stream) = inbound();
    let b_session = tokio::spawn(drive_session(
        broker.clone(),
        b.client.clone(),
        ClientReader::new(b.id(), b_stream),
    ));

    let request = a.next().await;
    assert_eq!(request["type"], "sync/request");

    // noise on A's socket does not end its session
    a_in.send(text("{not json")).await.unwrap();
    a_in.send(Ok(WsMessage::Ping(vec![1, 2]))).await.unwrap();
    a_in.send(text(r#"{"type":"sync/reply","payload":{"state":42}}"#))
        .await
        .unwrap();

    let reply = b.next().await;
    assert_eq!(reply["type"], "sync/reply");
    assert_eq!(reply["payload"], json!({"state": 42}));
    assert_eq!(reply["meta"]["relayed"], json!(true));

    b_in.send(text(r#"{"type":"chat","meta":{"k":"v"},"payload":"hi"}"#))
        .await
        .unwrap();
    let chat = a.next().await;
    assert_eq!(chat["payload"], "hi");
    assert_eq!(chat["meta"], json!({"k": "v", "relayed": true}));

    // A disconnects cleanly
    drop(a_in);
    let res = a_session.await.unwrap();
    assert!(matches!(res, Err(SyncRelayError::ConnectionClosed)));
    wait_until(&broker, |s| {
        find(s, "room1").map(|c| (c.members, c.stale)) == Some((1, 0))
    })
    .await;

    // B's transport breaks
    b_in.send(Err("connection reset".into())).await.unwrap();
    let res = b_session.await.unwrap();
    assert!(matches!(res, Err(SyncRelayError::Transport(_))));
    wait_until(&broker, |s| s.is_empty()).await;
}

#[tokio::test]
async fn cancelled_session_still_leaves() {
    let (broker, _workers) = Broker::spawn_sharded(1);

    let a = Peer::new("room1");
    let (_a_in, a_stream) = inbound();
    let session = tokio::spawn(drive_session(
        broker.clone(),
        a.client.clone(),
        ClientReader::new(a.id(), a_stream),
    ));
    wait_until(&broker, |s| find(s, "room1").is_some()).await;

    session.abort();
    let _ = session.await;
    wait_until(&broker, |s| s.is_empty()).await;
}

#[tokio::test]
async fn close_frame_ends_session() {
    let (broker, _workers) = Broker::spawn_sharded(1);

    let a = Peer::new("lobby");
    let (a_in, a_stream) = inbound();
    a_in.send(Ok(WsMessage::Close(None))).await.unwrap();

    let res = drive_session(broker.clone(), a.client.clone(), ClientReader::new(a.id(), a_stream)).await;
    assert!(matches!(res, Err(SyncRelayError::ConnectionClosed)));
    assert!(settle(&broker).await.is_empty());
}
