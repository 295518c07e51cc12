use std::sync::Arc;

use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

use super::FanoutRouter;
use crate::aqi::{Concentrations, compute_aqi};
use crate::ingest::reading::{Reading, ReadingInput};
use crate::session::Session;
use crate::stats::Stats;
use crate::transport::message::ServerMessage;

fn router() -> FanoutRouter {
    FanoutRouter::new(Arc::new(Stats::new()))
}

fn observer() -> (Session, mpsc::UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Session::new(tx), rx)
}

fn reading(channel_id: &str, co2: f64) -> Reading {
    let input = ReadingInput {
        co2,
        co: 0.1,
        no2: 2.0,
        temperature: None,
        humidity: None,
        timestamp: None,
    };
    let result = compute_aqi(&Concentrations {
        co2,
        co: 0.1,
        no2: 2.0,
    });
    Reading::enriched(channel_id, &input, result, 1_000)
}

fn expect_reading(rx: &mut mpsc::UnboundedReceiver<WsMessage>) -> (String, Reading) {
    let msg = rx.try_recv().expect("expected a reading event");
    let WsMessage::Text(text) = msg else {
        panic!("expected a text frame");
    };
    match serde_json::from_str::<ServerMessage>(&text).unwrap() {
        ServerMessage::Reading {
            channel_id,
            reading,
            ..
        } => (channel_id, reading),
        other => panic!("expected a reading event, got {other:?}"),
    }
}

#[test]
fn test_emit_reaches_only_the_joined_room() {
    let router = router();
    let (watcher, mut watcher_rx) = observer();
    let (bystander, mut bystander_rx) = observer();

    router.join(&watcher, "c1");
    router.join(&bystander, "c2");

    router.emit("c1", &reading("c1", 175.0));

    let (channel_id, delivered) = expect_reading(&mut watcher_rx);
    assert_eq!(channel_id, "c1");
    assert_eq!(delivered.aqi, 25);
    assert!(bystander_rx.try_recv().is_err());
}

#[test]
fn test_emit_with_empty_room_is_a_no_op() {
    let router = router();
    // Never joined at all.
    router.emit("nobody-home", &reading("nobody-home", 100.0));

    // Joined then left.
    let (session, mut rx) = observer();
    router.join(&session, "c1");
    router.leave(&session.id, "c1");
    router.emit("c1", &reading("c1", 100.0));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_join_is_idempotent() {
    let router = router();
    let (session, mut rx) = observer();

    assert!(router.join(&session, "c1"));
    assert!(!router.join(&session, "c1"));
    assert_eq!(router.member_count("c1"), 1);

    router.emit("c1", &reading("c1", 100.0));
    expect_reading(&mut rx);
    // A double join must not cause a double delivery.
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_leave_without_join_is_a_no_op() {
    let router = router();
    let (session, _rx) = observer();
    router.leave(&session.id, "never-joined");
    assert_eq!(router.member_count("never-joined"), 0);
}

#[test]
fn test_cleanup_connection_clears_every_room() {
    let router = router();
    let (session, _rx) = observer();

    router.join(&session, "c1");
    router.join(&session, "c2");
    router.cleanup_connection(&session.id);

    assert_eq!(router.member_count("c1"), 0);
    assert_eq!(router.member_count("c2"), 0);

    // A leave after termination is still a no-op, not an error.
    router.leave(&session.id, "c1");
}

#[test]
fn test_emit_skips_vanished_recipient() {
    let router = router();
    let (alive, mut alive_rx) = observer();
    let (dead, dead_rx) = observer();

    router.join(&alive, "c1");
    router.join(&dead, "c1");
    drop(dead_rx);

    router.emit("c1", &reading("c1", 100.0));
    expect_reading(&mut alive_rx);
}

#[test]
fn test_per_channel_fifo_order() {
    let router = router();
    let (session, mut rx) = observer();
    router.join(&session, "c1");

    router.emit("c1", &reading("c1", 100.0));
    router.emit("c1", &reading("c1", 200.0));

    let (_, first) = expect_reading(&mut rx);
    let (_, second) = expect_reading(&mut rx);
    assert_eq!(first.co2, 100.0);
    assert_eq!(second.co2, 200.0);
}
