use super::{HistoryStore, SledHistory};
use crate::aqi::{Concentrations, compute_aqi};
use crate::ingest::reading::{Reading, ReadingInput};
use tempfile::tempdir;

fn create_test_store(ttl: Option<i64>) -> (SledHistory, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = SledHistory::open(dir.path().to_str().unwrap(), ttl).unwrap();
    (store, dir)
}

fn reading_at(channel_id: &str, timestamp: i64, co2: f64) -> Reading {
    let input = ReadingInput {
        co2,
        co: 0.2,
        no2: 5.0,
        temperature: None,
        humidity: None,
        timestamp: None,
    };
    let result = compute_aqi(&Concentrations {
        co2,
        co: 0.2,
        no2: 5.0,
    });
    Reading::enriched(channel_id, &input, result, timestamp)
}

#[test]
fn test_append_assigns_id_and_latest_returns_it() {
    let (store, _dir) = create_test_store(None);

    let stored = store.append("c1", reading_at("c1", 1_000, 175.0)).unwrap();
    assert_ne!(stored.id, 0);

    let latest = store.latest("c1").unwrap().unwrap();
    assert_eq!(latest, stored);
    assert_eq!(latest.aqi, 25);
}

#[test]
fn test_latest_on_empty_channel_is_none() {
    let (store, _dir) = create_test_store(None);
    assert!(store.latest("empty").unwrap().is_none());
}

#[test]
fn test_range_is_oldest_to_newest() {
    let (store, _dir) = create_test_store(None);

    for (ts, co2) in [(3_000, 300.0), (1_000, 100.0), (2_000, 200.0)] {
        store.append("c1", reading_at("c1", ts, co2)).unwrap();
    }

    let all = store.range("c1", None, None, 10).unwrap();
    let timestamps: Vec<i64> = all.iter().map(|r| r.timestamp).collect();
    assert_eq!(timestamps, vec![1_000, 2_000, 3_000]);
}

#[test]
fn test_range_bounds_and_limit() {
    let (store, _dir) = create_test_store(None);

    for ts in [1_000, 2_000, 3_000, 4_000] {
        store.append("c1", reading_at("c1", ts, 100.0)).unwrap();
    }

    let window = store.range("c1", Some(2_000), Some(3_000), 10).unwrap();
    assert_eq!(window.len(), 2);
    assert_eq!(window[0].timestamp, 2_000);
    assert_eq!(window[1].timestamp, 3_000);

    let capped = store.range("c1", None, None, 2).unwrap();
    assert_eq!(capped.len(), 2);
    assert_eq!(capped[0].timestamp, 1_000);
}

#[test]
fn test_channels_are_isolated() {
    let (store, _dir) = create_test_store(None);

    store.append("c1", reading_at("c1", 1_000, 100.0)).unwrap();
    store.append("c2", reading_at("c2", 2_000, 200.0)).unwrap();

    let c1 = store.range("c1", None, None, 10).unwrap();
    assert_eq!(c1.len(), 1);
    assert_eq!(c1[0].channel_id, "c1");
}

#[test]
fn test_same_millisecond_appends_both_survive() {
    let (store, _dir) = create_test_store(None);

    let a = store.append("c1", reading_at("c1", 1_000, 100.0)).unwrap();
    let b = store.append("c1", reading_at("c1", 1_000, 200.0)).unwrap();
    assert_ne!(a.id, b.id);

    let all = store.range("c1", None, None, 10).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn test_expired_readings_are_swept_on_read() {
    let (store, _dir) = create_test_store(Some(60));

    let stale_ms = (chrono::Utc::now().timestamp() - 120) * 1000;
    store.append("c1", reading_at("c1", stale_ms, 100.0)).unwrap();
    let fresh_ms = chrono::Utc::now().timestamp_millis();
    store.append("c1", reading_at("c1", fresh_ms, 200.0)).unwrap();

    let all = store.range("c1", None, None, 10).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].timestamp, fresh_ms);
}
