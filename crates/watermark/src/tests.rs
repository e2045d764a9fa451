//! Unit tests for the watermark crate.

use chrono::{Duration, TimeZone, Utc};

use crate::{MemoryStore, Watermark, WatermarkStore, INITIAL_WATERMARK};

fn at(secs: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

// ============================================================================
// Watermark Tests
// ============================================================================

#[test]
fn test_current_picks_largest_last_row() {
    let history = vec![
        Watermark {
            dataset_name: "eventmodel".into(),
            last_row: 10,
            synced_at: at(0),
        },
        Watermark {
            dataset_name: "eventmodel".into(),
            last_row: 25,
            synced_at: at(60),
        },
        Watermark {
            dataset_name: "eventmodel".into(),
            last_row: 25,
            synced_at: at(120),
        },
    ];

    let current = Watermark::current(&history).unwrap();
    assert_eq!(current.last_row, 25);
    assert_eq!(current.synced_at, at(120));
}

#[test]
fn test_current_of_empty_history() {
    let history: Vec<Watermark> = Vec::new();
    assert!(Watermark::current(&history).is_none());
}

#[test]
fn test_display() {
    let wm = Watermark {
        dataset_name: "apple_screentime".into(),
        last_row: 42,
        synced_at: at(0),
    };
    assert_eq!(wm.to_string(), "apple_screentime@42 (2023-11-14T22:13:20+00:00)");
}

#[test]
fn test_serialization_roundtrip() {
    let wm = Watermark::now("apple_screentime", 7);
    let json = serde_json::to_string(&wm).unwrap();
    let parsed: Watermark = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, wm);
}

// ============================================================================
// MemoryStore Tests
// ============================================================================

#[tokio::test]
async fn test_unknown_dataset_reads_initial_watermark() {
    let store = MemoryStore::new();
    assert_eq!(
        store.get_watermark("never_synced").await.unwrap(),
        INITIAL_WATERMARK
    );
    assert!(store.latest_watermark("never_synced").await.unwrap().is_none());
}

#[tokio::test]
async fn test_advance_appends_history() {
    let store = MemoryStore::new();
    store.advance_watermark("eventmodel", 3, at(0)).await.unwrap();
    store.advance_watermark("eventmodel", 5, at(10)).await.unwrap();

    assert_eq!(store.get_watermark("eventmodel").await.unwrap(), 5);
    let history = store.history("eventmodel");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].last_row, 3);
    assert_eq!(history[1].last_row, 5);
}

#[tokio::test]
async fn test_lower_entry_does_not_move_current_back() {
    let store = MemoryStore::new();
    store.advance_watermark("eventmodel", 9, at(0)).await.unwrap();
    store
        .advance_watermark("eventmodel", 4, at(0) + Duration::minutes(5))
        .await
        .unwrap();

    assert_eq!(store.get_watermark("eventmodel").await.unwrap(), 9);
}

#[tokio::test]
async fn test_datasets_are_independent() {
    let store = MemoryStore::new();
    store.advance_watermark("apple_screentime", 100, at(0)).await.unwrap();
    store.advance_watermark("eventmodel", 7, at(0)).await.unwrap();

    assert_eq!(store.get_watermark("apple_screentime").await.unwrap(), 100);
    assert_eq!(store.get_watermark("eventmodel").await.unwrap(), 7);
    assert!(store.history("other").is_empty());
}
