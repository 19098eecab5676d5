//! Mirror consistency: bulk load plus watch replay must converge on the
//! last-observed store state.


use missiond::config::KeySpace;
use missiond::mission::{DurationUnit, MissionMirror};
use missiond::store::{CoordinationStore, MemStore, WatchEvent};

use test_harness::{mission, put_mission};

#[tokio::test]
async fn bulk_load_then_replay_keeps_only_surviving_missions() {
    let keys = KeySpace::new("test");
    let store = MemStore::new();
    let mut mirror = MissionMirror::new(keys.clone());
    mirror.bulk_load(&store).await.unwrap();
    assert_eq!(mirror.mission_count(), 0);

    let m1 = serde_json::to_string(&mission("m1", 1, DurationUnit::Day)).unwrap();
    let m2 = serde_json::to_string(&mission("m2", 1, DurationUnit::Hour)).unwrap();
    for event in [
        WatchEvent::put(keys.mission_key("m1"), m1),
        WatchEvent::put(keys.mission_key("m2"), m2),
        WatchEvent::delete(keys.mission_key("m1")),
    ] {
        mirror.apply(&event);
    }

    assert_eq!(mirror.mission_count(), 1);
    assert!(mirror.get("m1").is_none());
    assert_eq!(mirror.get("m2").unwrap().id, "m2");
}

#[tokio::test]
async fn bulk_load_populates_both_prefixes() {
    let keys = KeySpace::new("test");
    let store = MemStore::new();
    put_mission(&store, &keys, &mission("m1", 1, DurationUnit::Day)).await;
    store
        .put(&keys.next_exec_key("m1"), "1700000000", None)
        .await
        .unwrap();

    let mut mirror = MissionMirror::new(keys.clone());
    mirror.bulk_load(&store).await.unwrap();

    assert_eq!(mirror.mission_count(), 1);
    assert_eq!(mirror.next_due("m1"), Some(1_700_000_000));
}

#[tokio::test]
async fn reload_after_gap_converges_on_store_state() {
    let keys = KeySpace::new("test");
    let store = MemStore::new();
    put_mission(&store, &keys, &mission("m1", 1, DurationUnit::Day)).await;

    let mut mirror = MissionMirror::new(keys.clone());
    mirror.bulk_load(&store).await.unwrap();
    assert_eq!(mirror.mission_count(), 1);

    // Changes the mirror never saw as events: one mission replaced, one
    // deleted, one added.
    put_mission(&store, &keys, &mission("m2", 2, DurationUnit::Week)).await;
    store.delete(&keys.mission_key("m1")).await.unwrap();
    store
        .put(&keys.next_exec_key("m2"), "1800000000", None)
        .await
        .unwrap();

    mirror.bulk_load(&store).await.unwrap();
    assert_eq!(mirror.mission_count(), 1);
    assert!(mirror.get("m1").is_none());
    assert_eq!(mirror.get("m2").unwrap().duration, 2);
    assert_eq!(mirror.next_due("m2"), Some(1_800_000_000));
}

#[tokio::test]
async fn watch_events_from_store_apply_cleanly() {
    let keys = KeySpace::new("test");
    let store = MemStore::new();
    let mut events = store.watch(&keys.mission_prefix()).await.unwrap();

    put_mission(&store, &keys, &mission("m1", 1, DurationUnit::Day)).await;
    store.delete(&keys.mission_key("m1")).await.unwrap();

    let mut mirror = MissionMirror::new(keys.clone());
    mirror.apply(&events.recv().await.unwrap());
    assert_eq!(mirror.mission_count(), 1);

    mirror.apply(&events.recv().await.unwrap());
    assert_eq!(mirror.mission_count(), 0);
}
