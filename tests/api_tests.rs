//! Admin API behavior over an in-memory store.


use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceExt;

use missiond::api::{router, ApiState};
use missiond::cluster::Membership;
use missiond::config::KeySpace;
use missiond::mission::{DurationUnit, MissionMirror};
use missiond::store::{CoordinationStore, MemStore, WatchEvent};

use test_harness::mission;

struct Fixture {
    keys: KeySpace,
    store: Arc<MemStore>,
    state: ApiState,
}

impl Fixture {
    fn new() -> Self {
        let keys = KeySpace::new("api");
        let store = Arc::new(MemStore::new());
        let mut membership = Membership::new(7);
        membership.update(vec![7, 9]);
        let state = ApiState {
            node_id: 7,
            keys: keys.clone(),
            store: store.clone(),
            mirror: Arc::new(RwLock::new(MissionMirror::new(keys.clone()))),
            membership: Arc::new(RwLock::new(membership)),
        };
        Self { keys, store, state }
    }

    fn app(&self) -> Router {
        router(self.state.clone())
    }

    /// Feed a mission into the mirror the way the watch would.
    async fn observe_mission(&self, m: &missiond::mission::Mission) {
        let encoded = serde_json::to_string(m).unwrap();
        self.state
            .mirror
            .write()
            .await
            .apply(&WatchEvent::put(self.keys.mission_key(&m.id), encoded));
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn put_mission_stores_definition_and_resets_next_exec() {
    let fixture = Fixture::new();
    fixture
        .store
        .put(&fixture.keys.next_exec_key("A1"), "1700000000", None)
        .await
        .unwrap();

    let mission_json = serde_json::to_string(&mission("A1", 1, DurationUnit::Day)).unwrap();
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/mission")
                .header("content-type", "application/json")
                .body(Body::from(mission_json))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["id"], "A1");

    let stored = fixture
        .store
        .get_prefix(&fixture.keys.mission_key("A1"))
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    // The stale next execution time is gone: the mission is due now.
    assert!(fixture
        .store
        .get_prefix(&fixture.keys.next_exec_key("A1"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn malformed_mission_body_yields_structured_error() {
    let fixture = Fixture::new();
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/mission")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "bad_request");
}

#[tokio::test]
async fn empty_mission_id_is_rejected() {
    let fixture = Fixture::new();
    let mission_json = serde_json::to_string(&mission("", 1, DurationUnit::Day)).unwrap();
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/api/mission")
                .header("content-type", "application/json")
                .body(Body::from(mission_json))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "missing_id");
}

#[tokio::test]
async fn delete_by_id_removes_both_keys() {
    let fixture = Fixture::new();
    let m = mission("A1", 1, DurationUnit::Day);
    fixture
        .store
        .put(
            &fixture.keys.mission_key("A1"),
            &serde_json::to_string(&m).unwrap(),
            None,
        )
        .await
        .unwrap();
    fixture
        .store
        .put(&fixture.keys.next_exec_key("A1"), "1700000000", None)
        .await
        .unwrap();

    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/mission?id=A1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 1);
    assert!(fixture
        .store
        .get_prefix(&fixture.keys.mission_key("A1"))
        .await
        .unwrap()
        .is_empty());
    assert!(fixture
        .store
        .get_prefix(&fixture.keys.next_exec_key("A1"))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn delete_by_owner_uses_mirror_snapshot() {
    let fixture = Fixture::new();
    for id in ["m1", "m2"] {
        let m = mission(id, 1, DurationUnit::Day);
        fixture
            .store
            .put(
                &fixture.keys.mission_key(id),
                &serde_json::to_string(&m).unwrap(),
                None,
            )
            .await
            .unwrap();
        fixture.observe_mission(&m).await;
    }

    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/mission?owner=test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["deleted"], 2);
    assert!(fixture
        .store
        .get_prefix(&fixture.keys.mission_prefix())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn delete_without_filter_is_rejected() {
    let fixture = Fixture::new();
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/mission")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "missing_filter");
}

#[tokio::test]
async fn info_reports_in_memory_state() {
    let fixture = Fixture::new();
    fixture
        .observe_mission(&mission("m1", 1, DurationUnit::Day))
        .await;

    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .uri("/api/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["node_id"], 7);
    assert_eq!(body["role"], "master");
    assert_eq!(body["member_count"], 2);
    assert_eq!(body["mission_count"], 1);
    assert_eq!(body["members"], serde_json::json!([7, 9]));
}

#[tokio::test]
async fn wrong_method_yields_structured_error() {
    let fixture = Fixture::new();
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/info")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["code"], "method_not_allowed");
}

#[tokio::test]
async fn unknown_route_yields_structured_error() {
    let fixture = Fixture::new();
    let response = fixture
        .app()
        .oneshot(
            Request::builder()
                .uri("/api/nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "not_found");
}
