use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::cluster::Membership;
use crate::config::KeySpace;
use crate::mission::{Mission, MissionMirror};
use crate::store::CoordinationStore;

/// Shared state behind the admin API. The mirror and membership are the
/// core's in-memory views, exposed read-only; mission writes go straight
/// to the store and reach the mirror through its watch.
#[derive(Clone)]
pub struct ApiState {
    pub node_id: i64,
    pub keys: KeySpace,
    pub store: Arc<dyn CoordinationStore>,
    pub mirror: Arc<RwLock<MissionMirror>>,
    pub membership: Arc<RwLock<Membership>>,
}

#[derive(Serialize)]
struct InfoResponse {
    status: &'static str,
    node_id: i64,
    role: String,
    member_count: usize,
    mission_count: usize,
    members: Vec<i64>,
}

#[derive(Serialize)]
struct MissionAck {
    status: &'static str,
    id: String,
}

#[derive(Serialize)]
struct DeleteAck {
    status: &'static str,
    deleted: usize,
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    code: &'static str,
    message: String,
}

impl ErrorBody {
    fn new(code: &'static str, message: impl Into<String>) -> Json<Self> {
        Json(Self {
            status: "error",
            code,
            message: message.into(),
        })
    }
}

#[derive(Deserialize)]
struct DeleteFilter {
    id: Option<String>,
    owner: Option<String>,
    no: Option<i64>,
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/mission", put(put_mission).delete(delete_missions))
        .route("/api/info", get(info))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(cors)
        .with_state(state)
}

/// Serve the admin API until the shutdown token fires.
pub async fn run_api(addr: SocketAddr, state: ApiState, shutdown: CancellationToken) {
    let app = router(state);
    tracing::info!(addr = %addr, "starting admin API");

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "failed to bind admin API");
            return;
        }
    };

    let serve = axum::serve(listener, app).with_graceful_shutdown(shutdown.cancelled_owned());
    if let Err(e) = serve.await {
        tracing::error!(error = %e, "admin API failed");
    }
}

/// Create or replace a mission. The stale next-execution key is deleted
/// in the same request, so the mission is due on the next master pass.
async fn put_mission(
    State(state): State<ApiState>,
    body: Result<Json<Mission>, JsonRejection>,
) -> impl IntoResponse {
    let Json(mission) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("bad_request", rejection.body_text()),
            )
                .into_response();
        }
    };
    if mission.id.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("missing_id", "mission ID must not be empty"),
        )
            .into_response();
    }

    let encoded = match serde_json::to_string(&mission) {
        Ok(encoded) => encoded,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("encode_failed", e.to_string()),
            )
                .into_response();
        }
    };

    let mission_key = state.keys.mission_key(&mission.id);
    if let Err(e) = state.store.put(&mission_key, &encoded, None).await {
        return (
            StatusCode::BAD_GATEWAY,
            ErrorBody::new("store_unavailable", e.to_string()),
        )
            .into_response();
    }
    if let Err(e) = state
        .store
        .delete(&state.keys.next_exec_key(&mission.id))
        .await
    {
        tracing::warn!(mission = %mission.id, error = %e, "failed to reset next execution time");
    }

    tracing::info!(mission = %mission.id, "mission stored");
    (
        StatusCode::OK,
        Json(MissionAck {
            status: "ok",
            id: mission.id,
        }),
    )
        .into_response()
}

/// Delete missions by ID, or by owner with an optional serial number.
async fn delete_missions(
    State(state): State<ApiState>,
    Query(filter): Query<DeleteFilter>,
) -> impl IntoResponse {
    let ids: Vec<String> = if let Some(id) = filter.id {
        vec![id]
    } else if let Some(owner) = filter.owner.as_deref() {
        state
            .mirror
            .read()
            .await
            .missions_for_owner(owner, filter.no)
            .into_iter()
            .map(|m| m.id)
            .collect()
    } else {
        return (
            StatusCode::BAD_REQUEST,
            ErrorBody::new("missing_filter", "provide id, or owner with optional no"),
        )
            .into_response();
    };

    let mut deleted = 0;
    for id in &ids {
        if let Err(e) = state.store.delete(&state.keys.mission_key(id)).await {
            tracing::warn!(mission = %id, error = %e, "mission delete failed");
            continue;
        }
        if let Err(e) = state.store.delete(&state.keys.next_exec_key(id)).await {
            tracing::warn!(mission = %id, error = %e, "next execution time delete failed");
        }
        deleted += 1;
    }

    (
        StatusCode::OK,
        Json(DeleteAck {
            status: "ok",
            deleted,
        }),
    )
        .into_response()
}

/// Read-only cluster snapshot from in-memory state; no store round-trip.
async fn info(State(state): State<ApiState>) -> impl IntoResponse {
    let membership = state.membership.read().await;
    let mission_count = state.mirror.read().await.mission_count();

    Json(InfoResponse {
        status: "ok",
        node_id: state.node_id,
        role: membership.role().to_string(),
        member_count: membership.member_count(),
        mission_count,
        members: membership.members().to_vec(),
    })
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        ErrorBody::new("not_found", "unknown route"),
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        ErrorBody::new("method_not_allowed", "unsupported method for this route"),
    )
}
