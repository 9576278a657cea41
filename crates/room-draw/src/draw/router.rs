use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{DormId, RoomId, StudentId};
use super::ledger::LedgerError;
use super::notifications::{NotificationDispatcher, NotificationPreferences};
use super::repository::OccupancyStore;
use super::service::RoomDrawService;

/// Router exposing ranking, room, and frosh endpoints.
pub fn draw_router<S, P, D>(service: Arc<RoomDrawService<S, P, D>>) -> Router
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/dorms/:dorm/ranking",
            get(ranking_handler::<S, P, D>),
        )
        .route("/api/v1/rooms/:room", get(room_handler::<S, P, D>))
        .route(
            "/api/v1/rooms/:room/occupants",
            post(assign_handler::<S, P, D>),
        )
        .route("/api/v1/rooms/:room/clear", post(clear_handler::<S, P, D>))
        .route("/api/v1/rooms/:room/frosh", post(frosh_handler::<S, P, D>))
        .route(
            "/api/v1/rooms/:room/frosh/relocate",
            post(relocate_handler::<S, P, D>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RankingQuery {
    #[serde(default)]
    unplaced: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    occupants: Vec<StudentId>,
    #[serde(default)]
    requested_by: Option<StudentId>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ClearRequest {
    #[serde(default)]
    requested_by: Option<StudentId>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FroshRequest {
    present: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelocateRequest {
    target_room: RoomId,
}

pub(crate) async fn ranking_handler<S, P, D>(
    State(service): State<Arc<RoomDrawService<S, P, D>>>,
    Path(dorm): Path<u8>,
    Query(query): Query<RankingQuery>,
) -> Response
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    let view = service.ranking(DormId(dorm), query.unplaced);
    (StatusCode::OK, Json(view)).into_response()
}

pub(crate) async fn room_handler<S, P, D>(
    State(service): State<Arc<RoomDrawService<S, P, D>>>,
    Path(room): Path<String>,
) -> Response
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.room(&RoomId(room)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => ledger_error_response(&error),
    }
}

pub(crate) async fn assign_handler<S, P, D>(
    State(service): State<Arc<RoomDrawService<S, P, D>>>,
    Path(room): Path<String>,
    Json(request): Json<AssignRequest>,
) -> Response
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.assign(&RoomId(room), &request.occupants, request.requested_by) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(error) => ledger_error_response(&error),
    }
}

pub(crate) async fn clear_handler<S, P, D>(
    State(service): State<Arc<RoomDrawService<S, P, D>>>,
    Path(room): Path<String>,
    request: Option<Json<ClearRequest>>,
) -> Response
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    let request = request.map(|Json(body)| body).unwrap_or_default();
    match service.clear(&RoomId(room), request.requested_by) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(error) => ledger_error_response(&error),
    }
}

pub(crate) async fn frosh_handler<S, P, D>(
    State(service): State<Arc<RoomDrawService<S, P, D>>>,
    Path(room): Path<String>,
    Json(request): Json<FroshRequest>,
) -> Response
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.set_frosh(&RoomId(room), request.present) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => ledger_error_response(&error),
    }
}

pub(crate) async fn relocate_handler<S, P, D>(
    State(service): State<Arc<RoomDrawService<S, P, D>>>,
    Path(room): Path<String>,
    Json(request): Json<RelocateRequest>,
) -> Response
where
    S: OccupancyStore + 'static,
    P: NotificationPreferences + 'static,
    D: NotificationDispatcher + 'static,
{
    match service.relocate_frosh(&RoomId(room), &request.target_room) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(error) => ledger_error_response(&error),
    }
}

pub(crate) fn status_for(error: &LedgerError) -> StatusCode {
    match error {
        LedgerError::NotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::CapacityExceeded { .. }
        | LedgerError::DuplicateOccupant(_)
        | LedgerError::NotFroshRoom(_) => StatusCode::UNPROCESSABLE_ENTITY,
        LedgerError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::RoomNotEmpty(_)
        | LedgerError::SuiteNotEmpty(_)
        | LedgerError::PersistenceConflict(_)
        | LedgerError::NoFroshToRelocate(_)
        | LedgerError::DormMismatch { .. }
        | LedgerError::ResidentLifeSuite(_)
        | LedgerError::TargetHasFrosh(_)
        | LedgerError::FroshRoomTypeMismatch { .. }
        | LedgerError::SuiteAlreadyHasFrosh(_)
        | LedgerError::RoomHasFrosh(_) => StatusCode::CONFLICT,
    }
}

fn ledger_error_response(error: &LedgerError) -> Response {
    let status = status_for(error);
    if status.is_server_error() {
        warn!(error = %error, "room draw request failed");
    }

    let payload = json!({
        "error": error.to_string(),
        "code": error.code(),
    });
    (status, Json(payload)).into_response()
}
