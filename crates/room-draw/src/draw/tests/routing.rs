use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::Json;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::common::*;

use crate::draw::ledger::{LedgerEntity, LedgerError, OccupancyLedger};
use crate::draw::notifications::{LoggingDispatcher, RosterPreferences};
use crate::draw::router::{draw_router, status_for};
use crate::draw::service::RoomDrawService;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn ranking_route_lists_students_in_draw_order() {
    let (service, _, _) = build_service(campus());
    let router = draw_router(Arc::new(service));

    let response = router
        .oneshot(get("/api/v1/dorms/2/ranking"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["dorm_name"], json!("North"));
    let first = &payload["entries"][0];
    assert_eq!(first["student_id"], json!(6));
    assert_eq!(first["priority"]["is_preplaced"], json!(true));
    assert_eq!(payload["entries"][1]["priority"]["year_tier"], json!(5));
}

#[tokio::test]
async fn ranking_route_filters_unplaced() {
    let (service, _, _) = build_service(campus());
    let service = Arc::new(service);
    service
        .assign(&room_id("A101"), &ids(&[6]), None)
        .expect("assignment succeeds");

    let response = draw_router(service)
        .oneshot(get("/api/v1/dorms/2/ranking?unplaced=true"))
        .await
        .expect("route executes");

    let payload = read_json_body(response).await;
    let entries = payload["entries"].as_array().expect("entries array");
    assert_eq!(entries.len(), 7);
    assert_eq!(entries[0]["student_id"], json!(1));
}

#[tokio::test]
async fn assign_route_returns_receipt_with_notifications() {
    let (service, _, dispatcher) = build_service(campus());
    let service = Arc::new(service);
    service
        .assign(&room_id("N101A"), &ids(&[3]), None)
        .expect("initial assignment");

    let response = draw_router(service)
        .oneshot(post_json(
            "/api/v1/rooms/N101A/occupants",
            json!({ "occupants": [1, 2] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["room"]["occupants"], json!([1, 2]));
    assert_eq!(payload["notifications"][0]["student_id"], json!(3));
    assert_eq!(
        payload["notifications"][0]["disposition"],
        json!({ "status": "queued" })
    );
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn assign_route_maps_capacity_to_unprocessable() {
    let (service, _, _) = build_service(campus());
    let router = draw_router(Arc::new(service));

    let response = router
        .oneshot(post_json(
            "/api/v1/rooms/N102B/occupants",
            json!({ "occupants": [1, 2] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], json!("capacity_exceeded"));
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("at most 1"));
}

#[tokio::test]
async fn unknown_room_maps_to_not_found() {
    let (service, _, _) = build_service(campus());
    let router = draw_router(Arc::new(service));

    let response = router
        .oneshot(get("/api/v1/rooms/Z999"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], json!("not_found"));
}

#[tokio::test]
async fn frosh_route_maps_suite_conflicts() {
    let (service, _, _) = build_service(campus());
    let service = Arc::new(service);
    service
        .assign(&room_id("N101B"), &ids(&[4]), None)
        .expect("sibling occupied");

    let response = draw_router(service.clone())
        .oneshot(post_json(
            "/api/v1/rooms/N101A/frosh",
            json!({ "present": true }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], json!("suite_not_empty"));

    let response = draw_router(service)
        .oneshot(post_json(
            "/api/v1/rooms/A101/frosh",
            json!({ "present": true }),
        ))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(
        payload["changes"],
        json!([{ "room": "A101", "has_frosh": true }])
    );
}

#[tokio::test]
async fn relocate_route_rejects_cross_dorm_moves() {
    let (service, _, _) = build_service(campus());
    let service = Arc::new(service);
    service
        .set_frosh(&room_id("A101"), true)
        .expect("frosh placed");

    let response = draw_router(service)
        .oneshot(post_json(
            "/api/v1/rooms/A101/frosh/relocate",
            json!({ "target_room": "L101" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], json!("dorm_mismatch"));
}

#[tokio::test]
async fn clear_route_accepts_an_empty_body() {
    let mut snapshot = campus();
    place(&mut snapshot, "A101", &[3]);
    let (service, _, dispatcher) = build_service(snapshot);
    let service = Arc::new(service);

    let response = draw_router(service.clone())
        .oneshot(
            Request::post("/api/v1/rooms/A101/clear")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(service
        .room(&room_id("A101"))
        .expect("room")
        .occupants
        .is_empty());
    assert_eq!(dispatcher.sent().len(), 1);
}

#[tokio::test]
async fn assign_route_refuses_frosh_rooms() {
    let (service, _, _) = build_service(campus());
    let service = Arc::new(service);
    service
        .set_frosh(&room_id("A101"), true)
        .expect("frosh placed");

    let response = draw_router(service)
        .oneshot(post_json(
            "/api/v1/rooms/A101/occupants",
            json!({ "occupants": [4] }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], json!("room_has_frosh"));
}

#[tokio::test]
async fn clear_handler_reports_persistence_conflicts() {
    let mut snapshot = campus();
    place(&mut snapshot, "A101", &[3]);
    let preferences = Arc::new(RosterPreferences::from_students(&snapshot.students));
    let ledger = OccupancyLedger::from_snapshot(snapshot, Arc::new(ConflictingStore))
        .expect("valid roster");
    let service = Arc::new(RoomDrawService::new(
        Arc::new(ledger),
        preferences,
        Arc::new(LoggingDispatcher),
    ));

    let response = crate::draw::router::clear_handler::<
        ConflictingStore,
        RosterPreferences,
        LoggingDispatcher,
    >(
        State(service.clone()),
        Path("A101".to_string()),
        Some(Json(Default::default())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let payload = read_json_body(response).await;
    assert_eq!(payload["code"], json!("persistence_conflict"));
    assert_eq!(
        service.room(&room_id("A101")).expect("room").occupants,
        ids(&[3])
    );
}

#[test]
fn status_mapping_is_stable() {
    assert_eq!(
        status_for(&LedgerError::NotFound(LedgerEntity::Room(room_id("x")))),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        status_for(&LedgerError::DuplicateOccupant(crate::draw::domain::StudentId(1))),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        status_for(&LedgerError::PersistenceConflict("stale".to_string())),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_for(&LedgerError::RoomHasFrosh(room_id("x"))),
        StatusCode::CONFLICT
    );
    assert_eq!(
        status_for(&LedgerError::NotFroshRoom(room_id("x"))),
        StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
        status_for(&LedgerError::StoreUnavailable("down".to_string())),
        StatusCode::SERVICE_UNAVAILABLE
    );
}
