use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::slots::{SlotError, SlotStatus};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/:plate", get(get_vehicle))
        .route("/slots", get(list_slots))
        .route("/slots/vacant", get(first_vacant_slot))
        .route("/slots/:slot", delete(remove_slot))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /vehicles: every registered vehicle, ordered by plate
async fn list_vehicles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registry = state.registry.clone();
    let result = tokio::task::spawn_blocking(move || registry.list()).await;

    match result {
        Ok(Ok(vehicles)) => Json(vehicles).into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "registry query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /vehicles/:plate: case-insensitive lookup
async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    Path(plate): Path<String>,
) -> impl IntoResponse {
    let registry = state.registry.clone();
    let result = tokio::task::spawn_blocking(move || registry.search(&plate)).await;

    match result {
        Ok(Ok(Some(vehicle))) => Json(vehicle).into_response(),
        Ok(Ok(None)) => StatusCode::NOT_FOUND.into_response(),
        Ok(Err(e)) => {
            error!(error = %e, "registry query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            error!(error = %e, "spawn_blocking failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /slots
async fn list_slots(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.slots.lock() {
        Ok(slots) => Json(slots.status()).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// GET /slots/vacant: the slot the next arriving car should take (404 when full)
async fn first_vacant_slot(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let Ok(slots) = state.slots.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    match slots.first_vacant() {
        Some(slot) => Json(SlotStatus {
            slot,
            occupied: false,
        })
        .into_response(),
        None => (StatusCode::NOT_FOUND, "no vacant slot").into_response(),
    }
}

/// DELETE /slots/:slot: the car in `slot` has left
async fn remove_slot(
    State(state): State<Arc<AppState>>,
    Path(slot): Path<u32>,
) -> impl IntoResponse {
    let Ok(mut slots) = state.slots.lock() else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    match slots.remove(slot) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e @ SlotError::Invalid(..)) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => (StatusCode::CONFLICT, e.to_string()).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::Response;
    use platewatch_common::config::ReceiverConfig;

    fn temp_state() -> (tempfile::TempDir, Arc<AppState>) {
        let tmp = tempfile::tempdir().unwrap();
        let config = ReceiverConfig {
            db_path: tmp.path().join("vehicles.db"),
            ..ReceiverConfig::default()
        };
        (tmp, Arc::new(AppState::open(&config).unwrap()))
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1 << 20).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn vehicle_lookup_and_listing() {
        let (_tmp, state) = temp_state();
        state.registry.park("ZZ99", 2, 0).unwrap();
        state.registry.park("AB12", 1, 0).unwrap();

        let response = list_vehicles(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["plate"], "AB12");
        assert_eq!(body[1]["plate"], "ZZ99");

        let response = get_vehicle(State(state.clone()), Path("ab12".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["slot"], 1);
    }

    #[tokio::test]
    async fn unknown_vehicle_is_404() {
        let (_tmp, state) = temp_state();
        let response = get_vehicle(State(state), Path("NOPE".to_string()))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn slot_removal_statuses() {
        let (_tmp, state) = temp_state();
        state.slots.lock().unwrap().park(1).unwrap();

        let response = remove_slot(State(state.clone()), Path(1)).await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = remove_slot(State(state.clone()), Path(1)).await.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = remove_slot(State(state.clone()), Path(42)).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = json_body(list_slots(State(state)).await.into_response()).await;
        assert_eq!(body.as_array().unwrap().len(), 3);
        assert_eq!(body[0]["occupied"], false);
    }

    #[tokio::test]
    async fn vacant_slot_follows_occupancy() {
        let (_tmp, state) = temp_state();
        state.slots.lock().unwrap().park(1).unwrap();

        let response = first_vacant_slot(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["slot"], 2);

        state.slots.lock().unwrap().park(2).unwrap();
        state.slots.lock().unwrap().park(3).unwrap();
        let response = first_vacant_slot(State(state.clone())).await.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = remove_slot(State(state.clone()), Path(2)).await.into_response();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let response = first_vacant_slot(State(state)).await.into_response();
        assert_eq!(json_body(response).await["slot"], 2);
    }

    #[test]
    fn vacant_route_coexists_with_slot_routes() {
        let (_tmp, state) = temp_state();
        let _ = router(state);
    }
}
