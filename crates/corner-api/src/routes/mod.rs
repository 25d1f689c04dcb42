//! API route handlers

pub mod balances;
pub mod health;
pub mod markets;

use axum::{http::StatusCode, routing::get, Json, Router};
use corner_core::{Address, ObjectId};
use cpmm::TradeError;

use crate::dto::ApiError;
use crate::AppState;

/// Handler error: status plus JSON body
pub(crate) type RouteError = (StatusCode, Json<ApiError>);

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/markets", markets::router())
        .nest("/balances", balances::router())
        .with_state(state)
}

pub(crate) fn trade_error(e: TradeError) -> RouteError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!("Request failed ({}): {}", status, e);
    }
    (status, Json(ApiError::from(&e)))
}

pub(crate) fn bad_request(e: ApiError) -> RouteError {
    (StatusCode::BAD_REQUEST, Json(e))
}

/// Addresses share the object ID format
pub(crate) fn parse_address(raw: &str) -> Result<Address, RouteError> {
    ObjectId::parse(raw)
        .map(|id| Address::new(id.as_str()))
        .map_err(|_| {
            bad_request(ApiError::new(
                "invalid_address",
                format!("Invalid address: {}", raw),
            ))
        })
}
