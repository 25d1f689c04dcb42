//! Collateral balance routes

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use super::{parse_address, trade_error, RouteError};
use crate::dto::BalanceResponse;
use crate::AppState;

/// Create balance routes
pub fn router() -> Router<AppState> {
    Router::new().route("/{address}", get(get_balance))
}

/// GET /balances/{address} - USDO held by an address
async fn get_balance(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<BalanceResponse>, RouteError> {
    let address = parse_address(&address)?;
    let view = state
        .service()
        .collateral_balance(&address)
        .await
        .map_err(trade_error)?;

    Ok(Json(view.into()))
}
