//! Market pool routes

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use corner_core::constants::BPS_DENOMINATOR;
use corner_core::MarketId;

use super::{bad_request, parse_address, trade_error, RouteError};
use crate::dto::{
    parse_amount, ApiError, BuyQuoteRequest, BuyQuoteResponse, BuyRequest, ExecutionResponse,
    JoinRequest, PoolResponse, QuoteRequest, QuoteResponse, RedeemRequest, ResolveRequest,
    ResolveResponse, SplitRequest, SwapRequest,
};
use crate::AppState;

/// Create market routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{market_id}/pool", get(get_pool))
        .route("/{market_id}/quote", post(get_quote))
        .route("/{market_id}/quote/buy", post(get_buy_quote))
        .route("/{market_id}/split", post(split))
        .route("/{market_id}/swap", post(swap))
        .route("/{market_id}/join", post(join))
        .route("/{market_id}/redeem", post(redeem))
        .route("/{market_id}/buy", post(buy))
        .route("/{market_id}/resolve", post(resolve))
}

fn amount(field: &str, value: &str) -> Result<u64, RouteError> {
    parse_amount(field, value).map_err(bad_request)
}

fn slippage(bps: Option<u32>) -> Result<Option<u32>, RouteError> {
    match bps {
        Some(bps) if bps > BPS_DENOMINATOR => Err(bad_request(ApiError::bad_request(format!(
            "slippage_bps must be at most {}, got {}",
            BPS_DENOMINATOR, bps
        )))),
        other => Ok(other),
    }
}

/// GET /markets/{market_id}/pool - Pool balances and implied odds
async fn get_pool(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
) -> Result<Json<PoolResponse>, RouteError> {
    let view = state
        .service()
        .pool_view(&MarketId::new(market_id))
        .await
        .map_err(trade_error)?;

    Ok(Json(view.into()))
}

/// POST /markets/{market_id}/quote - Quote a swap
async fn get_quote(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, RouteError> {
    let amount_in = amount("amount_in", &request.amount_in)?;
    let slippage_bps = slippage(request.slippage_bps)?;

    let (quote, mode) = state
        .service()
        .quote(&MarketId::new(market_id), request.side, amount_in, slippage_bps)
        .await
        .map_err(trade_error)?;

    Ok(Json(QuoteResponse::new(quote, mode)))
}

/// POST /markets/{market_id}/quote/buy - Quote buying one side with USDO
async fn get_buy_quote(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<BuyQuoteRequest>,
) -> Result<Json<BuyQuoteResponse>, RouteError> {
    let usdo_in = amount("usdo_in", &request.usdo_in)?;
    let slippage_bps = slippage(request.slippage_bps)?;

    let (quote, mode) = state
        .service()
        .quote_buy(&MarketId::new(market_id), request.side, usdo_in, slippage_bps)
        .await
        .map_err(trade_error)?;

    Ok(Json(BuyQuoteResponse::new(quote, mode)))
}

/// POST /markets/{market_id}/split - Lock USDO, mint a YES/NO pair
async fn split(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<SplitRequest>,
) -> Result<Json<ExecutionResponse>, RouteError> {
    let address = parse_address(&request.address)?;
    let usdo_in = amount("usdo_in", &request.usdo_in)?;

    let execution = state
        .service()
        .split(&MarketId::new(market_id), &address, usdo_in)
        .await
        .map_err(trade_error)?;

    Ok(Json(execution.into()))
}

/// POST /markets/{market_id}/swap - Sell one side for the other
async fn swap(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<SwapRequest>,
) -> Result<Json<ExecutionResponse>, RouteError> {
    let address = parse_address(&request.address)?;
    let amount_in = amount("amount_in", &request.amount_in)?;
    let min_out = amount("min_out", &request.min_out)?;

    let execution = state
        .service()
        .swap(
            &MarketId::new(market_id),
            &address,
            request.side_in,
            amount_in,
            min_out,
        )
        .await
        .map_err(trade_error)?;

    Ok(Json(execution.into()))
}

/// POST /markets/{market_id}/join - Burn a YES/NO pair for USDO
async fn join(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<ExecutionResponse>, RouteError> {
    let address = parse_address(&request.address)?;
    let yes_in = amount("yes_in", &request.yes_in)?;
    let no_in = amount("no_in", &request.no_in)?;

    let execution = state
        .service()
        .join(&MarketId::new(market_id), &address, yes_in, no_in)
        .await
        .map_err(trade_error)?;

    Ok(Json(execution.into()))
}

/// POST /markets/{market_id}/redeem - Redeem winning tokens after resolution
async fn redeem(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<RedeemRequest>,
) -> Result<Json<ExecutionResponse>, RouteError> {
    let address = parse_address(&request.address)?;
    let amount = amount("amount", &request.amount)?;

    let execution = state
        .service()
        .redeem(&MarketId::new(market_id), &address, request.side, amount)
        .await
        .map_err(trade_error)?;

    Ok(Json(execution.into()))
}

/// POST /markets/{market_id}/buy - Split then swap into one side
async fn buy(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<BuyRequest>,
) -> Result<Json<ExecutionResponse>, RouteError> {
    let address = parse_address(&request.address)?;
    let usdo_in = amount("usdo_in", &request.usdo_in)?;
    let slippage_bps = slippage(request.slippage_bps)?;
    let market_id = MarketId::new(market_id);

    let (quote, _) = state
        .service()
        .quote_buy(&market_id, request.side, usdo_in, slippage_bps)
        .await
        .map_err(trade_error)?;

    let execution = state
        .service()
        .buy(
            &market_id,
            &address,
            request.side,
            usdo_in,
            quote.min_swap_out,
        )
        .await
        .map_err(trade_error)?;

    Ok(Json(execution.into()))
}

/// POST /markets/{market_id}/resolve - Resolve a simulated market
async fn resolve(
    State(state): State<AppState>,
    Path(market_id): Path<String>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>, RouteError> {
    let market_id = MarketId::new(market_id);
    let status = state
        .service()
        .resolve(&market_id, request.winning_side)
        .await
        .map_err(trade_error)?;

    tracing::info!("Resolved {} via API", market_id);
    Ok(Json(ResolveResponse::new(market_id.to_string(), status)))
}
