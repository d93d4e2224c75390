use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    api::{
        response::{ok, ApiResponse},
        state::AppState,
    },
    currency::{RateQuote, RateSource},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct RateResponse {
    #[serde(flatten)]
    pub quote: RateQuote,
    pub from_fallback: bool,
}

/// Current NGN-per-USD rate.
#[utoipa::path(
    get,
    path = "/api/currency/rate",
    tag = "currency",
    responses((status = 200, description = "Current USD/NGN rate", body = ApiResponse<RateResponse>))
)]
pub async fn rate(State(state): State<AppState>) -> Json<ApiResponse<RateResponse>> {
    let quote = state.service_context.currency_service.quote().await;
    let from_fallback = quote.source == RateSource::Fallback;
    ok(RateResponse { quote, from_fallback })
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount_minor: i64,
    pub from: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversionResponse {
    pub amount_minor: i64,
    pub currency: String,
    pub converted_amount_minor: i64,
    pub converted_currency: String,
    pub exchange_rate: f64,
}

/// Converts between USD and NGN minor units at the current rate.
pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> crate::error::Result<Json<ApiResponse<ConversionResponse>>> {
    let currency_service = &state.service_context.currency_service;
    let from = query.from.to_uppercase();

    let response = match from.as_str() {
        "USD" => {
            let conversion = currency_service.convert_usd_to_ngn(query.amount_minor).await;
            ConversionResponse {
                amount_minor: query.amount_minor,
                currency: from,
                converted_amount_minor: conversion.ngn_amount_minor,
                converted_currency: "NGN".to_string(),
                exchange_rate: conversion.exchange_rate,
            }
        }
        "NGN" => {
            let (usd_minor, rate) = currency_service.convert_ngn_to_usd(query.amount_minor).await;
            ConversionResponse {
                amount_minor: query.amount_minor,
                currency: from,
                converted_amount_minor: usd_minor,
                converted_currency: "USD".to_string(),
                exchange_rate: rate,
            }
        }
        other => {
            return Err(crate::error::AppError::BadRequest(format!(
                "Unsupported currency: {}",
                other
            )))
        }
    };

    Ok(ok(response))
}

pub async fn clear_cache(State(state): State<AppState>) -> Json<ApiResponse<bool>> {
    state.service_context.currency_service.clear_cache().await;
    tracing::info!("Exchange rate cache cleared");
    ok(true)
}
