use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::{
        middleware::identity::CurrentUser,
        response::{ok, ApiResponse, ListResponse},
        state::AppState,
    },
    domain::{
        BankDetails, CreateBankDetailsRequest, CreatorBalance, CreatorEarnings, Withdrawal,
        WithdrawalRequest, WithdrawalStatus,
    },
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub currency: Option<String>,
}

pub async fn balance(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<BalanceQuery>,
) -> Json<ApiResponse<CreatorBalance>> {
    let balance = state
        .service_context
        .earnings_service
        .balance(user.user_id, query.currency.as_deref())
        .await;

    ok(balance)
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ListResponse<CreatorEarnings>>>> {
    let earnings = state
        .service_context
        .earnings_service
        .list_earnings(user.user_id)
        .await?;

    Ok(ok(earnings.into()))
}

/// Bank details as returned to clients; the account number is masked.
#[derive(Debug, Serialize, ToSchema)]
pub struct BankDetailsDto {
    pub id: Uuid,
    pub bank_name: String,
    pub account_name: String,
    pub account_number: String,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<BankDetails> for BankDetailsDto {
    fn from(details: BankDetails) -> Self {
        Self {
            account_number: details.masked_account_number(),
            id: details.id,
            bank_name: details.bank_name,
            account_name: details.account_name,
            is_verified: details.is_verified,
            created_at: details.created_at,
        }
    }
}

pub async fn add_bank_details(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateBankDetailsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BankDetailsDto>>)> {
    let details = state
        .service_context
        .earnings_service
        .add_bank_details(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, ok(details.into())))
}

pub async fn list_bank_details(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ListResponse<BankDetailsDto>>>> {
    let details = state
        .service_context
        .earnings_service
        .list_bank_details(user.user_id)
        .await?;

    let details: Vec<BankDetailsDto> = details.into_iter().map(Into::into).collect();
    Ok(ok(details.into()))
}

pub async fn verify_bank_details(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BankDetailsDto>>> {
    let details = state
        .service_context
        .earnings_service
        .verify_bank_details(id)
        .await?;

    tracing::info!(bank_details_id = %id, admin_id = %admin.user_id, "Bank details verified");
    Ok(ok(details.into()))
}

pub async fn request_withdrawal(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<WithdrawalRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Withdrawal>>)> {
    let withdrawal = state
        .service_context
        .earnings_service
        .request_withdrawal(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, ok(withdrawal)))
}

pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ListResponse<Withdrawal>>>> {
    let withdrawals = state
        .service_context
        .earnings_service
        .list_withdrawals(user.user_id)
        .await?;

    Ok(ok(withdrawals.into()))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWithdrawalStatus {
    pub status: WithdrawalStatus,
}

pub async fn update_withdrawal_status(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateWithdrawalStatus>,
) -> Result<Json<ApiResponse<Withdrawal>>> {
    let withdrawal = state
        .service_context
        .earnings_service
        .update_withdrawal_status(id, request.status)
        .await?;

    tracing::info!(withdrawal_id = %id, admin_id = %admin.user_id, "Withdrawal updated by admin");
    Ok(ok(withdrawal))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountNumber {
    pub bank_details_id: Uuid,
    pub account_number: String,
}

/// Plain account number for whoever executes the payout.
pub async fn reveal_account_number(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<AccountNumber>>> {
    let account_number = state
        .service_context
        .earnings_service
        .reveal_account_number(id)
        .await?;

    tracing::info!(bank_details_id = %id, admin_id = %admin.user_id, "Account number revealed");
    Ok(ok(AccountNumber {
        bank_details_id: id,
        account_number,
    }))
}
