use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::{
    api::{
        middleware::identity::CurrentUser,
        response::{ok, ApiResponse},
        state::AppState,
    },
    domain::{
        InitializePaymentRequest, PaymentInitialization, PaymentMethod, PaymentVerification,
        VerifyPaymentRequest,
    },
    error::Result,
};

/// Creates a pending order for a project and returns the gateway checkout URL.
#[utoipa::path(
    post,
    path = "/api/payments/initialize",
    tag = "payments",
    request_body = InitializePaymentRequest,
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 201, description = "Checkout created", body = ApiResponse<PaymentInitialization>),
        (status = 400, description = "Unsupported method or currency"),
        (status = 404, description = "Project not found"),
        (status = 502, description = "Gateway rejected the request")
    )
)]
pub async fn initialize(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<InitializePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PaymentInitialization>>)> {
    request.validate()?;

    let init = state
        .service_context
        .payment_service
        .initialize_payment(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, ok(init)))
}

/// Confirms a payment with its gateway and settles the order. Repeat calls
/// for a settled order return it unchanged.
#[utoipa::path(
    post,
    path = "/api/payments/verify",
    tag = "payments",
    request_body = VerifyPaymentRequest,
    params(("X-User-Id" = String, Header, description = "Caller's user id")),
    responses(
        (status = 200, description = "Order settled", body = ApiResponse<PaymentVerification>),
        (status = 402, description = "Payment not successful or does not match the order"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn verify(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<ApiResponse<PaymentVerification>>> {
    let payments = &state.service_context.payment_service;

    // Only the buyer or creator may trigger verification
    payments.get_order(request.order_id, user.user_id).await?;

    let result = payments
        .verify_payment(request.order_id, request.reference.as_deref())
        .await?;

    Ok(ok(result))
}

/// Payment methods with a configured gateway.
#[utoipa::path(
    get,
    path = "/api/payments/methods",
    tag = "payments",
    responses((status = 200, description = "Enabled payment methods", body = ApiResponse<Vec<PaymentMethod>>))
)]
pub async fn methods(State(state): State<AppState>) -> Json<ApiResponse<Vec<PaymentMethod>>> {
    let mut methods = state.service_context.payment_service.available_methods();
    methods.sort_by_key(|m| m.as_str());
    ok(methods)
}
