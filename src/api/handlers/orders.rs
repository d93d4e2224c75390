use axum::{
    extract::{Path, State},
    Extension, Json,
};
use uuid::Uuid;

use crate::{
    api::{
        middleware::identity::CurrentUser,
        response::{ok, ApiResponse, ListResponse},
        state::AppState,
    },
    domain::{Order, Purchase},
    error::Result,
};

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ListResponse<Order>>>> {
    let orders = state
        .service_context
        .payment_service
        .list_orders(user.user_id)
        .await?;

    Ok(ok(orders.into()))
}

pub async fn get(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state
        .service_context
        .payment_service
        .get_order(id, user.user_id)
        .await?;

    Ok(ok(order))
}

pub async fn purchases(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<ListResponse<Purchase>>>> {
    let purchases = state
        .service_context
        .project_service
        .list_purchases(user.user_id)
        .await?;

    Ok(ok(purchases.into()))
}
