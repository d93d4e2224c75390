use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{
        middleware::identity::CurrentUser,
        response::{ok, ApiResponse, ListResponse},
        state::AppState,
    },
    domain::Notification,
    error::Result,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<ListResponse<Notification>>>> {
    let notifications = state
        .service_context
        .notification_service
        .list(user.user_id, query.unread)
        .await?;

    Ok(ok(notifications.into()))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Uuid>>> {
    state
        .service_context
        .notification_service
        .mark_read(id, user.user_id)
        .await?;

    Ok(ok(id))
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<MarkedRead>>> {
    let updated = state
        .service_context
        .notification_service
        .mark_all_read(user.user_id)
        .await?;

    Ok(ok(MarkedRead { updated }))
}
