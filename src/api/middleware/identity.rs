use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{api::state::AppState, error::AppError};

pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub is_admin: bool,
}

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, AppError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    Uuid::parse_str(value.trim()).map_err(|_| AppError::Unauthorized)
}

fn resolve(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let user_id = user_id_from_headers(headers)?;
    let is_admin = state.settings.marketplace.admin_ids.contains(&user_id);
    Ok(CurrentUser { user_id, is_admin })
}

pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve(&state, request.headers())?;

    // Insert current user into request extensions
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve(&state, request.headers())?;

    if !user.is_admin {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
