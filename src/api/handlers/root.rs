use axum::{http::StatusCode, Json, response::IntoResponse};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: String,
}

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "ScholarMart API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Marketplace for academic projects",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "api": "/api",
            "docs": "/api/docs",
            "openapi": "/api/openapi.json"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

pub async fn api_info() -> impl IntoResponse {
    Json(ApiInfo {
        name: "ScholarMart API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Marketplace for academic projects".to_string(),
        status: "operational".to_string(),
    })
}
