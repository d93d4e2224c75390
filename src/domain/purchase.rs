use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Durable access grant created when an order completes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Purchase {
    pub id: Uuid,
    pub order_id: Uuid,
    pub project_id: Uuid,
    pub buyer_id: Uuid,
    pub access_granted: bool,
    pub download_count: i64,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
    pub last_downloaded_at: Option<DateTime<Utc>>,
}

/// Indirect download endpoint for a project. Access is re-checked on every
/// request, so this never points straight at storage.
pub fn download_url_for(project_id: Uuid) -> String {
    format!("/api/download/{}", project_id)
}
