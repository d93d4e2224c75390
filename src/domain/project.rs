use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub title: String,
    pub description: String,
    pub price_minor: i64,
    pub currency: String,
    /// Object-store key of the deliverable, once uploaded
    pub file_key: Option<String>,
    pub file_name: Option<String>,
    pub total_purchases: i64,
    pub total_revenue_minor: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 10000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub creator_name: String,
    #[validate(range(min = 1))]
    pub price_minor: i64,
    #[validate(length(equal = 3))]
    pub currency: String,
}
