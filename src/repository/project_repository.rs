use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateProjectRequest, Project},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, ProjectRepository},
};

#[derive(FromRow)]
struct ProjectRow {
    id: String,
    creator_id: String,
    creator_name: String,
    title: String,
    description: String,
    price_minor: i64,
    currency: String,
    file_key: Option<String>,
    file_name: Option<String>,
    total_purchases: i64,
    total_revenue_minor: i64,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PROJECT_COLUMNS: &str = r#"
    id, creator_id, creator_name, title, description, price_minor, currency,
    file_key, file_name, total_purchases, total_revenue_minor, created_at, updated_at
"#;

pub struct SqliteProjectRepository {
    pool: SqlitePool,
}

impl SqliteProjectRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_project(row: ProjectRow) -> Result<Project> {
        Ok(Project {
            id: parse_uuid(&row.id)?,
            creator_id: parse_uuid(&row.creator_id)?,
            creator_name: row.creator_name,
            title: row.title,
            description: row.description,
            price_minor: row.price_minor,
            currency: row.currency,
            file_key: row.file_key,
            file_name: row.file_name,
            total_purchases: row.total_purchases,
            total_revenue_minor: row.total_revenue_minor,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

#[async_trait]
impl ProjectRepository for SqliteProjectRepository {
    async fn create(&self, creator_id: Uuid, project: CreateProjectRequest) -> Result<Project> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO projects (
                id, creator_id, creator_name, title, description,
                price_minor, currency, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(creator_id.to_string())
        .bind(&project.creator_name)
        .bind(&project.title)
        .bind(&project.description)
        .bind(project.price_minor)
        .bind(project.currency.to_uppercase())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created project".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE id = ?",
            PROJECT_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_project).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC LIMIT ? OFFSET ?",
            PROJECT_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_project).collect()
    }

    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Project>> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {} FROM projects WHERE creator_id = ? ORDER BY created_at DESC",
            PROJECT_COLUMNS
        ))
        .bind(creator_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_project).collect()
    }

    async fn set_file(&self, id: Uuid, file_key: &str, file_name: &str) -> Result<Project> {
        let result = sqlx::query(
            "UPDATE projects SET file_key = ?, file_name = ?, updated_at = ? WHERE id = ?"
        )
        .bind(file_key)
        .bind(file_name)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated project".to_string())
        })
    }
}
