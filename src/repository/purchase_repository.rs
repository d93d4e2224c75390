use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::Purchase,
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, PurchaseRepository},
};

#[derive(FromRow)]
struct PurchaseRow {
    id: String,
    order_id: String,
    project_id: String,
    buyer_id: String,
    access_granted: bool,
    download_count: i64,
    download_url: String,
    created_at: NaiveDateTime,
    last_downloaded_at: Option<NaiveDateTime>,
}

const PURCHASE_COLUMNS: &str = r#"
    id, order_id, project_id, buyer_id, access_granted, download_count,
    download_url, created_at, last_downloaded_at
"#;

/// Purchases are only ever inserted by settlement; this repository reads
/// them and tracks downloads.
pub struct SqlitePurchaseRepository {
    pool: SqlitePool,
}

impl SqlitePurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_purchase(row: PurchaseRow) -> Result<Purchase> {
        Ok(Purchase {
            id: parse_uuid(&row.id)?,
            order_id: parse_uuid(&row.order_id)?,
            project_id: parse_uuid(&row.project_id)?,
            buyer_id: parse_uuid(&row.buyer_id)?,
            access_granted: row.access_granted,
            download_count: row.download_count,
            download_url: row.download_url,
            created_at: to_utc(row.created_at),
            last_downloaded_at: row.last_downloaded_at.map(to_utc),
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM purchases WHERE id = ?",
            PURCHASE_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_purchase).transpose()
    }
}

#[async_trait]
impl PurchaseRepository for SqlitePurchaseRepository {
    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM purchases WHERE order_id = ?",
            PURCHASE_COLUMNS
        ))
        .bind(order_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_purchase).transpose()
    }

    async fn find_for_buyer(&self, buyer_id: Uuid, project_id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(&format!(
            r#"
            SELECT {} FROM purchases
            WHERE buyer_id = ? AND project_id = ? AND access_granted = 1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            PURCHASE_COLUMNS
        ))
        .bind(buyer_id.to_string())
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_purchase).transpose()
    }

    async fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(&format!(
            "SELECT {} FROM purchases WHERE buyer_id = ? ORDER BY created_at DESC",
            PURCHASE_COLUMNS
        ))
        .bind(buyer_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_purchase).collect()
    }

    async fn count_by_order(&self, order_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM purchases WHERE order_id = ?"
        )
        .bind(order_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn record_download(&self, id: Uuid) -> Result<Purchase> {
        sqlx::query(
            r#"
            UPDATE purchases
            SET download_count = download_count + 1,
                last_downloaded_at = ?
            WHERE id = ?
            "#
        )
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::NotFound("Purchase not found".to_string())
        })
    }
}
