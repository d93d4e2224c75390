use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreatorEarnings, EarningsStatus},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, EarningsRepository},
};

#[derive(FromRow)]
struct EarningsRow {
    id: String,
    creator_id: String,
    order_id: String,
    project_id: String,
    gross_amount_minor: i64,
    platform_fee_minor: i64,
    payment_fee_minor: i64,
    net_amount_minor: i64,
    currency: String,
    status: String,
    created_at: NaiveDateTime,
}

const EARNINGS_COLUMNS: &str = r#"
    id, creator_id, order_id, project_id, gross_amount_minor, platform_fee_minor,
    payment_fee_minor, net_amount_minor, currency, status, created_at
"#;

pub struct SqliteEarningsRepository {
    pool: SqlitePool,
}

impl SqliteEarningsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_status(s: &str) -> Result<EarningsStatus> {
        EarningsStatus::from_str(s)
            .ok_or_else(|| AppError::Database(format!("Invalid earnings status: {}", s)))
    }

    fn row_to_earnings(row: EarningsRow) -> Result<CreatorEarnings> {
        let earnings = CreatorEarnings {
            id: parse_uuid(&row.id)?,
            creator_id: parse_uuid(&row.creator_id)?,
            order_id: parse_uuid(&row.order_id)?,
            project_id: parse_uuid(&row.project_id)?,
            gross_amount_minor: row.gross_amount_minor,
            platform_fee_minor: row.platform_fee_minor,
            payment_fee_minor: row.payment_fee_minor,
            net_amount_minor: row.net_amount_minor,
            currency: row.currency,
            status: Self::parse_status(&row.status)?,
            created_at: to_utc(row.created_at),
        };

        let fees = earnings.fees();
        if fees.platform_fee_minor + fees.payment_fee_minor + fees.net_amount_minor
            != fees.gross_amount_minor
        {
            return Err(AppError::Database(format!(
                "Earnings {} do not add up to gross amount",
                earnings.id
            )));
        }

        Ok(earnings)
    }
}

#[async_trait]
impl EarningsRepository for SqliteEarningsRepository {
    async fn find_by_order(&self, order_id: Uuid) -> Result<Option<CreatorEarnings>> {
        let row = sqlx::query_as::<_, EarningsRow>(&format!(
            "SELECT {} FROM creator_earnings WHERE order_id = ?",
            EARNINGS_COLUMNS
        ))
        .bind(order_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_earnings).transpose()
    }

    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<CreatorEarnings>> {
        let rows = sqlx::query_as::<_, EarningsRow>(&format!(
            "SELECT {} FROM creator_earnings WHERE creator_id = ? ORDER BY created_at DESC",
            EARNINGS_COLUMNS
        ))
        .bind(creator_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_earnings).collect()
    }

    async fn count_by_order(&self, order_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM creator_earnings WHERE order_id = ?"
        )
        .bind(order_id.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn sum_net_by_status(
        &self,
        creator_id: Uuid,
        currency: &str,
    ) -> Result<Vec<(EarningsStatus, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COALESCE(SUM(net_amount_minor), 0)
            FROM creator_earnings
            WHERE creator_id = ? AND currency = ?
            GROUP BY status
            "#
        )
        .bind(creator_id.to_string())
        .bind(currency)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(status, total)| Ok((Self::parse_status(&status)?, total)))
            .collect()
    }
}
