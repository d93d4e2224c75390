use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Withdrawal, WithdrawalStatus},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, WithdrawalRepository},
};

#[derive(FromRow)]
struct WithdrawalRow {
    id: String,
    creator_id: String,
    bank_details_id: String,
    amount_minor: i64,
    currency: String,
    status: String,
    note: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    processed_at: Option<NaiveDateTime>,
}

const WITHDRAWAL_COLUMNS: &str = r#"
    id, creator_id, bank_details_id, amount_minor, currency, status, note,
    created_at, updated_at, processed_at
"#;

pub struct SqliteWithdrawalRepository {
    pool: SqlitePool,
}

impl SqliteWithdrawalRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn parse_status(s: &str) -> Result<WithdrawalStatus> {
        WithdrawalStatus::from_str(s)
            .ok_or_else(|| AppError::Database(format!("Invalid withdrawal status: {}", s)))
    }

    fn row_to_withdrawal(row: WithdrawalRow) -> Result<Withdrawal> {
        Ok(Withdrawal {
            id: parse_uuid(&row.id)?,
            creator_id: parse_uuid(&row.creator_id)?,
            bank_details_id: parse_uuid(&row.bank_details_id)?,
            amount_minor: row.amount_minor,
            currency: row.currency,
            status: Self::parse_status(&row.status)?,
            note: row.note,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
            processed_at: row.processed_at.map(to_utc),
        })
    }
}

#[async_trait]
impl WithdrawalRepository for SqliteWithdrawalRepository {
    async fn create_within_balance(&self, withdrawal: Withdrawal) -> Result<Option<Withdrawal>> {
        let creator_id = withdrawal.creator_id.to_string();

        // Check and insert are one statement, so SQLite takes the write lock
        // before reading the balance and concurrent requests queue on it.
        let result = sqlx::query(
            r#"
            INSERT INTO withdrawals (
                id, creator_id, bank_details_id, amount_minor, currency,
                status, note, created_at, updated_at
            )
            SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?
            WHERE ? <= (
                SELECT COALESCE(SUM(net_amount_minor), 0)
                FROM creator_earnings
                WHERE creator_id = ? AND currency = ? AND status = 'available'
            ) - (
                SELECT COALESCE(SUM(amount_minor), 0)
                FROM withdrawals
                WHERE creator_id = ? AND currency = ? AND status != 'failed'
            )
            "#
        )
        .bind(withdrawal.id.to_string())
        .bind(&creator_id)
        .bind(withdrawal.bank_details_id.to_string())
        .bind(withdrawal.amount_minor)
        .bind(&withdrawal.currency)
        .bind(withdrawal.status.as_str())
        .bind(&withdrawal.note)
        .bind(withdrawal.created_at.naive_utc())
        .bind(withdrawal.updated_at.naive_utc())
        .bind(withdrawal.amount_minor)
        .bind(&creator_id)
        .bind(&withdrawal.currency)
        .bind(&creator_id)
        .bind(&withdrawal.currency)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(withdrawal.id).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Withdrawal>> {
        let row = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {} FROM withdrawals WHERE id = ?",
            WITHDRAWAL_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_withdrawal).transpose()
    }

    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<Withdrawal>> {
        let rows = sqlx::query_as::<_, WithdrawalRow>(&format!(
            "SELECT {} FROM withdrawals WHERE creator_id = ? ORDER BY created_at DESC",
            WITHDRAWAL_COLUMNS
        ))
        .bind(creator_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_withdrawal).collect()
    }

    async fn sum_by_status(
        &self,
        creator_id: Uuid,
        currency: &str,
    ) -> Result<Vec<(WithdrawalStatus, i64)>> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            r#"
            SELECT status, COALESCE(SUM(amount_minor), 0)
            FROM withdrawals
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

    async fn update_status(
        &self,
        id: Uuid,
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    ) -> Result<Option<Withdrawal>> {
        let now = Utc::now().naive_utc();
        let processed_at = if to.is_terminal() { Some(now) } else { None };

        let result = sqlx::query(
            r#"
            UPDATE withdrawals
            SET status = ?,
                processed_at = COALESCE(?, processed_at),
                updated_at = ?
            WHERE id = ? AND status = ?
            "#
        )
        .bind(to.as_str())
        .bind(processed_at)
        .bind(now)
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }
}
