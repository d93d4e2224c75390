use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::BankDetails,
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, BankDetailsRepository},
};

#[derive(FromRow)]
struct BankDetailsRow {
    id: String,
    creator_id: String,
    bank_name: String,
    account_name: String,
    account_number_encrypted: String,
    account_last4: String,
    is_verified: bool,
    created_at: NaiveDateTime,
}

const BANK_DETAILS_COLUMNS: &str = r#"
    id, creator_id, bank_name, account_name, account_number_encrypted,
    account_last4, is_verified, created_at
"#;

pub struct SqliteBankDetailsRepository {
    pool: SqlitePool,
}

impl SqliteBankDetailsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_details(row: BankDetailsRow) -> Result<BankDetails> {
        Ok(BankDetails {
            id: parse_uuid(&row.id)?,
            creator_id: parse_uuid(&row.creator_id)?,
            bank_name: row.bank_name,
            account_name: row.account_name,
            account_number_encrypted: row.account_number_encrypted,
            account_last4: row.account_last4,
            is_verified: row.is_verified,
            created_at: to_utc(row.created_at),
        })
    }
}

#[async_trait]
impl BankDetailsRepository for SqliteBankDetailsRepository {
    async fn create(&self, details: BankDetails) -> Result<BankDetails> {
        sqlx::query(
            r#"
            INSERT INTO bank_details (
                id, creator_id, bank_name, account_name, account_number_encrypted,
                account_last4, is_verified, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(details.id.to_string())
        .bind(details.creator_id.to_string())
        .bind(&details.bank_name)
        .bind(&details.account_name)
        .bind(&details.account_number_encrypted)
        .bind(&details.account_last4)
        .bind(details.is_verified)
        .bind(details.created_at.naive_utc())
        .execute(&self.pool)
        .await?;

        self.find_by_id(details.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created bank details".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BankDetails>> {
        let row = sqlx::query_as::<_, BankDetailsRow>(&format!(
            "SELECT {} FROM bank_details WHERE id = ?",
            BANK_DETAILS_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_details).transpose()
    }

    async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<BankDetails>> {
        let rows = sqlx::query_as::<_, BankDetailsRow>(&format!(
            "SELECT {} FROM bank_details WHERE creator_id = ? ORDER BY created_at DESC",
            BANK_DETAILS_COLUMNS
        ))
        .bind(creator_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_details).collect()
    }

    async fn mark_verified(&self, id: Uuid) -> Result<BankDetails> {
        let result = sqlx::query("UPDATE bank_details SET is_verified = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Bank details not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated bank details".to_string())
        })
    }
}
