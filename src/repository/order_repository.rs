use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{
        NewOrder, Order, OrderMetadata, OrderStatus, PaymentMethod, Settlement,
        SettlementOutcome,
    },
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, OrderRepository},
};

// Database row struct that matches SQLite schema
#[derive(FromRow)]
struct OrderRow {
    id: String,
    project_id: String,
    buyer_id: String,
    creator_id: String,
    buyer_email: String,
    buyer_name: String,
    amount_minor: i64,
    currency: String,
    payment_method: String,
    status: String,
    payment_reference: Option<String>,
    metadata: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
    completed_at: Option<NaiveDateTime>,
}

const ORDER_COLUMNS: &str = r#"
    id, project_id, buyer_id, creator_id, buyer_email, buyer_name,
    amount_minor, currency, payment_method, status, payment_reference,
    metadata, created_at, updated_at, completed_at
"#;

pub struct SqliteOrderRepository {
    pool: SqlitePool,
}

impl SqliteOrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_order(row: OrderRow) -> Result<Order> {
        let status = OrderStatus::from_str(&row.status)
            .ok_or_else(|| AppError::Database(format!("Invalid order status: {}", row.status)))?;
        let payment_method = PaymentMethod::from_str(&row.payment_method).ok_or_else(|| {
            AppError::Database(format!("Invalid payment method: {}", row.payment_method))
        })?;
        let metadata: OrderMetadata = serde_json::from_str(&row.metadata)
            .map_err(|e| AppError::Database(format!("Invalid order metadata: {}", e)))?;

        Ok(Order {
            id: parse_uuid(&row.id)?,
            project_id: parse_uuid(&row.project_id)?,
            buyer_id: parse_uuid(&row.buyer_id)?,
            creator_id: parse_uuid(&row.creator_id)?,
            buyer_email: row.buyer_email,
            buyer_name: row.buyer_name,
            amount_minor: row.amount_minor,
            currency: row.currency,
            payment_method,
            status,
            payment_reference: row.payment_reference,
            metadata,
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
            completed_at: row.completed_at.map(to_utc),
        })
    }

    fn metadata_json(metadata: &OrderMetadata) -> Result<String> {
        serde_json::to_string(metadata).map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[async_trait]
impl OrderRepository for SqliteOrderRepository {
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();
        let metadata = Self::metadata_json(&order.metadata)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, project_id, buyer_id, creator_id, buyer_email, buyer_name,
                amount_minor, currency, payment_method, status, metadata,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(id.to_string())
        .bind(order.project_id.to_string())
        .bind(order.buyer_id.to_string())
        .bind(order.creator_id.to_string())
        .bind(&order.buyer_email)
        .bind(&order.buyer_name)
        .bind(order.amount_minor)
        .bind(&order.currency)
        .bind(order.payment_method.as_str())
        .bind(OrderStatus::Pending.as_str())
        .bind(&metadata)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created order".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = ?",
            ORDER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn find_by_reference(&self, reference: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE payment_reference = ?",
            ORDER_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_by_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE buyer_id = ? ORDER BY created_at DESC",
            ORDER_COLUMNS
        ))
        .bind(buyer_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn attach_reference(&self, id: Uuid, reference: &str) -> Result<Order> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET payment_reference = ?, updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#
        )
        .bind(reference)
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Order is no longer pending".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated order".to_string())
        })
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE orders SET status = 'failed', updated_at = ? WHERE id = ? AND status = 'pending'"
        )
        .bind(Utc::now().naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn settle(&self, settlement: &Settlement) -> Result<SettlementOutcome> {
        let metadata = Self::metadata_json(&settlement.metadata)?;
        let completed_at = settlement.completed_at.naive_utc();
        let order_id = settlement.order_id.to_string();
        let project_id = settlement.project_id.to_string();

        // Dropping the transaction on any early return rolls every write back.
        let mut tx = self.pool.begin().await?;

        // The status predicate is the mutual-exclusion point: a concurrent or
        // repeated settlement matches zero rows and writes nothing.
        let claimed = sqlx::query(
            r#"
            UPDATE orders
            SET status = 'completed',
                completed_at = ?,
                payment_reference = ?,
                metadata = ?,
                updated_at = ?
            WHERE id = ? AND status = 'pending'
            "#
        )
        .bind(completed_at)
        .bind(&settlement.payment_reference)
        .bind(&metadata)
        .bind(completed_at)
        .bind(&order_id)
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SettlementOutcome::AlreadySettled);
        }

        let purchase = &settlement.purchase;
        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, order_id, project_id, buyer_id, access_granted,
                download_count, download_url, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(purchase.id.to_string())
        .bind(&order_id)
        .bind(purchase.project_id.to_string())
        .bind(purchase.buyer_id.to_string())
        .bind(purchase.access_granted)
        .bind(purchase.download_count)
        .bind(&purchase.download_url)
        .bind(purchase.created_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        let stats = sqlx::query(
            r#"
            UPDATE projects
            SET total_purchases = total_purchases + 1,
                total_revenue_minor = total_revenue_minor + ?,
                updated_at = ?
            WHERE id = ?
            "#
        )
        .bind(settlement.fees.gross_amount_minor)
        .bind(completed_at)
        .bind(&project_id)
        .execute(&mut *tx)
        .await?;

        if stats.rows_affected() != 1 {
            return Err(AppError::Internal(format!(
                "Project {} missing while settling order {}",
                settlement.project_id, settlement.order_id
            )));
        }

        let earnings = &settlement.earnings;
        sqlx::query(
            r#"
            INSERT INTO creator_earnings (
                id, creator_id, order_id, project_id, gross_amount_minor,
                platform_fee_minor, payment_fee_minor, net_amount_minor,
                currency, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(earnings.id.to_string())
        .bind(earnings.creator_id.to_string())
        .bind(&order_id)
        .bind(earnings.project_id.to_string())
        .bind(earnings.gross_amount_minor)
        .bind(earnings.platform_fee_minor)
        .bind(earnings.payment_fee_minor)
        .bind(earnings.net_amount_minor)
        .bind(&earnings.currency)
        .bind(earnings.status.as_str())
        .bind(earnings.created_at.naive_utc())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(SettlementOutcome::Settled)
    }
}
