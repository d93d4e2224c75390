use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{NewNotification, Notification, NotificationType},
    error::{AppError, Result},
    repository::{parse_uuid, to_utc, NotificationRepository},
};

#[derive(FromRow)]
struct NotificationRow {
    id: String,
    user_id: String,
    kind: String,
    title: String,
    message: String,
    order_id: Option<String>,
    project_id: Option<String>,
    read: bool,
    created_at: NaiveDateTime,
}

pub struct SqliteNotificationRepository {
    pool: SqlitePool,
}

impl SqliteNotificationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_notification(row: NotificationRow) -> Result<Notification> {
        Ok(Notification {
            id: parse_uuid(&row.id)?,
            user_id: parse_uuid(&row.user_id)?,
            kind: NotificationType::from_str(&row.kind).ok_or_else(|| {
                AppError::Database(format!("Invalid notification type: {}", row.kind))
            })?,
            title: row.title,
            message: row.message,
            order_id: row.order_id.as_deref().map(parse_uuid).transpose()?,
            project_id: row.project_id.as_deref().map(parse_uuid).transpose()?,
            read: row.read,
            created_at: to_utc(row.created_at),
        })
    }
}

#[async_trait]
impl NotificationRepository for SqliteNotificationRepository {
    async fn create(&self, notification: NewNotification) -> Result<Notification> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, kind, title, message, order_id, project_id, read, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#
        )
        .bind(id.to_string())
        .bind(notification.user_id.to_string())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.order_id.map(|id| id.to_string()))
        .bind(notification.project_id.map(|id| id.to_string()))
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(Notification {
            id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title,
            message: notification.message,
            order_id: notification.order_id,
            project_id: notification.project_id,
            read: false,
            created_at: now,
        })
    }

    async fn list_by_user(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT id, user_id, kind, title, message, order_id, project_id, read, created_at
            FROM notifications
            WHERE user_id = ? AND (? = 0 OR read = 0)
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id.to_string())
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_notification).collect()
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND user_id = ?")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
