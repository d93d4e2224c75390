use futures_util::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::NotificationRepository,
};

pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    /// Tells the buyer and creator about a settled order. Never fails: each
    /// record is written independently and errors are only logged.
    pub async fn create_payment_notifications(&self, ctx: &PaymentNotificationContext) {
        let paid = format_minor(ctx.amount_minor, &ctx.currency);
        let net = format_minor(ctx.net_amount_minor, &ctx.currency);

        let notifications = vec![
            NewNotification {
                user_id: ctx.buyer_id,
                kind: NotificationType::PaymentSent,
                title: "Payment successful".to_string(),
                message: format!("You paid {} for \"{}\".", paid, ctx.project_title),
                order_id: Some(ctx.order_id),
                project_id: Some(ctx.project_id),
            },
            NewNotification {
                user_id: ctx.creator_id,
                kind: NotificationType::PaymentReceived,
                title: "Payment received".to_string(),
                message: format!(
                    "{} paid {} for \"{}\". {} has been added to your balance.",
                    ctx.buyer_name, paid, ctx.project_title, net
                ),
                order_id: Some(ctx.order_id),
                project_id: Some(ctx.project_id),
            },
            NewNotification {
                user_id: ctx.creator_id,
                kind: NotificationType::ProjectPurchased,
                title: "Project purchased".to_string(),
                message: format!("\"{}\" was purchased by {}.", ctx.project_title, ctx.buyer_name),
                order_id: Some(ctx.order_id),
                project_id: Some(ctx.project_id),
            },
        ];

        let results = join_all(notifications.into_iter().map(|n| {
            let kind = n.kind;
            async move { (kind, self.repo.create(n).await) }
        }))
        .await;

        for (kind, result) in results {
            if let Err(e) = result {
                tracing::warn!(
                    order_id = %ctx.order_id,
                    kind = kind.as_str(),
                    "Failed to create payment notification: {}",
                    e
                );
            }
        }
    }

    pub async fn notify_withdrawal_updated(&self, withdrawal: &Withdrawal) {
        let notification = NewNotification {
            user_id: withdrawal.creator_id,
            kind: NotificationType::WithdrawalUpdated,
            title: "Withdrawal updated".to_string(),
            message: format!(
                "Your withdrawal of {} is now {}.",
                format_minor(withdrawal.amount_minor, &withdrawal.currency),
                withdrawal.status.as_str()
            ),
            order_id: None,
            project_id: None,
        };

        if let Err(e) = self.repo.create(notification).await {
            tracing::warn!(withdrawal_id = %withdrawal.id, "Failed to create withdrawal notification: {}", e);
        }
    }

    pub async fn list(&self, user_id: Uuid, unread_only: bool) -> Result<Vec<Notification>> {
        self.repo.list_by_user(user_id, unread_only).await
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        if !self.repo.mark_read(id, user_id).await? {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        self.repo.mark_all_read(user_id).await
    }
}
