use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub order_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    PaymentSent,
    PaymentReceived,
    ProjectPurchased,
    WithdrawalUpdated,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::PaymentSent => "payment_sent",
            NotificationType::PaymentReceived => "payment_received",
            NotificationType::ProjectPurchased => "project_purchased",
            NotificationType::WithdrawalUpdated => "withdrawal_updated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "payment_sent" => Some(NotificationType::PaymentSent),
            "payment_received" => Some(NotificationType::PaymentReceived),
            "project_purchased" => Some(NotificationType::ProjectPurchased),
            "withdrawal_updated" => Some(NotificationType::WithdrawalUpdated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub order_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

/// Everything needed to tell both parties about a settled order.
#[derive(Debug, Clone)]
pub struct PaymentNotificationContext {
    pub order_id: Uuid,
    pub project_id: Uuid,
    pub project_title: String,
    pub buyer_id: Uuid,
    pub buyer_name: String,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub net_amount_minor: i64,
}

/// `12345` minor units of USD -> `"USD 123.45"`.
pub fn format_minor(amount_minor: i64, currency: &str) -> String {
    let sign = if amount_minor < 0 { "-" } else { "" };
    let abs = amount_minor.unsigned_abs();
    format!("{} {}{}.{:02}", currency, sign, abs / 100, abs % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minor() {
        assert_eq!(format_minor(8_210, "USD"), "USD 82.10");
        assert_eq!(format_minor(5, "NGN"), "NGN 0.05");
        assert_eq!(format_minor(-150, "USD"), "USD -1.50");
    }
}
