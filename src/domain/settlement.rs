use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{
    download_url_for, CreatorEarnings, EarningsStatus, FeeBreakdown, Order, OrderMetadata,
    Purchase,
};

/// Every record written when a verified payment completes an order. The
/// repository applies it as one unit, conditional on the order still being
/// pending.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub order_id: Uuid,
    pub project_id: Uuid,
    pub payment_reference: String,
    pub metadata: OrderMetadata,
    pub completed_at: DateTime<Utc>,
    pub fees: FeeBreakdown,
    pub purchase: Purchase,
    pub earnings: CreatorEarnings,
}

impl Settlement {
    pub fn for_order(
        order: &Order,
        payment_reference: &str,
        gateway_response: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        let fees = FeeBreakdown::compute(order.amount_minor);

        let metadata = OrderMetadata {
            conversion: order.metadata.conversion.clone(),
            gateway_response: Some(gateway_response),
        };

        let purchase = Purchase {
            id: Uuid::new_v4(),
            order_id: order.id,
            project_id: order.project_id,
            buyer_id: order.buyer_id,
            access_granted: true,
            download_count: 0,
            download_url: download_url_for(order.project_id),
            created_at: now,
            last_downloaded_at: None,
        };

        let earnings = CreatorEarnings {
            id: Uuid::new_v4(),
            creator_id: order.creator_id,
            order_id: order.id,
            project_id: order.project_id,
            gross_amount_minor: fees.gross_amount_minor,
            platform_fee_minor: fees.platform_fee_minor,
            payment_fee_minor: fees.payment_fee_minor,
            net_amount_minor: fees.net_amount_minor,
            currency: order.currency.clone(),
            status: EarningsStatus::Available,
            created_at: now,
        };

        Self {
            order_id: order.id,
            project_id: order.project_id,
            payment_reference: payment_reference.to_string(),
            metadata,
            completed_at: now,
            fees,
            purchase,
            earnings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    /// This call moved the order from pending to completed.
    Settled,
    /// The order was no longer pending; nothing was written.
    AlreadySettled,
}
