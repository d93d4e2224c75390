use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Marketplace cut, in basis points (15%).
pub const PLATFORM_FEE_BPS: i64 = 1500;
/// Approximate processor cut, in basis points (2.9%).
pub const PAYMENT_FEE_BPS: i64 = 290;

const BPS_DENOMINATOR: i64 = 10_000;

/// Fee split of a gross amount. `platform_fee + payment_fee + net_amount`
/// always equals `gross_amount`; the net absorbs rounding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct FeeBreakdown {
    pub gross_amount_minor: i64,
    pub platform_fee_minor: i64,
    pub payment_fee_minor: i64,
    pub net_amount_minor: i64,
}

impl FeeBreakdown {
    pub fn compute(gross_amount_minor: i64) -> Self {
        let platform_fee_minor = apply_bps(gross_amount_minor, PLATFORM_FEE_BPS);
        let payment_fee_minor = apply_bps(gross_amount_minor, PAYMENT_FEE_BPS);
        Self {
            gross_amount_minor,
            platform_fee_minor,
            payment_fee_minor,
            net_amount_minor: gross_amount_minor - platform_fee_minor - payment_fee_minor,
        }
    }
}

/// `amount * bps / 10_000`, rounded half away from zero.
fn apply_bps(amount: i64, bps: i64) -> i64 {
    let scaled = amount as i128 * bps as i128;
    let half = BPS_DENOMINATOR as i128 / 2;
    let rounded = if scaled >= 0 {
        (scaled + half) / BPS_DENOMINATOR as i128
    } else {
        (scaled - half) / BPS_DENOMINATOR as i128
    };
    rounded as i64
}

/// Ledger entry crediting a creator for one completed order.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatorEarnings {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub order_id: Uuid,
    pub project_id: Uuid,
    pub gross_amount_minor: i64,
    pub platform_fee_minor: i64,
    pub payment_fee_minor: i64,
    pub net_amount_minor: i64,
    pub currency: String,
    pub status: EarningsStatus,
    pub created_at: DateTime<Utc>,
}

impl CreatorEarnings {
    pub fn fees(&self) -> FeeBreakdown {
        FeeBreakdown {
            gross_amount_minor: self.gross_amount_minor,
            platform_fee_minor: self.platform_fee_minor,
            payment_fee_minor: self.payment_fee_minor,
            net_amount_minor: self.net_amount_minor,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EarningsStatus {
    Available,
    Pending,
    Paid,
}

impl EarningsStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EarningsStatus::Available => "available",
            EarningsStatus::Pending => "pending",
            EarningsStatus::Paid => "paid",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(EarningsStatus::Available),
            "pending" => Some(EarningsStatus::Pending),
            "paid" => Some(EarningsStatus::Paid),
            _ => None,
        }
    }
}

/// Read-side aggregation of a creator's earnings ledger in one currency.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct CreatorBalance {
    pub currency: String,
    /// Net earnings in `available` status
    pub available_minor: i64,
    /// Net earnings in `pending` status
    pub pending_minor: i64,
    /// Net earnings already paid out
    pub paid_minor: i64,
    /// Sum of every net earnings entry
    pub total_minor: i64,
    /// Withdrawals not yet completed or failed
    pub pending_withdrawals_minor: i64,
    /// What a new withdrawal may draw on
    pub withdrawable_minor: i64,
}

impl CreatorBalance {
    pub fn zeroed(currency: &str) -> Self {
        Self {
            currency: currency.to_string(),
            ..Default::default()
        }
    }
}
