use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// One purchase attempt for one project.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub project_id: Uuid,
    pub buyer_id: Uuid,
    pub creator_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: String,
    /// Buyer-facing amount in minor units (cents, kobo)
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub payment_reference: Option<String>,
    pub metadata: OrderMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Amount and currency the gateway was actually asked to charge.
    pub fn charge_intent(&self) -> (i64, &str) {
        match &self.metadata.conversion {
            Some(conversion) => (conversion.converted_amount_minor, conversion.converted_currency.as_str()),
            None => (self.amount_minor, self.currency.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "completed" => Some(OrderStatus::Completed),
            "failed" => Some(OrderStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Paystack,
    Stripe,
    Paypal,
    Flutterwave,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Paystack => "paystack",
            PaymentMethod::Stripe => "stripe",
            PaymentMethod::Paypal => "paypal",
            PaymentMethod::Flutterwave => "flutterwave",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "paystack" => Some(PaymentMethod::Paystack),
            "stripe" => Some(PaymentMethod::Stripe),
            "paypal" => Some(PaymentMethod::Paypal),
            "flutterwave" => Some(PaymentMethod::Flutterwave),
            _ => None,
        }
    }
}

/// Context persisted alongside an order so verification can reconcile
/// against the original charge intent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct OrderMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversion: Option<CurrencyConversion>,
    /// Raw provider payload captured at verification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub gateway_response: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct CurrencyConversion {
    pub original_amount_minor: i64,
    pub original_currency: String,
    pub converted_amount_minor: i64,
    pub converted_currency: String,
    pub exchange_rate: f64,
    pub converted_at: DateTime<Utc>,
}

/// Currencies buyers may be charged in.
pub const SUPPORTED_CURRENCIES: &[&str] = &["USD", "NGN"];

pub fn is_supported_currency(code: &str) -> bool {
    SUPPORTED_CURRENCIES.contains(&code)
}

/// Checkout request. The amount and currency come from the project's price.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct InitializePaymentRequest {
    pub project_id: Uuid,
    pub payment_method: PaymentMethod,
    #[validate(email)]
    pub buyer_email: String,
    #[validate(length(min = 1, max = 100))]
    pub buyer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentInitialization {
    pub order_id: Uuid,
    pub reference: String,
    pub payment_url: String,
    pub amount_minor: i64,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<CurrencyConversion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    pub order_id: Uuid,
    /// Defaults to the reference stored at initialization
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentVerification {
    pub order: Order,
    /// False when the order had already been settled by an earlier call
    pub newly_settled: bool,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub project_id: Uuid,
    pub buyer_id: Uuid,
    pub creator_id: Uuid,
    pub buyer_email: String,
    pub buyer_name: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method: PaymentMethod,
    pub metadata: OrderMetadata,
}
