use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Sentinel stored when a checkout form leaves the notes field blank.
pub const DEFAULT_NOTES: &str = "No additional notes.";

/// Maximum accepted length of the notes field, in characters.
pub const MAX_NOTES_LEN: usize = 500;

/// Settlement methods offered at checkout.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    CashOnDelivery,
    CreditCard,
    BankTransfer,
    #[serde(rename = "momo")]
    #[strum(serialize = "momo")]
    MoMo,
    #[serde(rename = "vnpay")]
    #[strum(serialize = "vnpay")]
    VnPay,
}

/// Canonical payment status set. `Approved` is the single success terminal;
/// `Cancelled` is reserved for manual operator action and is never set by the
/// callback flow.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Refunded,
    Cancelled,
}

impl PaymentStatus {
    /// Statuses the callback idempotency gate treats as already settled:
    /// a callback arriving for one of these is re-acknowledged, never
    /// re-applied.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Approved | PaymentStatus::Rejected | PaymentStatus::Refunded
        )
    }

    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Approved)
                | (PaymentStatus::Pending, PaymentStatus::Rejected)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
                | (PaymentStatus::Approved, PaymentStatus::Refunded)
        )
    }
}

/// One frozen line of an order, copied from the cart snapshot at creation
/// time. Catalog price changes after checkout never touch these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
    #[serde(default)]
    pub selected_options: String,
}

/// The durable order aggregate. Exactly one of `user_id` / the guest contact
/// fields is active, flagged by `is_guest_order`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    /// Assigned by the repository at persistence; 0 until then.
    pub id: i64,
    pub user_id: Option<String>,
    pub is_guest_order: bool,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub shipping_address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub order_date: DateTime<Utc>,
    /// Fixed at creation as the sum over the snapshot lines; never recomputed.
    pub total_price: Decimal,
    pub notes: String,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Provider-correlation string, written once before the outbound gateway
    /// call. A fresh checkout attempt gets a fresh reference.
    pub payment_reference: Option<String>,
    /// Provider-issued id, set only by a successful callback.
    pub transaction_id: Option<String>,
    /// Audit trail: last gateway message, serialized callback parameters, or
    /// the full payment URL for hosted-page flows.
    pub payment_response: Option<String>,
    pub lines: Vec<OrderLine>,
    /// Optimistic concurrency stamp; bumped by every repository update.
    pub version: i32,
}

impl Order {
    /// Applies a payment-status transition, rejecting anything outside the
    /// legal set and leaving the order untouched on failure.
    pub fn transition(&mut self, next: PaymentStatus) -> Result<(), ServiceError> {
        if self.payment_status.can_transition_to(next) {
            self.payment_status = next;
            Ok(())
        } else {
            Err(ServiceError::InvalidTransition {
                from: self.payment_status.to_string(),
                to: next.to_string(),
            })
        }
    }
}
