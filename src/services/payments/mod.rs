pub mod callbacks;
pub mod correlation;
pub mod momo;
pub mod signing;
pub mod vnpay;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    models::order::{Order, PaymentMethod},
    repositories::OrderRepository,
};

/// Outcome of a gateway initiation call, consumed by the checkout flow to
/// decide between local completion and an external redirect. Adapters never
/// propagate errors past this boundary; failures fold into `success = false`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentResult {
    pub success: bool,
    pub message: String,
    pub redirect_url: Option<String>,
}

impl PaymentResult {
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_url: None,
        }
    }

    pub fn redirect(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            redirect_url: Some(url.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            redirect_url: None,
        }
    }
}

/// Dispatches payment initiation to the adapter for the order's method.
///
/// CashOnDelivery, CreditCard, and BankTransfer settle locally without any
/// external call; MoMo and VNPay run the full signed redirect flow.
pub struct PaymentProcessor {
    momo: momo::MoMoGateway,
    vnpay: vnpay::VnpayGateway,
    orders: Arc<dyn OrderRepository>,
}

impl PaymentProcessor {
    pub fn new(
        config: &AppConfig,
        orders: Arc<dyn OrderRepository>,
        events: EventSender,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()
            .map_err(|e| ServiceError::GatewayError(format!("http client: {}", e)))?;

        Ok(Self {
            momo: momo::MoMoGateway::new(config.momo.clone(), client, orders.clone(), events.clone()),
            vnpay: vnpay::VnpayGateway::new(config.vnpay.clone(), orders.clone(), events),
            orders,
        })
    }

    /// Writes an audit note for the locally settled methods. Failure to write
    /// the note never fails the checkout.
    async fn record_note(&self, order: &Order, note: &str) {
        let mut updated = order.clone();
        updated.payment_response = Some(note.to_string());
        if let Err(err) = self.orders.update(updated).await {
            warn!(order_id = order.id, "failed to record payment note: {}", err);
        }
    }

    #[instrument(skip(self, order), fields(order_id = order.id, method = %order.payment_method))]
    pub async fn initiate(&self, order: &Order, callback_base_url: &str) -> PaymentResult {
        match order.payment_method {
            PaymentMethod::CashOnDelivery => {
                // Stays Pending until manual fulfillment.
                PaymentResult::completed("Cash on delivery order placed successfully.")
            }
            PaymentMethod::CreditCard => {
                info!(order_id = order.id, "processing credit card payment");
                let message = "Credit card payment processed successfully.";
                self.record_note(order, message).await;
                PaymentResult::completed(message)
            }
            PaymentMethod::BankTransfer => {
                info!(order_id = order.id, "processing bank transfer");
                let message = "Bank transfer information provided. Please complete the transfer using the provided instructions.";
                self.record_note(order, message).await;
                PaymentResult::completed(message)
            }
            PaymentMethod::MoMo => self.momo.initiate(order, callback_base_url).await,
            PaymentMethod::VnPay => self.vnpay.initiate(order, callback_base_url).await,
        }
    }
}
