use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    errors::ServiceError,
    events::{Event, EventSender},
    models::order::{Order, OrderLine, PaymentMethod, PaymentStatus, DEFAULT_NOTES, MAX_NOTES_LEN},
    repositories::{CartStore, OrderRepository},
    services::{payments::PaymentProcessor, snapshot::snapshot},
};

/// Checkout form payload. Guest submissions must carry a shipping address and
/// email; authenticated ones only need what they choose to fill in.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub shipping_address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[validate(length(max = 500, message = "Notes must be at most 500 characters"))]
    #[serde(default)]
    pub notes: String,
    pub payment_method: Option<PaymentMethod>,
}

/// Authenticated-user context supplied by the caller; its presence switches
/// checkout out of guest mode.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutOutcomeKind {
    /// Settled locally (cash on delivery and the synchronous stubs).
    Completed,
    /// The shopper must finish payment on the provider's hosted page.
    RedirectToGateway,
    /// The order was recorded but payment initiation failed; retryable.
    Failed,
}

/// Synchronous result of a checkout submission. Replaces the cross-request
/// flash messages the flow grew out of.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CheckoutOutcome {
    pub kind: CheckoutOutcomeKind,
    pub message: String,
    pub redirect_url: Option<String>,
    pub order_id: i64,
}

/// Converts a session cart into a durable order and coordinates payment
/// initiation. The order is always persisted before any gateway interaction.
pub struct CheckoutService {
    carts: Arc<dyn CartStore>,
    orders: Arc<dyn OrderRepository>,
    payments: Arc<PaymentProcessor>,
    events: EventSender,
    callback_base_url: String,
}

impl CheckoutService {
    pub fn new(
        carts: Arc<dyn CartStore>,
        orders: Arc<dyn OrderRepository>,
        payments: Arc<PaymentProcessor>,
        events: EventSender,
        callback_base_url: String,
    ) -> Self {
        Self {
            carts,
            orders,
            payments,
            events,
            callback_base_url,
        }
    }

    /// Builds the order aggregate from the snapshot and form input and
    /// persists it in Pending state. No gateway interaction happens here, and
    /// nothing is persisted when validation fails.
    #[instrument(skip(self, request, lines))]
    pub async fn create_order(
        &self,
        request: &CheckoutRequest,
        lines: Vec<OrderLine>,
        auth: Option<&AuthContext>,
    ) -> Result<Order, ServiceError> {
        request.validate()?;

        if auth.is_none() {
            if request.shipping_address.trim().is_empty() {
                return Err(ServiceError::validation(
                    "shipping_address",
                    "Please provide a shipping address",
                ));
            }
            if request.email.trim().is_empty() {
                return Err(ServiceError::validation("email", "Please provide an email"));
            }
        }

        let notes = request.notes.trim();
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(ServiceError::validation(
                "notes",
                "Notes must be at most 500 characters",
            ));
        }
        let notes = if notes.is_empty() {
            DEFAULT_NOTES.to_string()
        } else {
            notes.to_string()
        };

        // The total is derived from the snapshot alone; client-submitted
        // totals are never consulted.
        let total_price: Decimal = lines
            .iter()
            .map(|l| l.unit_price * Decimal::from(l.quantity))
            .sum();

        let order = Order {
            id: 0,
            user_id: auth.map(|a| a.user_id.clone()),
            is_guest_order: auth.is_none(),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            email: request.email.clone(),
            phone_number: request.phone_number.clone(),
            shipping_address: request.shipping_address.clone(),
            city: request.city.clone(),
            state: request.state.clone(),
            zip_code: request.zip_code.clone(),
            order_date: Utc::now(),
            total_price,
            notes,
            payment_method: request.payment_method.unwrap_or_default(),
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            transaction_id: None,
            payment_response: None,
            lines,
            version: 0,
        };

        let order = self.orders.create(order).await?;
        info!(order_id = order.id, total = %order.total_price, "order persisted");
        self.events
            .send(Event::OrderCreated { order_id: order.id })
            .await;
        Ok(order)
    }

    /// Full checkout flow: snapshot, persist Pending, initiate payment, map
    /// the result. The cart is cleared only once the synchronous leg of the
    /// flow has completed; a failed gateway call keeps it for a retry.
    #[instrument(skip(self, request))]
    pub async fn checkout(
        &self,
        session: &str,
        request: CheckoutRequest,
        auth: Option<AuthContext>,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let cart = self.carts.read(session).await?;
        let lines = snapshot(&cart)?;
        let order = self.create_order(&request, lines, auth.as_ref()).await?;

        let result = self.payments.initiate(&order, &self.callback_base_url).await;

        if result.success {
            self.carts.clear(session).await?;
            let kind = if result.redirect_url.is_some() {
                CheckoutOutcomeKind::RedirectToGateway
            } else {
                CheckoutOutcomeKind::Completed
            };
            Ok(CheckoutOutcome {
                kind,
                message: result.message,
                redirect_url: result.redirect_url,
                order_id: order.id,
            })
        } else {
            Ok(CheckoutOutcome {
                kind: CheckoutOutcomeKind::Failed,
                message: result.message,
                redirect_url: None,
                order_id: order.id,
            })
        }
    }
}
