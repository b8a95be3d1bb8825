use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::Client;
use rust_decimal::prelude::ToPrimitive;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    config::MoMoConfig,
    events::{Event, EventSender},
    models::order::{Order, PaymentStatus},
    repositories::OrderRepository,
};

use super::{
    correlation::{generate_reference, PaymentProvider},
    signing::{canonical_signing_string, hmac_sha256_hex},
    PaymentResult,
};

const REQUEST_TYPE: &str = "captureWallet";

/// MoMo e-wallet adapter: signs a create-payment request, POSTs it as JSON,
/// and turns the returned `payUrl` into a redirect for the shopper.
pub struct MoMoGateway {
    config: MoMoConfig,
    client: Client,
    orders: Arc<dyn OrderRepository>,
    events: EventSender,
}

impl MoMoGateway {
    pub fn new(
        config: MoMoConfig,
        client: Client,
        orders: Arc<dyn OrderRepository>,
        events: EventSender,
    ) -> Self {
        Self {
            config,
            client,
            orders,
            events,
        }
    }

    #[instrument(skip(self, order), fields(order_id = order.id))]
    pub async fn initiate(&self, order: &Order, callback_base_url: &str) -> PaymentResult {
        let reference = generate_reference(PaymentProvider::MoMo, order.id);

        // The reference must be durable before the provider ever sees it, so
        // a callback can always be correlated even if this request dies.
        let mut pending = order.clone();
        pending.payment_reference = Some(reference.clone());
        let pending = match self.orders.update(pending).await {
            Ok(saved) => saved,
            Err(err) => {
                error!(order_id = order.id, "failed to persist payment reference: {}", err);
                return PaymentResult::failed(
                    "Unable to record the payment reference. Please try again later.",
                );
            }
        };

        let request_id = Uuid::new_v4().to_string();
        // MoMo takes the amount in major units.
        let amount = pending.total_price.trunc().to_i64().unwrap_or(0);
        let order_info = format!("Payment for order #{}", pending.id);
        let callback_url = format!(
            "{}/api/v1/payments/momo/ipn",
            callback_base_url.trim_end_matches('/')
        );

        let mut params = BTreeMap::new();
        params.insert("accessKey".to_string(), self.config.access_key.clone());
        params.insert("amount".to_string(), amount.to_string());
        params.insert("extraData".to_string(), String::new());
        params.insert("ipnUrl".to_string(), callback_url.clone());
        params.insert("orderId".to_string(), reference.clone());
        params.insert("orderInfo".to_string(), order_info.clone());
        params.insert("partnerCode".to_string(), self.config.partner_code.clone());
        params.insert("redirectUrl".to_string(), callback_url.clone());
        params.insert("requestId".to_string(), request_id.clone());
        params.insert("requestType".to_string(), REQUEST_TYPE.to_string());
        let signature =
            hmac_sha256_hex(&self.config.secret_key, &canonical_signing_string(&params));

        let body = json!({
            "partnerCode": self.config.partner_code,
            "partnerName": self.config.partner_name,
            "storeId": self.config.partner_code,
            "requestId": request_id,
            "amount": amount,
            "orderId": reference,
            "orderInfo": order_info,
            "redirectUrl": callback_url,
            "ipnUrl": callback_url,
            "lang": "en",
            "extraData": "",
            "requestType": REQUEST_TYPE,
            "signature": signature,
        });

        info!(order_id = pending.id, endpoint = %self.config.endpoint, "sending MoMo create-payment request");

        let response = self.client.post(&self.config.endpoint).json(&body).send().await;
        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(payload) => self.handle_gateway_payload(pending, &reference, payload).await,
                Err(err) => {
                    error!(order_id = pending.id, "malformed MoMo response: {}", err);
                    self.reject(pending, "Error parsing payment gateway response.")
                        .await;
                    PaymentResult::failed(
                        "Error processing MoMo payment. Please try again later.",
                    )
                }
            },
            Ok(resp) => {
                warn!(order_id = pending.id, status = %resp.status(), "MoMo returned an error status");
                self.reject(pending, &format!("Payment gateway error: {}", resp.status()))
                    .await;
                PaymentResult::failed("Error processing MoMo payment. Please try again later.")
            }
            Err(err) if err.is_timeout() => {
                error!(order_id = pending.id, "MoMo request timed out: {}", err);
                self.reject(
                    pending,
                    "Connection to payment gateway timed out. Please try again later.",
                )
                .await;
                PaymentResult::failed("Error processing MoMo payment. Please try again later.")
            }
            Err(err) => {
                error!(order_id = pending.id, "MoMo request failed: {}", err);
                self.reject(
                    pending,
                    "Error contacting payment gateway. Please try again later.",
                )
                .await;
                PaymentResult::failed("Error processing MoMo payment. Please try again later.")
            }
        }
    }

    async fn handle_gateway_payload(
        &self,
        mut order: Order,
        reference: &str,
        payload: Value,
    ) -> PaymentResult {
        if let Some(pay_url) = payload.get("payUrl").and_then(|v| v.as_str()) {
            info!(order_id = order.id, "MoMo payment URL generated");
            order.payment_response = Some("Awaiting payment via MoMo".to_string());
            if let Err(err) = self.orders.update(order.clone()).await {
                error!(order_id = order.id, "failed to persist awaiting state: {}", err);
            }
            self.events
                .send(Event::PaymentInitiated {
                    order_id: order.id,
                    method: order.payment_method.to_string(),
                    reference: reference.to_string(),
                })
                .await;
            return PaymentResult::redirect(
                "Please complete the payment on the MoMo page",
                pay_url,
            );
        }

        let message = payload
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        let result_code = payload
            .get("resultCode")
            .map(|v| v.to_string())
            .unwrap_or_default();
        warn!(order_id = order.id, %result_code, "MoMo rejected the payment request: {}", message);
        self.reject(order, &format!("MoMo payment failed: {}", message))
            .await;
        PaymentResult::failed(format!("Error processing MoMo payment: {}", message))
    }

    /// Marks the order Rejected with an explanatory audit note. Persistence
    /// problems are logged; the shopper still gets a failure result.
    async fn reject(&self, mut order: Order, note: &str) {
        if let Err(err) = order.transition(PaymentStatus::Rejected) {
            warn!(order_id = order.id, "cannot mark order rejected: {}", err);
            return;
        }
        order.payment_response = Some(note.to_string());
        match self.orders.update(order.clone()).await {
            Ok(_) => {
                self.events
                    .send(Event::PaymentRejected {
                        order_id: order.id,
                        reason: note.to_string(),
                    })
                    .await;
            }
            Err(err) => {
                error!(order_id = order.id, "failed to persist rejected state: {}", err);
            }
        }
    }
}
