use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use tracing::{error, info, instrument};
use url::form_urlencoded;

use crate::{
    config::VnpayConfig,
    events::{Event, EventSender},
    models::order::Order,
    repositories::OrderRepository,
};

use super::{
    correlation::{generate_reference, PaymentProvider},
    signing::{canonical_signing_string, hmac_sha512_hex},
    PaymentResult,
};

/// VNPay adapter. Unlike MoMo there is no server-to-server create call: the
/// hosted payment page URL is built and signed locally, then the shopper is
/// redirected to it.
pub struct VnpayGateway {
    config: VnpayConfig,
    orders: Arc<dyn OrderRepository>,
    events: EventSender,
}

impl VnpayGateway {
    pub fn new(config: VnpayConfig, orders: Arc<dyn OrderRepository>, events: EventSender) -> Self {
        Self {
            config,
            orders,
            events,
        }
    }

    #[instrument(skip(self, order), fields(order_id = order.id))]
    pub async fn initiate(&self, order: &Order, callback_base_url: &str) -> PaymentResult {
        let reference = generate_reference(PaymentProvider::VnPay, order.id);

        let mut pending = order.clone();
        pending.payment_reference = Some(reference.clone());
        let mut pending = match self.orders.update(pending).await {
            Ok(saved) => saved,
            Err(err) => {
                error!(order_id = order.id, "failed to persist payment reference: {}", err);
                return PaymentResult::failed(
                    "Unable to record the payment reference. Please try again later.",
                );
            }
        };

        // VNPay wants the amount in minor units and timestamps as GMT+7 wall
        // clock, formatted yyyyMMddHHmmss.
        let amount_minor = pending.total_price.trunc().to_i64().unwrap_or(0) * 100;
        let vietnam_now = Utc::now() + Duration::hours(7);
        let create_date = vietnam_now.format("%Y%m%d%H%M%S").to_string();
        let return_url = format!(
            "{}/api/v1/payments/vnpay/return",
            callback_base_url.trim_end_matches('/')
        );

        let mut params = BTreeMap::new();
        params.insert("vnp_Version".to_string(), "2.1.0".to_string());
        params.insert("vnp_Command".to_string(), "pay".to_string());
        params.insert("vnp_TmnCode".to_string(), self.config.tmn_code.clone());
        params.insert("vnp_Amount".to_string(), amount_minor.to_string());
        params.insert("vnp_CreateDate".to_string(), create_date.clone());
        params.insert("vnp_CurrCode".to_string(), "VND".to_string());
        params.insert("vnp_IpAddr".to_string(), "127.0.0.1".to_string());
        params.insert("vnp_Locale".to_string(), "vn".to_string());
        params.insert(
            "vnp_OrderInfo".to_string(),
            format!("Thanh toan don hang #{}", pending.id),
        );
        params.insert("vnp_OrderType".to_string(), "190000".to_string());
        params.insert("vnp_ReturnUrl".to_string(), return_url);
        params.insert("vnp_TxnRef".to_string(), reference.clone());
        params.insert("vnp_TxnDate".to_string(), create_date);

        // Signature over un-encoded values; encoding happens only in the
        // final query string.
        let signature =
            hmac_sha512_hex(&self.config.hash_secret, &canonical_signing_string(&params));
        params.insert("vnp_SecureHash".to_string(), signature);

        let query = params
            .iter()
            .map(|(k, v)| {
                let encoded: String = form_urlencoded::byte_serialize(v.as_bytes()).collect();
                format!("{}={}", k, encoded)
            })
            .collect::<Vec<_>>()
            .join("&");
        let payment_url = format!("{}?{}", self.config.endpoint, query);

        info!(order_id = pending.id, "VNPay payment URL generated");

        // The hosted-page flow reads the URL back out of the audit field.
        pending.payment_response = Some(payment_url.clone());
        if let Err(err) = self.orders.update(pending.clone()).await {
            error!(order_id = pending.id, "failed to persist payment URL: {}", err);
            return PaymentResult::failed(
                "Unable to record the payment request. Please try again later.",
            );
        }

        self.events
            .send(Event::PaymentInitiated {
                order_id: pending.id,
                method: pending.payment_method.to_string(),
                reference,
            })
            .await;

        PaymentResult::redirect("Please complete the payment on the VNPay page", payment_url)
    }
}
