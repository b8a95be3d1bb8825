#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use rust_decimal_macros::dec;
use tokio::sync::mpsc;

use checkout_api::{
    config::{AppConfig, MoMoConfig, VnpayConfig},
    events::{self, Event},
    models::order::{Order, PaymentMethod, PaymentStatus, DEFAULT_NOTES},
    repositories::{
        InMemoryCartStore, InMemoryOrderRepository, InMemoryProductLookup, OrderRepository,
    },
    services::checkout::CheckoutRequest,
    services::payments::signing::{
        canonical_signing_string, hmac_sha256_hex, hmac_sha512_hex,
    },
    AppState,
};

pub const MOMO_TEST_SECRET: &str = "K951B6PE1waDMi640xX08PD3vg6EkVlz";
pub const VNPAY_TEST_SECRET: &str = "UVMCJECLPUWPXXLLLGWRUXOMTURXPKEL";

/// Test fixture wiring the full service graph against in-memory backends.
/// The MoMo endpoint points at a closed local port so initiation attempts
/// fail fast without touching the network.
pub struct TestApp {
    pub state: AppState,
    pub orders: Arc<InMemoryOrderRepository>,
    pub carts: Arc<InMemoryCartStore>,
    pub products: Arc<InMemoryProductLookup>,
    pub events: mpsc::Receiver<Event>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        callback_base_url: "http://localhost:8080".to_string(),
        gateway_timeout_secs: 2,
        momo: MoMoConfig {
            partner_code: "MOMO".to_string(),
            access_key: "F8BBA842ECF85".to_string(),
            secret_key: MOMO_TEST_SECRET.to_string(),
            endpoint: "http://127.0.0.1:9/v2/gateway/api/create".to_string(),
            partner_name: "Checkout Demo Store".to_string(),
        },
        vnpay: VnpayConfig {
            tmn_code: "NCB".to_string(),
            hash_secret: VNPAY_TEST_SECRET.to_string(),
            endpoint: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
        },
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Points the MoMo adapter at a mock gateway.
    pub fn with_momo_endpoint(endpoint: &str) -> Self {
        let mut config = test_config();
        config.momo.endpoint = endpoint.to_string();
        Self::with_config(config)
    }

    fn with_config(config: AppConfig) -> Self {
        let (event_tx, event_rx) = events::channel(256);
        let orders = Arc::new(InMemoryOrderRepository::new());
        let carts = Arc::new(InMemoryCartStore::new());
        let products = Arc::new(InMemoryProductLookup::new());
        products.insert(1, "Espresso", dec!(30000));
        products.insert(2, "Cappuccino", dec!(42000));
        products.insert(3, "Vietnamese Iced Coffee", dec!(38000));

        let state = AppState::build(
            config,
            event_tx,
            orders.clone(),
            carts.clone(),
            products.clone(),
        )
        .expect("state builds");

        Self {
            state,
            orders,
            carts,
            products,
            events: event_rx,
        }
    }

    /// Persists a Pending order carrying `reference`, as if checkout had
    /// initiated a gateway payment and is now awaiting the callback.
    pub async fn pending_order_awaiting_callback(
        &self,
        method: PaymentMethod,
        reference_for: impl FnOnce(i64) -> String,
    ) -> Order {
        let created = self
            .orders
            .create(draft_order(method))
            .await
            .expect("order persists");
        let mut with_ref = created;
        with_ref.payment_reference = Some(reference_for(with_ref.id));
        self.orders
            .update(with_ref)
            .await
            .expect("reference persists")
    }
}

pub fn draft_order(method: PaymentMethod) -> Order {
    Order {
        id: 0,
        user_id: None,
        is_guest_order: true,
        first_name: "Linh".to_string(),
        last_name: "Tran".to_string(),
        email: "linh@example.com".to_string(),
        phone_number: "0901234567".to_string(),
        shipping_address: "12 Bean St".to_string(),
        city: "Hanoi".to_string(),
        state: String::new(),
        zip_code: "100000".to_string(),
        order_date: chrono::Utc::now(),
        total_price: dec!(76000),
        notes: DEFAULT_NOTES.to_string(),
        payment_method: method,
        payment_status: PaymentStatus::Pending,
        payment_reference: None,
        transaction_id: None,
        payment_response: None,
        lines: vec![],
        version: 0,
    }
}

pub fn guest_checkout_request(method: Option<PaymentMethod>) -> CheckoutRequest {
    CheckoutRequest {
        first_name: "Linh".to_string(),
        last_name: "Tran".to_string(),
        email: "linh@example.com".to_string(),
        phone_number: "0901234567".to_string(),
        shipping_address: "12 Bean St".to_string(),
        city: "Hanoi".to_string(),
        state: String::new(),
        zip_code: "100000".to_string(),
        notes: String::new(),
        payment_method: method,
    }
}

/// Signs a MoMo callback the way the provider does: HMAC-SHA256 over every
/// parameter except the signature itself.
pub fn sign_momo(params: &mut HashMap<String, String>) {
    let canonical: BTreeMap<String, String> = params
        .iter()
        .filter(|(k, _)| k.as_str() != "signature")
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let signature = hmac_sha256_hex(MOMO_TEST_SECRET, &canonical_signing_string(&canonical));
    params.insert("signature".to_string(), signature);
}

/// Signs a VNPay callback: HMAC-SHA512 over the `vnp_`-prefixed parameters
/// minus the hash fields.
pub fn sign_vnpay(params: &mut HashMap<String, String>) {
    let canonical: BTreeMap<String, String> = params
        .iter()
        .filter(|(k, _)| {
            k.starts_with("vnp_")
                && k.as_str() != "vnp_SecureHash"
                && k.as_str() != "vnp_SecureHashType"
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let signature = hmac_sha512_hex(VNPAY_TEST_SECRET, &canonical_signing_string(&canonical));
    params.insert("vnp_SecureHash".to_string(), signature);
}

pub fn momo_success_params(reference: &str, transaction_id: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert("partnerCode".to_string(), "MOMO".to_string());
    params.insert("orderId".to_string(), reference.to_string());
    params.insert("requestId".to_string(), "req-1".to_string());
    params.insert("amount".to_string(), "76000".to_string());
    params.insert("orderInfo".to_string(), "Payment for order".to_string());
    params.insert("orderType".to_string(), "momo_wallet".to_string());
    params.insert("transId".to_string(), transaction_id.to_string());
    params.insert("resultCode".to_string(), "0".to_string());
    params.insert("message".to_string(), "Successful.".to_string());
    sign_momo(&mut params);
    params
}

pub fn vnpay_params(
    reference: &str,
    response_code: &str,
    txn_status: &str,
) -> HashMap<String, String> {
    let mut params = HashMap::new();
    params.insert("vnp_TmnCode".to_string(), "NCB".to_string());
    params.insert("vnp_TxnRef".to_string(), reference.to_string());
    params.insert("vnp_Amount".to_string(), "7600000".to_string());
    params.insert("vnp_ResponseCode".to_string(), response_code.to_string());
    params.insert("vnp_TransactionStatus".to_string(), txn_status.to_string());
    params.insert("vnp_TransactionNo".to_string(), "14588899".to_string());
    params.insert("vnp_BankCode".to_string(), "NCB".to_string());
    params.insert("vnp_PayDate".to_string(), "20260825120000".to_string());
    sign_vnpay(&mut params);
    params
}
