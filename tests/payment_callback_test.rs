mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use checkout_api::{
    app_router,
    models::order::{PaymentMethod, PaymentStatus},
    repositories::OrderRepository,
};

use common::{momo_success_params, sign_momo, vnpay_params, TestApp};

#[tokio::test]
async fn momo_success_callback_approves_the_order() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let params = momo_success_params(&reference, "2547839");
    let ack = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(ack.status, "ok");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Approved);
    assert_eq!(settled.transaction_id.as_deref(), Some("2547839"));
    // The raw callback parameters are kept for audit.
    assert!(settled.payment_response.unwrap().contains("resultCode"));
}

#[tokio::test]
async fn duplicate_momo_callback_is_reacked_without_reapplying() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();
    let params = momo_success_params(&reference, "2547839");

    let first = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(first.status, "ok");
    let version_after_first = app.orders.get(order.id).await.unwrap().unwrap().version;

    let second = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(second.status, "ok");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Approved);
    assert_eq!(settled.version, version_after_first);
}

#[tokio::test]
async fn tampered_momo_callback_is_rejected_and_leaves_the_order_pending() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let mut params = momo_success_params(&reference, "2547839");
    // Signed over amount=76000; mutate after signing.
    params.insert("amount".to_string(), "1".to_string());
    let ack = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(ack.status, "error");

    let untouched = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);
    assert!(untouched.transaction_id.is_none());
}

#[tokio::test]
async fn momo_callback_without_a_signature_is_rejected() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let mut params = momo_success_params(&reference, "2547839");
    params.remove("signature");
    let ack = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(ack.status, "error");

    let untouched = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn momo_callback_for_an_unknown_order_is_an_error_ack() {
    let app = TestApp::new();
    let params = momo_success_params("ORD_999_1234567", "2547839");
    let ack = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(ack.status, "error");
}

#[tokio::test]
async fn momo_callback_with_mismatched_reference_echo_is_rejected() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;

    // Same order id, different ticks segment than the stored reference.
    let params = momo_success_params(&format!("ORD_{}_7654321", order.id), "2547839");
    let ack = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(ack.status, "error");
    let untouched = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn momo_user_cancellation_rejects_the_order() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let mut params = momo_success_params(&reference, "0");
    params.insert("resultCode".to_string(), "1006".to_string());
    params.insert(
        "message".to_string(),
        "Transaction denied by user.".to_string(),
    );
    sign_momo(&mut params);

    let ack = app.state.callback_verifier.handle_momo_ipn(&params).await;
    assert_eq!(ack.status, "ok");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Rejected);
    assert!(settled.payment_response.unwrap().contains("cancelled"));
}

#[tokio::test]
async fn concurrent_momo_duplicates_settle_the_order_exactly_once() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();
    let params = momo_success_params(&reference, "2547839");

    let (a, b) = tokio::join!(
        app.state.callback_verifier.handle_momo_ipn(&params),
        app.state.callback_verifier.handle_momo_ipn(&params),
    );
    assert_eq!(a.status, "ok");
    assert_eq!(b.status, "ok");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Approved);
    // Create, reference write, then exactly one callback write.
    assert_eq!(settled.version, 3);
}

#[tokio::test]
async fn vnpay_success_callback_approves_the_order() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::VnPay, |id| format!("1234567_{}", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let params = vnpay_params(&reference, "00", "00");
    let ack = app
        .state
        .callback_verifier
        .handle_vnpay_callback(&params)
        .await;
    assert_eq!(ack.rsp_code, "00");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Approved);
    assert_eq!(settled.transaction_id.as_deref(), Some("14588899"));
}

#[tokio::test]
async fn vnpay_invalid_signature_is_code_97() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::VnPay, |id| format!("1234567_{}", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let mut params = vnpay_params(&reference, "00", "00");
    params.insert("vnp_Amount".to_string(), "100".to_string());
    let ack = app
        .state
        .callback_verifier
        .handle_vnpay_callback(&params)
        .await;
    assert_eq!(ack.rsp_code, "97");
    let untouched = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn vnpay_unknown_order_is_code_01() {
    let app = TestApp::new();
    let params = vnpay_params("1234567_999", "00", "00");
    let ack = app
        .state
        .callback_verifier
        .handle_vnpay_callback(&params)
        .await;
    assert_eq!(ack.rsp_code, "01");
}

#[tokio::test]
async fn vnpay_cancellation_rejects_the_order_but_still_acks() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::VnPay, |id| format!("1234567_{}", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let params = vnpay_params(&reference, "24", "02");
    let ack = app
        .state
        .callback_verifier
        .handle_vnpay_callback(&params)
        .await;
    assert_eq!(ack.rsp_code, "00");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Rejected);
}

#[tokio::test]
async fn late_failure_after_approval_does_not_downgrade_the_order() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::VnPay, |id| format!("1234567_{}", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let success = vnpay_params(&reference, "00", "00");
    let ack = app
        .state
        .callback_verifier
        .handle_vnpay_callback(&success)
        .await;
    assert_eq!(ack.rsp_code, "00");

    // A straggling failure notification for a settled order is re-acked.
    let failure = vnpay_params(&reference, "99", "02");
    let ack = app
        .state
        .callback_verifier
        .handle_vnpay_callback(&failure)
        .await;
    assert_eq!(ack.rsp_code, "00");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Approved);
    assert_eq!(settled.transaction_id.as_deref(), Some("14588899"));
}

#[tokio::test]
async fn momo_ipn_endpoint_accepts_form_encoded_callbacks() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::MoMo, |id| format!("ORD_{}_1234567", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();
    let params = momo_success_params(&reference, "2547839");

    let form: String = params
        .iter()
        .map(|(k, v)| {
            let encoded: String =
                url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
            format!("{}={}", k, encoded)
        })
        .collect::<Vec<_>>()
        .join("&");

    let router = app_router(app.state.clone());
    let response = router
        .oneshot(
            Request::post("/api/v1/payments/momo/ipn")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["status"], "ok");

    let settled = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(settled.payment_status, PaymentStatus::Approved);
}

#[tokio::test]
async fn vnpay_return_with_a_bad_signature_does_not_disclose_the_order_status() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::VnPay, |id| format!("1234567_{}", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();

    let mut params = vnpay_params(&reference, "00", "00");
    // Signed over the original amount; mutate after signing.
    params.insert("vnp_Amount".to_string(), "100".to_string());
    let query: String = params
        .iter()
        .map(|(k, v)| {
            let encoded: String =
                url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
            format!("{}={}", k, encoded)
        })
        .collect::<Vec<_>>()
        .join("&");

    let router = app_router(app.state.clone());
    let response = router
        .oneshot(
            Request::get(format!("/api/v1/payments/vnpay/return?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    // Generic failure body only; no payment status, no transaction id.
    assert!(payload.get("data").is_none());
    assert_eq!(
        payload["message"],
        "Invalid input: Payment notification could not be processed"
    );

    let untouched = app.orders.get(order.id).await.unwrap().unwrap();
    assert_eq!(untouched.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn vnpay_return_endpoint_reports_the_settled_status() {
    let app = TestApp::new();
    let order = app
        .pending_order_awaiting_callback(PaymentMethod::VnPay, |id| format!("1234567_{}", id))
        .await;
    let reference = order.payment_reference.clone().unwrap();
    let params = vnpay_params(&reference, "00", "00");

    let query: String = params
        .iter()
        .map(|(k, v)| {
            let encoded: String =
                url::form_urlencoded::byte_serialize(v.as_bytes()).collect();
            format!("{}={}", k, encoded)
        })
        .collect::<Vec<_>>()
        .join("&");

    let router = app_router(app.state.clone());
    let response = router
        .oneshot(
            Request::get(format!("/api/v1/payments/vnpay/return?{}", query))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let payload: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(payload["data"]["status"], "approved");
    assert_eq!(payload["data"]["order_id"], order.id);
}
