use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Form, Json, Router,
};
use tracing::warn;

use crate::{
    errors::ServiceError,
    handlers::orders::PaymentStatusView,
    services::payments::{
        callbacks::{MoMoAck, VnpayAck},
        correlation::{parse_correlation_id, PaymentProvider},
    },
    ApiResponse, AppState,
};

/// MoMo instant payment notification
#[utoipa::path(
    post,
    path = "/api/v1/payments/momo/ipn",
    responses((status = 200, description = "Acknowledgment", body = MoMoAck)),
    tag = "Payments"
)]
async fn momo_ipn(
    State(state): State<AppState>,
    Form(params): Form<HashMap<String, String>>,
) -> Json<MoMoAck> {
    Json(state.callback_verifier.handle_momo_ipn(&params).await)
}

/// VNPay server-to-server notification
#[utoipa::path(
    get,
    path = "/api/v1/payments/vnpay/ipn",
    responses((status = 200, description = "Acknowledgment", body = VnpayAck)),
    tag = "Payments"
)]
async fn vnpay_ipn(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<VnpayAck> {
    Json(state.callback_verifier.handle_vnpay_callback(&params).await)
}

/// VNPay browser return. Processes the signed result exactly like the IPN
/// (either leg may arrive first) and then reports the settled status so the
/// storefront can render its confirmation page. A return leg that fails
/// verification gets a generic failure; the order's status is only disclosed
/// for an accepted notification.
#[utoipa::path(
    get,
    path = "/api/v1/payments/vnpay/return",
    responses(
        (status = 200, description = "Settled payment status", body = ApiResponse<PaymentStatusView>),
        (status = 400, description = "Notification not accepted", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
async fn vnpay_return(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ApiResponse<PaymentStatusView>>, ServiceError> {
    let ack = state.callback_verifier.handle_vnpay_callback(&params).await;
    if ack.rsp_code != "00" {
        warn!(rsp_code = %ack.rsp_code, "VNPay return leg was not accepted");
        return Err(ServiceError::InvalidInput(
            "Payment notification could not be processed".to_string(),
        ));
    }

    let raw_ref = params
        .get("vnp_TxnRef")
        .ok_or_else(|| ServiceError::InvalidInput("missing vnp_TxnRef".to_string()))?;
    let order_id = parse_correlation_id(PaymentProvider::VnPay, raw_ref)?;
    let order = state
        .orders
        .get(order_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
    Ok(Json(ApiResponse::success(PaymentStatusView::from_order(
        &order,
    ))))
}

pub fn payment_webhook_routes() -> Router<AppState> {
    Router::new()
        .route("/momo/ipn", post(momo_ipn))
        .route("/vnpay/ipn", get(vnpay_ipn))
        .route("/vnpay/return", get(vnpay_return))
}
