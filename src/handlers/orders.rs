use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    models::order::{Order, PaymentStatus},
    ApiResponse, AppState,
};

/// Status view returned after a hosted-payment redirect, so the storefront can
/// render a confirmation page without exposing the whole aggregate.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentStatusView {
    pub order_id: i64,
    pub status: String,
    pub message: String,
    pub transaction_id: Option<String>,
}

impl PaymentStatusView {
    pub fn from_order(order: &Order) -> Self {
        let message = match order.payment_status {
            PaymentStatus::Pending => "Payment is still pending.",
            PaymentStatus::Approved => "Payment completed successfully.",
            PaymentStatus::Rejected => "Payment was not completed.",
            PaymentStatus::Refunded => "Payment has been refunded.",
            PaymentStatus::Cancelled => "Order was cancelled.",
        };
        Self {
            order_id: order.id,
            status: order.payment_status.to_string(),
            message: message.to_string(),
            transaction_id: order.transaction_id.clone(),
        }
    }
}

/// Fetch an order by id
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "The order", body = ApiResponse<Order>),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Order>>, ServiceError> {
    let order = state
        .orders
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
    Ok(Json(ApiResponse::success(order)))
}

/// Fetch the payment status of an order
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}/payment-status",
    params(("id" = i64, Path, description = "Order id")),
    responses(
        (status = 200, description = "Current payment status", body = ApiResponse<PaymentStatusView>),
        (status = 404, description = "Unknown order", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
async fn get_payment_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<PaymentStatusView>>, ServiceError> {
    let order = state
        .orders
        .get(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", id)))?;
    Ok(Json(ApiResponse::success(PaymentStatusView::from_order(
        &order,
    ))))
}

pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_order))
        .route("/:id/payment-status", get(get_payment_status))
}
