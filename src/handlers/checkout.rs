use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    services::checkout::{AuthContext, CheckoutOutcome, CheckoutRequest},
    ApiResponse, AppState,
};

/// Checkout submission: the session whose cart is being converted plus the
/// shopper's form input. A `user_id` marks the order as authenticated.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutSubmission {
    pub session_id: String,
    pub user_id: Option<String>,
    #[serde(flatten)]
    pub form: CheckoutRequest,
}

/// Convert the session cart into an order and initiate payment
#[utoipa::path(
    post,
    path = "/api/v1/checkout",
    request_body = CheckoutSubmission,
    responses(
        (status = 200, description = "Checkout outcome", body = ApiResponse<CheckoutOutcome>),
        (status = 400, description = "Validation failure or empty cart", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
async fn submit_checkout(
    State(state): State<AppState>,
    Json(submission): Json<CheckoutSubmission>,
) -> Result<Json<ApiResponse<CheckoutOutcome>>, ServiceError> {
    let auth = submission.user_id.map(|user_id| AuthContext { user_id });
    let outcome = state
        .checkout_service
        .checkout(&submission.session_id, submission.form, auth)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(submit_checkout))
}
