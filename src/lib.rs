//! Checkout API Library
//!
//! Cart, checkout, and payment-gateway orchestration for the storefront:
//! session carts, order aggregation, signed MoMo/VNPay initiation, and
//! idempotent callback settlement.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod services;

use std::sync::Arc;

use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::ToSchema;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    repositories::{CartStore, OrderRepository, ProductLookup},
    services::{
        cart::CartService,
        checkout::CheckoutService,
        payments::{callbacks::CallbackVerifier, PaymentProcessor},
    },
};

/// Shared handler state. Repositories stay behind trait objects so tests can
/// swap in their own backends.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub orders: Arc<dyn OrderRepository>,
    pub carts: Arc<dyn CartStore>,
    pub cart_service: Arc<CartService>,
    pub checkout_service: Arc<CheckoutService>,
    pub callback_verifier: Arc<CallbackVerifier>,
}

impl AppState {
    /// Wires the service graph on top of the supplied repositories.
    pub fn build(
        config: AppConfig,
        events: EventSender,
        orders: Arc<dyn OrderRepository>,
        carts: Arc<dyn CartStore>,
        products: Arc<dyn ProductLookup>,
    ) -> Result<Self, ServiceError> {
        let payments = Arc::new(PaymentProcessor::new(
            &config,
            orders.clone(),
            events.clone(),
        )?);
        let cart_service = Arc::new(CartService::new(carts.clone(), products));
        let checkout_service = Arc::new(CheckoutService::new(
            carts.clone(),
            orders.clone(),
            payments,
            events.clone(),
            config.callback_base_url.clone(),
        ));
        let callback_verifier = Arc::new(CallbackVerifier::new(
            orders.clone(),
            config.momo.clone(),
            config.vnpay.clone(),
            events,
        ));

        Ok(Self {
            config,
            orders,
            carts,
            cart_service,
            checkout_service,
            callback_verifier,
        })
    }
}

/// Standard success envelope for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Builds the full application router.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/carts", handlers::cart::cart_routes())
        .nest("/api/v1/checkout", handlers::checkout::checkout_routes())
        .nest("/api/v1/orders", handlers::orders::order_routes())
        .nest(
            "/api/v1/payments",
            handlers::payment_webhooks::payment_webhook_routes(),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
