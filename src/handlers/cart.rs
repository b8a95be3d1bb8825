use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{errors::ServiceError, models::cart::Cart, ApiResponse, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: i64,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    #[serde(default)]
    pub selected_options: String,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemParams {
    #[serde(default)]
    pub selected_options: String,
}

/// Add an item to the session cart (price frozen at this moment)
#[utoipa::path(
    post,
    path = "/api/v1/carts/{session}/items",
    params(("session" = String, Path, description = "Cart session id")),
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<Cart>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "Carts"
)]
async fn add_item(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Json<ApiResponse<Cart>>, ServiceError> {
    let cart = state
        .cart_service
        .add_item(&session, request.product_id, request.quantity, &request.selected_options)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Set the quantity of a cart line
#[utoipa::path(
    put,
    path = "/api/v1/carts/{session}/items/{product_id}",
    params(
        ("session" = String, Path, description = "Cart session id"),
        ("product_id" = i64, Path, description = "Product id")
    ),
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<Cart>),
        (status = 404, description = "Line not in cart", body = crate::errors::ErrorResponse)
    ),
    tag = "Carts"
)]
async fn update_item(
    State(state): State<AppState>,
    Path((session, product_id)): Path<(String, i64)>,
    Json(request): Json<UpdateQuantityRequest>,
) -> Result<Json<ApiResponse<Cart>>, ServiceError> {
    let cart = state
        .cart_service
        .update_quantity(&session, product_id, request.quantity)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Remove a cart line (all variants when no options are given)
#[utoipa::path(
    delete,
    path = "/api/v1/carts/{session}/items/{product_id}",
    params(
        ("session" = String, Path, description = "Cart session id"),
        ("product_id" = i64, Path, description = "Product id"),
        ("selected_options" = Option<String>, Query, description = "Options string of the line to remove")
    ),
    responses((status = 200, description = "Updated cart", body = ApiResponse<Cart>)),
    tag = "Carts"
)]
async fn remove_item(
    State(state): State<AppState>,
    Path((session, product_id)): Path<(String, i64)>,
    Query(params): Query<RemoveItemParams>,
) -> Result<Json<ApiResponse<Cart>>, ServiceError> {
    let cart = state
        .cart_service
        .remove_item(&session, product_id, &params.selected_options)
        .await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Fetch the session cart
#[utoipa::path(
    get,
    path = "/api/v1/carts/{session}",
    params(("session" = String, Path, description = "Cart session id")),
    responses((status = 200, description = "Current cart", body = ApiResponse<Cart>)),
    tag = "Carts"
)]
async fn get_cart(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<ApiResponse<Cart>>, ServiceError> {
    let cart = state.cart_service.get(&session).await?;
    Ok(Json(ApiResponse::success(cart)))
}

/// Total quantity across the cart, for badge rendering
#[utoipa::path(
    get,
    path = "/api/v1/carts/{session}/count",
    params(("session" = String, Path, description = "Cart session id")),
    responses((status = 200, description = "Item count", body = ApiResponse<i32>)),
    tag = "Carts"
)]
async fn cart_count(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<ApiResponse<i32>>, ServiceError> {
    let count = state.cart_service.count(&session).await?;
    Ok(Json(ApiResponse::success(count)))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/:session", get(get_cart))
        .route("/:session/count", get(cart_count))
        .route("/:session/items", post(add_item))
        .route(
            "/:session/items/:product_id",
            put(update_item).delete(remove_item),
        )
}
