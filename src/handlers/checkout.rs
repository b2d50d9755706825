use actix_web::web::{Data, Json};
use actix_web::{post, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use validator::Validate;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::models::checkout::{CheckoutPayload, CheckoutRequest, QuoteRequest};
use crate::models::common::ApiResponse;
use crate::services::cart::{calculate_expanded_cart_pricing_with, expand_bundles_for_checkout};
use crate::services::checkout::prepare_checkout_data_at;
use crate::services::orders::{OrderConfirmation, OrderServiceClient};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub order: OrderConfirmation,
    pub payload: CheckoutPayload,
}

// POST /checkout/quote
#[post("/checkout/quote")]
pub async fn quote_cart(
    app: Data<AppConfig>,
    payload: Json<QuoteRequest>,
) -> Result<HttpResponse, AppError> {
    let expanded = expand_bundles_for_checkout(&payload.cart);
    let pricing = calculate_expanded_cart_pricing_with(&expanded, &app.pricing_policy());

    Ok(HttpResponse::Ok().json(ApiResponse::success(pricing)))
}

// POST /checkout
#[post("/checkout")]
pub async fn submit_checkout(
    app: Data<AppConfig>,
    orders: Data<OrderServiceClient>,
    payload: Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let request = payload.into_inner();
    if request.cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }
    request.form_data.validate()?;

    let checkout = prepare_checkout_data_at(
        &request.cart,
        &request.form_data,
        &request.user,
        &app.checkout_options(),
        Utc::now(),
    );

    let order = orders
        .submit_order(&checkout)
        .await
        .map_err(|e| AppError::OrderService(e.to_string()))?;

    Ok(HttpResponse::Created().json(ApiResponse::success(CheckoutResponse {
        order,
        payload: checkout,
    })))
}
