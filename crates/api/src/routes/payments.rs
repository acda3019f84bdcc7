//! Payment routes: gateway order creation, checkout verification and
//! the capture webhook.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{OrderId, PaymentMethod};

use crate::db;
use crate::error::{ApiError, Result};
use crate::middleware::RequireUser;
use crate::models::Order;
use crate::services::payments::{PaymentsClient, WebhookEvent};
use crate::state::AppState;

/// Webhook event name for a captured payment.
const PAYMENT_CAPTURED: &str = "payment.captured";

/// Request body for opening a gateway order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub order_id: OrderId,
}

/// Response for an opened gateway order: everything the checkout
/// widget needs.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
}

/// Request body for verifying a checkout callback.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub order_id: OrderId,
    pub gateway_order_id: String,
    pub gateway_payment_id: String,
    pub signature: String,
}

/// Response once an order is confirmed paid.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    pub order_id: OrderId,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<&Order> for PaymentStatusResponse {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            is_paid: order.is_paid,
            paid_at: order.paid_at,
        }
    }
}

fn gateway(state: &AppState) -> Result<&PaymentsClient> {
    state.payments().ok_or_else(|| {
        ApiError::ServiceUnavailable("Payment gateway is not configured".to_owned())
    })
}

/// Load an order for a payment operation, enforcing ownership.
async fn owned_order(state: &AppState, user_id: marigold_core::UserId, id: OrderId) -> Result<Order> {
    let order = db::orders::get(state.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order"))?;

    if order.user_id != user_id {
        return Err(ApiError::Forbidden(
            "You do not have access to this order".to_owned(),
        ));
    }

    Ok(order)
}

/// POST /api/payments/order
///
/// Opens a gateway order for an unpaid online order and stores the
/// gateway id on the row for webhook correlation.
///
/// # Errors
///
/// Returns 404/403 for missing or foreign orders, 409 for orders that
/// are not payable online or already paid, and 502 when the gateway
/// refuses.
pub async fn create_order(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentResponse>)> {
    let client = gateway(&state)?;
    let order = owned_order(&state, user.id, req.order_id).await?;

    if order.payment_method != PaymentMethod::Online {
        return Err(ApiError::InvalidState(
            "Order is not payable online".to_owned(),
        ));
    }
    if order.is_paid {
        return Err(ApiError::InvalidState("Order is already paid".to_owned()));
    }

    let gateway_order = client.create_order(order.total_price).await?;
    db::orders::set_gateway_order(state.pool(), order.id, &gateway_order.id).await?;

    tracing::info!(
        order_id = %order.id,
        gateway_order_id = %gateway_order.id,
        "gateway order opened"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentResponse {
            gateway_order_id: gateway_order.id,
            amount: gateway_order.amount,
            currency: gateway_order.currency,
            key_id: client.key_id().to_owned(),
        }),
    ))
}

/// POST /api/payments/verify
///
/// Confirms a checkout callback: the HMAC signature must match and the
/// gateway order must be the one opened for this order.
///
/// # Errors
///
/// Returns 400 for signature or correlation mismatches.
pub async fn verify(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<PaymentStatusResponse>> {
    let client = gateway(&state)?;
    let order = owned_order(&state, user.id, req.order_id).await?;

    if order.gateway_order_id.as_deref() != Some(req.gateway_order_id.as_str()) {
        return Err(ApiError::InvalidRequest(
            "Payment does not match this order".to_owned(),
        ));
    }

    if !client.verify_payment_signature(
        &req.gateway_order_id,
        &req.gateway_payment_id,
        &req.signature,
    ) {
        return Err(ApiError::InvalidRequest(
            "Invalid payment signature".to_owned(),
        ));
    }

    let order = db::orders::mark_paid(state.pool(), order.id).await?;

    tracing::info!(order_id = %order.id, "payment verified");

    Ok(Json(PaymentStatusResponse::from(&order)))
}

/// POST /api/payments/webhook
///
/// Gateway-to-server notification. The signature covers the raw body;
/// only `payment.captured` changes state, everything else is
/// acknowledged and dropped.
///
/// # Errors
///
/// Returns 400 for bad signatures or unparseable payloads.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode> {
    let client = gateway(&state)?;

    let signature = headers
        .get("X-Razorpay-Signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::InvalidRequest("Missing webhook signature".to_owned()))?;

    if !client.verify_webhook_signature(&body, signature) {
        return Err(ApiError::InvalidRequest(
            "Invalid webhook signature".to_owned(),
        ));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|_| ApiError::InvalidRequest("Malformed webhook payload".to_owned()))?;

    if event.event == PAYMENT_CAPTURED {
        let gateway_order_id = event
            .payload
            .payment
            .and_then(|payment| payment.entity.order_id);

        if let Some(gateway_order_id) = gateway_order_id {
            match db::orders::mark_paid_by_gateway(state.pool(), &gateway_order_id).await? {
                Some(order) => {
                    tracing::info!(order_id = %order.id, "payment captured via webhook");
                }
                None => {
                    tracing::warn!(
                        gateway_order_id = %gateway_order_id,
                        "webhook for unknown gateway order"
                    );
                }
            }
        }
    }

    Ok(StatusCode::OK)
}
