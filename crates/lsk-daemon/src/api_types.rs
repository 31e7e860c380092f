//! Request/response types for the HTTP surface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lsk_orders::LeaseOrder;
use lsk_payment::PaymentStatus;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// `unit` stays a raw string so an unknown unit surfaces as the domain's
/// invalid-duration error, not a body-deserialization rejection.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub resource_id: i64,
    pub unit: String,
    pub duration: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenewOrderRequest {
    pub unit: String,
    pub duration: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListOrdersQuery {
    /// `tenant` (default) or `owner`.
    pub role: Option<String>,
    pub status: Option<String>,
}

/// An order as the API renders it: the row plus derived display fields,
/// and — for the tenant of an `active` order — the decrypted credentials.
#[derive(Debug, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: LeaseOrder,
    pub order_no: String,
    pub total_cents: i64,
    pub remaining_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

impl OrderDetail {
    pub fn bare(order: LeaseOrder, now: DateTime<Utc>) -> Self {
        Self {
            order_no: order.order_no(),
            total_cents: order.total_cents(),
            remaining_minutes: order.remaining_minutes(now),
            login: None,
            secret: None,
            order,
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    pub order_id: i64,
    pub method: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentStatusResponse {
    pub status: PaymentStatus,
}

// ---------------------------------------------------------------------------
// Appeals
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAppealRequest {
    pub order_id: i64,
    pub category: String,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResolveAppealRequest {
    pub verdict: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListAppealsQuery {
    pub state: Option<String>,
}
