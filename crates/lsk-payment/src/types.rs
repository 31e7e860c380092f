//! Payment record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lsk_orders::MarketError;

// ---------------------------------------------------------------------------
// PayMethod
// ---------------------------------------------------------------------------

/// How the tenant settles. `gateway` goes through the external provider;
/// `manual` always lands on the hosted simulation page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayMethod {
    Gateway,
    Manual,
}

impl PayMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayMethod::Gateway => "gateway",
            PayMethod::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "gateway" => Ok(PayMethod::Gateway),
            "manual" => Ok(PayMethod::Manual),
            other => Err(MarketError::Validation(format!(
                "unsupported payment method: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Pending,
    /// Settled. Immutable afterwards except for a refund mark (refund
    /// accounting itself lives outside this engine).
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "success" => Ok(PaymentStatus::Success),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(MarketError::Validation(format!(
                "invalid payment status: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentRecord
// ---------------------------------------------------------------------------

/// One settlement attempt against an order. Created by payment-creation;
/// mutated only by reconciliation (webhook or poll), never by reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: i64,
    pub order_id: i64,
    pub method: PayMethod,
    pub amount_cents: i64,
    /// Our reference, unique per method; what the provider echoes back.
    pub txn_ref: String,
    /// The provider's own trade number, recorded on callback.
    pub provider_ref: Option<String>,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Insert payload; the store assigns the id and the record starts `pending`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub order_id: i64,
    pub method: PayMethod,
    pub amount_cents: i64,
    pub txn_ref: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RedirectTarget / PaymentIntent
// ---------------------------------------------------------------------------

/// Where the tenant goes to pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "kebab-case")]
pub enum RedirectTarget {
    /// Provider-issued checkout URL or form payload.
    Provider(String),
    /// Locally hosted simulation page — the explicit, logged fallback.
    HostedPage(String),
}

/// The result of payment creation: the (possibly pre-existing) record plus
/// its redirect target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub payment: PaymentRecord,
    pub redirect: RedirectTarget,
}
