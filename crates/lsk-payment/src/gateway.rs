//! Payment-gateway abstraction and the HTTP provider client.
//!
//! The engine only ever sees the [`PaymentGateway`] trait. The HTTP client
//! carries a hard timeout; any failure — transport, protocol, or absent
//! configuration — degrades to the hosted simulation page at the engine
//! layer, never blocks a request indefinitely, and never fails payment
//! creation.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::PaymentStatus;
use lsk_orders::format_cents;

// ---------------------------------------------------------------------------
// Provider wire vocabulary
// ---------------------------------------------------------------------------

pub const TRADE_SUCCESS: &str = "trade-success";
pub const TRADE_FINISHED: &str = "trade-finished";
pub const TRADE_CLOSED: &str = "trade-closed";
pub const WAIT_BUYER_PAY: &str = "wait-buyer-pay";

/// Callback / query parameter names.
pub const PARAM_REFERENCE: &str = "reference";
pub const PARAM_PROVIDER_TXN: &str = "provider_txn";
pub const PARAM_TRADE_STATUS: &str = "trade_status";
pub const PARAM_TOTAL_AMOUNT: &str = "total_amount";

/// Map the provider's status vocabulary onto ours. Anything unrecognized
/// is treated as still pending — the provider retries terminal statuses.
pub fn map_provider_status(provider_status: &str) -> PaymentStatus {
    match provider_status {
        TRADE_SUCCESS | TRADE_FINISHED => PaymentStatus::Success,
        TRADE_CLOSED => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// No provider configured for this deployment.
    NotConfigured,
    /// Transport failure or timeout.
    Unavailable(String),
    /// The provider answered, but not with anything we can use.
    Protocol(String),
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayError::NotConfigured => write!(f, "payment gateway not configured"),
            GatewayError::Unavailable(msg) => write!(f, "payment gateway unavailable: {msg}"),
            GatewayError::Protocol(msg) => write!(f, "payment gateway protocol error: {msg}"),
        }
    }
}

impl std::error::Error for GatewayError {}

// ---------------------------------------------------------------------------
// PaymentGateway
// ---------------------------------------------------------------------------

/// Outbound request to open a checkout with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayRequest {
    pub reference: String,
    pub amount_cents: i64,
    pub subject: String,
    pub notify_url: String,
    pub return_url: String,
}

/// The provider contract the engine consumes: open a checkout, poll a
/// status. The inbound webhook arrives over HTTP and is handled by the
/// engine directly.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns the redirect/display target for the checkout.
    async fn pay(&self, req: &GatewayPayRequest) -> Result<String, GatewayError>;

    /// Returns the provider's status vocabulary for a reference.
    async fn query(&self, reference: &str) -> Result<String, GatewayError>;
}

/// Gateway for deployments without provider credentials: every call fails
/// with `NotConfigured`, which the engine degrades to the hosted page.
pub struct UnconfiguredGateway;

#[async_trait]
impl PaymentGateway for UnconfiguredGateway {
    async fn pay(&self, _req: &GatewayPayRequest) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }

    async fn query(&self, _reference: &str) -> Result<String, GatewayError> {
        Err(GatewayError::NotConfigured)
    }
}

// ---------------------------------------------------------------------------
// HttpGateway
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpGatewayConfig {
    /// Provider API base, e.g. `https://pay.example.com`.
    pub endpoint: String,
    pub app_id: String,
    pub timeout: Duration,
}

/// Provider client over HTTP. Amounts cross the wire as decimal strings;
/// everything internal stays integer cents.
pub struct HttpGateway {
    http: reqwest::Client,
    cfg: HttpGatewayConfig,
}

impl HttpGateway {
    pub fn new(cfg: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;
        Ok(Self { http, cfg })
    }
}

#[derive(Serialize)]
struct PayBody<'a> {
    app_id: &'a str,
    reference: &'a str,
    amount: String,
    subject: &'a str,
    notify_url: &'a str,
    return_url: &'a str,
}

#[derive(Deserialize)]
struct PayReply {
    redirect: String,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    app_id: &'a str,
    reference: &'a str,
}

#[derive(Deserialize)]
struct QueryReply {
    status: String,
}

#[async_trait]
impl PaymentGateway for HttpGateway {
    async fn pay(&self, req: &GatewayPayRequest) -> Result<String, GatewayError> {
        let url = format!("{}/v1/pay", self.cfg.endpoint);
        let resp = self
            .http
            .post(&url)
            .json(&PayBody {
                app_id: &self.cfg.app_id,
                reference: &req.reference,
                amount: format_cents(req.amount_cents),
                subject: &req.subject,
                notify_url: &req.notify_url,
                return_url: &req.return_url,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Protocol(format!(
                "pay returned {}",
                resp.status()
            )));
        }
        let reply: PayReply = resp
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        Ok(reply.redirect)
    }

    async fn query(&self, reference: &str) -> Result<String, GatewayError> {
        let url = format!("{}/v1/query", self.cfg.endpoint);
        let resp = self
            .http
            .post(&url)
            .json(&QueryBody {
                app_id: &self.cfg.app_id,
                reference,
            })
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(GatewayError::Protocol(format!(
                "query returned {}",
                resp.status()
            )));
        }
        let reply: QueryReply = resp
            .json()
            .await
            .map_err(|e| GatewayError::Protocol(e.to_string()))?;
        Ok(reply.status)
    }
}
