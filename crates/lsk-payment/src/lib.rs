//! lsk-payment
//!
//! The payment-settlement engine: `PaymentRecord` lifecycle, gateway-call
//! abstraction, webhook ingestion with signature verification, and the
//! poll fallback. Reconciliation is idempotent end to end — the CAS on the
//! payment row makes duplicate webhook deliveries and webhook/poll races
//! single-winner by construction.

mod engine;
mod gateway;
pub mod signature;
mod store;
mod types;

pub use engine::{PaymentEngine, PaymentEngineConfig};
pub use gateway::{
    map_provider_status, GatewayError, GatewayPayRequest, HttpGateway, HttpGatewayConfig,
    PaymentGateway, UnconfiguredGateway, PARAM_PROVIDER_TXN, PARAM_REFERENCE, PARAM_TOTAL_AMOUNT,
    PARAM_TRADE_STATUS, TRADE_CLOSED, TRADE_FINISHED, TRADE_SUCCESS, WAIT_BUYER_PAY,
};
pub use store::{MemoryPaymentStore, PaymentStore};
pub use types::{
    NewPayment, PayMethod, PaymentIntent, PaymentRecord, PaymentStatus, RedirectTarget,
};
