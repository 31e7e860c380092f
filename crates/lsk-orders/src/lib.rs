//! lsk-orders
//!
//! The lease-order store, lifecycle state machine, and order engine.
//!
//! An order moves `awaiting-payment → active → closed` with side branches
//! to `cancelled` and through `disputed`; every write is an atomic
//! conditional update guarded by the transition table in [`status`]. Order
//! creation is serialized per (resource, tenant) by the lock service so
//! duplicate bookings cannot slip through the check-then-insert window.

mod engine;
mod error;
mod pricing;
mod status;
mod store;
mod types;

pub use engine::{DisputeHold, NoDisputes, OrderEngine, OrderEngineConfig};
pub use error::MarketError;
pub use pricing::{format_cents, parse_cents, quote, Quote};
pub use status::OrderStatus;
pub use store::{MemoryOrderStore, OrderStore};
pub use types::{Actor, DurationUnit, LeaseOrder, LeaseTerm, NewLeaseOrder, OrderRole};
