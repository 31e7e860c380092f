//! Lease-order lifecycle states and the legal-transition table.
//!
//! ```text
//!                    activate                 return / expire
//!   create ──► awaiting-payment ──► active ─────────────────► closed (term.)
//!                    │                 │  │
//!             cancel │          cancel │  │ dispute-open
//!                    ▼                 ▼  ▼
//!               cancelled (term.)  cancelled   disputed ──► closed (term.)
//!                                   (term.)      dispute-resolve
//! ```
//!
//! `disputed` is re-entrant only through resolution; there is no re-open.
//! Every status write in the store is an atomic conditional update guarded
//! by this table — a transition either observes its required source state
//! or it no-ops, so a sweep racing a user action simply loses.

use serde::{Deserialize, Serialize};

use crate::error::MarketError;

/// All valid states of a [`LeaseOrder`][crate::types::LeaseOrder].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    /// Created; payment not yet settled. The resource stays `listed` so an
    /// unpaid order never occupies it.
    AwaitingPayment,
    /// Paid; the lease window is running and the resource is `in-use`.
    Active,
    /// An unresolved appeal forced the order out of `active`.
    Disputed,
    /// Returned, expired, or resolved. **Terminal.**
    Closed,
    /// Abandoned before or during use. **Terminal.**
    Cancelled,
}

impl OrderStatus {
    /// Returns `true` if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Closed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting-payment",
            OrderStatus::Active => "active",
            OrderStatus::Disputed => "disputed",
            OrderStatus::Closed => "closed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "awaiting-payment" => Ok(OrderStatus::AwaitingPayment),
            "active" => Ok(OrderStatus::Active),
            "disputed" => Ok(OrderStatus::Disputed),
            "closed" => Ok(OrderStatus::Closed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(MarketError::Validation(format!(
                "invalid order status: {other}"
            ))),
        }
    }

    /// The legal-transition table. Everything not listed here is illegal.
    pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (from, to),
            (AwaitingPayment, Active)
                | (AwaitingPayment, Cancelled)
                | (Active, Closed)
                | (Active, Cancelled)
                | (Active, Disputed)
                | (Disputed, Closed)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::{self, *};

    const ALL: [OrderStatus; 5] = [AwaitingPayment, Active, Disputed, Closed, Cancelled];

    /// The full 5×5 matrix: exactly the six edges of the lifecycle graph
    /// are legal, nothing else.
    #[test]
    fn transition_table_is_complete() {
        let legal = [
            (AwaitingPayment, Active),
            (AwaitingPayment, Cancelled),
            (Active, Closed),
            (Active, Cancelled),
            (Active, Disputed),
            (Disputed, Closed),
        ];

        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    OrderStatus::can_transition(from, to),
                    expected,
                    "{from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in [Closed, Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!OrderStatus::can_transition(from, to));
            }
        }
    }

    #[test]
    fn disputed_cannot_reopen() {
        assert!(!OrderStatus::can_transition(Disputed, Active));
        assert!(!OrderStatus::can_transition(Disputed, Disputed));
        assert!(!OrderStatus::can_transition(Disputed, Cancelled));
    }

    #[test]
    fn status_round_trips() {
        for s in ALL {
            assert_eq!(OrderStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(OrderStatus::parse("paying").is_err());
    }
}
