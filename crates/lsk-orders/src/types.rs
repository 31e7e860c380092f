//! Core order types and the explicit request identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MarketError;
use crate::status::OrderStatus;

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// The identity a request acts as, threaded explicitly through every core
/// call. There is no ambient per-request identity anywhere in the engine;
/// the HTTP layer materializes this once and passes it down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub uid: i64,
    /// Resolver privilege for dispute adjudication.
    pub operator: bool,
}

impl Actor {
    pub fn user(uid: i64) -> Self {
        Self {
            uid,
            operator: false,
        }
    }

    pub fn operator(uid: i64) -> Self {
        Self {
            uid,
            operator: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Lease term
// ---------------------------------------------------------------------------

/// How the tenant expresses the lease length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DurationUnit {
    Minute,
    Hour,
    /// Fixed block ending 08:00 the next day; `duration` is ignored.
    Overnight,
}

impl DurationUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationUnit::Minute => "minute",
            DurationUnit::Hour => "hour",
            DurationUnit::Overnight => "overnight",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "minute" => Ok(DurationUnit::Minute),
            "hour" => Ok(DurationUnit::Hour),
            "overnight" => Ok(DurationUnit::Overnight),
            other => Err(MarketError::InvalidDuration(format!(
                "unknown duration unit: {other}"
            ))),
        }
    }
}

/// A requested lease length: `duration` counts of `unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseTerm {
    pub unit: DurationUnit,
    pub duration: i64,
}

impl LeaseTerm {
    pub fn minutes(duration: i64) -> Self {
        Self {
            unit: DurationUnit::Minute,
            duration,
        }
    }

    pub fn hours(duration: i64) -> Self {
        Self {
            unit: DurationUnit::Hour,
            duration,
        }
    }

    pub fn overnight() -> Self {
        Self {
            unit: DurationUnit::Overnight,
            duration: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// LeaseOrder
// ---------------------------------------------------------------------------

/// A time-boxed grant of exclusive use of a resource to a tenant.
/// Never deleted; only status-terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseOrder {
    pub id: i64,
    pub resource_id: i64,
    pub tenant_uid: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Set when the order leaves `active` via return, expiry, or resolution.
    pub actual_end_time: Option<DateTime<Utc>>,
    pub rent_cents: i64,
    pub deposit_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeaseOrder {
    /// Display order number shown to users.
    pub fn order_no(&self) -> String {
        format!("ORD{:010}", self.id)
    }

    /// What the tenant is charged: rent plus deposit.
    pub fn total_cents(&self) -> i64 {
        self.rent_cents + self.deposit_cents
    }

    /// Minutes left on an `active` lease, `None` otherwise.
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.status != OrderStatus::Active {
            return None;
        }
        Some((self.end_time - now).num_minutes().max(0))
    }
}

/// Insert payload; the store assigns the id and the order starts in
/// `awaiting-payment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLeaseOrder {
    pub resource_id: i64,
    pub tenant_uid: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub rent_cents: i64,
    pub deposit_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// Which side of the marketplace a listing query looks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OrderRole {
    Tenant,
    Owner,
}

impl OrderRole {
    pub fn parse(s: &str) -> Result<Self, MarketError> {
        match s {
            "tenant" => Ok(OrderRole::Tenant),
            "owner" => Ok(OrderRole::Owner),
            other => Err(MarketError::Validation(format!(
                "invalid order role: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn order_no_is_zero_padded() {
        let order = sample(42);
        assert_eq!(order.order_no(), "ORD0000000042");
    }

    #[test]
    fn remaining_minutes_only_for_active() {
        let mut order = sample(1);
        let now = order.start_time;
        assert_eq!(order.remaining_minutes(now), Some(120));

        order.status = OrderStatus::Closed;
        assert_eq!(order.remaining_minutes(now), None);
    }

    #[test]
    fn remaining_minutes_clamps_at_zero() {
        let order = sample(1);
        let after_end = order.end_time + chrono::Duration::minutes(5);
        assert_eq!(order.remaining_minutes(after_end), Some(0));
    }

    fn sample(id: i64) -> LeaseOrder {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        LeaseOrder {
            id,
            resource_id: 1,
            tenant_uid: 2,
            start_time: start,
            end_time: start + chrono::Duration::hours(2),
            actual_end_time: None,
            rent_cents: 2000,
            deposit_cents: 1000,
            status: OrderStatus::Active,
            created_at: start,
            updated_at: start,
        }
    }
}
