//! Order persistence port and its in-memory implementation.
//!
//! The store is deliberately dumb: it owns rows and offers an atomic
//! conditional status update ([`OrderStore::transition`]). Which transitions
//! are legal is the engine's business; which write wins a race is decided
//! here, per row, atomically.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::error::MarketError;
use crate::status::OrderStatus;
use crate::types::{LeaseOrder, NewLeaseOrder};

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert in `awaiting-payment`; the store assigns the id.
    async fn insert(&self, new_order: NewLeaseOrder) -> Result<LeaseOrder, MarketError>;

    async fn get(&self, order_id: i64) -> Result<Option<LeaseOrder>, MarketError>;

    /// The at-most-one open order per (resource, tenant) lookup: any order
    /// in `awaiting-payment` or `active`.
    async fn find_open_for_pair(
        &self,
        resource_id: i64,
        tenant_uid: i64,
    ) -> Result<Option<LeaseOrder>, MarketError>;

    async fn list_for_tenant(
        &self,
        tenant_uid: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError>;

    async fn list_for_resources(
        &self,
        resource_ids: &[i64],
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError>;

    /// Atomic compare-and-set on status. Moves the row to `to` iff its
    /// current status is one of `allowed_from`, optionally stamping
    /// `actual_end_time`. Returns whether a row moved — a `false` means the
    /// caller lost a race and must treat the operation as rejected.
    async fn transition(
        &self,
        order_id: i64,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        actual_end_time: Option<DateTime<Utc>>,
    ) -> Result<bool, MarketError>;

    /// Renewal write: extend the window and add rent, guarded on `active`.
    async fn extend(
        &self,
        order_id: i64,
        new_end_time: DateTime<Utc>,
        added_rent_cents: i64,
    ) -> Result<bool, MarketError>;

    /// `active` orders whose window has elapsed.
    async fn select_expired(&self, now: DateTime<Utc>) -> Result<Vec<LeaseOrder>, MarketError>;

    /// `active` orders ending within `lookahead` of `now`.
    async fn select_expiring_within(
        &self,
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Result<Vec<LeaseOrder>, MarketError>;

    /// `awaiting-payment` orders created at or before `cutoff`.
    async fn select_stale_awaiting(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LeaseOrder>, MarketError>;
}

// ---------------------------------------------------------------------------
// MemoryOrderStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    next_id: i64,
    orders: BTreeMap<i64, LeaseOrder>,
}

/// In-memory store for tests and single-node runs. One mutex around the
/// map gives the same per-row atomicity the SQL implementation gets from
/// conditional updates.
#[derive(Default)]
pub struct MemoryOrderStore {
    inner: Mutex<Inner>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, new_order: NewLeaseOrder) -> Result<LeaseOrder, MarketError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let order = LeaseOrder {
            id: inner.next_id,
            resource_id: new_order.resource_id,
            tenant_uid: new_order.tenant_uid,
            start_time: new_order.start_time,
            end_time: new_order.end_time,
            actual_end_time: None,
            rent_cents: new_order.rent_cents,
            deposit_cents: new_order.deposit_cents,
            status: OrderStatus::AwaitingPayment,
            created_at: new_order.created_at,
            updated_at: new_order.created_at,
        };
        inner.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn get(&self, order_id: i64) -> Result<Option<LeaseOrder>, MarketError> {
        Ok(self.inner.lock().await.orders.get(&order_id).cloned())
    }

    async fn find_open_for_pair(
        &self,
        resource_id: i64,
        tenant_uid: i64,
    ) -> Result<Option<LeaseOrder>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .find(|o| {
                o.resource_id == resource_id
                    && o.tenant_uid == tenant_uid
                    && matches!(
                        o.status,
                        OrderStatus::AwaitingPayment | OrderStatus::Active
                    )
            })
            .cloned())
    }

    async fn list_for_tenant(
        &self,
        tenant_uid: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.tenant_uid == tenant_uid && status.map_or(true, |s| o.status == s))
            .cloned()
            .collect())
    }

    async fn list_for_resources(
        &self,
        resource_ids: &[i64],
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .filter(|o| {
                resource_ids.contains(&o.resource_id) && status.map_or(true, |s| o.status == s)
            })
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        order_id: i64,
        allowed_from: &[OrderStatus],
        to: OrderStatus,
        actual_end_time: Option<DateTime<Utc>>,
    ) -> Result<bool, MarketError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if !allowed_from.contains(&order.status) {
            return Ok(false);
        }
        order.status = to;
        if actual_end_time.is_some() {
            order.actual_end_time = actual_end_time;
        }
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn extend(
        &self,
        order_id: i64,
        new_end_time: DateTime<Utc>,
        added_rent_cents: i64,
    ) -> Result<bool, MarketError> {
        let mut inner = self.inner.lock().await;
        let Some(order) = inner.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if order.status != OrderStatus::Active {
            return Ok(false);
        }
        order.end_time = new_end_time;
        order.rent_cents += added_rent_cents;
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn select_expired(&self, now: DateTime<Utc>) -> Result<Vec<LeaseOrder>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::Active && o.end_time <= now)
            .cloned()
            .collect())
    }

    async fn select_expiring_within(
        &self,
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        let horizon = now + lookahead;
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .filter(|o| {
                o.status == OrderStatus::Active && o.end_time >= now && o.end_time <= horizon
            })
            .cloned()
            .collect())
    }

    async fn select_stale_awaiting(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::AwaitingPayment && o.created_at <= cutoff)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn new_order(resource_id: i64, tenant_uid: i64) -> NewLeaseOrder {
        let now = Utc::now();
        NewLeaseOrder {
            resource_id,
            tenant_uid,
            start_time: now,
            end_time: now + Duration::hours(1),
            rent_cents: 1000,
            deposit_cents: 500,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_awaiting_status() {
        let store = MemoryOrderStore::new();
        let a = store.insert(new_order(1, 2)).await.unwrap();
        let b = store.insert(new_order(1, 3)).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.status, OrderStatus::AwaitingPayment);
    }

    #[tokio::test]
    async fn transition_is_a_guarded_cas() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(1, 2)).await.unwrap();

        // Wrong source state: no-op.
        let moved = store
            .transition(order.id, &[OrderStatus::Active], OrderStatus::Closed, None)
            .await
            .unwrap();
        assert!(!moved);
        assert_eq!(
            store.get(order.id).await.unwrap().unwrap().status,
            OrderStatus::AwaitingPayment
        );

        // Right source state: moves exactly once.
        let moved = store
            .transition(
                order.id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Active,
                None,
            )
            .await
            .unwrap();
        assert!(moved);
        let moved_again = store
            .transition(
                order.id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Active,
                None,
            )
            .await
            .unwrap();
        assert!(!moved_again, "second CAS must lose");
    }

    #[tokio::test]
    async fn transition_on_missing_order_is_false() {
        let store = MemoryOrderStore::new();
        let moved = store
            .transition(99, &[OrderStatus::Active], OrderStatus::Closed, None)
            .await
            .unwrap();
        assert!(!moved);
    }

    #[tokio::test]
    async fn find_open_for_pair_sees_awaiting_and_active_only() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(7, 8)).await.unwrap();
        assert!(store.find_open_for_pair(7, 8).await.unwrap().is_some());

        store
            .transition(
                order.id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Cancelled,
                None,
            )
            .await
            .unwrap();
        assert!(store.find_open_for_pair(7, 8).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn extend_requires_active() {
        let store = MemoryOrderStore::new();
        let order = store.insert(new_order(1, 2)).await.unwrap();
        let new_end = order.end_time + Duration::hours(1);

        assert!(!store.extend(order.id, new_end, 1000).await.unwrap());

        store
            .transition(
                order.id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Active,
                None,
            )
            .await
            .unwrap();
        assert!(store.extend(order.id, new_end, 1000).await.unwrap());

        let after = store.get(order.id).await.unwrap().unwrap();
        assert_eq!(after.end_time, new_end);
        assert_eq!(after.rent_cents, 2000);
    }

    #[tokio::test]
    async fn sweep_selections_filter_by_status_and_window() {
        let store = MemoryOrderStore::new();
        let now = Utc::now();

        // Active, already expired.
        let expired = store.insert(new_order(1, 2)).await.unwrap();
        store
            .transition(
                expired.id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Active,
                None,
            )
            .await
            .unwrap();

        // Awaiting, created 31 minutes ago.
        let stale = store
            .insert(NewLeaseOrder {
                created_at: now - Duration::minutes(31),
                ..new_order(2, 3)
            })
            .await
            .unwrap();

        let later = now + Duration::hours(2);
        let due = store.select_expired(later).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, expired.id);

        let stale_rows = store
            .select_stale_awaiting(now - Duration::minutes(30))
            .await
            .unwrap();
        assert_eq!(stale_rows.len(), 1);
        assert_eq!(stale_rows[0].id, stale.id);

        // Reminder window: ends within 5 minutes of (end - 3min).
        let close_to_end = expired.end_time - Duration::minutes(3);
        let expiring = store
            .select_expiring_within(close_to_end, Duration::minutes(5))
            .await
            .unwrap();
        assert_eq!(expiring.len(), 1);
    }
}
