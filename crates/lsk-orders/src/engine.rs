//! The order engine — every lifecycle operation on a lease order.
//!
//! # Concurrency
//!
//! Entry points are safe under concurrent invocation. Two units of mutual
//! exclusion, no global lock:
//!
//! - the **create lock** (`order:create:{resource}:{tenant}`) serializes
//!   order creation per pair, closing the TOCTOU window between the
//!   "no open order" check and the insert;
//! - the **per-order CAS** at the store totally orders transitions within
//!   one order — a sweep racing a user action loses gracefully (its status
//!   guard fails and the branch no-ops).
//!
//! The availability flag is owned exclusively by this engine.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use lsk_directory::{Availability, ResourceDirectory, ResourceRecord};
use lsk_lock::{acquire_with_wait, order_create_key, LockService};
use tracing::{info, warn};

use crate::error::MarketError;
use crate::pricing::quote;
use crate::status::OrderStatus;
use crate::store::OrderStore;
use crate::types::{Actor, LeaseOrder, LeaseTerm, NewLeaseOrder, OrderRole};

// ---------------------------------------------------------------------------
// DisputeHold
// ---------------------------------------------------------------------------

/// What the engine needs to know from the dispute module: whether a closure
/// may relist the resource. The dispute crate implements this; the engine
/// never looks inside it (dependency inversion — no cross-module
/// type poking).
#[async_trait]
pub trait DisputeHold: Send + Sync {
    /// True when an unresolved appeal exists for the order.
    async fn has_unresolved_appeal(&self, order_id: i64) -> Result<bool, MarketError>;
}

/// Hold implementation for wirings without a dispute module: nothing is
/// ever held.
pub struct NoDisputes;

#[async_trait]
impl DisputeHold for NoDisputes {
    async fn has_unresolved_appeal(&self, _order_id: i64) -> Result<bool, MarketError> {
        Ok(false)
    }
}

// ---------------------------------------------------------------------------
// OrderEngine
// ---------------------------------------------------------------------------

/// Lock window parameters for the create critical section.
#[derive(Debug, Clone, Copy)]
pub struct OrderEngineConfig {
    pub lock_wait: std::time::Duration,
    pub lock_ttl: std::time::Duration,
}

impl Default for OrderEngineConfig {
    fn default() -> Self {
        Self {
            lock_wait: std::time::Duration::from_secs(3),
            lock_ttl: std::time::Duration::from_secs(10),
        }
    }
}

pub struct OrderEngine {
    store: Arc<dyn OrderStore>,
    directory: Arc<dyn ResourceDirectory>,
    locks: Arc<dyn LockService>,
    dispute_hold: Arc<dyn DisputeHold>,
    config: OrderEngineConfig,
}

impl OrderEngine {
    pub fn new(
        store: Arc<dyn OrderStore>,
        directory: Arc<dyn ResourceDirectory>,
        locks: Arc<dyn LockService>,
        dispute_hold: Arc<dyn DisputeHold>,
        config: OrderEngineConfig,
    ) -> Self {
        Self {
            store,
            directory,
            locks,
            dispute_hold,
            config,
        }
    }

    // -- create --------------------------------------------------------------

    /// Create a lease order for `resource_id` on behalf of `actor`.
    ///
    /// The entire validation+write runs inside the create lock. The resource
    /// stays `listed` until payment succeeds, so an unpaid order never
    /// occupies it.
    pub async fn create(
        &self,
        actor: Actor,
        resource_id: i64,
        term: LeaseTerm,
    ) -> Result<LeaseOrder, MarketError> {
        let key = order_create_key(resource_id, actor.uid);
        let guard = acquire_with_wait(
            Arc::clone(&self.locks),
            &key,
            self.config.lock_wait,
            self.config.lock_ttl,
        )
        .await?;

        // Release on both outcomes; the TTL backstops a crash in between.
        let result = self.create_locked(actor, resource_id, term).await;
        guard.release().await;
        result
    }

    async fn create_locked(
        &self,
        actor: Actor,
        resource_id: i64,
        term: LeaseTerm,
    ) -> Result<LeaseOrder, MarketError> {
        let resource = self
            .directory
            .get(resource_id)
            .await?
            .ok_or(MarketError::NotFound("resource"))?;

        if resource.availability != Availability::Listed {
            return Err(MarketError::ResourceUnavailable);
        }
        if resource.owner_uid == actor.uid {
            return Err(MarketError::SelfLeaseForbidden);
        }
        if self
            .store
            .find_open_for_pair(resource_id, actor.uid)
            .await?
            .is_some()
        {
            return Err(MarketError::DuplicateOrder);
        }

        let now = Utc::now();
        let quoted = quote(&resource.pricing, &term, now)?;

        let order = self
            .store
            .insert(NewLeaseOrder {
                resource_id,
                tenant_uid: actor.uid,
                start_time: now,
                end_time: quoted.end_time,
                rent_cents: quoted.rent_cents,
                deposit_cents: resource.pricing.deposit_cents,
                created_at: now,
            })
            .await?;

        info!(
            order_id = order.id,
            resource_id,
            tenant_uid = actor.uid,
            rent_cents = order.rent_cents,
            "lease order created"
        );
        Ok(order)
    }

    // -- reads ---------------------------------------------------------------

    /// Raw lookup, no authorization. Sibling engines use this.
    pub async fn order(&self, order_id: i64) -> Result<Option<LeaseOrder>, MarketError> {
        self.store.get(order_id).await
    }

    /// Lookup with the tenant/owner/operator visibility check. Returns the
    /// resource alongside so read paths can render pricing and credentials.
    pub async fn get_authorized(
        &self,
        actor: Actor,
        order_id: i64,
    ) -> Result<(LeaseOrder, ResourceRecord), MarketError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        let resource = self
            .directory
            .get(order.resource_id)
            .await?
            .ok_or(MarketError::NotFound("resource"))?;

        let is_tenant = order.tenant_uid == actor.uid;
        let is_owner = resource.owner_uid == actor.uid;
        if !is_tenant && !is_owner && !actor.operator {
            return Err(MarketError::Forbidden("not a party to this order"));
        }
        Ok((order, resource))
    }

    /// Orders visible to `actor` in the given marketplace role.
    pub async fn list(
        &self,
        actor: Actor,
        role: OrderRole,
        status: Option<OrderStatus>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        match role {
            OrderRole::Tenant => self.store.list_for_tenant(actor.uid, status).await,
            OrderRole::Owner => {
                let owned = self.directory.list_owned(actor.uid).await?;
                if owned.is_empty() {
                    return Ok(Vec::new());
                }
                self.store.list_for_resources(&owned, status).await
            }
        }
    }

    // -- activate ------------------------------------------------------------

    /// Flip `awaiting-payment → active` after a settled payment, then mark
    /// the resource `in-use`. Callers (the payment engine) surface a failure
    /// here as a reconciliation inconsistency — it is never retried inline.
    pub async fn activate_on_payment(&self, order_id: i64) -> Result<(), MarketError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;

        let moved = self
            .store
            .transition(
                order_id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Active,
                None,
            )
            .await?;
        if !moved {
            return Err(self.wrong_state("activate", order_id).await);
        }

        self.directory
            .set_availability(order.resource_id, Availability::InUse)
            .await?;
        info!(
            order_id,
            resource_id = order.resource_id,
            "order activated; resource in use"
        );
        Ok(())
    }

    // -- renew ---------------------------------------------------------------

    /// Extend an `active` order by a new term priced from the current
    /// `end_time`. Single-order mutation; no create lock involved.
    pub async fn renew(
        &self,
        actor: Actor,
        order_id: i64,
        term: LeaseTerm,
    ) -> Result<LeaseOrder, MarketError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        if order.tenant_uid != actor.uid {
            return Err(MarketError::Forbidden("only the tenant may renew"));
        }
        if order.status != OrderStatus::Active {
            return Err(self.wrong_state("renew", order_id).await);
        }

        let resource = self
            .directory
            .get(order.resource_id)
            .await?
            .ok_or(MarketError::NotFound("resource"))?;
        let quoted = quote(&resource.pricing, &term, order.end_time)?;

        let moved = self
            .store
            .extend(order_id, quoted.end_time, quoted.rent_cents)
            .await?;
        if !moved {
            return Err(self.wrong_state("renew", order_id).await);
        }

        info!(
            order_id,
            new_end = %quoted.end_time,
            added_rent_cents = quoted.rent_cents,
            "lease renewed"
        );
        self.store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))
    }

    // -- return / expire -----------------------------------------------------

    /// Tenant returns the resource before or at the end of the window.
    pub async fn return_lease(
        &self,
        actor: Actor,
        order_id: i64,
        now: DateTime<Utc>,
    ) -> Result<LeaseOrder, MarketError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        if order.tenant_uid != actor.uid {
            return Err(MarketError::Forbidden("only the tenant may return"));
        }
        self.close_active(&order, now, "return").await?;
        self.store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))
    }

    /// Scheduler path: identical guard and effect to a return, minus the
    /// requester check.
    pub async fn expire(&self, order_id: i64, now: DateTime<Utc>) -> Result<(), MarketError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        self.close_active(&order, now, "expire").await
    }

    /// `active → closed` with `actual_end_time`, then relist — unless an
    /// unresolved appeal holds the resource for adjudication.
    async fn close_active(
        &self,
        order: &LeaseOrder,
        now: DateTime<Utc>,
        operation: &'static str,
    ) -> Result<(), MarketError> {
        let moved = self
            .store
            .transition(
                order.id,
                &[OrderStatus::Active],
                OrderStatus::Closed,
                Some(now),
            )
            .await?;
        if !moved {
            return Err(self.wrong_state(operation, order.id).await);
        }

        if self.dispute_hold.has_unresolved_appeal(order.id).await? {
            info!(
                order_id = order.id,
                resource_id = order.resource_id,
                "order closed with unresolved appeal; resource availability left untouched"
            );
        } else {
            self.directory
                .set_availability(order.resource_id, Availability::Listed)
                .await?;
            info!(
                order_id = order.id,
                resource_id = order.resource_id,
                "order closed; resource relisted"
            );
        }
        Ok(())
    }

    // -- cancel --------------------------------------------------------------

    /// Cancel an unpaid or active order. Cancelling an `active` order
    /// honors the same appeal-hold as return/expiry before relisting.
    pub async fn cancel(&self, actor: Actor, order_id: i64) -> Result<LeaseOrder, MarketError> {
        let order = self
            .store
            .get(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        if order.tenant_uid != actor.uid {
            return Err(MarketError::Forbidden("only the tenant may cancel"));
        }

        // Unpaid: the resource was never taken, nothing to restore.
        if self
            .store
            .transition(
                order_id,
                &[OrderStatus::AwaitingPayment],
                OrderStatus::Cancelled,
                None,
            )
            .await?
        {
            info!(order_id, "unpaid order cancelled");
            return self
                .store
                .get(order_id)
                .await?
                .ok_or(MarketError::NotFound("order"));
        }

        // Active: release the resource, subject to the appeal-hold.
        if self
            .store
            .transition(
                order_id,
                &[OrderStatus::Active],
                OrderStatus::Cancelled,
                None,
            )
            .await?
        {
            if self.dispute_hold.has_unresolved_appeal(order_id).await? {
                warn!(
                    order_id,
                    resource_id = order.resource_id,
                    "active order cancelled with unresolved appeal; resource held for adjudication"
                );
            } else {
                self.directory
                    .set_availability(order.resource_id, Availability::Listed)
                    .await?;
                info!(
                    order_id,
                    resource_id = order.resource_id,
                    "active order cancelled; resource relisted"
                );
            }
            return self
                .store
                .get(order_id)
                .await?
                .ok_or(MarketError::NotFound("order"));
        }

        Err(self.wrong_state("cancel", order_id).await)
    }

    // -- dispute coupling ----------------------------------------------------

    /// CAS `active → disputed`; the dispute gate is the only caller.
    pub async fn mark_disputed(&self, order_id: i64) -> Result<bool, MarketError> {
        self.store
            .transition(
                order_id,
                &[OrderStatus::Active],
                OrderStatus::Disputed,
                None,
            )
            .await
    }

    /// CAS `disputed → closed` with `actual_end_time`; resolution path only.
    pub async fn close_disputed(
        &self,
        order_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, MarketError> {
        self.store
            .transition(
                order_id,
                &[OrderStatus::Disputed],
                OrderStatus::Closed,
                Some(now),
            )
            .await
    }

    // -- sweep selections ----------------------------------------------------

    pub async fn expired_orders(&self, now: DateTime<Utc>) -> Result<Vec<LeaseOrder>, MarketError> {
        self.store.select_expired(now).await
    }

    pub async fn expiring_within(
        &self,
        now: DateTime<Utc>,
        lookahead: Duration,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        self.store.select_expiring_within(now, lookahead).await
    }

    pub async fn stale_awaiting(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<LeaseOrder>, MarketError> {
        self.store.select_stale_awaiting(cutoff).await
    }

    // -- helpers -------------------------------------------------------------

    async fn wrong_state(&self, operation: &'static str, order_id: i64) -> MarketError {
        let actual = match self.store.get(order_id).await {
            Ok(Some(order)) => order.status.as_str().to_string(),
            _ => "unknown".to_string(),
        };
        MarketError::WrongState { operation, actual }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryOrderStore;
    use lsk_directory::{MemoryDirectory, PricingTiers};
    use lsk_lock::LocalLockService;

    /// Hold stub with a fixed answer.
    struct FixedHold(bool);

    #[async_trait]
    impl DisputeHold for FixedHold {
        async fn has_unresolved_appeal(&self, _order_id: i64) -> Result<bool, MarketError> {
            Ok(self.0)
        }
    }

    const OWNER: i64 = 10;
    const TENANT: i64 = 20;
    const RESOURCE: i64 = 1;

    struct Harness {
        engine: OrderEngine,
        directory: Arc<MemoryDirectory>,
    }

    async fn harness(hold: bool) -> Harness {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .put(lsk_directory::ResourceRecord {
                id: RESOURCE,
                owner_uid: OWNER,
                availability: Availability::Listed,
                pricing: PricingTiers {
                    per_half_hour_cents: 500,
                    per_hour_cents: 1000,
                    overnight_cents: 3000,
                    deposit_cents: 2000,
                },
                login_enc: None,
                secret_enc: None,
            })
            .await;

        let engine = OrderEngine::new(
            Arc::new(MemoryOrderStore::new()),
            Arc::clone(&directory) as Arc<dyn ResourceDirectory>,
            Arc::new(LocalLockService::new()),
            Arc::new(FixedHold(hold)),
            OrderEngineConfig::default(),
        );
        Harness { engine, directory }
    }

    async fn availability(h: &Harness) -> Availability {
        h.directory.get(RESOURCE).await.unwrap().unwrap().availability
    }

    async fn active_order(h: &Harness) -> LeaseOrder {
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(2))
            .await
            .unwrap();
        h.engine.activate_on_payment(order.id).await.unwrap();
        h.engine.order(order.id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn create_prices_and_leaves_resource_listed() {
        let h = harness(false).await;
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(2))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::AwaitingPayment);
        assert_eq!(order.rent_cents, 2000);
        assert_eq!(order.deposit_cents, 2000);
        assert_eq!(order.total_cents(), 4000);
        assert_eq!(availability(&h).await, Availability::Listed);
    }

    #[tokio::test]
    async fn create_guards_fire_in_order() {
        let h = harness(false).await;

        let err = h
            .engine
            .create(Actor::user(TENANT), 99, LeaseTerm::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::NotFound("resource"));

        let err = h
            .engine
            .create(Actor::user(OWNER), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::SelfLeaseForbidden);

        h.engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap();
        let err = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::DuplicateOrder);
    }

    #[tokio::test]
    async fn create_rejects_unlisted_resource() {
        let h = harness(false).await;
        h.directory
            .set_availability(RESOURCE, Availability::Delisted)
            .await
            .unwrap();

        let err = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap_err();
        assert_eq!(err, MarketError::ResourceUnavailable);
    }

    #[tokio::test]
    async fn create_rejects_bad_duration() {
        let h = harness(false).await;
        let err = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(0))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidDuration(_)));
    }

    #[tokio::test]
    async fn activate_takes_resource_and_is_single_shot() {
        let h = harness(false).await;
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap();

        h.engine.activate_on_payment(order.id).await.unwrap();
        assert_eq!(availability(&h).await, Availability::InUse);
        assert_eq!(
            h.engine.order(order.id).await.unwrap().unwrap().status,
            OrderStatus::Active
        );

        let err = h.engine.activate_on_payment(order.id).await.unwrap_err();
        assert!(matches!(err, MarketError::WrongState { .. }));
    }

    #[tokio::test]
    async fn renew_extends_window_and_rent() {
        let h = harness(false).await;
        let order = active_order(&h).await;

        let renewed = h
            .engine
            .renew(Actor::user(TENANT), order.id, LeaseTerm::hours(1))
            .await
            .unwrap();
        assert_eq!(renewed.end_time, order.end_time + Duration::hours(1));
        assert_eq!(renewed.rent_cents, order.rent_cents + 1000);
    }

    #[tokio::test]
    async fn renew_rejects_non_tenant_and_unpaid_order() {
        let h = harness(false).await;
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap();

        let err = h
            .engine
            .renew(Actor::user(999), order.id, LeaseTerm::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));

        let err = h
            .engine
            .renew(Actor::user(TENANT), order.id, LeaseTerm::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::WrongState { .. }));
    }

    #[tokio::test]
    async fn return_closes_and_relists() {
        let h = harness(false).await;
        let order = active_order(&h).await;
        let now = Utc::now();

        let closed = h
            .engine
            .return_lease(Actor::user(TENANT), order.id, now)
            .await
            .unwrap();
        assert_eq!(closed.status, OrderStatus::Closed);
        assert_eq!(closed.actual_end_time, Some(now));
        assert_eq!(availability(&h).await, Availability::Listed);
    }

    #[tokio::test]
    async fn return_with_unresolved_appeal_holds_resource() {
        let h = harness(true).await;
        let order = active_order(&h).await;

        h.engine
            .return_lease(Actor::user(TENANT), order.id, Utc::now())
            .await
            .unwrap();
        assert_eq!(
            availability(&h).await,
            Availability::InUse,
            "resource must stay untouched pending dispute resolution"
        );
    }

    #[tokio::test]
    async fn return_requires_tenant_and_active() {
        let h = harness(false).await;
        let order = active_order(&h).await;

        let err = h
            .engine
            .return_lease(Actor::user(OWNER), order.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));

        h.engine
            .return_lease(Actor::user(TENANT), order.id, Utc::now())
            .await
            .unwrap();
        let err = h
            .engine
            .return_lease(Actor::user(TENANT), order.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::WrongState { .. }));
    }

    #[tokio::test]
    async fn cancel_unpaid_leaves_resource_alone() {
        let h = harness(false).await;
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap();

        let cancelled = h
            .engine
            .cancel(Actor::user(TENANT), order.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(availability(&h).await, Availability::Listed);
    }

    #[tokio::test]
    async fn cancel_active_relists_without_appeal() {
        let h = harness(false).await;
        let order = active_order(&h).await;

        h.engine
            .cancel(Actor::user(TENANT), order.id)
            .await
            .unwrap();
        assert_eq!(availability(&h).await, Availability::Listed);
    }

    #[tokio::test]
    async fn cancel_active_honors_appeal_hold() {
        let h = harness(true).await;
        let order = active_order(&h).await;

        h.engine
            .cancel(Actor::user(TENANT), order.id)
            .await
            .unwrap();
        assert_eq!(
            availability(&h).await,
            Availability::InUse,
            "cancel must not bypass the appeal-hold"
        );
    }

    #[tokio::test]
    async fn cancel_terminal_order_is_wrong_state() {
        let h = harness(false).await;
        let order = active_order(&h).await;
        h.engine
            .return_lease(Actor::user(TENANT), order.id, Utc::now())
            .await
            .unwrap();

        let err = h
            .engine
            .cancel(Actor::user(TENANT), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::WrongState { .. }));
    }

    #[tokio::test]
    async fn expire_matches_return_semantics() {
        let h = harness(false).await;
        let order = active_order(&h).await;
        let now = Utc::now();

        h.engine.expire(order.id, now).await.unwrap();
        let closed = h.engine.order(order.id).await.unwrap().unwrap();
        assert_eq!(closed.status, OrderStatus::Closed);
        assert_eq!(closed.actual_end_time, Some(now));
        assert_eq!(availability(&h).await, Availability::Listed);
    }

    #[tokio::test]
    async fn list_by_role_sees_both_sides() {
        let h = harness(false).await;
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap();

        let tenant_view = h
            .engine
            .list(Actor::user(TENANT), OrderRole::Tenant, None)
            .await
            .unwrap();
        assert_eq!(tenant_view.len(), 1);

        let owner_view = h
            .engine
            .list(Actor::user(OWNER), OrderRole::Owner, None)
            .await
            .unwrap();
        assert_eq!(owner_view.len(), 1);
        assert_eq!(owner_view[0].id, order.id);

        let stranger_view = h
            .engine
            .list(Actor::user(777), OrderRole::Owner, None)
            .await
            .unwrap();
        assert!(stranger_view.is_empty());
    }

    #[tokio::test]
    async fn get_authorized_rejects_strangers() {
        let h = harness(false).await;
        let order = h
            .engine
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(1))
            .await
            .unwrap();

        assert!(h
            .engine
            .get_authorized(Actor::user(TENANT), order.id)
            .await
            .is_ok());
        assert!(h
            .engine
            .get_authorized(Actor::user(OWNER), order.id)
            .await
            .is_ok());
        assert!(h
            .engine
            .get_authorized(Actor::operator(1), order.id)
            .await
            .is_ok());

        let err = h
            .engine
            .get_authorized(Actor::user(777), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));
    }
}
