//! The dispute gate: a guard on appeal creation plus the one forced
//! transition in the system.
//!
//! Opening an appeal moves the order `active → disputed` and blocks the
//! normal close→relist cascade. Resolution is the only way out: it forces
//! `disputed → closed` and **delists** the resource unconditionally — an
//! adjudicated resource never relists automatically.

use std::sync::Arc;

use chrono::Utc;
use lsk_directory::{Availability, ResourceDirectory};
use lsk_orders::{Actor, MarketError, OrderEngine};
use tracing::{info, warn};

use crate::store::AppealStore;
use crate::types::{Appeal, AppealState, NewAppeal, Verdict};

pub struct DisputeGate {
    appeals: Arc<dyn AppealStore>,
    orders: Arc<OrderEngine>,
    directory: Arc<dyn ResourceDirectory>,
}

impl DisputeGate {
    pub fn new(
        appeals: Arc<dyn AppealStore>,
        orders: Arc<OrderEngine>,
        directory: Arc<dyn ResourceDirectory>,
    ) -> Self {
        Self {
            appeals,
            orders,
            directory,
        }
    }

    // -- open ----------------------------------------------------------------

    /// Raise an appeal on an `active` order. Either party — tenant or
    /// resource owner — may open one; at most one unresolved appeal exists
    /// per order.
    ///
    /// The `active → disputed` CAS runs before the insert, so two racing
    /// opens serialize on the order row: the loser sees either
    /// `DuplicateAppeal` (winner already inserted) or the wrong-state
    /// rejection.
    pub async fn open(
        &self,
        actor: Actor,
        order_id: i64,
        category: crate::types::AppealCategory,
        evidence: Vec<String>,
    ) -> Result<Appeal, MarketError> {
        // Visibility check doubles as the party check: only the tenant,
        // the owner, or an operator can see the order at all.
        let (order, resource) = self.orders.get_authorized(actor, order_id).await?;
        if actor.uid != order.tenant_uid && actor.uid != resource.owner_uid {
            return Err(MarketError::Forbidden(
                "only a party to the order may appeal",
            ));
        }

        if self.appeals.find_unresolved(order_id).await?.is_some() {
            return Err(MarketError::DuplicateAppeal);
        }

        if !self.orders.mark_disputed(order_id).await? {
            // Lost a race or the order was never active. If an appeal
            // appeared in the meantime, name the real conflict.
            if self.appeals.find_unresolved(order_id).await?.is_some() {
                return Err(MarketError::DuplicateAppeal);
            }
            let actual = self
                .orders
                .order(order_id)
                .await?
                .map(|o| o.status.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(MarketError::WrongState {
                operation: "dispute-open",
                actual,
            });
        }

        let appeal = self
            .appeals
            .insert(NewAppeal {
                order_id,
                opened_by: actor.uid,
                category,
                evidence,
                created_at: Utc::now(),
            })
            .await?;

        info!(
            appeal_id = appeal.id,
            order_id,
            opened_by = actor.uid,
            category = category.as_str(),
            "appeal opened; order disputed"
        );
        Ok(appeal)
    }

    // -- resolve -------------------------------------------------------------

    /// Adjudicate an appeal. Requires resolver privilege. Leaves the order
    /// `closed` and the resource `delisted`, regardless of prior resource
    /// state.
    pub async fn resolve(
        &self,
        actor: Actor,
        appeal_id: i64,
        verdict: Verdict,
    ) -> Result<Appeal, MarketError> {
        if !actor.operator {
            return Err(MarketError::Forbidden("resolver privilege required"));
        }

        let appeal = self
            .appeals
            .get(appeal_id)
            .await?
            .ok_or(MarketError::NotFound("appeal"))?;

        let now = Utc::now();
        if !self
            .appeals
            .resolve(appeal_id, verdict, actor.uid, now)
            .await?
        {
            return Err(MarketError::WrongState {
                operation: "dispute-resolve",
                actual: "resolved".to_string(),
            });
        }

        // Forced close. A failed CAS here means the order already left
        // `disputed` — an inconsistency worth flagging, but the delist
        // below still applies.
        if !self.orders.close_disputed(appeal.order_id, now).await? {
            warn!(
                appeal_id,
                order_id = appeal.order_id,
                "resolved appeal found its order outside `disputed`"
            );
        }

        let order = self
            .orders
            .order(appeal.order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        self.directory
            .set_availability(order.resource_id, Availability::Delisted)
            .await?;

        info!(
            appeal_id,
            order_id = appeal.order_id,
            resource_id = order.resource_id,
            verdict = verdict.as_str(),
            resolver_uid = actor.uid,
            "appeal resolved; order closed, resource delisted"
        );

        self.appeals
            .get(appeal_id)
            .await?
            .ok_or(MarketError::NotFound("appeal"))
    }

    // -- reads ---------------------------------------------------------------

    /// Operator listing by resolution state.
    pub async fn list(
        &self,
        actor: Actor,
        state: Option<AppealState>,
    ) -> Result<Vec<Appeal>, MarketError> {
        if !actor.operator {
            return Err(MarketError::Forbidden("resolver privilege required"));
        }
        self.appeals.list(state).await
    }

    /// Detail read: the opener, either party to the order, or an operator.
    pub async fn get(&self, actor: Actor, appeal_id: i64) -> Result<Appeal, MarketError> {
        let appeal = self
            .appeals
            .get(appeal_id)
            .await?
            .ok_or(MarketError::NotFound("appeal"))?;
        if actor.operator || actor.uid == appeal.opened_by {
            return Ok(appeal);
        }
        // Falls back to the order-level visibility check.
        self.orders.get_authorized(actor, appeal.order_id).await?;
        Ok(appeal)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
