//! The three periodic sweeps.
//!
//! Each sweep is a pure function over (engine, `now`): it selects a bounded
//! batch, applies the same transition rules the foreground API uses, and
//! tolerates partial failure — one bad order is logged and skipped, the
//! rest of the batch proceeds. Racing a foreground call is safe because
//! every transition is CAS-guarded; the losing side no-ops into the
//! failure count.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use lsk_orders::{Actor, MarketError, OrderEngine};

use crate::notify::{NoticeEvent, NotificationSink};

/// Aggregate outcome of one sweep execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub scanned: usize,
    pub applied: usize,
    pub failed: usize,
}

impl SweepReport {
    fn record(&mut self, outcome: Result<(), MarketError>, order_id: i64, sweep: &'static str) {
        match outcome {
            Ok(()) => self.applied += 1,
            Err(e) => {
                self.failed += 1;
                warn!(order_id, error = %e, "{sweep} sweep item failed; continuing");
            }
        }
    }
}

/// Close `active` orders whose window has elapsed, relisting unless an
/// unresolved appeal holds the resource.
pub async fn expiry_sweep(orders: &OrderEngine, now: DateTime<Utc>) -> SweepReport {
    let mut report = SweepReport::default();
    let due = match orders.expired_orders(now).await {
        Ok(due) => due,
        Err(e) => {
            warn!(error = %e, "expiry sweep selection failed");
            return report;
        }
    };
    report.scanned = due.len();
    if due.is_empty() {
        debug!("expiry sweep: nothing due");
        return report;
    }

    for order in due {
        let outcome = orders.expire(order.id, now).await;
        report.record(outcome, order.id, "expiry");
    }
    info!(
        scanned = report.scanned,
        applied = report.applied,
        failed = report.failed,
        "expiry sweep complete"
    );
    report
}

/// Remind tenants whose lease ends within `lookahead`. Notification only —
/// no state change.
pub async fn reminder_sweep(
    orders: &OrderEngine,
    sink: &dyn NotificationSink,
    now: DateTime<Utc>,
    lookahead: Duration,
) -> SweepReport {
    let mut report = SweepReport::default();
    let expiring = match orders.expiring_within(now, lookahead).await {
        Ok(expiring) => expiring,
        Err(e) => {
            warn!(error = %e, "reminder sweep selection failed");
            return report;
        }
    };
    report.scanned = expiring.len();
    if expiring.is_empty() {
        debug!("reminder sweep: nothing expiring soon");
        return report;
    }

    for order in expiring {
        sink.notify(
            order.tenant_uid,
            NoticeEvent::LeaseExpiring {
                order_id: order.id,
                end_time: order.end_time,
            },
        )
        .await;
        report.applied += 1;
    }
    info!(
        scanned = report.scanned,
        notified = report.applied,
        "reminder sweep complete"
    );
    report
}

/// Cancel `awaiting-payment` orders older than `unpaid_timeout`.
pub async fn stale_payment_sweep(
    orders: &OrderEngine,
    now: DateTime<Utc>,
    unpaid_timeout: Duration,
) -> SweepReport {
    let mut report = SweepReport::default();
    let cutoff = now - unpaid_timeout;
    let stale = match orders.stale_awaiting(cutoff).await {
        Ok(stale) => stale,
        Err(e) => {
            warn!(error = %e, "stale-payment sweep selection failed");
            return report;
        }
    };
    report.scanned = stale.len();
    if stale.is_empty() {
        debug!("stale-payment sweep: nothing stale");
        return report;
    }

    for order in stale {
        // Cancel acts as the tenant, same as the foreground path.
        let outcome = orders
            .cancel(Actor::user(order.tenant_uid), order.id)
            .await
            .map(|_| ());
        report.record(outcome, order.id, "stale-payment");
    }
    info!(
        scanned = report.scanned,
        cancelled = report.applied,
        failed = report.failed,
        "stale-payment sweep complete"
    );
    report
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
