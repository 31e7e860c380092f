//! Background sweep tasks.
//!
//! Each spawner runs its sweep on a fixed `tokio::time::interval` until the
//! process exits. Sweeps have no cancellation of their own: a tick runs to
//! completion over its selected batch.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use lsk_orders::OrderEngine;

use crate::notify::NotificationSink;
use crate::sweeps::{expiry_sweep, reminder_sweep, stale_payment_sweep};

/// Sweep cadence and windows, in seconds.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub expiry_period_secs: u64,
    pub reminder_period_secs: u64,
    pub reminder_lookahead_secs: u64,
    pub stale_period_secs: u64,
    pub unpaid_timeout_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            expiry_period_secs: 60,
            reminder_period_secs: 60,
            reminder_lookahead_secs: 300,
            stale_period_secs: 300,
            unpaid_timeout_secs: 1800,
        }
    }
}

/// Spawn all three sweeps. The handles are returned for completeness; the
/// daemon lets them run for the life of the process.
pub fn spawn_sweeps(
    orders: Arc<OrderEngine>,
    sink: Arc<dyn NotificationSink>,
    config: SchedulerConfig,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_expiry_sweeper(Arc::clone(&orders), config),
        spawn_reminder_sweeper(Arc::clone(&orders), sink, config),
        spawn_stale_payment_sweeper(orders, config),
    ]
}

pub fn spawn_expiry_sweeper(orders: Arc<OrderEngine>, config: SchedulerConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.expiry_period_secs));
        loop {
            ticker.tick().await;
            expiry_sweep(&orders, chrono::Utc::now()).await;
        }
    })
}

pub fn spawn_reminder_sweeper(
    orders: Arc<OrderEngine>,
    sink: Arc<dyn NotificationSink>,
    config: SchedulerConfig,
) -> JoinHandle<()> {
    let lookahead = chrono::Duration::seconds(config.reminder_lookahead_secs as i64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.reminder_period_secs));
        loop {
            ticker.tick().await;
            reminder_sweep(&orders, sink.as_ref(), chrono::Utc::now(), lookahead).await;
        }
    })
}

pub fn spawn_stale_payment_sweeper(
    orders: Arc<OrderEngine>,
    config: SchedulerConfig,
) -> JoinHandle<()> {
    let timeout = chrono::Duration::seconds(config.unpaid_timeout_secs as i64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.stale_period_secs));
        loop {
            ticker.tick().await;
            stale_payment_sweep(&orders, chrono::Utc::now(), timeout).await;
        }
    })
}
