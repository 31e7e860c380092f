//! lsk-scheduler
//!
//! Periodic background sweeps over the order book: expire elapsed leases,
//! remind soon-to-expire tenants, cancel stale unpaid orders. Every sweep
//! is idempotent and tolerant of partial failure, and applies exactly the
//! transition rules the foreground API uses.

mod notify;
mod spawn;
mod sweeps;

pub use notify::{NoticeEvent, NotificationSink, NullSink, RecordingSink};
pub use spawn::{
    spawn_expiry_sweeper, spawn_reminder_sweeper, spawn_stale_payment_sweeper, spawn_sweeps,
    SchedulerConfig,
};
pub use sweeps::{expiry_sweep, reminder_sweep, stale_payment_sweep, SweepReport};
