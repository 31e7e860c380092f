//! Shared runtime state for lsk-daemon.
//!
//! [`AppState::assemble`] wires the engines from a set of ports; the daemon
//! main picks Postgres-backed or in-memory ports, tests use
//! [`AppState::in_memory`]. Handlers receive `State<Arc<AppState>>`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use lsk_config::AppConfig;
use lsk_directory::{CredentialVault, DevVault, MemoryDirectory, ResourceDirectory};
use lsk_dispute::{AppealHold, AppealStore, DisputeGate, MemoryAppealStore};
use lsk_lock::{LocalLockService, LockService};
use lsk_orders::{MemoryOrderStore, OrderEngine, OrderEngineConfig, OrderStore};
use lsk_payment::{
    MemoryPaymentStore, PaymentEngine, PaymentEngineConfig, PaymentGateway, PaymentStore,
    UnconfiguredGateway,
};
use lsk_scheduler::{NoticeEvent, NotificationSink};

// ---------------------------------------------------------------------------
// BusMsg — SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE
/// events on `/v1/stream`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Notice { user_id: i64, event: NoticeEvent },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

/// Static build metadata included in the health response.
#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// BusNotifier
// ---------------------------------------------------------------------------

/// [`NotificationSink`] that publishes onto the SSE bus. Fire-and-forget:
/// a bus with no subscribers drops the notice, which is fine.
pub struct BusNotifier(pub broadcast::Sender<BusMsg>);

#[async_trait]
impl NotificationSink for BusNotifier {
    async fn notify(&self, user_id: i64, event: NoticeEvent) {
        let _ = self.0.send(BusMsg::Notice { user_id, event });
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Everything the daemon needs wired together before it can serve.
pub struct Wiring {
    pub order_store: Arc<dyn OrderStore>,
    pub payment_store: Arc<dyn PaymentStore>,
    pub appeal_store: Arc<dyn AppealStore>,
    pub directory: Arc<dyn ResourceDirectory>,
    pub vault: Arc<dyn CredentialVault>,
    pub locks: Arc<dyn LockService>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub signing_key: Vec<u8>,
    pub config: AppConfig,
}

/// Cloneable (Arc) handle shared across all Axum handlers.
pub struct AppState {
    pub orders: Arc<OrderEngine>,
    pub payments: Arc<PaymentEngine>,
    pub disputes: Arc<DisputeGate>,
    pub directory: Arc<dyn ResourceDirectory>,
    pub vault: Arc<dyn CredentialVault>,
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
}

impl AppState {
    pub fn assemble(wiring: Wiring) -> Arc<Self> {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        let orders = Arc::new(OrderEngine::new(
            Arc::clone(&wiring.order_store),
            Arc::clone(&wiring.directory),
            Arc::clone(&wiring.locks),
            Arc::new(AppealHold(Arc::clone(&wiring.appeal_store))),
            OrderEngineConfig {
                lock_wait: Duration::from_secs(wiring.config.lock.wait_secs),
                lock_ttl: Duration::from_secs(wiring.config.lock.ttl_secs),
            },
        ));

        let payments = Arc::new(PaymentEngine::new(
            Arc::clone(&wiring.payment_store),
            Arc::clone(&orders),
            Arc::clone(&wiring.gateway),
            wiring.signing_key,
            PaymentEngineConfig {
                notify_url: wiring.config.gateway.notify_url.clone(),
                return_url: wiring.config.gateway.return_url.clone(),
            },
        ));

        let disputes = Arc::new(DisputeGate::new(
            Arc::clone(&wiring.appeal_store),
            Arc::clone(&orders),
            Arc::clone(&wiring.directory),
        ));

        Arc::new(Self {
            orders,
            payments,
            disputes,
            directory: wiring.directory,
            vault: wiring.vault,
            bus,
            build: BuildInfo {
                service: "lsk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
        })
    }

    /// Fully in-memory wiring: memory stores, the in-process lock service,
    /// the dev vault, and no provider (payment creation degrades to the
    /// hosted page). Tests seed resources through the returned directory.
    pub fn in_memory(signing_key: &[u8]) -> (Arc<Self>, Arc<MemoryDirectory>) {
        let directory = Arc::new(MemoryDirectory::new());
        let state = Self::assemble(Wiring {
            order_store: Arc::new(MemoryOrderStore::new()),
            payment_store: Arc::new(MemoryPaymentStore::new()),
            appeal_store: Arc::new(MemoryAppealStore::new()),
            directory: Arc::clone(&directory) as Arc<dyn ResourceDirectory>,
            vault: Arc::new(DevVault::new()),
            locks: Arc::new(LocalLockService::new()),
            gateway: Arc::new(UnconfiguredGateway),
            signing_key: signing_key.to_vec(),
            config: AppConfig::default(),
        });
        (state, directory)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
