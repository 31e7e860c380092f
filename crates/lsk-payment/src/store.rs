//! Payment persistence port and its in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use lsk_orders::MarketError;

use crate::types::{NewPayment, PayMethod, PaymentRecord, PaymentStatus};

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert in `pending`; the store assigns the id.
    async fn insert(&self, new_payment: NewPayment) -> Result<PaymentRecord, MarketError>;

    async fn get(&self, payment_id: i64) -> Result<Option<PaymentRecord>, MarketError>;

    /// The one-pending-per-(order, method) lookup used before insert.
    async fn find_pending(
        &self,
        order_id: i64,
        method: PayMethod,
    ) -> Result<Option<PaymentRecord>, MarketError>;

    async fn find_by_reference(
        &self,
        txn_ref: &str,
    ) -> Result<Option<PaymentRecord>, MarketError>;

    /// CAS `pending → success`, stamping `paid_at` and the provider's trade
    /// number. Returns whether a row moved; a `false` on an already-settled
    /// record is how duplicate webhook deliveries become no-ops.
    async fn mark_success(
        &self,
        txn_ref: &str,
        provider_ref: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, MarketError>;

    /// CAS `pending → failed`.
    async fn mark_failed(&self, txn_ref: &str) -> Result<bool, MarketError>;
}

// ---------------------------------------------------------------------------
// MemoryPaymentStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    next_id: i64,
    payments: BTreeMap<i64, PaymentRecord>,
}

#[derive(Default)]
pub struct MemoryPaymentStore {
    inner: Mutex<Inner>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row count, for idempotence assertions in tests.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.payments.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn insert(&self, new_payment: NewPayment) -> Result<PaymentRecord, MarketError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let payment = PaymentRecord {
            id: inner.next_id,
            order_id: new_payment.order_id,
            method: new_payment.method,
            amount_cents: new_payment.amount_cents,
            txn_ref: new_payment.txn_ref,
            provider_ref: None,
            status: PaymentStatus::Pending,
            created_at: new_payment.created_at,
            paid_at: None,
        };
        inner.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn get(&self, payment_id: i64) -> Result<Option<PaymentRecord>, MarketError> {
        Ok(self.inner.lock().await.payments.get(&payment_id).cloned())
    }

    async fn find_pending(
        &self,
        order_id: i64,
        method: PayMethod,
    ) -> Result<Option<PaymentRecord>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .payments
            .values()
            .find(|p| {
                p.order_id == order_id && p.method == method && p.status == PaymentStatus::Pending
            })
            .cloned())
    }

    async fn find_by_reference(
        &self,
        txn_ref: &str,
    ) -> Result<Option<PaymentRecord>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .payments
            .values()
            .find(|p| p.txn_ref == txn_ref)
            .cloned())
    }

    async fn mark_success(
        &self,
        txn_ref: &str,
        provider_ref: Option<&str>,
        paid_at: DateTime<Utc>,
    ) -> Result<bool, MarketError> {
        let mut inner = self.inner.lock().await;
        let Some(payment) = inner
            .payments
            .values_mut()
            .find(|p| p.txn_ref == txn_ref)
        else {
            return Ok(false);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(false);
        }
        payment.status = PaymentStatus::Success;
        payment.paid_at = Some(paid_at);
        payment.provider_ref = provider_ref.map(str::to_string);
        Ok(true)
    }

    async fn mark_failed(&self, txn_ref: &str) -> Result<bool, MarketError> {
        let mut inner = self.inner.lock().await;
        let Some(payment) = inner
            .payments
            .values_mut()
            .find(|p| p.txn_ref == txn_ref)
        else {
            return Ok(false);
        };
        if payment.status != PaymentStatus::Pending {
            return Ok(false);
        }
        payment.status = PaymentStatus::Failed;
        Ok(true)
    }
}
