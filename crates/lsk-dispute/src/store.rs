//! Appeal persistence port and its in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use lsk_orders::{DisputeHold, MarketError};

use crate::types::{Appeal, AppealState, NewAppeal, Verdict};

#[async_trait]
pub trait AppealStore: Send + Sync {
    /// Insert unresolved; the store assigns the id.
    async fn insert(&self, new_appeal: NewAppeal) -> Result<Appeal, MarketError>;

    async fn get(&self, appeal_id: i64) -> Result<Option<Appeal>, MarketError>;

    /// The one-unresolved-per-order lookup.
    async fn find_unresolved(&self, order_id: i64) -> Result<Option<Appeal>, MarketError>;

    async fn list(&self, state: Option<AppealState>) -> Result<Vec<Appeal>, MarketError>;

    /// CAS on the verdict: writes it iff the appeal is still unresolved.
    /// Returns whether the write landed — `false` means someone resolved
    /// it first.
    async fn resolve(
        &self,
        appeal_id: i64,
        verdict: Verdict,
        resolver_uid: i64,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, MarketError>;
}

// ---------------------------------------------------------------------------
// MemoryAppealStore
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    next_id: i64,
    appeals: BTreeMap<i64, Appeal>,
}

#[derive(Default)]
pub struct MemoryAppealStore {
    inner: Mutex<Inner>,
}

impl MemoryAppealStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AppealStore for MemoryAppealStore {
    async fn insert(&self, new_appeal: NewAppeal) -> Result<Appeal, MarketError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let appeal = Appeal {
            id: inner.next_id,
            order_id: new_appeal.order_id,
            opened_by: new_appeal.opened_by,
            category: new_appeal.category,
            evidence: new_appeal.evidence,
            verdict: None,
            resolver_uid: None,
            created_at: new_appeal.created_at,
            resolved_at: None,
        };
        inner.appeals.insert(appeal.id, appeal.clone());
        Ok(appeal)
    }

    async fn get(&self, appeal_id: i64) -> Result<Option<Appeal>, MarketError> {
        Ok(self.inner.lock().await.appeals.get(&appeal_id).cloned())
    }

    async fn find_unresolved(&self, order_id: i64) -> Result<Option<Appeal>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .appeals
            .values()
            .find(|a| a.order_id == order_id && !a.is_resolved())
            .cloned())
    }

    async fn list(&self, state: Option<AppealState>) -> Result<Vec<Appeal>, MarketError> {
        Ok(self
            .inner
            .lock()
            .await
            .appeals
            .values()
            .filter(|a| match state {
                None => true,
                Some(AppealState::Unresolved) => !a.is_resolved(),
                Some(AppealState::Resolved) => a.is_resolved(),
            })
            .cloned()
            .collect())
    }

    async fn resolve(
        &self,
        appeal_id: i64,
        verdict: Verdict,
        resolver_uid: i64,
        resolved_at: DateTime<Utc>,
    ) -> Result<bool, MarketError> {
        let mut inner = self.inner.lock().await;
        let Some(appeal) = inner.appeals.get_mut(&appeal_id) else {
            return Ok(false);
        };
        if appeal.is_resolved() {
            return Ok(false);
        }
        appeal.verdict = Some(verdict);
        appeal.resolver_uid = Some(resolver_uid);
        appeal.resolved_at = Some(resolved_at);
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// AppealHold
// ---------------------------------------------------------------------------

/// The order engine's view of the dispute module: just "is there an
/// unresolved appeal". Wired at startup — the engine depends on the
/// [`DisputeHold`] port, this side implements it.
pub struct AppealHold(pub Arc<dyn AppealStore>);

#[async_trait]
impl DisputeHold for AppealHold {
    async fn has_unresolved_appeal(&self, order_id: i64) -> Result<bool, MarketError> {
        Ok(self.0.find_unresolved(order_id).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AppealCategory;

    fn new_appeal(order_id: i64) -> NewAppeal {
        NewAppeal {
            order_id,
            opened_by: 20,
            category: AppealCategory::ResourceFault,
            evidence: vec!["https://files.example/e1.png".to_string()],
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn resolve_is_single_shot() {
        let store = MemoryAppealStore::new();
        let appeal = store.insert(new_appeal(1)).await.unwrap();

        assert!(store
            .resolve(appeal.id, Verdict::FavorTenant, 99, Utc::now())
            .await
            .unwrap());
        assert!(
            !store
                .resolve(appeal.id, Verdict::FavorOwner, 98, Utc::now())
                .await
                .unwrap(),
            "second resolve must lose"
        );

        let resolved = store.get(appeal.id).await.unwrap().unwrap();
        assert_eq!(resolved.verdict, Some(Verdict::FavorTenant));
        assert_eq!(resolved.resolver_uid, Some(99));
        assert!(resolved.resolved_at.is_some());
    }

    #[tokio::test]
    async fn find_unresolved_clears_after_resolution() {
        let store = MemoryAppealStore::new();
        let appeal = store.insert(new_appeal(7)).await.unwrap();
        assert!(store.find_unresolved(7).await.unwrap().is_some());

        store
            .resolve(appeal.id, Verdict::Split, 99, Utc::now())
            .await
            .unwrap();
        assert!(store.find_unresolved(7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn appeal_hold_tracks_store_state() {
        let store = Arc::new(MemoryAppealStore::new());
        let hold = AppealHold(Arc::clone(&store) as Arc<dyn AppealStore>);

        assert!(!hold.has_unresolved_appeal(3).await.unwrap());
        let appeal = store.insert(new_appeal(3)).await.unwrap();
        assert!(hold.has_unresolved_appeal(3).await.unwrap());

        store
            .resolve(appeal.id, Verdict::FavorOwner, 99, Utc::now())
            .await
            .unwrap();
        assert!(!hold.has_unresolved_appeal(3).await.unwrap());
    }

    #[tokio::test]
    async fn list_filters_by_state() {
        let store = MemoryAppealStore::new();
        let a = store.insert(new_appeal(1)).await.unwrap();
        store.insert(new_appeal(2)).await.unwrap();
        store
            .resolve(a.id, Verdict::Split, 99, Utc::now())
            .await
            .unwrap();

        assert_eq!(store.list(None).await.unwrap().len(), 2);
        assert_eq!(
            store
                .list(Some(AppealState::Unresolved))
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            store.list(Some(AppealState::Resolved)).await.unwrap().len(),
            1
        );
    }
}
