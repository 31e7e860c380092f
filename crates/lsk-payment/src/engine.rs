//! The payment engine: creation, webhook reconciliation, poll fallback.
//!
//! # Side-effect ordering
//!
//! On a settled payment the record's CAS to `success` commits first; order
//! activation runs after. If activation fails, the payment stays `success`,
//! the order stays `awaiting-payment`, and the payment id lands in the
//! activation-failure list with an error log — surfaced for repair, never
//! silently retried inline.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use lsk_orders::{parse_cents, Actor, MarketError, OrderEngine, OrderStatus};

use crate::gateway::{
    map_provider_status, GatewayPayRequest, PaymentGateway, PARAM_PROVIDER_TXN, PARAM_REFERENCE,
    PARAM_TOTAL_AMOUNT, PARAM_TRADE_STATUS, TRADE_CLOSED, TRADE_FINISHED, TRADE_SUCCESS,
};
use crate::signature;
use crate::store::PaymentStore;
use crate::types::{
    NewPayment, PayMethod, PaymentIntent, PaymentRecord, PaymentStatus, RedirectTarget,
};

/// URLs the provider needs for the checkout round-trip.
#[derive(Debug, Clone)]
pub struct PaymentEngineConfig {
    pub notify_url: String,
    pub return_url: String,
}

pub struct PaymentEngine {
    payments: Arc<dyn PaymentStore>,
    orders: Arc<OrderEngine>,
    gateway: Arc<dyn PaymentGateway>,
    signing_key: Vec<u8>,
    config: PaymentEngineConfig,
    /// Payment ids that settled but whose order activation failed.
    activation_failures: Mutex<Vec<i64>>,
}

impl PaymentEngine {
    pub fn new(
        payments: Arc<dyn PaymentStore>,
        orders: Arc<OrderEngine>,
        gateway: Arc<dyn PaymentGateway>,
        signing_key: Vec<u8>,
        config: PaymentEngineConfig,
    ) -> Self {
        Self {
            payments,
            orders,
            gateway,
            signing_key,
            config,
            activation_failures: Mutex::new(Vec::new()),
        }
    }

    // -- create --------------------------------------------------------------

    /// Open (or re-surface) the payment for an order.
    ///
    /// Idempotent per (order, method): an existing `pending` record is
    /// returned as-is rather than inserting a second row. Gateway trouble
    /// of any kind degrades to the hosted simulation page — explicitly and
    /// logged, never silently.
    pub async fn create_payment(
        &self,
        actor: Actor,
        order_id: i64,
        method: PayMethod,
    ) -> Result<PaymentIntent, MarketError> {
        let order = self
            .orders
            .order(order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        if order.tenant_uid != actor.uid {
            return Err(MarketError::Forbidden("only the tenant may pay"));
        }
        if order.status != OrderStatus::AwaitingPayment {
            return Err(MarketError::WrongState {
                operation: "pay",
                actual: order.status.as_str().to_string(),
            });
        }

        let payment = match self.payments.find_pending(order_id, method).await? {
            Some(existing) => existing,
            None => {
                let created = self
                    .payments
                    .insert(NewPayment {
                        order_id,
                        method,
                        amount_cents: order.total_cents(),
                        txn_ref: fresh_reference(),
                        created_at: Utc::now(),
                    })
                    .await?;
                info!(
                    payment_id = created.id,
                    order_id,
                    method = method.as_str(),
                    amount_cents = created.amount_cents,
                    "payment opened"
                );
                created
            }
        };

        let redirect = match method {
            PayMethod::Manual => hosted_page(payment.id),
            PayMethod::Gateway => {
                let req = GatewayPayRequest {
                    reference: payment.txn_ref.clone(),
                    amount_cents: payment.amount_cents,
                    subject: format!("Account lease {}", order.order_no()),
                    notify_url: self.config.notify_url.clone(),
                    return_url: self.config.return_url.clone(),
                };
                match self.gateway.pay(&req).await {
                    Ok(target) => RedirectTarget::Provider(target),
                    Err(e) => {
                        warn!(
                            payment_id = payment.id,
                            error = %e,
                            "gateway checkout unavailable; falling back to hosted simulation page"
                        );
                        hosted_page(payment.id)
                    }
                }
            }
        };

        Ok(PaymentIntent { payment, redirect })
    }

    // -- reads ---------------------------------------------------------------

    /// Tenant-only status read. Never mutates.
    pub async fn get_payment(
        &self,
        actor: Actor,
        payment_id: i64,
    ) -> Result<PaymentRecord, MarketError> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(MarketError::NotFound("payment"))?;
        self.authorize_tenant(actor, &payment).await?;
        Ok(payment)
    }

    /// Unauthenticated read backing the hosted simulation page. The payment
    /// id in the URL is the capability, as with the provider's own checkout
    /// page.
    pub async fn payment_for_page(&self, payment_id: i64) -> Result<PaymentRecord, MarketError> {
        self.payments
            .get(payment_id)
            .await?
            .ok_or(MarketError::NotFound("payment"))
    }

    /// Payment ids that settled but failed to activate their order.
    /// A repair sweep or an operator consumes this.
    pub async fn activation_failures(&self) -> Vec<i64> {
        self.activation_failures.lock().await.clone()
    }

    // -- webhook -------------------------------------------------------------

    /// Inbound provider callback. Signature verification happens before any
    /// state is touched; a verified duplicate delivery is a no-op.
    pub async fn handle_callback(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<(), MarketError> {
        if !signature::verify(params, &self.signing_key) {
            warn!("provider callback rejected: bad signature");
            return Err(MarketError::SignatureInvalid);
        }

        let Some(reference) = params.get(PARAM_REFERENCE) else {
            warn!("provider callback missing reference; ignored");
            return Ok(());
        };
        let trade_status = params
            .get(PARAM_TRADE_STATUS)
            .map(String::as_str)
            .unwrap_or_default();

        // Cross-check the claimed amount when present. A mismatch is a
        // provider-side anomaly; the delivery is dropped, not errored, so
        // the provider's retry loop settles.
        if let Some(claimed) = params.get(PARAM_TOTAL_AMOUNT) {
            if let Some(payment) = self.payments.find_by_reference(reference).await? {
                match parse_cents(claimed) {
                    Ok(cents) if cents == payment.amount_cents => {}
                    Ok(cents) => {
                        warn!(
                            payment_id = payment.id,
                            claimed_cents = cents,
                            expected_cents = payment.amount_cents,
                            "callback amount mismatch; delivery ignored"
                        );
                        return Ok(());
                    }
                    Err(_) => {
                        warn!(
                            payment_id = payment.id,
                            claimed = %claimed,
                            "malformed callback amount; delivery ignored"
                        );
                        return Ok(());
                    }
                }
            }
        }

        match trade_status {
            TRADE_SUCCESS | TRADE_FINISHED => {
                self.reconcile_success(
                    reference,
                    params.get(PARAM_PROVIDER_TXN).map(String::as_str),
                )
                .await
            }
            TRADE_CLOSED => {
                if self.payments.mark_failed(reference).await? {
                    info!(reference = %reference, "payment closed by provider");
                } else {
                    warn!(reference = %reference, "trade-closed for unknown or settled payment; ignored");
                }
                Ok(())
            }
            other => {
                warn!(trade_status = %other, "unrecognized trade status in callback; ignored");
                Ok(())
            }
        }
    }

    // -- poll fallback -------------------------------------------------------

    /// Synchronous provider poll for when no callback has arrived. Maps the
    /// provider vocabulary and reconciles a settled payment exactly the way
    /// the webhook would.
    pub async fn poll_status(
        &self,
        actor: Actor,
        payment_id: i64,
    ) -> Result<PaymentStatus, MarketError> {
        let payment = self
            .payments
            .get(payment_id)
            .await?
            .ok_or(MarketError::NotFound("payment"))?;
        self.authorize_tenant(actor, &payment).await?;

        if payment.status != PaymentStatus::Pending {
            return Ok(payment.status);
        }

        let provider_status = self
            .gateway
            .query(&payment.txn_ref)
            .await
            .map_err(|e| MarketError::External(e.to_string()))?;
        let mapped = map_provider_status(&provider_status);

        match mapped {
            PaymentStatus::Success => {
                self.reconcile_success(&payment.txn_ref, None).await?;
            }
            PaymentStatus::Failed => {
                self.payments.mark_failed(&payment.txn_ref).await?;
            }
            _ => {}
        }
        Ok(mapped)
    }

    // -- internals -----------------------------------------------------------

    /// Shared settle path for webhook and poll. The CAS on the payment row
    /// decides a single winner; only the winner attempts activation.
    async fn reconcile_success(
        &self,
        reference: &str,
        provider_ref: Option<&str>,
    ) -> Result<(), MarketError> {
        let Some(payment) = self.payments.find_by_reference(reference).await? else {
            warn!(reference = %reference, "settle notice for unknown payment reference; ignored");
            return Ok(());
        };
        if payment.status == PaymentStatus::Success {
            return Ok(());
        }

        let won = self
            .payments
            .mark_success(reference, provider_ref, Utc::now())
            .await?;
        if !won {
            return Ok(());
        }
        info!(
            payment_id = payment.id,
            order_id = payment.order_id,
            "payment settled"
        );

        if let Err(e) = self.orders.activate_on_payment(payment.order_id).await {
            error!(
                payment_id = payment.id,
                order_id = payment.order_id,
                error = %e,
                "payment settled but order activation failed; flagged for repair"
            );
            self.activation_failures.lock().await.push(payment.id);
        }
        Ok(())
    }

    async fn authorize_tenant(
        &self,
        actor: Actor,
        payment: &PaymentRecord,
    ) -> Result<(), MarketError> {
        let order = self
            .orders
            .order(payment.order_id)
            .await?
            .ok_or(MarketError::NotFound("order"))?;
        if order.tenant_uid != actor.uid && !actor.operator {
            return Err(MarketError::Forbidden("not your payment"));
        }
        Ok(())
    }
}

fn fresh_reference() -> String {
    format!("PAY{}", Uuid::new_v4().simple())
}

fn hosted_page(payment_id: i64) -> RedirectTarget {
    RedirectTarget::HostedPage(format!("/pay/{payment_id}"))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::store::MemoryPaymentStore;
    use async_trait::async_trait;
    use lsk_directory::{
        Availability, MemoryDirectory, PricingTiers, ResourceDirectory, ResourceRecord,
    };
    use lsk_lock::LocalLockService;
    use lsk_orders::{
        LeaseTerm, MemoryOrderStore, NoDisputes, OrderEngine, OrderEngineConfig,
    };

    const KEY: &[u8] = b"test-signing-key";
    const OWNER: i64 = 10;
    const TENANT: i64 = 20;
    const RESOURCE: i64 = 1;

    /// Scriptable gateway double.
    struct StubGateway {
        pay_ok: bool,
        query_status: &'static str,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn pay(&self, req: &GatewayPayRequest) -> Result<String, GatewayError> {
            if self.pay_ok {
                Ok(format!("https://pay.example/checkout/{}", req.reference))
            } else {
                Err(GatewayError::Unavailable("connection refused".to_string()))
            }
        }

        async fn query(&self, _reference: &str) -> Result<String, GatewayError> {
            Ok(self.query_status.to_string())
        }
    }

    struct Harness {
        orders: Arc<OrderEngine>,
        payments: Arc<MemoryPaymentStore>,
        engine: PaymentEngine,
        directory: Arc<MemoryDirectory>,
    }

    async fn harness(gateway: StubGateway) -> Harness {
        let directory = Arc::new(MemoryDirectory::new());
        directory
            .put(ResourceRecord {
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

        let orders = Arc::new(OrderEngine::new(
            Arc::new(MemoryOrderStore::new()),
            Arc::clone(&directory) as Arc<dyn ResourceDirectory>,
            Arc::new(LocalLockService::new()),
            Arc::new(NoDisputes),
            OrderEngineConfig::default(),
        ));
        let payments = Arc::new(MemoryPaymentStore::new());
        let engine = PaymentEngine::new(
            Arc::clone(&payments) as Arc<dyn PaymentStore>,
            Arc::clone(&orders),
            Arc::new(gateway),
            KEY.to_vec(),
            PaymentEngineConfig {
                notify_url: "http://localhost:8710/v1/payments/notify".to_string(),
                return_url: "http://localhost:8710/orders".to_string(),
            },
        );
        Harness {
            orders,
            payments,
            engine,
            directory,
        }
    }

    async fn awaiting_order(h: &Harness) -> i64 {
        h.orders
            .create(Actor::user(TENANT), RESOURCE, LeaseTerm::hours(2))
            .await
            .unwrap()
            .id
    }

    fn signed_callback(reference: &str, trade_status: &str) -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert(PARAM_REFERENCE.to_string(), reference.to_string());
        params.insert(PARAM_TRADE_STATUS.to_string(), trade_status.to_string());
        params.insert(PARAM_PROVIDER_TXN.to_string(), "PROV42".to_string());
        let sig = signature::sign(&params, KEY);
        params.insert(signature::SIGN_PARAM.to_string(), sig);
        params
    }

    #[tokio::test]
    async fn create_payment_charges_rent_plus_deposit() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;

        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();
        assert_eq!(intent.payment.amount_cents, 4000);
        assert_eq!(intent.payment.status, PaymentStatus::Pending);
        assert!(matches!(intent.redirect, RedirectTarget::Provider(_)));
    }

    #[tokio::test]
    async fn create_payment_is_idempotent_per_order_and_method() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;

        let first = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();
        let second = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        assert_eq!(first.payment.id, second.payment.id);
        assert_eq!(first.payment.txn_ref, second.payment.txn_ref);
        assert_eq!(h.payments.len().await, 1, "no second row may appear");
    }

    #[tokio::test]
    async fn create_payment_guards_actor_and_state() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;

        let err = h
            .engine
            .create_payment(Actor::user(999), order_id, PayMethod::Gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::Forbidden(_)));

        h.orders
            .cancel(Actor::user(TENANT), order_id)
            .await
            .unwrap();
        let err = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, MarketError::WrongState { .. }));
    }

    #[tokio::test]
    async fn gateway_failure_falls_back_to_hosted_page() {
        let h = harness(StubGateway {
            pay_ok: false,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;

        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();
        let RedirectTarget::HostedPage(path) = intent.redirect else {
            panic!("expected hosted-page fallback");
        };
        assert_eq!(path, format!("/pay/{}", intent.payment.id));
        assert_eq!(
            h.payments.len().await,
            1,
            "fallback must not fail the request or drop the record"
        );
    }

    #[tokio::test]
    async fn manual_method_always_uses_hosted_page() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;

        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Manual)
            .await
            .unwrap();
        assert!(matches!(intent.redirect, RedirectTarget::HostedPage(_)));
    }

    #[tokio::test]
    async fn invalid_signature_changes_nothing() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        let mut params = signed_callback(&intent.payment.txn_ref, TRADE_SUCCESS);
        params.insert(signature::SIGN_PARAM.to_string(), "00ff00ff".to_string());

        let err = h.engine.handle_callback(&params).await.unwrap_err();
        assert_eq!(err, MarketError::SignatureInvalid);

        let payment = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(
            h.orders.order(order_id).await.unwrap().unwrap().status,
            OrderStatus::AwaitingPayment
        );
    }

    #[tokio::test]
    async fn verified_success_settles_and_activates() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        h.engine
            .handle_callback(&signed_callback(&intent.payment.txn_ref, TRADE_SUCCESS))
            .await
            .unwrap();

        let payment = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.provider_ref.as_deref(), Some("PROV42"));

        let order = h.orders.order(order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(
            h.directory.get(RESOURCE).await.unwrap().unwrap().availability,
            Availability::InUse
        );
        assert!(h.engine.activation_failures().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_delivery_is_a_noop() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        let params = signed_callback(&intent.payment.txn_ref, TRADE_SUCCESS);
        h.engine.handle_callback(&params).await.unwrap();
        let first = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();

        h.engine.handle_callback(&params).await.unwrap();
        let second = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first, second, "second delivery must change nothing");
        assert!(h.engine.activation_failures().await.is_empty());
    }

    #[tokio::test]
    async fn trade_closed_marks_failed() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        h.engine
            .handle_callback(&signed_callback(&intent.payment.txn_ref, TRADE_CLOSED))
            .await
            .unwrap();

        let payment = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(
            h.orders.order(order_id).await.unwrap().unwrap().status,
            OrderStatus::AwaitingPayment
        );
    }

    #[tokio::test]
    async fn unknown_reference_is_logged_and_ignored() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let _ = awaiting_order(&h).await;

        h.engine
            .handle_callback(&signed_callback("PAY-nobody", TRADE_SUCCESS))
            .await
            .unwrap();
        assert_eq!(h.payments.len().await, 0);
    }

    #[tokio::test]
    async fn amount_mismatch_drops_the_delivery() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        let mut params = BTreeMap::new();
        params.insert(
            PARAM_REFERENCE.to_string(),
            intent.payment.txn_ref.clone(),
        );
        params.insert(PARAM_TRADE_STATUS.to_string(), TRADE_SUCCESS.to_string());
        params.insert(PARAM_TOTAL_AMOUNT.to_string(), "0.01".to_string());
        let sig = signature::sign(&params, KEY);
        params.insert(signature::SIGN_PARAM.to_string(), sig);

        h.engine.handle_callback(&params).await.unwrap();
        let payment = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn activation_failure_is_surfaced_not_retried() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        // The stale-payment sweep wins the race: order is cancelled before
        // the callback lands.
        h.orders
            .cancel(Actor::user(TENANT), order_id)
            .await
            .unwrap();

        h.engine
            .handle_callback(&signed_callback(&intent.payment.txn_ref, TRADE_SUCCESS))
            .await
            .unwrap();

        let payment = h
            .payments
            .get(intent.payment.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            payment.status,
            PaymentStatus::Success,
            "payment commit precedes activation and must stand"
        );
        assert_eq!(
            h.orders.order(order_id).await.unwrap().unwrap().status,
            OrderStatus::Cancelled
        );
        assert_eq!(h.engine.activation_failures().await, vec![intent.payment.id]);
    }

    #[tokio::test]
    async fn poll_reconciles_like_the_webhook() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: TRADE_SUCCESS,
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        let status = h
            .engine
            .poll_status(Actor::user(TENANT), intent.payment.id)
            .await
            .unwrap();
        assert_eq!(status, PaymentStatus::Success);
        assert_eq!(
            h.orders.order(order_id).await.unwrap().unwrap().status,
            OrderStatus::Active
        );
    }

    #[tokio::test]
    async fn poll_maps_wait_status_to_pending() {
        let h = harness(StubGateway {
            pay_ok: true,
            query_status: "wait-buyer-pay",
        })
        .await;
        let order_id = awaiting_order(&h).await;
        let intent = h
            .engine
            .create_payment(Actor::user(TENANT), order_id, PayMethod::Gateway)
            .await
            .unwrap();

        let status = h
            .engine
            .poll_status(Actor::user(TENANT), intent.payment.id)
            .await
            .unwrap();
        assert_eq!(status, PaymentStatus::Pending);
    }
}
