//! Axum router and all HTTP handlers for lsk-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and
//! attaches middleware layers. Handlers are thin: materialize the actor
//! from the identity headers, call the engine, map `MarketError` onto a
//! status code. The webhook route is the one surface with no identity —
//! it is signature-verified instead.

use std::collections::BTreeMap;
use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Form, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::error;

use lsk_directory::ResourceRecord;
use lsk_dispute::{AppealCategory, AppealState, Verdict};
use lsk_orders::{format_cents, Actor, DurationUnit, LeaseTerm, MarketError, OrderRole, OrderStatus};
use lsk_payment::PayMethod;

use crate::api_types::{
    CreateAppealRequest, CreateOrderRequest, CreatePaymentRequest, ErrorResponse, HealthResponse,
    ListAppealsQuery, ListOrdersQuery, OrderDetail, PaymentStatusResponse, RenewOrderRequest,
    ResolveAppealRequest,
};
use crate::state::{AppState, BusMsg};

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Newtype so `MarketError` can cross the handler boundary as a response.
pub struct ApiError(pub MarketError);

impl From<MarketError> for ApiError {
    fn from(e: MarketError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use MarketError::*;
        let status = match &self.0 {
            Validation(_) | InvalidDuration(_) | SignatureInvalid => StatusCode::BAD_REQUEST,
            Unauthorized => StatusCode::UNAUTHORIZED,
            Forbidden(_) | SelfLeaseForbidden => StatusCode::FORBIDDEN,
            NotFound(_) => StatusCode::NOT_FOUND,
            ResourceUnavailable | DuplicateOrder | DuplicateAppeal | WrongState { .. }
            | LockTimeout => StatusCode::CONFLICT,
            External(_) => StatusCode::BAD_GATEWAY,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Identity context from the gateway-validated headers. Real auth is the
/// perimeter's job; here a missing header is simply `Unauthorized`.
fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
    let uid = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(ApiError(MarketError::Unauthorized))?;
    let operator = headers
        .get("x-user-role")
        .and_then(|v| v.to_str().ok())
        .map(|r| r.eq_ignore_ascii_case("operator"))
        .unwrap_or(false);
    Ok(Actor { uid, operator })
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/orders", post(create_order).get(list_orders))
        .route("/v1/orders/:id", get(get_order))
        .route("/v1/orders/:id/renew", post(renew_order))
        .route("/v1/orders/:id/return", post(return_order))
        .route("/v1/orders/:id/cancel", post(cancel_order))
        .route("/v1/payments", post(create_payment))
        .route("/v1/payments/notify", post(payment_notify))
        .route("/v1/payments/:id", get(get_payment))
        .route("/v1/payments/:id/refresh", post(refresh_payment))
        .route("/pay/:id", get(pay_page))
        .route("/v1/appeals", post(create_appeal).get(list_appeals))
        .route("/v1/appeals/:id", get(get_appeal))
        .route("/v1/appeals/:id/resolve", post(resolve_appeal))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service,
            version: st.build.version,
        }),
    )
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

pub(crate) async fn create_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderDetail>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = st
        .orders
        .create(
            actor,
            req.resource_id,
            LeaseTerm {
                unit: DurationUnit::parse(&req.unit)?,
                duration: req.duration,
            },
        )
        .await?;
    Ok(Json(OrderDetail::bare(order, Utc::now())))
}

pub(crate) async fn list_orders(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderDetail>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let role = match query.role.as_deref() {
        None => OrderRole::Tenant,
        Some(s) => OrderRole::parse(s)?,
    };
    let status = query
        .status
        .as_deref()
        .map(OrderStatus::parse)
        .transpose()?;

    let now = Utc::now();
    let orders = st.orders.list(actor, role, status).await?;
    Ok(Json(
        orders
            .into_iter()
            .map(|o| OrderDetail::bare(o, now))
            .collect(),
    ))
}

pub(crate) async fn get_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetail>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let (order, resource) = st.orders.get_authorized(actor, order_id).await?;
    Ok(Json(detail_with_credentials(&st, actor, order, &resource).await))
}

/// Attach decrypted credentials for the tenant of an `active` lease. A
/// vault failure is logged and the field omitted — the read path never
/// fails on it.
async fn detail_with_credentials(
    st: &AppState,
    actor: Actor,
    order: lsk_orders::LeaseOrder,
    resource: &ResourceRecord,
) -> OrderDetail {
    let mut detail = OrderDetail::bare(order, Utc::now());
    let expose = detail.order.tenant_uid == actor.uid && detail.order.status == OrderStatus::Active;
    if !expose {
        return detail;
    }

    if let Some(blob) = &resource.login_enc {
        match st.vault.decrypt(blob, resource.id).await {
            Ok(login) => detail.login = Some(login),
            Err(e) => error!(resource_id = resource.id, error = %e, "login decrypt failed"),
        }
    }
    if let Some(blob) = &resource.secret_enc {
        match st.vault.decrypt(blob, resource.id).await {
            Ok(secret) => detail.secret = Some(secret),
            Err(e) => error!(resource_id = resource.id, error = %e, "secret decrypt failed"),
        }
    }
    detail
}

pub(crate) async fn renew_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
    Json(req): Json<RenewOrderRequest>,
) -> Result<Json<OrderDetail>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = st
        .orders
        .renew(
            actor,
            order_id,
            LeaseTerm {
                unit: DurationUnit::parse(&req.unit)?,
                duration: req.duration,
            },
        )
        .await?;
    Ok(Json(OrderDetail::bare(order, Utc::now())))
}

pub(crate) async fn return_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetail>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = st.orders.return_lease(actor, order_id, Utc::now()).await?;
    Ok(Json(OrderDetail::bare(order, Utc::now())))
}

pub(crate) async fn cancel_order(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(order_id): Path<i64>,
) -> Result<Json<OrderDetail>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let order = st.orders.cancel(actor, order_id).await?;
    Ok(Json(OrderDetail::bare(order, Utc::now())))
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

pub(crate) async fn create_payment(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<Json<lsk_payment::PaymentIntent>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let intent = st
        .payments
        .create_payment(actor, req.order_id, PayMethod::parse(&req.method)?)
        .await?;
    Ok(Json(intent))
}

pub(crate) async fn get_payment(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(payment_id): Path<i64>,
) -> Result<Json<lsk_payment::PaymentRecord>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let payment = st.payments.get_payment(actor, payment_id).await?;
    Ok(Json(payment))
}

/// The poll fallback: ask the provider and reconcile, for when no webhook
/// has arrived.
pub(crate) async fn refresh_payment(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(payment_id): Path<i64>,
) -> Result<Json<PaymentStatusResponse>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let status = st.payments.poll_status(actor, payment_id).await?;
    Ok(Json(PaymentStatusResponse { status }))
}

/// Inbound provider webhook. No identity headers — the signature is the
/// authentication. The body mirrors the provider's retry protocol: plain
/// "success"/"failure" text.
pub(crate) async fn payment_notify(
    State(st): State<Arc<AppState>>,
    Form(params): Form<BTreeMap<String, String>>,
) -> Response {
    match st.payments.handle_callback(&params).await {
        Ok(()) => (StatusCode::OK, "success").into_response(),
        Err(MarketError::SignatureInvalid) => (StatusCode::BAD_REQUEST, "failure").into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

/// Hosted payment-simulation page — the explicit fallback target when the
/// gateway is unavailable or unconfigured.
pub(crate) async fn pay_page(
    State(st): State<Arc<AppState>>,
    Path(payment_id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    let payment = st.payments.payment_for_page(payment_id).await?;
    Ok(Html(format!(
        "<!doctype html>\n<html><head><title>Payment {id}</title></head><body>\
         <h1>Payment simulation</h1>\
         <p>Payment <b>{id}</b> for order <b>{order}</b></p>\
         <p>Amount: <b>{amount}</b> &mdash; status: <b>{status}</b></p>\
         <p>This page stands in for the provider checkout. Settlement is \
         driven by the signed callback to <code>/v1/payments/notify</code>.</p>\
         </body></html>",
        id = payment.id,
        order = payment.order_id,
        amount = format_cents(payment.amount_cents),
        status = payment.status.as_str(),
    )))
}

// ---------------------------------------------------------------------------
// Appeals
// ---------------------------------------------------------------------------

pub(crate) async fn create_appeal(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateAppealRequest>,
) -> Result<Json<lsk_dispute::Appeal>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let appeal = st
        .disputes
        .open(
            actor,
            req.order_id,
            AppealCategory::parse(&req.category)?,
            req.evidence,
        )
        .await?;
    Ok(Json(appeal))
}

pub(crate) async fn list_appeals(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListAppealsQuery>,
) -> Result<Json<Vec<lsk_dispute::Appeal>>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let state_filter = query.state.as_deref().map(AppealState::parse).transpose()?;
    let appeals = st.disputes.list(actor, state_filter).await?;
    Ok(Json(appeals))
}

pub(crate) async fn get_appeal(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(appeal_id): Path<i64>,
) -> Result<Json<lsk_dispute::Appeal>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let appeal = st.disputes.get(actor, appeal_id).await?;
    Ok(Json(appeal))
}

pub(crate) async fn resolve_appeal(
    State(st): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(appeal_id): Path<i64>,
    Json(req): Json<ResolveAppealRequest>,
) -> Result<Json<lsk_dispute::Appeal>, ApiError> {
    let actor = actor_from_headers(&headers)?;
    let appeal = st
        .disputes
        .resolve(actor, appeal_id, Verdict::parse(&req.verdict)?)
        .await?;
    Ok(Json(appeal))
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);
    Sse::new(events).keep_alive(KeepAlive::new()).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let event_name = match &m {
                    BusMsg::Heartbeat { .. } => "heartbeat",
                    BusMsg::Notice { .. } => "notice",
                };
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(event_name).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
