//! Scenario: dispute open and resolution over the HTTP surface.
//!
//! Order active → appeal opened → order `disputed`; a second appeal is a
//! conflict; resolving with a verdict closes the order and **delists** the
//! resource (never relists), and requires resolver privilege.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt; // oneshot

use lsk_daemon::{routes, state::AppState};
use lsk_directory::{
    Availability, MemoryDirectory, PricingTiers, ResourceDirectory, ResourceRecord,
};
use lsk_payment::signature;

const KEY: &[u8] = b"scenario-signing-key";
const OWNER: i64 = 10;
const TENANT: i64 = 20;
const RESOLVER: i64 = 99;
const RESOURCE: i64 = 1;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn make_state() -> (Arc<AppState>, Arc<MemoryDirectory>) {
    let (state, directory) = AppState::in_memory(KEY);
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
    (state, directory)
}

async fn call(
    state: &Arc<AppState>,
    req: Request<axum::body::Body>,
) -> (StatusCode, bytes::Bytes) {
    let resp = routes::build_router(Arc::clone(state))
        .oneshot(req)
        .await
        .expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn json_req(
    method: &str,
    uri: &str,
    uid: i64,
    operator: bool,
    body: serde_json::Value,
) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", uid.to_string())
        .header("content-type", "application/json");
    if operator {
        builder = builder.header("x-user-role", "operator");
    }
    builder
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn get_req(uri: &str, uid: i64, operator: bool) -> Request<axum::body::Body> {
    let mut builder = Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", uid.to_string());
    if operator {
        builder = builder.header("x-user-role", "operator");
    }
    builder.body(axum::body::Body::empty()).unwrap()
}

/// Drive an order to `active` through the public surface.
async fn active_order(state: &Arc<AppState>) -> i64 {
    let (_, body) = call(
        state,
        json_req(
            "POST",
            "/v1/orders",
            TENANT,
            false,
            serde_json::json!({"resource_id": RESOURCE, "unit": "hour", "duration": 2}),
        ),
    )
    .await;
    let order_id = parse_json(body)["id"].as_i64().unwrap();

    let (_, body) = call(
        state,
        json_req(
            "POST",
            "/v1/payments",
            TENANT,
            false,
            serde_json::json!({"order_id": order_id, "method": "gateway"}),
        ),
    )
    .await;
    let reference = parse_json(body)["payment"]["txn_ref"]
        .as_str()
        .unwrap()
        .to_string();

    let mut params = BTreeMap::new();
    params.insert("reference".to_string(), reference);
    params.insert("trade_status".to_string(), "trade-success".to_string());
    let sig = signature::sign(&params, KEY);
    params.insert(signature::SIGN_PARAM.to_string(), sig);
    let body = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let (status, _) = call(
        state,
        Request::builder()
            .method("POST")
            .uri("/v1/payments/notify")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(axum::body::Body::from(body))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    order_id
}

async fn availability(directory: &MemoryDirectory) -> Availability {
    directory.get(RESOURCE).await.unwrap().unwrap().availability
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn appeal_disputes_then_resolution_closes_and_delists() {
    let (state, directory) = make_state().await;
    let order_id = active_order(&state).await;

    // Open.
    let (status, body) = call(
        &state,
        json_req(
            "POST",
            "/v1/appeals",
            TENANT,
            false,
            serde_json::json!({
                "order_id": order_id,
                "category": "resource-fault",
                "evidence": ["https://files.example/shot1.png"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let appeal_id = parse_json(body)["id"].as_i64().unwrap();

    let (_, body) = call(&state, get_req(&format!("/v1/orders/{order_id}"), TENANT, false)).await;
    assert_eq!(parse_json(body)["status"], "disputed");

    // Second appeal conflicts.
    let (status, _) = call(
        &state,
        json_req(
            "POST",
            "/v1/appeals",
            OWNER,
            false,
            serde_json::json!({"order_id": order_id, "category": "deposit-dispute"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Resolution needs the resolver role.
    let (status, _) = call(
        &state,
        json_req(
            "POST",
            &format!("/v1/appeals/{appeal_id}/resolve"),
            TENANT,
            false,
            serde_json::json!({"verdict": "favor-tenant"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &state,
        json_req(
            "POST",
            &format!("/v1/appeals/{appeal_id}/resolve"),
            RESOLVER,
            true,
            serde_json::json!({"verdict": "favor-tenant"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let resolved = parse_json(body);
    assert_eq!(resolved["verdict"], "favor-tenant");
    assert_eq!(resolved["resolver_uid"], RESOLVER);
    assert!(!resolved["resolved_at"].is_null());

    // Order closed, resource delisted — not relisted.
    let (_, body) = call(&state, get_req(&format!("/v1/orders/{order_id}"), TENANT, false)).await;
    assert_eq!(parse_json(body)["status"], "closed");
    assert_eq!(availability(&directory).await, Availability::Delisted);

    // Double resolve conflicts.
    let (status, _) = call(
        &state,
        json_req(
            "POST",
            &format!("/v1/appeals/{appeal_id}/resolve"),
            RESOLVER,
            true,
            serde_json::json!({"verdict": "split"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn appeal_listing_is_operator_only() {
    let (state, _) = make_state().await;
    let order_id = active_order(&state).await;
    let (_, _) = call(
        &state,
        json_req(
            "POST",
            "/v1/appeals",
            TENANT,
            false,
            serde_json::json!({"order_id": order_id, "category": "other"}),
        ),
    )
    .await;

    let (status, _) = call(&state, get_req("/v1/appeals", TENANT, false)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(
        &state,
        get_req("/v1/appeals?state=unresolved", RESOLVER, true),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body).as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn appeal_on_unpaid_order_is_conflict() {
    let (state, _) = make_state().await;
    let (_, body) = call(
        &state,
        json_req(
            "POST",
            "/v1/orders",
            TENANT,
            false,
            serde_json::json!({"resource_id": RESOURCE, "unit": "hour", "duration": 1}),
        ),
    )
    .await;
    let order_id = parse_json(body)["id"].as_i64().unwrap();

    let (status, _) = call(
        &state,
        json_req(
            "POST",
            "/v1/appeals",
            TENANT,
            false,
            serde_json::json!({"order_id": order_id, "category": "other"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
