//! Router tests driven through `tower::ServiceExt::oneshot`.

use affiliate_commissions::{CommissionEngine, InMemoryStore, ManualClock};
use affiliate_core::{CommissionSettings, TransactionStatus};
use affiliate_web_api::{ApiServer, CALLER_HEADER};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

// =============================================================================
// Helper Functions
// =============================================================================

fn app() -> (Router, Arc<InMemoryStore>) {
    let now = Utc.with_ymd_and_hms(2025, 8, 12, 9, 0, 0).unwrap();
    let store = Arc::new(InMemoryStore::new());
    store.add_member(1, "root", None);
    store.add_member(2, "alice", Some(1));
    store.add_member(3, "bob", Some(2));
    store.add_order(2, dec!(100), TransactionStatus::Completed, now);
    store.add_order(3, dec!(40), TransactionStatus::Completed, now);
    store.set_rates(vec![dec!(0.10), dec!(0.05)]);

    let engine = CommissionEngine::with_clock(
        store.backing_store(),
        CommissionSettings::default(),
        Arc::new(ManualClock::new(now)),
    );
    (ApiServer::new(Arc::new(engine)).router(), store)
}

async fn get(router: Router, uri: &str, caller: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(caller) = caller {
        request = request.header(CALLER_HEADER, caller);
    }
    let response = router
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// =============================================================================
// Commissions
// =============================================================================

#[tokio::test]
async fn commissions_returns_envelope_with_levels() {
    let (router, _) = app();

    let (status, body) = get(router, "/api/commissions?depth=2", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["depth"], 2);
    assert_eq!(body["perLevelSums"], serde_json::json!([100.0, 40.0]));
    assert_eq!(body["perLevelCounts"], serde_json::json!([1, 1]));
    assert_eq!(body["perLevelEarnings"], serde_json::json!([10.0, 2.0]));
    assert_eq!(body["commissionRates"], serde_json::json!(["10%", "5%"]));
    assert_eq!(body["user"]["username"], "root");
    assert!(body["generated_at"].is_string());
}

#[tokio::test]
async fn missing_caller_is_unauthorized() {
    let (router, _) = app();

    let (status, body) = get(router, "/api/commissions", None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Not authenticated");
}

#[tokio::test]
async fn malformed_params_fall_back_to_defaults() {
    let (router, _) = app();

    let (status, body) = get(
        router,
        "/api/commissions?depth=lots&range=fortnight",
        Some("1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["depth"], 9);
}

#[tokio::test]
async fn user_id_overrides_caller() {
    let (router, _) = app();

    let (status, body) = get(router, "/api/commissions?user_id=2&depth=1", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], 2);
    assert_eq!(body["perLevelSums"], serde_json::json!([40.0]));
}

#[tokio::test]
async fn malformed_user_id_falls_back_to_caller() {
    let (router, _) = app();

    let (status, body) = get(router.clone(), "/api/commissions?user_id=abc", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], 1);

    let (status, body) = get(
        router,
        "/api/commissions/details?user_id=-3&level=1",
        Some("1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["username"], "alice");
}

#[tokio::test]
async fn storage_failure_maps_to_500() {
    let (router, store) = app();
    store.fail_revenue_queries(true);

    let (status, body) = get(router, "/api/commissions?range=year", Some("1")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
}

// =============================================================================
// Drill-down and network tree
// =============================================================================

#[tokio::test]
async fn details_lists_level_transactions() {
    let (router, _) = app();

    let (status, body) = get(
        router,
        "/api/commissions/details?level=2&page=1&per_page=10",
        Some("1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["username"], "bob");
}

#[tokio::test]
async fn details_for_empty_level_is_empty_page() {
    let (router, store) = app();

    let (_, body) = get(router, "/api/commissions/details?level=7", Some("1")).await;

    assert_eq!(body["data"], serde_json::json!([]));
    assert_eq!(body["total"], 0);
    assert_eq!(store.query_counts().transactions, 0);
}

#[tokio::test]
async fn network_tree_nests_children() {
    let (router, _) = app();

    let (status, body) = get(router, "/api/network/tree", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["children"][0]["username"], "alice");
    assert_eq!(body["data"]["children"][0]["children"][0]["id"], 3);
}

#[tokio::test]
async fn network_tree_for_unknown_member_is_null() {
    let (router, _) = app();

    let (_, body) = get(router, "/api/network/tree?user_id=99", Some("1")).await;

    assert_eq!(body["success"], true);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn search_matches_members_and_ignores_short_queries() {
    let (router, store) = app();

    let (status, body) = get(router.clone(), "/api/network/search?q=ALI", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["users"][0]["username"], "alice");
    assert_eq!(body["users"].as_array().map(Vec::len), Some(1));

    store.reset_counts();
    let (status, body) = get(router, "/api/network/search?q=a", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"], serde_json::json!([]));
    assert_eq!(store.query_counts().members, 0);
}

#[tokio::test]
async fn stats_report_membership_and_revenue() {
    let (router, _) = app();

    let (status, body) = get(router, "/api/network/stats", Some("1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalUsers"], 3);
    assert_eq!(body["totalCommissions"], 140.0);
    assert_eq!(body["monthlyCommissions"], 140.0);
    assert_eq!(body["source"], "orders");
    assert_eq!(body["levelDistribution"][0]["count"], 3);
}

#[tokio::test]
async fn network_routes_require_caller() {
    let (router, _) = app();

    let (status, _) = get(router.clone(), "/api/network/stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(router, "/api/network/search?q=bob", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_without_database() {
    let (router, _) = app();

    let (status, body) = get(router, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["status"], "unconfigured");
}
