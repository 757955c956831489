use affiliate_commissions::{
    CommissionEngine, CommissionResult, DrilldownPage, MemberMatch, NetworkNode, NetworkStats,
};
use affiliate_core::{MemberId, ReportRange};
use axum::{
    async_trait,
    extract::{FromRequestParts, Query, State},
    http::request::Parts,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::error::ApiError;

/// Header carrying the member identity resolved by the fronting auth layer.
pub const CALLER_HEADER: &str = "x-member-id";

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CommissionEngine>,
    pub database: Option<PgPool>,
}

/// The authenticated member making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub MemberId);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<MemberId>().ok())
            .filter(|id| *id > 0)
            .map(Self)
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Successful response: the payload's fields plus `"success": true`.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Success<T> {
    pub const fn new(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

/// Query parameters, kept as raw strings so malformed values fall back to
/// defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct CommissionsQuery {
    pub user_id: Option<String>,
    pub depth: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DrilldownQuery {
    pub user_id: Option<String>,
    pub level: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NetworkQuery {
    pub user_id: Option<String>,
    pub depth: Option<String>,
    pub range: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub range: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NetworkResponse {
    pub data: Option<NetworkNode>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub users: Vec<MemberMatch>,
}

fn int_param(raw: Option<&String>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

fn range_param(raw: Option<&String>) -> ReportRange {
    raw.map_or_else(ReportRange::default, |value| ReportRange::parse_lenient(value))
}

/// Resolves the member to report on: a positive `user_id` override when one
/// parses, otherwise the caller.
fn target_member(caller: CallerId, raw: Option<&String>) -> MemberId {
    int_param(raw).filter(|id| *id > 0).unwrap_or(caller.0)
}

/// GET /api/commissions - per-level totals for the caller's downline.
///
/// # Errors
/// Returns 401 without a caller identity, 500 if computation fails.
pub async fn get_commissions(
    State(state): State<AppState>,
    caller: CallerId,
    Query(query): Query<CommissionsQuery>,
) -> Result<Json<Success<CommissionResult>>, ApiError> {
    let member = target_member(caller, query.user_id.as_ref());
    let result = state
        .engine
        .commissions(
            member,
            int_param(query.depth.as_ref()),
            range_param(query.range.as_ref()),
        )
        .await?;

    Ok(Success::new(CommissionResult::clone(&result)))
}

/// GET /api/commissions/details - one page of transactions at a level.
///
/// # Errors
/// Returns 401 without a caller identity, 500 if a query fails.
pub async fn get_commission_details(
    State(state): State<AppState>,
    caller: CallerId,
    Query(query): Query<DrilldownQuery>,
) -> Result<Json<Success<DrilldownPage>>, ApiError> {
    let member = target_member(caller, query.user_id.as_ref());
    let page = state
        .engine
        .drilldown(
            member,
            int_param(query.level.as_ref()).unwrap_or(1),
            int_param(query.page.as_ref()).unwrap_or(1),
            int_param(query.per_page.as_ref()),
        )
        .await?;

    Ok(Success::new(page))
}

/// GET /api/network/tree - nested downline with per-member revenue.
///
/// `data` is null when the member does not exist.
///
/// # Errors
/// Returns 401 without a caller identity, 500 if a query fails.
pub async fn get_network_tree(
    State(state): State<AppState>,
    caller: CallerId,
    Query(query): Query<NetworkQuery>,
) -> Result<Json<Success<NetworkResponse>>, ApiError> {
    let member = target_member(caller, query.user_id.as_ref());
    let data = state
        .engine
        .network_tree(
            member,
            int_param(query.depth.as_ref()),
            range_param(query.range.as_ref()),
        )
        .await?;

    Ok(Success::new(NetworkResponse { data }))
}

/// GET /api/network/search - members matching a partial name or email.
///
/// Queries shorter than two characters return an empty list.
///
/// # Errors
/// Returns 401 without a caller identity, 500 if the lookup fails.
pub async fn search_members(
    State(state): State<AppState>,
    _caller: CallerId,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Success<SearchResponse>>, ApiError> {
    let users = state
        .engine
        .search_members(query.q.as_deref().unwrap_or_default())
        .await?;

    Ok(Success::new(SearchResponse { users }))
}

/// GET /api/network/stats - membership-wide head counts and revenue.
///
/// # Errors
/// Returns 401 without a caller identity, 500 if a query fails.
pub async fn get_network_stats(
    State(state): State<AppState>,
    _caller: CallerId,
    Query(query): Query<StatsQuery>,
) -> Result<Json<Success<NetworkStats>>, ApiError> {
    let stats = state
        .engine
        .network_stats(range_param(query.range.as_ref()))
        .await?;

    Ok(Success::new(stats))
}
