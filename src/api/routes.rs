use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::api::client_ip::resolve_request_ip;
use crate::api::collector::build_collector_script;
use crate::config::settings::Settings;
use crate::models::payload::{CaptchaVerifyRequest, FraudCheckRequest};
use crate::models::response::FraudCheckResponse;
use crate::pipeline::FraudPipeline;
use crate::storage::sqlite::{FraudLogRow, SqliteAuditStore};

/// Shared handler state; everything long-lived sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<FraudPipeline>,
    pub audit_store: Arc<SqliteAuditStore>,
    pub settings: Arc<Settings>,
}

/// Machine-readable protocol error: `{"detail": "<code>"}` with a status.
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, detail)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({"detail": self.detail})),
        )
            .into_response()
    }
}

/// The Origin header, absent when missing or the literal "null".
fn extract_origin(headers: &HeaderMap) -> Option<String> {
    let origin = headers.get(header::ORIGIN)?.to_str().ok()?.trim();
    if origin.is_empty() || origin.eq_ignore_ascii_case("null") {
        return None;
    }
    Some(origin.to_string())
}

pub async fn check_fraud(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<FraudCheckRequest>,
) -> Result<Json<FraudCheckResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::unprocessable(e.to_string()))?;

    let request_ip = resolve_request_ip(&headers, Some(peer), state.settings.fraud.trust_forwarded_ip);
    let origin = extract_origin(&headers);

    let response = state
        .pipeline
        .check(&payload, request_ip.as_deref(), &headers, origin.as_deref())
        .await;
    Ok(Json(response))
}

pub async fn verify_captcha(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<CaptchaVerifyRequest>,
) -> Result<Json<FraudCheckResponse>, ApiError> {
    payload
        .validate()
        .map_err(|e| ApiError::unprocessable(e.to_string()))?;

    let request_ip = resolve_request_ip(&headers, Some(peer), state.settings.fraud.trust_forwarded_ip);
    let origin = extract_origin(&headers);

    let response = state
        .pipeline
        .verify_captcha(
            &payload.challenge_id,
            &payload.captcha_token,
            request_ip.as_deref(),
            origin.as_deref(),
        )
        .await
        .map_err(|e| {
            let status = if e.is_not_found() {
                StatusCode::NOT_FOUND
            } else {
                StatusCode::BAD_REQUEST
            };
            ApiError::new(status, e.to_string())
        })?;
    Ok(Json(response))
}

pub async fn collector_js(State(state): State<AppState>) -> Response {
    let script = build_collector_script(&state.settings.fraud.turnstile_js_url);
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        script,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LogsPage {
    pub items: Vec<FraudLogRow>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<LogsPage>, ApiError> {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(50);
    if page < 1 {
        return Err(ApiError::unprocessable("page: must be at least 1"));
    }
    if !(1..=100).contains(&page_size) {
        return Err(ApiError::unprocessable(
            "page_size: must be between 1 and 100",
        ));
    }

    let (items, total) = state.audit_store.get_page(page, page_size).map_err(|e| {
        error!(error = %e, "Failed to load fraud check logs");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "failed to load logs")
    })?;

    let total_pages = total.div_ceil(page_size);
    Ok(Json(LogsPage {
        items,
        total,
        page,
        page_size,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    }))
}
