use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

// Public surfaces that never require the API key.
const EXEMPT_PATHS: &[&str] = &["/fraud/collector.js", "/openapi.json", "/docs", "/redoc"];

/// API-key middleware with a constant-time comparison.
pub async fn api_key_middleware(
    State(api_key): State<String>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    if EXEMPT_PATHS.contains(&req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let provided = req
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if bool::from(provided.as_bytes().ct_eq(api_key.as_bytes())) {
        Ok(next.run(req).await)
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({"detail": "Invalid or missing API key"})),
        )
            .into_response())
    }
}
