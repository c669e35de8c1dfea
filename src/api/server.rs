use std::net::SocketAddr;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use crate::api::routes::AppState;
use crate::api::{auth, routes};

/// Assemble the fraud API router. Split from [`serve`] so tests can drive it
/// directly.
pub fn build_router(state: AppState) -> Router {
    let cors = build_cors(&state.settings.api.allowed_hosts);

    let mut app = Router::new()
        .route("/fraud/check", post(routes::check_fraud))
        .route("/fraud/captcha/verify", post(routes::verify_captcha))
        .route("/fraud/collector.js", get(routes::collector_js))
        .route("/fraud/logs", get(routes::get_logs));

    if let Some(api_key) = state.settings.api.api_key.clone() {
        app = app.layer(middleware::from_fn_with_state(
            api_key,
            auth::api_key_middleware,
        ));
    }

    app.layer(cors).with_state(state)
}

fn build_cors(allowed_hosts: &[String]) -> CorsLayer {
    let origin = if allowed_hosts.iter().any(|host| host == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_hosts
            .iter()
            .filter_map(|host| match host.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(origin = %host, "Ignoring unparseable allowed origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Bind and serve until the process is shut down.
pub async fn serve(state: AppState, bind_addr: &str) -> anyhow::Result<()> {
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Fraud API listening on {}", bind_addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
