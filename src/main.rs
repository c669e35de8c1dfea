use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vigil::api::routes::AppState;
use vigil::api::server;
use vigil::challenge::ChallengeStore;
use vigil::clients::captcha::TurnstileVerifier;
use vigil::clients::ip_geo::IpApiGeoClient;
use vigil::clients::{CaptchaVerifier, IpGeoResolver};
use vigil::config::settings::Settings;
use vigil::counters::behavior_similarity::BehaviorSimilarityDetector;
use vigil::counters::fingerprint_velocity::FingerprintVelocityTracker;
use vigil::counters::rate_limiter::IpRateLimiter;
use vigil::pipeline::FraudPipeline;
use vigil::storage::sqlite::SqliteAuditStore;

/// Initialise the `tracing` subscriber: human-readable locally, JSON lines
/// in prod.
fn init_tracing(prod: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,vigil=debug"));

    if prod {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---------------------------------------------------------------
    // 1. Configuration & logging
    // ---------------------------------------------------------------
    let settings = Arc::new(Settings::load()?);
    init_tracing(settings.is_prod());

    info!(
        env = %settings.env,
        version = %settings.api.version,
        "Starting Vigil fraud-scoring service"
    );

    // ---------------------------------------------------------------
    // 2. Storage
    // ---------------------------------------------------------------
    let audit_store = Arc::new(
        SqliteAuditStore::new(&settings.storage.sqlite_path)
            .context("Failed to initialise audit log store")?,
    );
    info!(path = %settings.storage.sqlite_path, "Audit log store initialised");

    // ---------------------------------------------------------------
    // 3. External clients
    // ---------------------------------------------------------------
    let http = reqwest::Client::builder()
        .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let ip_geo: Arc<dyn IpGeoResolver> =
        Arc::new(IpApiGeoClient::new(http.clone(), &settings.fraud));
    let captcha: Arc<dyn CaptchaVerifier> = Arc::new(TurnstileVerifier::new(http, &settings.fraud));

    if settings.fraud.ip_geolocation_enabled {
        info!(base_url = %settings.fraud.ip_geolocation_base_url, "IP geolocation enabled");
    } else {
        info!("IP geolocation disabled");
    }
    if captcha.is_configured() {
        info!("Turnstile captcha challenges enabled");
    } else {
        info!("Turnstile captcha not configured; review verdicts carry no challenge");
    }

    // ---------------------------------------------------------------
    // 4. Counters, challenge store, pipeline
    // ---------------------------------------------------------------
    let rate_limiter = Arc::new(IpRateLimiter::new(
        settings.fraud.rate_limit_window_seconds,
        settings.fraud.rate_limit_max_requests_per_ip,
    ));
    let challenges = Arc::new(ChallengeStore::new(
        settings.fraud.turnstile_challenge_ttl_seconds,
        settings.fraud.turnstile_max_attempts,
    ));
    let velocity = Arc::new(FingerprintVelocityTracker::new(&settings.fraud));
    let similarity = Arc::new(BehaviorSimilarityDetector::new(&settings.fraud));

    let pipeline = Arc::new(FraudPipeline::new(
        settings.fraud.clone(),
        rate_limiter,
        ip_geo,
        captcha,
        challenges,
        velocity,
        similarity,
        audit_store.clone(),
    ));

    info!("Scoring pipeline initialised");

    // ---------------------------------------------------------------
    // 5. Serve until shutdown
    // ---------------------------------------------------------------
    let state = AppState {
        pipeline,
        audit_store,
        settings: settings.clone(),
    };
    let bind_addr = format!("{}:{}", settings.api.host, settings.api.port);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server::serve(state, &bind_addr).await {
            error!("Fraud API server error: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down Vigil...");
    server_handle.abort();

    Ok(())
}
