//! Flock API Gateway
//!
//! The HTTP entry point for the social API.
//! Handles:
//! - Authentication (JWT bearer tokens)
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    extract::{FromRef, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use flock_common::{
    auth::JwtManager,
    config::AppConfig,
    db::{schema, DbPool},
    errors::Result,
    runtime, VERSION,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitState};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Load configuration (.env first, then files and APP__ variables)
    let config = Arc::new(AppConfig::load()?);

    runtime::init_tracing(&config.observability);
    info!(
        service = %config.observability.service_name,
        "Starting Flock API Gateway v{}", VERSION
    );

    runtime::install_metrics(config.observability.metrics_port)?;

    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    if config.database.auto_migrate {
        schema::create_all(db.write()).await?;
        info!("Schema ready");
    }

    if config.auth.jwt_secret == "change-me" {
        warn!("auth.jwt_secret is the built-in default; set APP__AUTH__JWT_SECRET");
    }
    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_secs,
    ));

    let state = AppState {
        config: config.clone(),
        db,
        jwt,
    };

    let app = create_router(state)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // In-flight requests get `shutdown_timeout` to finish once the signal fires
    let (signalled_tx, signalled_rx) = oneshot::channel();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            runtime::shutdown_signal().await;
            let _ = signalled_tx.send(());
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        _ = runtime::shutdown_deadline(signalled_rx, config.shutdown_timeout()) => {
            warn!(
                timeout_secs = config.server.shutdown_timeout_secs,
                "Connections still open after shutdown timeout, exiting"
            );
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router> {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Auth endpoints
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/token", post(handlers::auth::token))
        .route("/auth/token/refresh", post(handlers::auth::refresh))
        .route(
            "/auth/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )

        // Social graph
        .route("/users/{username}", get(handlers::users::get_user))
        .route("/users/{username}/follow", post(handlers::users::follow))
        .route("/users/{username}/unfollow", post(handlers::users::unfollow))

        // Tweets
        .route(
            "/tweets",
            get(handlers::tweets::list_tweets).post(handlers::tweets::create_tweet),
        )
        .route("/tweets/popular-hashtags", get(handlers::tweets::popular_hashtags))
        .route(
            "/tweets/{id}",
            get(handlers::tweets::get_tweet).delete(handlers::tweets::delete_tweet),
        )
        .route("/tweets/{id}/like", post(handlers::tweets::like_tweet))
        .route("/tweets/{id}/retweet", post(handlers::tweets::retweet_tweet))

        // Timeline
        .route("/feed", get(handlers::timeline::feed))
        .route("/notifications", get(handlers::timeline::notifications))

        // Reporting
        .route("/active-users", get(handlers::stats::active_users))
        .route("/stats/deletions", get(handlers::stats::deletion_statistics))
        .route_layer(from_fn(middleware::metrics::track_metrics));

    let mut app = Router::new().nest("/api", api_routes);

    if state.config.rate_limit.enabled {
        let limiter = RateLimitState::from_config(&state.config.rate_limit)?;
        app = app.layer(from_fn_with_state(limiter, rate_limit_middleware));
    }

    let app = app
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(trace)
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state);

    Ok(app)
}
