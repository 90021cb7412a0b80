use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use domain::services::stores::{BadgeRegistry, LocationStore};
use persistence::repositories::{BadgeRepository, LocationSampleRepository};

use crate::config::{Config, SharedConfig};
use crate::feeds::{ChangeFeedHub, PresenceFeedHub};
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{badges, health, presence, samples, tracking};
use crate::services::{PresenceMonitorRegistry, TrackingSessionManager};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: SharedConfig,
    pub change_feed: ChangeFeedHub,
    pub presence_feed: PresenceFeedHub,
    pub monitors: PresenceMonitorRegistry,
    pub sessions: TrackingSessionManager,
}

/// Builds the shared application state: feed hubs, the presence monitor
/// registry, and the tracking session manager, all wired to the
/// Postgres-backed stores.
pub fn create_state(config: Config, pool: PgPool) -> AppState {
    let config = Arc::new(config);

    let change_feed = ChangeFeedHub::new(config.tracking.feed_capacity);
    let presence_feed = PresenceFeedHub::new(config.presence.feed_capacity);

    let store: Arc<dyn LocationStore> = Arc::new(LocationSampleRepository::new(pool.clone()));
    let registry: Arc<dyn BadgeRegistry> = Arc::new(BadgeRepository::new(pool.clone()));

    let monitors = PresenceMonitorRegistry::new(
        config.presence_config(),
        Arc::clone(&store),
        presence_feed.clone(),
        change_feed.clone(),
    );
    let sessions = TrackingSessionManager::new(
        config.tracking_config(),
        config.tracking.feed_capacity,
        store,
        registry,
        change_feed.clone(),
    );

    AppState {
        pool,
        config,
        change_feed,
        presence_feed,
        monitors,
        sessions,
    }
}

pub fn create_app(state: AppState) -> Router {
    // Build CORS layer based on configuration
    let cors = if state.config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = state
            .config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Request-scoped routes get the timeout and compression layers.
    let api_routes = Router::new()
        .route(
            "/api/v1/badges/:badge_id",
            get(badges::get_badge).patch(badges::update_badge),
        )
        .route("/api/v1/locations", post(samples::record_sample))
        .route(
            "/api/v1/badges/:badge_id/locations",
            get(samples::get_sample_history),
        )
        .route(
            "/api/v1/badges/:badge_id/presence",
            get(presence::get_presence),
        )
        .route(
            "/api/v1/badges/:badge_id/tracking",
            get(tracking::get_tracking),
        )
        .route(
            "/api/v1/badges/:badge_id/tracking/start",
            post(tracking::start_tracking),
        )
        .route(
            "/api/v1/badges/:badge_id/tracking/stop",
            post(tracking::stop_tracking),
        )
        .route(
            "/api/v1/badges/:badge_id/tracking/fixes",
            post(tracking::push_fix),
        )
        .route_layer(TimeoutLayer::new(Duration::from_secs(
            state.config.server.request_timeout_secs,
        )))
        .route_layer(CompressionLayer::new());

    // Live feeds stay open indefinitely, so no timeout and no response
    // compression (gzip would buffer the event stream).
    let feed_routes = Router::new()
        .route(
            "/api/v1/badges/:badge_id/locations/feed",
            get(samples::sample_feed),
        )
        .route(
            "/api/v1/surveyors/:surveyor_id/presence/feed",
            get(presence::presence_feed),
        );

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .merge(feed_routes)
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(trace_id))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
