//! # NGAO HTTP API Module
//!
//! REST API over the workflow engine, served with axum. Every endpoint
//! except `/health` acts as the officer named by `X-Officer-Id`.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /incidents`, `POST /incidents` - List visible / report
//! - `GET /incidents/{id}` - One incident
//! - `POST /incidents/{id}/transition` - Move to a new status
//! - `POST /incidents/{id}/escalate` - Hand up the chain of command
//! - `POST /incidents/{id}/assign` - Reassign the handler
//! - `GET|POST /incidents/{id}/responses` - Officer responses
//! - `POST /registrations/births`, `POST /registrations/births/{id}/submit`
//! - `POST /registrations/deaths`, `POST /registrations/marriages`
//! - `GET /registrations/{kind}/{id}` - One registration
//! - `POST /registrations/{kind}/{id}/decision` - Approve or reject
//! - `POST /national-id`, `POST /national-id/{id}/{verify|submit|complete|reject}`
//! - `POST /messages`, `POST /announcements`
//! - `GET /inbox`, `POST /inbox/{id}/read`
//! - `GET /stats` - Dashboard counts
//! - `GET /history/{kind}/{id}` - Status transitions of one entity
//!
//! ## Security
//!
//! Configured by the `[security]` section (see [`crate::config`]):
//! `api_key`, `rate_limit` and `cors_origins`.

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{Actor, OFFICER_HEADER, keys_match};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    AnnouncementRequest, ApiError, ApiResult, AssignRequest, CompleteRequest, DecisionRequest,
    ErrorResponse, HealthResponse, IncidentQuery, MessageRequest, RejectRequest,
    ResponseRequest, TransitionRequest, VerifyRequest, status_for,
};

use crate::config::SecurityConfig;
use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use ngao_core::{Engine, NgaoError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size.
const MAX_BODY_BYTES: usize = 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state holding the engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<Engine>>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

fn allowed_headers() -> [HeaderName; 3] {
    [
        header::CONTENT_TYPE,
        header::AUTHORIZATION,
        HeaderName::from_static(OFFICER_HEADER),
    ]
}

/// Build the CORS layer from `cors_origins`.
///
/// - `"*"`: any origin (development only)
/// - unset: localhost only
/// - otherwise: a comma-separated list of origins
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (cors_origins = \"*\"). Do not use in production");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers(allowed_headers())
            }
        }
        None => build_localhost_cors(),
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(allowed_headers())
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner): tracing, CORS, body limit,
/// rate limiting (if enabled), API key (if configured).
pub fn create_router(state: AppState, security: &SecurityConfig) -> Router {
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/incidents",
            get(handlers::list_incidents_handler).post(handlers::report_incident_handler),
        )
        .route("/incidents/{id}", get(handlers::get_incident_handler))
        .route(
            "/incidents/{id}/transition",
            post(handlers::transition_incident_handler),
        )
        .route(
            "/incidents/{id}/escalate",
            post(handlers::escalate_incident_handler),
        )
        .route("/incidents/{id}/assign", post(handlers::assign_handler))
        .route(
            "/incidents/{id}/responses",
            get(handlers::list_responses_handler).post(handlers::add_response_handler),
        )
        .route(
            "/registrations/births",
            post(handlers::create_birth_handler),
        )
        .route(
            "/registrations/births/{id}/submit",
            post(handlers::submit_birth_handler),
        )
        .route("/registrations/deaths", post(handlers::file_death_handler))
        .route(
            "/registrations/marriages",
            post(handlers::file_marriage_handler),
        )
        .route(
            "/registrations/{kind}/{id}",
            get(handlers::get_registration_handler),
        )
        .route(
            "/registrations/{kind}/{id}/decision",
            post(handlers::decide_registration_handler),
        )
        .route("/national-id", post(handlers::initiate_national_id_handler))
        .route(
            "/national-id/{id}/verify",
            post(handlers::verify_national_id_handler),
        )
        .route(
            "/national-id/{id}/submit",
            post(handlers::submit_national_id_handler),
        )
        .route(
            "/national-id/{id}/complete",
            post(handlers::complete_national_id_handler),
        )
        .route(
            "/national-id/{id}/reject",
            post(handlers::reject_national_id_handler),
        )
        .route("/messages", post(handlers::send_message_handler))
        .route("/announcements", post(handlers::announce_handler))
        .route("/inbox", get(handlers::inbox_handler))
        .route("/inbox/{id}/read", post(handlers::mark_read_handler))
        .route("/stats", get(handlers::stats_handler))
        .route("/history/{kind}/{id}", get(handlers::history_handler));

    match security.api_key() {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            let expected: Arc<str> = Arc::from(key);
            router = router.layer(axum_middleware::from_fn_with_state(
                expected,
                auth::api_key_auth_middleware,
            ));
        }
        None => tracing::warn!(
            "API key authentication DISABLED: any caller can act as any officer. \
             Set [security] api_key or NGAO_API_KEY to enable it."
        ),
    }

    match create_rate_limiter(security.rate_limit) {
        Some(limiter) => {
            tracing::info!("Rate limiting enabled: {} requests/second", security.rate_limit);
            router = router.layer(axum_middleware::from_fn_with_state(
                limiter,
                middleware::rate_limit_middleware,
            ));
        }
        None => tracing::info!("Rate limiting disabled"),
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(build_cors_layer(security.cors_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until the process stops.
pub async fn run_server(
    addr: &str,
    engine: Engine,
    security: &SecurityConfig,
) -> Result<(), NgaoError> {
    let router = create_router(AppState::new(engine), security);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| NgaoError::Storage(format!("bind {addr} failed: {e}")))?;

    tracing::info!("NGAO HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| NgaoError::Storage(format!("server error: {e}")))
}
