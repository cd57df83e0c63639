//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Construct the shared services (limiter, request log, validator)
//! - Create the Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, admission, logging, panics)
//! - Serve until the shutdown signal, then flush the request log
//!
//! # Layer Order (outer → inner)
//! ```text
//! stash client id → SetRequestId → PropagateRequestId → Trace → admission → request log
//!     → CatchPanic → Timeout → body limit → handler
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GuardConfig;
use crate::http::error::handle_panic;
use crate::http::handlers;
use crate::http::request::{client_request_id_middleware, MakeGuardRequestId};
use crate::lifecycle::ShutdownSignal;
use crate::observability::middleware::{request_logging_middleware, RequestLogState};
use crate::observability::request_log::RequestLogger;
use crate::security::middleware::admission_middleware;
use crate::security::{RateLimiter, SecurityValidator};

/// Application state injected into handlers.
///
/// Each instance owns its own limiter and request log, so tests can build
/// isolated services side by side.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GuardConfig>,
    pub limiter: Arc<RateLimiter>,
    pub logger: Arc<RequestLogger>,
    pub validator: Arc<SecurityValidator>,
}

impl AppState {
    pub fn new(config: GuardConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new());
        let logger = Arc::new(RequestLogger::new(&config.logging));
        let validator = Arc::new(SecurityValidator::new(
            config.security.clone(),
            limiter.clone(),
            logger.clone(),
        ));

        Self {
            config: Arc::new(config),
            limiter,
            logger,
            validator,
        }
    }
}

impl FromRef<AppState> for Arc<SecurityValidator> {
    fn from_ref(state: &AppState) -> Self {
        state.validator.clone()
    }
}

/// HTTP server for the storefront guard.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GuardConfig) -> Self {
        let state = AppState::new(config);
        let router = build_router(state.clone());
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        self.state.logger.flush().await;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
pub fn build_router(state: AppState) -> Router {
    let routes = api_routes(&state);
    with_layers(routes, state)
}

/// Route table without middleware.
pub fn api_routes(state: &AppState) -> Router<AppState> {
    let routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/templates/{id}", get(handlers::get_template))
        .route("/api/templates/{id}/defaults", get(handlers::template_defaults))
        .route("/api/templates/{id}/validate", post(handlers::validate_template));

    if state.config.admin.enabled {
        routes.merge(setup_admin_router(state.clone()))
    } else {
        routes
    }
}

/// Attach state and the full middleware stack to `routes`.
#[allow(deprecated)]
pub fn with_layers(routes: Router<AppState>, state: AppState) -> Router {
    let config = state.config.clone();

    let log_state = RequestLogState {
        logger: state.logger.clone(),
        expose_errors: config.environment.is_development(),
    };
    let body_limit = usize::try_from(config.security.max_request_size).unwrap_or(usize::MAX);

    let layers = ServiceBuilder::new()
        .layer(from_fn(client_request_id_middleware))
        .layer(SetRequestIdLayer::x_request_id(MakeGuardRequestId))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.validator.clone(), admission_middleware))
        .layer(from_fn_with_state(log_state, request_logging_middleware))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
        .layer(DefaultBodyLimit::max(body_limit));

    routes.with_state(state).layer(layers)
}
