/// Application state and router builder
///
/// Defines the shared application state and builds the Axum router with all
/// routes and middleware. The state is the only thing shared across
/// requests: a pooled database handle and the configuration.
///
/// # Example
///
/// ```no_run
/// use duet_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security, routes};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use duet_shared::auth::middleware::authenticate;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into each request handler via Axum's `State` extractor; the
/// config rides in an `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Token signing/verification configuration
    pub fn jwt(&self) -> &duet_shared::auth::jwt::TokenConfig {
        &self.config.jwt
    }

    /// Deadline for the request gate
    pub fn auth_timeout(&self) -> Duration {
        self.config.auth_timeout()
    }
}

/// Builds the complete Axum router
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health              # liveness + database status (public)
/// ├── POST /signup              # create account, returns a token (public)
/// ├── POST /login               # exchange credentials for a token (public)
/// ├── GET  /verify              # echo the decoded claims of a token (public)
/// └── /v1/                      # behind the request gate
///     ├── GET    /tasks
///     ├── POST   /tasks
///     ├── GET    /tasks/:id
///     ├── PATCH  /tasks/:id
///     ├── DELETE /tasks/:id
///     ├── POST   /tasks/:id/actions
///     └── DELETE /actions/:id
/// ```
///
/// The gate runs once per protected request; a request that fails it never
/// reaches a handler.
pub fn build_router(state: AppState) -> Router {
    // Public bootstrap surface: no token needed to obtain or inspect one
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/signup", post(routes::auth::signup))
        .route("/login", post(routes::auth::login))
        .route("/verify", get(routes::auth::verify));

    // Owner-scoped data surface, every route behind the gate
    let task_routes = Router::new()
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/actions", post(routes::tasks::create_action))
        .route("/actions/:id", axum::routing::delete(routes::tasks::delete_action))
        .layer(axum::middleware::from_fn_with_state(state.clone(), auth_gate));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .nest("/v1", task_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(axum::middleware::from_fn(security::set_security_headers))
        .with_state(state)
}

/// Request gate middleware
///
/// Extracts the bearer token, verifies it, resolves the subject to the
/// numeric user id, and injects the identity into request extensions - all
/// under the configured deadline. On any failure the request is rejected
/// here; handlers only ever observe a complete identity.
async fn auth_gate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state.db, state.jwt(), state.auth_timeout(), req.headers())
        .await
        .map_err(|err| {
            tracing::debug!("request gate rejected request: {err}");
            ApiError::from(err)
        })?;

    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// CORS configuration
///
/// `*` in the configured origins means permissive mode (development); an
/// explicit list restricts origins and allows credentials.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.api.cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
