//! HTTP API
//!
//! JSON REST API over the subscription, guide and reminder services.
//! Every route except status, register and login requires a bearer token.
//!
//! # Endpoints
//!
//! - GET /api/status - Server status
//! - POST /api/auth/register - Create an account and obtain a token
//! - POST /api/auth/login - Obtain a token
//! - POST /api/auth/logout - Revoke the current token
//! - GET /api/me - Current user
//! - GET/POST /api/subscriptions - List or create subscriptions
//! - GET /api/subscriptions/upcoming?days=N - Trials ending soon
//! - GET/PUT/DELETE /api/subscriptions/:id - Read, update or delete one
//! - POST /api/subscriptions/:id/cancel - Mark as cancelled
//! - POST /api/reminders/check - Send due reminders for the caller
//! - GET /api/guides/:service - Cached cancellation guide
//! - POST /api/guides - Fetch or generate a cancellation guide

use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::guides::GuideService;
use crate::llm::CompletionProvider;
use crate::mailer::Mailer;
use crate::reminders::ReminderService;
use crate::subscriptions::SubscriptionService;

pub mod error;
pub mod extract;
pub mod routes;

pub use error::ApiError;
pub use extract::AuthUser;

/// Services shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
    pub subscriptions: SubscriptionService,
    pub guides: GuideService,
    pub reminders: ReminderService,
}

impl AppState {
    pub fn new(
        config: &Config,
        db: Database,
        provider: Arc<dyn CompletionProvider>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            auth: AuthService::new(db.clone(), config.auth.session_ttl_hours),
            subscriptions: SubscriptionService::new(
                db.clone(),
                config.reminders.default_days_before,
            ),
            guides: GuideService::new(
                db.clone(),
                provider,
                Duration::from_secs(config.llm.timeout_secs),
            ),
            reminders: ReminderService::new(db.clone(), mailer),
            db,
        }
    }
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(routes::status))
        .route("/api/auth/register", post(routes::register))
        .route("/api/auth/login", post(routes::login))
        .route("/api/auth/logout", post(routes::logout))
        .route("/api/me", get(routes::me))
        .route(
            "/api/subscriptions",
            get(routes::list_subscriptions).post(routes::create_subscription),
        )
        .route(
            "/api/subscriptions/upcoming",
            get(routes::upcoming_subscriptions),
        )
        .route(
            "/api/subscriptions/:id",
            get(routes::get_subscription)
                .put(routes::update_subscription)
                .delete(routes::delete_subscription),
        )
        .route(
            "/api/subscriptions/:id/cancel",
            post(routes::cancel_subscription),
        )
        .route("/api/reminders/check", post(routes::check_reminders))
        .route("/api/guides", post(routes::generate_guide))
        .route("/api/guides/:service", get(routes::get_guide))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("API server shutting down gracefully");
        })
        .await?;

    Ok(())
}
