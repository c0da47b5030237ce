/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use parley_api::{app::{build_router, AppState, Services}, config::Config};
/// use parley_shared::{llm::http::HttpChatModel, mail::log::LogMailer};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let llm = Arc::new(HttpChatModel::new(config.llm.clone())?);
/// let state = AppState::new(config, Services::postgres(pool, Arc::new(LogMailer), llm));
/// let app = build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use parley_shared::{
    auth::{issuer::TokenIssuer, middleware},
    llm::ChatModel,
    mail::{notifications::NotificationSender, Mailer},
    store::{postgres::PgStore, ConversationStore, UserStore},
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// External collaborators handed to the application
pub struct Services {
    pub users: Arc<dyn UserStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub mailer: Arc<dyn Mailer>,
    pub llm: Arc<dyn ChatModel>,

    /// Pool backing the stores, if any; reported by `/health`
    pub db: Option<PgPool>,
}

impl Services {
    /// Postgres-backed stores over one pool
    pub fn postgres(pool: PgPool, mailer: Arc<dyn Mailer>, llm: Arc<dyn ChatModel>) -> Self {
        let store = Arc::new(PgStore::new(pool.clone()));

        Self {
            users: store.clone(),
            conversations: store,
            mailer,
            llm,
            db: Some(pool),
        }
    }
}

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub conversations: Arc<dyn ConversationStore>,
    pub issuer: Arc<TokenIssuer>,
    pub notifier: NotificationSender,
    pub llm: Arc<dyn ChatModel>,
    pub db: Option<PgPool>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, services: Services) -> Self {
        let issuer = TokenIssuer::new(
            config.jwt.secret.clone(),
            config.access_ttl(),
            config.refresh_ttl(),
        );

        let notifier = NotificationSender::new(
            services.mailer,
            config.mail.from.clone(),
            config.mail.frontend_url.clone(),
        );

        Self {
            users: services.users,
            conversations: services.conversations,
            issuer: Arc::new(issuer),
            notifier,
            llm: services.llm,
            db: services.db,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /auth/                              (public)
/// │   ├── GET  /csrf_token
/// │   ├── POST /login
/// │   ├── POST /signup
/// │   ├── POST /verify_email
/// │   ├── POST /resend_verification_code
/// │   ├── POST /send_reset_password_email
/// │   ├── POST /reset_password
/// │   └── POST /token/refresh
/// └── /messaging/                         (bearer token)
///     ├── POST /send
///     ├── GET  /messages?conversation_id=
///     └── GET  /conversations
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/csrf_token", get(routes::auth::csrf_token))
        .route("/login", post(routes::auth::login))
        .route("/signup", post(routes::auth::signup))
        .route("/verify_email", post(routes::auth::verify_email))
        .route(
            "/resend_verification_code",
            post(routes::auth::resend_verification_code),
        )
        .route(
            "/send_reset_password_email",
            post(routes::auth::send_reset_password_email),
        )
        .route("/reset_password", post(routes::auth::reset_password))
        .route("/token/refresh", post(routes::auth::refresh));

    let messaging_routes = Router::new()
        .route("/send", post(routes::messaging::send_message))
        .route("/messages", get(routes::messaging::get_messages))
        .route("/conversations", get(routes::messaging::get_conversations))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::AUTHORIZATION,
                header::CONTENT_TYPE,
                header::HeaderName::from_static("x-csrftoken"),
            ])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .nest("/messaging", messaging_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Bearer authentication layer for session-scoped routes
///
/// Rejects the request with 401 before the handler runs unless it carries a
/// valid access token; otherwise inserts `AuthContext` into extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = middleware::authenticate(req.headers(), &state.issuer)?;
    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
