use std::sync::Arc;

use anyhow::Context;
use auth::Authenticator;
use auth::Clock;
use auth::SystemClock;
use bookstore_service::config::Config;
use bookstore_service::config::StorageBackend;
use bookstore_service::domain::principal::ports::AuthServicePort;
use bookstore_service::domain::principal::service::AuthService;
use bookstore_service::inbound::http::cookies::CookieSettings;
use bookstore_service::inbound::http::router::create_router;
use bookstore_service::outbound::repositories::InMemoryPrincipalRepository;
use bookstore_service::outbound::repositories::PostgresPrincipalRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstore_service=debug,auth=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "bookstore-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        storage = ?config.storage.backend,
        access_lifetime_ms = config.jwt.expiration,
        refresh_lifetime_ms = config.jwt.refresh.expiration,
        max_login_attempts = config.security.max_login_attempts,
        lock_minutes = config.security.account_lock_duration_minutes,
        "Configuration loaded"
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let authenticator = Arc::new(
        Authenticator::from_base64_secret(
            &config.jwt.secret,
            config.jwt.access_lifetime(),
            config.jwt.refresh_lifetime(),
            Arc::clone(&clock),
        )
        .context("Invalid jwt.secret")?,
    );
    let policy = config.security.lockout_policy();

    let auth_service: Arc<dyn AuthServicePort> = match config.storage.backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database
                .url
                .as_deref()
                .context("database.url is required for the postgres backend")?;

            let pg_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            tracing::info!(
                max_connections = 5,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            let repository = Arc::new(PostgresPrincipalRepository::new(pg_pool));
            Arc::new(AuthService::new(repository, authenticator, policy, clock))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory principal store; data is lost on restart");
            let repository = Arc::new(InMemoryPrincipalRepository::new());
            Arc::new(AuthService::new(repository, authenticator, policy, clock))
        }
    };

    let cookies =
        CookieSettings::from_lifetimes(config.jwt.access_lifetime(), config.jwt.refresh_lifetime());
    let http_application = create_router(auth_service, cookies);

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    axum::serve(http_listener, http_application).await?;
    tracing::info!("Server exited successfully");

    Ok(())
}
