use std::net::SocketAddr;
use std::sync::Arc;

use account_service::config::Config;
use account_service::domain::account::lockout::LockoutPolicy;
use account_service::domain::account::service::AccountService;
use account_service::domain::session::service::SessionService;
use account_service::inbound::http::rate_limit::RateLimiters;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::AppState;
use account_service::outbound::clock::SystemClock;
use account_service::outbound::password::Argon2SecretHasher;
use account_service::outbound::repositories::PostgresAccountRepository;
use auth::PasswordHasher;
use auth::SessionIssuer;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        production = config.server.production,
        max_failed_attempts = config.lockout.max_failed_attempts,
        lockout_duration_ms = config.lockout.lockout_duration_ms,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let clock = Arc::new(SystemClock);
    let account_repository = Arc::new(PostgresAccountRepository::new(pg_pool));
    let secret_hasher = Arc::new(Argon2SecretHasher::new(PasswordHasher::new()));

    let account_service = Arc::new(AccountService::new(
        account_repository,
        secret_hasher,
        Arc::clone(&clock),
        LockoutPolicy::from(&config.lockout),
    ));

    let session_issuer = SessionIssuer::new(
        config.session.secret.as_bytes(),
        config.session.max_age(),
        config.session.update_age(),
    );
    let session_service = Arc::new(SessionService::new(session_issuer, clock));

    let shutdown = CancellationToken::new();
    let rate_limiters = Arc::new(RateLimiters::new(&config.rate_limit));
    let cleanup = rate_limiters.spawn_cleanup(shutdown.clone());

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(AppState {
        account_service,
        session_service,
        rate_limiters,
        cookie_name: config.session.cookie_name.clone(),
        production: config.server.production,
    });

    let served = axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    shutdown.cancel();
    if let Err(e) = cleanup.await {
        tracing::warn!(error = %e, "Rate limiter cleanup task ended abnormally");
    }

    if let Err(e) = served {
        tracing::error!(error = %e, "Server error");
        return Err(e.into());
    }

    tracing::info!("Server exited successfully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
