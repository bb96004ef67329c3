use std::net::SocketAddr;
use std::sync::Arc;

use account_service::config::RateLimitConfig;
use account_service::domain::account::lockout::LockoutPolicy;
use account_service::domain::account::models::Account;
use account_service::domain::account::models::AccountId;
use account_service::domain::account::models::DisplayName;
use account_service::domain::account::models::EmailAddress;
use account_service::domain::account::models::LoginCounters;
use account_service::domain::account::models::Role;
use account_service::domain::account::ports::SecretHasher;
use account_service::domain::account::service::AccountService;
use account_service::domain::session::service::SessionService;
use account_service::inbound::http::rate_limit::RateLimiters;
use account_service::inbound::http::router::create_router;
use account_service::inbound::http::router::AppState;
use account_service::outbound::clock::SystemClock;
use account_service::outbound::password::Argon2SecretHasher;
use account_service::outbound::repositories::InMemoryAccountRepository;
use auth::PasswordHasher;
use auth::SessionIssuer;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

pub const SESSION_SECRET: &[u8] = b"test-secret-key-for-session-signing-32-bytes";
pub const COOKIE_NAME: &str = "session-token";

/// Test application that spawns a real server over an in-memory store
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub repository: Arc<InMemoryAccountRepository>,
    pub hasher: Arc<Argon2SecretHasher>,
    pub session_issuer: SessionIssuer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    /// Spawn the application with rate limits high enough to stay out of
    /// the way
    pub async fn spawn() -> Self {
        Self::spawn_with(relaxed_rate_limit(), false).await
    }

    /// Spawn with `Secure` cookies and HSTS switched on
    pub async fn spawn_production() -> Self {
        Self::spawn_with(relaxed_rate_limit(), true).await
    }

    pub async fn spawn_with_rate_limit(rate_limit: RateLimitConfig) -> Self {
        Self::spawn_with(rate_limit, false).await
    }

    async fn spawn_with(rate_limit: RateLimitConfig, production: bool) -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryAccountRepository::new());
        // Cheap Argon2 parameters keep the suite fast
        let hasher = Arc::new(Argon2SecretHasher::new(
            PasswordHasher::with_params(1024, 1, 1).expect("Invalid Argon2 parameters"),
        ));
        let clock = Arc::new(SystemClock);

        let account_service = Arc::new(AccountService::new(
            Arc::clone(&repository),
            Arc::clone(&hasher),
            Arc::clone(&clock),
            LockoutPolicy::default(),
        ));
        let session_service = Arc::new(SessionService::new(session_issuer(), clock));

        let router = create_router(AppState {
            account_service,
            session_service,
            rate_limiters: Arc::new(RateLimiters::new(&rate_limit)),
            cookie_name: COOKIE_NAME.to_string(),
            production,
        });

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("Server error");
        });

        Self {
            address,
            port,
            repository,
            hasher,
            session_issuer: session_issuer(),
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Register an account through the API
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: &str,
    ) -> reqwest::Response {
        self.post("/api/auth/register")
            .json(&json!({
                "name": name,
                "email": email,
                "password": password,
                "role": role,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Attempt a credential sign-in
    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Store an account directly, bypassing registration rules
    pub async fn seed_account(
        &self,
        email: &str,
        password: Option<&str>,
        is_active: bool,
    ) -> Account {
        let password_hash = match password {
            Some(password) => Some(
                self.hasher
                    .hash_secret(password)
                    .await
                    .expect("Failed to hash password"),
            ),
            None => None,
        };

        let account = Account {
            id: AccountId::new(),
            email: EmailAddress::new(email).expect("Invalid email"),
            display_name: DisplayName::new("Seeded Account").expect("Invalid name"),
            password_hash,
            role: Role::Elder,
            is_active,
            counters: LoginCounters::default(),
            version: 0,
            created_at: Utc::now(),
        };

        self.repository.insert(account.clone()).await;
        account
    }
}

fn session_issuer() -> SessionIssuer {
    SessionIssuer::new(SESSION_SECRET, Duration::days(30), Duration::hours(24))
}

fn relaxed_rate_limit() -> RateLimitConfig {
    RateLimitConfig {
        api_requests_per_window: 1_000,
        auth_requests_per_window: 1_000,
        ..RateLimitConfig::default()
    }
}
