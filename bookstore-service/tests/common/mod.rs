use std::collections::HashMap;
use std::sync::Arc;

use auth::Authenticator;
use auth::Clock;
use auth::LockoutPolicy;
use auth::ManualClock;
use bookstore_service::domain::principal::models::Identifier;
use bookstore_service::domain::principal::models::NewPrincipal;
use bookstore_service::domain::principal::models::Principal;
use bookstore_service::domain::principal::models::Role;
use bookstore_service::domain::principal::ports::PrincipalRepository;
use bookstore_service::domain::principal::service::AuthService;
use bookstore_service::inbound::http::cookies::CookieSettings;
use bookstore_service::inbound::http::cookies::ACCESS_COOKIE;
use bookstore_service::inbound::http::cookies::REFRESH_COOKIE;
use bookstore_service::inbound::http::router::create_router;
use bookstore_service::outbound::repositories::InMemoryPrincipalRepository;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use reqwest::header::COOKIE;
use reqwest::header::SET_COOKIE;
use serde_json::json;

/// Base64 of "integration-test-signing-key-32-bytes-long"
pub const TEST_SECRET: &str = "aW50ZWdyYXRpb24tdGVzdC1zaWduaW5nLWtleS0zMi1ieXRlcy1sb25n";

pub const ACCESS_LIFETIME_MINUTES: i64 = 15;
pub const REFRESH_LIFETIME_DAYS: i64 = 7;

/// Test application that spawns a real server over the in-memory store.
///
/// Token and lockout time is driven by `clock`; cookies are handled by hand
/// so each test controls exactly what the server sees.
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub clock: Arc<ManualClock>,
    pub repository: Arc<InMemoryPrincipalRepository>,
    pub authenticator: Arc<Authenticator>,
}

/// Token pair as returned in `Set-Cookie` headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookies {
    pub access: String,
    pub refresh: String,
}

impl SessionCookies {
    /// `Cookie` header value carrying both tokens.
    pub fn header(&self) -> String {
        format!(
            "{}={}; {}={}",
            ACCESS_COOKIE, self.access, REFRESH_COOKIE, self.refresh
        )
    }
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let clock = Arc::new(ManualClock::starting_now());
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let access_lifetime = Duration::minutes(ACCESS_LIFETIME_MINUTES);
        let refresh_lifetime = Duration::days(REFRESH_LIFETIME_DAYS);
        let authenticator = Arc::new(
            Authenticator::from_base64_secret(
                TEST_SECRET,
                access_lifetime,
                refresh_lifetime,
                Arc::clone(&dyn_clock),
            )
            .expect("Failed to create authenticator"),
        );

        let repository = Arc::new(InMemoryPrincipalRepository::new());
        let auth_service = Arc::new(AuthService::new(
            Arc::clone(&repository),
            Arc::clone(&authenticator),
            LockoutPolicy::default(),
            dyn_clock,
        ));

        let router = create_router(
            auth_service,
            CookieSettings::from_lifetimes(access_lifetime, refresh_lifetime),
        );

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::new(),
            clock,
            repository,
            authenticator,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request carrying session cookies
    pub fn get_with_session(&self, path: &str, session: &SessionCookies) -> reqwest::RequestBuilder {
        self.get(path).header(COOKIE, session.header())
    }

    /// Helper to make POST request carrying session cookies
    pub fn post_with_session(
        &self,
        path: &str,
        session: &SessionCookies,
    ) -> reqwest::RequestBuilder {
        self.post(path).header(COOKIE, session.header())
    }

    pub async fn register(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/register")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to send register request")
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to send login request")
    }

    /// Register a customer and log in, returning the issued cookies.
    pub async fn register_and_login(&self, email: &str, password: &str) -> SessionCookies {
        let response = self.register(email, password).await;
        assert_eq!(response.status(), 201);

        let response = self.login(email, password).await;
        assert_eq!(response.status(), 200);
        session_cookies(&response).expect("Login did not set session cookies")
    }

    /// Insert a principal with the given role straight into the store.
    pub async fn seed_principal(&self, email: &str, password: &str, role: Role) -> Principal {
        let password_hash = self
            .authenticator
            .hash_password(password)
            .expect("Failed to hash password");

        self.repository
            .create(NewPrincipal {
                identifier: Identifier::new(email.to_string()).expect("Invalid email"),
                password_hash,
                role,
            })
            .await
            .expect("Failed to seed principal")
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Collect `name=value` pairs from every `Set-Cookie` header.
pub fn set_cookies(response: &reqwest::Response) -> HashMap<String, String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .collect()
}

/// Full `Set-Cookie` header for one cookie, attributes included.
pub fn set_cookie_header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{}=", name)))
        .map(str::to_string)
}

/// Both session cookies, if the response set non-empty values for them.
pub fn session_cookies(response: &reqwest::Response) -> Option<SessionCookies> {
    let cookies = set_cookies(response);
    let access = cookies.get(ACCESS_COOKIE).filter(|v| !v.is_empty())?;
    let refresh = cookies.get(REFRESH_COOKIE).filter(|v| !v.is_empty())?;
    Some(SessionCookies {
        access: access.clone(),
        refresh: refresh.clone(),
    })
}
