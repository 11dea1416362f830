// backend/tests/helpers.rs
#![allow(dead_code)]

use backend::{
    config::{AppConfig, DatabaseConfig},
    db::Database,
    identity::IdentityService,
    token::TokenKeys,
    web_server::{create_router, AppState},
};
use common::{AuthResponse, RegisterRequest};
use once_cell::sync::Lazy;
use reqwest::StatusCode;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough";

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
});

pub struct TestApp {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub state: AppState,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn db(&self) -> &Database {
        self.state.identity.database()
    }
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.web.port = 0;
    // One connection that never expires, or the in-memory database vanishes.
    config.database = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 0,
        acquire_timeout_secs: 5,
        idle_timeout_secs: None,
        max_lifetime_secs: None,
    };
    config.jwt.secret = TEST_JWT_SECRET.to_string();
    config.jwt.access_token_expires_minutes = 15;
    config.auth.bcrypt_cost = 4;
    config
}

/// Builds application state on a fresh, migrated in-memory database.
pub async fn test_state() -> AppState {
    Lazy::force(&TRACING);

    let config = test_config();
    let db = Database::connect(&config.database)
        .await
        .expect("Failed to create in-memory database pool.");
    db.sync()
        .await
        .expect("Failed to run migrations on test database.");

    let tokens = TokenKeys::new(&config.jwt).expect("Failed to build test token keys.");
    let identity = IdentityService::new(db, tokens, config.auth.bcrypt_cost);
    AppState {
        identity,
        app_config: Arc::new(config),
    }
}

/// Spawn a test server and return it with a reqwest client.
pub async fn spawn_app() -> TestApp {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();

    let state = test_state().await;
    let app = create_router(state.clone());

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        addr,
        client,
        state,
    }
}

pub fn registration(login_name: &str, secret: &str, name: &str) -> RegisterRequest {
    RegisterRequest {
        login_name: login_name.to_string(),
        secret: secret.to_string(),
        name: name.to_string(),
        email: None,
    }
}

/// Registers a user and returns the server's response.
pub async fn register(app: &TestApp, payload: &RegisterRequest) -> AuthResponse {
    let response = app
        .client
        .post(app.url("/register"))
        .json(payload)
        .send()
        .await
        .expect("Failed to register user");
    assert_eq!(response.status(), StatusCode::CREATED, "Registration failed");

    response
        .json()
        .await
        .expect("Failed to parse register response")
}
