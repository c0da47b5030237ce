//! Common test utilities for integration tests
//!
//! Builds the full router over in-process collaborators so the HTTP surface
//! can be exercised without Postgres, SMTP or a model endpoint:
//! - `MemoryStore` for users and conversations
//! - `MemoryMailer` capturing outgoing email
//! - `ScriptedChatModel` echoing user turns

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use parley_api::app::{build_router, AppState, Services};
use parley_api::config::Config;
use parley_shared::llm::scripted::ScriptedChatModel;
use parley_shared::mail::memory::MemoryMailer;
use parley_shared::store::memory::MemoryStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tower::Service as _;

pub const PASSWORD: &str = "Abcdef1!";
pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing the router and handles on its collaborators
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
    pub llm: Arc<ScriptedChatModel>,
    pub config: Config,
}

/// Status code and parsed JSON body
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Value,
}

pub fn test_config() -> Config {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("DATABASE_URL", "postgresql://unused/parley_test"),
        ("JWT_SECRET", JWT_SECRET),
        ("EMAIL_FROM", "noreply@parley.test"),
        ("FRONTEND_URL", "http://frontend.test"),
    ]);

    Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
        .expect("test configuration is valid")
}

impl TestContext {
    pub fn new() -> Self {
        let config = test_config();
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(MemoryMailer::new());
        let llm = Arc::new(ScriptedChatModel::default());

        let state = AppState::new(
            config.clone(),
            Services {
                users: store.clone(),
                conversations: store.clone(),
                mailer: mailer.clone(),
                llm: llm.clone(),
                db: None,
            },
        );

        TestContext {
            app: build_router(state),
            store,
            mailer,
            llm,
            config,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();
        into_test_response(response).await
    }

    pub async fn post_json(&self, uri: &str, body: Value, bearer: Option<&str>) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);

        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn signup(&self, email: &str) -> TestResponse {
        self.post_json(
            "/auth/signup",
            json!({
                "email": email,
                "password": PASSWORD,
                "password_confirmation": PASSWORD,
                "first_name": "Ada",
                "last_name": "Lovelace",
            }),
            None,
        )
        .await
    }

    /// Code from the most recent verification email sent to `email`
    pub async fn verification_code(&self, email: &str) -> String {
        let message = self
            .mailer
            .last_to(email)
            .await
            .expect("a verification email was sent");

        message
            .body
            .lines()
            .find_map(|line| line.strip_prefix("Verification Code: "))
            .expect("email carries a verification code")
            .trim()
            .to_string()
    }

    /// Token from the most recent reset email sent to `email`
    pub async fn reset_token(&self, email: &str) -> String {
        let message = self
            .mailer
            .last_to(email)
            .await
            .expect("a reset email was sent");

        message
            .body
            .lines()
            .find_map(|line| line.split("token=").nth(1))
            .expect("email carries a reset link")
            .trim()
            .to_string()
    }

    /// Signs up and verifies `email`; returns the session response body
    pub async fn verified_user(&self, email: &str) -> Value {
        let signup = self.signup(email).await;
        assert_eq!(signup.status, StatusCode::CREATED, "{}", signup.body);

        let code = self.verification_code(email).await;
        let verified = self
            .post_json(
                "/auth/verify_email",
                json!({ "email": email, "verification_code": code }),
                None,
            )
            .await;
        assert_eq!(verified.status, StatusCode::OK, "{}", verified.body);

        verified.body
    }

    /// Access token for a fresh verified user
    pub async fn access_token(&self, email: &str) -> String {
        self.verified_user(email).await["access"]
            .as_str()
            .expect("session carries an access token")
            .to_string()
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/auth/login",
            json!({ "email": email, "password": password }),
            None,
        )
        .await
    }
}

async fn into_test_response(response: Response<Body>) -> TestResponse {
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).to_string())
        })
    };

    TestResponse {
        status,
        headers,
        body,
    }
}
