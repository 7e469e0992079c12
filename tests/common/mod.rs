#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use std::num::NonZeroU32;
use tower::ServiceExt;
use vidtube_auth::{
    ServerConfig, create_app,
    db::Database,
    jwt::{JwtConfig, TokenSettings},
};

pub const ACCESS_SECRET: &str = "test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &str = "test-refresh-secret-0123456789abcdef";

pub const ACCESS_DURATION: u64 = 15 * 60;
pub const REFRESH_DURATION: u64 = 7 * 24 * 60 * 60;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

/// Result of one request: status, `Set-Cookie` values and JSON body.
pub struct TestResponse {
    pub status: StatusCode,
    pub cookies: Vec<String>,
    pub json: serde_json::Value,
}

impl TestResponse {
    /// Value of a cookie set by the response, if any.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.cookies.iter().find_map(|c| {
            c.strip_prefix(&prefix)
                .map(|rest| rest.split(';').next().unwrap_or_default().to_string())
        })
    }

    pub fn cookie_header(&self, name: &str) -> Option<&str> {
        let prefix = format!("{}=", name);
        self.cookies
            .iter()
            .find(|c| c.starts_with(&prefix))
            .map(String::as_str)
    }
}

fn settings() -> (TokenSettings, TokenSettings) {
    (
        TokenSettings::new(ACCESS_SECRET, ACCESS_DURATION),
        TokenSettings::new(REFRESH_SECRET, REFRESH_DURATION),
    )
}

pub async fn create_test_app() -> TestApp {
    TestSetup::new().build().await
}

/// Builder for test setup with various options
pub struct TestSetup {
    secure_cookies: bool,
    login_rate_limit: Option<NonZeroU32>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            secure_cookies: false,
            login_rate_limit: None,
        }
    }

    pub fn with_secure_cookies(mut self) -> Self {
        self.secure_cookies = true;
        self
    }

    pub fn with_login_rate_limit(mut self, per_minute: u32) -> Self {
        self.login_rate_limit = NonZeroU32::new(per_minute);
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let (access_token, refresh_token) = settings();
        let jwt = JwtConfig::new(&access_token, &refresh_token);
        let config = ServerConfig {
            db: db.clone(),
            access_token,
            refresh_token,
            secure_cookies: self.secure_cookies,
            login_rate_limit: self.login_rate_limit,
            trust_forwarded_for: true,
        };
        TestApp {
            app: create_app(&config),
            db,
            jwt,
        }
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let cookies = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        TestResponse {
            status,
            cookies,
            json,
        }
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> TestResponse {
        self.send(json_request("POST", path, body)).await
    }

    /// Register a user with a valid avatar.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/v1/users/register",
            serde_json::json!({
                "fullName": format!("{} Full", username),
                "email": email,
                "username": username,
                "password": password,
                "avatar": format!("https://cdn.example.com/{}.png", username),
            }),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/v1/users/login",
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Register and log in, returning the login response.
    pub async fn register_and_login(&self, username: &str, password: &str) -> TestResponse {
        let email = format!("{}@example.com", username);
        let registered = self.register(username, &email, password).await;
        assert_eq!(registered.status, StatusCode::CREATED);
        let login = self.login(username, password).await;
        assert_eq!(login.status, StatusCode::OK);
        login
    }
}

pub fn json_request(method: &str, path: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// JSON request authenticated with an access token cookie.
pub fn authed_json_request(
    method: &str,
    path: &str,
    access_token: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, format!("accessToken={}", access_token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn authed_get(path: &str, access_token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::COOKIE, format!("accessToken={}", access_token))
        .body(Body::empty())
        .unwrap()
}

/// Refresh request carrying the token in the `refreshToken` cookie.
pub fn refresh_with_cookie(refresh_token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/users/refreshToken")
        .header(header::COOKIE, format!("refreshToken={}", refresh_token))
        .body(Body::empty())
        .unwrap()
}

/// Tokens from a login or refresh response body.
pub fn tokens(response: &TestResponse) -> (String, String) {
    (
        response.json["data"]["accessToken"]
            .as_str()
            .expect("accessToken in body")
            .to_string(),
        response.json["data"]["refreshToken"]
            .as_str()
            .expect("refreshToken in body")
            .to_string(),
    )
}
