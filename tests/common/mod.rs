#![allow(dead_code)]

use axum::body::Body;
use http::{Method, Request};
use sqlx::SqlitePool;

use pairspace::db;
use pairspace::middleware::auth::{create_token_hash, generate_token};
use pairspace::models::user::{CreateUser, User};
use pairspace::routes;
use pairspace::state::AppState;

/// A user created for testing, bundling the User record with its raw token.
pub struct TestUser {
    pub user: User,
    pub token: String,
}

impl TestUser {
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Test server that owns an in-memory SQLite pool and full AppState.
/// Each instance is isolated, safe for parallel tests.
pub struct TestServer {
    pub state: AppState,
}

impl TestServer {
    pub async fn new() -> Self {
        let pool = db::create_pool("sqlite::memory:")
            .await
            .expect("failed to create test pool");

        let state = AppState {
            db: pool,
            test_mode: true,
        };

        Self { state }
    }

    /// Returns an Axum Router wired to this server's state for `oneshot()` calls.
    pub fn router(&self) -> axum::Router {
        routes::router(self.state.clone())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.state.db
    }

    /// Create a user and insert a bearer token with far-future expiry.
    pub async fn create_user_with_token(&self, username: &str) -> TestUser {
        let user = db::users::create_user(
            self.pool(),
            &CreateUser {
                username: username.to_string(),
                display_name: None,
            },
        )
        .await
        .expect("failed to create test user");

        let token = generate_token();
        let token_hash = create_token_hash(&token);

        sqlx::query(
            "INSERT INTO user_tokens (token_hash, user_id, expires_at) VALUES (?, ?, '2099-12-31T23:59:59')",
        )
        .bind(&token_hash)
        .bind(&user.id)
        .execute(self.pool())
        .await
        .expect("failed to insert test token");

        TestUser { user, token }
    }

    /// Create a space via the store with the given owner. Returns (space id,
    /// invite code).
    pub async fn create_space(&self, owner_id: &str, anniversary_date: &str) -> (String, String) {
        let space = db::spaces::create_space(self.pool(), owner_id, anniversary_date)
            .await
            .expect("failed to create test space");
        let code = space.invite_code.expect("fresh space must have a code");
        (space.id, code)
    }

    /// Create a fully paired space for two users. Returns the space id.
    pub async fn create_paired_space(&self, owner_id: &str, partner_id: &str) -> String {
        let (space_id, _code) = self.create_space(owner_id, "2020-01-01").await;
        db::spaces::add_partner(self.pool(), &space_id, partner_id)
            .await
            .expect("failed to add test partner");
        space_id
    }

    /// Backdate a pending unbind request so the sweep sees it as expired.
    pub async fn expire_unbind_request(&self, request_id: &str) {
        sqlx::query(
            "UPDATE unbind_requests SET expires_at = '2000-01-01T00:00:00' WHERE id = ?",
        )
        .bind(request_id)
        .execute(self.pool())
        .await
        .expect("failed to backdate test unbind request");
    }
}

// ---------------------------------------------------------------------------
// Request builder helpers
// ---------------------------------------------------------------------------

/// Build an authenticated request with no body.
pub fn authenticated_request(method: Method, uri: &str, auth_header: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", auth_header)
        .body(Body::empty())
        .unwrap()
}

/// Build an authenticated request with a JSON body.
pub fn authenticated_json_request(
    method: Method,
    uri: &str,
    auth_header: &str,
    body: &serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", auth_header)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Build an unauthenticated request with a JSON body.
pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

/// Parse a response body into a `serde_json::Value`.
pub async fn parse_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
