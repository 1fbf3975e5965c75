//! Authentication endpoints.
//!
//! Only the fields the console core consumes are modeled; everything else in
//! the response bodies is ignored.

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use cardkey_auth::{AccountStatus, Role};
use cardkey_core::ApiResult;

use crate::transport::Transport;

/// `POST /auth/login` body.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub app_key: String,
    pub device_id: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("app_key", &self.app_key)
            .field("device_id", &self.device_id)
            .finish()
    }
}

/// Envelope data of a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub role: Role,
    pub user_status: AccountStatus,
    #[serde(default)]
    pub has_card: bool,
}

/// Envelope data of `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
    pub role: Role,
    pub status: AccountStatus,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<String>,
}

/// `POST /auth/register` body.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Application offered on the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicApp {
    pub app_key: String,
    pub app_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicApps {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub apps: Vec<PublicApp>,
}

/// The three calls the session lifecycle depends on.
///
/// Injected into [`crate::SessionStore`] and [`crate::NavigationGuard`] so
/// both can be exercised without a server.
#[async_trait]
pub trait AuthEndpoints: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse>;
    async fn current_user(&self) -> ApiResult<CurrentUser>;
    async fn logout(&self) -> ApiResult<()>;
}

/// HTTP implementation of the auth endpoints.
#[derive(Debug, Clone)]
pub struct AuthApi {
    transport: Transport,
}

impl AuthApi {
    pub fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Create an account. Returns the stored user record.
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<CurrentUser> {
        self.transport.post("/auth/register", request).await
    }

    /// Applications a user may sign in to.
    pub async fn public_apps(&self) -> ApiResult<PublicApps> {
        self.transport.get("/app/public/list").await
    }
}

#[async_trait]
impl AuthEndpoints for AuthApi {
    async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        self.transport.post("/auth/login", request).await
    }

    async fn current_user(&self) -> ApiResult<CurrentUser> {
        self.transport.get("/auth/me").await
    }

    async fn logout(&self) -> ApiResult<()> {
        let _: IgnoredAny = self.transport.post_empty("/auth/logout").await?;
        Ok(())
    }
}
