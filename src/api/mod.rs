//! REST client for the POS backend.
//!
//! Every response body is an envelope `{status, message?, data}`. Calls
//! behind `/admin` carry the session token as a bearer header.

use pos_events::{DashboardStats, Order, OrderItem, Table, TableStatus, UserRole};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::session::SessionStore;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("{0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("not logged in")]
    Unauthenticated,
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// True when the server refused the token
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Unauthenticated => true,
            Self::Status { status, .. } => {
                *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
            }
            _ => false,
        }
    }
}

/// Response envelope shared by every endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    pub status: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<UserRole>,
}

/// `data` of a successful login
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoginData {
    pub token: String,
    pub user_role: UserRole,
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Profile {
    #[serde(alias = "id")]
    pub user_id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "role")]
    pub user_role: Option<UserRole>,
}

/// An order line waiting in the kitchen
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PendingItem {
    pub order_id: u64,
    #[serde(default)]
    pub table_number: Option<u32>,
    #[serde(flatten)]
    pub item: OrderItem,
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        session: SessionStore,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        // Validate once so request paths only need joining
        Url::parse(base_url)?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(
                    "Failed to build HTTP client with custom config: {}. Using default.",
                    e
                );
                Client::default()
            });

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!(
            "{}/{}",
            self.base_url,
            path.trim_start_matches('/')
        ))?)
    }

    /// Issue a request and check the envelope. Non-2xx and `status: false`
    /// both become errors.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authenticated: bool,
    ) -> Result<ApiResponse<T>, ApiError> {
        let url = self.url(path)?;
        debug!(%method, %url, "API request");

        let mut request = self.client.request(method, url);
        if authenticated {
            let token = self.session.token().ok_or(ApiError::Unauthenticated)?;
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<Value>>(&text)
                .ok()
                .and_then(|r| r.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(ApiError::Status { status, message });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&text).map_err(|e| ApiError::Malformed(e.to_string()))?;
        if !envelope.status {
            return Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "request was rejected".to_string()),
            ));
        }
        Ok(envelope)
    }

    /// `Ok(None)` means the server accepted the call but sent no `data`.
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authenticated: bool,
    ) -> Result<Option<T>, ApiError> {
        Ok(self.request(method, path, body, authenticated).await?.data)
    }

    async fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, ApiError> {
        self.call(method, path, None, true)
            .await?
            .ok_or_else(|| ApiError::Malformed(format!("{} has no data", path)))
    }

    /// POST /login
    pub async fn login(&self, credentials: &Credentials) -> Result<LoginData, ApiError> {
        let body = serde_json::to_value(credentials).map_err(|e| ApiError::Malformed(e.to_string()))?;
        self.call(Method::POST, "/login", Some(body), false)
            .await?
            .ok_or_else(|| ApiError::Malformed("login response has no data".to_string()))
    }

    /// POST /register
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>, ApiError> {
        let body =
            serde_json::to_value(registration).map_err(|e| ApiError::Malformed(e.to_string()))?;
        let envelope = self
            .request::<Value>(Method::POST, "/register", Some(body), false)
            .await?;
        Ok(envelope.message)
    }

    /// POST /logout
    pub async fn logout(&self) -> Result<(), ApiError> {
        self.call::<Value>(Method::POST, "/logout", None, true).await?;
        Ok(())
    }

    /// GET /admin/profile
    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.fetch(Method::GET, "/admin/profile").await
    }

    /// GET /admin/dashboard/stats
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.fetch(Method::GET, "/admin/dashboard/stats").await
    }

    /// GET /admin/tables
    pub async fn tables(&self) -> Result<Vec<Table>, ApiError> {
        Ok(self
            .call(Method::GET, "/admin/tables", None, true)
            .await?
            .unwrap_or_default())
    }

    /// GET /admin/tables/:id
    pub async fn table(&self, id: u64) -> Result<Table, ApiError> {
        self.fetch(Method::GET, &format!("/admin/tables/{}", id)).await
    }

    /// PATCH /admin/tables/:id
    pub async fn update_table_status(
        &self,
        id: u64,
        status: TableStatus,
    ) -> Result<Option<Table>, ApiError> {
        let body = serde_json::json!({ "status": status });
        self.call(
            Method::PATCH,
            &format!("/admin/tables/{}", id),
            Some(body),
            true,
        )
        .await
    }

    /// GET /admin/kitchen/display
    pub async fn kitchen_display(&self) -> Result<Vec<Order>, ApiError> {
        Ok(self
            .call(Method::GET, "/admin/kitchen/display", None, true)
            .await?
            .unwrap_or_default())
    }

    /// GET /admin/kitchen/pending-items
    pub async fn pending_items(&self) -> Result<Vec<PendingItem>, ApiError> {
        Ok(self
            .call(Method::GET, "/admin/kitchen/pending-items", None, true)
            .await?
            .unwrap_or_default())
    }

    /// POST /admin/orders/:id/start-cooking
    pub async fn start_cooking(&self, order_id: u64) -> Result<(), ApiError> {
        self.call::<Value>(
            Method::POST,
            &format!("/admin/orders/{}/start-cooking", order_id),
            None,
            true,
        )
        .await?;
        Ok(())
    }

    /// POST /admin/orders/:id/finish-cooking
    pub async fn finish_cooking(&self, order_id: u64) -> Result<(), ApiError> {
        self.call::<Value>(
            Method::POST,
            &format!("/admin/orders/{}/finish-cooking", order_id),
            None,
            true,
        )
        .await?;
        Ok(())
    }
}
