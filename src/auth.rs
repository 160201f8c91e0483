//! Login, registration and the startup auth check.

use pos_events::UserRole;
use tracing::{info, warn};

use crate::api::{ApiClient, ApiError, Credentials, Registration};
use crate::session::{SessionError, SessionStore, StoredUser};

pub const LOGIN_PATH: &str = "/login";

/// Landing path for a role
pub fn redirect_path(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "/admin/",
        UserRole::Chef => "/chef/",
        UserRole::Cleaner | UserRole::Staff => "/staff/",
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("could not save session: {0}")]
    Session(#[from] SessionError),
}

/// Result of the startup check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStatus {
    Authenticated { role: Option<UserRole> },
    /// Session cleared; send the user here
    LoginRequired { redirect: &'static str },
}

#[derive(Clone)]
pub struct AuthManager {
    api: ApiClient,
}

impl AuthManager {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn session(&self) -> &SessionStore {
        self.api.session()
    }

    /// Confirm the stored token is still accepted.
    ///
    /// Any failure clears the session. Network errors count too, since a
    /// dashboard without a profile cannot render anything useful.
    pub async fn check(&self) -> AuthStatus {
        if self.session().token().is_none() {
            return AuthStatus::LoginRequired {
                redirect: LOGIN_PATH,
            };
        }

        match self.api.profile().await {
            Ok(profile) => {
                let role = profile.user_role.or_else(|| self.session().user_role());
                info!(user = profile.user_id, role = ?role, "Session valid");
                AuthStatus::Authenticated { role }
            }
            Err(e) => {
                if e.is_auth_failure() {
                    info!("Session rejected: {}", e);
                } else {
                    warn!("Auth check failed: {}", e);
                }
                if let Err(e) = self.session().clear() {
                    warn!("Failed to clear session: {}", e);
                }
                AuthStatus::LoginRequired {
                    redirect: LOGIN_PATH,
                }
            }
        }
    }

    /// Log in, persist the session, and return where to go next.
    pub async fn login(&self, credentials: &Credentials) -> Result<&'static str, AuthError> {
        let data = self.api.login(credentials).await?;
        let user = StoredUser {
            user_id: data.user_id,
            user_role: data.user_role,
            username: data.username.clone().or_else(|| Some(credentials.username.clone())),
        };
        let user_data = serde_json::json!({
            "user_id": data.user_id,
            "user_role": data.user_role,
            "username": user.username,
        });
        self.session()
            .store_login(&data.token, &user, Some(&user_data))?;

        info!(user = data.user_id, role = %data.user_role, "Logged in");
        Ok(redirect_path(data.user_role))
    }

    /// Returns the server's confirmation message, if any.
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>, AuthError> {
        let message = self.api.register(registration).await?;
        info!(username = %registration.username, "Registered");
        Ok(message)
    }

    /// Tell the server (best effort) and always drop the local session.
    pub async fn logout(&self) -> Result<&'static str, AuthError> {
        if self.session().token().is_some() {
            if let Err(e) = self.api.logout().await {
                warn!("Server logout failed: {}", e);
            }
        }
        self.session().clear()?;
        info!("Logged out");
        Ok(LOGIN_PATH)
    }
}
