//! POS Dashboard
//!
//! Runs one restaurant dashboard against a POS backend: checks the stored
//! session, routes to the landing page and keeps it live until Ctrl-C.
//!
//! Usage:
//!   pos-dashboard [#route]
//!   pos-dashboard login <username> <password>
//!   pos-dashboard logout

use anyhow::{bail, Result};
use pos_dashboard::api::{ApiClient, Credentials};
use pos_dashboard::auth::{AuthManager, AuthStatus};
use pos_dashboard::config;
use pos_dashboard::dashboard::{Dashboard, DashboardKind};
use pos_dashboard::live::TungsteniteConnector;
use pos_dashboard::router::Navigation;
use pos_dashboard::session::SessionStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pos_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::load_config()?;
    tracing::info!(?config, "Configuration loaded");

    let session = SessionStore::open(config.session_path())?;
    let api = ApiClient::new(&config.api_base_url, session, config.http_timeout())?;
    let auth = AuthManager::new(api.clone());

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("login") => {
            let (Some(username), Some(password)) = (args.get(1), args.get(2)) else {
                bail!("usage: pos-dashboard login <username> <password>");
            };
            let redirect = auth
                .login(&Credentials {
                    username: username.clone(),
                    password: password.clone(),
                })
                .await?;
            tracing::info!("Logged in, dashboard at {}", redirect);
            return Ok(());
        }
        Some("logout") => {
            auth.logout().await?;
            return Ok(());
        }
        _ => {}
    }

    let role = match auth.check().await {
        AuthStatus::Authenticated { role } => role,
        AuthStatus::LoginRequired { redirect } => {
            tracing::warn!("Not logged in; run `pos-dashboard login` ({})", redirect);
            return Ok(());
        }
    };
    let kind = config
        .dashboard
        .or_else(|| role.map(DashboardKind::for_role))
        .unwrap_or(DashboardKind::Admin);

    let shutdown = CancellationToken::new();
    let dashboard = Dashboard::build(
        kind,
        &config,
        api,
        Arc::new(TungsteniteConnector),
        shutdown.clone(),
    )?;

    let hash = args.first().map(String::as_str);
    match dashboard.start(hash).await {
        Navigation::Failed { attempts } => {
            tracing::error!(attempts, "Landing page failed to load")
        }
        outcome => tracing::info!(
            ?outcome,
            title = %dashboard.document().title(),
            "Dashboard ready at {}{}",
            kind.home_path(),
            dashboard.router().location_hash()
        ),
    }
    let health = dashboard.spawn_health_check();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    shutdown.cancel();
    dashboard.stop();
    health.await?;

    Ok(())
}
