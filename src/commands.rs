pub mod browse;
pub mod resize;
pub mod upload;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;
use url::Url;

use gallery_client::{Credentials, HttpPageFetcher, ReqwestTransport, SessionManager};
use gallery_core::{AppConfig, Session};

/// A session restored from the cookie file, logged in if it was not already.
pub struct LoggedIn {
    pub manager: SessionManager,
    pub session: Session,
}

/// Credentials from `GLOWFIC_USERNAME`, `GLOWFIC_PASSWORD` and
/// `GLOWFIC_REMEMBER_ME`.
pub fn credentials_from_env() -> Option<Credentials> {
    let username = std::env::var("GLOWFIC_USERNAME").ok().filter(|v| !v.is_empty())?;
    let password = std::env::var("GLOWFIC_PASSWORD").ok().filter(|v| !v.is_empty())?;
    let remember = std::env::var("GLOWFIC_REMEMBER_ME")
        .map(|v| parse_flag(&v))
        .unwrap_or(false);
    Some(Credentials::new(username, password, remember))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "y")
}

pub async fn login(config: &AppConfig) -> Result<LoggedIn> {
    let base_url = Url::parse(&config.site.base_url)
        .with_context(|| format!("invalid base url {}", config.site.base_url))?;
    let transport = Arc::new(ReqwestTransport::new(&config.site)?);
    let fetcher = HttpPageFetcher::new(transport, config.site.max_redirects);
    let manager = SessionManager::new(fetcher).with_cookie_file(&config.session.cookie_file);

    let mut session = Session::new(base_url);
    manager.load_session(&mut session, &config.session.cookie_file);

    if manager.is_logged_in(&mut session).await? {
        info!("session restored from cookie file");
    } else {
        let Some(credentials) = credentials_from_env() else {
            bail!("not logged in; set GLOWFIC_USERNAME and GLOWFIC_PASSWORD");
        };
        manager.login(&mut session, &credentials).await?;
    }

    Ok(LoggedIn { manager, session })
}
