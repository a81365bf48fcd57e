use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use gallery_core::{FetchResponse, GalleryError, GalleryIcon, GalleryRecord, Session};
use gallery_parser::csrf::TOKEN_FIELD;
use gallery_parser::{
    flash_message, profile_links, user_id_from_links, CsrfExtractor, FlashKind,
    GalleryCatalogParser, GalleryIconParser, LoginDetector, LoginMarker,
};

use crate::fetcher::HttpPageFetcher;

const HOME_PATH: &str = "/";
const LOGIN_PATH: &str = "/login";
const LOGIN_COMMIT: &str = "Log in";

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub remember: bool,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, remember: bool) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            remember,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("remember", &self.remember)
            .finish()
    }
}

/// Login, login-state detection and cookie persistence for one host.
///
/// Every operation takes the [`Session`] explicitly. Login state is never
/// cached: each check refetches the homepage.
#[derive(Clone)]
pub struct SessionManager {
    fetcher: HttpPageFetcher,
    cookie_file: Option<PathBuf>,
}

impl SessionManager {
    pub fn new(fetcher: HttpPageFetcher) -> Self {
        Self {
            fetcher,
            cookie_file: None,
        }
    }

    /// Cookies are written here after every successful login.
    pub fn with_cookie_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.cookie_file = Some(path.into());
        self
    }

    pub fn fetcher(&self) -> &HttpPageFetcher {
        &self.fetcher
    }

    /// Fresh anti-forgery token from the homepage.
    pub async fn csrf_token(&self, session: &mut Session) -> Result<String, GalleryError> {
        let page = self.fetcher.get(session, HOME_PATH).await?;
        if !page.is_success() {
            return Err(GalleryError::Network(format!(
                "homepage returned HTTP {}",
                page.status
            )));
        }
        let (token, source) = CsrfExtractor::extract(&page.text())
            .ok_or_else(|| GalleryError::TokenMissing(page.final_url.to_string()))?;
        debug!(source = ?source, "csrf token extracted");
        Ok(token)
    }

    /// Submit the login form. Short of a 5xx, the POST's status is not
    /// trusted; success is decided by re-checking the homepage afterwards.
    pub async fn login(
        &self,
        session: &mut Session,
        credentials: &Credentials,
    ) -> Result<(), GalleryError> {
        let token = self.csrf_token(session).await?;

        let mut fields = vec![
            (TOKEN_FIELD.to_string(), token),
            ("username".to_string(), credentials.username.clone()),
            ("password".to_string(), credentials.password.clone()),
            ("commit".to_string(), LOGIN_COMMIT.to_string()),
        ];
        if credentials.remember {
            fields.push(("remember_me".to_string(), "1".to_string()));
        }

        info!(username = %credentials.username, "logging in");
        let url = session.url(LOGIN_PATH)?;
        let response = self.fetcher.post_form(session, url, fields).await?;
        debug!(status = response.status, initial_status = response.initial_status, "login submitted");
        if response.status >= 500 {
            warn!(status = response.status, "login endpoint failed");
            return Err(GalleryError::Network(format!(
                "login returned HTTP {}",
                response.status
            )));
        }

        if !self.is_logged_in(session).await? {
            let reason = flash_message(&response.text(), FlashKind::Any);
            warn!(username = %credentials.username, reason = ?reason, "login failed");
            return Err(GalleryError::InvalidCredentials { reason });
        }

        info!(username = %credentials.username, "login successful");
        if let Some(path) = &self.cookie_file {
            if let Err(e) = self.save_session(session, path) {
                warn!(path = %path.display(), error = %e, "could not save cookies");
            }
        }
        Ok(())
    }

    /// An error page from the host counts as logged out.
    pub async fn is_logged_in(&self, session: &mut Session) -> Result<bool, GalleryError> {
        let page = self.fetcher.get(session, HOME_PATH).await?;
        if !page.is_success() {
            warn!(status = page.status, "homepage unavailable, treating session as logged out");
            return Ok(false);
        }
        let marker = LoginDetector::inspect(&page.text());
        debug!(marker = ?marker, "login state checked");
        Ok(marker != LoginMarker::LoggedOut)
    }

    pub async fn require_login(&self, session: &mut Session) -> Result<(), GalleryError> {
        if self.is_logged_in(session).await? {
            Ok(())
        } else {
            Err(GalleryError::AuthRequired)
        }
    }

    pub fn save_session(&self, session: &Session, path: &Path) -> Result<(), GalleryError> {
        session.save_cookies(path)?;
        debug!(path = %path.display(), cookies = session.cookies().len(), "cookies saved");
        Ok(())
    }

    /// `false` leaves the session untouched and unauthenticated.
    pub fn load_session(&self, session: &mut Session, path: &Path) -> bool {
        let loaded = session.load_cookies(path);
        if loaded {
            info!(path = %path.display(), cookies = session.cookies().len(), "cookies loaded");
        } else {
            debug!(path = %path.display(), "no usable cookie file");
        }
        loaded
    }

    /// Authenticated GET of any path on the host.
    pub async fn fetch_page(&self, session: &mut Session, path: &str) -> Result<FetchResponse, GalleryError> {
        self.require_login(session).await?;
        self.fetcher.get(session, path).await
    }

    /// Every homepage link into a user profile.
    pub async fn user_profile_links(&self, session: &mut Session) -> Result<Vec<String>, GalleryError> {
        let page = self.fetcher.get(session, HOME_PATH).await?;
        let html = page.text();
        if !page.is_success() || !LoginDetector::is_logged_in(&html) {
            return Err(GalleryError::AuthRequired);
        }
        Ok(profile_links(&html))
    }

    pub async fn discover_user_id(&self, session: &mut Session) -> Result<String, GalleryError> {
        let links = self.user_profile_links(session).await?;
        let user_id = user_id_from_links(&links)
            .ok_or_else(|| GalleryError::FormNotFound("user profile link on homepage".into()))?;
        debug!(user_id = %user_id, "user id discovered");
        Ok(user_id)
    }

    pub async fn fetch_galleries(
        &self,
        session: &mut Session,
        user_id: Option<&str>,
    ) -> Result<Vec<GalleryRecord>, GalleryError> {
        let user_id = match user_id {
            Some(id) => {
                self.require_login(session).await?;
                id.to_string()
            }
            None => self.discover_user_id(session).await?,
        };

        let path = format!("/users/{}/galleries", user_id);
        let page = self.fetcher.get(session, &path).await?;
        let galleries = GalleryCatalogParser.parse(&page.text());
        info!(user_id = %user_id, count = galleries.len(), "galleries fetched");
        Ok(galleries)
    }

    pub async fn fetch_gallery_icons(
        &self,
        session: &mut Session,
        gallery_id: &str,
    ) -> Result<Vec<GalleryIcon>, GalleryError> {
        let page = self
            .fetch_page(session, &format!("/galleries/{}", gallery_id))
            .await?;
        let icons = GalleryIconParser::parse(&page.text());
        info!(gallery_id = %gallery_id, count = icons.len(), "gallery icons fetched");
        Ok(icons)
    }
}
