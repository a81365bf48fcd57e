//! Cookie storage for one logged-in session on the host application.
//! Cookies live in a `reqwest` jar so they are only ever sent back to the
//! host that set them. Persisted as flat name -> value JSON so a restart can
//! skip the login form.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use tracing::{debug, warn};
use url::Url;

use crate::error::GalleryError;

/// Explicit session state threaded through every operation.
/// Login state is not stored here; it is recomputed from the homepage on demand.
#[derive(Debug)]
pub struct Session {
    base_url: Url,
    jar: Arc<Jar>,
}

impl Session {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            jar: Arc::new(Jar::default()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path or absolute URL against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, GalleryError> {
        self.base_url
            .join(path)
            .map_err(|e| GalleryError::Config(format!("invalid path {}: {}", path, e)))
    }

    /// `Cookie` header for a request to `url`; `None` when the jar holds
    /// nothing for that host and path.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        self.jar
            .cookies(url)
            .and_then(|v| v.to_str().ok().map(str::to_string))
    }

    /// Merge the `Set-Cookie` values of a response received from `url`,
    /// key by key. Nothing is removed.
    pub fn store_set_cookies<S: AsRef<str>>(&self, headers: &[S], url: &Url) {
        for header in headers {
            self.jar.add_cookie_str(header.as_ref(), url);
        }
        if !headers.is_empty() {
            debug!(url = %url, count = headers.len(), "session cookies updated");
        }
    }

    /// Set a host cookie for the base URL.
    pub fn set_cookie(&self, name: &str, value: &str) {
        self.jar
            .add_cookie_str(&format!("{}={}; Path=/", name, value), &self.base_url);
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies().remove(name)
    }

    /// Every cookie the jar would send to the base URL.
    pub fn cookies(&self) -> BTreeMap<String, String> {
        self.cookie_header(&self.base_url)
            .map(|header| {
                header
                    .split(';')
                    .filter_map(|pair| pair.trim().split_once('='))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write the base URL's cookies as flat JSON.
    pub fn save_cookies(&self, path: &Path) -> Result<(), GalleryError> {
        let cookies = self.cookies();
        let json = serde_json::to_string_pretty(&cookies)
            .map_err(|e| GalleryError::Config(e.to_string()))?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), cookies = cookies.len(), "session cookies saved");
        Ok(())
    }

    /// Replace the jar wholesale from a file. A missing or corrupt file leaves
    /// the session as it was and returns false.
    pub fn load_cookies(&mut self, path: &Path) -> bool {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no saved session");
                return false;
            }
        };

        match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
            Ok(cookies) => {
                let jar = Jar::default();
                for (name, value) in &cookies {
                    jar.add_cookie_str(&format!("{}={}; Path=/", name, value), &self.base_url);
                }
                self.jar = Arc::new(jar);
                debug!(path = %path.display(), cookies = cookies.len(), "session cookies loaded");
                true
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring corrupt cookie file");
                false
            }
        }
    }
}
