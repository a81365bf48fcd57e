use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::html::static_selector;

static LOGIN_LINK: Lazy<Selector> = Lazy::new(|| static_selector("a[href='/login']"));
static USER_MENU: Lazy<Selector> = Lazy::new(|| static_selector("div.user-menu"));

/// Which homepage marker decided the login state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMarker {
    /// No `a[href="/login"]` on the page.
    LoginLinkAbsent,
    /// A `div.user-menu` is rendered.
    UserMenuPresent,
    /// The login link is shown and there is no user menu.
    LoggedOut,
}

/// Homepage heuristic; the host has no "whoami" endpoint.
pub struct LoginDetector;

impl LoginDetector {
    pub fn inspect(html: &str) -> LoginMarker {
        let document = Html::parse_document(html);

        if document.select(&LOGIN_LINK).next().is_none() {
            return LoginMarker::LoginLinkAbsent;
        }
        if document.select(&USER_MENU).next().is_some() {
            return LoginMarker::UserMenuPresent;
        }
        LoginMarker::LoggedOut
    }

    pub fn is_logged_in(html: &str) -> bool {
        Self::inspect(html) != LoginMarker::LoggedOut
    }
}
