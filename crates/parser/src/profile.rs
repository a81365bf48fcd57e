use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::html::static_selector;

static USER_LINK: Lazy<Selector> = Lazy::new(|| static_selector("a[href*='/users/']"));
static USER_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/users/(\d+)(/|$|\?)").unwrap_or_else(|e| panic!("invalid user id pattern: {e}"))
});

/// Every anchor href on the page that points into `/users/`.
pub fn profile_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&USER_LINK)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// The signed-in user's numeric id. Links to `/users/{id}/galleries` win over
/// plain profile links.
pub fn user_id_from_links(links: &[String]) -> Option<String> {
    let galleries_link = links
        .iter()
        .filter(|l| l.contains("/galleries"))
        .find_map(|l| capture_id(l));

    galleries_link.or_else(|| links.iter().find_map(|l| capture_id(l)))
}

fn capture_id(link: &str) -> Option<String> {
    USER_ID
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
