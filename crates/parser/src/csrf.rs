use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::html::static_selector;

pub const TOKEN_FIELD: &str = "authenticity_token";

static META_TOKEN: Lazy<Selector> = Lazy::new(|| static_selector("meta[name='csrf-token']"));
static HIDDEN_TOKEN: Lazy<Selector> =
    Lazy::new(|| static_selector("input[name='authenticity_token']"));

/// Where a token was found, in the order the strategies are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// `<meta name="csrf-token" content="...">` in the page head.
    MetaTag,
    /// `<input name="authenticity_token" value="...">` inside a form.
    HiddenInput,
}

pub struct CsrfExtractor;

impl CsrfExtractor {
    const PAGE_STRATEGIES: [TokenSource; 2] = [TokenSource::MetaTag, TokenSource::HiddenInput];

    /// Find a page-level token: meta tag first, then any hidden input.
    pub fn extract(html: &str) -> Option<(String, TokenSource)> {
        let document = Html::parse_document(html);

        for source in Self::PAGE_STRATEGIES {
            let found = match source {
                TokenSource::MetaTag => document
                    .select(&META_TOKEN)
                    .find_map(|el| non_empty(el.value().attr("content"))),
                TokenSource::HiddenInput => document
                    .select(&HIDDEN_TOKEN)
                    .find_map(|el| non_empty(el.value().attr("value"))),
            };

            if let Some(token) = found {
                debug!(source = ?source, "csrf token found");
                return Some((token, source));
            }
        }

        None
    }

    /// Token scoped to one form. Only the hidden input applies here, since the
    /// page-level meta token may belong to a different request.
    pub fn extract_in_form(form: &ElementRef) -> Option<String> {
        form.select(&HIDDEN_TOKEN)
            .find_map(|el| non_empty(el.value().attr("value")))
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
