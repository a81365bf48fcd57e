use scraper::Html;

use crate::html::{element_text, selector};

/// Server-rendered one-request notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    /// Any `div.flash`, as shown after a failed login.
    Any,
    Error,
    Success,
}

impl FlashKind {
    fn css(self) -> &'static str {
        match self {
            FlashKind::Any => "div.flash",
            FlashKind::Error => "div.flash.error",
            FlashKind::Success => "div.flash.success",
        }
    }
}

/// Trimmed text of the first matching flash div, if it has any.
pub fn flash_message(html: &str, kind: FlashKind) -> Option<String> {
    let sel = selector(kind.css())?;
    let document = Html::parse_document(html);
    document
        .select(&sel)
        .map(|el| element_text(&el))
        .find(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flash_error_message() {
        let html = r#"<div class="flash error">
            Your icons could not be saved because of the following problems:
            <ul><li>Url is invalid</li></ul></div>"#;
        assert_eq!(
            flash_message(html, FlashKind::Error).as_deref(),
            Some("Your icons could not be saved because of the following problems: Url is invalid")
        );
        assert!(flash_message(html, FlashKind::Any).is_some());
        assert_eq!(flash_message(html, FlashKind::Success), None);
    }

    #[test]
    fn test_empty_flash_ignored() {
        let html = r#"<div class="flash"> </div><div class="flash">You are not logged in.</div>"#;
        assert_eq!(
            flash_message(html, FlashKind::Any).as_deref(),
            Some("You are not logged in.")
        );
    }
}
