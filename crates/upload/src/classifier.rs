use gallery_core::config::ClassifierConfig;
use gallery_parser::{flash_message, FlashKind};

/// What the host said about a confirmation POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Confirmed(ConfirmedBy),
    Rejected(Option<String>),
    Ambiguous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmedBy {
    SuccessMarker,
    GalleryView(String),
    Status(u16),
}

pub trait ResponseClassifier: Send + Sync {
    /// `initial_status` is the status before any redirect was followed,
    /// `status` the one of the page finally rendered.
    fn classify(&self, initial_status: u16, status: u16, body: &str) -> Classification;
}

/// Substring heuristics, checked in a fixed order:
/// error marker, success marker or gallery-view marker, redirect/creation
/// status, then ambiguous.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    error_marker: String,
    success_marker: String,
    gallery_view_markers: Vec<String>,
}

impl Default for MarkerClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl MarkerClassifier {
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            error_marker: config.error_marker.clone(),
            success_marker: config.success_marker.clone(),
            gallery_view_markers: config
                .gallery_view_markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
        }
    }

    fn confirming_status(initial_status: u16, status: u16) -> Option<u16> {
        if matches!(initial_status, 201 | 302 | 303) {
            Some(initial_status)
        } else if status == 201 {
            Some(status)
        } else {
            None
        }
    }
}

impl ResponseClassifier for MarkerClassifier {
    fn classify(&self, initial_status: u16, status: u16, body: &str) -> Classification {
        if body.contains(&self.error_marker) {
            return Classification::Rejected(flash_message(body, FlashKind::Error));
        }
        if body.contains(&self.success_marker) {
            return Classification::Confirmed(ConfirmedBy::SuccessMarker);
        }
        if let Some(marker) = self.gallery_view_markers.iter().find(|m| body.contains(m.as_str())) {
            return Classification::Confirmed(ConfirmedBy::GalleryView(marker.clone()));
        }
        match Self::confirming_status(initial_status, status) {
            Some(code) => Classification::Confirmed(ConfirmedBy::Status(code)),
            None => Classification::Ambiguous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ERROR_PAGE: &str =
        r#"<div class="flash error">Your icon could not be saved because of the following problems: Url is invalid</div>"#;
    const SUCCESS_PAGE: &str = r#"<div class="flash success">Icons saved successfully.</div>"#;

    #[test]
    fn test_error_marker_wins() {
        let both = format!("{}{}", SUCCESS_PAGE, ERROR_PAGE);
        let classifier = MarkerClassifier::default();
        match classifier.classify(302, 200, &both) {
            Classification::Rejected(Some(msg)) => assert!(msg.contains("Url is invalid")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            classifier.classify(201, 201, "<p>flash error</p>"),
            Classification::Rejected(None)
        );
    }

    #[test]
    fn test_success_marker_beats_status() {
        assert_eq!(
            MarkerClassifier::default().classify(200, 200, SUCCESS_PAGE),
            Classification::Confirmed(ConfirmedBy::SuccessMarker)
        );
    }

    #[test]
    fn test_gallery_view_marker() {
        let classifier = MarkerClassifier::from_config(&ClassifierConfig {
            gallery_view_markers: vec!["".into(), "gallery-icons".into()],
            ..ClassifierConfig::default()
        });
        assert_eq!(
            classifier.classify(200, 200, r#"<div id="gallery-icons"></div>"#),
            Classification::Confirmed(ConfirmedBy::GalleryView("gallery-icons".into()))
        );
        assert_eq!(classifier.classify(200, 200, "<p>hello</p>"), Classification::Ambiguous);
    }

    #[test]
    fn test_status_fallback() {
        let classifier = MarkerClassifier::default();
        assert_eq!(
            classifier.classify(302, 200, "<p>gallery</p>"),
            Classification::Confirmed(ConfirmedBy::Status(302))
        );
        assert_eq!(
            classifier.classify(201, 201, ""),
            Classification::Confirmed(ConfirmedBy::Status(201))
        );
        assert_eq!(classifier.classify(200, 200, "<p>Some Gallery</p>"), Classification::Ambiguous);
        assert_eq!(classifier.classify(422, 422, ""), Classification::Ambiguous);
    }
}
