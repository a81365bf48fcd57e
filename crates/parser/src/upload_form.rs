use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;
use url::Url;

use gallery_core::{GalleryError, IconUploadForm, PresignedUploadForm};

use crate::csrf::CsrfExtractor;
use crate::html::static_selector;

/// Stable marker class of the "add icon" form.
pub const UPLOAD_FORM_SELECTOR: &str = "form.icon-upload";

static UPLOAD_FORM: Lazy<Selector> = Lazy::new(|| static_selector(UPLOAD_FORM_SELECTOR));

const FORM_DATA_ATTR: &str = "data-form-data";
const POST_URL_ATTR: &str = "data-url";
const KEY_FIELD: &str = "key";

/// Extract the upload form of `/galleries/{gallery_id}/add`.
///
/// The CSRF token must come from inside the form. The presigned-POST fields
/// are a JSON object in `data-form-data`; the storage endpoint is `data-url`.
/// A missing `action` falls back to `/galleries/{gallery_id}/icon`.
pub fn parse_upload_form(
    html: &str,
    page_url: &Url,
    gallery_id: &str,
) -> Result<IconUploadForm, GalleryError> {
    let document = Html::parse_document(html);
    let form = document
        .select(&UPLOAD_FORM)
        .next()
        .ok_or_else(|| GalleryError::FormNotFound(format!("{} on {}", UPLOAD_FORM_SELECTOR, page_url)))?;

    let authenticity_token = CsrfExtractor::extract_in_form(&form)
        .ok_or_else(|| GalleryError::TokenMissing(page_url.to_string()))?;

    let default_action = format!("/galleries/{}/icon", gallery_id);
    let action = form
        .value()
        .attr("action")
        .filter(|a| !a.trim().is_empty())
        .unwrap_or(default_action.as_str());
    let action_url = page_url.join(action).map_err(|e| GalleryError::FormDataInvalid {
        field: "action".into(),
        reason: e.to_string(),
    })?;

    let raw_form_data = form.value().attr(FORM_DATA_ATTR).unwrap_or("{}");
    let post_url = form
        .value()
        .attr(POST_URL_ATTR)
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| GalleryError::FormDataInvalid {
            field: POST_URL_ATTR.into(),
            reason: "missing storage endpoint".into(),
        })?;

    let presigned = parse_presigned_fields(raw_form_data, post_url)?;
    debug!(
        action = %action_url,
        storage = %presigned.post_url,
        policy_fields = presigned.other_policy_fields.len(),
        "upload form parsed"
    );

    Ok(IconUploadForm {
        action_url,
        authenticity_token,
        presigned,
    })
}

/// Decode the `data-form-data` JSON object. Non-string scalars are kept in
/// their JSON text form; the `key` entry becomes the key template.
pub fn parse_presigned_fields(raw: &str, post_url: &str) -> Result<PresignedUploadForm, GalleryError> {
    let invalid = |reason: String| GalleryError::FormDataInvalid {
        field: FORM_DATA_ATTR.into(),
        reason,
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| invalid(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(invalid("expected a JSON object".into()));
    };

    let mut fields: BTreeMap<String, String> = map
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, v)
        })
        .collect();

    let key_template = fields
        .remove(KEY_FIELD)
        .ok_or_else(|| invalid(format!("no `{}` field", KEY_FIELD)))?;

    Ok(PresignedUploadForm {
        key_template,
        other_policy_fields: fields,
        post_url: post_url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://glowfic.example/galleries/27821/add").unwrap()
    }

    fn form_page(attrs: &str, inner: &str) -> String {
        format!(
            r#"<html><head><meta name="csrf-token" content="page-token"></head><body>
               <form class="icon-upload dropzone" {attrs}>{inner}</form></body></html>"#
        )
    }

    const TOKEN_INPUT: &str = r#"<input type="hidden" name="authenticity_token" value="form-token">"#;
    const FORM_DATA: &str = r#"data-form-data='{"key":"users/471/icons/${filename}","policy":"eyJ","x-amz-signature":"abc","success_action_status":"201","acl":"public-read"}'"#;

    #[test]
    fn test_parse_full_form() {
        let html = form_page(
            &format!(r#"action="/galleries/27821/icon" data-url="https://bucket.s3.example/" {FORM_DATA}"#),
            TOKEN_INPUT,
        );
        let form = parse_upload_form(&html, &page_url(), "27821").unwrap();

        assert_eq!(form.authenticity_token, "form-token");
        assert_eq!(form.action_url.as_str(), "https://glowfic.example/galleries/27821/icon");
        assert_eq!(form.presigned.key_template, "users/471/icons/${filename}");
        assert_eq!(form.presigned.post_url, "https://bucket.s3.example/");
        assert_eq!(
            form.presigned.other_policy_fields.get("success_action_status").map(String::as_str),
            Some("201")
        );
        assert!(!form.presigned.other_policy_fields.contains_key("key"));
        assert_eq!(form.presigned.other_policy_fields.len(), 4);
    }

    #[test]
    fn test_default_action() {
        let html = form_page(&format!(r#"data-url="https://bucket.s3.example/" {FORM_DATA}"#), TOKEN_INPUT);
        let form = parse_upload_form(&html, &page_url(), "27821").unwrap();
        assert_eq!(form.action_url.as_str(), "https://glowfic.example/galleries/27821/icon");
    }

    #[test]
    fn test_token_must_be_inside_form() {
        let html = form_page(&format!(r#"data-url="https://bucket.s3.example/" {FORM_DATA}"#), "");
        let err = parse_upload_form(&html, &page_url(), "27821").unwrap_err();
        assert!(matches!(err, GalleryError::TokenMissing(_)));
    }

    #[test]
    fn test_missing_form() {
        let err = parse_upload_form("<form class='other'></form>", &page_url(), "1").unwrap_err();
        assert!(matches!(err, GalleryError::FormNotFound(_)));
    }

    #[test]
    fn test_invalid_form_data() {
        let html = form_page(
            r#"data-url="https://bucket.s3.example/" data-form-data='{not json'"#,
            TOKEN_INPUT,
        );
        let err = parse_upload_form(&html, &page_url(), "1").unwrap_err();
        assert!(matches!(err, GalleryError::FormDataInvalid { ref field, .. } if field == "data-form-data"));

        let html = form_page(r#"data-url="https://bucket.s3.example/" data-form-data='[1,2]'"#, TOKEN_INPUT);
        assert!(matches!(
            parse_upload_form(&html, &page_url(), "1"),
            Err(GalleryError::FormDataInvalid { .. })
        ));

        let html = form_page(FORM_DATA, TOKEN_INPUT);
        let err = parse_upload_form(&html, &page_url(), "1").unwrap_err();
        assert!(matches!(err, GalleryError::FormDataInvalid { ref field, .. } if field == "data-url"));
    }

    #[test]
    fn test_non_string_values_kept_as_json_text() {
        let presigned =
            parse_presigned_fields(r#"{"key":"k/${filename}","success_action_status":201}"#, "https://s3/")
                .unwrap();
        assert_eq!(
            presigned.other_policy_fields.get("success_action_status").map(String::as_str),
            Some("201")
        );
    }
}
