use std::sync::Arc;

use rand::Rng;
use tracing::{debug, info, warn};

use gallery_core::error::snippet;
use gallery_core::{
    FilePart, GalleryError, PageRequest, PresignedUploadForm, RequestBody, UploadOutcome,
};

use crate::transport::HttpTransport;

/// Placeholder the storage policy expects to be replaced by the object name.
pub const FILENAME_PLACEHOLDER: &str = "${filename}";

const KEY_PREFIX_LEN: usize = 20;
const KEY_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const UPLOAD_MIME: &str = "image/jpeg";
/// The only status the storage endpoint returns for a stored object.
const CREATED: u16 = 201;

/// 20 random lowercase alphanumerics. Only used to keep storage keys from
/// colliding; not a secret.
pub fn random_key_prefix() -> String {
    let mut rng = rand::thread_rng();
    (0..KEY_PREFIX_LEN)
        .map(|_| KEY_CHARSET[rng.gen_range(0..KEY_CHARSET.len())] as char)
        .collect()
}

/// Replace the placeholder with `{prefix}_{filename}`. Templates without the
/// placeholder are used verbatim.
pub fn substitute_key(template: &str, prefix: &str, filename: &str) -> String {
    if template.contains(FILENAME_PLACEHOLDER) {
        template.replace(FILENAME_PLACEHOLDER, &format!("{}_{}", prefix, filename))
    } else {
        template.to_string()
    }
}

/// Direct-to-storage upload through a presigned POST form.
pub struct PresignedUploadClient {
    transport: Arc<dyn HttpTransport>,
}

impl PresignedUploadClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        form: &PresignedUploadForm,
    ) -> Result<UploadOutcome, GalleryError> {
        let url = url::Url::parse(&form.post_url).map_err(|e| GalleryError::FormDataInvalid {
            field: "data-url".into(),
            reason: e.to_string(),
        })?;

        let key = substitute_key(&form.key_template, &random_key_prefix(), filename);
        let request = PageRequest::post(
            url.clone(),
            RequestBody::Multipart {
                fields: Self::policy_fields(&key, form),
                file: FilePart {
                    field: "file".into(),
                    filename: filename.to_string(),
                    mime: UPLOAD_MIME.into(),
                    bytes,
                },
            },
        );

        info!(url = %url, key = %key, "uploading to storage");
        let response = self.transport.send(request).await?;
        let body = response.text();

        if response.status != CREATED {
            warn!(status = response.status, "storage upload rejected");
            return Err(GalleryError::StorageUploadFailed {
                status: Some(response.status),
                body: snippet(&body),
            });
        }

        let outcome = parse_ack(&body)?;
        debug!(location = %outcome.stored_location, "storage upload acknowledged");
        Ok(outcome)
    }

    /// `key` first, then the policy fields verbatim, then the content type.
    /// The file part goes last, as the storage service requires.
    fn policy_fields(key: &str, form: &PresignedUploadForm) -> Vec<(String, String)> {
        let mut fields = vec![("key".to_string(), key.to_string())];
        fields.extend(
            form.other_policy_fields
                .iter()
                .filter(|(k, _)| !k.eq_ignore_ascii_case("content-type"))
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        fields.push(("Content-Type".to_string(), UPLOAD_MIME.to_string()));
        fields
    }
}

/// Pull `Location` and `Key` out of the storage XML acknowledgment, matching
/// on local tag names so any namespace prefix is accepted.
pub fn parse_ack(body: &str) -> Result<UploadOutcome, GalleryError> {
    let doc = roxmltree::Document::parse(body).map_err(|e| GalleryError::StorageUploadFailed {
        status: Some(CREATED),
        body: format!("unparseable acknowledgment ({}): {}", e, snippet(body)),
    })?;

    let text_of = |name: &str| {
        doc.descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == name)
            .filter_map(|n| n.text())
            .map(str::trim)
            .find(|t| !t.is_empty())
            .map(str::to_string)
    };

    match (text_of("Location"), text_of("Key")) {
        (Some(stored_location), Some(stored_key)) => Ok(UploadOutcome {
            stored_location,
            stored_key,
        }),
        _ => Err(GalleryError::MalformedAck {
            body: snippet(body),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{ScriptedResponse, ScriptedTransport};
    use std::collections::BTreeMap;

    const ACK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PostResponse xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Location>https://bucket.s3.example/users%2F471%2Fabc_face.png</Location>
  <Bucket>bucket</Bucket>
  <Key>users/471/abc_face.png</Key>
  <ETag>"d41d8cd98f00b204e9800998ecf8427e"</ETag>
</PostResponse>"#;

    fn form() -> PresignedUploadForm {
        let mut other = BTreeMap::new();
        other.insert("policy".to_string(), "eyJ".to_string());
        other.insert("success_action_status".to_string(), "201".to_string());
        other.insert("content-type".to_string(), "image/png".to_string());
        PresignedUploadForm {
            key_template: "users/471/icons/${filename}".into(),
            other_policy_fields: other,
            post_url: "https://bucket.s3.example/".into(),
        }
    }

    #[test]
    fn test_random_key_prefix_charset() {
        for _ in 0..50 {
            let prefix = random_key_prefix();
            assert_eq!(prefix.len(), 20);
            assert!(prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_substitute_key() {
        for name in ["face.png", "${filename}.png", "with space.jpg"] {
            let key = substitute_key("users/471/icons/${filename}", &random_key_prefix(), name);
            assert!(key.ends_with(name));
            assert!(key.starts_with("users/471/icons/"));
            if name != "${filename}.png" {
                assert!(!key.contains(FILENAME_PLACEHOLDER));
            }
        }

        assert_eq!(substitute_key("fixed/key.jpg", "abc", "face.png"), "fixed/key.jpg");
        assert_eq!(
            substitute_key("a/${filename}", "p0q1", "face.png"),
            "a/p0q1_face.png"
        );
    }

    #[test]
    fn test_parse_ack_namespaced() {
        let outcome = parse_ack(ACK).unwrap();
        assert_eq!(
            outcome.stored_location,
            "https://bucket.s3.example/users%2F471%2Fabc_face.png"
        );
        assert_eq!(outcome.stored_key, "users/471/abc_face.png");

        let prefixed = r#"<s3:PostResponse xmlns:s3="urn:x"><s3:Location>L</s3:Location><s3:Key>K</s3:Key></s3:PostResponse>"#;
        let outcome = parse_ack(prefixed).unwrap();
        assert_eq!((outcome.stored_location.as_str(), outcome.stored_key.as_str()), ("L", "K"));
    }

    #[test]
    fn test_parse_ack_missing_element() {
        let no_key = "<PostResponse><Location>L</Location></PostResponse>";
        assert!(matches!(parse_ack(no_key), Err(GalleryError::MalformedAck { .. })));

        let no_location = "<PostResponse><Key>K</Key></PostResponse>";
        assert!(matches!(parse_ack(no_location), Err(GalleryError::MalformedAck { .. })));

        assert!(matches!(
            parse_ack("not xml at all"),
            Err(GalleryError::StorageUploadFailed { status: Some(201), .. })
        ));
    }

    #[tokio::test]
    async fn test_upload_sends_policy_fields_and_parses_ack() {
        let transport = ScriptedTransport::new(|_| Ok(ScriptedResponse::xml(201, ACK)));
        let client = PresignedUploadClient::new(transport.clone());

        let outcome = client
            .upload(vec![0xFF, 0xD8, 0xFF], "face.png", &form())
            .await
            .unwrap();
        assert_eq!(outcome.stored_key, "users/471/abc_face.png");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.url.as_str(), "https://bucket.s3.example/");
        assert!(req.cookie_header.is_none());

        let key = req.field("key").unwrap();
        assert!(key.starts_with("users/471/icons/"));
        assert!(key.ends_with("_face.png"));
        assert_eq!(req.field("policy"), Some("eyJ"));
        assert_eq!(req.field("Content-Type"), Some("image/jpeg"));
        assert_eq!(req.field("content-type"), None);

        match &req.body {
            RequestBody::Multipart { fields, file } => {
                assert_eq!(fields[0].0, "key");
                assert_eq!(file.field, "file");
                assert_eq!(file.filename, "face.png");
                assert_eq!(file.mime, "image/jpeg");
                assert_eq!(file.bytes, vec![0xFF, 0xD8, 0xFF]);
            }
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_non_201_carries_body() {
        let transport = ScriptedTransport::new(|_| {
            Ok(ScriptedResponse::xml(403, "<Error><Code>AccessDenied</Code></Error>"))
        });
        let client = PresignedUploadClient::new(transport);

        let err = client.upload(vec![1], "face.png", &form()).await.unwrap_err();
        match err {
            GalleryError::StorageUploadFailed { status, body } => {
                assert_eq!(status, Some(403));
                assert!(body.contains("AccessDenied"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_201_without_key_is_error() {
        let transport = ScriptedTransport::new(|_| {
            Ok(ScriptedResponse::xml(201, "<PostResponse><Location>L</Location></PostResponse>"))
        });
        let client = PresignedUploadClient::new(transport);

        let err = client.upload(vec![1], "face.png", &form()).await.unwrap_err();
        assert!(matches!(err, GalleryError::MalformedAck { .. }));
    }
}
