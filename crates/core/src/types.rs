use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use url::Url;

/// Id of the bucket holding icons that belong to no gallery.
pub const GALLERYLESS_ID: &str = "0";
pub const GALLERYLESS_NAME: &str = "[Galleryless]";

/// One row of a user's gallery listing. `icon_count` is a snapshot taken at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub id: String,
    pub name: String,
    pub icon_count: u32,
    pub listing_url: String,
    pub add_icon_url: String,
}

impl GalleryRecord {
    pub fn add_icon_path(gallery_id: &str) -> String {
        format!("/galleries/{}/add", gallery_id)
    }

    pub fn is_galleryless(&self) -> bool {
        self.id == GALLERYLESS_ID
    }
}

/// An icon already stored in a gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryIcon {
    pub url: String,
    pub keyword: String,
}

/// Presigned-POST parameters scraped from the "add icon" form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUploadForm {
    pub key_template: String,
    pub other_policy_fields: BTreeMap<String, String>,
    pub post_url: String,
}

/// The "add icon" form as found on `/galleries/{id}/add`.
#[derive(Debug, Clone)]
pub struct IconUploadForm {
    /// Absolute URL the confirmation is POSTed to.
    pub action_url: Url,
    pub authenticity_token: String,
    pub presigned: PresignedUploadForm,
}

/// Where the storage backend put the bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub stored_location: String,
    pub stored_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconUploadRequest {
    pub gallery_id: String,
    pub local_image_path: PathBuf,
    pub keyword: Option<String>,
    pub credit: Option<String>,
    pub source_url: Option<String>,
}

impl IconUploadRequest {
    pub fn new(gallery_id: impl Into<String>, local_image_path: impl Into<PathBuf>) -> Self {
        Self {
            gallery_id: gallery_id.into(),
            local_image_path: local_image_path.into(),
            keyword: None,
            credit: None,
            source_url: None,
        }
    }

    pub fn filename(&self) -> String {
        file_name(&self.local_image_path)
    }

    /// The explicit keyword, or the filename without its extension.
    pub fn effective_keyword(&self) -> String {
        match &self.keyword {
            Some(k) if !k.trim().is_empty() => k.clone(),
            _ => self
                .local_image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Result of a confirmed icon upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconConfirmation {
    pub gallery_id: String,
    pub filename: String,
    pub keyword: String,
    pub stored: UploadOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// Body of an outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// `application/x-www-form-urlencoded`; order preserved, keys may repeat.
    Form(Vec<(String, String)>),
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// Pre-rendered `Cookie` header, if any.
    pub cookie_header: Option<String>,
    pub body: RequestBody,
}

impl PageRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            cookie_header: None,
            body: RequestBody::Empty,
        }
    }

    pub fn post(url: Url, body: RequestBody) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            cookie_header: None,
            body,
        }
    }

    /// Value of a form or multipart field, first occurrence.
    pub fn field(&self, name: &str) -> Option<&str> {
        let fields = match &self.body {
            RequestBody::Form(f) => f,
            RequestBody::Multipart { fields, .. } => fields,
            RequestBody::Empty => return None,
        };
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub url: Url,
    pub final_url: Url,
    /// Status of the last response in the redirect chain.
    pub status: u16,
    /// Status of the first response, before any redirect was followed.
    pub initial_status: u16,
    pub headers: HashMap<String, String>,
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
    pub fetched_at: chrono::DateTime<chrono::Utc>,
    pub response_time_ms: u64,
}

impl FetchResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get("location").map(String::as_str)
    }
}
