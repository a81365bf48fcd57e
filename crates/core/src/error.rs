use thiserror::Error;

/// Longest body excerpt kept inside an error for diagnostics.
pub const SNIPPET_LEN: usize = 500;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("anti-forgery token not found on {0}")]
    TokenMissing(String),

    #[error("not logged in")]
    AuthRequired,

    #[error("login rejected: {}", .reason.as_deref().unwrap_or("invalid credentials"))]
    InvalidCredentials { reason: Option<String> },

    #[error("network error: {0}")]
    Network(String),

    #[error("form not found: {0}")]
    FormNotFound(String),

    #[error("invalid upload form data in {field}: {reason}")]
    FormDataInvalid { field: String, reason: String },

    #[error("transcode error: {0}")]
    Transcode(String),

    #[error("storage upload failed (status {}): {body}", .status.map(|s| s.to_string()).unwrap_or_else(|| "none".into()))]
    StorageUploadFailed { status: Option<u16>, body: String },

    #[error("storage acknowledgment missing Location or Key: {body}")]
    MalformedAck { body: String },

    #[error("upload rejected: {}", .0.as_deref().unwrap_or("no message"))]
    Rejected(Option<String>),

    #[error("unrecognized confirmation response (status {status}): {snippet}")]
    AmbiguousOutcome { status: u16, snippet: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GalleryError {
    /// True for the storage-phase failures, including a malformed acknowledgment.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            GalleryError::StorageUploadFailed { .. } | GalleryError::MalformedAck { .. }
        )
    }
}

/// Truncate a response body to at most [`SNIPPET_LEN`] bytes on a char boundary.
pub fn snippet(body: &str) -> String {
    if body.len() <= SNIPPET_LEN {
        return body.to_string();
    }
    let mut end = SNIPPET_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
