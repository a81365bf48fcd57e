use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use gallery_core::error::snippet;
use gallery_core::{
    GalleryError, GalleryRecord, IconConfirmation, IconUploadForm, IconUploadRequest, Session,
    UploadOutcome,
};
use gallery_client::{PresignedUploadClient, SessionManager};
use gallery_imaging::ImageTranscoder;
use gallery_parser::csrf::TOKEN_FIELD;
use gallery_parser::parse_upload_form;

use crate::classifier::{Classification, ResponseClassifier};

/// Progress of one upload attempt. `Failed` is reported through
/// [`UploadError::reached`], which holds the last stage completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    NotAuthenticated,
    Authenticated,
    FormFetched,
    Transcoded,
    StoredRemotely,
    Confirmed,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadStage::NotAuthenticated => "not authenticated",
            UploadStage::Authenticated => "authenticated",
            UploadStage::FormFetched => "form fetched",
            UploadStage::Transcoded => "transcoded",
            UploadStage::StoredRemotely => "stored remotely",
            UploadStage::Confirmed => "confirmed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{source} (after: {reached})")]
pub struct UploadError {
    pub reached: UploadStage,
    #[source]
    pub source: GalleryError,
    /// Set once the bytes are in storage, so a failed confirmation can still
    /// be traced to the orphaned object.
    pub stored: Option<UploadOutcome>,
}

impl UploadError {
    fn at(reached: UploadStage) -> impl FnOnce(GalleryError) -> UploadError {
        move |source| UploadError {
            reached,
            source,
            stored: None,
        }
    }
}

pub struct IconUploadOrchestrator {
    sessions: SessionManager,
    storage: PresignedUploadClient,
    transcoder: ImageTranscoder,
    classifier: Arc<dyn ResponseClassifier>,
    response_dump_dir: Option<PathBuf>,
}

impl IconUploadOrchestrator {
    pub fn new(
        sessions: SessionManager,
        transcoder: ImageTranscoder,
        classifier: Arc<dyn ResponseClassifier>,
    ) -> Self {
        let storage = PresignedUploadClient::new(sessions.fetcher().transport());
        Self {
            sessions,
            storage,
            transcoder,
            classifier,
            response_dump_dir: None,
        }
    }

    /// Write every confirmation response to `upload_response_{gallery_id}.html`
    /// in `dir`.
    pub fn with_response_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.response_dump_dir = Some(dir.into());
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub async fn upload(
        &self,
        session: &mut Session,
        request: &IconUploadRequest,
    ) -> Result<IconConfirmation, UploadError> {
        let gallery_id = request.gallery_id.as_str();
        let filename = request.filename();

        self.sessions
            .require_login(session)
            .await
            .map_err(UploadError::at(UploadStage::NotAuthenticated))?;
        debug!(gallery_id, stage = %UploadStage::Authenticated, "session logged in");

        let form = self
            .fetch_form(session, gallery_id)
            .await
            .map_err(UploadError::at(UploadStage::Authenticated))?;
        debug!(gallery_id, stage = %UploadStage::FormFetched, "upload form ready");

        let jpeg = self
            .transcode(request.local_image_path.clone())
            .await
            .map_err(UploadError::at(UploadStage::FormFetched))?;
        debug!(gallery_id, bytes = jpeg.len(), stage = %UploadStage::Transcoded, "icon transcoded");

        let stored = self
            .storage
            .upload(jpeg, &filename, &form.presigned)
            .await
            .map_err(UploadError::at(UploadStage::Transcoded))?;
        info!(gallery_id, key = %stored.stored_key, stage = %UploadStage::StoredRemotely, "icon stored");

        let keyword = request.effective_keyword();
        match self.confirm(session, request, &form, &stored, &keyword).await {
            Ok(()) => {
                info!(gallery_id, filename = %filename, keyword = %keyword, "icon upload confirmed");
                Ok(IconConfirmation {
                    gallery_id: gallery_id.to_string(),
                    filename,
                    keyword,
                    stored,
                })
            }
            Err(source) => {
                warn!(gallery_id, filename = %filename, error = %source, "icon upload not confirmed");
                Err(UploadError {
                    reached: UploadStage::StoredRemotely,
                    source,
                    stored: Some(stored),
                })
            }
        }
    }

    async fn fetch_form(&self, session: &mut Session, gallery_id: &str) -> Result<IconUploadForm, GalleryError> {
        let path = GalleryRecord::add_icon_path(gallery_id);
        let page = self.sessions.fetcher().get(session, &path).await?;
        parse_upload_form(&page.text(), &page.final_url, gallery_id)
    }

    async fn transcode(&self, path: PathBuf) -> Result<Vec<u8>, GalleryError> {
        let transcoder = self.transcoder;
        tokio::task::spawn_blocking(move || transcoder.transcode(&path))
            .await
            .map_err(|e| GalleryError::Transcode(format!("transcoding task failed: {}", e)))?
    }

    /// Tell the host application about the stored object and classify its answer.
    async fn confirm(
        &self,
        session: &mut Session,
        request: &IconUploadRequest,
        form: &IconUploadForm,
        stored: &UploadOutcome,
        keyword: &str,
    ) -> Result<(), GalleryError> {
        let fields = confirmation_fields(request, form, stored, keyword);
        if let Some(source) = &request.source_url {
            debug!(source = %source, "source url replaced by the stored location");
        }

        let response = self
            .sessions
            .fetcher()
            .post_form(session, form.action_url.clone(), fields)
            .await?;
        let body = response.text();
        info!(
            gallery_id = %request.gallery_id,
            status = response.status,
            initial_status = response.initial_status,
            "confirmation submitted"
        );
        self.dump_response(&request.gallery_id, &body);

        match self
            .classifier
            .classify(response.initial_status, response.status, &body)
        {
            Classification::Confirmed(by) => {
                debug!(confirmed_by = ?by, "confirmation classified");
                Ok(())
            }
            Classification::Rejected(message) => Err(GalleryError::Rejected(message)),
            Classification::Ambiguous => Err(GalleryError::AmbiguousOutcome {
                status: response.status,
                snippet: snippet(&body),
            }),
        }
    }

    fn dump_response(&self, gallery_id: &str, body: &str) {
        let Some(dir) = &self.response_dump_dir else {
            return;
        };
        let path = dir.join(format!("upload_response_{}.html", gallery_id));
        match std::fs::write(&path, body) {
            Ok(()) => debug!(path = %path.display(), "confirmation response saved"),
            Err(e) => warn!(path = %path.display(), error = %e, "could not save confirmation response"),
        }
    }
}

fn confirmation_fields(
    request: &IconUploadRequest,
    form: &IconUploadForm,
    stored: &UploadOutcome,
    keyword: &str,
) -> Vec<(String, String)> {
    let mut fields = vec![
        (TOKEN_FIELD.to_string(), form.authenticity_token.clone()),
        ("icons[][url]".to_string(), stored.stored_location.clone()),
        ("icons[][keyword]".to_string(), keyword.to_string()),
    ];
    if let Some(credit) = request.credit.as_deref().filter(|c| !c.trim().is_empty()) {
        fields.push(("icons[][credit]".to_string(), credit.to_string()));
    }
    fields.push(("icons[][s3_key]".to_string(), stored.stored_key.clone()));
    fields.push(("icons[][filename]".to_string(), request.filename()));
    fields
}
