use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use gallery_core::{file_name, IconConfirmation, IconUploadRequest, Session};

use crate::orchestrator::{IconUploadOrchestrator, UploadError};

/// Optional fields applied to every file of a batch. The keyword falls back
/// to each file's stem when unset.
#[derive(Debug, Clone, Default)]
pub struct UploadDefaults {
    pub keyword: Option<String>,
    pub credit: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub total: usize,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }
}

#[derive(Debug)]
pub enum BatchEvent {
    FileProcessed {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        path: PathBuf,
        result: Result<IconConfirmation, UploadError>,
    },
    Finished(BatchSummary),
}

/// Drives the orchestrator over a list of files, one at a time, on a task of
/// its own. The session is locked for the duration of each file.
#[derive(Clone)]
pub struct BatchRunner {
    orchestrator: Arc<IconUploadOrchestrator>,
    session: Arc<Mutex<Session>>,
}

impl BatchRunner {
    pub fn new(orchestrator: Arc<IconUploadOrchestrator>, session: Arc<Mutex<Session>>) -> Self {
        Self {
            orchestrator,
            session,
        }
    }

    /// Start the batch. Events arrive in file order, one per file, followed by
    /// a single `Finished`. Dropping the receiver does not cancel the batch.
    pub fn run(
        &self,
        gallery_id: impl Into<String>,
        files: Vec<PathBuf>,
        defaults: UploadDefaults,
    ) -> (mpsc::UnboundedReceiver<BatchEvent>, JoinHandle<BatchSummary>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let runner = self.clone();
        let gallery_id = gallery_id.into();

        let handle = tokio::spawn(async move {
            let total = files.len();
            let mut succeeded = 0;
            info!(gallery_id = %gallery_id, total, "batch started");

            for (i, path) in files.into_iter().enumerate() {
                let index = i + 1;
                let request = IconUploadRequest {
                    gallery_id: gallery_id.clone(),
                    local_image_path: path.clone(),
                    keyword: defaults.keyword.clone(),
                    credit: defaults.credit.clone(),
                    source_url: defaults.source_url.clone(),
                };

                let result = {
                    let mut session = runner.session.lock().await;
                    runner.orchestrator.upload(&mut session, &request).await
                };

                match &result {
                    Ok(_) => {
                        succeeded += 1;
                        info!(index, total, file = %file_name(&path), "uploaded");
                    }
                    Err(e) => warn!(index, total, file = %file_name(&path), error = %e, "upload failed"),
                }

                let _ = tx.send(BatchEvent::FileProcessed {
                    index,
                    total,
                    path,
                    result,
                });
            }

            let summary = BatchSummary { succeeded, total };
            info!(gallery_id = %gallery_id, succeeded, total, "batch finished");
            let _ = tx.send(BatchEvent::Finished(summary));
            summary
        });

        (rx, handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::tests::{host, orchestrator, session, write_png};
    use gallery_client::scripted::ScriptedResponse;
    use gallery_core::{GalleryError, HttpMethod};

    #[tokio::test]
    async fn test_failure_in_the_middle_does_not_stop_the_batch() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_png(dir.path(), "one.png");
        let broken = dir.path().join("two.png");
        std::fs::write(&broken, b"garbage").unwrap();
        let third = write_png(dir.path(), "three.png");

        let transport = host(|_| ScriptedResponse::redirect(302, "/galleries/9"));
        let runner = BatchRunner::new(
            Arc::new(orchestrator(transport.clone())),
            Arc::new(Mutex::new(session())),
        );

        let (mut events, handle) = runner.run(
            "9",
            vec![first.clone(), broken.clone(), third.clone()],
            UploadDefaults::default(),
        );

        let mut processed = Vec::new();
        let mut finished = None;
        while let Some(event) = events.recv().await {
            match event {
                BatchEvent::FileProcessed { index, total, path, result } => {
                    assert_eq!(total, 3);
                    processed.push((index, path, result));
                }
                BatchEvent::Finished(summary) => finished = Some(summary),
            }
        }

        assert_eq!(processed.len(), 3);
        assert_eq!(processed[0].1, first);
        assert_eq!(processed[2].1, third);
        assert!(processed[0].2.is_ok());
        assert!(processed[2].2.is_ok());
        match &processed[1].2 {
            Err(e) => assert!(matches!(e.source, GalleryError::Transcode(_))),
            Ok(_) => panic!("broken file should fail"),
        }
        assert_eq!(processed[2].2.as_ref().unwrap().keyword, "three");

        let summary = finished.unwrap();
        assert_eq!(summary, BatchSummary { succeeded: 2, total: 3 });
        assert!(!summary.all_succeeded());
        assert_eq!(handle.await.unwrap(), summary);
        assert_eq!(transport.requests_to("/galleries/9/icon").len(), 2);
    }

    #[tokio::test]
    async fn test_each_confirmation_uses_the_token_from_its_own_form() {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<PathBuf> = ["a.png", "b.png", "c.png"]
            .iter()
            .map(|name| write_png(dir.path(), name))
            .collect();

        let transport = host(|_| ScriptedResponse::redirect(302, "/galleries/9"));
        let runner = BatchRunner::new(
            Arc::new(orchestrator(transport.clone())),
            Arc::new(Mutex::new(session())),
        );
        let (_events, handle) = runner.run("9", files, UploadDefaults::default());
        assert!(handle.await.unwrap().all_succeeded());

        // Walk the request log: every confirmation must be preceded by exactly
        // one form fetch since the previous confirmation, and carry its token.
        let mut forms_fetched = 0;
        let mut since_last_confirm = 0;
        let mut tokens = Vec::new();
        for req in transport.requests() {
            match (req.method, req.url.path()) {
                (HttpMethod::Get, "/galleries/9/add") => {
                    forms_fetched += 1;
                    since_last_confirm += 1;
                }
                (HttpMethod::Post, "/galleries/9/icon") => {
                    assert_eq!(since_last_confirm, 1);
                    since_last_confirm = 0;
                    let expected = format!("form-token-{}", forms_fetched);
                    assert_eq!(req.field("authenticity_token"), Some(expected.as_str()));
                    tokens.push(expected);
                }
                _ => {}
            }
        }

        assert_eq!(tokens, ["form-token-1", "form-token-2", "form-token-3"]);
    }

    #[tokio::test]
    async fn test_empty_batch_finishes() {
        let runner = BatchRunner::new(
            Arc::new(orchestrator(host(|_| ScriptedResponse::html(200, "")))),
            Arc::new(Mutex::new(session())),
        );
        let (mut events, _) = runner.run("9", Vec::new(), UploadDefaults::default());
        match events.recv().await {
            Some(BatchEvent::Finished(summary)) => {
                assert_eq!(summary, BatchSummary { succeeded: 0, total: 0 });
                assert!(summary.all_succeeded());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(events.recv().await.is_none());
    }
}
