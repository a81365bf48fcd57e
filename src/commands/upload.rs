use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use tokio::sync::Mutex;

use gallery_core::{file_name, AppConfig};
use gallery_imaging::{collect_image_files, ImageTranscoder};
use gallery_upload::{BatchEvent, BatchRunner, IconUploadOrchestrator, MarkerClassifier, UploadDefaults};

use super::login;

pub async fn run(
    config: AppConfig,
    gallery_id: String,
    paths: Vec<PathBuf>,
    keyword: Option<String>,
    credit: Option<String>,
    icon_url: Option<String>,
) -> Result<()> {
    // Extracted archive entries are deleted when `inputs` drops, after the batch.
    let inputs = collect_image_files(&paths);
    if inputs.is_empty() {
        bail!("no image files to upload");
    }

    let logged_in = login(&config).await?;

    let mut orchestrator = IconUploadOrchestrator::new(
        logged_in.manager,
        ImageTranscoder::from_config(&config.upload),
        Arc::new(MarkerClassifier::from_config(&config.classifier)),
    );
    if let Some(dir) = &config.upload.response_dump_dir {
        std::fs::create_dir_all(dir)?;
        orchestrator = orchestrator.with_response_dump_dir(dir);
    }

    let runner = BatchRunner::new(Arc::new(orchestrator), Arc::new(Mutex::new(logged_in.session)));
    let defaults = UploadDefaults {
        keyword,
        credit,
        source_url: icon_url,
    };
    let (mut events, handle) = runner.run(gallery_id, inputs.files().to_vec(), defaults);

    while let Some(event) = events.recv().await {
        match event {
            BatchEvent::FileProcessed {
                index,
                total,
                path,
                result,
            } => match result {
                Ok(icon) => println!("[{}/{}] ✓ {} ({})", index, total, icon.filename, icon.keyword),
                Err(e) => println!("[{}/{}] ✗ {}: {}", index, total, file_name(&path), e),
            },
            BatchEvent::Finished(summary) => {
                println!("\nCompleted: {}/{} successful", summary.succeeded, summary.total);
            }
        }
    }

    let summary = handle.await?;
    if !summary.all_succeeded() {
        bail!("{} of {} uploads failed", summary.total - summary.succeeded, summary.total);
    }
    Ok(())
}
