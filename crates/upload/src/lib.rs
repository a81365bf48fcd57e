//! The two-phase icon upload: storage first, then confirmation with the
//! host application, plus sequential batches of it.

pub mod batch;
pub mod classifier;
pub mod orchestrator;

pub use batch::{BatchEvent, BatchRunner, BatchSummary, UploadDefaults};
pub use classifier::{Classification, ConfirmedBy, MarkerClassifier, ResponseClassifier};
pub use orchestrator::{IconUploadOrchestrator, UploadError, UploadStage};
