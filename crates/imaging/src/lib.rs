pub mod files;
pub mod transcoder;

pub use files::{
    collect_image_files, is_archive, is_supported_image, ImageInputs, ARCHIVE_EXTENSIONS,
    SUPPORTED_EXTENSIONS,
};
pub use transcoder::ImageTranscoder;
