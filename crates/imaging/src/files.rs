use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Zip archives, including the `.glowficgirllichgallery` export which is a zip
/// under another name.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "glowficgirllichgallery"];

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|s| e.eq_ignore_ascii_case(s)))
        .unwrap_or(false)
}

pub fn is_supported_image(path: &Path) -> bool {
    has_extension(path, SUPPORTED_EXTENSIONS)
}

pub fn is_archive(path: &Path) -> bool {
    has_extension(path, ARCHIVE_EXTENSIONS)
}

/// Image files ready for upload. Files pulled out of archives live in
/// temporary directories that are removed when this value is dropped.
#[derive(Debug, Default)]
pub struct ImageInputs {
    files: Vec<PathBuf>,
    scratch: Vec<TempDir>,
}

impl ImageInputs {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Expand the given paths into the image files to upload, keeping input
/// order. Directories contribute their direct image children sorted by name;
/// archives contribute their image entries in archive order.
pub fn collect_image_files(paths: &[PathBuf]) -> ImageInputs {
    let mut inputs = ImageInputs::default();
    for path in paths {
        if path.is_dir() {
            match fs::read_dir(path) {
                Ok(entries) => {
                    let mut children: Vec<PathBuf> = entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.is_file() && is_supported_image(p))
                        .collect();
                    children.sort();
                    inputs.files.extend(children);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "cannot read directory"),
            }
        } else if is_archive(path) {
            match extract_archive_images(path) {
                Ok((dir, files)) => {
                    debug!(path = %path.display(), count = files.len(), "archive expanded");
                    if files.is_empty() {
                        warn!(path = %path.display(), "archive holds no images");
                    }
                    inputs.files.extend(files);
                    inputs.scratch.push(dir);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable archive"),
            }
        } else if is_supported_image(path) {
            inputs.files.push(path.clone());
        } else {
            warn!(path = %path.display(), "skipping non-image file");
        }
    }
    inputs
}

/// Extract every image entry of a zip archive into a fresh temporary
/// directory. Entries whose names would escape that directory are skipped.
fn extract_archive_images(archive_path: &Path) -> io::Result<(TempDir, Vec<PathBuf>)> {
    let mut archive = ZipArchive::new(File::open(archive_path)?).map_err(io::Error::other)?;
    let dir = tempfile::Builder::new().prefix("glowfic-icons-").tempdir()?;
    let mut files = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(io::Error::other)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping archive entry with unsafe name");
            continue;
        };
        if !is_supported_image(&relative) {
            continue;
        }

        let target = dir.path().join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        files.push(target);
    }

    Ok((dir, files))
}
