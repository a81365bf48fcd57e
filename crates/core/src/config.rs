use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::GalleryError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, GalleryError> {
        toml::from_str(raw).map_err(|e| GalleryError::Config(e.to_string()))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            connect_timeout_seconds: default_connect_timeout(),
            request_timeout_seconds: default_request_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl SiteConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_cookie_file")]
    pub cookie_file: PathBuf,
    /// Discovered from the homepage profile links when unset.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_file: default_cookie_file(),
            user_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct UploadConfig {
    #[serde(default = "default_icon_size")]
    pub icon_width: u32,
    #[serde(default = "default_icon_size")]
    pub icon_height: u32,
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// Confirmation responses are written here for diagnosis when set.
    #[serde(default)]
    pub response_dump_dir: Option<PathBuf>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            icon_width: default_icon_size(),
            icon_height: default_icon_size(),
            jpeg_quality: default_jpeg_quality(),
            response_dump_dir: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassifierConfig {
    #[serde(default = "default_error_marker")]
    pub error_marker: String,
    #[serde(default = "default_success_marker")]
    pub success_marker: String,
    #[serde(default)]
    pub gallery_view_markers: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            error_marker: default_error_marker(),
            success_marker: default_success_marker(),
            gallery_view_markers: Vec::new(),
        }
    }
}

fn default_base_url() -> String { "https://glowfic.com".into() }
fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into()
}
fn default_connect_timeout() -> u64 { 15 }
fn default_request_timeout() -> u64 { 60 }
fn default_max_redirects() -> usize { 10 }
fn default_cookie_file() -> PathBuf { PathBuf::from("glowfic_cookies.json") }
fn default_icon_size() -> u32 { 150 }
fn default_jpeg_quality() -> u8 { 95 }
fn default_error_marker() -> String { "flash error".into() }
fn default_success_marker() -> String { "flash success".into() }
