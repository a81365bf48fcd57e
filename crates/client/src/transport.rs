use std::collections::HashMap;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::multipart;
use reqwest::redirect::Policy;
use tracing::{debug, warn};
use url::Url;

use gallery_core::config::SiteConfig;
use gallery_core::{FetchResponse, GalleryError, HttpMethod, PageRequest, RequestBody};

/// A single HTTP exchange. Implementations must not follow redirects or keep
/// cookies of their own; [`crate::HttpPageFetcher`] does both against the
/// explicit [`gallery_core::Session`].
#[async_trait]
pub trait HttpTransport: Send + Sync + 'static {
    async fn send(&self, request: PageRequest) -> Result<FetchResponse, GalleryError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &SiteConfig) -> Result<Self, GalleryError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(Policy::none())
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GalleryError::Network(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: PageRequest) -> Result<FetchResponse, GalleryError> {
        let start = Instant::now();
        let url = request.url.clone();

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url.as_str()),
            HttpMethod::Post => self.client.post(url.as_str()),
        };
        if let Some(cookie) = &request.cookie_header {
            builder = builder.header(COOKIE, cookie);
        }
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(fields) => builder.form(&fields),
            RequestBody::Multipart { fields, file } => {
                let mut form = multipart::Form::new();
                for (name, value) in fields {
                    form = form.text(name, value);
                }
                let part = multipart::Part::bytes(file.bytes)
                    .file_name(file.filename)
                    .mime_str(&file.mime)
                    .map_err(|e| GalleryError::Network(format!("invalid mime {}: {}", file.mime, e)))?;
                builder.multipart(form.part(file.field, part))
            }
        };

        debug!(method = ?request.method, url = %url, "sending request");
        let resp = builder.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "request failed");
            GalleryError::Network(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let final_url = Url::parse(resp.url().as_str()).unwrap_or_else(|_| url.clone());

        let set_cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect();

        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GalleryError::Network(e.to_string()))?;

        Ok(FetchResponse {
            url,
            final_url,
            status,
            initial_status: status,
            headers,
            set_cookies,
            body: body.to_vec(),
            fetched_at: chrono::Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
