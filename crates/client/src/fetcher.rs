use std::sync::Arc;

use tracing::{debug, warn};
use url::Url;

use gallery_core::{FetchResponse, GalleryError, PageRequest, RequestBody, Session};

use crate::transport::HttpTransport;

/// Authenticated requests against the host application. Cookies come from and
/// go back into the caller's [`Session`]; redirects are followed here so that
/// cookies set on intermediate responses are not lost.
#[derive(Clone)]
pub struct HttpPageFetcher {
    transport: Arc<dyn HttpTransport>,
    max_redirects: usize,
}

impl HttpPageFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, max_redirects: usize) -> Self {
        Self {
            transport,
            max_redirects,
        }
    }

    pub fn transport(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.transport)
    }

    pub async fn get(&self, session: &mut Session, path: &str) -> Result<FetchResponse, GalleryError> {
        let url = session.url(path)?;
        self.execute(session, PageRequest::get(url)).await
    }

    pub async fn post_form(
        &self,
        session: &mut Session,
        url: Url,
        fields: Vec<(String, String)>,
    ) -> Result<FetchResponse, GalleryError> {
        self.execute(session, PageRequest::post(url, RequestBody::Form(fields)))
            .await
    }

    async fn execute(
        &self,
        session: &mut Session,
        mut request: PageRequest,
    ) -> Result<FetchResponse, GalleryError> {
        let original_url = request.url.clone();
        let mut initial_status = None;
        let mut hops = 0;

        loop {
            request.cookie_header = session.cookie_header(&request.url);
            let response = self.transport.send(request.clone()).await?;
            session.store_set_cookies(&response.set_cookies, &response.final_url);

            let first_status = *initial_status.get_or_insert(response.status);
            debug!(url = %response.url, status = response.status, "page fetched");

            let next = if response.is_redirect() {
                response.location().map(str::to_string)
            } else {
                None
            };

            let Some(location) = next else {
                return Ok(FetchResponse {
                    url: original_url,
                    initial_status: first_status,
                    ..response
                });
            };

            if hops >= self.max_redirects {
                warn!(url = %original_url, hops, "redirect limit reached");
                return Err(GalleryError::Network(format!(
                    "too many redirects from {}",
                    original_url
                )));
            }
            hops += 1;

            let target = response
                .final_url
                .join(&location)
                .map_err(|e| GalleryError::Network(format!("bad redirect {}: {}", location, e)))?;

            // 307/308 repeat the request as-is; everything else becomes a GET.
            request = if matches!(response.status, 307 | 308) {
                PageRequest { url: target, ..request }
            } else {
                PageRequest::get(target)
            };
            debug!(to = %request.url, method = ?request.method, "following redirect");
        }
    }
}
