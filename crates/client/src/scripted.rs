//! In-memory [`HttpTransport`] that answers from a closure and records every
//! request it sees.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use gallery_core::{FetchResponse, GalleryError, PageRequest};

use crate::transport::HttpTransport;

type Handler = dyn Fn(&PageRequest) -> Result<ScriptedResponse, GalleryError> + Send + Sync;

#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub set_cookies: Vec<String>,
    pub body: Vec<u8>,
}

impl ScriptedResponse {
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/html; charset=utf-8".to_string());
        Self {
            status,
            headers,
            set_cookies: Vec::new(),
            body: body.into().into_bytes(),
        }
    }

    pub fn xml(status: u16, body: impl Into<String>) -> Self {
        let mut resp = Self::html(status, body);
        resp.headers
            .insert("content-type".to_string(), "application/xml".to_string());
        resp
    }

    pub fn redirect(status: u16, location: &str) -> Self {
        let mut resp = Self::html(status, "");
        resp.headers.insert("location".to_string(), location.to_string());
        resp
    }

    pub fn with_cookie(mut self, set_cookie: &str) -> Self {
        self.set_cookies.push(set_cookie.to_string());
        self
    }
}

pub struct ScriptedTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&PageRequest) -> Result<ScriptedResponse, GalleryError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Every request sent so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn requests_to(&self, path: &str) -> Vec<PageRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.path() == path)
            .collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: PageRequest) -> Result<FetchResponse, GalleryError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(request.clone());
        }

        let scripted = (self.handler)(&request)?;
        Ok(FetchResponse {
            url: request.url.clone(),
            final_url: request.url,
            status: scripted.status,
            initial_status: scripted.status,
            headers: scripted.headers,
            set_cookies: scripted.set_cookies,
            body: scripted.body,
            fetched_at: chrono::Utc::now(),
            response_time_ms: 0,
        })
    }
}
