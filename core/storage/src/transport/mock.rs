//! In-memory transport for exercising provider wire protocols.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;

use cloudface_common::{Error, Result};

use super::{HttpRequest, HttpResponse, Transport};

type Responder = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;

/// Internal state for MockTransport.
#[derive(Default)]
struct MockState {
    /// Every request sent, in order.
    requests: Vec<HttpRequest>,
    /// Canned responses, answered first-in first-out.
    responses: VecDeque<HttpResponse>,
    /// Used once the queue is drained.
    responder: Option<Responder>,
}

/// Mock implementation of [`Transport`] for testing.
///
/// Clones share state, so a test can hand one clone to a provider and
/// inspect the recorded requests through another.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a response with the canonical reason phrase for `status`.
    pub fn response(status: u16) -> HttpResponse {
        let reason = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or_default()
            .to_string();

        HttpResponse {
            status,
            reason,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Queue a response.
    pub fn enqueue(&self, response: HttpResponse) -> &Self {
        self.lock().responses.push_back(response);
        self
    }

    /// Answer requests with `responder` once the queue is empty.
    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    {
        self.lock().responder = Some(Box::new(responder));
    }

    /// All requests sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut state = self.lock();
        state.requests.push(request.clone());

        if let Some(response) = state.responses.pop_front() {
            return Ok(response);
        }

        match &state.responder {
            Some(responder) => Ok(responder(&request)),
            None => Err(Error::Network(format!(
                "No mock response for {} {}",
                request.method, request.url
            ))),
        }
    }
}

impl HttpResponse {
    /// Add a header (builder style).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body (builder style).
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Set a JSON body (builder style).
    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.with_body(value.to_string())
    }
}
