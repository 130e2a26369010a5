//! HTTP mocking utilities for testing.
//!
//! Provides a mock transport that intercepts registry requests and returns
//! predefined responses. Supports pattern matching, scripted response
//! sequences and request recording for verification.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::time::Instant;

use crate::error::{BeaconError, Result};
use crate::transport::{BasicAuth, HttpRequest, HttpResponse, HttpTransport, Method};

/// Mock HTTP transport for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockHttp::new();
/// mock.mock_sequence(Method::Post, "*/apps/svc", vec![
///     MockResponse::status(500),
///     MockResponse::no_content(),
/// ]);
///
/// let client = DiscoveryClient::new(config, Arc::new(mock.clone()))?;
/// client.register(true).await?;
/// mock.assert_method_called_times(Method::Post, "*/apps/svc", 2);
/// ```
#[derive(Clone)]
pub struct MockHttp {
    mocks: Arc<RwLock<Vec<MockHandler>>>,
    requests: Arc<RwLock<Vec<RecordedRequest>>>,
}

/// A mock handler.
struct MockHandler {
    method: Option<Method>,
    pattern: String,
    handler: Arc<dyn Fn(&HttpRequest) -> MockResponse + Send + Sync>,
}

/// A recorded request for verification.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// Request method.
    pub method: Method,
    /// Request URL.
    pub url: String,
    /// Request body.
    pub body: Option<serde_json::Value>,
    /// Basic auth credentials, if any.
    pub auth: Option<BasicAuth>,
    /// When the request was issued, on the tokio clock.
    pub at: Instant,
}

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Simulated transport failure instead of a response.
    pub failure: Option<String>,
}

impl MockResponse {
    /// Create a response with the given status and an empty body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            failure: None,
        }
    }

    /// Create a successful JSON response.
    pub fn json<T: Serialize>(body: T) -> Self {
        Self {
            status: 200,
            body: serde_json::to_string(&body).unwrap_or_default(),
            failure: None,
        }
    }

    /// Create a 200 response with a plain-text body.
    pub fn text(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            failure: None,
        }
    }

    /// Create an error response with a text body.
    pub fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: message.to_string(),
            failure: None,
        }
    }

    /// Create an empty 200 OK response.
    pub fn ok() -> Self {
        Self::status(200)
    }

    /// Create an empty 204 No Content response.
    pub fn no_content() -> Self {
        Self::status(204)
    }

    /// Create a 404 not found.
    pub fn not_found() -> Self {
        Self::status(404)
    }

    /// Simulate a connection failure.
    pub fn unreachable(message: &str) -> Self {
        Self {
            status: 0,
            body: String::new(),
            failure: Some(message.to_string()),
        }
    }
}

impl MockHttp {
    /// Create a new mock HTTP transport.
    pub fn new() -> Self {
        Self {
            mocks: Arc::new(RwLock::new(Vec::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Add a handler for one method.
    pub fn mock<F>(&self, method: Method, pattern: &str, handler: F)
    where
        F: Fn(&HttpRequest) -> MockResponse + Send + Sync + 'static,
    {
        self.push(Some(method), pattern, Arc::new(handler));
    }

    /// Answer every matching request with a fixed response.
    pub fn mock_response(&self, method: Method, pattern: &str, response: MockResponse) {
        self.mock(method, pattern, move |_| response.clone());
    }

    /// Answer matching requests with the given responses in order.
    ///
    /// The last response repeats once the sequence is exhausted.
    pub fn mock_sequence(&self, method: Method, pattern: &str, responses: Vec<MockResponse>) {
        assert!(!responses.is_empty(), "mock_sequence needs at least one response");
        let next = AtomicUsize::new(0);
        self.mock(method, pattern, move |_| {
            let index = next.fetch_add(1, Ordering::SeqCst).min(responses.len() - 1);
            responses[index].clone()
        });
    }

    fn push(
        &self,
        method: Option<Method>,
        pattern: &str,
        handler: Arc<dyn Fn(&HttpRequest) -> MockResponse + Send + Sync>,
    ) {
        let mut mocks = self.mocks.write().unwrap();
        mocks.push(MockHandler {
            method,
            pattern: pattern.to_string(),
            handler,
        });
    }

    /// Resolve a request against the registered mocks.
    pub fn respond(&self, request: &HttpRequest) -> Result<HttpResponse> {
        {
            let mut requests = self.requests.write().unwrap();
            requests.push(RecordedRequest {
                method: request.method,
                url: request.url.clone(),
                body: request.body.clone(),
                auth: request.auth.clone(),
                at: Instant::now(),
            });
        }

        let response = {
            let mocks = self.mocks.read().unwrap();
            mocks
                .iter()
                .find(|m| {
                    m.method.map_or(true, |method| method == request.method)
                        && matches_pattern(&request.url, &m.pattern)
                })
                .map(|m| (m.handler)(request))
        };

        match response {
            Some(MockResponse {
                failure: Some(message),
                ..
            }) => Err(BeaconError::Transport(message)),
            Some(response) => Ok(HttpResponse::new(response.status, response.body)),
            None => Ok(HttpResponse::new(
                500,
                format!("No mock found for {} {}", request.method, request.url),
            )),
        }
    }

    /// Get recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().unwrap().clone()
    }

    /// Get requests matching a method and pattern.
    pub fn requests_to(&self, method: Method, pattern: &str) -> Vec<RecordedRequest> {
        self.requests
            .read()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && matches_pattern(&r.url, pattern))
            .cloned()
            .collect()
    }

    /// Count requests matching a method and pattern.
    pub fn calls(&self, method: Method, pattern: &str) -> usize {
        self.requests_to(method, pattern).len()
    }

    // =========================================================================
    // VERIFICATION METHODS
    // =========================================================================

    /// Assert that a URL pattern was called.
    pub fn assert_called(&self, pattern: &str) {
        let requests = self.requests();
        let matching = requests
            .iter()
            .filter(|r| matches_pattern(&r.url, pattern))
            .count();
        assert!(
            matching > 0,
            "Expected HTTP call matching '{}', but none found. Recorded requests: {:?}",
            pattern,
            requests
                .iter()
                .map(|r| format!("{} {}", r.method, r.url))
                .collect::<Vec<_>>()
        );
    }

    /// Assert that a method and URL pattern were called a specific number of times.
    pub fn assert_method_called_times(&self, method: Method, pattern: &str, expected: usize) {
        let matching = self.calls(method, pattern);
        assert_eq!(
            matching, expected,
            "Expected {} {} calls matching '{}', but found {}",
            expected, method, pattern, matching
        );
    }

    /// Assert that a URL pattern was not called.
    pub fn assert_not_called(&self, pattern: &str) {
        let matching = self
            .requests()
            .iter()
            .filter(|r| matches_pattern(&r.url, pattern))
            .count();
        assert_eq!(
            matching, 0,
            "Expected no HTTP calls matching '{}', but found {}",
            pattern, matching
        );
    }

    /// Assert that a request was made with specific body content.
    pub fn assert_called_with_body<F>(&self, method: Method, pattern: &str, predicate: F)
    where
        F: Fn(&serde_json::Value) -> bool,
    {
        let found = self
            .requests_to(method, pattern)
            .iter()
            .any(|r| r.body.as_ref().is_some_and(&predicate));
        assert!(
            found,
            "Expected {} call matching '{}' with matching body, but none found",
            method, pattern
        );
    }
}

impl Default for MockHttp {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for MockHttp {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        let result = self.respond(&request);
        Box::pin(async move { result })
    }
}

/// Check if a URL matches a glob pattern.
fn matches_pattern(url: &str, pattern: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('*').collect();
    if pattern_parts.len() == 1 {
        return url == pattern;
    }

    let mut remaining = url;
    for (i, part) in pattern_parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }

        if i == 0 {
            // First part must match at start
            if !remaining.starts_with(part) {
                return false;
            }
            remaining = &remaining[part.len()..];
        } else if i == pattern_parts.len() - 1 {
            // Last part must match at end
            if !remaining.ends_with(part) {
                return false;
            }
        } else if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }

    true
}
