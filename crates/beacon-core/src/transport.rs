//! HTTP transport seam.
//!
//! The discovery client only needs four verbs with JSON bodies; the remote
//! config client adds plain-text GETs with optional basic auth. Production
//! code uses the reqwest-backed transport in `beacon-runtime`; tests plug in
//! [`MockHttp`](crate::testing::MockHttp).

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BeaconError, Result};

/// HTTP verbs used by the registry protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type the registry protocol speaks.
pub const APPLICATION_JSON: &str = "application/json";

/// Credentials sent as an HTTP basic `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: Option<String>,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
    /// Value of the `Accept` header.
    pub accept: &'static str,
    pub auth: Option<BasicAuth>,
}

impl HttpRequest {
    fn new(method: Method, url: impl Into<String>, body: Option<serde_json::Value>) -> Self {
        Self {
            method,
            url: url.into(),
            body,
            accept: APPLICATION_JSON,
            auth: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url, None)
    }

    pub fn post<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self> {
        Ok(Self::new(Method::Post, url, Some(serde_json::to_value(body)?)))
    }

    pub fn put<T: Serialize>(url: impl Into<String>, body: &T) -> Result<Self> {
        Ok(Self::new(Method::Put, url, Some(serde_json::to_value(body)?)))
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::Delete, url, None)
    }

    /// Override the `Accept` header.
    pub fn with_accept(mut self, accept: &'static str) -> Self {
        self.accept = accept;
        self
    }

    /// Attach basic auth credentials.
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.auth = Some(BasicAuth {
            username: username.into(),
            password,
        });
        self
    }
}

/// Response status and raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| BeaconError::Deserialization(e.to_string()))
    }
}

/// Generic HTTP request/response primitive.
///
/// Implementations return `Err(BeaconError::Transport)` only when no
/// response was received; any status code is a successful exchange.
pub trait HttpTransport: Send + Sync {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>>;
}
