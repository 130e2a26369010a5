use std::future::Future;
use std::pin::Pin;

use beacon_core::error::{BeaconError, Result};
use beacon_core::transport::{HttpRequest, HttpResponse, HttpTransport, Method};
use reqwest::header::{ACCEPT, CONTENT_TYPE};

/// HTTP transport backed by reqwest.
///
/// No request timeout is configured; calls run until the connection's own
/// limits end them.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("beacon/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BeaconError::Transport(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing reqwest client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .header(ACCEPT, request.accept);
        if let Some(auth) = &request.auth {
            builder = builder.basic_auth(&auth.username, auth.password.as_deref());
        }
        if let Some(body) = &request.body {
            builder = builder.header(CONTENT_TYPE, "application/json").json(body);
        }

        let response = builder.send().await.map_err(|e| {
            BeaconError::Transport(format!("{} {}: {}", request.method, request.url, e))
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            BeaconError::Transport(format!(
                "reading {} {} response: {}",
                request.method, request.url, e
            ))
        })?;

        tracing::trace!(method = %request.method, url = %request.url, status, "http call");
        Ok(HttpResponse { status, body })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse>> + Send + '_>> {
        Box::pin(self.send(request))
    }
}
