//! The seam between resources and the HTTP client that performs I/O.
//!
//! # Design
//! A `Transport` takes one `HttpRequest` and reports what the client saw as a
//! `RawOutcome`: an optional transport error, optional response metadata and
//! an optional body. It never interprets status codes or bodies; that is the
//! job of `load::classify`. Connection pooling, TLS, redirects and DNS all
//! stay inside the client.

use async_trait::async_trait;

use crate::error::BoxError;
use crate::http::{HttpMethod, HttpRequest, ResponseMetadata};

/// What an HTTP client reports after executing a request.
#[derive(Debug, Default)]
pub struct RawOutcome {
    pub error: Option<BoxError>,
    pub response: Option<ResponseMetadata>,
    pub body: Option<Vec<u8>>,
}

impl RawOutcome {
    /// A request that failed before any response arrived.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// A request that produced a response.
    pub fn completed(response: ResponseMetadata, body: Vec<u8>) -> Self {
        Self {
            error: None,
            response: Some(response),
            body: Some(body),
        }
    }
}

/// Executes requests on behalf of a `Resource`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> RawOutcome;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn send(&self, request: HttpRequest) -> RawOutcome {
        match send_reqwest(self, request).await {
            Ok((response, body)) => RawOutcome::completed(response, body),
            Err(error) => RawOutcome::failed(error),
        }
    }
}

async fn send_reqwest(
    client: &reqwest::Client,
    request: HttpRequest,
) -> Result<(ResponseMetadata, Vec<u8>), BoxError> {
    let url = request.url.ok_or("request has no URL")?;
    let method = request.method.unwrap_or(HttpMethod::Get);

    let mut builder = client
        .request(method.into(), url)
        .timeout(request.timeout);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(body) = request.body {
        builder = builder.body(body);
    }

    let response = builder.send().await?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    // A failure while reading the body is still a transport failure.
    let body = response.bytes().await?;

    Ok((ResponseMetadata { status, headers }, body.to_vec()))
}
