//! Resource descriptors: a request paired with a status predicate and a parser.
//!
//! # Design
//! A `Resource<T>` is immutable once built. The request is fully assembled at
//! construction time and the predicate and parser sit behind `Arc`, so cloning
//! is cheap and a single resource can be loaded any number of times, from any
//! thread. All I/O happens elsewhere; nothing here touches the network.
//!
//! `ResourceBuilder` is the base constructor. Its terminal methods cover the
//! common shapes: a custom parser, no parsing at all, a JSON body with no
//! response parsing, a JSON response, or both. The JSON response shapes have
//! `_with` forms that take the caller's decoder.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{BoxError, BuildError, NetworkingError};
use crate::http::{
    append_query, ContentType, HttpMethod, HttpRequest, ResponseMetadata, DEFAULT_TIMEOUT,
};

/// Decides whether a status code counts as success for a resource.
pub type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;

/// Turns a response body and metadata into a typed value.
pub type Parser<T> = Arc<
    dyn Fn(Option<&[u8]>, Option<&ResponseMetadata>) -> Result<T, NetworkingError> + Send + Sync,
>;

/// The default status predicate: any code in `200..300`.
pub fn accept_2xx(status: u16) -> bool {
    (200..300).contains(&status)
}

/// A predicate accepting exactly one status code.
pub fn accept_only(expected: u16) -> impl Fn(u16) -> bool + Clone + Send + Sync + 'static {
    move |status| status == expected
}

/// Decode a JSON body, treating an absent or empty body as `NoData`.
pub fn parse_json<T: DeserializeOwned>(body: Option<&[u8]>) -> Result<T, NetworkingError> {
    parse_json_with(body, |bytes| serde_json::from_slice(bytes))
}

/// Like `parse_json`, but decodes with `decode`. Its errors become `Parse`.
pub fn parse_json_with<T, E>(
    body: Option<&[u8]>,
    decode: impl FnOnce(&[u8]) -> Result<T, E>,
) -> Result<T, NetworkingError>
where
    E: Into<BoxError>,
{
    match body {
        Some(bytes) if !bytes.is_empty() => {
            decode(bytes).map_err(|e| NetworkingError::Parse(e.into()))
        }
        _ => Err(NetworkingError::NoData),
    }
}

fn parser<T, F>(parse: F) -> Parser<T>
where
    F: Fn(Option<&[u8]>, Option<&ResponseMetadata>) -> Result<T, NetworkingError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(parse)
}

/// An API call returning `T` values.
pub struct Resource<T> {
    request: HttpRequest,
    accept_status: StatusPredicate,
    parse: Parser<T>,
}

impl<T> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            request: self.request.clone(),
            accept_status: Arc::clone(&self.accept_status),
            parse: Arc::clone(&self.parse),
        }
    }
}

impl<T> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

impl<T> Resource<T> {
    /// Wrap a hand-built request, bypassing URL and header assembly.
    pub fn from_request<P, F>(request: HttpRequest, accept_status: P, parse: F) -> Self
    where
        P: Fn(u16) -> bool + Send + Sync + 'static,
        F: Fn(Option<&[u8]>, Option<&ResponseMetadata>) -> Result<T, NetworkingError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            request,
            accept_status: Arc::new(accept_status),
            parse: parser(parse),
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn accepts_status(&self, status: u16) -> bool {
        (self.accept_status)(status)
    }

    pub fn parse(
        &self,
        body: Option<&[u8]>,
        response: Option<&ResponseMetadata>,
    ) -> Result<T, NetworkingError> {
        (self.parse)(body, response)
    }

    /// Derive a resource whose successful results are passed through `f`.
    pub fn map<U, F>(self, f: F) -> Resource<U>
    where
        T: 'static,
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        let parse = self.parse;
        Resource {
            request: self.request,
            accept_status: self.accept_status,
            parse: parser(move |body, response| parse(body, response).map(&f)),
        }
    }
}

/// Renders `<METHOD> <URL> <BODY>` for logs.
impl<T> fmt::Display for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let method = self.request.method.map_or("GET", |m| m.as_str());
        let url = self.request.url.as_deref().unwrap_or("<no url>");
        let body = self
            .request
            .body
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
            .unwrap_or("");
        write!(f, "{method} {url} {body}")
    }
}

/// Assembles the request for a `Resource`.
///
/// Headers are applied as `Accept`, then `Content-Type`, then caller headers
/// in insertion order, so a caller header can override either content type.
#[derive(Clone)]
#[must_use]
pub struct ResourceBuilder {
    method: HttpMethod,
    url: String,
    accept: Option<ContentType>,
    content_type: Option<ContentType>,
    body: Option<Vec<u8>>,
    headers: Vec<(String, String)>,
    accept_status: StatusPredicate,
    timeout: Duration,
    query: Vec<(String, String)>,
}

impl fmt::Debug for ResourceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceBuilder")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("accept", &self.accept)
            .field("content_type", &self.content_type)
            .field("headers", &self.headers)
            .field("timeout", &self.timeout)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

impl ResourceBuilder {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            accept: None,
            content_type: None,
            body: None,
            headers: Vec::new(),
            accept_status: Arc::new(accept_2xx),
            timeout: DEFAULT_TIMEOUT,
            query: Vec::new(),
        }
    }

    pub fn accept(mut self, accept: ContentType) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn content_type(mut self, content_type: ContentType) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Attach a precomputed bearer token as the `Authorization` header.
    pub fn bearer_auth(self, token: impl fmt::Display) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn expect_status<P>(mut self, accept_status: P) -> Self
    where
        P: Fn(u16) -> bool + Send + Sync + 'static,
    {
        self.accept_status = Arc::new(accept_status);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Build a resource with a custom parser.
    pub fn build<T, F>(self, parse: F) -> Result<Resource<T>, BuildError>
    where
        F: Fn(Option<&[u8]>, Option<&ResponseMetadata>) -> Result<T, NetworkingError>
            + Send
            + Sync
            + 'static,
    {
        let url = append_query(&self.url, &self.query)?;
        let mut request = HttpRequest {
            method: Some(self.method),
            url: Some(url),
            headers: Vec::new(),
            body: None,
            timeout: self.timeout,
        };
        if let Some(accept) = self.accept {
            request.set_header("Accept", accept.as_str());
        }
        if let Some(content_type) = self.content_type {
            request.set_header("Content-Type", content_type.as_str());
        }
        for (name, value) in self.headers {
            request.set_header(name, value);
        }
        request.body = self.body;

        Ok(Resource {
            request,
            accept_status: self.accept_status,
            parse: parser(parse),
        })
    }

    /// Build a resource that ignores the response body.
    pub fn build_unit(self) -> Result<Resource<()>, BuildError> {
        self.build(|_, _| Ok(()))
    }

    /// Encode `body` as JSON and build a resource that ignores the response body.
    pub fn build_json_send<B>(mut self, body: &B) -> Result<Resource<()>, BuildError>
    where
        B: Serialize + ?Sized,
    {
        self.body = Some(serde_json::to_vec(body)?);
        self.content_type = Some(ContentType::Json);
        self.accept = self.accept.or(Some(ContentType::Json));
        self.build_unit()
    }

    /// Build a resource that decodes a JSON response into `T`.
    pub fn build_json<T>(self) -> Result<Resource<T>, BuildError>
    where
        T: DeserializeOwned + 'static,
    {
        self.build_json_with(|bytes| serde_json::from_slice(bytes))
    }

    /// Build a JSON resource whose body is decoded by `decode` instead of
    /// plain `serde_json::from_slice`, e.g. a configured `Deserializer` or a
    /// decoder that unwraps an envelope. Absent or empty bodies are still
    /// `NoData`.
    pub fn build_json_with<T, D, E>(mut self, decode: D) -> Result<Resource<T>, BuildError>
    where
        T: 'static,
        D: Fn(&[u8]) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.accept = self.accept.or(Some(ContentType::Json));
        self.build(move |body, _| parse_json_with(body, &decode))
    }

    /// Encode an optional JSON body and decode a JSON response into `T`.
    pub fn build_json_exchange<B, T>(self, body: Option<&B>) -> Result<Resource<T>, BuildError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + 'static,
    {
        self.build_json_exchange_with(body, |bytes| serde_json::from_slice(bytes))
    }

    /// `build_json_exchange` with a custom response decoder.
    pub fn build_json_exchange_with<B, T, D, E>(
        mut self,
        body: Option<&B>,
        decode: D,
    ) -> Result<Resource<T>, BuildError>
    where
        B: Serialize + ?Sized,
        T: 'static,
        D: Fn(&[u8]) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        self.body = body.map(serde_json::to_vec).transpose()?;
        self.content_type = Some(ContentType::Json);
        self.build_json_with(decode)
    }
}
