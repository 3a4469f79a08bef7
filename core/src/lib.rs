//! Declarative HTTP resources: describe a call once, load it through any client.
//!
//! # Overview
//! A `Resource<T>` pairs a fully-formed `HttpRequest` with a status predicate
//! and a parser producing `T`. Resources are plain immutable values; loading
//! one hands its request to a `Transport` (a `reqwest::Client` out of the box)
//! and classifies the outcome into `Result<T, NetworkingError>`.
//!
//! # Design
//! - Construction is fallible: a base URL that does not parse or a body that
//!   does not serialize is a `BuildError`, reported before any I/O.
//! - `load::classify` is pure; transports only report what happened.
//! - No retries, caching or connection management live here. The client
//!   owns all of that.

pub mod config;
pub mod error;
pub mod http;
pub mod load;
pub mod resource;
pub mod transport;

pub use config::TransportConfig;
pub use error::{BoxError, BuildError, Interrupted, NetworkingError};
pub use http::{ContentType, HttpMethod, HttpRequest, ResponseMetadata, DEFAULT_TIMEOUT};
pub use load::{classify, Load, LoadTask};
pub use resource::{accept_2xx, accept_only, parse_json, parse_json_with, Resource, ResourceBuilder};
pub use transport::{RawOutcome, Transport};
