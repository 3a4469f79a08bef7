//! Canned HTTP responses for exercising resource loading end to end.
//!
//! Every route returns a fixed shape of response: a JSON list, a malformed
//! JSON body, an empty 200, a 204, an arbitrary status, or an echo of the
//! incoming request. Unknown paths fall through to axum's empty 404.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
}

/// Body returned by `POST /results`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResult {
    pub status_code: String,
    pub status_message: String,
}

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

pub const MALFORMED_PEOPLE: &str = r#"[{"name":"Alice"},{ adasd~``]"#;

pub fn app() -> Router {
    Router::new()
        .route("/people", get(people))
        .route("/people/malformed", get(malformed_people))
        .route("/empty", get(empty))
        .route("/no-content", get(no_content))
        .route("/status/{code}", get(status).post(status))
        .route("/results", post(create_result))
        .route(
            "/echo",
            get(echo).post(echo).put(echo).patch(echo).delete(echo),
        )
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn people() -> Json<Vec<Person>> {
    Json(vec![
        Person {
            name: "Alice".to_string(),
        },
        Person {
            name: "Bob".to_string(),
        },
    ])
}

async fn malformed_people() -> ([(header::HeaderName, &'static str); 1], &'static str) {
    ([(header::CONTENT_TYPE, "application/json")], MALFORMED_PEOPLE)
}

async fn empty() -> StatusCode {
    StatusCode::OK
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn create_result() -> (StatusCode, Json<PostResult>) {
    (
        StatusCode::CREATED,
        Json(PostResult {
            status_code: "000".to_string(),
            status_message: "success".to_string(),
        }),
    )
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        // Non-JSON bodies are reported as a string.
        Some(serde_json::from_slice(&body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&body).into_owned())
        }))
    };
    Json(Echo {
        method: method.to_string(),
        query,
        headers,
        body,
    })
}
