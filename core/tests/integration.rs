//! Resource loading against the live stub server.
//!
//! # Design
//! Starts the stub server on a random port inside the test runtime, then
//! loads resources over real HTTP through a `reqwest::Client`. Covers every
//! classification path: transport failure, rejected status, missing body,
//! malformed body and a decoded success, plus cancelling a load that hangs.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stub_server::{Echo, Person, PostResult};
use tinynet_core::{
    accept_only, ContentType, HttpMethod, Load, NetworkingError, ResourceBuilder, TransportConfig,
};
use tokio::sync::oneshot;

async fn start_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(stub_server::run(listener));
    addr
}

fn client() -> reqwest::Client {
    TransportConfig::default().build_client().unwrap()
}

fn people() -> Vec<Person> {
    vec![
        Person {
            name: "Alice".to_string(),
        },
        Person {
            name: "Bob".to_string(),
        },
    ]
}

#[tokio::test]
async fn json_list_decodes() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/people"))
        .build_json::<Vec<Person>>()
        .unwrap();

    assert_eq!(client().fetch(&resource).await.unwrap(), people());
}

#[tokio::test]
async fn unknown_path_is_http_404() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/missing.json"))
        .build_json::<Vec<Person>>()
        .unwrap();

    match client().fetch(&resource).await.unwrap_err() {
        NetworkingError::Http { status, response } => {
            assert_eq!(status, 404);
            assert_eq!(response.status, 404);
        }
        other => panic!("expected http error, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_rejected_before_parsing() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/status/500"))
        .build_json::<Vec<Person>>()
        .unwrap();

    assert_eq!(client().fetch(&resource).await.unwrap_err().status(), Some(500));
}

#[tokio::test]
async fn empty_body_is_no_data() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/empty"))
        .build_json::<Vec<Person>>()
        .unwrap();

    assert!(matches!(
        client().fetch(&resource).await,
        Err(NetworkingError::NoData)
    ));
}

#[tokio::test]
async fn malformed_body_is_parse_error() {
    let addr = start_server().await;
    let resource =
        ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/people/malformed"))
            .build_json::<Vec<Person>>()
            .unwrap();

    match client().fetch(&resource).await.unwrap_err() {
        NetworkingError::Parse(source) => assert!(source.is::<serde_json::Error>()),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn unit_resource_accepts_any_2xx() {
    let addr = start_server().await;
    let client = client();
    for path in ["no-content", "empty", "people/malformed"] {
        let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/{path}"))
            .build_unit()
            .unwrap();
        assert!(client.fetch(&resource).await.is_ok(), "{path}");
    }
}

#[tokio::test]
async fn refused_connection_is_generic_error() {
    // Bind and drop a listener so the port is known to be closed.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/people"))
        .timeout(Duration::from_secs(2))
        .build_json::<Vec<Person>>()
        .unwrap();

    match client().fetch(&resource).await.unwrap_err() {
        NetworkingError::Generic(source) => assert!(source.is::<reqwest::Error>()),
        other => panic!("expected generic error, got {other:?}"),
    }
}

#[tokio::test]
async fn custom_predicate_accepts_created() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Post, format!("http://{addr}/results"))
        .expect_status(accept_only(201))
        .build_json_exchange::<_, PostResult>(Some(&people()))
        .unwrap();

    let result = client().fetch(&resource).await.unwrap();
    assert_eq!(result.status_code, "000");
    assert_eq!(result.status_message, "success");
}

#[tokio::test]
async fn custom_predicate_rejects_plain_ok() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/people"))
        .expect_status(accept_only(201))
        .build_json::<Vec<Person>>()
        .unwrap();

    assert_eq!(client().fetch(&resource).await.unwrap_err().status(), Some(200));
}

#[tokio::test]
async fn request_shape_reaches_the_server() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Put, format!("http://{addr}/echo?abc=def"))
        .accept(ContentType::Json)
        .header("Accept", "text/plain")
        .bearer_auth("token")
        .query("foo", "bar bar")
        .build_json_exchange::<_, Echo>(Some(&people()))
        .unwrap();

    let echo = client().fetch(&resource).await.unwrap();
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.query.as_deref(), Some("abc=def&foo=bar%20bar"));
    assert_eq!(echo.headers["accept"], "text/plain");
    assert_eq!(echo.headers["content-type"], "application/json");
    assert_eq!(echo.headers["authorization"], "Bearer token");
    assert_eq!(echo.body, Some(serde_json::to_value(people()).unwrap()));
}

#[tokio::test]
async fn fire_and_forget_json_post() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Post, format!("http://{addr}/results"))
        .build_json_send(&people())
        .unwrap();

    client().fetch(&resource).await.unwrap();
}

#[tokio::test]
async fn load_delivers_result_to_callback() {
    let addr = start_server().await;
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/people"))
        .build_json::<Vec<Person>>()
        .unwrap()
        .map(|people| people.into_iter().map(|p| p.name).collect::<Vec<_>>());

    let (tx, rx) = oneshot::channel();
    let task = client().load(resource, move |result| {
        let _ = tx.send(result);
    });

    let names = rx.await.unwrap().unwrap();
    assert_eq!(names, ["Alice", "Bob"]);
    assert!(task.join().await);
}

#[tokio::test]
async fn cancelling_a_hung_load_calls_back_once() {
    // Accepts connections and never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let calls = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = oneshot::channel();
    let resource = ResourceBuilder::new(HttpMethod::Get, format!("http://{addr}/people"))
        .build_json::<Vec<Person>>()
        .unwrap();
    let counter = Arc::clone(&calls);
    let task = client().load(resource, move |result| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(result);
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    task.cancel();
    assert!(!task.join().await);

    assert!(rx.await.unwrap().unwrap_err().is_cancelled());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
