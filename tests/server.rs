use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::HeaderName;
use hyper::{Method, StatusCode};
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use initserver::logger::{MemorySink, WriterSink};
use initserver::{
    initialise_server_with, BoundAddr, Handler, HttpError, Level, Options, ServerError,
    ServerHandle,
};

struct Reply {
    status: StatusCode,
    headers: hyper::HeaderMap,
    body: Bytes,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

fn local_options() -> Options {
    Options::new()
        .host("127.0.0.1")
        .port(0)
        .static_root("/nonexistent/initserver-public")
}

fn no_env() -> HashMap<&'static str, &'static str> {
    HashMap::new()
}

fn tcp_addr(server: &ServerHandle) -> SocketAddr {
    match server.local_addr() {
        BoundAddr::Tcp(addr) => *addr,
        BoundAddr::Unix(path) => panic!("expected a tcp binding, got {}", path.display()),
    }
}

async fn start(
    args: impl Into<initserver::ServerArgs>,
    env: &HashMap<&'static str, &'static str>,
) -> (ServerHandle, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let server = initialise_server_with(args, env, sink.clone()).await.unwrap();
    (server, sink)
}

async fn request(server: &ServerHandle, method: Method, path: &str) -> Reply {
    let client = Client::builder(TokioExecutor::new()).build_http::<Full<Bytes>>();
    let req = hyper::Request::builder()
        .method(method)
        .uri(format!("http://{}{path}", tcp_addr(server)))
        .body(Full::new(Bytes::new()))
        .unwrap();

    let res = client.request(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    Reply {
        status,
        headers,
        body,
    }
}

async fn get(server: &ServerHandle, path: &str) -> Reply {
    request(server, Method::GET, path).await
}

#[tokio::test]
async fn test_unmatched_route_is_json_404() {
    let (server, _) = start(local_options(), &no_env()).await;

    let reply = get(&server, "/does/not/exist").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);
    assert_eq!(
        reply.header("content-type"),
        Some("application/json; charset=utf-8")
    );

    let body = reply.json();
    assert_eq!(body["error"]["status"], 404);
    let message = body["error"]["message"].as_str().unwrap();
    assert!(message.ends_with(" Route not Found /does/not/exist"), "{message}");

    server.shutdown().await;
}

#[tokio::test]
async fn test_security_headers_on_every_response() {
    let (server, _) = start(local_options(), &no_env()).await;

    let reply = get(&server, "/anything").await;
    assert_eq!(reply.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(reply.header("x-frame-options"), Some("SAMEORIGIN"));
    assert!(reply.header("x-powered-by").is_none());

    server.shutdown().await;
}

#[tokio::test]
async fn test_failed_handler_status_is_kept() {
    let teapot = Handler::from_fn("teapot", |_req, _res, next| {
        next.fail(HttpError::with_status(418, "short and stout"));
    });
    let (server, _) = start((local_options(), teapot), &no_env()).await;

    let reply = get(&server, "/brew").await;
    assert_eq!(reply.status, StatusCode::IM_A_TEAPOT);
    assert_eq!(
        reply.json(),
        serde_json::json!({"error": {"message": "short and stout", "status": 418}})
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_unclassified_failure_is_500() {
    let broken = Handler::from_fn("broken", |_req, _res, next| {
        next.fail(HttpError::new("database unreachable"));
    });
    let (server, _) = start((local_options(), broken), &no_env()).await;

    let reply = get(&server, "/").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["error"]["status"], 500);

    server.shutdown().await;
}

#[tokio::test]
async fn test_caller_handlers_run_in_order() {
    let first = Handler::from_fn("first", |_req, res, next| {
        res.set_header(HeaderName::from_static("x-trace"), "first");
        next.advance();
    });
    let second = Handler::from_fn("second", |_req, res, _next| {
        let trace = res.header("x-trace").unwrap_or("none").to_string();
        res.send_text(format!("{trace},second"));
    });
    let third = Handler::from_fn("third", |_req, res, _next| {
        res.send_text("third");
    });

    let (server, _) = start((local_options(), vec![first, second, third]), &no_env()).await;

    let reply = get(&server, "/").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "first,second");

    server.shutdown().await;
}

#[tokio::test]
async fn test_single_handler_same_as_sequence() {
    let hello = || {
        Handler::from_fn("hello", |_req, res, _next| {
            res.send_text("hello");
        })
    };

    let (single, _) = start((local_options(), hello()), &no_env()).await;
    let (sequence, _) = start((local_options(), vec![hello()]), &no_env()).await;

    assert_eq!(get(&single, "/").await.text(), "hello");
    assert_eq!(get(&sequence, "/").await.text(), "hello");

    single.shutdown().await;
    sequence.shutdown().await;
}

#[tokio::test]
async fn test_custom_error_handler_replaces_default() {
    let fail = Handler::from_fn("fail", |_req, _res, next| {
        next.fail(HttpError::with_status(409, "conflict"));
    });
    let plain = Handler::from_error_fn("plain", |err, _req, res| {
        res.set_status(err.effective_status());
        res.send_text(format!("plain: {}", err.message));
    });

    let (server, _) = start((local_options(), vec![fail, plain]), &no_env()).await;

    let reply = get(&server, "/").await;
    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.text(), "plain: conflict");

    server.shutdown().await;
}

#[tokio::test]
async fn test_cors_only_in_development() {
    let (dev, _) = start(local_options().environment("development"), &no_env()).await;
    let reply = get(&dev, "/").await;
    assert_eq!(reply.header("access-control-allow-origin"), Some("*"));

    let preflight = request(&dev, Method::OPTIONS, "/api").await;
    assert_eq!(preflight.status, StatusCode::NO_CONTENT);
    assert_eq!(
        preflight.header("access-control-allow-methods"),
        Some("GET,HEAD,PUT,PATCH,POST,DELETE")
    );
    dev.shutdown().await;

    let (prod, _) = start(local_options().environment("production"), &no_env()).await;
    let reply = get(&prod, "/").await;
    assert!(reply.header("access-control-allow-origin").is_none());
    prod.shutdown().await;
}

#[tokio::test]
async fn test_development_from_environment() {
    let env = HashMap::from([("NODE_ENV", "development")]);
    let (server, _) = start(local_options(), &env).await;

    let reply = get(&server, "/").await;
    assert_eq!(reply.header("access-control-allow-origin"), Some("*"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_static_files_served_before_handlers() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("robots.txt"), "User-agent: *\n").unwrap();

    let fallback = Handler::from_fn("fallback", |_req, res, _next| {
        res.send_text("dynamic");
    });
    let options = local_options().static_root(dir.path());
    let (server, _) = start((options, fallback), &no_env()).await;

    let reply = get(&server, "/robots.txt").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(reply.text(), "User-agent: *\n");

    assert_eq!(get(&server, "/other").await.text(), "dynamic");

    server.shutdown().await;
}

#[tokio::test]
async fn test_panicking_handler_still_answers() {
    let boom = Handler::from_fn("boom", |_req, _res, _next| {
        panic!("handler bug");
    });
    let (server, _) = start((local_options(), boom), &no_env()).await;

    let reply = get(&server, "/x").await;
    assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(reply.json()["error"]["message"], "Stage 'boom' panicked");

    // The connection task survived; the server keeps answering
    assert_eq!(get(&server, "/y").await.status, StatusCode::INTERNAL_SERVER_ERROR);

    server.shutdown().await;
}

#[tokio::test]
async fn test_encoded_static_file_name() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("my file.txt"), "with a space").unwrap();

    let options = local_options().static_root(dir.path());
    let (server, _) = start(options, &no_env()).await;

    let reply = get(&server, "/my%20file.txt").await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.text(), "with a space");

    server.shutdown().await;
}

#[tokio::test]
async fn test_file_sink_receives_access_lines() {
    let dir = tempfile::tempdir().unwrap();
    let access = dir.path().join("access.log");
    let error = dir.path().join("error.log");
    let sink = Arc::new(WriterSink::new(access.to_str(), error.to_str()).unwrap());

    let server = initialise_server_with(local_options().log_format("tiny"), &no_env(), sink)
        .await
        .unwrap();
    get(&server, "/to-file").await;
    server.shutdown().await;

    let access_text = std::fs::read_to_string(&access).unwrap();
    assert!(access_text.contains("[INFO] Server started at http://127.0.0.1:"));
    assert!(access_text.contains("[INFO] GET /to-file 404 "));
}

#[tokio::test]
async fn test_host_and_port_from_environment() {
    let env = HashMap::from([
        ("PORT", "0"),
        ("HOST_ADDR", "127.0.0.1"),
        ("HOST", "host.invalid"),
    ]);
    let options = Options::new().static_root("/nonexistent/initserver-public");
    let (server, sink) = start(options, &env).await;

    let addr = tcp_addr(&server);
    assert!(addr.ip().is_loopback());

    let started = sink.messages_at(Level::Info);
    assert!(
        started
            .iter()
            .any(|line| line == &format!("Server started at http://127.0.0.1:{}", addr.port())),
        "{started:?}"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_access_log_reports_each_request() {
    let (server, sink) = start(local_options().log_format("tiny"), &no_env()).await;

    let reply = get(&server, "/logged").await;
    assert_eq!(reply.status, StatusCode::NOT_FOUND);

    let lines = sink.messages_at(Level::Info);
    assert!(
        lines.iter().any(|line| line.starts_with("GET /logged 404")),
        "{lines:?}"
    );

    server.shutdown().await;
}

#[tokio::test]
async fn test_port_in_use_is_reported() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let sink = Arc::new(MemorySink::new());
    let result = initialise_server_with(
        Options::new().host("127.0.0.1").port(port),
        &no_env(),
        sink,
    )
    .await;

    assert!(matches!(result, Err(ServerError::Bind { .. })));
}

#[tokio::test]
async fn test_shutdown_stops_accepting() {
    let (server, _) = start(local_options(), &no_env()).await;
    let addr = tcp_addr(&server);
    assert!(server.is_running());

    server.shutdown().await;
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_unix_socket_binding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("initserver.sock");
    let options = Options::new()
        .host(path.to_str().unwrap())
        .static_root("/nonexistent/initserver-public");

    let (server, sink) = start(options, &no_env()).await;
    assert_eq!(server.local_addr(), &BoundAddr::Unix(path.clone()));
    assert!(path.exists());
    assert!(sink
        .messages_at(Level::Info)
        .iter()
        .any(|line| line.starts_with("Server started at unix:")));

    server.shutdown().await;
    assert!(!path.exists());
}
