// Wire protocol tests: request handling and event framing over in-memory and TCP transports

mod common;

use common::{FakeHandle, FakeRuntime, stats_frame};
use dockermon::models::DerivedStats;
use dockermon::server::{ConnectionServer, SessionSettings, serve_connection};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use tokio::time::Duration;

fn settings() -> SessionSettings {
    SessionSettings {
        request_buffer_size: 1024,
        request_timeout: Duration::from_secs(2),
        log_tail: 1,
    }
}

/// Send `request`, serve the session to completion, return everything written back.
async fn exchange(runtime: &FakeRuntime, request: &str) -> String {
    let (mut client, server_io) = duplex(64 * 1024);
    client.write_all(request.as_bytes()).await.unwrap();
    serve_connection(runtime, server_io, &settings())
        .await
        .expect("session");
    let mut out = String::new();
    client.read_to_string(&mut out).await.unwrap();
    out
}

fn expected_stats(cpu_percent: f64, usage: u64) -> String {
    serde_json::to_string(&DerivedStats {
        cpu_percent,
        memory_used_bytes: usage,
        memory_limit_bytes: 1_000_000,
        blkio_read_bytes: 10,
        blkio_write_bytes: 20,
    })
    .unwrap()
}

fn demo_runtime() -> FakeRuntime {
    // cpu_delta = 500, system_delta = 1000, 2 cpus => 100%
    let frames = vec![
        stats_frame(600, 1100, 100, 2, 111),
        stats_frame(600, 1100, 100, 2, 222),
    ];
    FakeRuntime::with_container("demo", FakeHandle::new(&["a", "b"], frames))
}

#[tokio::test]
async fn test_streams_one_frame_per_merged_record() {
    let out = exchange(&demo_runtime(), "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;

    let (head, body) = out.split_once("\r\n\r\n").expect("header terminator");
    assert!(head.starts_with("HTTP/1.1 200 OK"));
    assert!(head.contains("Content-Type: text/event-stream"));
    assert_eq!(out.matches("HTTP/1.1").count(), 1, "status line sent once");

    let expected = format!(
        "data:{}|a\n\ndata:{}|b\n\n",
        expected_stats(100.0, 111),
        expected_stats(100.0, 222)
    );
    assert_eq!(body, expected);
}

#[tokio::test]
async fn test_extra_log_lines_are_dropped_when_stats_run_out() {
    let handle = FakeHandle::new(&["l1", "l2", "l3"], vec![
        stats_frame(0, 0, 0, 1, 1),
        stats_frame(0, 0, 0, 1, 2),
    ]);
    let runtime = FakeRuntime::with_container("demo", handle);
    let out = exchange(&runtime, "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert_eq!(out.matches("data:").count(), 2);
    assert!(!out.contains("l3"));
}

#[tokio::test]
async fn test_configured_tail_reaches_the_log_stream() {
    let handle = FakeHandle::new(&["a"], vec![stats_frame(0, 0, 0, 1, 1)]);
    let tails = handle.requested_tails.clone();
    let runtime = FakeRuntime::with_container("demo", handle);
    let (mut client, server_io) = duplex(64 * 1024);
    client
        .write_all(b"GET /stream?container=demo HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    let mut s = settings();
    s.log_tail = 25;
    serve_connection(&runtime, server_io, &s).await.unwrap();
    assert_eq!(*tails.lock().unwrap(), vec![25]);
}

#[tokio::test]
async fn test_unknown_container_is_not_found() {
    let out = exchange(&demo_runtime(), "GET /stream?container=ghost HTTP/1.1\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(out.contains("ghost"));
    assert!(!out.contains("data:"));
}

#[tokio::test]
async fn test_unknown_container_body_names_it() {
    let out = exchange(&FakeRuntime::default(), "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 404"));
    let (_, body) = out.split_once("\r\n\r\n").unwrap();
    assert!(body.contains("demo"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let out = exchange(&demo_runtime(), "GET /other?container=demo HTTP/1.1\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(out.contains("Only /stream"));
}

#[tokio::test]
async fn test_non_get_is_method_not_allowed() {
    let out = exchange(&demo_runtime(), "POST /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
    assert!(out.contains("POST"));
}

#[tokio::test]
async fn test_missing_container_is_bad_request() {
    let out = exchange(&demo_runtime(), "GET /stream HTTP/1.1\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.contains("container name is required"));
}

#[tokio::test]
async fn test_malformed_request_is_bad_request() {
    let out = exchange(&demo_runtime(), "hello\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 400"));
}

#[tokio::test]
async fn test_unreachable_runtime_is_service_unavailable() {
    let runtime = FakeRuntime {
        unavailable: true,
        ..Default::default()
    };
    let out = exchange(&runtime, "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert!(out.starts_with("HTTP/1.1 503"));
}

#[tokio::test]
async fn test_data_error_ends_stream_after_good_frames() {
    let handle = FakeHandle::new(&["a", "b", "c"], vec![
        stats_frame(0, 0, 0, 1, 1),
        r#"{"memory_stats": {}}"#.to_string(),
        stats_frame(0, 0, 0, 1, 3),
    ]);
    let runtime = FakeRuntime::with_container("demo", handle);
    let out = exchange(&runtime, "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert_eq!(out.matches("data:").count(), 1);
    assert!(out.contains("|a\n\n"));
}

#[tokio::test]
async fn test_peer_disconnect_is_a_clean_end() {
    let (mut client, server_io) = duplex(64 * 1024);
    client
        .write_all(b"GET /stream?container=demo HTTP/1.1\r\n\r\n")
        .await
        .unwrap();
    drop(client);
    let result = serve_connection(&demo_runtime(), server_io, &settings()).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_silent_client_times_out_without_response() {
    let (mut client, server_io) = duplex(1024);
    let mut s = settings();
    s.request_timeout = Duration::from_millis(50);
    serve_connection(&demo_runtime(), server_io, &s).await.unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_tcp_server_serves_sessions_until_shutdown() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = ConnectionServer::new(Arc::new(demo_runtime()), settings(), false);
    let task = tokio::spawn(server.run(listener, async move {
        let _ = shutdown_rx.await;
    }));

    for _ in 0..2 {
        let mut conn = tokio::net::TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"GET /stream?container=demo HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let mut out = String::new();
        conn.read_to_string(&mut out).await.unwrap();
        assert_eq!(out.matches("data:").count(), 2);
    }

    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_concurrent_sessions_are_isolated() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let server = ConnectionServer::new(Arc::new(demo_runtime()), settings(), true);
    let task = tokio::spawn(server.run(listener, async move {
        let _ = shutdown_rx.await;
    }));

    let clients = (0..4).map(|_| async move {
        let mut conn = tokio::net::TcpStream::connect(addr).await.unwrap();
        conn.write_all(b"GET /stream?container=demo HTTP/1.1\r\n\r\n")
            .await
            .unwrap();
        let mut out = String::new();
        conn.read_to_string(&mut out).await.unwrap();
        out
    });
    for out in futures_util::future::join_all(clients).await {
        assert_eq!(out.matches("data:").count(), 2);
    }

    shutdown_tx.send(()).unwrap();
    task.await.unwrap().unwrap();
}

fn raw_log_runtime(chunks: Vec<Vec<u8>>, frames: usize) -> FakeRuntime {
    let handle = FakeHandle {
        log_chunks: chunks,
        stats_frames: (0..frames as u64).map(|n| stats_frame(0, 0, 0, 1, n)).collect(),
        ..Default::default()
    };
    FakeRuntime::with_container("demo", handle)
}

fn event_lines(out: &str) -> Vec<String> {
    let (_, body) = out.split_once("\r\n\r\n").expect("header terminator");
    body.split("\n\n")
        .filter(|e| !e.is_empty())
        .map(|e| {
            assert!(!e.contains('\n'), "event spans several lines: {e:?}");
            let payload = e.strip_prefix("data:").expect("data prefix");
            payload.split_once('|').unwrap().1.to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_one_write_with_several_lines_becomes_separate_events() {
    let runtime = raw_log_runtime(vec![b"first\nsecond\n".to_vec()], 2);
    let out = exchange(&runtime, "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert_eq!(event_lines(&out), vec!["first", "second"]);
}

#[tokio::test]
async fn test_character_split_across_writes_is_not_lost() {
    let bytes = "héllo\n".as_bytes();
    let runtime = raw_log_runtime(vec![bytes[..2].to_vec(), bytes[2..].to_vec()], 1);
    let out = exchange(&runtime, "GET /stream?container=demo HTTP/1.1\r\n\r\n").await;
    assert_eq!(event_lines(&out), vec!["héllo"]);
}
