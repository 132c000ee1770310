#![cfg(feature = "online")]

use ploston_license::{
    DeviceInfo, HttpLicenseServer, LicenseError, LicenseServer, ValidationRequest,
};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn request() -> ValidationRequest {
    ValidationRequest {
        key: "PLST-TEST-KEY".to_string(),
        instance_id: "instance-abc".to_string(),
        device: DeviceInfo {
            os_name: "linux".to_string(),
            arch: "x86_64".to_string(),
            hostname: "build-01".to_string(),
        },
    }
}

/// Reads one HTTP request, returning its path and body.
fn read_request(stream: &TcpStream) -> (String, String) {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let path = request_line.split_whitespace().nth(1).unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        if line.trim().is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }

    let mut body = vec![0; content_length];
    reader.read_exact(&mut body).unwrap();
    (path, String::from_utf8(body).unwrap())
}

/// Serves a single canned response on an OS-assigned port.
///
/// Returns the base URL and a receiver yielding the request path and body.
fn spawn_canned(status: &'static str, body: &'static str) -> (String, mpsc::Receiver<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let received = read_request(&stream);
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        let _ = tx.send(received);
    });
    (format!("http://127.0.0.1:{}", port), rx)
}

fn exchange(status: &'static str, body: &'static str) -> Result<String, LicenseError> {
    let (base, _) = spawn_canned(status, body);
    HttpLicenseServer::new(&base).unwrap().exchange(&request(), TIMEOUT)
}

#[test]
fn success_returns_token_and_posts_request() {
    let (base, received) = spawn_canned("200 OK", r#"{"token":"aaa.bbb.ccc"}"#);
    let server = HttpLicenseServer::new(&format!("{base}/")).unwrap();

    let token = server.exchange(&request(), TIMEOUT).unwrap();
    assert_eq!(token, "aaa.bbb.ccc");

    let (path, body) = received.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(path, "/v1/licenses/validate");
    let sent: ValidationRequest = serde_json::from_str(&body).unwrap();
    assert_eq!(sent, request());
}

#[test]
fn success_with_junk_body_is_malformed() {
    let err = exchange("200 OK", "not json").unwrap_err();
    assert!(matches!(err, LicenseError::Malformed(_)), "got {err:?}");
}

#[test]
fn structured_rejection_is_rejected() {
    let err = exchange("403 Forbidden", r#"{"code":"REVOKED","reason":"license revoked"}"#).unwrap_err();
    match err {
        LicenseError::Rejected { code, reason } => {
            assert_eq!(code, "REVOKED");
            assert_eq!(reason, "license revoked");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn client_error_without_body_is_rejected_with_status() {
    let err = exchange("404 Not Found", "").unwrap_err();
    match err {
        LicenseError::Rejected { code, .. } => assert_eq!(code, "404"),
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn request_timeout_status_is_timeout() {
    let err = exchange("408 Request Timeout", "").unwrap_err();
    assert!(matches!(err, LicenseError::Timeout(_)), "got {err:?}");
}

#[test]
fn rate_limit_is_network_error() {
    let err = exchange("429 Too Many Requests", "").unwrap_err();
    assert!(matches!(err, LicenseError::Network(_)), "got {err:?}");
    assert!(err.is_retryable());
}

#[test]
fn server_error_is_network_error() {
    let err = exchange("503 Service Unavailable", r#"{"code":"DOWN","reason":"maintenance"}"#).unwrap_err();
    assert!(matches!(err, LicenseError::Network(_)), "got {err:?}");
}

#[test]
fn connection_refused_is_network_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let server = HttpLicenseServer::new(&format!("http://127.0.0.1:{port}")).unwrap();

    let err = server.exchange(&request(), TIMEOUT).unwrap_err();
    assert!(matches!(err, LicenseError::Network(_)), "got {err:?}");
}

#[test]
fn unresponsive_server_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let _ = read_request(&stream);
        // Hold the connection open without answering.
        let _ = done_rx.recv_timeout(TIMEOUT);
    });

    let server = HttpLicenseServer::new(&format!("http://127.0.0.1:{port}")).unwrap();
    let err = server.exchange(&request(), Duration::from_millis(200)).unwrap_err();
    let _ = done_tx.send(());

    assert!(matches!(err, LicenseError::Timeout(_)), "got {err:?}");
}
