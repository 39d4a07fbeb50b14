//! Common test utilities and helpers for integration tests.
//!
//! Provides an in-process stand-in for the Azure Blob service, a minimal SMTP
//! relay, and a configuration builder pointing the reporter at both.

#![allow(dead_code)]

use axum::extract::{Path, RawQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use reporter::ReportConfig;
use shared::config::Env;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

pub const ACCOUNT: &str = "caretakerdata";
pub const CONTAINER: &str = "sensors";
pub const BLOB: &str = "readings.csv";
pub const SAS_TOKEN: &str = "sv=2021-08-06&sr=b&sig=integration";
pub const RECIPIENT: &str = "caretaker@example.com";
pub const SENDER: &str = "reports@example.com";

pub const READINGS_CSV: &str = "time,soundLevel,lightIntensity\n\
    2024-03-01 10:00:00,44.0,310\n\
    2024-03-01 08:00:00,41.5,300\n\
    2024-03-01 09:00:00,39.0,280\n";

/// A blob download as seen by the mock storage service.
#[derive(Debug, Clone)]
pub struct CapturedBlobRequest {
    /// Request path, without the leading slash.
    pub path: String,
    /// Raw query string.
    pub query: Option<String>,
    /// Lower-cased header names to values.
    pub headers: HashMap<String, String>,
}

#[derive(Clone)]
struct MockStorage {
    blobs: Arc<HashMap<String, Vec<u8>>>,
    captured: Arc<Mutex<Vec<CapturedBlobRequest>>>,
}

async fn get_blob(
    State(mock): State<MockStorage>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    mock.captured.lock().unwrap().push(CapturedBlobRequest {
        path: path.clone(),
        query,
        headers: headers
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect(),
    });

    match mock.blobs.get(&path) {
        Some(body) => (StatusCode::OK, body.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><Error><Code>BlobNotFound</Code></Error>",
        )
            .into_response(),
    }
}

/// Starts a mock blob service on an ephemeral port.
///
/// `blobs` maps `account/container/blob` paths to content.
///
/// # Returns
///
/// The service base URL and the list it records requests into.
pub async fn spawn_storage(
    blobs: HashMap<String, Vec<u8>>,
) -> (String, Arc<Mutex<Vec<CapturedBlobRequest>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let mock = MockStorage {
        blobs: Arc::new(blobs),
        captured: Arc::clone(&captured),
    };

    let app = Router::new()
        .route("/{*path}", get(get_blob))
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), captured)
}

/// The default sensor blob keyed for [`spawn_storage`].
pub fn readings_blob(content: &str) -> HashMap<String, Vec<u8>> {
    HashMap::from([(
        format!("{ACCOUNT}/{CONTAINER}/{BLOB}"),
        content.as_bytes().to_vec(),
    )])
}

/// What the mock SMTP relay observed.
#[derive(Debug, Default, Clone)]
pub struct SmtpCapture {
    /// Connections accepted.
    pub sessions: usize,
    /// `AUTH` command lines.
    pub auth_attempts: Vec<String>,
    /// `MAIL FROM` and `RCPT TO` lines.
    pub envelope: Vec<String>,
    /// Message contents received after `DATA`.
    pub messages: Vec<String>,
    /// A `QUIT` was received.
    pub quit: bool,
}

async fn smtp_session(
    stream: tokio::net::TcpStream,
    accept_auth: bool,
    capture: Arc<Mutex<SmtpCapture>>,
) {
    let (read, mut write) = stream.into_split();
    let mut reader = BufReader::new(read);

    capture.lock().unwrap().sessions += 1;
    write.write_all(b"220 localhost ESMTP mock\r\n").await.unwrap();

    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await.unwrap_or(0) == 0 {
            return;
        }
        let command = String::from_utf8_lossy(&line).trim_end().to_string();
        let verb = command.to_ascii_uppercase();

        let reply: &[u8] = if verb.starts_with("EHLO") || verb.starts_with("HELO") {
            b"250-localhost\r\n250 AUTH PLAIN LOGIN\r\n"
        } else if verb.starts_with("AUTH") {
            capture.lock().unwrap().auth_attempts.push(command);
            if accept_auth {
                b"235 2.7.0 Authentication successful\r\n"
            } else {
                b"535 5.7.8 Authentication credentials invalid\r\n"
            }
        } else if verb.starts_with("MAIL") || verb.starts_with("RCPT") {
            capture.lock().unwrap().envelope.push(command);
            b"250 2.1.0 OK\r\n"
        } else if verb.starts_with("DATA") {
            write
                .write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n")
                .await
                .unwrap();
            let mut message = String::new();
            loop {
                line.clear();
                if reader.read_until(b'\n', &mut line).await.unwrap_or(0) == 0 {
                    return;
                }
                if line == b".\r\n" {
                    break;
                }
                message.push_str(&String::from_utf8_lossy(&line));
            }
            capture.lock().unwrap().messages.push(message);
            b"250 2.0.0 OK queued\r\n"
        } else if verb.starts_with("RSET") || verb.starts_with("NOOP") {
            b"250 2.0.0 OK\r\n"
        } else if verb.starts_with("QUIT") {
            capture.lock().unwrap().quit = true;
            let _ = write.write_all(b"221 2.0.0 Bye\r\n").await;
            return;
        } else {
            b"502 5.5.2 Command not recognized\r\n"
        };

        if write.write_all(reply).await.is_err() {
            return;
        }
    }
}

/// Starts a plaintext SMTP relay on an ephemeral port.
///
/// # Returns
///
/// The port and the capture it records into.
pub async fn spawn_smtp(accept_auth: bool) -> (u16, Arc<Mutex<SmtpCapture>>) {
    let capture = Arc::new(Mutex::new(SmtpCapture::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let shared = Arc::clone(&capture);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(smtp_session(stream, accept_auth, Arc::clone(&shared)));
        }
    });

    (port, capture)
}

/// Reporter configuration pointing at the mock services.
pub fn report_config(
    storage_base: &str,
    smtp_port: u16,
    output_dir: &std::path::Path,
    extra: &[(&str, &str)],
) -> ReportConfig {
    let connection = format!("BlobEndpoint={storage_base}/{ACCOUNT};SharedAccessSignature={SAS_TOKEN}");
    let port = smtp_port.to_string();
    let output = output_dir.display().to_string();

    let mut pairs: Vec<(String, String)> = [
        ("AZURE_STORAGE_CONNECTION_STRING", connection.as_str()),
        ("AZURE_STORAGE_CONTAINER", CONTAINER),
        ("AZURE_STORAGE_BLOB", BLOB),
        ("STORAGE_TIMEOUT_SECS", "5"),
        ("SMTP_HOST", "127.0.0.1"),
        ("SMTP_PORT", port.as_str()),
        ("SMTP_TLS", "none"),
        ("SMTP_TIMEOUT_SECS", "5"),
        ("SMTP_USERNAME", SENDER),
        ("SMTP_PASSWORD", "integration-password"),
        ("CARETAKER_EMAIL", RECIPIENT),
        ("REPORT_OUTPUT_DIR", output.as_str()),
    ]
    .iter()
    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    .collect();
    pairs.extend(extra.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())));

    ReportConfig::from_source(&Env::from_pairs(pairs)).unwrap()
}

/// Lists the files left in a directory.
pub fn leftover_files(dir: &std::path::Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}
