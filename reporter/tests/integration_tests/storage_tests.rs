//! Integration tests for the blob client.
//!
//! Tests cover:
//! - SAS and SharedKey authorization
//! - Service error mapping
//! - Byte order mark handling

use reporter::storage::{BlobClient, FetchError, StorageConnection, STORAGE_API_VERSION};
use std::collections::HashMap;
use std::time::Duration;

use super::common::{readings_blob, spawn_storage, ACCOUNT, BLOB, CONTAINER, READINGS_CSV, SAS_TOKEN};

const ACCOUNT_KEY: &str = "Y2FyZXRha2VyLXRlc3Qta2V5LTAxMjM0NTY3ODlhYmNkZWY=";

fn client(connection: &str) -> BlobClient {
    let connection = StorageConnection::parse(connection).unwrap();
    BlobClient::new(connection, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_download_with_sas() {
    let (base, captured) = spawn_storage(readings_blob(READINGS_CSV)).await;
    let client = client(&format!(
        "BlobEndpoint={base}/{ACCOUNT};SharedAccessSignature=?{SAS_TOKEN}"
    ));

    let text = client.download_text(CONTAINER, BLOB).await.unwrap();

    assert_eq!(text, READINGS_CSV);
    let captured = captured.lock().unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].path, format!("{ACCOUNT}/{CONTAINER}/{BLOB}"));
    assert_eq!(captured[0].query.as_deref(), Some(SAS_TOKEN));
    assert!(!captured[0].headers.contains_key("authorization"));
    assert_eq!(captured[0].headers["x-ms-version"], STORAGE_API_VERSION);
    assert!(captured[0].headers["x-ms-date"].ends_with(" GMT"));
}

#[tokio::test]
async fn test_download_with_shared_key() {
    let (base, captured) = spawn_storage(readings_blob(READINGS_CSV)).await;
    let client = client(&format!(
        "BlobEndpoint={base}/{ACCOUNT};AccountName={ACCOUNT};AccountKey={ACCOUNT_KEY}"
    ));

    client.download_text(CONTAINER, BLOB).await.unwrap();

    let captured = captured.lock().unwrap();
    let auth = &captured[0].headers["authorization"];
    assert!(auth.starts_with(&format!("SharedKey {ACCOUNT}:")));
    assert!(captured[0].query.is_none());
}

#[tokio::test]
async fn test_missing_blob_is_not_found() {
    let (base, _) = spawn_storage(HashMap::new()).await;
    let client = client(&format!("BlobEndpoint={base}/{ACCOUNT}"));

    let err = client.download_text(CONTAINER, BLOB).await.unwrap_err();

    assert!(
        matches!(err, FetchError::NotFound { ref container, ref blob } if container == CONTAINER && blob == BLOB)
    );
}

#[tokio::test]
async fn test_byte_order_mark_is_dropped() {
    let mut content = b"\xEF\xBB\xBF".to_vec();
    content.extend_from_slice(READINGS_CSV.as_bytes());
    let blobs = HashMap::from([(format!("{ACCOUNT}/{CONTAINER}/{BLOB}"), content)]);
    let (base, _) = spawn_storage(blobs).await;
    let client = client(&format!("BlobEndpoint={base}/{ACCOUNT}"));

    let text = client.download_text(CONTAINER, BLOB).await.unwrap();

    assert!(text.starts_with("time,"));
}

#[tokio::test]
async fn test_nested_blob_name() {
    let blobs = HashMap::from([(
        format!("{ACCOUNT}/{CONTAINER}/2024/week-09.csv"),
        READINGS_CSV.as_bytes().to_vec(),
    )]);
    let (base, _) = spawn_storage(blobs).await;
    let client = client(&format!("BlobEndpoint={base}/{ACCOUNT}"));

    let text = client.download_text(CONTAINER, "2024/week-09.csv").await.unwrap();

    assert_eq!(text, READINGS_CSV);
}

#[tokio::test]
async fn test_unreachable_service() {
    let client = client("BlobEndpoint=http://127.0.0.1:9/caretakerdata");

    let err = client.download_text(CONTAINER, BLOB).await.unwrap_err();

    assert!(matches!(err, FetchError::Http(_)));
}
