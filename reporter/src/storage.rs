//! Azure Blob Storage reader.
//!
//! Parses storage connection strings and downloads a single blob as text over
//! the Blob service REST API.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{StatusCode, Url};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Blob service REST API version sent with every request.
pub const STORAGE_API_VERSION: &str = "2021-08-06";

const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Errors that can occur while fetching a blob.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The connection string cannot be used.
    #[error("Invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    /// Container or blob name is empty.
    #[error("Invalid blob identifier: {0}")]
    InvalidIdentifier(&'static str),

    /// The blob does not exist.
    #[error("Blob {container}/{blob} not found")]
    NotFound {
        /// Container name.
        container: String,
        /// Blob name.
        blob: String,
    },

    /// The storage service rejected the credentials.
    #[error("Storage access denied ({status}): {message}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
        /// Service error text.
        message: String,
    },

    /// Any other non-success response.
    #[error("Storage service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Service error text.
        message: String,
    },

    /// Transport failure.
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The blob is not valid UTF-8 text.
    #[error("Blob content is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
}

/// How requests are authorized.
#[derive(Clone, PartialEq, Eq)]
enum Credential {
    SharedKey { account: String, key: Vec<u8> },
    Sas(String),
    Anonymous,
}

/// A parsed storage connection string.
///
/// # Example
///
/// ```
/// use reporter::storage::StorageConnection;
///
/// let conn = StorageConnection::parse(
///     "DefaultEndpointsProtocol=https;AccountName=caretaker;AccountKey=a2V5;EndpointSuffix=core.windows.net",
/// ).unwrap();
/// assert_eq!(conn.blob_endpoint(), "https://caretaker.blob.core.windows.net");
/// ```
#[derive(Clone)]
pub struct StorageConnection {
    blob_endpoint: String,
    credential: Credential,
}

impl std::fmt::Debug for StorageConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let auth = match &self.credential {
            Credential::SharedKey { .. } => "shared-key",
            Credential::Sas(_) => "sas",
            Credential::Anonymous => "anonymous",
        };
        f.debug_struct("StorageConnection")
            .field("blob_endpoint", &self.blob_endpoint)
            .field("auth", &auth)
            .finish()
    }
}

impl StorageConnection {
    /// Parses an Azure Storage connection string.
    ///
    /// Keys are case-insensitive. `UseDevelopmentStorage=true` targets the
    /// local Azurite emulator.
    ///
    /// # Errors
    ///
    /// Returns an error if no blob endpoint can be derived, or the account key
    /// is not valid base64.
    pub fn parse(connection_string: &str) -> Result<Self, FetchError> {
        let fields: HashMap<String, String> = connection_string
            .split(';')
            .filter_map(|pair| pair.split_once('='))
            .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
            .filter(|(_, v)| !v.is_empty())
            .collect();

        let dev_storage = fields
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if dev_storage {
            return Ok(Self {
                blob_endpoint: DEV_BLOB_ENDPOINT.to_string(),
                credential: Credential::SharedKey {
                    account: DEV_ACCOUNT_NAME.to_string(),
                    key: decode_key(DEV_ACCOUNT_KEY)?,
                },
            });
        }

        let account = fields.get("accountname").cloned();
        let blob_endpoint = match (fields.get("blobendpoint"), &account) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/').to_string(),
            (None, Some(account)) => {
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map_or("https", String::as_str);
                let suffix = fields
                    .get("endpointsuffix")
                    .map_or("core.windows.net", String::as_str);
                format!("{protocol}://{account}.blob.{suffix}")
            }
            (None, None) => {
                return Err(FetchError::InvalidConnectionString(
                    "neither AccountName nor BlobEndpoint is set".to_string(),
                ))
            }
        };

        let credential = if let Some(sas) = fields.get("sharedaccesssignature") {
            Credential::Sas(sas.trim_start_matches('?').to_string())
        } else if let Some(key) = fields.get("accountkey") {
            let account = account.ok_or_else(|| {
                FetchError::InvalidConnectionString(
                    "AccountKey requires AccountName".to_string(),
                )
            })?;
            Credential::SharedKey {
                account,
                key: decode_key(key)?,
            }
        } else {
            Credential::Anonymous
        };

        Ok(Self {
            blob_endpoint,
            credential,
        })
    }

    /// Returns the blob service endpoint, without trailing slash.
    #[must_use]
    pub fn blob_endpoint(&self) -> &str {
        &self.blob_endpoint
    }

    fn blob_url(&self, container: &str, blob: &str) -> Result<Url, FetchError> {
        let mut url = Url::parse(&self.blob_endpoint)
            .map_err(|e| FetchError::InvalidConnectionString(format!("bad endpoint: {e}")))?;
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                FetchError::InvalidConnectionString("endpoint cannot be a base URL".to_string())
            })?;
            segments.pop_if_empty().push(container);
            for part in blob.split('/') {
                segments.push(part);
            }
        }
        if let Credential::Sas(token) = &self.credential {
            url.set_query(Some(token));
        }
        Ok(url)
    }
}

fn decode_key(key: &str) -> Result<Vec<u8>, FetchError> {
    STANDARD
        .decode(key)
        .map_err(|e| FetchError::InvalidConnectionString(format!("AccountKey is not base64: {e}")))
}

/// Formats a timestamp as an RFC 1123 `x-ms-date` value.
#[must_use]
pub fn ms_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Builds the SharedKey string-to-sign for a GET Blob request.
#[must_use]
pub fn string_to_sign(account: &str, url_path: &str, ms_date: &str) -> String {
    // Verb followed by eleven empty standard headers.
    format!(
        "GET\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{ms_date}\nx-ms-version:{STORAGE_API_VERSION}\n/{account}{url_path}"
    )
}

/// Signs a string with HMAC-SHA256 and returns it base64 encoded.
///
/// # Panics
///
/// Never in practice: HMAC accepts keys of any length.
#[must_use]
pub fn sign(key: &[u8], string_to_sign: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(string_to_sign.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Reads blobs from one storage account.
#[derive(Debug, Clone)]
pub struct BlobClient {
    client: reqwest::Client,
    connection: StorageConnection,
}

impl BlobClient {
    /// Creates a client for the given connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(connection: StorageConnection, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("caretaker-reporter/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { client, connection })
    }

    /// Downloads a blob and decodes it as UTF-8 text.
    ///
    /// A leading byte order mark is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `container` or `blob` is empty
    /// - The request fails or the service returns a non-success status
    /// - The content is not UTF-8
    pub async fn download_text(&self, container: &str, blob: &str) -> Result<String, FetchError> {
        if container.trim().is_empty() {
            return Err(FetchError::InvalidIdentifier("container name is empty"));
        }
        if blob.trim().is_empty() {
            return Err(FetchError::InvalidIdentifier("blob name is empty"));
        }

        let url = self.connection.blob_url(container, blob)?;
        let date = ms_date(Utc::now());

        let mut request = self
            .client
            .get(url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", STORAGE_API_VERSION);

        if let Credential::SharedKey { account, key } = &self.connection.credential {
            let signature = sign(key, &string_to_sign(account, url.path(), &date));
            request = request.header("Authorization", format!("SharedKey {account}:{signature}"));
        }

        tracing::debug!(container, blob, "Downloading blob");
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => FetchError::NotFound {
                    container: container.to_string(),
                    blob: blob.to_string(),
                },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized {
                    status: status.as_u16(),
                    message,
                },
                _ => FetchError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let bytes = response.bytes().await?;
        let content = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);
        let text = String::from_utf8(content.to_vec())?;

        tracing::info!(container, blob, bytes = text.len(), "Downloaded blob");
        Ok(text)
    }
}
