use crate::config::Config;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::multipart;
use reqwest::Url;
use serde_json::Value;
use std::path::Path;
use std::pin::Pin;
#[cfg(test)]
use std::sync::Arc;
use thiserror::Error;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransferError>> + Send>>;

const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("cannot read '{path}': {source}")]
    LocalFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot reach local analysis service at '{url}': {message}. Start the service or update PACT_BASE_URL.")]
    LocalServiceDown { url: String, message: String },
    #[error("cannot reach '{url}': {message}")]
    Unreachable { url: String, message: String },
    #[error("request to '{url}' timed out: {message}")]
    Timeout { url: String, message: String },
    #[error("'{url}' returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("malformed response from '{url}': {message}")]
    MalformedResponse { url: String, message: String },
    #[error("request to '{url}' failed: {message}")]
    Other { url: String, message: String },
}

#[cfg(test)]
pub trait MockStreamProducer: Send + Sync {
    fn create_mock_stream(&self) -> Result<ByteStream, TransferError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    docx_url: String,
    xlsx_url: String,
    analyze_url: String,
    #[cfg(test)]
    mock_stream_producer: Option<Arc<dyn MockStreamProducer>>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            docx_url: config.docx_upload_url(),
            xlsx_url: config.xlsx_upload_url(),
            analyze_url: config.analyze_url(),
            #[cfg(test)]
            mock_stream_producer: None,
        }
    }

    #[cfg(test)]
    pub fn new_mock(producer: Arc<dyn MockStreamProducer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            docx_url: "http://127.0.0.1:8001/upload-docx/".to_string(),
            xlsx_url: "http://127.0.0.1:8001/upload-xlsx/".to_string(),
            analyze_url: "http://127.0.0.1:8001/analyze/".to_string(),
            mock_stream_producer: Some(producer),
        }
    }

    /// Upload the contract document. The service answers with an arbitrary
    /// JSON value representing the parsed content; it is kept opaque here.
    pub async fn upload_docx(&self, path: &Path) -> Result<Value, TransferError> {
        let url = self.docx_url.clone();
        self.upload(&url, path, DOCX_MIME).await
    }

    /// Upload the task spreadsheet. The service wraps the parsed rows as
    /// `{ "data": ... }`; the wrapper is peeled off here.
    pub async fn upload_xlsx(&self, path: &Path) -> Result<Value, TransferError> {
        let url = self.xlsx_url.clone();
        let body = self.upload(&url, path, XLSX_MIME).await?;
        unwrap_data_member(body, &url)
    }

    async fn upload(&self, url: &str, path: &Path, mime: &str) -> Result<Value, TransferError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TransferError::LocalFile {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|error| TransferError::Other {
                url: url.to_string(),
                message: error.to_string(),
            })?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|error| map_transfer_error(error, url))?
            .error_for_status()
            .map_err(|error| map_transfer_error(error, url))?;

        response
            .json::<Value>()
            .await
            .map_err(|error| TransferError::MalformedResponse {
                url: url.to_string(),
                message: error.to_string(),
            })
    }

    /// Open the one-way analysis connection and return its raw byte stream.
    /// The caller owns teardown; dropping the stream closes the connection.
    pub async fn analysis_stream(&self) -> Result<ByteStream, TransferError> {
        #[cfg(test)]
        {
            if let Some(producer) = &self.mock_stream_producer {
                return producer.create_mock_stream();
            }
        }

        let url = self.analyze_url.clone();
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| map_transfer_error(error, &url))?
            .error_for_status()
            .map_err(|error| map_transfer_error(error, &url))?;

        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_transfer_error(error, &url)));
        Ok(Box::pin(stream))
    }
}

fn unwrap_data_member(body: Value, url: &str) -> Result<Value, TransferError> {
    match body {
        Value::Object(mut members) => {
            members
                .remove("data")
                .ok_or_else(|| TransferError::MalformedResponse {
                    url: url.to_string(),
                    message: "missing 'data' member".to_string(),
                })
        }
        _ => Err(TransferError::MalformedResponse {
            url: url.to_string(),
            message: "expected a JSON object with a 'data' member".to_string(),
        }),
    }
}

// Loopback and unspecified hosts mean an operator-run service on this
// machine; connect failures there get the start-the-service hint.
fn is_local_service_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    matches!(
        parsed.host_str().map(str::to_ascii_lowercase),
        Some(host) if host == "localhost"
            || host == "::1"
            || host == "0.0.0.0"
            || host.starts_with("127.")
    )
}

fn map_transfer_error(error: reqwest::Error, url: &str) -> TransferError {
    if error.is_connect() && is_local_service_url(url) {
        return TransferError::LocalServiceDown {
            url: url.to_string(),
            message: error.to_string(),
        };
    }
    if error.is_connect() {
        return TransferError::Unreachable {
            url: url.to_string(),
            message: error.to_string(),
        };
    }
    if error.is_timeout() {
        return TransferError::Timeout {
            url: url.to_string(),
            message: error.to_string(),
        };
    }
    if let Some(status) = error.status() {
        return TransferError::Status {
            url: url.to_string(),
            status,
        };
    }
    TransferError::Other {
        url: url.to_string(),
        message: error.to_string(),
    }
}
