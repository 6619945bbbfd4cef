// src/gateway/mod.rs
// Request Gateway: the backend's network contract in one place. JSON calls,
// the two multipart uploads and the binary export download all go through
// ApiClient.

mod types;

pub use types::{
    DatabaseServer, ExportFormat, ExportPayload, FilePreview, FileUpload, QueryResult, ServerType,
};

use crate::config::CONFIG;
use crate::error::GatewayError;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{multipart, Client, Response};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Sink for failed gateway calls.
///
/// Injected so that a failure the caller chooses not to escalate still shows
/// up in user-visible state instead of only on the diagnostic channel. The
/// Operation Log implements this by appending an `error`-status entry.
pub trait FailureSink: Send + Sync {
    fn record_failure(&self, action: &str, message: &str);
}

/// Stateless client for the db_worker backend.
pub struct ApiClient {
    client: Client,
    base_url: String,
    failure_sink: Option<Arc<dyn FailureSink>>,
}

impl ApiClient {
    /// Build a client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Build a client against the configured backend host.
    pub fn from_config() -> Result<Self, GatewayError> {
        Self::with_timeout(CONFIG.full_host(), CONFIG.request_timeout_duration())
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            failure_sink: None,
        })
    }

    /// Attach a sink that records every failed call.
    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failure_sink = Some(sink);
        self
    }

    /// `GET /servers`: the backend's configured database connections.
    pub async fn list_servers(&self) -> Result<Vec<DatabaseServer>, GatewayError> {
        let result = async {
            debug!("GET {}/servers", self.base_url);
            let response = self.client.get(self.url("servers")).send().await?;
            let response = Self::check_status(response).await?;
            response
                .json::<Vec<DatabaseServer>>()
                .await
                .map_err(|source| GatewayError::Decode {
                    endpoint: "servers",
                    source,
                })
        }
        .await;

        self.settle("list servers", result)
    }

    /// `POST /execute`: run a query against the selected server.
    ///
    /// The backend expects the whole server descriptor, not just its id.
    pub async fn execute_query(
        &self,
        query: &str,
        selected_server: &DatabaseServer,
    ) -> Result<QueryResult, GatewayError> {
        let payload = serde_json::json!({
            "query": query,
            "selected_server": selected_server,
        });

        let result = async {
            debug!("POST {}/execute on '{}'", self.base_url, selected_server.name);
            let response = self
                .client
                .post(self.url("execute"))
                .json(&payload)
                .send()
                .await?;
            let response = Self::check_status(response).await?;
            response
                .json::<QueryResult>()
                .await
                .map_err(|source| GatewayError::Decode {
                    endpoint: "execute",
                    source,
                })
        }
        .await;

        self.settle("execute query", result)
    }

    /// `POST /import`: multipart upload of a file into a table.
    ///
    /// Field names are fixed by the backend contract: `upload_file`,
    /// `table_name`, `schema_name`, `server_id`.
    pub async fn import_file(
        &self,
        upload: FileUpload,
        table_name: &str,
        schema_name: &str,
        server_id: i64,
    ) -> Result<QueryResult, GatewayError> {
        let result = async {
            debug!(
                "POST {}/import '{}' into {}.{}",
                self.base_url, upload.file_name, schema_name, table_name
            );
            let form = multipart::Form::new()
                .part("upload_file", upload.into_part()?)
                .text("table_name", table_name.to_string())
                .text("schema_name", schema_name.to_string())
                .text("server_id", server_id.to_string());

            let response = self
                .client
                .post(self.url("import"))
                .multipart(form)
                .send()
                .await?;
            let response = Self::check_status(response).await?;
            response
                .json::<QueryResult>()
                .await
                .map_err(|source| GatewayError::Decode {
                    endpoint: "import",
                    source,
                })
        }
        .await;

        self.settle("import file", result)
    }

    /// `POST /export`: returns the full binary payload plus the metadata
    /// headers, so the caller can persist the bytes unmodified whatever the
    /// declared content type is.
    pub async fn export_data(
        &self,
        data: &Value,
        format: ExportFormat,
    ) -> Result<ExportPayload, GatewayError> {
        let payload = serde_json::json!({
            "data": data,
            "format": format,
        });

        let result = async {
            debug!("POST {}/export as {}", self.base_url, format);
            let response = self
                .client
                .post(self.url("export"))
                .json(&payload)
                .send()
                .await?;
            let response = Self::check_status(response).await?;

            let mime = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            let filename = response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_attachment_filename);
            let content = response.bytes().await?;

            Ok(ExportPayload {
                content,
                mime,
                filename,
            })
        }
        .await;

        self.settle("export data", result)
    }

    /// `POST /import/preview`: column headers and sample rows before a full
    /// import commits anything. The multipart field is named `file`.
    pub async fn preview_import_file(
        &self,
        upload: FileUpload,
    ) -> Result<FilePreview, GatewayError> {
        let result = async {
            debug!("POST {}/import/preview '{}'", self.base_url, upload.file_name);
            let form = multipart::Form::new().part("file", upload.into_part()?);

            let response = self
                .client
                .post(self.url("import/preview"))
                .multipart(form)
                .send()
                .await?;
            let response = Self::check_status(response).await?;
            response
                .json::<FilePreview>()
                .await
                .map_err(|source| GatewayError::Decode {
                    endpoint: "import/preview",
                    source,
                })
        }
        .await;

        self.settle("preview import file", result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-success response into a `Backend` error, extracting the
    /// backend's `{"detail": ...}` message when present.
    async fn check_status(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or(body);

        Err(GatewayError::Backend {
            status: status.as_u16(),
            detail,
        })
    }

    /// Report a failure to the injected sink, then hand the result back to
    /// the caller unchanged.
    fn settle<T>(
        &self,
        action: &str,
        result: Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        if let Err(err) = &result {
            error!("{action} failed: {err}");
            if let Some(sink) = &self.failure_sink {
                sink.record_failure(action, &err.to_string());
            }
        }
        result
    }
}

/// Pull `filename="..."` out of a Content-Disposition header value.
fn parse_attachment_filename(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|part| {
        part.strip_prefix("filename=")
            .map(|v| v.trim_matches('"').to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_doubled_slashes() {
        let client = ApiClient::new("http://localhost:5000/").unwrap();
        assert_eq!(client.url("/servers"), "http://localhost:5000/servers");
        assert_eq!(
            client.url("import/preview"),
            "http://localhost:5000/import/preview"
        );
    }

    #[test]
    fn parses_attachment_filename() {
        assert_eq!(
            parse_attachment_filename("attachment; filename=\"export_20240101.csv\""),
            Some("export_20240101.csv".to_string())
        );
        assert_eq!(
            parse_attachment_filename("attachment; filename=data.xlsx"),
            Some("data.xlsx".to_string())
        );
        assert_eq!(parse_attachment_filename("inline"), None);
    }

    #[test]
    fn export_format_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ExportFormat::Excel).unwrap(),
            "\"excel\""
        );
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("parquet".parse::<ExportFormat>().is_err());
    }
}
