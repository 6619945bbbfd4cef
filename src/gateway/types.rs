// src/gateway/types.rs

use bytes::Bytes;
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A configured database connection on the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseServer {
    pub id: i64,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    Mysql,
    Postgresql,
    Oracle,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Mysql => "mysql",
            Self::Postgresql => "postgresql",
            Self::Oracle => "oracle",
        })
    }
}

/// Outcome of a query or import as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub server: String,
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<Value>,
    /// Server-side execution time, seconds as a string.
    #[serde(default)]
    pub time: Option<String>,
}

/// Target format for `/export`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Excel,
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "excel" => Ok(Self::Excel),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(format!(
                "unknown export format '{other}', expected excel, json or csv"
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excel => "excel",
            Self::Json => "json",
            Self::Csv => "csv",
        })
    }
}

/// File content handed to the multipart upload operations.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk; the multipart file name is taken from the path.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::new(file_name, bytes))
    }

    pub(crate) fn into_part(self) -> Result<multipart::Part, reqwest::Error> {
        let mime = mime_guess::from_path(&self.file_name).first_or_octet_stream();
        multipart::Part::bytes(self.bytes.to_vec())
            .file_name(self.file_name)
            .mime_str(mime.essence_str())
    }
}

/// Full `/export` response: the opaque payload plus the metadata headers the
/// caller needs to persist it unmodified.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub content: Bytes,
    pub mime: String,
    /// Suggested file name from the `Content-Disposition` header.
    pub filename: Option<String>,
}

/// Column headers and sample rows returned by `/import/preview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
