use crate::core::auth::AuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MIME_PLAIN_TEXT: &str = "text/plain";
pub const MIME_PDF: &str = "application/pdf";
pub const MIME_GOOGLE_DOC: &str = "application/vnd.google-apps.document";
pub const MIME_GOOGLE_SHEET: &str = "application/vnd.google-apps.spreadsheet";
/// Google Docs are exported in this format before text extraction.
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ============================================================================
// DOMAIN MODELS
// ============================================================================

/// A file hosted on Google Drive, as returned by a metadata lookup.
/// Fetched fresh for every request; nothing is cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl RemoteFile {
    pub fn format(&self) -> FileFormat {
        FileFormat::from_mime(&self.mime_type)
    }
}

/// Typed view of the MIME types we know how to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileFormat {
    PlainText,
    Pdf,
    GoogleDoc,
    GoogleSheet,
    Other(String),
}

impl FileFormat {
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            MIME_PLAIN_TEXT => FileFormat::PlainText,
            MIME_PDF => FileFormat::Pdf,
            MIME_GOOGLE_DOC => FileFormat::GoogleDoc,
            MIME_GOOGLE_SHEET => FileFormat::GoogleSheet,
            other => FileFormat::Other(other.to_string()),
        }
    }
}

/// Which extractor produced an extraction failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Pdf,
    Docx,
    Sheets,
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ExtractorKind::Pdf => "PDF",
            ExtractorKind::Docx => "DOCX",
            ExtractorKind::Sheets => "Google Sheets",
        };
        f.write_str(label)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by the Drive/Sheets API clients.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The remote service answered 404.
    #[error("resource not found")]
    NotFound,

    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Errors a conversation turn can report while fetching file content.
/// The `Display` text is exactly what the user gets to see.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Nothing matched. Carries the query as the user typed it.
    #[error("File '{0}' not found in Google Drive.")]
    NotFound(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Error extracting text from {kind}: {message}")]
    Extraction { kind: ExtractorKind, message: String },

    #[error("Error retrieving file: {0}")]
    Retrieval(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl DriveError {
    pub fn extraction(kind: ExtractorKind, message: impl fmt::Display) -> Self {
        DriveError::Extraction {
            kind,
            message: message.to_string(),
        }
    }
}

impl From<ApiError> for DriveError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(e) => DriveError::Auth(e),
            other => DriveError::Retrieval(other.to_string()),
        }
    }
}

// ============================================================================
// API PORTS
// ============================================================================
// The core describes what it needs from Google; `infra::google` provides
// the reqwest-backed implementations and tests plug in in-memory fakes.

#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Metadata for one file. A missing file is `ApiError::NotFound`.
    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, ApiError>;

    /// All files whose name equals `name` exactly, in service order.
    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteFile>, ApiError>;

    /// First page of every visible file. Only used for diagnostics.
    async fn list_files(&self) -> Result<Vec<RemoteFile>, ApiError>;

    /// Raw bytes of a binary/text file.
    async fn download(&self, file_id: &str) -> Result<Vec<u8>, ApiError>;

    /// A Google-native file converted to `mime_type`.
    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, ApiError>;
}

#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Sheet (tab) titles in spreadsheet order.
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, ApiError>;

    /// Every populated row of one sheet, cells rendered as strings.
    async fn sheet_values(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
    ) -> Result<Vec<Vec<String>>, ApiError>;
}
