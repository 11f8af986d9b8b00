// =============================================================================
// GOOGLE DRIVE v3 CLIENT
// =============================================================================
//
// Read-only Drive access: metadata by ID, search by exact name, first-page
// listing, raw download and export of Google-native files.

use super::api_request::{api_url, get_bytes, get_json};
use crate::core::auth::TokenSource;
use crate::core::drive::{ApiError, DriveApi, RemoteFile};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

const FILE_FIELDS: &str = "id,name,mimeType";
const LIST_FIELDS: &str = "files(id,name,mimeType)";
const LIST_PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<RemoteFile>,
}

/// Escapes a value for use inside a single-quoted Drive query literal.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

pub struct GoogleDriveClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleDriveClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }

    fn files_url(&self, segments: &[&str]) -> Result<reqwest::Url, ApiError> {
        let mut path = vec!["drive", "v3", "files"];
        path.extend_from_slice(segments);
        api_url(&self.base_url, &path)
    }

    async fn search(&self, query: Option<&str>) -> Result<Vec<RemoteFile>, ApiError> {
        let mut url = self.files_url(&[])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(q) = query {
                pairs.append_pair("q", q);
            }
            pairs
                .append_pair("spaces", "drive")
                .append_pair("pageSize", LIST_PAGE_SIZE)
                .append_pair("fields", LIST_FIELDS);
        }

        let list: FileList = get_json(&self.client, self.tokens.as_ref(), url).await?;
        Ok(list.files)
    }
}

#[async_trait]
impl DriveApi for GoogleDriveClient {
    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, ApiError> {
        let mut url = self.files_url(&[file_id])?;
        url.query_pairs_mut().append_pair("fields", FILE_FIELDS);
        get_json(&self.client, self.tokens.as_ref(), url).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteFile>, ApiError> {
        let query = format!("name = '{}'", escape_query_value(name));
        self.search(Some(&query)).await
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, ApiError> {
        self.search(None).await
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, ApiError> {
        let mut url = self.files_url(&[file_id])?;
        url.query_pairs_mut().append_pair("alt", "media");
        get_bytes(&self.client, self.tokens.as_ref(), url).await
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, ApiError> {
        let mut url = self.files_url(&[file_id, "export"])?;
        url.query_pairs_mut().append_pair("mimeType", mime_type);
        get_bytes(&self.client, self.tokens.as_ref(), url).await
    }
}
