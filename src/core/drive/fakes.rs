// In-memory Drive and Sheets used by the core tests.
// They record every call so tests can assert which lookups happened.

use super::drive_models::{ApiError, DriveApi, RemoteFile, SheetsApi};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct FakeDrive {
    files: Vec<RemoteFile>,
    contents: HashMap<String, Vec<u8>>,
    exports: HashMap<String, Vec<u8>>,
    fail_all: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, id: &str, name: &str, mime_type: &str) -> Self {
        self.files.push(RemoteFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: mime_type.to_string(),
        });
        self
    }

    pub fn with_content(mut self, id: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.contents.insert(id.to_string(), bytes.into());
        self
    }

    pub fn with_export(mut self, id: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.exports.insert(id.to_string(), bytes.into());
        self
    }

    /// Every call answers with a transport error.
    pub fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call);
        if self.fail_all {
            return Err(ApiError::Transport("drive unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn get_file(&self, file_id: &str) -> Result<RemoteFile, ApiError> {
        self.record(format!("get:{}", file_id))?;
        self.files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<RemoteFile>, ApiError> {
        self.record(format!("find:{}", name))?;
        Ok(self.files.iter().filter(|f| f.name == name).cloned().collect())
    }

    async fn list_files(&self) -> Result<Vec<RemoteFile>, ApiError> {
        self.record("list".to_string())?;
        Ok(self.files.clone())
    }

    async fn download(&self, file_id: &str) -> Result<Vec<u8>, ApiError> {
        self.record(format!("download:{}", file_id))?;
        self.contents.get(file_id).cloned().ok_or(ApiError::NotFound)
    }

    async fn export(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>, ApiError> {
        self.record(format!("export:{}:{}", file_id, mime_type))?;
        self.exports.get(file_id).cloned().ok_or(ApiError::NotFound)
    }
}

type Sheet = (String, Vec<Vec<String>>);

#[derive(Default)]
pub struct FakeSheets {
    spreadsheets: HashMap<String, Vec<Sheet>>,
}

impl FakeSheets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, spreadsheet_id: &str, title: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.spreadsheets
            .entry(spreadsheet_id.to_string())
            .or_default()
            .push((title.to_string(), rows));
        self
    }
}

#[async_trait]
impl SheetsApi for FakeSheets {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, ApiError> {
        self.spreadsheets
            .get(spreadsheet_id)
            .map(|sheets| sheets.iter().map(|(title, _)| title.clone()).collect())
            .ok_or(ApiError::NotFound)
    }

    async fn sheet_values(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        self.spreadsheets
            .get(spreadsheet_id)
            .and_then(|sheets| sheets.iter().find(|(title, _)| title == sheet_title))
            .map(|(_, rows)| rows.clone())
            .ok_or(ApiError::NotFound)
    }
}
