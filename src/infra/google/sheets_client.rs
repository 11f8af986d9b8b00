// Google Sheets v4: sheet titles and per-sheet values.

use super::api_request::{api_url, get_json};
use crate::core::auth::TokenSource;
use crate::core::drive::{ApiError, SheetsApi};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    /// Absent when the sheet is empty.
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// A1 range covering a whole sheet. Titles are always quoted so names with
/// spaces or punctuation (or that look like cell references) stay intact.
pub fn sheet_range(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct GoogleSheetsClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl GoogleSheetsClient {
    pub fn new(base_url: impl Into<String>, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            tokens,
        }
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn sheet_titles(&self, spreadsheet_id: &str) -> Result<Vec<String>, ApiError> {
        let mut url = api_url(&self.base_url, &["v4", "spreadsheets", spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "sheets.properties.title");

        let spreadsheet: Spreadsheet = get_json(&self.client, self.tokens.as_ref(), url).await?;
        Ok(spreadsheet
            .sheets
            .into_iter()
            .map(|s| s.properties.title)
            .collect())
    }

    async fn sheet_values(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
    ) -> Result<Vec<Vec<String>>, ApiError> {
        let range = sheet_range(sheet_title);
        let url = api_url(
            &self.base_url,
            &["v4", "spreadsheets", spreadsheet_id, "values", &range],
        )?;

        let values: ValueRange = get_json(&self.client, self.tokens.as_ref(), url).await?;
        Ok(values
            .values
            .iter()
            .map(|row| row.iter().map(cell_text).collect())
            .collect())
    }
}
