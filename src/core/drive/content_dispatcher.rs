// Extraction dispatch: one resolved file in, its plain text out.
//
// The declared MIME type alone decides the route:
//
// | format        | fetch                  | extractor        |
// |---------------|------------------------|------------------|
// | text/plain    | download               | UTF-8 decode     |
// | PDF           | download               | `pdf_to_text`    |
// | Google Doc    | export as DOCX         | `docx_to_text`   |
// | Google Sheet  | Sheets API, per sheet  | `append_rows`    |
// | anything else | -                      | UnsupportedFormat|
//
// PDF and DOCX parsing runs on tokio's blocking pool.

use super::drive_models::{
    ApiError, DriveApi, DriveError, ExtractorKind, FileFormat, RemoteFile, SheetsApi, MIME_DOCX,
};
use super::extractors;
use std::sync::Arc;

pub struct ContentDispatcher<D: DriveApi, S: SheetsApi> {
    drive: Arc<D>,
    sheets: Arc<S>,
}

impl<D: DriveApi, S: SheetsApi> ContentDispatcher<D, S> {
    pub fn new(drive: Arc<D>, sheets: Arc<S>) -> Self {
        Self { drive, sheets }
    }

    pub async fn extract(&self, file: &RemoteFile) -> Result<String, DriveError> {
        tracing::info!(
            file_name = %file.name,
            mime = %file.mime_type,
            "Extracting file content"
        );

        match file.format() {
            FileFormat::PlainText => {
                let bytes = self.drive.download(&file.id).await?;
                String::from_utf8(bytes).map_err(|e| DriveError::Retrieval(e.to_string()))
            }
            FileFormat::Pdf => {
                let bytes = self.drive.download(&file.id).await?;
                run_extractor(ExtractorKind::Pdf, move || extractors::pdf_to_text(&bytes)).await
            }
            FileFormat::GoogleDoc => {
                let bytes = self.drive.export(&file.id, MIME_DOCX).await?;
                run_extractor(ExtractorKind::Docx, move || extractors::docx_to_text(&bytes)).await
            }
            FileFormat::GoogleSheet => self.extract_spreadsheet(&file.id).await,
            FileFormat::Other(mime) => Err(DriveError::UnsupportedFormat(mime)),
        }
    }

    /// Every sheet in order; any failure along the way is a Sheets extraction error.
    async fn extract_spreadsheet(&self, spreadsheet_id: &str) -> Result<String, DriveError> {
        let titles = self
            .sheets
            .sheet_titles(spreadsheet_id)
            .await
            .map_err(sheets_error)?;

        let mut text = String::new();
        for title in &titles {
            let rows = self
                .sheets
                .sheet_values(spreadsheet_id, title)
                .await
                .map_err(sheets_error)?;
            tracing::debug!(sheet = %title, rows = rows.len(), "Fetched sheet values");
            extractors::append_rows(&rows, &mut text);
        }

        Ok(text)
    }
}

fn sheets_error(err: ApiError) -> DriveError {
    match err {
        ApiError::Auth(e) => DriveError::Auth(e),
        other => DriveError::extraction(ExtractorKind::Sheets, other),
    }
}

/// Runs a blocking extractor off the async workers.
/// A panic inside the parser is reported like any other extraction failure.
async fn run_extractor<F>(kind: ExtractorKind, extract: F) -> Result<String, DriveError>
where
    F: FnOnce() -> Result<String, String> + Send + 'static,
{
    match tokio::task::spawn_blocking(extract).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(message)) => Err(DriveError::extraction(kind, message)),
        Err(join_error) => Err(DriveError::extraction(kind, join_error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::drive::drive_models::{MIME_GOOGLE_DOC, MIME_GOOGLE_SHEET};
    use crate::core::drive::fakes::{FakeDrive, FakeSheets};
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn file(id: &str, mime: &str) -> RemoteFile {
        RemoteFile {
            id: id.to_string(),
            name: format!("{}-name", id),
            mime_type: mime.to_string(),
        }
    }

    fn dispatcher(
        drive: FakeDrive,
        sheets: FakeSheets,
    ) -> ContentDispatcher<FakeDrive, FakeSheets> {
        ContentDispatcher::new(Arc::new(drive), Arc::new(sheets))
    }

    #[tokio::test]
    async fn plain_text_is_returned_unchanged() {
        let content = "héllo\n  wörld\t\n";
        let d = dispatcher(
            FakeDrive::new().with_content("t1", content.as_bytes().to_vec()),
            FakeSheets::new(),
        );

        let text = d.extract(&file("t1", "text/plain")).await.unwrap();
        assert_eq!(text, content);
    }

    #[tokio::test]
    async fn invalid_utf8_is_a_retrieval_error() {
        let d = dispatcher(
            FakeDrive::new().with_content("t1", vec![0xff, 0xfe, 0x00]),
            FakeSheets::new(),
        );

        let err = d.extract(&file("t1", "text/plain")).await.unwrap_err();
        assert!(matches!(err, DriveError::Retrieval(_)));
    }

    #[tokio::test]
    async fn spreadsheet_sheets_are_concatenated_in_order() {
        let d = dispatcher(
            FakeDrive::new(),
            FakeSheets::new()
                .with_sheet("s1", "A", &[&["x", "1"], &["y", "2"]])
                .with_sheet("s1", "B", &[&["z", "3"]]),
        );

        let text = d.extract(&file("s1", MIME_GOOGLE_SHEET)).await.unwrap();
        assert_eq!(text, "x 1\ny 2\nz 3\n");
    }

    #[tokio::test]
    async fn spreadsheet_failures_name_the_sheets_extractor() {
        let d = dispatcher(FakeDrive::new(), FakeSheets::new());

        let err = d.extract(&file("missing", MIME_GOOGLE_SHEET)).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error extracting text from Google Sheets:"));
    }

    #[tokio::test]
    async fn google_docs_are_exported_as_docx() {
        let xml = r#"<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>Exported body</w:t></w:r></w:p></w:body></w:document>"#;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        let docx = writer.finish().unwrap().into_inner();

        let drive = FakeDrive::new().with_export("d1", docx);
        let drive = Arc::new(drive);
        let d = ContentDispatcher::new(Arc::clone(&drive), Arc::new(FakeSheets::new()));

        let text = d.extract(&file("d1", MIME_GOOGLE_DOC)).await.unwrap();
        assert_eq!(text, "Exported body\n");
        assert_eq!(drive.calls(), vec![format!("export:d1:{}", MIME_DOCX)]);
    }

    #[tokio::test]
    async fn broken_pdf_is_a_pdf_extraction_error() {
        let d = dispatcher(
            FakeDrive::new().with_content("p1", b"definitely not a pdf".to_vec()),
            FakeSheets::new(),
        );

        let err = d.extract(&file("p1", "application/pdf")).await.unwrap_err();
        assert!(matches!(
            err,
            DriveError::Extraction {
                kind: ExtractorKind::Pdf,
                ..
            }
        ));
        assert!(err.to_string().starts_with("Error extracting text from PDF:"));
    }

    #[tokio::test]
    async fn unknown_types_are_rejected_without_downloading() {
        let drive = Arc::new(FakeDrive::new());
        let d = ContentDispatcher::new(Arc::clone(&drive), Arc::new(FakeSheets::new()));

        let err = d.extract(&file("i1", "image/png")).await.unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: image/png");
        assert!(drive.calls().is_empty());
    }

    #[tokio::test]
    async fn download_failures_are_retrieval_errors() {
        let d = dispatcher(FakeDrive::new().failing(), FakeSheets::new());

        let err = d.extract(&file("p1", "application/pdf")).await.unwrap_err();
        assert!(err.to_string().starts_with("Error retrieving file:"));
    }
}
