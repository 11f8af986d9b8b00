// File resolution: user text in, exactly one RemoteFile (or NotFound) out.
//
// **Lookup order:**
// 1. Identifier-shaped queries (and Drive links) go straight to a metadata fetch.
// 2. Everything else is trimmed and searched by exact name.
// 3. No hit? Spaces become underscores and we search once more.
// 4. Still nothing -> NotFound with the query exactly as the user typed it.
//
// When several files share a name, the first one the service lists wins.
// The service decides that order; we don't sort or disambiguate.

use super::drive_models::{ApiError, DriveApi, DriveError, RemoteFile};
use std::sync::Arc;

/// Length of a Drive file identifier as issued for regular files.
///
/// A query of exactly this many alphanumeric (any script) or `-` characters
/// is treated as an identifier. Known ambiguity: a file whose *name* happens to
/// have that shape can only be reached through a link, never by name.
pub const FILE_ID_LENGTH: usize = 33;

/// How a raw query will be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryKind {
    /// Fetch metadata for this identifier.
    FileId(String),
    /// Search by this (already trimmed) name.
    Name(String),
}

/// Decides between identifier and name lookup.
///
/// The identifier-shape check runs on the untrimmed query, so surrounding
/// whitespace always means "name".
pub fn classify_query(query: &str) -> QueryKind {
    if looks_like_file_id(query) {
        return QueryKind::FileId(query.to_string());
    }

    let trimmed = query.trim();
    if let Some(id) = file_id_from_link(trimmed) {
        return QueryKind::FileId(id.to_string());
    }

    QueryKind::Name(trimmed.to_string())
}

pub fn looks_like_file_id(candidate: &str) -> bool {
    candidate.chars().count() == FILE_ID_LENGTH
        && candidate
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-')
}

/// Pulls the identifier out of a Drive, Docs or Sheets link.
///
/// Handles `.../d/<id>/...` and `...?id=<id>` style URLs.
fn file_id_from_link(query: &str) -> Option<&str> {
    if !query.starts_with("https://") && !query.starts_with("http://") {
        return None;
    }
    if !query.contains("drive.google.com") && !query.contains("docs.google.com") {
        return None;
    }

    let is_id_char = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';

    if let Some(start) = query.find("/d/") {
        let after = &query[start + 3..];
        let end = after.find(|c: char| !is_id_char(c)).unwrap_or(after.len());
        let id = &after[..end];
        if !id.is_empty() {
            return Some(id);
        }
    }

    if let Some(start) = query.find("id=") {
        let after = &query[start + 3..];
        let end = after.find(|c: char| !is_id_char(c)).unwrap_or(after.len());
        let id = &after[..end];
        if !id.is_empty() {
            return Some(id);
        }
    }

    None
}

/// The fallback name tried after an exact match fails.
pub fn underscore_normalized(name: &str) -> String {
    name.replace(' ', "_").trim().to_string()
}

pub struct FileResolver<D: DriveApi> {
    drive: Arc<D>,
}

impl<D: DriveApi> FileResolver<D> {
    pub fn new(drive: Arc<D>) -> Self {
        Self { drive }
    }

    pub async fn resolve(&self, query: &str) -> Result<RemoteFile, DriveError> {
        match classify_query(query) {
            QueryKind::FileId(id) => {
                tracing::info!(file_id = %id, "Treating input as file ID");
                match self.drive.get_file(&id).await {
                    Ok(file) => Ok(file),
                    Err(ApiError::NotFound) => Err(DriveError::NotFound(query.to_string())),
                    Err(e) => Err(e.into()),
                }
            }
            QueryKind::Name(name) => self.resolve_by_name(query, &name).await,
        }
    }

    async fn resolve_by_name(&self, query: &str, name: &str) -> Result<RemoteFile, DriveError> {
        let exact = self.drive.find_by_name(name).await?;
        tracing::info!(file_name = %name, matches = exact.len(), "Exact name search finished");
        if let Some(file) = exact.into_iter().next() {
            return Ok(file);
        }

        let normalized = underscore_normalized(name);
        if normalized != name {
            let matches = self.drive.find_by_name(&normalized).await?;
            tracing::info!(
                file_name = %normalized,
                matches = matches.len(),
                "Normalized name search finished"
            );
            if let Some(file) = matches.into_iter().next() {
                return Ok(file);
            }
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            self.log_visible_files().await;
        }

        Err(DriveError::NotFound(query.to_string()))
    }

    /// Dumps what the credential can actually see, to debug a miss.
    async fn log_visible_files(&self) {
        match self.drive.list_files().await {
            Ok(files) => {
                for file in &files {
                    tracing::debug!(
                        file_id = %file.id,
                        file_name = %file.name,
                        mime = %file.mime_type,
                        "Visible file"
                    );
                }
                tracing::debug!(count = files.len(), "Listed visible Drive files");
            }
            Err(e) => tracing::debug!("Could not list Drive files: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::drive::fakes::FakeDrive;

    const ID: &str = "1AbCdEfGhIjKlMnOpQrStUvWxYz-01234";

    #[test]
    fn thirty_three_id_chars_classify_as_id() {
        assert_eq!(ID.len(), FILE_ID_LENGTH);
        assert_eq!(classify_query(ID), QueryKind::FileId(ID.to_string()));
    }

    #[test]
    fn non_ascii_letters_and_digits_count_as_id_chars() {
        let accented = format!("{}1", "é".repeat(32));
        assert_eq!(
            classify_query(&accented),
            QueryKind::FileId(accented.clone())
        );

        // length is counted in characters, not bytes
        let mixed = format!("Ünïcødé-{}", "٣".repeat(25));
        assert_eq!(mixed.chars().count(), FILE_ID_LENGTH);
        assert!(looks_like_file_id(&mixed));

        // punctuation outside `-` still rules it out
        let dotted = format!("{}.", "é".repeat(32));
        assert!(matches!(classify_query(&dotted), QueryKind::Name(_)));
    }

    #[test]
    fn near_misses_classify_as_names() {
        // one short
        assert!(matches!(classify_query(&ID[1..]), QueryKind::Name(_)));
        // underscore is not an id character here
        let underscored = ID.replace('-', "_");
        assert!(matches!(classify_query(&underscored), QueryKind::Name(_)));
        // surrounding whitespace means name, and the name gets trimmed
        assert_eq!(
            classify_query(&format!(" {} ", ID)),
            QueryKind::Name(ID.to_string())
        );
    }

    #[test]
    fn drive_links_classify_as_ids() {
        assert_eq!(
            classify_query("https://docs.google.com/document/d/1abc_DEF-2/edit?usp=sharing"),
            QueryKind::FileId("1abc_DEF-2".to_string())
        );
        assert_eq!(
            classify_query("https://drive.google.com/open?id=0B7xyz"),
            QueryKind::FileId("0B7xyz".to_string())
        );
        assert!(matches!(
            classify_query("https://example.com/d/abc"),
            QueryKind::Name(_)
        ));
    }

    #[test]
    fn normalization_replaces_spaces() {
        assert_eq!(underscore_normalized("Q3 sales report"), "Q3_sales_report");
    }

    #[tokio::test]
    async fn id_queries_never_search_by_name() {
        let drive = Arc::new(FakeDrive::new().with_file(ID, "whatever.txt", "text/plain"));
        let resolver = FileResolver::new(Arc::clone(&drive));

        let file = resolver.resolve(ID).await.unwrap();
        assert_eq!(file.name, "whatever.txt");
        assert_eq!(drive.calls(), vec![format!("get:{}", ID)]);
    }

    #[tokio::test]
    async fn missing_id_is_not_found_with_the_query() {
        let drive = Arc::new(FakeDrive::new());
        let resolver = FileResolver::new(Arc::clone(&drive));

        let err = resolver.resolve(ID).await.unwrap_err();
        assert!(matches!(err, DriveError::NotFound(ref q) if q == ID));
        assert!(drive.calls().iter().all(|c| !c.starts_with("find:")));
    }

    #[tokio::test]
    async fn exact_match_wins_and_first_entry_is_taken() {
        let drive = Arc::new(
            FakeDrive::new()
                .with_file("id-1", "notes.txt", "text/plain")
                .with_file("id-2", "notes.txt", "text/plain"),
        );
        let resolver = FileResolver::new(Arc::clone(&drive));

        let file = resolver.resolve("  notes.txt ").await.unwrap();
        assert_eq!(file.id, "id-1");
        assert_eq!(drive.calls(), vec!["find:notes.txt".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_underscored_name() {
        let drive = Arc::new(FakeDrive::new().with_file("id-9", "q3_sales_report", "text/plain"));
        let resolver = FileResolver::new(Arc::clone(&drive));

        let file = resolver.resolve("q3 sales report").await.unwrap();
        assert_eq!(file.id, "id-9");
        assert_eq!(
            drive.calls(),
            vec![
                "find:q3 sales report".to_string(),
                "find:q3_sales_report".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn unknown_name_reports_the_original_query() {
        let drive = Arc::new(FakeDrive::new().with_file("id-1", "other", "text/plain"));
        let resolver = FileResolver::new(drive);

        let err = resolver.resolve(" my missing file ").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "File ' my missing file ' not found in Google Drive."
        );
    }

    #[tokio::test]
    async fn search_failures_are_retrieval_errors() {
        let drive = Arc::new(FakeDrive::new().failing());
        let resolver = FileResolver::new(drive);

        let err = resolver.resolve("anything").await.unwrap_err();
        assert!(matches!(err, DriveError::Retrieval(_)));
    }
}
