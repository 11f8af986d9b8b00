use super::content_dispatcher::ContentDispatcher;
use super::drive_models::{DriveApi, DriveError, RemoteFile, SheetsApi};
use super::file_resolver::FileResolver;
use std::sync::Arc;

/// Query in, file text out. Resolution and extraction behind one call.
pub struct DriveService<D: DriveApi, S: SheetsApi> {
    resolver: FileResolver<D>,
    dispatcher: ContentDispatcher<D, S>,
}

impl<D: DriveApi, S: SheetsApi> DriveService<D, S> {
    pub fn new(drive: Arc<D>, sheets: Arc<S>) -> Self {
        Self {
            resolver: FileResolver::new(Arc::clone(&drive)),
            dispatcher: ContentDispatcher::new(drive, sheets),
        }
    }

    pub async fn fetch_content(&self, query: &str) -> Result<(RemoteFile, String), DriveError> {
        let file = self.resolver.resolve(query).await?;
        tracing::info!(
            file_id = %file.id,
            file_name = %file.name,
            mime = %file.mime_type,
            "Found file"
        );

        let text = self.dispatcher.extract(&file).await?;
        Ok((file, text))
    }
}
