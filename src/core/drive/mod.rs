// Drive domain: finding a file and turning it into plain text.
//
// **Layout:**
// - `drive_models` - RemoteFile, FileFormat, errors and the API ports
// - `extractors` - stateless byte -> text converters (PDF, DOCX, sheet rows)
// - `file_resolver` - query classification and name/ID lookup
// - `content_dispatcher` - routes a resolved file to the right extractor
// - `drive_service` - resolve + extract in one call for the front-ends

pub mod content_dispatcher;
pub mod drive_models;
pub mod drive_service;
pub mod extractors;
pub mod file_resolver;

#[cfg(test)]
pub mod fakes;

pub use drive_models::{ApiError, DriveApi, RemoteFile, SheetsApi};
pub use drive_service::DriveService;
