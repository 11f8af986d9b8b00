// The core module contains all business logic.
// Nothing in here knows about Discord, HTTP or the filesystem.

#[path = "auth/credential.rs"]
pub mod auth;

#[path = "drive/mod.rs"]
pub mod drive;

#[path = "summary/summary_service.rs"]
pub mod summary;

#[path = "assistant/assistant_service.rs"]
pub mod assistant;
