// =============================================================================
// GOOGLE MODULE
// =============================================================================
//
// Everything that talks to Google: OAuth (consent + token file) and the
// Drive/Sheets REST clients behind the core's `DriveApi` and `SheetsApi`.
//
// **Setup:**
// 1. Create an OAuth client of type "Desktop app" in the Google Cloud console
//    and enable the Drive and Sheets APIs for its project.
// 2. Save the downloaded JSON as `gcp-oauth.keys.json` in the config directory
//    (or point `DRIVE_SUMMARY_CLIENT_SECRET_FILE` at it).
// 3. Run the `auth` command once. The token lands in `token.json` next to it.

mod api_request;
pub mod consent_flow;
pub mod credential_store;
pub mod drive_client;
pub mod sheets_client;

pub use credential_store::FileCredentialStore;
pub use drive_client::GoogleDriveClient;
pub use sheets_client::GoogleSheetsClient;
