// The infra module contains implementations of core traits.
// Each external service gets its own submodule.

#[path = "google/mod.rs"]
pub mod google;

#[path = "ollama/ollama_client.rs"]
pub mod ollama;
