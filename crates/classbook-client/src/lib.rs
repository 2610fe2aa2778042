//! classbook-client: HTTP transport for the journal API.
//!
//! Implements `JournalApi` over reqwest, persists the bearer token to a
//! session file, and loads client configuration from TOML.

pub mod config;
pub mod http;
pub mod store;

pub use config::{create_client, load_config_from, ClientConfig};
pub use http::HttpApi;
pub use store::FileTokenStore;
