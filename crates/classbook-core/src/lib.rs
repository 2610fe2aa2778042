//! classbook-core: data model, session, entry form and views.
//!
//! This crate holds everything a classbook front end needs except the
//! transport: the `JournalApi` trait is implemented over HTTP by
//! `classbook-client` and in memory by [`mock::MockApi`].

pub mod error;
pub mod form;
pub mod mock;
pub mod model;
pub mod services;
pub mod session;
pub mod traits;
pub mod views;

pub use error::{ApiError, FormError, SubmitError};
pub use session::{AuthOutcome, AuthSession};
pub use traits::{JournalApi, MemoryTokenStore, TokenStore};
