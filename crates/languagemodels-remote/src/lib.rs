//! Remote services: hosted instruction completion and encyclopedia lookup.

mod error;
pub mod textsynth;
pub mod wikipedia;

#[cfg(any(test, feature = "test-util"))]
pub mod stub;

pub use error::RemoteError;
pub use textsynth::{Completion, TextSynthClient};
pub use wikipedia::WikipediaClient;

/// Sent on every request; Wikimedia rejects anonymous clients.
pub const USER_AGENT: &str = concat!("languagemodels/", env!("CARGO_PKG_VERSION"));
