//! Authentication module
//!
//! Apaleo uses the OAuth2 client-credentials flow. A single `TokenProvider`
//! is built per run and shared by every stream, so the identity endpoint is
//! only hit when the cached credential is missing, expired or rejected.

mod provider;
mod types;

pub use provider::{TokenProvider, TokenProviderConfig};
pub use types::Credential;
