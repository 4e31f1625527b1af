//! Update token issuance.

mod provider;
mod sts;

pub use provider::{CredentialError, TokenProvider};
pub use sts::HttpTokenProvider;
