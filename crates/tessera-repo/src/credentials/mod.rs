//! Per-remote credentials and transport settings.

mod binder;
mod rules;
mod transport;

pub use binder::CredentialBinder;
pub use rules::{CredentialRules, CredentialSettings, Credentials};
pub use transport::{BoundTransport, TransportSettings};
