//! Configuration source trait definition.

use async_trait::async_trait;

use super::{ConfigQuery, Environment};
use crate::error::ResolveError;

/// A source of configuration environments.
///
/// Front ends (the CLI, an HTTP layer) depend on this trait rather than on
/// a concrete resolver.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Resolves the environment for `query`.
    ///
    /// # Errors
    ///
    /// - `ResolveError::NoDescriptorMatched` if no repository answers the query
    /// - `ResolveError::RefNotFound` if the label does not exist
    /// - `ResolveError::RepositoryUnavailable` if the remote is not reachable
    async fn fetch(&self, query: &ConfigQuery) -> Result<Environment, ResolveError>;

    /// Reports the first repository whose last synchronization failed.
    async fn health_check(&self) -> Result<(), ResolveError>;

    /// Name used in logs.
    fn name(&self) -> &str;

    /// The label used when a query names none and the repository has no default.
    fn default_label(&self) -> &str {
        "main"
    }
}
