//! # Tessera Repo
//!
//! Multi-repository resolution engine for Tessera Config.
//!
//! A request `(application, profiles, label)` is routed to one of many
//! configured repositories, that repository's working copy is brought to
//! the label on demand, and the matching property files are read from it.
//!
//! ## Features
//!
//! - Descriptor selection by application and profile glob patterns, with
//!   `{application}`, `{profile}` and `{label}` placeholders in URIs
//! - Credential rules (named, exact URI, prefix or glob) bound once per remote
//! - Git and Subversion working copies behind the [`VersionControl`] trait
//! - One lock per working copy: parallel reads, exclusive synchronization,
//!   coalesced concurrent syncs
//! - Property files in YAML, JSON and `.properties` formats, with secrets
//!   and overrides placed ahead of them
//!
//! ## Example
//!
//! ```no_run
//! use tessera_repo::{ConfigQuery, ConfigSource, MultiRepositoryResolver, Settings};
//!
//! # async fn run(settings: Settings) -> Result<(), tessera_repo::ResolveError> {
//! let resolver = MultiRepositoryResolver::new(settings)?;
//!
//! let query = ConfigQuery::parse("svc1", "dev", Some("main"))?;
//! let env = resolver.fetch(&query).await?;
//! for source in env.property_sources() {
//!     println!("{}", source.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod credentials;
pub mod descriptor;
pub mod error;
pub mod reader;
pub mod resolver;
pub mod secrets;
pub mod settings;
pub mod source;
pub mod sync;
pub mod vcs;

// Re-exports
pub use credentials::{BoundTransport, CredentialBinder, CredentialRules, CredentialSettings, Credentials, TransportSettings};
pub use descriptor::{DescriptorStore, InclusionPattern, LabelSource, RepositoryDescriptor, ResolvedLabel};
pub use error::{ErrorClass, ResolveError};
pub use reader::{LoadOutcome, PropertySourceAggregator};
pub use resolver::{MultiRepositoryResolver, ResolverBuilder};
pub use secrets::{SecretsBackend, StaticSecrets};
pub use settings::{DescriptorSettings, SecretsSettings, Settings, StalePolicy};
pub use source::{ConfigQuery, ConfigSource, Environment};
pub use sync::{CopyStatus, SyncState, SyncTarget, Synchronizer, WorkingCopy};
pub use vcs::{BackendKind, GitClient, SvnCli, VcsError, VersionControl};

// Re-export tessera_core for consumers
pub use tessera_core;
