//! Multi-repository resolution.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_core::{ConfigMap, PropertySource};
use tracing::{debug, info, warn};

use crate::credentials::{CredentialBinder, CredentialRules};
use crate::descriptor::{DescriptorStore, RepositoryDescriptor, ResolvedLabel};
use crate::error::ResolveError;
use crate::reader::PropertySourceAggregator;
use crate::secrets::{SecretsBackend, StaticSecrets};
use crate::settings::Settings;
use crate::source::{ConfigQuery, ConfigSource, Environment};
use crate::sync::{CopyStatus, SyncOptions, SyncState, SyncTarget, Synchronizer, WorkingCopy};
use crate::vcs::{BackendKind, GitClient, SvnCli, VersionControl};

/// Name of the property source built from `settings.overrides`.
pub const OVERRIDES_SOURCE: &str = "overrides";

const DEFAULT_SECRETS_PREFIX: &str = "secret";

struct SecretsConfig {
    prefix: String,
    backend: Arc<dyn SecretsBackend>,
}

/// Serves configuration from many repositories.
///
/// A request is routed to the first descriptor whose patterns accept it,
/// the descriptor's remote is synchronized at the resolved label, and the
/// property files of the request are read from the resulting working copy.
///
/// # Example
///
/// ```no_run
/// use tessera_repo::{ConfigQuery, DescriptorSettings, MultiRepositoryResolver, Settings};
///
/// # async fn run() -> Result<(), tessera_repo::ResolveError> {
/// let settings = Settings::builder()
///     .basedir("/var/lib/tessera")
///     .repo(DescriptorSettings::new("team-a", "https://git.example.com/a.git").pattern("svc1"))
///     .repo(DescriptorSettings::new("shared", "https://git.example.com/shared.git"))
///     .build();
/// let resolver = MultiRepositoryResolver::builder(settings).build()?;
///
/// let env = resolver.find_one(&ConfigQuery::parse("svc1", "dev", None)?).await?;
/// println!("{} sources at {:?}", env.len(), env.version());
/// # Ok(())
/// # }
/// ```
pub struct MultiRepositoryResolver {
    store: DescriptorStore,
    binder: CredentialBinder,
    synchronizer: Synchronizer,
    backends: HashMap<BackendKind, Arc<dyn VersionControl>>,
    overrides: ConfigMap,
    secrets: Option<SecretsConfig>,
    default_label: String,
    /// One per working-copy identity requested and not discarded since.
    targets: Mutex<HashMap<String, Arc<SyncTarget>>>,
}

impl MultiRepositoryResolver {
    /// Creates a builder using `settings`.
    pub fn builder(settings: Settings) -> ResolverBuilder {
        ResolverBuilder {
            settings,
            backends: HashMap::new(),
            secrets: None,
        }
    }

    /// Builds a resolver with the default backends.
    pub fn new(settings: Settings) -> Result<Self, ResolveError> {
        Self::builder(settings).build()
    }

    pub fn store(&self) -> &DescriptorStore {
        &self.store
    }

    pub fn binder(&self) -> &CredentialBinder {
        &self.binder
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    /// Selects the repository for `query` and brings its working copy to
    /// the resolved label.
    ///
    /// The returned [`WorkingCopy`] holds a shared lease; drop it once
    /// its files have been read.
    pub async fn resolve(
        &self,
        query: &ConfigQuery,
    ) -> Result<(WorkingCopy, ResolvedLabel), ResolveError> {
        let (_, copy, label) = self.resolve_descriptor(query).await?;
        Ok((copy, label))
    }

    async fn resolve_descriptor(
        &self,
        query: &ConfigQuery,
    ) -> Result<(Arc<RepositoryDescriptor>, WorkingCopy, ResolvedLabel), ResolveError> {
        let descriptor = self.store.select(query)?;
        let label = self.store.resolve_label(query, &descriptor);
        let uri = descriptor.expand_uri(query.application(), query.profiles(), &label.value);
        let target = self.target(&descriptor, uri)?;

        debug!(
            repository = descriptor.name(),
            label = %label.value,
            source = ?label.source,
            "Resolving working copy"
        );
        let copy = self.synchronizer.prepare(&target, &label.value).await?;
        Ok((descriptor, copy, label))
    }

    /// The sync target of one working-copy identity, created once so its
    /// credentials are bound once.
    fn target(
        &self,
        descriptor: &RepositoryDescriptor,
        uri: String,
    ) -> Result<Arc<SyncTarget>, ResolveError> {
        let identity = format!("{}@{}", descriptor.name(), uri);
        let mut targets = self.targets.lock();
        if let Some(target) = targets.get(&identity) {
            return Ok(Arc::clone(target));
        }

        let vcs = self.backends.get(&descriptor.kind()).ok_or_else(|| {
            ResolveError::invalid_config(format!(
                "no {} backend installed for repository '{}'",
                descriptor.kind(),
                descriptor.name()
            ))
        })?;
        let transport = self.binder.bind(&uri, descriptor.credential_ref());
        let target = Arc::new(SyncTarget::new(
            descriptor.name(),
            uri,
            transport,
            Arc::clone(vcs),
        ));
        targets.insert(identity, Arc::clone(&target));
        Ok(target)
    }

    /// Resolves `query` to a complete environment: overrides, secrets and
    /// the property files of the working copy, most specific first.
    ///
    /// Malformed property files are logged and left out; the other files
    /// are still served and the left-out ones are listed in
    /// [`Environment::skipped`].
    pub async fn find_one(&self, query: &ConfigQuery) -> Result<Environment, ResolveError> {
        let (descriptor, copy, label) = self.resolve_descriptor(query).await?;
        let application = query.application().clone();
        let profiles = query.profiles().clone();
        let revision = copy.revision().to_string();
        let aggregator = PropertySourceAggregator::new(descriptor.expand_search_paths(
            &application,
            &profiles,
            &label.value,
        ));

        let outcome = tokio::task::spawn_blocking(move || {
            let outcome = aggregator.load(&copy, &application, &profiles);
            drop(copy);
            outcome
        })
        .await
        .map_err(|e| ResolveError::Io(io::Error::other(format!("property loading failed: {e}"))))?;

        if !outcome.is_complete() {
            warn!(
                repository = descriptor.name(),
                label = %label.value,
                failed = outcome.errors.len(),
                "Serving partial configuration"
            );
        }

        let mut sources = Vec::with_capacity(outcome.sources.len() + 2);
        if !self.overrides.is_empty() {
            sources.push(PropertySource::new(OVERRIDES_SOURCE, self.overrides.clone()));
        }
        if let Some(secrets) = self.fetch_secrets(query, &label.value).await? {
            sources.push(secrets);
        }
        sources.extend(outcome.sources);
        let skipped = outcome.errors.iter().map(ToString::to_string).collect();

        let env = Environment::new(
            query.application().as_str(),
            query.profiles().as_slice().to_vec(),
            label.value.as_str(),
        )
        .with_version(revision)
        .with_property_sources(sources)
        .with_skipped(skipped);

        info!(
            query = %query,
            repository = descriptor.name(),
            sources = env.len(),
            version = env.version().unwrap_or_default(),
            "Resolved configuration"
        );
        Ok(env)
    }

    async fn fetch_secrets(
        &self,
        query: &ConfigQuery,
        label: &str,
    ) -> Result<Option<PropertySource>, ResolveError> {
        let Some(secrets) = &self.secrets else {
            return Ok(None);
        };

        let profiles = query.profiles().joined();
        let path = format!("{}/{}/{}", secrets.prefix, query.application(), profiles);
        let found = secrets
            .backend
            .fetch_secrets(&path, label)
            .await
            .map_err(|e| match e {
                unavailable @ ResolveError::RepositoryUnavailable { .. } => unavailable,
                other => ResolveError::unavailable(secrets.backend.name(), other.to_string()),
            })?;

        if found.is_empty() {
            return Ok(None);
        }
        let name = format!("secrets-{}-{}-{}", query.application(), label, profiles);
        Ok(Some(PropertySource::new(name, found).with_origin(path)))
    }

    /// Deletes the working copy of `identity`; the next request clones it again.
    ///
    /// The sync target is forgotten too, so its credentials are bound anew.
    pub async fn discard(&self, identity: &str) -> Result<bool, ResolveError> {
        let discarded = self.synchronizer.discard(identity).await?;
        self.targets.lock().remove(identity);
        Ok(discarded)
    }

    /// State of the working copy of `identity`.
    pub fn status(&self, identity: &str) -> Option<CopyStatus> {
        self.synchronizer.status(identity)
    }
}

impl std::fmt::Debug for MultiRepositoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiRepositoryResolver")
            .field("repositories", &self.store.len())
            .field("backends", &self.backends.keys().collect::<Vec<_>>())
            .field("synchronizer", &self.synchronizer)
            .finish()
    }
}

#[async_trait]
impl ConfigSource for MultiRepositoryResolver {
    async fn fetch(&self, query: &ConfigQuery) -> Result<Environment, ResolveError> {
        self.find_one(query).await
    }

    async fn health_check(&self) -> Result<(), ResolveError> {
        for (identity, status) in self.synchronizer.statuses() {
            if status.state == SyncState::Error {
                return Err(ResolveError::unavailable(
                    identity,
                    status.last_error.unwrap_or_else(|| "synchronization failed".to_string()),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "multi-repository"
    }

    fn default_label(&self) -> &str {
        &self.default_label
    }
}

/// Builder for [`MultiRepositoryResolver`].
pub struct ResolverBuilder {
    settings: Settings,
    backends: HashMap<BackendKind, Arc<dyn VersionControl>>,
    secrets: Option<Arc<dyn SecretsBackend>>,
}

impl ResolverBuilder {
    /// Installs `vcs` for the descriptors of its kind, replacing the default.
    pub fn with_backend(mut self, vcs: Arc<dyn VersionControl>) -> Self {
        self.backends.insert(vcs.kind(), vcs);
        self
    }

    /// Installs a secrets backend. Without one, `settings.secrets.entries`
    /// (if any) are served from memory.
    pub fn with_secrets(mut self, backend: Arc<dyn SecretsBackend>) -> Self {
        self.secrets = Some(backend);
        self
    }

    /// Validates the settings and builds the resolver.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the credential rules or the descriptors
    /// are inconsistent.
    pub fn build(self) -> Result<MultiRepositoryResolver, ResolveError> {
        let Self {
            settings,
            mut backends,
            secrets,
        } = self;

        let rules = CredentialRules::from_settings(&settings.credentials)?;
        let store = DescriptorStore::from_settings(&settings.repos, &rules)?
            .with_default_label(settings.default_label.clone());

        backends.entry(BackendKind::Git).or_insert_with(|| {
            Arc::new(GitClient::new().clean_on_checkout(settings.clean_on_checkout)) as Arc<dyn VersionControl>
        });
        backends
            .entry(BackendKind::Svn)
            .or_insert_with(|| Arc::new(SvnCli::new()) as Arc<dyn VersionControl>);

        let prefix = settings
            .secrets
            .as_ref()
            .map_or_else(|| DEFAULT_SECRETS_PREFIX.to_string(), |s| s.prefix.clone());
        let secrets = match (secrets, &settings.secrets) {
            (Some(backend), _) => Some(SecretsConfig { prefix, backend }),
            (None, Some(configured)) if !configured.entries.is_empty() => Some(SecretsConfig {
                prefix,
                backend: Arc::new(StaticSecrets::new(configured.entries.clone())),
            }),
            (None, _) => None,
        };

        let default_label = settings
            .default_label
            .clone()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| BackendKind::Git.default_label().to_string());

        info!(
            repositories = store.len(),
            credentials = rules.len(),
            basedir = %settings.basedir.display(),
            "Multi-repository resolver ready"
        );

        Ok(MultiRepositoryResolver {
            binder: CredentialBinder::new(rules, settings.transport.clone()),
            synchronizer: Synchronizer::new(SyncOptions::from(&settings)),
            overrides: settings.overrides_map(),
            store,
            backends,
            secrets,
            default_label,
            targets: Mutex::new(HashMap::new()),
        })
    }
}
