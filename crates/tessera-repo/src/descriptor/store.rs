use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use super::{LabelSource, RepositoryDescriptor, ResolvedLabel};
use crate::credentials::CredentialRules;
use crate::error::ResolveError;
use crate::settings::DescriptorSettings;
use crate::source::ConfigQuery;

/// The configured descriptors in selection order.
///
/// Specific descriptors keep their configured order; fallback descriptors
/// (those with a catch-all pattern) are tried after all of them. At least
/// one fallback must exist, so selection cannot fail for a valid request.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    descriptors: Vec<Arc<RepositoryDescriptor>>,
    default_label: Option<String>,
}

impl DescriptorStore {
    /// Validates and orders the descriptors.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for duplicate names, credential references
    /// unknown to `credentials`, or a set without a fallback descriptor.
    pub fn new(
        descriptors: Vec<RepositoryDescriptor>,
        credentials: &CredentialRules,
    ) -> Result<Self, ResolveError> {
        let mut names = HashSet::new();
        for descriptor in &descriptors {
            if !names.insert(descriptor.name().to_string()) {
                return Err(ResolveError::invalid_config(format!(
                    "duplicate repository name '{}'",
                    descriptor.name()
                )));
            }
            if let Some(reference) = descriptor.credential_ref()
                && !credentials.has_named(reference)
            {
                return Err(ResolveError::invalid_config(format!(
                    "repository '{}' references unknown credentials '{reference}'",
                    descriptor.name()
                )));
            }
        }

        let (fallbacks, specific): (Vec<_>, Vec<_>) =
            descriptors.into_iter().partition(RepositoryDescriptor::is_fallback);

        if fallbacks.is_empty() {
            return Err(ResolveError::invalid_config(
                "no fallback repository: at least one repository must use the pattern '*'",
            ));
        }

        Ok(Self {
            descriptors: specific.into_iter().chain(fallbacks).map(Arc::new).collect(),
            default_label: None,
        })
    }

    /// Sets the label used when neither the request nor the descriptor
    /// names one. Blank means the backend default.
    pub fn with_default_label(mut self, label: Option<String>) -> Self {
        self.default_label = label
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        self
    }

    /// Compiles descriptors from settings, then validates them.
    pub fn from_settings(
        settings: &[DescriptorSettings],
        credentials: &CredentialRules,
    ) -> Result<Self, ResolveError> {
        let descriptors = settings
            .iter()
            .map(RepositoryDescriptor::from_settings)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(descriptors, credentials)
    }

    /// Selects the first descriptor that accepts the query and whose
    /// expanded URI is non-empty.
    pub fn select(&self, query: &ConfigQuery) -> Result<Arc<RepositoryDescriptor>, ResolveError> {
        let application = query.application();
        let profiles = query.profiles();

        for descriptor in &self.descriptors {
            if !descriptor.accepts(application, profiles) {
                continue;
            }

            let label = self.resolve_label(query, descriptor);
            if descriptor
                .expand_uri(application, profiles, &label.value)
                .trim()
                .is_empty()
            {
                continue;
            }

            debug!(repository = descriptor.name(), %query, "Selected repository");
            return Ok(Arc::clone(descriptor));
        }

        Err(ResolveError::NoDescriptorMatched {
            application: application.to_string(),
            profiles: profiles.joined(),
        })
    }

    /// The label `descriptor` serves `query` at: the requested label, else
    /// the descriptor default, else the global default, else the backend
    /// default (`main` or `trunk`).
    pub fn resolve_label(&self, query: &ConfigQuery, descriptor: &RepositoryDescriptor) -> ResolvedLabel {
        if let Some(label) = query.label() {
            return ResolvedLabel {
                value: label.as_str().to_string(),
                source: LabelSource::Requested,
            };
        }
        if let Some(label) = descriptor.default_label() {
            return ResolvedLabel {
                value: label.to_string(),
                source: LabelSource::Descriptor,
            };
        }
        ResolvedLabel {
            value: self
                .default_label
                .clone()
                .unwrap_or_else(|| descriptor.kind().default_label().to_string()),
            source: LabelSource::Global,
        }
    }

    /// Descriptors in selection order.
    pub fn descriptors(&self) -> &[Arc<RepositoryDescriptor>] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
