//! Repository descriptors and their selection.

mod pattern;
mod store;

use tessera_core::{Application, Profiles};

pub use pattern::InclusionPattern;
pub use store::DescriptorStore;

/// Where a resolved label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    /// Named in the request.
    Requested,
    /// The descriptor's default label.
    Descriptor,
    /// The configured global default, or the backend default.
    Global,
}

/// The label a request is served at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLabel {
    pub value: String,
    pub source: LabelSource,
}

use crate::error::ResolveError;
use crate::settings::DescriptorSettings;
use crate::vcs::BackendKind;

/// One configured backing repository.
///
/// Immutable after load; a single descriptor answers every request its
/// patterns accept.
#[derive(Debug, Clone)]
pub struct RepositoryDescriptor {
    name: String,
    uri: String,
    kind: BackendKind,
    default_label: Option<String>,
    search_paths: Vec<String>,
    credential_ref: Option<String>,
    patterns: Vec<InclusionPattern>,
}

impl RepositoryDescriptor {
    /// Compiles a descriptor from settings. Empty `patterns` means `*`.
    pub fn from_settings(settings: &DescriptorSettings) -> Result<Self, ResolveError> {
        let name = settings.name.trim();
        if name.is_empty() {
            return Err(ResolveError::invalid_config("repository name cannot be empty"));
        }
        if settings.uri.trim().is_empty() {
            return Err(ResolveError::invalid_config(format!(
                "repository '{name}' has an empty uri"
            )));
        }

        let patterns = if settings.patterns.is_empty() {
            vec![InclusionPattern::parse("*")?]
        } else {
            settings
                .patterns
                .iter()
                .map(|p| InclusionPattern::parse(p))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            name: name.to_string(),
            uri: settings.uri.trim().to_string(),
            kind: settings.kind,
            default_label: settings
                .default_label
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
            search_paths: settings.search_paths.clone(),
            credential_ref: settings.credential_ref.clone(),
            patterns,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The URI template as configured.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn default_label(&self) -> Option<&str> {
        self.default_label.as_deref()
    }

    pub fn credential_ref(&self) -> Option<&str> {
        self.credential_ref.as_deref()
    }

    pub fn patterns(&self) -> &[InclusionPattern] {
        &self.patterns
    }

    /// A descriptor with a catch-all pattern answers every request.
    pub fn is_fallback(&self) -> bool {
        self.patterns.iter().any(InclusionPattern::is_catch_all)
    }

    /// Returns true if one of the inclusion patterns accepts the request.
    pub fn accepts(&self, application: &Application, profiles: &Profiles) -> bool {
        self.patterns.iter().any(|p| p.matches(application, profiles))
    }

    /// The remote URI for a request.
    pub fn expand_uri(&self, application: &Application, profiles: &Profiles, label: &str) -> String {
        expand_placeholders(&self.uri, application, profiles, label)
    }

    /// The search paths for a request, in configured order.
    pub fn expand_search_paths(
        &self,
        application: &Application,
        profiles: &Profiles,
        label: &str,
    ) -> Vec<String> {
        self.search_paths
            .iter()
            .map(|p| expand_placeholders(p, application, profiles, label))
            .collect()
    }
}

/// Replaces `{application}`, `{profile}` (comma-joined profiles) and
/// `{label}`. A `(_)` in the result stands for `/`.
pub fn expand_placeholders(
    template: &str,
    application: &Application,
    profiles: &Profiles,
    label: &str,
) -> String {
    template
        .replace("{application}", application.as_str())
        .replace("{profile}", &profiles.joined())
        .replace("{label}", label)
        .replace("(_)", "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> (Application, Profiles) {
        (
            Application::parse("svc1").unwrap(),
            Profiles::parse("dev,cloud").unwrap(),
        )
    }

    #[test]
    fn test_placeholders() {
        let (app, profiles) = request();
        let expanded = expand_placeholders(
            "https://git.example.com/{application}/{label}/{profile}",
            &app,
            &profiles,
            "release(_)2",
        );
        assert_eq!(expanded, "https://git.example.com/svc1/release/2/dev,cloud");
    }

    #[test]
    fn test_from_settings_defaults_to_catch_all() {
        let descriptor =
            RepositoryDescriptor::from_settings(&DescriptorSettings::new("shared", "file:///srv/shared"))
                .unwrap();
        assert!(descriptor.is_fallback());
        assert_eq!(descriptor.default_label(), None);
        assert_eq!(descriptor.kind(), BackendKind::Git);
    }

    #[test]
    fn test_from_settings_rejects_empty_fields() {
        assert!(RepositoryDescriptor::from_settings(&DescriptorSettings::new(" ", "file:///a")).is_err());
        assert!(RepositoryDescriptor::from_settings(&DescriptorSettings::new("a", "")).is_err());
    }

    #[test]
    fn test_search_paths_expand_per_request() {
        let settings = DescriptorSettings::new("A", "file:///srv/{application}")
            .search_path("{application}")
            .search_path("shared/*")
            .default_label("  ");
        let descriptor = RepositoryDescriptor::from_settings(&settings).unwrap();
        let (app, profiles) = request();

        assert_eq!(descriptor.expand_uri(&app, &profiles, "main"), "file:///srv/svc1");
        assert_eq!(
            descriptor.expand_search_paths(&app, &profiles, "main"),
            vec!["svc1", "shared/*"]
        );
        assert_eq!(descriptor.default_label(), None);
    }
}
