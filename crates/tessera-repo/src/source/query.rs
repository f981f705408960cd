//! Configuration query types.

use serde::{Deserialize, Serialize};
use tessera_core::{Application, Label, Profiles};

use crate::error::ResolveError;

/// A request for configuration: application, profiles and optional label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigQuery {
    application: Application,
    profiles: Profiles,
    label: Option<Label>,
}

impl ConfigQuery {
    /// Creates a query without a label.
    pub fn new(application: Application, profiles: Profiles) -> Self {
        Self {
            application,
            profiles,
            label: None,
        }
    }

    /// Parses raw request coordinates.
    ///
    /// An empty profile string means `default`; a blank label means "no
    /// label". `(_)` in the label stands for `/`.
    ///
    /// # Example
    ///
    /// ```
    /// use tessera_repo::ConfigQuery;
    ///
    /// let query = ConfigQuery::parse("svc1", "dev,cloud", Some("feature(_)login")).unwrap();
    /// assert_eq!(query.application().as_str(), "svc1");
    /// assert_eq!(query.profiles().as_slice(), &["dev", "cloud"]);
    /// assert_eq!(query.label().unwrap().as_str(), "feature/login");
    /// ```
    pub fn parse(
        application: &str,
        profiles: &str,
        label: Option<&str>,
    ) -> Result<Self, ResolveError> {
        Ok(Self {
            application: Application::parse(application)?,
            profiles: Profiles::parse(profiles)?,
            label: Label::parse_optional(label)?,
        })
    }

    /// Returns a new query with the specified label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn profiles(&self) -> &Profiles {
        &self.profiles
    }

    /// The requested label, if any.
    pub fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }
}

impl std::fmt::Display for ConfigQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.application, self.profiles)?;
        if let Some(label) = &self.label {
            write!(f, "/{}", label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let query = ConfigQuery::parse("svc1", "", Some("  ")).unwrap();
        assert!(query.profiles().is_default());
        assert!(query.label().is_none());
    }

    #[test]
    fn test_parse_rejects_bad_coordinates() {
        let err = ConfigQuery::parse("", "dev", None).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidRequest(_)));
        assert!(ConfigQuery::parse("svc1", "dev", Some("a..b")).is_err());
    }

    #[test]
    fn test_display() {
        let query = ConfigQuery::parse("myapp", "dev,local", None).unwrap();
        assert_eq!(query.to_string(), "myapp/dev,local");

        let query = query.with_label(Label::parse("v1.0.0").unwrap());
        assert_eq!(query.to_string(), "myapp/dev,local/v1.0.0");
    }
}
