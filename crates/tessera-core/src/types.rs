//! Request coordinates: application, profiles and label.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// The profile used when a request names none.
pub const DEFAULT_PROFILE: &str = "default";

/// Application identifier.
///
/// The name of the application whose configuration is requested, typically
/// the service name. Never empty.
///
/// # Example
///
/// ```
/// use tessera_core::Application;
///
/// let app = Application::parse("payment-service").unwrap();
/// assert_eq!(app.as_str(), "payment-service");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Application(String);

impl Application {
    /// Parses and validates an application name.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CoreError::invalid_application(
                name,
                "application name cannot be empty",
            ));
        }
        if name.contains(['/', '\\']) || name.contains("..") {
            return Err(CoreError::invalid_application(
                name,
                "application name cannot contain path separators",
            ));
        }
        Ok(Self(name.to_string()))
    }

    /// Returns the application name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An ordered set of active profiles.
///
/// Requests carry profiles as a comma-joined string. An empty string means
/// the single profile `default`. Duplicates are dropped, first occurrence
/// wins, so later profiles keep their higher precedence.
///
/// # Example
///
/// ```
/// use tessera_core::Profiles;
///
/// let profiles = Profiles::parse("dev, cloud,dev").unwrap();
/// assert_eq!(profiles.as_slice(), &["dev", "cloud"]);
/// assert_eq!(profiles.joined(), "dev,cloud");
///
/// assert_eq!(Profiles::parse("").unwrap().as_slice(), &["default"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profiles(Vec<String>);

impl Profiles {
    /// Parses a comma-joined profile list.
    pub fn parse(joined: &str) -> Result<Self> {
        let mut profiles: Vec<String> = Vec::new();
        for raw in joined.split(',') {
            let profile = raw.trim();
            if profile.is_empty() {
                continue;
            }
            if profile.contains(['/', '\\']) {
                return Err(CoreError::invalid_profile(
                    profile,
                    "profile cannot contain path separators",
                ));
            }
            if !profiles.iter().any(|p| p == profile) {
                profiles.push(profile.to_string());
            }
        }

        if profiles.is_empty() {
            profiles.push(DEFAULT_PROFILE.to_string());
        }

        Ok(Self(profiles))
    }

    /// Builds a profile list from already separated names.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse(&joined.join(","))
    }

    /// Returns the profiles in request order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns the profiles joined with commas.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }

    /// Returns true if only the implicit `default` profile is active.
    pub fn is_default(&self) -> bool {
        self.0.len() == 1 && self.0[0] == DEFAULT_PROFILE
    }
}

impl Default for Profiles {
    fn default() -> Self {
        Self(vec![DEFAULT_PROFILE.to_string()])
    }
}

impl fmt::Display for Profiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Configuration version label: a branch, tag or commit.
///
/// Labels arriving in a URL path cannot contain `/`, so `(_)` is accepted
/// as an escaped slash and decoded on parse.
///
/// # Example
///
/// ```
/// use tessera_core::Label;
///
/// let label = Label::parse("feature(_)login").unwrap();
/// assert_eq!(label.as_str(), "feature/login");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(String);

impl Label {
    /// Parses a label, decoding `(_)` into `/` and validating the result.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = raw.trim().replace("(_)", "/");
        validate_label(&name)?;
        Ok(Self(name))
    }

    /// Parses an optional label; blank input means "no label".
    pub fn parse_optional(raw: Option<&str>) -> Result<Option<Self>> {
        match raw.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Self::parse(raw).map(Some),
        }
    }

    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_label(name: &str) -> Result<()> {
    let reject = |reason: &str| Err(CoreError::invalid_label(name, reason));

    if name.is_empty() {
        return reject("label cannot be empty");
    }
    if name.starts_with('/') || name.ends_with('/') {
        return reject("label cannot start or end with '/'");
    }
    if name.starts_with('-') {
        return reject("label cannot start with '-'");
    }
    if name.contains("..") || name.contains("//") {
        return reject("label cannot contain '..' or '//'");
    }
    if name
        .chars()
        .any(|c| c.is_control() || matches!(c, ' ' | '~' | '^' | ':' | '?' | '*' | '[' | '\\'))
    {
        return reject("label contains invalid characters");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_application_rejects_empty_and_paths() {
        assert!(Application::parse("svc1").is_ok());
        assert!(Application::parse("  ").is_err());
        assert!(Application::parse("../etc").is_err());
        assert!(Application::parse("a/b").is_err());
    }

    #[test]
    fn test_profiles_default_when_empty() {
        let profiles = Profiles::parse(" , ").unwrap();
        assert!(profiles.is_default());
        assert_eq!(profiles.joined(), "default");
    }

    #[test]
    fn test_profiles_from_names() {
        let profiles = Profiles::from_names(["dev", "local"]).unwrap();
        assert_eq!(profiles.as_slice(), &["dev", "local"]);
        assert!(!profiles.is_default());
    }

    #[test]
    fn test_label_decodes_escaped_slash() {
        assert_eq!(Label::parse("release(_)2.x").unwrap().as_str(), "release/2.x");
        assert_eq!(Label::parse("main").unwrap().as_str(), "main");
    }

    #[test]
    fn test_label_validation() {
        assert!(Label::parse("v1.0.0").is_ok());
        assert!(Label::parse("feature/test").is_ok());
        assert!(Label::parse("/main").is_err());
        assert!(Label::parse("main/").is_err());
        assert!(Label::parse("a..b").is_err());
        assert!(Label::parse("a b").is_err());
        assert!(Label::parse("--upload-pack=x").is_err());
    }

    #[test]
    fn test_label_parse_optional() {
        assert_eq!(Label::parse_optional(None).unwrap(), None);
        assert_eq!(Label::parse_optional(Some("")).unwrap(), None);
        assert_eq!(
            Label::parse_optional(Some("develop")).unwrap(),
            Some(Label::parse("develop").unwrap())
        );
    }
}
