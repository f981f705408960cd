use std::fmt;

use glob::Pattern;
use tessera_core::{Application, Profiles};

use crate::error::ResolveError;

/// Which requests a descriptor answers: `app-glob` or `app-glob/profile-glob`.
#[derive(Debug, Clone)]
pub struct InclusionPattern {
    raw: String,
    application: Pattern,
    profile: Option<Pattern>,
}

impl InclusionPattern {
    pub fn parse(raw: &str) -> Result<Self, ResolveError> {
        let raw = raw.trim();
        let (app, profile) = match raw.split_once('/') {
            Some((app, profile)) => (app, Some(profile)),
            None => (raw, None),
        };

        if app.is_empty() || profile.is_some_and(str::is_empty) {
            return Err(ResolveError::invalid_config(format!(
                "invalid repository pattern '{raw}': empty segment"
            )));
        }

        let compile = |glob: &str| {
            Pattern::new(glob).map_err(|e| {
                ResolveError::invalid_config(format!("invalid repository pattern '{raw}': {e}"))
            })
        };

        Ok(Self {
            raw: raw.to_string(),
            application: compile(app)?,
            profile: profile.map(compile).transpose()?,
        })
    }

    /// Accepts the request when the application matches and, for
    /// two-segment patterns, at least one requested profile matches.
    pub fn matches(&self, application: &Application, profiles: &Profiles) -> bool {
        if !self.application.matches(application.as_str()) {
            return false;
        }
        match &self.profile {
            Some(profile) => profiles.as_slice().iter().any(|p| profile.matches(p)),
            None => true,
        }
    }

    /// `*` and `*/*` accept every request.
    pub fn is_catch_all(&self) -> bool {
        self.application.as_str() == "*" && self.profile.as_ref().is_none_or(|p| p.as_str() == "*")
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for InclusionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(name: &str) -> Application {
        Application::parse(name).unwrap()
    }

    fn profiles(joined: &str) -> Profiles {
        Profiles::parse(joined).unwrap()
    }

    #[test]
    fn test_application_only() {
        let pattern = InclusionPattern::parse("svc*").unwrap();
        assert!(pattern.matches(&app("svc1"), &profiles("")));
        assert!(!pattern.matches(&app("billing"), &profiles("dev")));
        assert!(!pattern.is_catch_all());
    }

    #[test]
    fn test_application_and_profile() {
        let pattern = InclusionPattern::parse("svc1/dev*").unwrap();
        assert!(pattern.matches(&app("svc1"), &profiles("cloud,development")));
        assert!(!pattern.matches(&app("svc1"), &profiles("prod")));
        assert!(!pattern.matches(&app("svc1"), &profiles("")));
    }

    #[test]
    fn test_catch_all() {
        assert!(InclusionPattern::parse("*").unwrap().is_catch_all());
        assert!(InclusionPattern::parse("*/*").unwrap().is_catch_all());
        assert!(!InclusionPattern::parse("*/prod").unwrap().is_catch_all());
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(InclusionPattern::parse("svc[").is_err());
        assert!(InclusionPattern::parse("/dev").is_err());
        assert!(InclusionPattern::parse("svc1/").is_err());
    }
}
