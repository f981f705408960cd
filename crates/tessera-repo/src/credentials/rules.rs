//! Credential rules and their lookup.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Authentication material for one remote.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Credentials {
    #[default]
    Anonymous,
    Basic {
        username: String,
        password: String,
    },
    /// Bearer token sent as an HTTP authorization header.
    Token { token: String },
    #[serde(rename_all = "camelCase")]
    SshKey {
        private_key: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        passphrase: Option<String>,
    },
    /// Raw client configuration entries (`http.cookieFile`, ...).
    Custom { options: IndexMap<String, String> },
}

impl Credentials {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// The kind name as written in settings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Basic { .. } => "basic",
            Self::Token { .. } => "token",
            Self::SshKey { .. } => "sshKey",
            Self::Custom { .. } => "custom",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Self::Token { .. } => f.debug_struct("Token").field("token", &"***").finish(),
            Self::SshKey {
                private_key,
                passphrase,
            } => f
                .debug_struct("SshKey")
                .field("private_key", private_key)
                .field("passphrase", &passphrase.as_ref().map(|_| "***"))
                .finish(),
            Self::Custom { options } => f
                .debug_struct("Custom")
                .field("options", &options.keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

/// One entry of `settings.credentials`.
///
/// A rule is reachable by name (a descriptor's `credentialRef`), by URI
/// (`uri` exact, `prefix`, or glob `pattern`), or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(flatten)]
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
enum UriMatcher {
    Exact(String),
    Prefix(String),
    Pattern(glob::Pattern),
}

impl UriMatcher {
    fn matches(&self, uri: &str) -> bool {
        match self {
            Self::Exact(expected) => expected == uri,
            Self::Prefix(prefix) => uri.starts_with(prefix.as_str()),
            Self::Pattern(pattern) => pattern.matches(uri),
        }
    }
}

#[derive(Debug, Clone)]
struct CredentialRule {
    name: Option<String>,
    matcher: Option<UriMatcher>,
    credentials: Credentials,
}

/// The ordered credential rule list.
///
/// Lookup is a pure function of the rule list, the URI and the optional
/// named reference: named rule, then exact URI, then prefix or pattern
/// rules in configured order, then anonymous.
#[derive(Debug, Clone, Default)]
pub struct CredentialRules {
    rules: Vec<CredentialRule>,
}

static ANONYMOUS: Credentials = Credentials::Anonymous;

impl CredentialRules {
    /// Compiles the configured rules, rejecting duplicates and bad patterns.
    pub fn from_settings(settings: &[CredentialSettings]) -> Result<Self, ResolveError> {
        let mut rules = Vec::with_capacity(settings.len());

        for (index, entry) in settings.iter().enumerate() {
            let matchers = [&entry.uri, &entry.prefix, &entry.pattern]
                .iter()
                .filter(|m| m.is_some())
                .count();
            if matchers > 1 {
                return Err(ResolveError::invalid_config(format!(
                    "credential rule #{index} sets more than one of uri, prefix and pattern"
                )));
            }
            if matchers == 0 && entry.name.is_none() {
                return Err(ResolveError::invalid_config(format!(
                    "credential rule #{index} has neither a name nor a uri, prefix or pattern"
                )));
            }
            if let Some(name) = &entry.name
                && rules.iter().any(|r: &CredentialRule| r.name.as_ref() == Some(name))
            {
                return Err(ResolveError::invalid_config(format!(
                    "duplicate credential name '{name}'"
                )));
            }

            let matcher = if let Some(uri) = &entry.uri {
                Some(UriMatcher::Exact(uri.clone()))
            } else if let Some(prefix) = &entry.prefix {
                Some(UriMatcher::Prefix(prefix.clone()))
            } else if let Some(pattern) = &entry.pattern {
                let compiled = glob::Pattern::new(pattern).map_err(|e| {
                    ResolveError::invalid_config(format!(
                        "invalid credential pattern '{pattern}': {e}"
                    ))
                })?;
                Some(UriMatcher::Pattern(compiled))
            } else {
                None
            };

            rules.push(CredentialRule {
                name: entry.name.clone(),
                matcher,
                credentials: entry.credentials.clone(),
            });
        }

        Ok(Self { rules })
    }

    /// Returns true if a rule is registered under `name`.
    pub fn has_named(&self, name: &str) -> bool {
        self.rules.iter().any(|r| r.name.as_deref() == Some(name))
    }

    /// Finds the credentials for `uri`.
    pub fn lookup(&self, uri: &str, credential_ref: Option<&str>) -> &Credentials {
        if let Some(name) = credential_ref
            && let Some(rule) = self.rules.iter().find(|r| r.name.as_deref() == Some(name))
        {
            return &rule.credentials;
        }

        let exact = self
            .rules
            .iter()
            .find(|r| matches!(&r.matcher, Some(UriMatcher::Exact(expected)) if expected == uri));
        if let Some(rule) = exact {
            return &rule.credentials;
        }

        self.rules
            .iter()
            .find(|r| match &r.matcher {
                Some(m @ (UriMatcher::Prefix(_) | UriMatcher::Pattern(_))) => m.matches(uri),
                _ => false,
            })
            .map(|r| &r.credentials)
            .unwrap_or(&ANONYMOUS)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
