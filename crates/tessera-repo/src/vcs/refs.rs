//! Labels as version-control references.

use std::fmt;

/// What a label resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// A moving ref (branch, Subversion trunk or branch directory).
    Branch,
    /// A tag.
    Tag,
    /// A commit id.
    Commit,
}

impl RefKind {
    /// Moving refs are fetched again once the refresh interval elapses;
    /// fixed refs never change once known locally.
    pub fn is_moving(&self) -> bool {
        matches!(self, Self::Branch)
    }
}

/// A label resolved against a working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// The label as requested.
    pub label: String,
    /// Backend-specific name of the resolved ref (`refs/tags/v1`,
    /// `branches/release-2`, a commit id).
    pub name: String,
    pub kind: RefKind,
    /// The concrete revision the ref points to.
    pub revision: String,
}

/// How a label should be looked up.
///
/// Labels may carry an explicit prefix (`refs/heads/`, `refs/tags/`,
/// `tags/`), or be a full 40 character commit id. Anything else is a plain
/// name tried as a branch first, then as a tag, then as an abbreviated
/// commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    pub name: String,
    /// `None` for plain names.
    pub hint: Option<RefKind>,
}

impl RefSpec {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();

        if is_full_commit_id(label) {
            return Self::hinted(label, RefKind::Commit);
        }
        if let Some(tag) = label
            .strip_prefix("refs/tags/")
            .or_else(|| label.strip_prefix("tags/"))
        {
            return Self::hinted(tag, RefKind::Tag);
        }
        if let Some(branch) = label.strip_prefix("refs/heads/") {
            return Self::hinted(branch, RefKind::Branch);
        }

        Self {
            name: label.to_string(),
            hint: None,
        }
    }

    fn hinted(name: &str, kind: RefKind) -> Self {
        Self {
            name: name.to_string(),
            hint: Some(kind),
        }
    }

    /// Returns true if the label may be looked up as `kind`.
    pub fn allows(&self, kind: RefKind) -> bool {
        self.hint.is_none_or(|hint| hint == kind)
    }

    /// Returns true if the name could be an abbreviated commit id.
    pub fn could_be_commit(&self) -> bool {
        self.allows(RefKind::Commit)
            && (7..=40).contains(&self.name.len())
            && self.name.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for RefSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hint {
            Some(RefKind::Tag) => write!(f, "tags/{}", self.name),
            Some(RefKind::Commit) => write!(f, "{}", &self.name[..8.min(self.name.len())]),
            _ => write!(f, "{}", self.name),
        }
    }
}

fn is_full_commit_id(label: &str) -> bool {
    label.len() == 40 && label.chars().all(|c| c.is_ascii_hexdigit())
}
