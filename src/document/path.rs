//! Absolute, slash-separated node paths

use serde::{Deserialize, Serialize};

/// Path separator used by the repository and by candidate URIs
pub const SEPARATOR: char = '/';

/// Split a URI into its non-empty segments.
///
/// Leading, trailing and repeated separators are ignored, so `"/a//b/"`
/// yields `["a", "b"]`.
pub fn split_segments(uri: &str) -> Vec<&str> {
    uri.split(SEPARATOR).filter(|s| !s.is_empty()).collect()
}

/// Absolute path of a node in the repository tree
///
/// Always starts with `/`, never ends with one (except the root itself)
/// and never contains empty segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodePath(String);

impl NodePath {
    /// Build a normalized path from any slash-separated string
    pub fn new(path: impl AsRef<str>) -> Self {
        let segments = split_segments(path.as_ref());
        if segments.is_empty() {
            return Self::root();
        }
        Self(format!("{SEPARATOR}{}", segments.join("/")))
    }

    /// The tree root, `/`
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the path; empty for the root
    pub fn name(&self) -> &str {
        self.0.rsplit(SEPARATOR).next().unwrap_or_default()
    }

    /// Parent path, or `None` for the root
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Append a single child name
    pub fn join(&self, name: &str) -> NodePath {
        self.join_uri(name)
    }

    /// Append every segment of a URI (`"a/b"`, `"/a/b"` and `"a/b/"` are equivalent)
    pub fn join_uri(&self, uri: &str) -> NodePath {
        let mut path = self.0.clone();
        for segment in split_segments(uri) {
            if !path.ends_with(SEPARATOR) {
                path.push(SEPARATOR);
            }
            path.push_str(segment);
        }
        Self(path)
    }

    /// Segments of the path, root excluded
    pub fn segments(&self) -> Vec<&str> {
        split_segments(&self.0)
    }

    /// Number of segments; zero for the root
    pub fn depth(&self) -> usize {
        self.segments().len()
    }

    /// True if `other` lies strictly below this path
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        if self.is_root() {
            return !other.is_root();
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    /// True if `other` is this path or lies below it
    pub fn contains(&self, other: &NodePath) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Re-root a descendant of `from` under `to`.
    ///
    /// Returns `None` if this path is not `from` or below it.
    pub fn rebase(&self, from: &NodePath, to: &NodePath) -> Option<NodePath> {
        if self == from {
            return Some(to.clone());
        }
        if !from.is_ancestor_of(self) {
            return None;
        }
        let rest = if from.is_root() {
            &self.0[1..]
        } else {
            &self.0[from.0.len() + 1..]
        };
        Some(to.join_uri(rest))
    }
}

impl std::fmt::Display for NodePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodePath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}
