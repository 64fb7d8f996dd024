//! Absolute path algebra for the target scene hierarchy.
//!
//! `ScenePath` is the address of a prim in a [`Stage`](crate::stage::Stage):
//! an absolute, `/`-separated path ("/World/geo/mesh"). The export engine
//! leans on the algebra here (common prefix, prefix tests, prefix rewrites)
//! rather than on string munging at call sites.

use smallvec::SmallVec;

use crate::util::{Error, Result};

/// An absolute path in the target scene hierarchy.
///
/// Always normalized: starts with `/`, no empty or trailing components.
/// The pseudo-root is the single path `/`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScenePath {
    text: String,
}

impl ScenePath {
    /// The pseudo-root path `/`.
    pub fn root() -> Self {
        Self {
            text: "/".to_string(),
        }
    }

    /// Parse an absolute path string.
    ///
    /// Rejects relative paths, empty components and trailing slashes
    /// (other than the bare root `/`).
    pub fn parse(text: &str) -> Result<Self> {
        if text == "/" {
            return Ok(Self::root());
        }
        if !text.starts_with('/') || text.ends_with('/') {
            return Err(Error::InvalidPath(text.to_string()));
        }
        if text[1..].split('/').any(|c| c.is_empty()) {
            return Err(Error::InvalidPath(text.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    /// Path text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether this is the pseudo-root `/`.
    pub fn is_root(&self) -> bool {
        self.text == "/"
    }

    /// Whether this path has exactly one component ("/World").
    pub fn is_root_prim_path(&self) -> bool {
        self.depth() == 1
    }

    /// Last path component; empty for the root.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return "";
        }
        match self.text.rfind('/') {
            Some(pos) => &self.text[pos + 1..],
            None => "",
        }
    }

    /// Number of components (0 for the root).
    pub fn depth(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.text[1..].split('/').count()
        }
    }

    /// Iterate over path components, root-most first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.text[1..].split('/').filter(|c| !c.is_empty())
    }

    /// Parent path; `None` for the root.
    pub fn parent(&self) -> Option<ScenePath> {
        if self.is_root() {
            return None;
        }
        match self.text.rfind('/') {
            Some(0) => Some(Self::root()),
            Some(pos) => Some(Self {
                text: self.text[..pos].to_string(),
            }),
            None => None,
        }
    }

    /// Append a child component.
    ///
    /// The name must be a non-empty component without separators; callers
    /// are expected to pass sanitized identifiers.
    pub fn append_child(&self, name: &str) -> ScenePath {
        debug_assert!(!name.is_empty() && !name.contains('/'));
        if self.is_root() {
            Self {
                text: format!("/{name}"),
            }
        } else {
            Self {
                text: format!("{}/{name}", self.text),
            }
        }
    }

    /// All non-root prefixes of this path, root-most first, including self.
    ///
    /// `/A/B/C` yields `/A`, `/A/B`, `/A/B/C`; the root yields nothing.
    pub fn prefixes(&self) -> SmallVec<[ScenePath; 8]> {
        let mut out = SmallVec::new();
        if self.is_root() {
            return out;
        }
        let mut end = 0;
        for comp in self.components() {
            end += 1 + comp.len();
            out.push(Self {
                text: self.text[..end].to_string(),
            });
        }
        out
    }

    /// Whether `prefix` is an ancestor-or-self of this path.
    ///
    /// The root is a prefix of every path.
    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        if prefix.is_root() {
            return true;
        }
        self.text == prefix.text
            || (self.text.starts_with(&prefix.text)
                && self.text.as_bytes().get(prefix.text.len()) == Some(&b'/'))
    }

    /// Longest common prefix of two paths; the root if nothing is shared.
    pub fn common_prefix(&self, other: &ScenePath) -> ScenePath {
        let mut end = 0;
        for (a, b) in self.components().zip(other.components()) {
            if a != b {
                break;
            }
            end += 1 + a.len();
        }
        if end == 0 {
            Self::root()
        } else {
            Self {
                text: self.text[..end].to_string(),
            }
        }
    }

    /// Rewrite a leading `old` prefix with `new`.
    ///
    /// Returns the path unchanged when `old` is not a prefix of it.
    pub fn replace_prefix(&self, old: &ScenePath, new: &ScenePath) -> ScenePath {
        if !self.has_prefix(old) {
            return self.clone();
        }
        let rest = if old.is_root() {
            &self.text[..]
        } else {
            &self.text[old.text.len()..]
        };
        if rest.is_empty() || rest == "/" {
            return new.clone();
        }
        if new.is_root() {
            Self {
                text: rest.to_string(),
            }
        } else {
            Self {
                text: format!("{}{rest}", new.text),
            }
        }
    }
}

impl std::fmt::Display for ScenePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::fmt::Debug for ScenePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ScenePath({})", self.text)
    }
}
