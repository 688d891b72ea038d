//! Provider-relative paths.

use std::fmt;

/// An absolute, `/`-separated path inside the shared folder.
///
/// The root is `/`. Paths are kept normalized: no empty or `.` components and
/// no trailing slash, so two paths naming the same object compare equal.
/// `..` is never interpreted here; the resolver handles it on node
/// identities instead.
///
/// # Examples
///
/// ```
/// use sffs_core::NodePath;
///
/// let path = NodePath::new("docs//./a.txt");
/// assert_eq!(path.as_str(), "/docs/a.txt");
/// assert_eq!(path.file_name(), Some("a.txt"));
/// assert_eq!(path.parent(), Some(NodePath::new("/docs")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(String);

impl NodePath {
    /// The shared folder root.
    #[inline]
    pub fn root() -> Self {
        NodePath("/".to_string())
    }

    /// Builds a normalized path; a missing leading slash is implied.
    pub fn new(path: impl AsRef<str>) -> Self {
        let mut out = String::with_capacity(path.as_ref().len() + 1);
        for component in path.as_ref().split('/') {
            if component.is_empty() || component == "." {
                continue;
            }
            out.push('/');
            out.push_str(component);
        }
        if out.is_empty() {
            return Self::root();
        }
        NodePath(out)
    }

    /// Returns true for `/`.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// The path as sent to the provider.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Appends one name component.
    pub fn join(&self, name: impl AsRef<str>) -> Self {
        if self.is_root() {
            NodePath::new(name)
        } else {
            NodePath::new(format!("{}/{}", self.0, name.as_ref()))
        }
    }

    /// The containing directory; `None` for the root.
    pub fn parent(&self) -> Option<NodePath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind('/') {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(NodePath(self.0[..idx].to_string())),
        }
    }

    /// The last component; `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Iterates over the name components, root first.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|c| !c.is_empty())
    }

    /// Number of components below the root.
    pub fn depth(&self) -> usize {
        self.components().count()
    }
}

impl AsRef<str> for NodePath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodePath {
    fn from(s: &str) -> Self {
        NodePath::new(s)
    }
}
