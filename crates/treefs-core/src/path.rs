//! Typed tree paths.
//!
//! Tree paths use `/` as the separator regardless of the host OS; they name
//! nodes in the in-memory tree, not files on disk. `/a/b`, `a/b`, `a//b`
//! and `a/b/` all normalize to the same path, and the empty path names the
//! root. Separator collapsing, parent/leaf splitting and component
//! iteration come from `relative-path`.

use std::fmt;

use relative_path::{RelativePath, RelativePathBuf};

use crate::error::FsError;
use crate::limits::MAX_FILE_NAME;

/// A normalized path inside the tree.
///
/// # Examples
///
/// ```
/// use treefs_core::path::TreePath;
///
/// let path = TreePath::new("/docs/readme.txt");
/// assert_eq!(path.file_name(), Some("readme.txt"));
/// assert_eq!(path.parent().unwrap().as_str(), "docs");
///
/// // paths are normalized
/// assert_eq!(path, TreePath::new("docs//readme.txt/"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath(RelativePathBuf);

impl TreePath {
    /// The root path (empty).
    #[inline]
    pub fn root() -> Self {
        TreePath(RelativePathBuf::new())
    }

    /// Builds a path from a string: leading slashes are stripped and the
    /// rest is brought into normal form.
    pub fn new(path: impl AsRef<str>) -> Self {
        let trimmed = path.as_ref().trim_start_matches('/');
        TreePath(RelativePath::new(trimmed).normalize())
    }

    /// Whether this is the root path.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.as_str().is_empty()
    }

    /// The normalized string form, without a leading slash.
    #[inline]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Iterates the components in root-to-leaf order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.0.components().map(|component| component.as_str())
    }

    /// The parent path; `None` for the root.
    pub fn parent(&self) -> Option<TreePath> {
        self.0
            .parent()
            .map(|parent| TreePath(parent.to_relative_path_buf()))
    }

    /// The final component; `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// Splits this path into parent path and leaf name.
    ///
    /// Returns `None` for the root path.
    pub fn split(&self) -> Option<(TreePath, &str)> {
        let parent = self.parent()?;
        let name = self.file_name()?;
        Some((parent, name))
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "/")
        } else {
            write!(f, "/{}", self.0)
        }
    }
}

impl From<&str> for TreePath {
    fn from(path: &str) -> Self {
        TreePath::new(path)
    }
}

/// Validates a leaf name for use as a directory entry.
pub fn validate_name(name: &str) -> Result<(), FsError> {
    if name.is_empty() || name.contains('/') || name.len() > MAX_FILE_NAME {
        return Err(FsError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
