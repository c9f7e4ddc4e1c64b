//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for locations and opaque store handles. Each
//! newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

// ============================================================================
// DocLocation
// ============================================================================

/// An absolute, normalized location of an item in the store
///
/// DocLocation is the identity key used to match items across snapshots,
/// so two locations compare equal exactly when their normalized paths do.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "PathBuf", into = "PathBuf")]
pub struct DocLocation(PathBuf);

impl DocLocation {
    /// Create a new DocLocation, validating it is absolute
    ///
    /// # Errors
    /// Returns `DomainError::InvalidLocation` if the path is not absolute
    /// or escapes the filesystem root via `..`
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let path = path.into();
        if !path.is_absolute() {
            return Err(DomainError::InvalidLocation(format!(
                "location must be absolute: {}",
                path.display()
            )));
        }

        Ok(Self(normalize(&path)?))
    }

    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }

    /// The last path component, used as the item's display name
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name().and_then(|n| n.to_str())
    }

    /// Returns the containing location, or `None` at the filesystem root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.parent().map(|p| Self(p.to_path_buf()))
    }

    /// Join a single child name to this location
    ///
    /// # Errors
    /// Returns error if `name` is empty, contains a separator, or is `..`
    pub fn join(&self, name: &str) -> Result<Self, DomainError> {
        if name.is_empty() || name == "." || name == ".." || name.contains('/') {
            return Err(DomainError::InvalidLocation(format!(
                "invalid child name: {name:?}"
            )));
        }
        Ok(Self(self.0.join(name)))
    }

    /// Returns true if `self` lies strictly below `ancestor`
    #[must_use]
    pub fn is_within(&self, ancestor: &DocLocation) -> bool {
        self.0 != ancestor.0 && self.0.starts_with(&ancestor.0)
    }
}

fn normalize(path: &Path) -> Result<PathBuf, DomainError> {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Prefix(p) => normalized.push(p.as_os_str()),
            Component::RootDir => normalized.push("/"),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(DomainError::InvalidLocation(
                        "location escapes root via ..".to_string(),
                    ));
                }
            }
            Component::Normal(c) => normalized.push(c),
        }
    }

    Ok(normalized)
}

impl Display for DocLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for DocLocation {
    type Error = DomainError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl From<DocLocation> for PathBuf {
    fn from(location: DocLocation) -> Self {
        location.0
    }
}

impl AsRef<Path> for DocLocation {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

// ============================================================================
// RemoteHandle
// ============================================================================

/// Opaque handle a store attaches to one of its items
///
/// The handle carries whatever the store needs to recognise the item again.
/// Two handles for the same location differ when the store's view of the
/// item changed (new content, a thumbnail became available, ...), which is
/// what drives reload operations in the list reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteHandle(String);

impl RemoteHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RemoteHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// VersionId
// ============================================================================

/// Identifier of one stored version of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(Uuid);

impl VersionId {
    /// Create a new random VersionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Create a nil (all zeros) VersionId
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for VersionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for VersionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VersionId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| DomainError::InvalidId(format!("Invalid UUID: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod doc_location_tests {
        use super::*;

        #[test]
        fn test_rejects_relative_path() {
            let result = DocLocation::new("docs/a.note");
            assert!(matches!(result, Err(DomainError::InvalidLocation(_))));
        }

        #[test]
        fn test_normalizes_dot_components() {
            let loc = DocLocation::new("/store/./docs/../a.note").unwrap();
            assert_eq!(loc.as_path(), Path::new("/store/a.note"));
        }

        #[test]
        fn test_rejects_escape_above_root() {
            assert!(DocLocation::new("/../../etc").is_err());
        }

        #[test]
        fn test_file_name_and_parent() {
            let loc = DocLocation::new("/store/a.note").unwrap();
            assert_eq!(loc.file_name(), Some("a.note"));
            assert_eq!(loc.parent().unwrap().as_path(), Path::new("/store"));
        }

        #[test]
        fn test_join_rejects_traversal() {
            let root = DocLocation::new("/store").unwrap();
            assert!(root.join("..").is_err());
            assert!(root.join("a/b").is_err());
            assert!(root.join("").is_err());
            assert_eq!(
                root.join("a.note").unwrap().as_path(),
                Path::new("/store/a.note")
            );
        }

        #[test]
        fn test_is_within() {
            let root = DocLocation::new("/store").unwrap();
            let child = root.join("a.note").unwrap();
            assert!(child.is_within(&root));
            assert!(!root.is_within(&root));
            assert!(!root.is_within(&child));
        }

        #[test]
        fn test_serde_rejects_relative() {
            let result: Result<DocLocation, _> = serde_json::from_str("\"relative/x\"");
            assert!(result.is_err());

            let loc: DocLocation = serde_json::from_str("\"/store/x\"").unwrap();
            assert_eq!(loc.file_name(), Some("x"));
        }
    }

    mod version_id_tests {
        use super::*;

        #[test]
        fn test_new_creates_unique_ids() {
            assert_ne!(VersionId::new(), VersionId::new());
        }

        #[test]
        fn test_from_str_roundtrip() {
            let id = VersionId::new();
            let parsed: VersionId = id.to_string().parse().unwrap();
            assert_eq!(id, parsed);
        }

        #[test]
        fn test_from_str_invalid() {
            let result: Result<VersionId, _> = "not-a-uuid".parse();
            assert!(matches!(result, Err(DomainError::InvalidId(_))));
        }
    }
}
