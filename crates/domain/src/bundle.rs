//! Bundle data model.

use crate::hashing::content_hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One uploaded file: its content digest plus the text sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleFile {
    /// Lowercase hex SHA-256 of the raw file bytes.
    pub hash: String,
    /// File content as UTF-8 (invalid sequences replaced).
    pub content: String,
}

impl BundleFile {
    /// Build a file from its raw bytes.
    ///
    /// The hash covers the bytes exactly as read; `content` is the lossy
    /// UTF-8 decoding uploaded to the remote store.
    pub fn from_raw(bytes: &[u8]) -> Self {
        Self {
            hash: content_hash(bytes),
            content: String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Files keyed by encoded bundle path.
pub type FileMap = BTreeMap<String, BundleFile>;

/// Local view of a remote bundle.
///
/// `bundle_hash` is opaque and only ever assigned from a remote response;
/// empty means no bundle has been created yet. `missing_files` is replaced
/// wholesale after every round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    bundle_hash: String,
    files: FileMap,
    missing_files: Vec<String>,
    limit_to_files: Vec<String>,
    root_path: PathBuf,
}

impl Bundle {
    /// Create a bundle that has not been sent to the remote store yet.
    pub fn new(root_path: impl Into<PathBuf>, files: FileMap, limit_to_files: Vec<String>) -> Self {
        Self {
            bundle_hash: String::new(),
            files,
            missing_files: Vec::new(),
            limit_to_files,
            root_path: root_path.into(),
        }
    }

    /// Remote bundle identifier (empty until created).
    pub fn bundle_hash(&self) -> &str {
        &self.bundle_hash
    }

    /// Returns true once the remote store assigned an identifier.
    pub fn is_created(&self) -> bool {
        !self.bundle_hash.is_empty()
    }

    /// Local files keyed by encoded path.
    pub const fn files(&self) -> &FileMap {
        &self.files
    }

    /// Paths the remote store reported as missing in the last response.
    pub fn missing_files(&self) -> &[String] {
        &self.missing_files
    }

    /// Paths the caller marked as changed.
    pub fn limit_to_files(&self) -> &[String] {
        &self.limit_to_files
    }

    /// Root directory the file keys are relative to.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Path to content-hash map sent on create.
    pub fn hash_map(&self) -> BTreeMap<String, String> {
        self.files
            .iter()
            .map(|(path, file)| (path.clone(), file.hash.clone()))
            .collect()
    }

    /// Record the remote store's view after a create or extend call.
    pub fn apply_remote_state(&mut self, bundle_hash: String, missing_files: Vec<String>) {
        self.bundle_hash = bundle_hash;
        self.missing_files = missing_files;
    }

    /// Drop uploaded contents once the remote store holds every file.
    pub fn clear_files(&mut self) {
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content: &str) -> BundleFile {
        BundleFile::from_raw(content.as_bytes())
    }

    #[test]
    fn from_raw_hashes_bytes_and_keeps_lossy_text() {
        let bytes = [b'o', b'k', 0xff];
        let bundle_file = BundleFile::from_raw(&bytes);
        assert_eq!(bundle_file.hash, content_hash(&bytes));
        assert_eq!(bundle_file.content, "ok\u{fffd}");
    }

    #[test]
    fn remote_state_replaces_missing_files() {
        let mut files = FileMap::new();
        files.insert("a.java".to_owned(), file("a"));
        files.insert("b.java".to_owned(), file("b"));
        let mut bundle = Bundle::new("/repo", files, Vec::new());
        assert!(!bundle.is_created());

        bundle.apply_remote_state("h1".to_owned(), vec!["a.java".into(), "b.java".into()]);
        bundle.apply_remote_state("h2".to_owned(), vec!["b.java".into()]);

        assert_eq!(bundle.bundle_hash(), "h2");
        assert_eq!(bundle.missing_files(), ["b.java".to_owned()]);
        assert!(bundle.is_created());
    }

    #[test]
    fn hash_map_mirrors_files() {
        let mut files = FileMap::new();
        files.insert("x/y.py".to_owned(), file("print()"));
        let bundle = Bundle::new("/repo", files, vec!["x/y.py".to_owned()]);

        let hashes = bundle.hash_map();
        assert_eq!(hashes.get("x/y.py"), Some(&content_hash(b"print()")));
        assert_eq!(bundle.limit_to_files(), ["x/y.py".to_owned()]);
        assert_eq!(bundle.root_path(), Path::new("/repo"));
    }

    #[test]
    fn bundle_file_serializes_with_wire_field_names() -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(file("x"))?;
        assert_eq!(json["content"], "x");
        assert_eq!(json["hash"], content_hash(b"x"));
        Ok(())
    }
}
