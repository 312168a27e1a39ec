//! Upload eligibility based on the remote store's allow-lists.

use bundle_sync_ports::{BundleApiPort, FilterLists};
use bundle_sync_shared::{RequestContext, Result, ResultExt};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Config file names that are never uploaded, whatever the server says.
pub const EXCLUDED_CONFIG_FILES: [&str; 2] = [".gitignore", ".dcignore"];

#[derive(Debug)]
enum FilterCache {
    Empty,
    Populated {
        extensions: BTreeSet<String>,
        config_files: BTreeSet<String>,
    },
}

impl FilterCache {
    fn from_lists(lists: FilterLists) -> Self {
        Self::Populated {
            extensions: lists.extensions.into_iter().collect(),
            config_files: lists
                .config_files
                .into_iter()
                .filter(|name| !EXCLUDED_CONFIG_FILES.contains(&name.as_str()))
                .collect(),
        }
    }

    fn lookup(&self, path: &Path) -> Option<bool> {
        let Self::Populated {
            extensions,
            config_files,
        } = self
        else {
            return None;
        };
        let by_extension = extension_of(path).is_some_and(|ext| extensions.contains(ext));
        let by_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| config_files.contains(name));
        Some(by_extension || by_name)
    }
}

/// Decides whether a path is eligible for upload.
///
/// The allow-lists are fetched on first use and cached for the lifetime of the
/// filter. Population is idempotent: concurrent first calls may each fetch,
/// and the last write wins. No lock is held across the fetch.
pub struct FileFilter {
    api: Arc<dyn BundleApiPort>,
    cache: RwLock<FilterCache>,
}

impl FileFilter {
    /// Build a filter backed by `api`.
    #[must_use]
    pub fn new(api: Arc<dyn BundleApiPort>) -> Self {
        Self {
            api,
            cache: RwLock::new(FilterCache::Empty),
        }
    }

    /// Returns true when `path` has a supported extension or config file name.
    ///
    /// A failure to fetch the allow-lists is returned tagged with phase `filters`.
    pub async fn is_supported(&self, ctx: &RequestContext, path: &Path) -> Result<bool> {
        if let Some(supported) = self.lookup(path) {
            return Ok(supported);
        }
        self.populate(ctx).await?;
        Ok(self.lookup(path).unwrap_or(false))
    }

    /// Fetch the allow-lists and replace the cache.
    pub async fn populate(&self, ctx: &RequestContext) -> Result<()> {
        let lists = self
            .api
            .get_filters(ctx)
            .await
            .in_phase("filters")?;
        let populated = FilterCache::from_lists(lists);
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = populated;
        Ok(())
    }

    /// Returns true once the allow-lists have been fetched.
    #[must_use]
    pub fn is_populated(&self) -> bool {
        matches!(
            *self.cache.read().unwrap_or_else(PoisonError::into_inner),
            FilterCache::Populated { .. }
        )
    }

    fn lookup(&self, path: &Path) -> Option<bool> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .lookup(path)
    }
}

/// Extension of the final path element including the leading dot.
///
/// A name with no dot has no extension; a dotfile such as `.snyk` is its own
/// extension.
pub fn extension_of(path: &Path) -> Option<&str> {
    let name = path.file_name()?.to_str()?;
    name.rfind('.').and_then(|index| name.get(index..))
}
