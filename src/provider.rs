use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::Catalog;

/// Load and validate a price book JSON file into a catalog snapshot.
///
/// Validation issues are data-quality warnings, not load failures: the
/// selector tolerates malformed slices defensively, so a price book
/// with range problems still loads, with every issue logged.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read price book at {}", path.display()))?;
    let catalog: Catalog = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse price book at {}", path.display()))?;

    let issues = catalog.validate();
    for issue in &issues {
        warn!(%issue, "price book data-quality problem");
    }

    info!(
        products = catalog.products.len(),
        issues = issues.len(),
        path = %path.display(),
        "price book loaded"
    );
    Ok(catalog)
}

/// Atomically swappable catalog snapshot.
///
/// Readers take a full `Arc<Catalog>` and keep seeing one consistent
/// price book for the duration of a computation; `reload` replaces the
/// snapshot wholesale and never mutates in place. A failed reload
/// leaves the previous snapshot serving.
pub struct CatalogStore {
    inner: ArcSwap<Catalog>,
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(catalog: Catalog, path: PathBuf) -> Self {
        CatalogStore {
            inner: ArcSwap::from_pointee(catalog),
            path,
        }
    }

    /// Load the price book at `path` and build a store around it
    pub fn load(path: PathBuf) -> Result<Self> {
        let catalog = load_catalog(&path)?;
        Ok(CatalogStore::new(catalog, path))
    }

    /// Current catalog snapshot
    pub fn current(&self) -> Arc<Catalog> {
        self.inner.load_full()
    }

    /// Re-read the price book from disk and swap it in atomically
    pub fn reload(&self) -> Result<()> {
        let catalog = load_catalog(&self.path)?;
        let products = catalog.products.len();
        self.inner.store(Arc::new(catalog));
        info!(products, "catalog snapshot swapped");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
