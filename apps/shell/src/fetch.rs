//! # Resource Fetchers
//!
//! Where module markup, scripts and the seed document come from.
//!
//! ```text
//! ResourceFetcher::fetch_text("modules/catalog/catalog.html")
//!      │
//!      ├──► FsFetcher      <assets root>/modules/catalog/catalog.html
//!      │                   (tokio::fs, relative paths only)
//!      │
//!      └──► StaticFetcher  in-memory map, optional per-path delay
//!                          (tests, embedded assets)
//! ```
//!
//! Fetches are the only suspension points of a module load. There is no
//! timeout and no retry: a failure is reported once to the loader.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{ShellError, ShellResult};

/// Source of text resources addressed by relative path.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// Fetches the resource at `path`.
    ///
    /// ## Errors
    /// `ResourceLoad` if the resource is missing or unreadable.
    async fn fetch_text(&self, path: &str) -> ShellResult<String>;
}

// =============================================================================
// FsFetcher
// =============================================================================

/// Reads resources from an assets directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsFetcher { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> ShellResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if path.is_empty() || escapes {
            return Err(ShellError::resource(path, "path must stay inside the assets root"));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ResourceFetcher for FsFetcher {
    async fn fetch_text(&self, path: &str) -> ShellResult<String> {
        let full = self.resolve(path)?;
        debug!(path, "Fetching resource");

        tokio::fs::read_to_string(&full)
            .await
            .map_err(|e| ShellError::resource(path, e))
    }
}

// =============================================================================
// StaticFetcher
// =============================================================================

/// Serves resources from memory.
///
/// ## Usage
/// ```rust
/// use std::time::Duration;
/// use showroom_shell::fetch::StaticFetcher;
///
/// let fetcher = StaticFetcher::new()
///     .with("modules/cart/cart.html", "<section></section>")
///     .with_delay("modules/cart/cart.html", Duration::from_millis(50));
/// assert_eq!(fetcher.fetch_count("modules/cart/cart.html"), 0);
/// ```
#[derive(Debug, Default)]
pub struct StaticFetcher {
    resources: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    fetches: Mutex<HashMap<String, usize>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource.
    pub fn with(mut self, path: impl Into<String>, body: impl Into<String>) -> Self {
        self.resources.insert(path.into(), body.into());
        self
    }

    /// Delays every fetch of `path`.
    pub fn with_delay(mut self, path: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(path.into(), delay);
        self
    }

    /// Number of fetches of `path` so far, including failed ones.
    pub fn fetch_count(&self, path: &str) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn fetch_text(&self, path: &str) -> ShellResult<String> {
        *self
            .fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(path.to_string())
            .or_insert(0) += 1;

        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }

        self.resources
            .get(path)
            .cloned()
            .ok_or_else(|| ShellError::resource(path, "not found"))
    }
}
