//! Dropdown option loading
//!
//! Option lists come from plain-text resources with one display value per
//! line and no header row. A resource is either an HTTP(S) URL or a path on
//! the local filesystem.

mod catalog;

pub use catalog::OptionCatalog;

use dashmap::DashMap;
use reqwest::Client;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading an option list
#[derive(Error, Debug)]
pub enum OptionsError {
    #[error("HTTP request for {location} failed: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{location} returned HTTP {status}")]
    Status { location: String, status: u16 },

    #[error("Failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
}

/// Parse option text into a unique, ordered list
///
/// Lines are trimmed and empty lines dropped. The result is sorted
/// lexically, then entries mentioning "n/a" are moved to the front.
pub fn parse_options(text: &str) -> Vec<String> {
    let unique: BTreeSet<&str> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    promote_not_applicable(unique.into_iter().map(str::to_string).collect())
}

/// Whether an option reads as "not applicable"
pub fn is_not_applicable(value: &str) -> bool {
    value.trim().to_lowercase().contains("n/a")
}

/// Move "n/a" entries to the front, keeping relative order on both sides
pub fn promote_not_applicable(options: Vec<String>) -> Vec<String> {
    let (mut front, rest): (Vec<String>, Vec<String>) =
        options.into_iter().partition(|v| is_not_applicable(v));
    front.extend(rest);
    front
}

/// Reorder `options` by a canonical sequence
///
/// Entries found in `canonical` come first in canonical order; anything else
/// follows in its existing order.
pub fn apply_canonical_order(options: Vec<String>, canonical: &[&str]) -> Vec<String> {
    let mut ordered: Vec<String> = canonical
        .iter()
        .filter(|c| options.iter().any(|o| o == *c))
        .map(|c| c.to_string())
        .collect();

    ordered.extend(
        options
            .into_iter()
            .filter(|o| !canonical.contains(&o.as_str())),
    );
    ordered
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Loads option lists and caches them by location
///
/// Clones share the HTTP client and the cache.
#[derive(Clone)]
pub struct OptionLoader {
    client: Client,
    cache: Arc<DashMap<String, Arc<Vec<String>>>>,
}

impl OptionLoader {
    /// Create a loader whose HTTP requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            cache: Arc::new(DashMap::new()),
        })
    }

    /// Load the option list at `location`, serving repeats from the cache
    pub async fn load(&self, location: &str) -> Result<Arc<Vec<String>>, OptionsError> {
        if let Some(cached) = self.cache.get(location) {
            debug!(location, "Option list served from cache");
            return Ok(Arc::clone(&cached));
        }

        let text = self.fetch_text(location).await?;
        let options = Arc::new(parse_options(&text));
        debug!(location, count = options.len(), "Loaded option list");

        self.cache
            .insert(location.to_string(), Arc::clone(&options));
        Ok(options)
    }

    /// Drop every cached list
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_locations(&self) -> usize {
        self.cache.len()
    }

    async fn fetch_text(&self, location: &str) -> Result<String, OptionsError> {
        if !is_remote(location) {
            return tokio::fs::read_to_string(location)
                .await
                .map_err(|source| OptionsError::Io {
                    location: location.to_string(),
                    source,
                });
        }

        let http_err = |source| OptionsError::Http {
            location: location.to_string(),
            source,
        };

        let response = self.client.get(location).send().await.map_err(http_err)?;
        if !response.status().is_success() {
            return Err(OptionsError::Status {
                location: location.to_string(),
                status: response.status().as_u16(),
            });
        }
        response.text().await.map_err(http_err)
    }
}
