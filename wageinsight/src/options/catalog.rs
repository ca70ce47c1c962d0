//! Option lists for every form field

use super::{OptionLoader, OptionsError, apply_canonical_order};
use crate::fields::FieldKey;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// Selectable values for each field of the form
#[derive(Debug, Clone, Default)]
pub struct OptionCatalog {
    lists: BTreeMap<FieldKey, Vec<String>>,
}

impl OptionCatalog {
    /// Load every field's options, failing on the first resource error
    pub async fn load(loader: &OptionLoader, prefix: &str) -> Result<Self, OptionsError> {
        let mut loaded = BTreeMap::new();
        for (location, result) in fetch_all(loader, prefix).await {
            loaded.insert(location, result?);
        }
        Ok(Self::assemble(prefix, loaded))
    }

    /// Load every field's options, using an empty list where a resource fails
    pub async fn load_lenient(loader: &OptionLoader, prefix: &str) -> Self {
        let mut loaded = BTreeMap::new();
        for (location, result) in fetch_all(loader, prefix).await {
            match result {
                Ok(options) => {
                    loaded.insert(location, options);
                }
                Err(e) => {
                    warn!(location, error = %e, "Option list unavailable, using empty list");
                }
            }
        }
        Self::assemble(prefix, loaded)
    }

    /// Build a catalog directly from known lists
    pub fn from_lists(lists: impl IntoIterator<Item = (FieldKey, Vec<String>)>) -> Self {
        Self {
            lists: lists.into_iter().collect(),
        }
    }

    /// Options for `field`; empty when none are known
    pub fn get(&self, field: FieldKey) -> &[String] {
        self.lists.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: FieldKey, value: &str) -> bool {
        self.get(field).iter().any(|o| o == value)
    }

    pub fn fields(&self) -> impl Iterator<Item = FieldKey> {
        self.lists.keys().copied()
    }

    fn assemble(prefix: &str, loaded: BTreeMap<String, Arc<Vec<String>>>) -> Self {
        let mut lists = BTreeMap::new();

        for field in FieldKey::ALL {
            if let Some([yes, no]) = field.binary_values() {
                lists.insert(field, vec![yes.to_string(), no.to_string()]);
                continue;
            }

            let Some(file) = field.option_file() else {
                continue;
            };
            let options = loaded
                .get(&resolve(prefix, file))
                .map(|o| o.as_ref().clone())
                .unwrap_or_default();

            let options = match field.canonical_order() {
                Some(order) => apply_canonical_order(options, order),
                None => options,
            };
            lists.insert(field, options);
        }

        info!(fields = lists.len(), "Option catalog ready");
        Self { lists }
    }
}

/// Join an option file name onto the configured prefix
pub fn resolve(prefix: &str, file: &str) -> String {
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{prefix}{file}")
    } else {
        format!("{prefix}/{file}")
    }
}

/// Fetch each distinct option resource once, concurrently
async fn fetch_all(
    loader: &OptionLoader,
    prefix: &str,
) -> Vec<(String, Result<Arc<Vec<String>>, OptionsError>)> {
    let locations: BTreeSet<String> = FieldKey::ALL
        .iter()
        .filter_map(|f| f.option_file())
        .map(|file| resolve(prefix, file))
        .collect();

    let mut tasks = JoinSet::new();
    for location in locations {
        let loader = loader.clone();
        tasks.spawn(async move {
            let result = loader.load(&location).await;
            (location, result)
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(entry) => results.push(entry),
            Err(e) => warn!(error = %e, "Option loading task failed"),
        }
    }
    results
}
