//! Module name to installable package resolution
//!
//! Three tiers, applied in order to a pool of unresolved module names:
//!
//! 1. Local metadata: installed distributions claim the modules they provide.
//!    The first claim wins and removes the module from the pool.
//! 2. Standard library: remaining names shipped with the interpreter need no package.
//! 3. Registry lookup: whatever is left is looked up on the package index. A miss or
//!    a network failure leaves the module unresolved, without retry.
//!
//! Resolution never fails as a whole; it trades completeness for availability.

pub mod registry;
pub mod site_packages;
pub mod stdlib;

pub use registry::{registry_name, PackageIndex, PypiIndex, RegistryError};
pub use site_packages::{interpreter_site_packages, read_distributions, Distribution};
pub use stdlib::StandardLibrary;

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome for one top-level module
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Installable distribution name
    Package(String),
    /// Part of the standard library, no package needed
    StandardLibrary,
    /// Not found locally or on the index
    Unresolved,
}

impl Serialize for Resolution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Resolution::Package(name) => serializer.serialize_str(name),
            Resolution::StandardLibrary => serializer.serialize_str("<standard-library>"),
            Resolution::Unresolved => serializer.serialize_str("<unresolved>"),
        }
    }
}

/// Module name → resolution, ordered by module name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PackageMapping {
    entries: BTreeMap<String, Resolution>,
}

impl PackageMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: impl Into<String>, resolution: Resolution) {
        self.entries.insert(module.into(), resolution);
    }

    pub fn get(&self, module: &str) -> Option<&Resolution> {
        self.entries.get(module)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Resolution)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct package names, sorted
    pub fn packages(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .filter_map(|r| match r {
                Resolution::Package(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn unresolved(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, r)| **r == Resolution::Unresolved)
            .map(|(m, _)| m.as_str())
            .collect()
    }

    /// Newline separated package names; the input of the locker
    pub fn requirement_list(&self) -> String {
        self.packages().into_iter().collect::<Vec<_>>().join("\n")
    }
}

pub struct PackageResolver {
    distributions: Vec<Distribution>,
    stdlib: StandardLibrary,
    index: Arc<dyn PackageIndex>,
}

impl PackageResolver {
    pub fn new(
        distributions: Vec<Distribution>,
        stdlib: StandardLibrary,
        index: Arc<dyn PackageIndex>,
    ) -> Self {
        Self {
            distributions,
            stdlib,
            index,
        }
    }

    pub async fn resolve(&self, modules: &BTreeSet<String>) -> PackageMapping {
        let mut mapping = PackageMapping::new();
        let mut pool: BTreeSet<String> = modules.clone();

        for distribution in &self.distributions {
            for module in &distribution.top_level {
                if pool.remove(module) {
                    debug!(module = %module, package = %distribution.name, "Resolved from local metadata");
                    mapping.insert(module.clone(), Resolution::Package(distribution.name.clone()));
                }
            }
            if pool.is_empty() {
                break;
            }
        }
        let local = mapping.len();

        let mut stdlib = 0;
        let mut registry = 0;
        for module in pool {
            if self.stdlib.contains(&module) {
                mapping.insert(module, Resolution::StandardLibrary);
                stdlib += 1;
                continue;
            }

            let name = registry_name(&module);
            let resolution = match self.index.exists(&name).await {
                Ok(true) => {
                    registry += 1;
                    Resolution::Package(name)
                }
                Ok(false) => {
                    debug!(module = %module, "Not found on registry");
                    Resolution::Unresolved
                }
                Err(e) => {
                    warn!(module = %module, error = %e, "Registry lookup failed, leaving unresolved");
                    Resolution::Unresolved
                }
            };
            mapping.insert(module, resolution);
        }

        info!(
            modules = modules.len(),
            local,
            stdlib,
            registry,
            unresolved = mapping.unresolved().len(),
            "Package resolution complete"
        );
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Index double answering from a fixed set and recording lookups
    struct StaticIndex {
        known: BTreeSet<String>,
        fail: BTreeSet<String>,
        lookups: Mutex<Vec<String>>,
    }

    impl StaticIndex {
        fn new(known: &[&str], fail: &[&str]) -> Self {
            Self {
                known: known.iter().map(|s| s.to_string()).collect(),
                fail: fail.iter().map(|s| s.to_string()).collect(),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PackageIndex for StaticIndex {
        async fn exists(&self, name: &str) -> Result<bool, RegistryError> {
            self.lookups.lock().unwrap().push(name.to_string());
            if self.fail.contains(name) {
                return Err(RegistryError::Request {
                    name: name.to_string(),
                    message: "connection reset".to_string(),
                });
            }
            Ok(self.known.contains(name))
        }
    }

    fn modules(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn dist(name: &str, top_level: &[&str]) -> Distribution {
        Distribution {
            name: name.to_string(),
            top_level: modules(top_level),
        }
    }

    #[tokio::test]
    async fn test_three_tiers() {
        let index = Arc::new(StaticIndex::new(&["numpy"], &[]));
        let resolver = PackageResolver::new(
            vec![dist("PyYAML", &["yaml"])],
            StandardLibrary::embedded(),
            index.clone(),
        );

        let mapping = resolver
            .resolve(&modules(&["numpy", "os", "yaml", "mylocalhelpers"]))
            .await;

        assert_eq!(mapping.get("yaml"), Some(&Resolution::Package("PyYAML".to_string())));
        assert_eq!(mapping.get("os"), Some(&Resolution::StandardLibrary));
        assert_eq!(mapping.get("numpy"), Some(&Resolution::Package("numpy".to_string())));
        assert_eq!(mapping.get("mylocalhelpers"), Some(&Resolution::Unresolved));
        assert_eq!(mapping.requirement_list(), "PyYAML\nnumpy");
        assert_eq!(
            *index.lookups.lock().unwrap(),
            vec!["mylocalhelpers".to_string(), "numpy".to_string()]
        );
    }

    #[tokio::test]
    async fn test_first_local_claim_wins() {
        let resolver = PackageResolver::new(
            vec![dist("attrs", &["attr"]), dist("attr", &["attr"])],
            StandardLibrary::embedded(),
            Arc::new(StaticIndex::new(&[], &[])),
        );
        let mapping = resolver.resolve(&modules(&["attr"])).await;
        assert_eq!(mapping.get("attr"), Some(&Resolution::Package("attrs".to_string())));
    }

    #[tokio::test]
    async fn test_local_metadata_beats_stdlib_and_registry() {
        let index = Arc::new(StaticIndex::new(&["typing"], &[]));
        let resolver = PackageResolver::new(
            vec![dist("typing-backport", &["typing"])],
            StandardLibrary::embedded(),
            index.clone(),
        );
        let mapping = resolver.resolve(&modules(&["typing"])).await;
        assert_eq!(
            mapping.get("typing"),
            Some(&Resolution::Package("typing-backport".to_string()))
        );
        assert!(index.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_failure_is_unresolved_not_fatal() {
        let resolver = PackageResolver::new(
            Vec::new(),
            StandardLibrary::embedded(),
            Arc::new(StaticIndex::new(&["flask"], &["requests"])),
        );
        let mapping = resolver.resolve(&modules(&["flask", "requests"])).await;
        assert_eq!(mapping.get("requests"), Some(&Resolution::Unresolved));
        assert_eq!(mapping.requirement_list(), "flask");
    }

    #[tokio::test]
    async fn test_namespace_module_looks_up_hyphenated_name() {
        let index = Arc::new(StaticIndex::new(&["google-generativeai"], &[]));
        let resolver =
            PackageResolver::new(Vec::new(), StandardLibrary::embedded(), index.clone());
        let mapping = resolver.resolve(&modules(&["google.generativeai"])).await;
        assert_eq!(
            mapping.get("google.generativeai"),
            Some(&Resolution::Package("google-generativeai".to_string()))
        );
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let resolver = PackageResolver::new(
            vec![dist("PyYAML", &["yaml"])],
            StandardLibrary::embedded(),
            Arc::new(StaticIndex::new(&["numpy", "pandas"], &[])),
        );
        let input = modules(&["numpy", "pandas", "yaml", "sys", "unknownthing"]);
        let first = resolver.resolve(&input).await;
        let second = resolver.resolve(&input).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_mapping_serializes_as_object() {
        let mut mapping = PackageMapping::new();
        mapping.insert("os", Resolution::StandardLibrary);
        mapping.insert("numpy", Resolution::Package("numpy".to_string()));
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"numpy":"numpy","os":"<standard-library>"}"#);
    }
}
