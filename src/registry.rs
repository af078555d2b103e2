//! Service registry: named definitions and the dependency closure.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::entry::{ProviderFn, ServiceEntry};
use crate::error::{LoomError, LoomResult};

/// The reserved ad-hoc resolver name.
///
/// `"$"` can never be registered as a service; it always denotes the ad-hoc
/// resolver bound to the current construction context.
pub const RESERVED_NAME: &str = "$";

/// One registered service: ordered dependency names, provider, and the
/// transient cycle sentinel.
pub(crate) struct ServiceDefinition {
    name: String,
    dependencies: Vec<String>,
    provider: ProviderFn,
    /// True only while this definition's resolution is in progress. A
    /// re-entrant request while the flag is set is a cycle.
    loading: AtomicBool,
}

impl ServiceDefinition {
    pub(crate) fn new(name: impl Into<String>, entry: ServiceEntry) -> Self {
        let (dependencies, provider) = entry.into_parts();
        Self {
            name: name.into(),
            dependencies,
            provider,
            loading: AtomicBool::new(false),
        }
    }

    /// A throwaway definition for the ad-hoc resolver; never registered.
    pub(crate) fn anonymous(entry: ServiceEntry) -> Self {
        Self::new(RESERVED_NAME, entry)
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub(crate) fn provider(&self) -> ProviderFn {
        self.provider.clone()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub(crate) fn set_loading(&self, value: bool) {
        self.loading.store(value, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct RegistryState {
    services: HashMap<String, Arc<ServiceDefinition>>,
    /// Insertion order, for deterministic service listings.
    order: Vec<String>,
}

/// Exclusive owner of all service definitions.
///
/// Definitions are created during the definition phase and never removed or
/// replaced. The registry stays extensible after construction: builders read
/// it live, so a later `define` is visible to every derived builder and to
/// ad-hoc resolution.
#[derive(Default)]
pub(crate) struct ServiceRegistry {
    state: RwLock<RegistryState>,
}

impl ServiceRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Registers a batch of entries.
    ///
    /// The reserved-name check runs over the whole batch before anything is
    /// inserted. A duplicate name fails on its own registration.
    pub(crate) fn define(
        &self,
        entries: impl IntoIterator<Item = (String, ServiceEntry)>,
    ) -> LoomResult<()> {
        let entries: Vec<(String, ServiceEntry)> = entries.into_iter().collect();
        if let Some((name, _)) = entries.iter().find(|(name, _)| name == RESERVED_NAME) {
            return Err(LoomError::ReservedName(name.clone()));
        }
        for (name, entry) in entries {
            self.register(ServiceDefinition::new(name, entry))?;
        }
        Ok(())
    }

    /// Inserts one definition; fails on a duplicate name. No replacement.
    pub(crate) fn register(&self, definition: ServiceDefinition) -> LoomResult<()> {
        let mut state = self.state.write().unwrap();
        let name = definition.name().to_string();
        if state.services.contains_key(&name) {
            return Err(LoomError::DuplicateService(name));
        }
        tracing::debug!(service = %name, deps = ?definition.dependencies(), "registered service");
        state.order.push(name.clone());
        state.services.insert(name, Arc::new(definition));
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<ServiceDefinition>> {
        self.state.read().unwrap().services.get(name).cloned()
    }

    /// Registered service names in insertion order.
    pub(crate) fn service_names(&self) -> Vec<String> {
        self.state.read().unwrap().order.clone()
    }

    /// The deduplicated union of every definition's dependency names.
    ///
    /// Set semantics: registration order has no effect on this result, which
    /// only feeds the remaining-names computation.
    pub(crate) fn dependency_closure(&self) -> BTreeSet<String> {
        let state = self.state.read().unwrap();
        state
            .services
            .values()
            .flat_map(|def| def.dependencies().iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::ServiceEntry;

    #[test]
    fn closure_is_a_deduplicated_union() {
        let registry = ServiceRegistry::new();
        registry
            .define(vec![
                (
                    "breakfast".to_string(),
                    ServiceEntry::factory(["meat", "egg", "juice"], |_| Ok(())),
                ),
                (
                    "solids".to_string(),
                    ServiceEntry::factory(["meat", "egg"], |_| Ok(())),
                ),
            ])
            .unwrap();

        let closure = registry.dependency_closure();
        let expected: Vec<&str> = vec!["egg", "juice", "meat"];
        assert_eq!(closure.iter().map(String::as_str).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = ServiceRegistry::new();
        registry
            .define(vec![("foo".to_string(), ServiceEntry::value(1usize))])
            .unwrap();
        let err = registry
            .define(vec![("foo".to_string(), ServiceEntry::value(2usize))])
            .unwrap_err();
        assert!(matches!(err, LoomError::DuplicateService(name) if name == "foo"));
    }

    #[test]
    fn reserved_name_rejected_before_any_registration() {
        let registry = ServiceRegistry::new();
        let err = registry
            .define(vec![
                ("foo".to_string(), ServiceEntry::value(1usize)),
                (RESERVED_NAME.to_string(), ServiceEntry::value(2usize)),
            ])
            .unwrap_err();
        assert!(matches!(err, LoomError::ReservedName(_)));
        assert!(registry.get("foo").is_none());
    }
}
