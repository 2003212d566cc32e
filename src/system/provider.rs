// src/system/provider.rs

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use uuid::Uuid;

use crate::models::BagInstance;

type FactoryFn = Arc<dyn Fn() -> BagInstance + Send + Sync>;

struct ServiceFactory {
    type_name: &'static str,
    build: FactoryFn,
}

/// Startup-time registration of per-type instance factories.
///
/// Populated on a single thread during application configuration, then
/// frozen into a [`ServiceProvider`].
#[derive(Default)]
pub struct ServiceCollection {
    factories: HashMap<TypeId, ServiceFactory>,
}

impl ServiceCollection {
    /// An empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory producing instances of `T`. Re-registering a
    /// type replaces its previous factory.
    pub fn register<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Any + Send,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let type_name = std::any::type_name::<T>();
        let replaced = self.factories.insert(
            TypeId::of::<T>(),
            ServiceFactory {
                type_name,
                build: Arc::new(move || Box::new(factory())),
            },
        );
        if replaced.is_some() {
            log::warn!("Factory for service '{type_name}' was replaced by a later registration.");
        }
        self
    }

    /// Freezes the collection into a shareable, read-only provider.
    pub fn build_provider(self) -> ServiceProvider {
        ServiceProvider {
            inner: Arc::new(ProviderInner {
                factories: self.factories,
                active_scopes: AtomicUsize::new(0),
                scopes_opened: AtomicUsize::new(0),
            }),
        }
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<_> = self.factories.values().map(|fac| fac.type_name).collect();
        f.debug_struct("ServiceCollection")
            .field("services", &names)
            .finish()
    }
}

struct ProviderInner {
    factories: HashMap<TypeId, ServiceFactory>,
    active_scopes: AtomicUsize,
    scopes_opened: AtomicUsize,
}

/// The shared instance provider. Read-only after construction and cheap to
/// clone; every clone counts scopes against the same totals.
#[derive(Clone)]
pub struct ServiceProvider {
    inner: Arc<ProviderInner>,
}

impl ServiceProvider {
    /// Opens a fresh resolution scope for one dispatch.
    pub fn create_scope(&self) -> ServiceScope {
        let id = Uuid::new_v4();
        self.inner.active_scopes.fetch_add(1, Ordering::SeqCst);
        self.inner.scopes_opened.fetch_add(1, Ordering::SeqCst);
        log::debug!("Opened service scope {id}.");
        ServiceScope {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Scopes currently open. Returns to zero once every dispatch has
    /// released its scope.
    pub fn active_scopes(&self) -> usize {
        self.inner.active_scopes.load(Ordering::SeqCst)
    }

    /// Scopes opened over the provider's lifetime.
    pub fn scopes_opened(&self) -> usize {
        self.inner.scopes_opened.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("active_scopes", &self.active_scopes())
            .field("scopes_opened", &self.scopes_opened())
            .finish()
    }
}

/// A per-dispatch resolution scope.
///
/// Instances built through a scope are owned by the dispatch that opened
/// it. Dropping the scope releases it; the resolver holds it across the
/// whole dispatch so release happens on every exit path.
pub struct ServiceScope {
    id: Uuid,
    inner: Arc<ProviderInner>,
}

impl ServiceScope {
    /// This scope's identity, for log correlation.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Builds a fresh instance of the requested type, or `None` when no
    /// factory was registered for it.
    pub fn resolve(&self, type_id: TypeId) -> Option<BagInstance> {
        let factory = self.inner.factories.get(&type_id)?;
        log::debug!(
            "Scope {} created an instance of '{}'.",
            self.id,
            factory.type_name
        );
        Some((factory.build)())
    }

    /// Typed convenience over [`ServiceScope::resolve`].
    pub fn resolve_typed<T: Any + Send>(&self) -> Option<Box<T>> {
        self.resolve(TypeId::of::<T>())
            .and_then(|instance| instance.downcast::<T>().ok())
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        self.inner.active_scopes.fetch_sub(1, Ordering::SeqCst);
        log::debug!("Released service scope {}.", self.id);
    }
}

impl fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceScope").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        start: u64,
    }

    #[test]
    fn test_resolve_builds_fresh_instances() {
        let mut services = ServiceCollection::new();
        services.register(|| Counter { start: 7 });
        let provider = services.build_provider();

        let scope = provider.create_scope();
        let first = scope.resolve_typed::<Counter>().unwrap();
        let second = scope.resolve_typed::<Counter>().unwrap();
        assert_eq!(first.start, 7);
        assert_eq!(second.start, 7);
    }

    #[test]
    fn test_unregistered_type_resolves_to_none() {
        let provider = ServiceCollection::new().build_provider();
        let scope = provider.create_scope();
        assert!(scope.resolve_typed::<Counter>().is_none());
        assert!(scope.resolve(TypeId::of::<String>()).is_none());
    }

    #[test]
    fn test_scope_counters_track_open_and_release() {
        let provider = ServiceCollection::new().build_provider();
        assert_eq!(provider.active_scopes(), 0);

        let outer = provider.create_scope();
        let inner = provider.create_scope();
        assert_ne!(outer.id(), inner.id());
        assert_eq!(provider.active_scopes(), 2);

        drop(inner);
        assert_eq!(provider.active_scopes(), 1);
        drop(outer);
        assert_eq!(provider.active_scopes(), 0);
        assert_eq!(provider.scopes_opened(), 2);
    }

    #[test]
    fn test_reregistration_replaces_factory() {
        let mut services = ServiceCollection::new();
        services.register(|| Counter { start: 1 });
        services.register(|| Counter { start: 2 });
        let provider = services.build_provider();

        let scope = provider.create_scope();
        assert_eq!(scope.resolve_typed::<Counter>().unwrap().start, 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let provider = ServiceCollection::new().build_provider();
        let clone = provider.clone();
        let scope = clone.create_scope();
        assert_eq!(provider.active_scopes(), 1);
        drop(scope);
        assert_eq!(provider.active_scopes(), 0);
    }
}
