use alloc::sync::Arc;
use core::any::TypeId;
use std::sync::RwLock;

use crate::typeid_map::TypeIdMap;

use super::PropertyAccessor;

// -----------------------------------------------------------------------------
// AccessorRegistry

/// The process-lifetime cache of synthesized accessors, one per value type.
///
/// Lookup and installation are safe from any thread. Installation races are
/// resolved first-wins: the accessor already present is kept and the late
/// duplicate is discarded, so every caller observes the same artifact for a
/// given type.
#[derive(Default)]
pub struct AccessorRegistry {
    table: RwLock<TypeIdMap<Arc<dyn PropertyAccessor>>>,
}

impl AccessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the cached accessor for `T`.
    pub fn get<T: 'static>(&self) -> Option<Arc<dyn PropertyAccessor>> {
        self.get_by_id(TypeId::of::<T>())
    }

    /// Looks up the cached accessor for a runtime type id.
    pub fn get_by_id(&self, type_id: TypeId) -> Option<Arc<dyn PropertyAccessor>> {
        let table = self.table.read().unwrap_or_else(|err| err.into_inner());
        table.get(&type_id).cloned()
    }

    /// Installs an accessor for `T`, returning the accessor every caller of
    /// this registry will observe from now on.
    ///
    /// If another accessor for `T` is already installed it wins and the
    /// given one is discarded.
    pub fn install<T: 'static>(
        &self,
        accessor: Arc<dyn PropertyAccessor>,
    ) -> Arc<dyn PropertyAccessor> {
        let mut table = self.table.write().unwrap_or_else(|err| err.into_inner());
        if let Some(existing) = table.get(&TypeId::of::<T>()) {
            log::debug!(
                "accessor for `{}` already installed; discarding duplicate",
                existing.owner()
            );
            return Arc::clone(existing);
        }
        table.insert(TypeId::of::<T>(), Arc::clone(&accessor));
        accessor
    }

    /// Whether an accessor for `T` is installed.
    pub fn contains<T: 'static>(&self) -> bool {
        let table = self.table.read().unwrap_or_else(|err| err.into_inner());
        table.contains(&TypeId::of::<T>())
    }

    /// The number of installed accessors.
    pub fn len(&self) -> usize {
        let table = self.table.read().unwrap_or_else(|err| err.into_inner());
        table.len()
    }

    /// Whether the registry holds no accessors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::TypedAccessor;

    #[test]
    fn install_is_first_wins() {
        let registry = AccessorRegistry::new();
        assert!(registry.get::<u8>().is_none());

        let first = registry.install::<u8>(Arc::new(TypedAccessor::<u8>::empty("u8")));
        let second = registry.install::<u8>(Arc::new(TypedAccessor::<u8>::empty("u8")));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &registry.get::<u8>().unwrap()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_installs_converge_on_one_accessor() {
        let registry = Arc::new(AccessorRegistry::new());

        let installed: Vec<_> = std::thread::scope(|scope| {
            (0..8)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    scope.spawn(move || {
                        registry.install::<u8>(Arc::new(TypedAccessor::<u8>::empty("u8")))
                    })
                })
                .collect::<Vec<_>>()
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .collect()
        });

        assert_eq!(registry.len(), 1);
        let winner = registry.get::<u8>().unwrap();
        for accessor in installed {
            assert!(Arc::ptr_eq(&winner, &accessor));
        }
    }
}
