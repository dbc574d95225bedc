use ahash::AHashMap;
use dashmap::DashMap;
use std::sync::Arc;

use crate::simulation::id::serializable_type::StableTypeId;
use crate::simulation::id::Id;

#[derive(Debug)]
pub struct UntypedId {
    pub(crate) internal: u64,
    pub(crate) external: String,
}

impl UntypedId {
    pub(crate) fn new(internal: u64, external: String) -> Self {
        Self { internal, external }
    }
}

/// All ids of one stable type. Holding both the dense vec and the reverse mapping in one value
/// means that a single shard lock of the outer map guards creation of new ids.
#[derive(Debug, Default)]
struct TypedIds {
    ids: Vec<Arc<UntypedId>>,
    mapping: AHashMap<String, u64>,
}

#[derive(Debug)]
pub struct IdStore {
    ids: DashMap<u64, TypedIds>,
}

/// Cache for ids. All methods are public, so that they can be used from mod.rs. The module doesn't
/// export this module, so that everything is kept package private
impl IdStore {
    pub fn new() -> Self {
        Self {
            ids: DashMap::default(),
        }
    }

    fn create_id_with_type_id(&self, id: &str, type_id: u64) -> Arc<UntypedId> {
        let mut typed = self.ids.entry(type_id).or_default();

        // First check if the ID already exists
        if let Some(internal) = typed.mapping.get(id) {
            return typed.ids[*internal as usize].clone();
        }

        // If not, create a new one
        let next_internal = typed.ids.len() as u64;
        let next_id = Arc::new(UntypedId::new(next_internal, String::from(id)));
        typed.ids.push(next_id.clone());
        typed.mapping.insert(String::from(id), next_internal);

        next_id
    }

    pub(crate) fn create_id<T: StableTypeId + 'static>(&self, id: &str) -> Id<T> {
        let type_id = T::stable_type_id();
        Id::new(self.create_id_with_type_id(id, type_id))
    }

    pub(crate) fn get<T: StableTypeId + 'static>(&self, internal: u64) -> Id<T> {
        let type_id = T::stable_type_id();
        let typed = self.ids.get(&type_id).unwrap_or_else(|| {
            panic!("No ids for type {type_id:?}. Use Id::create::<T>(...) to create ids")
        });

        let untyped_id = typed
            .ids
            .get(internal as usize)
            .unwrap_or_else(|| panic!("No id found for internal {internal}"))
            .clone();
        Id::new(untyped_id)
    }

    pub(crate) fn try_get_from_ext<T: StableTypeId + 'static>(
        &self,
        external: &str,
    ) -> Option<Id<T>> {
        let type_id = T::stable_type_id();
        let typed = self.ids.get(&type_id)?;
        let index = typed.mapping.get(external)?;
        Some(Id::new(typed.ids[*index as usize].clone()))
    }

    pub(crate) fn get_from_ext<T: StableTypeId + 'static>(&self, external: &str) -> Id<T> {
        self.try_get_from_ext(external)
            .unwrap_or_else(|| panic!("Could not find id for external id: {external}"))
    }
}
