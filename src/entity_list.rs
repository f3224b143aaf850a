//! The persisted, ordered list of quick links.
//!
//! Every operation loads the list fresh from the store, and every mutation
//! writes the whole list back and refreshes the attached view before
//! returning.

use crate::entity::{Entity, EntityPatch};
use crate::error::ListError;
use crate::store::{StorageBackend, Store};

/// Receives the full persisted order after every mutation.
pub trait ListView {
    fn refresh(&mut self, entities: &[Entity]);
}

impl ListView for () {
    fn refresh(&mut self, _entities: &[Entity]) {}
}

pub struct EntityList<B, V> {
    store: Store<B>,
    key: String,
    view: V,
}

impl<B: StorageBackend, V: ListView> EntityList<B, V> {
    pub fn new(store: Store<B>, key: impl Into<String>, view: V) -> Self {
        Self {
            store,
            key: key.into(),
            view,
        }
    }

    pub fn store(&self) -> &Store<B> {
        &self.store
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Current persisted order. The returned vector is the caller's to mutate.
    pub fn list(&self) -> Vec<Entity> {
        self.store.get_as(&self.key, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Entity> {
        self.list().into_iter().nth(index)
    }

    pub fn add(&mut self, entity: Entity) {
        let mut entities = self.list();
        entities.push(entity);
        self.save(entities);
    }

    pub fn update(&mut self, index: usize, patch: EntityPatch) -> Result<(), ListError> {
        let mut entities = self.list();
        let len = entities.len();
        let Some(entity) = entities.get_mut(index) else {
            log::error!("Invalid index {index} for update (len {len})");
            return Err(ListError::OutOfBounds { index, len });
        };
        entity.merge(patch);
        self.save(entities);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<Entity, ListError> {
        let mut entities = self.list();
        let len = entities.len();
        if index >= len {
            log::error!("Invalid index {index} for remove (len {len})");
            return Err(ListError::OutOfBounds { index, len });
        }
        let removed = entities.remove(index);
        self.save(entities);
        Ok(removed)
    }

    pub fn reorder(&mut self, new_order: Vec<Entity>) {
        self.save(new_order);
    }

    /// Full overwrite, used by import.
    pub fn replace_all(&mut self, entities: Vec<Entity>) {
        self.save(entities);
    }

    /// Rebuild the view from persisted order.
    pub fn render(&mut self) {
        let entities = self.list();
        self.view.refresh(&entities);
    }

    fn save(&mut self, entities: Vec<Entity>) {
        self.store.set_as(&self.key, &entities);
        self.render();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryBackend;

    #[derive(Default)]
    struct CountingView {
        refreshes: usize,
        last: Vec<Entity>,
    }

    impl ListView for CountingView {
        fn refresh(&mut self, entities: &[Entity]) {
            self.refreshes += 1;
            self.last = entities.to_vec();
        }
    }

    fn list_with(entities: &[(&str, &str)]) -> EntityList<MemoryBackend, CountingView> {
        let store = Store::new(MemoryBackend::new());
        let entities: Vec<Entity> = entities
            .iter()
            .map(|(url, name)| Entity::new(*url, *name))
            .collect();
        store.set_as("links", &entities);
        EntityList::new(store, "links", CountingView::default())
    }

    #[test]
    fn add_appends_and_renders() {
        let mut list = list_with(&[]);
        list.add(Entity::new("a.com", "A"));
        list.add(Entity::new("b.com", "B"));
        assert_eq!(
            list.list(),
            vec![Entity::new("a.com", "A"), Entity::new("b.com", "B")]
        );
        assert_eq!(list.view().refreshes, 2);
        assert_eq!(list.view().last, list.list());
    }

    #[test]
    fn duplicates_are_allowed() {
        let mut list = list_with(&[("a.com", "A")]);
        list.add(Entity::new("a.com", "A"));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn update_merges_in_place() {
        let mut list = list_with(&[("a.com", "A"), ("b.com", "B")]);
        list.update(1, EntityPatch::url("bee.com")).unwrap();
        assert_eq!(list.get(1), Some(Entity::new("bee.com", "B")));
        assert_eq!(list.get(0), Some(Entity::new("a.com", "A")));
    }

    #[test]
    fn update_out_of_range_changes_nothing() {
        let mut list = list_with(&[("a.com", "A")]);
        let before = list.list();
        let err = list.update(1, EntityPatch::name("Nope")).unwrap_err();
        assert_eq!(err, ListError::OutOfBounds { index: 1, len: 1 });
        assert_eq!(list.list(), before);
        assert_eq!(list.view().refreshes, 0);
    }

    #[test]
    fn remove_shifts_following_entries() {
        let mut list = list_with(&[("a.com", "A"), ("b.com", "B"), ("c.com", "C")]);
        let removed = list.remove(0).unwrap();
        assert_eq!(removed.name, "A");
        let names: Vec<_> = list.list().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["B", "C"]);
    }

    #[test]
    fn remove_out_of_range_changes_nothing() {
        let mut list = list_with(&[("a.com", "A")]);
        assert!(list.remove(5).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn list_returns_an_independent_copy() {
        let list = list_with(&[("a.com", "A")]);
        let mut copy = list.list();
        copy.clear();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn reorder_persists_the_given_order() {
        let mut list = list_with(&[("a.com", "A"), ("b.com", "B")]);
        let mut order = list.list();
        order.reverse();
        list.reorder(order.clone());
        assert_eq!(list.list(), order);
        assert_eq!(list.view().last, order);
    }

    #[test]
    fn corrupt_slot_reads_as_empty() {
        let backend = MemoryBackend::new();
        backend.insert_raw("links", "{broken");
        let list = EntityList::new(Store::new(backend.clone()), "links", ());
        assert!(list.is_empty());
        assert_eq!(backend.raw("links"), None);
    }
}
