//! Drag-and-drop reordering of the quick links board.
//!
//! While a drag is in progress only the board's visual order changes. The
//! persisted list is touched once, on drop, after the new order has been
//! computed in memory.

use crate::board::{CardBoard, SlotKind};
use crate::entity_list::EntityList;
use crate::error::ReorderError;
use crate::store::StorageBackend;

/// State of one drag gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DragSession {
    pub original_index: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of a successful drop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commit {
    pub from: usize,
    pub to: usize,
}

#[derive(Debug, Default)]
pub struct ReorderController {
    state: DragState,
}

impl ReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    /// Begin dragging the card in `slot`. The add card and empty slots are
    /// refused.
    pub fn drag_start(&mut self, board: &mut CardBoard, slot: usize) -> bool {
        let Some(index) = board.slots().get(slot).and_then(|s| s.link()).map(|c| c.index) else {
            return false;
        };
        board.clear_dragging();
        board.set_dragging(slot, true);
        self.state = DragState::Dragging(DragSession {
            original_index: index,
        });
        log::debug!("drag started on link {index}");
        true
    }

    /// Live preview: move the dragged card in front of the insertion point
    /// for `pointer_y`. No data changes.
    pub fn drag_move(&mut self, board: &mut CardBoard, pointer_y: u16) {
        if !self.is_dragging() {
            return;
        }
        let Some(dragged) = board.dragging_slot() else {
            return;
        };
        let before = insertion_point(board, pointer_y);
        board.move_before(dragged, before);
    }

    /// Commit the preview order. Any inconsistency aborts the commit, logs
    /// it and leaves the persisted list untouched.
    pub fn drop<B: StorageBackend>(
        &mut self,
        list: &mut EntityList<B, CardBoard>,
    ) -> Result<Commit, ReorderError> {
        let state = std::mem::take(&mut self.state);
        let result = Self::commit(state, list);
        list.view_mut().clear_dragging();
        if let Err(err) = &result {
            log::error!("Error during drop: {err}");
        }
        result
    }

    fn commit<B: StorageBackend>(
        state: DragState,
        list: &mut EntityList<B, CardBoard>,
    ) -> Result<Commit, ReorderError> {
        let DragState::Dragging(session) = state else {
            return Err(ReorderError::NoSession);
        };
        let mut entities = list.list();
        let from = session.original_index;
        if from >= entities.len() {
            return Err(ReorderError::StaleIndex {
                index: from,
                len: entities.len(),
            });
        }
        let visual = list.view().link_count();
        if visual != entities.len() {
            return Err(ReorderError::CountMismatch {
                visual,
                persisted: entities.len(),
            });
        }
        let to = list
            .view()
            .dragging_position()
            .ok_or(ReorderError::DraggedCardMissing)?;

        let moved = entities.remove(from);
        entities.insert(to.min(entities.len()), moved);
        // The refresh triggered here rebuilds every card with its new index.
        list.reorder(entities);
        log::info!("moved link {from} to {to}");
        Ok(Commit { from, to })
    }

    /// Abandon the gesture. The board may keep its previewed order until the
    /// next refresh.
    pub fn cancel(&mut self, board: &mut CardBoard) {
        if let DragState::Dragging(session) = std::mem::take(&mut self.state) {
            log::debug!("drag of link {} cancelled", session.original_index);
        }
        board.clear_dragging();
    }
}

/// Slot the dragged card should be placed before: the non-dragging link card
/// whose vertical midpoint is closest below `pointer_y`. Exact ties keep the
/// first card in visual order. `None` means the tail of the list.
pub fn insertion_point(board: &CardBoard, pointer_y: u16) -> Option<usize> {
    let mut closest: Option<(usize, f32)> = None;
    for (idx, slot) in board.slots().iter().enumerate() {
        let SlotKind::Link(card) = &slot.kind else {
            continue;
        };
        if card.dragging {
            continue;
        }
        let offset =
            f32::from(pointer_y) - f32::from(slot.area.y) - f32::from(slot.area.height) / 2.0;
        let closer = match closest {
            Some((_, best)) => offset > best,
            None => true,
        };
        if offset < 0.0 && closer {
            closest = Some((idx, offset));
        }
    }
    closest.map(|(idx, _)| idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::store::{MemoryBackend, Store};
    use ratatui::layout::Rect;

    fn setup(names: &[&str]) -> EntityList<MemoryBackend, CardBoard> {
        let store = Store::new(MemoryBackend::new());
        let entities: Vec<Entity> = names
            .iter()
            .map(|name| Entity::new(format!("{}.com", name.to_lowercase()), *name))
            .collect();
        store.set_as("links", &entities);
        let mut list = EntityList::new(store, "links", CardBoard::new(1));
        list.render();
        list.view_mut().set_viewport(Rect::new(0, 0, 40, 30));
        list
    }

    fn persisted(list: &EntityList<MemoryBackend, CardBoard>) -> Vec<String> {
        list.list().into_iter().map(|e| e.name).collect()
    }

    fn visual(list: &EntityList<MemoryBackend, CardBoard>) -> Vec<String> {
        list.view()
            .link_cards()
            .map(|c| c.entity.name.clone())
            .collect()
    }

    #[test]
    fn drag_first_to_end() {
        let mut list = setup(&["A", "B", "C"]);
        let mut ctl = ReorderController::new();
        assert!(ctl.drag_start(list.view_mut(), 0));
        ctl.drag_move(list.view_mut(), 10);
        assert_eq!(visual(&list), ["B", "C", "A"]);
        assert_eq!(persisted(&list), ["A", "B", "C"]);

        let commit = ctl.drop(&mut list).unwrap();
        assert_eq!(commit, Commit { from: 0, to: 2 });
        assert_eq!(persisted(&list), ["B", "C", "A"]);
        assert_eq!(ctl.state(), DragState::Idle);
    }

    #[test]
    fn drop_renumbers_cards() {
        let mut list = setup(&["A", "B", "C"]);
        let mut ctl = ReorderController::new();
        ctl.drag_start(list.view_mut(), 2);
        ctl.drag_move(list.view_mut(), 0);
        ctl.drop(&mut list).unwrap();
        assert_eq!(persisted(&list), ["C", "A", "B"]);
        let indices: Vec<usize> = list.view().link_cards().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(list.view().dragging_slot(), None);
    }

    #[test]
    fn add_card_cannot_be_dragged() {
        let mut list = setup(&["A"]);
        let mut ctl = ReorderController::new();
        assert!(!ctl.drag_start(list.view_mut(), 1));
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn insertion_point_prefers_closest_card_below_pointer() {
        let list = setup(&["A", "B", "C"]);
        // Midpoints sit at 1.5, 4.5 and 7.5.
        assert_eq!(insertion_point(list.view(), 0), Some(0));
        assert_eq!(insertion_point(list.view(), 2), Some(1));
        assert_eq!(insertion_point(list.view(), 5), Some(2));
        assert_eq!(insertion_point(list.view(), 8), None);
    }

    #[test]
    fn insertion_point_ties_go_to_first_card() {
        let store = Store::new(MemoryBackend::new());
        let mut list = EntityList::new(store, "links", CardBoard::new(2));
        for name in ["A", "B", "C", "D"] {
            list.add(Entity::new("x.com", name));
        }
        list.view_mut().set_viewport(Rect::new(0, 0, 40, 30));
        // C and D share a row, so their midpoints tie.
        assert_eq!(insertion_point(list.view(), 4), Some(2));
    }

    #[test]
    fn drop_without_session_is_rejected() {
        let mut list = setup(&["A", "B"]);
        let mut ctl = ReorderController::new();
        assert_eq!(ctl.drop(&mut list), Err(ReorderError::NoSession));
        assert_eq!(persisted(&list), ["A", "B"]);
    }

    #[test]
    fn stale_index_aborts_without_mutation() {
        let mut list = setup(&["A", "B", "C"]);
        let mut ctl = ReorderController::new();
        ctl.drag_start(list.view_mut(), 2);
        // Another writer shrank the list behind the board's back.
        overwrite(&list, &[Entity::new("a.com", "A")]);

        let err = ctl.drop(&mut list).unwrap_err();
        assert_eq!(err, ReorderError::StaleIndex { index: 2, len: 1 });
        assert_eq!(persisted(&list), ["A"]);
        assert!(!ctl.is_dragging());
    }

    #[test]
    fn count_mismatch_aborts_without_mutation() {
        let mut list = setup(&["A", "B", "C"]);
        let mut ctl = ReorderController::new();
        ctl.drag_start(list.view_mut(), 0);
        let grown = vec![
            Entity::new("a.com", "A"),
            Entity::new("b.com", "B"),
            Entity::new("c.com", "C"),
            Entity::new("d.com", "D"),
        ];
        overwrite(&list, &grown);
        let err = ctl.drop(&mut list).unwrap_err();
        assert_eq!(
            err,
            ReorderError::CountMismatch {
                visual: 3,
                persisted: 4
            }
        );
        assert_eq!(persisted(&list), ["A", "B", "C", "D"]);
    }

    #[test]
    fn cancel_leaves_persisted_order() {
        let mut list = setup(&["A", "B", "C"]);
        let mut ctl = ReorderController::new();
        ctl.drag_start(list.view_mut(), 0);
        ctl.drag_move(list.view_mut(), 10);
        ctl.cancel(list.view_mut());
        assert!(!ctl.is_dragging());
        assert_eq!(persisted(&list), ["A", "B", "C"]);
        // Preview order lingers until the next refresh.
        assert_eq!(visual(&list), ["B", "C", "A"]);
        list.render();
        assert_eq!(visual(&list), ["A", "B", "C"]);
    }

    #[test]
    fn moves_are_ignored_when_idle() {
        let mut list = setup(&["A", "B"]);
        let mut ctl = ReorderController::new();
        ctl.drag_move(list.view_mut(), 10);
        assert_eq!(visual(&list), ["A", "B"]);
    }

    fn overwrite(list: &EntityList<MemoryBackend, CardBoard>, entities: &[Entity]) {
        list.store().set_as(list.key(), entities);
    }
}
