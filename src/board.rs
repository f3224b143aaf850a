//! Visual model of the quick links grid.
//!
//! The board keeps one slot per link card, in visual order, followed by the
//! fixed "add new" card. Slots are laid out row-major in a grid of
//! `columns` columns, each [`CARD_HEIGHT`] rows tall.

use ratatui::layout::Rect;

use crate::entity::{favicon_url, host_of, Entity, UNNAMED_LINK};
use crate::entity_list::ListView;

pub const CARD_HEIGHT: u16 = 3;
pub const MAX_COLUMNS: u16 = 6;
/// Cards narrower than this do not show the edit/delete controls.
pub const MIN_CONTROL_WIDTH: u16 = 12;

#[derive(Clone, Debug)]
pub struct LinkCard {
    /// Positional identifier: the entity's index in the persisted list.
    pub index: usize,
    pub entity: Entity,
    pub subtitle: String,
    pub label: String,
    pub favicon: Option<String>,
    pub dragging: bool,
}

impl LinkCard {
    fn new(index: usize, entity: Entity) -> Self {
        Self {
            index,
            subtitle: entity.url.clone(),
            label: entity.display_name().to_string(),
            favicon: None,
            dragging: false,
            entity,
        }
    }
}

#[derive(Clone, Debug)]
pub enum SlotKind {
    Link(LinkCard),
    AddNew,
}

#[derive(Clone, Debug)]
pub struct Slot {
    pub kind: SlotKind,
    pub area: Rect,
}

impl Slot {
    pub fn link(&self) -> Option<&LinkCard> {
        match &self.kind {
            SlotKind::Link(card) => Some(card),
            SlotKind::AddNew => None,
        }
    }

    fn link_mut(&mut self) -> Option<&mut LinkCard> {
        match &mut self.kind {
            SlotKind::Link(card) => Some(card),
            SlotKind::AddNew => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardHit {
    Open { slot: usize, index: usize },
    Edit(usize),
    Delete(usize),
    Add,
}

/// Invoked synchronously for every card the board builds.
pub type RenderHook = Box<dyn FnMut(&mut LinkCard)>;

/// Default hook: host subtitle, accessible label and icon address.
pub fn decorate_card(card: &mut LinkCard) {
    card.subtitle = host_of(&card.entity.url).unwrap_or_else(|| card.entity.url.clone());
    card.label = if !card.entity.name.is_empty() {
        card.entity.name.clone()
    } else if !card.entity.url.is_empty() {
        format!("Link to {}", card.entity.url)
    } else {
        UNNAMED_LINK.to_string()
    };
    card.favicon = favicon_url(&card.entity.url);
}

pub struct CardBoard {
    slots: Vec<Slot>,
    columns: u16,
    viewport: Rect,
    on_rendered: Option<RenderHook>,
}

impl CardBoard {
    pub fn new(columns: u16) -> Self {
        Self {
            slots: vec![Slot {
                kind: SlotKind::AddNew,
                area: Rect::default(),
            }],
            columns: columns.clamp(1, MAX_COLUMNS),
            viewport: Rect::default(),
            on_rendered: None,
        }
    }

    pub fn with_hook(mut self, hook: RenderHook) -> Self {
        self.on_rendered = Some(hook);
        self
    }

    pub fn columns(&self) -> u16 {
        self.columns
    }

    pub fn set_columns(&mut self, columns: u16) {
        self.columns = columns.clamp(1, MAX_COLUMNS);
        self.relayout();
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Place the grid inside `area`. Called by the renderer each frame.
    pub fn set_viewport(&mut self, area: Rect) {
        if self.viewport != area {
            self.viewport = area;
            self.relayout();
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn link_cards(&self) -> impl Iterator<Item = &LinkCard> {
        self.slots.iter().filter_map(Slot::link)
    }

    pub fn link_count(&self) -> usize {
        self.link_cards().count()
    }

    pub fn slot_for_index(&self, index: usize) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.link().is_some_and(|card| card.index == index))
    }

    pub fn is_visible(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|slot| {
            slot.area.width > 0
                && slot.area.height > 0
                && slot.area.bottom() <= self.viewport.bottom()
        })
    }

    pub fn slot_at(&self, column: u16, row: u16) -> Option<usize> {
        (0..self.slots.len())
            .find(|&idx| self.is_visible(idx) && contains(self.slots[idx].area, column, row))
    }

    pub fn contains_point(&self, column: u16, row: u16) -> bool {
        contains(self.viewport, column, row)
    }

    /// Resolve a click into the card it landed on, including the edit and
    /// delete controls on a card's middle row.
    pub fn hit(&self, column: u16, row: u16) -> Option<BoardHit> {
        let slot_idx = self.slot_at(column, row)?;
        let slot = &self.slots[slot_idx];
        let card = match &slot.kind {
            SlotKind::AddNew => return Some(BoardHit::Add),
            SlotKind::Link(card) => card,
        };
        let area = slot.area;
        if area.width >= MIN_CONTROL_WIDTH && row == area.y + 1 {
            let rel = column - area.x;
            if (area.width - 6..area.width - 4).contains(&rel) {
                return Some(BoardHit::Edit(card.index));
            }
            if (area.width - 3..area.width - 1).contains(&rel) {
                return Some(BoardHit::Delete(card.index));
            }
        }
        Some(BoardHit::Open {
            slot: slot_idx,
            index: card.index,
        })
    }

    pub fn dragging_slot(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.link().is_some_and(|card| card.dragging))
    }

    pub fn set_dragging(&mut self, slot: usize, dragging: bool) -> bool {
        match self.slots.get_mut(slot).and_then(Slot::link_mut) {
            Some(card) => {
                card.dragging = dragging;
                true
            }
            None => false,
        }
    }

    pub fn clear_dragging(&mut self) {
        for card in self.slots.iter_mut().filter_map(Slot::link_mut) {
            card.dragging = false;
        }
    }

    /// Position of the dragged card among link cards only.
    pub fn dragging_position(&self) -> Option<usize> {
        self.link_cards().position(|card| card.dragging)
    }

    /// Move the slot at `from` so it sits right before `before`. With no
    /// target it goes to the tail, ahead of the add card.
    pub fn move_before(&mut self, from: usize, before: Option<usize>) {
        if from >= self.slots.len() || before == Some(from) {
            return;
        }
        let slot = self.slots.remove(from);
        let target = match before {
            Some(before) if before > from => before - 1,
            Some(before) => before,
            None => self
                .slots
                .iter()
                .position(|slot| matches!(slot.kind, SlotKind::AddNew))
                .unwrap_or(self.slots.len()),
        };
        self.slots.insert(target.min(self.slots.len()), slot);
        self.relayout();
    }

    fn relayout(&mut self) {
        let columns = self.columns.max(1);
        let width = self.viewport.width / columns;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            let col = (idx as u16) % columns;
            let row = u16::try_from(idx / columns as usize).unwrap_or(u16::MAX);
            let y = self
                .viewport
                .y
                .saturating_add(row.saturating_mul(CARD_HEIGHT));
            slot.area = Rect::new(
                self.viewport.x + col * width,
                y,
                width,
                if y >= self.viewport.bottom() { 0 } else { CARD_HEIGHT },
            );
        }
    }
}

impl ListView for CardBoard {
    fn refresh(&mut self, entities: &[Entity]) {
        let mut slots = Vec::with_capacity(entities.len() + 1);
        for (index, entity) in entities.iter().enumerate() {
            let mut card = LinkCard::new(index, entity.clone());
            if let Some(hook) = self.on_rendered.as_mut() {
                hook(&mut card);
            }
            slots.push(Slot {
                kind: SlotKind::Link(card),
                area: Rect::default(),
            });
        }
        slots.push(Slot {
            kind: SlotKind::AddNew,
            area: Rect::default(),
        });
        self.slots = slots;
        self.relayout();
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn board(names: &[&str], columns: u16) -> CardBoard {
        let mut board = CardBoard::new(columns);
        let entities: Vec<Entity> = names
            .iter()
            .map(|name| Entity::new(format!("{}.com", name.to_lowercase()), *name))
            .collect();
        board.refresh(&entities);
        board.set_viewport(Rect::new(0, 0, 40, 30));
        board
    }

    fn names(board: &CardBoard) -> Vec<String> {
        board.link_cards().map(|c| c.entity.name.clone()).collect()
    }

    #[test]
    fn refresh_appends_trailing_add_card() {
        let board = board(&["A", "B"], 1);
        assert_eq!(board.slots().len(), 3);
        assert!(matches!(board.slots()[2].kind, SlotKind::AddNew));
        let indices: Vec<usize> = board.link_cards().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn single_column_stacks_cards() {
        let board = board(&["A", "B"], 1);
        assert_eq!(board.slots()[0].area, Rect::new(0, 0, 40, 3));
        assert_eq!(board.slots()[1].area, Rect::new(0, 3, 40, 3));
        assert_eq!(board.slots()[2].area, Rect::new(0, 6, 40, 3));
    }

    #[test]
    fn grid_wraps_by_columns() {
        let board = board(&["A", "B", "C"], 2);
        assert_eq!(board.slots()[1].area, Rect::new(20, 0, 20, 3));
        assert_eq!(board.slots()[2].area, Rect::new(0, 3, 20, 3));
    }

    #[test]
    fn hit_resolves_controls() {
        let board = board(&["A"], 1);
        assert_eq!(
            board.hit(5, 1),
            Some(BoardHit::Open { slot: 0, index: 0 })
        );
        assert_eq!(board.hit(34, 1), Some(BoardHit::Edit(0)));
        assert_eq!(board.hit(37, 1), Some(BoardHit::Delete(0)));
        assert_eq!(board.hit(2, 4), Some(BoardHit::Add));
        assert_eq!(board.hit(2, 20), None);
    }

    #[test]
    fn move_before_tail_keeps_add_card_last() {
        let mut board = board(&["A", "B", "C"], 1);
        board.move_before(0, None);
        assert_eq!(names(&board), ["B", "C", "A"]);
        assert!(matches!(board.slots()[3].kind, SlotKind::AddNew));
    }

    #[test]
    fn move_before_earlier_and_later_targets() {
        let mut board = board(&["A", "B", "C"], 1);
        board.move_before(2, Some(0));
        assert_eq!(names(&board), ["C", "A", "B"]);
        board.move_before(0, Some(2));
        assert_eq!(names(&board), ["A", "C", "B"]);
    }

    #[test]
    fn dragging_position_ignores_add_card() {
        let mut board = board(&["A", "B"], 1);
        assert!(board.set_dragging(1, true));
        assert!(!board.set_dragging(2, true));
        assert_eq!(board.dragging_slot(), Some(1));
        assert_eq!(board.dragging_position(), Some(1));
        board.clear_dragging();
        assert_eq!(board.dragging_slot(), None);
    }

    #[test]
    fn hook_runs_for_every_card() {
        let seen = Rc::new(Cell::new(0));
        let counter = seen.clone();
        let mut board = CardBoard::new(1).with_hook(Box::new(move |card| {
            counter.set(counter.get() + 1);
            decorate_card(card);
        }));
        board.refresh(&[
            Entity::new("https://docs.rs/serde", "Serde"),
            Entity::new("example.org", ""),
        ]);
        assert_eq!(seen.get(), 2);
        let cards: Vec<&LinkCard> = board.link_cards().collect();
        assert_eq!(cards[0].subtitle, "docs.rs");
        assert_eq!(cards[1].label, "Link to example.org");
    }

    #[test]
    fn cards_below_viewport_are_not_hit() {
        let mut board = board(&["A", "B", "C"], 1);
        board.set_viewport(Rect::new(0, 0, 40, 5));
        assert!(board.is_visible(0));
        assert!(!board.is_visible(1));
        assert_eq!(board.slot_at(1, 4), None);
    }
}
