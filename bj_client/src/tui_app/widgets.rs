//! Stateful building blocks for the terminal UI.

use ratatui::widgets::{ListItem, ListState, ScrollbarState};
use std::collections::VecDeque;

/// A bounded list rendered bottom-to-top, newest item first.
pub struct ScrollableList {
    pub list_items: VecDeque<ListItem<'static>>,
    pub list_state: ListState,
    pub scroll_state: ScrollbarState,
    max_list_items: usize,
}

impl ScrollableList {
    pub fn new(max_list_items: usize) -> Self {
        Self {
            list_items: VecDeque::with_capacity(max_list_items),
            list_state: ListState::default(),
            scroll_state: ScrollbarState::new(0),
            max_list_items,
        }
    }

    pub fn push(&mut self, item: ListItem<'static>) {
        if self.list_items.len() == self.max_list_items {
            self.list_items.pop_back();
        }
        self.list_items.push_front(item);
        self.scroll_state = self.scroll_state.content_length(self.list_items.len());
        self.jump_to_last();
    }

    /// Select the oldest item, drawn at the top.
    pub fn jump_to_first(&mut self) {
        self.select(self.list_items.len().saturating_sub(1));
    }

    /// Select the newest item, drawn at the bottom.
    pub fn jump_to_last(&mut self) {
        self.select(0);
    }

    pub fn move_up(&mut self) {
        let idx = self.list_state.selected().map_or(0, |idx| idx + 1);
        self.select(idx.min(self.list_items.len().saturating_sub(1)));
    }

    pub fn move_down(&mut self) {
        let idx = self
            .list_state
            .selected()
            .map_or(0, |idx| idx.saturating_sub(1));
        self.select(idx);
    }

    fn select(&mut self, idx: usize) {
        if self.list_items.is_empty() {
            return;
        }
        self.list_state.select(Some(idx));
        // The scrollbar counts from the top, the list from the bottom.
        let position = self.list_items.len() - 1 - idx;
        self.scroll_state = self.scroll_state.position(position);
    }
}

/// Single-line text input with a cursor.
#[derive(Default)]
pub struct UserInput {
    /// Cursor position in characters
    pub char_idx: usize,
    pub value: String,
}

impl UserInput {
    pub fn new() -> Self {
        Self::default()
    }

    fn byte_idx(&self) -> usize {
        self.value
            .char_indices()
            .map(|(idx, _)| idx)
            .nth(self.char_idx)
            .unwrap_or(self.value.len())
    }

    pub fn input(&mut self, to_insert: char) {
        let idx = self.byte_idx();
        self.value.insert(idx, to_insert);
        self.move_right();
    }

    pub fn backspace(&mut self) {
        if self.char_idx == 0 {
            return;
        }
        self.move_left();
        self.delete();
    }

    pub fn delete(&mut self) {
        if self.char_idx < self.value.chars().count() {
            let idx = self.byte_idx();
            self.value.remove(idx);
        }
    }

    pub fn move_left(&mut self) {
        self.char_idx = self.char_idx.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.char_idx = (self.char_idx + 1).min(self.value.chars().count());
    }

    pub fn jump_to_first(&mut self) {
        self.char_idx = 0;
    }

    pub fn jump_to_last(&mut self) {
        self.char_idx = self.value.chars().count();
    }

    /// Take the current value and reset the input.
    pub fn submit(&mut self) -> String {
        self.char_idx = 0;
        std::mem::take(&mut self.value)
    }
}
