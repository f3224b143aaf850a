//! tabdeck: a terminal "new tab" page.
//!
//! Quick links are kept as an ordered list in a JSON key/value store and
//! shown as a card board that can be reordered by dragging. Browser bookmarks
//! are listed next to them when a bookmarks file is configured.

pub mod app;
pub mod background;
pub mod board;
pub mod bookmarks;
pub mod config;
pub mod entity;
pub mod entity_list;
pub mod error;
pub mod reorder;
pub mod search;
pub mod store;
pub mod theme;
pub mod transfer;

/// Storage slot holding the quick links array.
pub const LINKS_KEY: &str = "quick_links";
/// Storage slot holding the theme name as a plain string.
pub const THEME_KEY: &str = "theme";
/// Storage slot holding the background reference.
pub const BACKGROUND_KEY: &str = "background";
