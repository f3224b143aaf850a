//! Interactive state of the new tab page.
//!
//! `AppState` owns the quick links list (with its card board view), the drag
//! controller, the bookmark provider and whatever popup is open. Key and
//! mouse events are dispatched here; drawing lives in [`render`].

pub mod forms;
pub mod render;

use std::path::Path;

use anyhow::Result;
use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use crate::background::{parse_background, scan_wallpapers, Background, Wallpaper};
use crate::board::{decorate_card, BoardHit, CardBoard};
use crate::bookmarks::{flatten, Bookmark, BookmarkProvider, ChromiumBookmarks, Unavailable};
use crate::config::{AppPaths, Settings};
use crate::entity::{open_target, validate_link_input, EntityPatch};
use crate::entity_list::EntityList;
use crate::error::TransferError;
use crate::reorder::ReorderController;
use crate::search::{search_url, SearchEngine};
use crate::store::{FileBackend, Store};
use crate::theme::{Theme, DEFAULT_THEME};
use crate::transfer::{apply_import, export_to_dir, read_import};
use crate::{BACKGROUND_KEY, LINKS_KEY, THEME_KEY};

use forms::{
    ConfirmAction, ConfirmState, FormContext, FormKeyResult, LinkFormInput, LinkFormState,
    PromptPurpose, PromptState, SettingsFormInput, SettingsFormState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Focus {
    Links,
    Bookmarks,
}

#[derive(Debug)]
pub enum PopupState {
    Message(String),
    LinkForm(LinkFormState),
    Prompt(PromptState),
    Confirm(ConfirmState),
    Settings(SettingsFormState),
}

enum PopupResult {
    None,
    Close(Option<String>),
    LinkSubmit(LinkFormInput),
    PromptSubmit(PromptPurpose, String),
    Confirmed,
    SettingsSubmit(SettingsFormInput),
}

/// Why a submitted form did not go through.
enum SubmitError {
    /// Shown inside the form, which stays open.
    Invalid(String),
    /// The form closes and a message popup explains the failure.
    Failed(String),
}

/// A left click on a link card that may still turn into a drag.
#[derive(Clone, Copy, Debug)]
struct Press {
    slot: usize,
    index: usize,
}

/// Screen regions for the current terminal size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub shortcuts: Rect,
    pub links: Rect,
    pub board: Rect,
    pub bookmarks: Option<Rect>,
    pub bookmark_rows: Option<Rect>,
    pub status: Rect,
}

pub fn compute_layout(area: Rect, show_bookmarks: bool) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);
    let content = rows[2];
    let (links, bookmarks) = if show_bookmarks {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
            .split(content);
        (columns[0], Some(columns[1]))
    } else {
        (content, None)
    };
    let framed = Block::default().borders(Borders::ALL);
    ScreenLayout {
        header: rows[0],
        shortcuts: rows[1],
        links,
        board: framed.inner(links),
        bookmarks,
        bookmark_rows: bookmarks.map(|area| framed.inner(area)),
        status: rows[3],
    }
}

/// First visible row of a list of `height` rows keeping `selected` in view.
pub fn list_offset(selected: usize, height: usize) -> usize {
    if height == 0 {
        0
    } else {
        selected.saturating_sub(height - 1)
    }
}

fn contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x && column < area.right() && row >= area.y && row < area.bottom()
}

fn provider_for(settings: &Settings) -> Box<dyn BookmarkProvider> {
    match &settings.bookmarks_file {
        Some(path) => Box::new(ChromiumBookmarks::new(path)),
        None => Box::new(Unavailable),
    }
}

pub struct AppState {
    paths: AppPaths,
    pub settings: Settings,
    prefs: Store<FileBackend>,
    links: EntityList<FileBackend, CardBoard>,
    reorder: ReorderController,
    press: Option<Press>,
    pub theme: Theme,
    background: Option<Background>,
    wallpapers: Vec<Wallpaper>,
    bookmarks: Box<dyn BookmarkProvider>,
    bookmark_items: Vec<Bookmark>,
    bookmark_filter: String,
    pub focus: Focus,
    selected_link: usize,
    selected_bookmark: usize,
    pub active_popup: Option<PopupState>,
    pending_open: Option<String>,
    status_message: Option<String>,
    pub should_quit: bool,
    layout: ScreenLayout,
}

impl AppState {
    pub fn new() -> Result<Self> {
        let paths = AppPaths::new()?;
        Self::with_paths(paths)
    }

    pub fn with_paths(paths: AppPaths) -> Result<Self> {
        let settings = Settings::load(&paths.config_file)?;
        let mut backend = FileBackend::new(&paths.storage_file);
        if let Some(quota) = settings
            .storage_quota_bytes
            .and_then(|q| usize::try_from(q).ok())
        {
            backend = backend.with_quota(quota);
        }
        let prefs = Store::new(backend);
        let board = CardBoard::new(settings.columns).with_hook(Box::new(decorate_card));
        let mut links = EntityList::new(prefs.clone(), LINKS_KEY, board);
        links.render();

        let mut app = Self {
            bookmarks: provider_for(&settings),
            wallpapers: scan_wallpapers(&paths.wallpapers_dir),
            paths,
            settings,
            theme: Theme::from_name(DEFAULT_THEME),
            background: None,
            prefs,
            links,
            reorder: ReorderController::new(),
            press: None,
            bookmark_items: Vec::new(),
            bookmark_filter: String::new(),
            focus: Focus::Links,
            selected_link: 0,
            selected_bookmark: 0,
            active_popup: None,
            pending_open: None,
            status_message: None,
            should_quit: false,
            layout: ScreenLayout::default(),
        };
        app.load_preferences();
        app.reload_bookmarks();
        log::info!(
            "tabdeck started with {} links from {}",
            app.links.len(),
            app.paths.storage_file.display()
        );
        Ok(app)
    }

    /// Swap the bookmark source, mostly for tests and alternate browsers.
    pub fn with_bookmarks(mut self, provider: Box<dyn BookmarkProvider>) -> Self {
        self.bookmarks = provider;
        self.reload_bookmarks();
        self
    }

    pub fn links(&self) -> &EntityList<FileBackend, CardBoard> {
        &self.links
    }

    pub fn background(&self) -> Option<&Background> {
        self.background.as_ref()
    }

    pub fn layout(&self) -> ScreenLayout {
        self.layout
    }

    /// Recompute screen regions and place the board. Called before every
    /// draw and every mouse event.
    pub fn sync_layout(&mut self, area: Rect) {
        self.layout = compute_layout(area, self.bookmarks_visible());
        self.links.view_mut().set_viewport(self.layout.board);
    }

    pub fn bookmarks_visible(&self) -> bool {
        self.bookmarks.is_available()
    }

    pub fn visible_bookmarks(&self) -> Vec<&Bookmark> {
        self.bookmark_items
            .iter()
            .filter(|bookmark| bookmark.matches(&self.bookmark_filter))
            .collect()
    }

    pub fn take_pending_open(&mut self) -> Option<String> {
        self.pending_open.take()
    }

    pub fn set_status(&mut self, message: Option<String>) {
        self.status_message = message;
    }

    fn show_message(&mut self, message: impl Into<String>) {
        self.active_popup = Some(PopupState::Message(message.into()));
    }

    pub fn status_text(&self) -> String {
        let (kind, current, total) = match self.focus {
            Focus::Links => ("Link", self.selected_link, self.links.view().link_count()),
            Focus::Bookmarks => (
                "Bookmark",
                self.selected_bookmark,
                self.visible_bookmarks().len(),
            ),
        };
        let position = if total == 0 { 0 } else { current + 1 };
        let mut text = format!("{kind} {position}/{total} | Theme: {}", self.theme.name);
        if let Some(background) = &self.background {
            text.push_str(" | Background: ");
            text.push_str(&background.describe());
        }
        if let Some(msg) = &self.status_message {
            text.push_str(" | ");
            text.push_str(msg);
        }
        text
    }

    fn load_preferences(&mut self) {
        let key = self
            .prefs
            .get_string(THEME_KEY)
            .unwrap_or_else(|| DEFAULT_THEME.to_string());
        self.theme = Theme::from_name(&key);
        self.background = self.prefs.get_string(BACKGROUND_KEY).and_then(|stored| {
            match parse_background(&stored, &self.wallpapers) {
                Ok(background) => background,
                Err(err) => {
                    log::warn!("ignoring stored background {stored:?}: {err}");
                    None
                }
            }
        });
    }

    fn reload_bookmarks(&mut self) {
        if !self.bookmarks.is_available() {
            self.bookmark_items.clear();
            if self.focus == Focus::Bookmarks {
                self.focus = Focus::Links;
            }
            return;
        }
        match self.bookmarks.tree() {
            Ok(tree) => self.bookmark_items = flatten(&tree),
            Err(err) => {
                log::warn!("could not read bookmarks: {err}");
                self.set_status(Some(format!("Bookmarks unavailable: {err}")));
            }
        }
        self.clamp_selection();
    }

    fn reload(&mut self) {
        self.links.render();
        self.wallpapers = scan_wallpapers(&self.paths.wallpapers_dir);
        self.load_preferences();
        self.reload_bookmarks();
        self.clamp_selection();
        self.set_status(Some("Reloaded".into()));
    }

    fn clamp_selection(&mut self) {
        let links = self.links.view().link_count();
        self.selected_link = self.selected_link.min(links.saturating_sub(1));
        let bookmarks = self.visible_bookmarks().len();
        self.selected_bookmark = self.selected_bookmark.min(bookmarks.saturating_sub(1));
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.active_popup.is_some() {
            self.handle_popup_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => {
                if self.reorder.is_dragging() {
                    self.cancel_drag();
                } else {
                    self.should_quit = true;
                }
            }
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            KeyCode::Up | KeyCode::Char('k') | KeyCode::Left | KeyCode::Char('h') => {
                self.move_selection(-1)
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Right | KeyCode::Char('l') => {
                self.move_selection(1)
            }
            KeyCode::Home => self.select_edge(false),
            KeyCode::End => self.select_edge(true),
            KeyCode::Enter => self.open_selected(),
            KeyCode::Char('n') => self.open_new_form(),
            KeyCode::Char('e') => self.open_edit_form(),
            KeyCode::Char('d') => self.confirm_delete_selected(),
            KeyCode::Char('s') => self.open_settings(),
            KeyCode::Char('t') => self.toggle_theme(),
            KeyCode::Char('b') => self.prompt_background(),
            KeyCode::Char('x') => self.export_links(),
            KeyCode::Char('i') => self.prompt(PromptPurpose::ImportPath),
            KeyCode::Char('g') => self.prompt(PromptPurpose::WebSearch(SearchEngine::Google)),
            KeyCode::Char('w') => {
                self.prompt(PromptPurpose::WebSearch(SearchEngine::Wikipedia))
            }
            KeyCode::Char('/') if self.bookmarks_visible() => {
                self.prompt(PromptPurpose::BookmarkFilter)
            }
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent) {
        let Some(popup) = self.active_popup.as_mut() else {
            return;
        };
        let result = match popup {
            PopupState::Message(_) => match key.code {
                KeyCode::Esc | KeyCode::Enter => PopupResult::Close(None),
                _ => PopupResult::None,
            },
            PopupState::LinkForm(form) => match form.handle_key(key) {
                FormKeyResult::Continue => PopupResult::None,
                FormKeyResult::Cancel => PopupResult::Close(Some("Edit cancelled".into())),
                FormKeyResult::Submit(input) => PopupResult::LinkSubmit(input),
            },
            PopupState::Prompt(prompt) => match prompt.handle_key(key) {
                FormKeyResult::Continue => PopupResult::None,
                FormKeyResult::Cancel => PopupResult::Close(None),
                FormKeyResult::Submit(value) => PopupResult::PromptSubmit(prompt.purpose, value),
            },
            PopupState::Confirm(confirm) => match confirm.handle_key(key) {
                FormKeyResult::Continue => PopupResult::None,
                FormKeyResult::Cancel => PopupResult::Close(Some("Cancelled".into())),
                FormKeyResult::Submit(()) => PopupResult::Confirmed,
            },
            PopupState::Settings(form) => match form.handle_key(key) {
                FormKeyResult::Continue => PopupResult::None,
                FormKeyResult::Cancel => {
                    PopupResult::Close(Some("Settings update cancelled".into()))
                }
                FormKeyResult::Submit(input) => PopupResult::SettingsSubmit(input),
            },
        };
        self.apply_popup_result(result);
    }

    fn apply_popup_result(&mut self, result: PopupResult) {
        let outcome = match result {
            PopupResult::None => return,
            PopupResult::Close(status) => {
                self.active_popup = None;
                if status.is_some() {
                    self.set_status(status);
                }
                return;
            }
            PopupResult::Confirmed => {
                if let Some(PopupState::Confirm(confirm)) = self.active_popup.take() {
                    self.run_confirmed(confirm.action);
                }
                return;
            }
            PopupResult::LinkSubmit(input) => self.apply_link_form(input),
            PopupResult::PromptSubmit(purpose, value) => self.apply_prompt(purpose, &value),
            PopupResult::SettingsSubmit(input) => self.apply_settings_form(input),
        };
        match outcome {
            Ok(Some(msg)) => {
                self.active_popup = None;
                self.set_status(Some(msg));
            }
            // The handler already replaced the popup.
            Ok(None) => {}
            Err(SubmitError::Invalid(msg)) => {
                if let Err(msg) = self.attach_form_error(msg) {
                    self.show_message(msg);
                }
            }
            Err(SubmitError::Failed(msg)) => self.show_message(msg),
        }
    }

    /// Put `msg` on the open form. Hands it back when no form is open.
    fn attach_form_error(&mut self, msg: String) -> Result<(), String> {
        match self.active_popup.as_mut() {
            Some(PopupState::LinkForm(form)) => form.error = Some(msg),
            Some(PopupState::Prompt(prompt)) => prompt.error = Some(msg),
            Some(PopupState::Settings(form)) => form.error = Some(msg),
            _ => return Err(msg),
        }
        Ok(())
    }

    fn apply_link_form(&mut self, input: LinkFormInput) -> Result<Option<String>, SubmitError> {
        let entity = validate_link_input(&input.url, &input.name)
            .map_err(|err| SubmitError::Invalid(err.to_string()))?;
        match input.context {
            FormContext::Add => {
                let name = entity.name.clone();
                self.links.add(entity);
                self.focus = Focus::Links;
                self.selected_link = self.links.view().link_count().saturating_sub(1);
                Ok(Some(format!("Added {name}")))
            }
            FormContext::Edit(index) => {
                self.links
                    .update(index, EntityPatch::from(entity))
                    .map_err(|_| SubmitError::Failed("That link no longer exists.".into()))?;
                Ok(Some("Link updated".into()))
            }
            FormContext::AddBookmark => {
                let created = self
                    .bookmarks
                    .create(&open_target(&entity.url), &entity.name)
                    .map_err(|err| SubmitError::Failed(format!("Could not add bookmark: {err}")))?;
                self.reload_bookmarks();
                Ok(Some(format!("Bookmarked {}", created.display_title())))
            }
            FormContext::EditBookmark(id) => {
                self.bookmarks
                    .update(&id, &open_target(&entity.url), &entity.name)
                    .map_err(|err| {
                        SubmitError::Failed(format!("Could not update bookmark: {err}"))
                    })?;
                self.reload_bookmarks();
                Ok(Some("Bookmark updated".into()))
            }
        }
    }

    fn apply_prompt(
        &mut self,
        purpose: PromptPurpose,
        value: &str,
    ) -> Result<Option<String>, SubmitError> {
        match purpose {
            PromptPurpose::ImportPath => {
                let path = value.trim();
                if path.is_empty() {
                    return Err(SubmitError::Invalid("Enter the path of a file.".into()));
                }
                let pending = read_import(Path::new(path)).map_err(|err| {
                    log::warn!("import of {path} rejected: {err}");
                    SubmitError::Failed(format!("Import failed: {err}"))
                })?;
                let message = format!(
                    "Replace {} quick links with {} from {}?",
                    self.links.len(),
                    pending.entities.len(),
                    pending.source.display()
                );
                self.active_popup = Some(PopupState::Confirm(ConfirmState::new(
                    message,
                    ConfirmAction::Import(pending),
                )));
                Ok(None)
            }
            PromptPurpose::Background => {
                let background = parse_background(value, &self.wallpapers)
                    .map_err(|err| SubmitError::Invalid(err.to_string()))?;
                let msg = match &background {
                    Some(bg) => {
                        self.prefs
                            .set(BACKGROUND_KEY, &Value::String(bg.reference()));
                        format!("Background set to {}", bg.describe())
                    }
                    None => {
                        self.prefs.remove(BACKGROUND_KEY);
                        "Background cleared".to_string()
                    }
                };
                self.background = background;
                Ok(Some(msg))
            }
            PromptPurpose::WebSearch(engine) => match search_url(engine, value) {
                Some(url) => {
                    self.pending_open = Some(url.to_string());
                    Ok(Some(format!("Searching {}", engine.label())))
                }
                None => {
                    self.active_popup = None;
                    Ok(None)
                }
            },
            PromptPurpose::BookmarkFilter => {
                self.bookmark_filter = value.trim().to_string();
                self.selected_bookmark = 0;
                self.focus = Focus::Bookmarks;
                Ok(Some(if self.bookmark_filter.is_empty() {
                    "Showing all bookmarks".to_string()
                } else {
                    format!("{} bookmarks match", self.visible_bookmarks().len())
                }))
            }
        }
    }

    fn apply_settings_form(
        &mut self,
        input: SettingsFormInput,
    ) -> Result<Option<String>, SubmitError> {
        let updated = input
            .to_settings(&self.settings)
            .map_err(SubmitError::Invalid)?;
        updated
            .save(&self.paths.config_file)
            .map_err(|err| SubmitError::Invalid(format!("Could not save settings: {err}")))?;
        if updated.columns != self.settings.columns {
            self.links.view_mut().set_columns(updated.columns);
        }
        let bookmarks_changed = updated.bookmarks_file != self.settings.bookmarks_file;
        self.settings = updated;
        if bookmarks_changed {
            self.bookmarks = provider_for(&self.settings);
            self.bookmark_filter.clear();
            self.reload_bookmarks();
        }
        if input.theme_key != self.theme.key {
            self.set_theme(Theme::from_name(input.theme_key));
        }
        Ok(Some("Settings saved".into()))
    }

    fn run_confirmed(&mut self, action: ConfirmAction) {
        match action {
            ConfirmAction::DeleteLink(index) => match self.links.remove(index) {
                Ok(removed) => {
                    self.clamp_selection();
                    self.set_status(Some(format!("Deleted {}", removed.display_name())));
                }
                Err(err) => self.set_status(Some(format!("Nothing deleted: {err}"))),
            },
            ConfirmAction::DeleteBookmark(id) => match self.bookmarks.remove(&id) {
                Ok(()) => {
                    self.reload_bookmarks();
                    self.set_status(Some("Bookmark deleted".into()));
                }
                Err(err) => self.show_message(format!("Could not delete bookmark: {err}")),
            },
            ConfirmAction::Import(pending) => {
                let count = apply_import(&mut self.links, pending);
                self.selected_link = 0;
                self.set_status(Some(format!("Imported {count} links")));
            }
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Links if self.bookmarks_visible() => Focus::Bookmarks,
            _ => Focus::Links,
        };
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, count) = match self.focus {
            Focus::Links => (&mut self.selected_link, self.links.view().link_count()),
            Focus::Bookmarks => {
                let count = self.visible_bookmarks().len();
                (&mut self.selected_bookmark, count)
            }
        };
        if count == 0 {
            return;
        }
        let next = (*selected as isize + delta).rem_euclid(count as isize);
        *selected = next as usize;
    }

    fn select_edge(&mut self, last: bool) {
        let count = match self.focus {
            Focus::Links => self.links.view().link_count(),
            Focus::Bookmarks => self.visible_bookmarks().len(),
        };
        let target = if last { count.saturating_sub(1) } else { 0 };
        match self.focus {
            Focus::Links => self.selected_link = target,
            Focus::Bookmarks => self.selected_bookmark = target,
        }
    }

    fn selected_bookmark(&self) -> Option<Bookmark> {
        self.visible_bookmarks()
            .get(self.selected_bookmark)
            .map(|bookmark| (*bookmark).clone())
    }

    fn open_selected(&mut self) {
        match self.focus {
            Focus::Links => self.open_link(self.selected_link),
            Focus::Bookmarks => {
                if let Some(bookmark) = self.selected_bookmark() {
                    self.pending_open = Some(bookmark.url);
                }
            }
        }
    }

    fn open_link(&mut self, index: usize) {
        if let Some(entity) = self.links.get(index) {
            self.pending_open = Some(open_target(&entity.url));
        }
    }

    fn open_new_form(&mut self) {
        let context = match self.focus {
            Focus::Links => FormContext::Add,
            Focus::Bookmarks => FormContext::AddBookmark,
        };
        self.active_popup = Some(PopupState::LinkForm(LinkFormState::new(context, "", "")));
    }

    fn open_edit_form(&mut self) {
        match self.focus {
            Focus::Links => self.edit_link(self.selected_link),
            Focus::Bookmarks => {
                if let Some(bookmark) = self.selected_bookmark() {
                    self.active_popup = Some(PopupState::LinkForm(LinkFormState::new(
                        FormContext::EditBookmark(bookmark.id),
                        bookmark.url,
                        bookmark.title,
                    )));
                }
            }
        }
    }

    fn edit_link(&mut self, index: usize) {
        if let Some(entity) = self.links.get(index) {
            self.active_popup = Some(PopupState::LinkForm(LinkFormState::new(
                FormContext::Edit(index),
                entity.url,
                entity.name,
            )));
        }
    }

    fn confirm_delete_selected(&mut self) {
        match self.focus {
            Focus::Links => self.confirm_delete_link(self.selected_link),
            Focus::Bookmarks => {
                if let Some(bookmark) = self.selected_bookmark() {
                    self.active_popup = Some(PopupState::Confirm(ConfirmState::new(
                        format!("Delete bookmark \"{}\"?", bookmark.display_title()),
                        ConfirmAction::DeleteBookmark(bookmark.id),
                    )));
                }
            }
        }
    }

    fn confirm_delete_link(&mut self, index: usize) {
        if let Some(entity) = self.links.get(index) {
            self.active_popup = Some(PopupState::Confirm(ConfirmState::new(
                format!("Delete \"{}\"?", entity.display_name()),
                ConfirmAction::DeleteLink(index),
            )));
        }
    }

    fn open_settings(&mut self) {
        self.active_popup = Some(PopupState::Settings(SettingsFormState::new(
            &self.settings,
            &self.theme,
        )));
    }

    fn set_theme(&mut self, theme: Theme) {
        self.prefs.set(THEME_KEY, &Value::String(theme.key.to_string()));
        self.set_status(Some(format!("Theme: {}", theme.name)));
        self.theme = theme;
    }

    fn toggle_theme(&mut self) {
        self.set_theme(self.theme.toggled());
    }

    fn prompt(&mut self, purpose: PromptPurpose) {
        let initial = match purpose {
            PromptPurpose::BookmarkFilter => self.bookmark_filter.clone(),
            _ => String::new(),
        };
        self.active_popup = Some(PopupState::Prompt(PromptState::new(purpose, initial)));
    }

    fn prompt_background(&mut self) {
        let current = self
            .background
            .as_ref()
            .map(Background::reference)
            .unwrap_or_default();
        let mut hints = vec!["Leave empty to clear. http(s) and data: URLs are accepted.".into()];
        hints.extend(
            self.wallpapers
                .iter()
                .map(|w| format!("wallpapers/{}  {}", w.file, w.label)),
        );
        self.active_popup = Some(PopupState::Prompt(
            PromptState::new(PromptPurpose::Background, current).with_hints(hints),
        ));
    }

    fn export_links(&mut self) {
        let dir = self.settings.export_dir(&self.paths);
        match export_to_dir(&self.links.list(), &dir, Local::now().date_naive()) {
            Ok(path) => self.set_status(Some(format!("Exported to {}", path.display()))),
            Err(TransferError::Empty) => self.show_message(TransferError::Empty.to_string()),
            Err(err) => {
                log::error!("export failed: {err}");
                self.show_message(format!("Export failed: {err}"));
            }
        }
    }

    fn cancel_drag(&mut self) {
        self.reorder.cancel(self.links.view_mut());
        self.links.render();
        self.press = None;
        self.set_status(Some("Move cancelled".into()));
    }

    /// Abandon any drag when the terminal loses focus.
    pub fn handle_focus_lost(&mut self) {
        if self.reorder.is_dragging() {
            self.cancel_drag();
        }
        self.press = None;
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, terminal_area: Rect) {
        self.sync_layout(terminal_area);
        if self.active_popup.is_some() {
            if matches!(mouse.kind, MouseEventKind::Down(MouseButton::Left)) {
                self.handle_popup_click(mouse.column, mouse.row, terminal_area);
            }
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.mouse_down(mouse.column, mouse.row),
            MouseEventKind::Drag(MouseButton::Left) => self.mouse_drag(mouse.row),
            MouseEventKind::Up(MouseButton::Left) => self.mouse_up(mouse.column, mouse.row),
            MouseEventKind::ScrollDown if !self.reorder.is_dragging() => self.move_selection(1),
            MouseEventKind::ScrollUp if !self.reorder.is_dragging() => self.move_selection(-1),
            _ => {}
        }
    }

    fn mouse_down(&mut self, column: u16, row: u16) {
        // The release of the previous gesture never arrived.
        if self.reorder.is_dragging() {
            self.cancel_drag();
        }
        if contains(self.layout.shortcuts, column, row) {
            self.handle_footer_click(column, self.layout.shortcuts);
            return;
        }
        if let Some(hit) = self.links.view().hit(column, row) {
            self.focus = Focus::Links;
            match hit {
                BoardHit::Open { slot, index } => {
                    self.selected_link = index;
                    self.press = Some(Press { slot, index });
                }
                BoardHit::Edit(index) => {
                    self.selected_link = index;
                    self.edit_link(index);
                }
                BoardHit::Delete(index) => {
                    self.selected_link = index;
                    self.confirm_delete_link(index);
                }
                BoardHit::Add => self.open_new_form(),
            }
            return;
        }
        if let Some(rows) = self.layout.bookmark_rows {
            if contains(rows, column, row) {
                let offset = list_offset(self.selected_bookmark, usize::from(rows.height));
                let index = offset + usize::from(row - rows.y);
                if index < self.visible_bookmarks().len() {
                    self.focus = Focus::Bookmarks;
                    self.selected_bookmark = index;
                    self.open_selected();
                }
            }
        }
    }

    fn mouse_drag(&mut self, row: u16) {
        if !self.reorder.is_dragging() {
            let Some(press) = self.press else {
                return;
            };
            if !self.reorder.drag_start(self.links.view_mut(), press.slot) {
                self.press = None;
                return;
            }
            self.set_status(Some("Drop on the board to move, Esc to cancel".into()));
        }
        self.reorder.drag_move(self.links.view_mut(), row);
    }

    fn mouse_up(&mut self, column: u16, row: u16) {
        let press = self.press.take();
        if self.reorder.is_dragging() {
            if !self.links.view().contains_point(column, row) {
                self.cancel_drag();
                return;
            }
            match self.reorder.drop(&mut self.links) {
                Ok(commit) => {
                    self.selected_link = commit.to;
                    self.set_status(Some(format!("Moved to position {}", commit.to + 1)));
                }
                Err(err) => {
                    self.links.render();
                    self.set_status(Some(format!("Move aborted: {err}")));
                }
            }
            return;
        }
        if let Some(press) = press {
            let released_on = self.links.view().hit(column, row);
            if matches!(released_on, Some(BoardHit::Open { index, .. }) if index == press.index) {
                self.open_link(press.index);
            }
        }
    }

    fn handle_popup_click(&mut self, column: u16, row: u16, terminal_area: Rect) {
        if matches!(self.active_popup, Some(PopupState::Message(_))) {
            self.active_popup = None;
        } else if matches!(self.active_popup, Some(PopupState::Confirm(_))) {
            let layout = render::confirm_layout(terminal_area);
            if contains(layout.yes, column, row) {
                self.apply_popup_result(PopupResult::Confirmed);
            } else if contains(layout.no, column, row) {
                self.apply_popup_result(PopupResult::Close(Some("Cancelled".into())));
            }
        }
    }

    fn footer_line_data(&self) -> FooterLineData {
        let base_bg = self.theme.highlight;
        let shortcut_style = Style::default()
            .fg(self.theme.accent)
            .bg(base_bg)
            .add_modifier(Modifier::BOLD);
        let label_fg = if self.theme.is_dark() {
            self.theme.background
        } else {
            self.theme.text
        };
        let label_style = Style::default().fg(label_fg).bg(base_bg);
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut segments = Vec::new();
        let mut cursor: u16 = 0;
        for (index, shortcut) in FOOTER_SHORTCUTS.iter().enumerate() {
            if index > 0 {
                spans.push(Span::styled(" | ", label_style));
                cursor = cursor.saturating_add(3);
            }
            let entry_start = cursor;
            spans.push(Span::styled(shortcut.key, shortcut_style));
            spans.push(Span::styled(shortcut.label, label_style));
            let key_len = UnicodeWidthStr::width(shortcut.key) as u16;
            let label_len = UnicodeWidthStr::width(shortcut.label) as u16;
            let entry_end = entry_start
                .saturating_add(key_len)
                .saturating_add(label_len);
            segments.push(FooterSegment {
                start: entry_start,
                end: entry_end,
                action: shortcut.action,
            });
            cursor = entry_end;
        }
        FooterLineData {
            line: Line::from(spans),
            segments,
            total_width: cursor,
        }
    }

    pub fn footer_line(&self) -> Line<'static> {
        self.footer_line_data().line
    }

    fn handle_footer_click(&mut self, column: u16, footer_area: Rect) -> bool {
        let line_data = self.footer_line_data();
        if line_data.segments.is_empty() || footer_area.width == 0 {
            return false;
        }
        let text_width = line_data.total_width.min(footer_area.width);
        let mut start_x = footer_area.x;
        if footer_area.width > text_width {
            start_x += (footer_area.width - text_width) / 2;
        }
        if column < start_x || column >= start_x + text_width {
            return false;
        }
        let relative = column - start_x;
        match line_data
            .segments
            .iter()
            .find(|segment| relative >= segment.start && relative < segment.end)
        {
            Some(segment) => {
                self.execute_footer_action(segment.action);
                true
            }
            None => false,
        }
    }

    fn execute_footer_action(&mut self, action: FooterAction) {
        match action {
            FooterAction::Quit => self.should_quit = true,
            FooterAction::New => self.open_new_form(),
            FooterAction::Edit => self.open_edit_form(),
            FooterAction::Delete => self.confirm_delete_selected(),
            FooterAction::Search => self.prompt(PromptPurpose::WebSearch(SearchEngine::Google)),
            FooterAction::Theme => self.toggle_theme(),
            FooterAction::Settings => self.open_settings(),
        }
    }
}

struct FooterShortcut {
    key: &'static str,
    label: &'static str,
    action: FooterAction,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FooterAction {
    Quit,
    New,
    Edit,
    Delete,
    Search,
    Theme,
    Settings,
}

struct FooterSegment {
    start: u16,
    end: u16,
    action: FooterAction,
}

struct FooterLineData {
    line: Line<'static>,
    segments: Vec<FooterSegment>,
    total_width: u16,
}

const FOOTER_SHORTCUTS: &[FooterShortcut] = &[
    FooterShortcut {
        key: "q",
        label: " Exit",
        action: FooterAction::Quit,
    },
    FooterShortcut {
        key: "n",
        label: " New",
        action: FooterAction::New,
    },
    FooterShortcut {
        key: "e",
        label: " Edit",
        action: FooterAction::Edit,
    },
    FooterShortcut {
        key: "d",
        label: " Delete",
        action: FooterAction::Delete,
    },
    FooterShortcut {
        key: "g",
        label: " Search",
        action: FooterAction::Search,
    },
    FooterShortcut {
        key: "t",
        label: " Theme",
        action: FooterAction::Theme,
    },
    FooterShortcut {
        key: "s",
        label: " Settings",
        action: FooterAction::Settings,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::BookmarkNode;
    use crate::entity::Entity;
    use crate::error::BookmarkError;
    use crossterm::event::KeyModifiers;
    use std::fs;

    const SCREEN: Rect = Rect {
        x: 0,
        y: 0,
        width: 80,
        height: 24,
    };

    fn app() -> (tempfile::TempDir, AppState) {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::at(dir.path().join("tabdeck")).unwrap();
        let mut app = AppState::with_paths(paths).unwrap();
        app.sync_layout(SCREEN);
        (dir, app)
    }

    fn app_with(names: &[&str]) -> (tempfile::TempDir, AppState) {
        let (dir, mut app) = app();
        let entities: Vec<Entity> = names
            .iter()
            .map(|name| Entity::new(format!("{}.com", name.to_lowercase()), *name))
            .collect();
        app.links.replace_all(entities);
        app.sync_layout(SCREEN);
        (dir, app)
    }

    fn press(app: &mut AppState, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    fn mouse(app: &mut AppState, kind: MouseEventKind, column: u16, row: u16) {
        app.handle_mouse(
            MouseEvent {
                kind,
                column,
                row,
                modifiers: KeyModifiers::NONE,
            },
            SCREEN,
        );
    }

    fn names(app: &AppState) -> Vec<String> {
        app.links.list().into_iter().map(|e| e.name).collect()
    }

    struct FailingBookmarks {
        nodes: Vec<BookmarkNode>,
    }

    impl BookmarkProvider for FailingBookmarks {
        fn is_available(&self) -> bool {
            true
        }

        fn tree(&self) -> Result<Vec<BookmarkNode>, BookmarkError> {
            Ok(self.nodes.clone())
        }

        fn create(&mut self, _url: &str, _title: &str) -> Result<Bookmark, BookmarkError> {
            Err(BookmarkError::Malformed("read-only profile".into()))
        }

        fn update(&mut self, _id: &str, _url: &str, _title: &str) -> Result<(), BookmarkError> {
            Err(BookmarkError::Malformed("read-only profile".into()))
        }

        fn remove(&mut self, id: &str) -> Result<(), BookmarkError> {
            Err(BookmarkError::NotFound(id.to_string()))
        }
    }

    fn failing_bookmarks() -> Box<dyn BookmarkProvider> {
        Box::new(FailingBookmarks {
            nodes: vec![BookmarkNode {
                id: "7".into(),
                title: "Docs".into(),
                url: Some("https://docs.rs/".into()),
                children: Vec::new(),
            }],
        })
    }

    #[test]
    fn layout_reserves_bars_and_panel_border() {
        let layout = compute_layout(SCREEN, false);
        assert_eq!(layout.header, Rect::new(0, 0, 80, 1));
        assert_eq!(layout.board, Rect::new(1, 3, 78, 19));
        assert_eq!(layout.status, Rect::new(0, 23, 80, 1));
        assert!(layout.bookmarks.is_none());
        let split = compute_layout(SCREEN, true);
        assert!(split.bookmarks.is_some());
        assert!(split.board.width < layout.board.width);
    }

    #[test]
    fn list_offset_keeps_selection_visible() {
        assert_eq!(list_offset(3, 10), 0);
        assert_eq!(list_offset(12, 10), 3);
        assert_eq!(list_offset(5, 0), 0);
    }

    #[test]
    fn add_link_through_the_form() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "rust-lang.org");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Rust");
        press(&mut app, KeyCode::Enter);
        assert!(app.active_popup.is_none());
        assert_eq!(app.links.list(), vec![Entity::new("rust-lang.org", "Rust")]);
        assert_eq!(app.links.view().link_count(), 1);
    }

    #[test]
    fn invalid_form_stays_open_with_error() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "a.com");
        press(&mut app, KeyCode::Enter);
        match &app.active_popup {
            Some(PopupState::LinkForm(form)) => {
                assert_eq!(form.error.as_deref(), Some("Both URL and Name are required."))
            }
            other => panic!("unexpected popup {other:?}"),
        }
        assert!(app.links.is_empty());
    }

    #[test]
    fn dragging_first_card_to_the_end() {
        let (_dir, mut app) = app_with(&["A", "B", "C"]);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 10, 4);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 10, 5);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 10, 13);
        assert_eq!(names(&app), ["A", "B", "C"]);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 10, 13);
        assert_eq!(names(&app), ["B", "C", "A"]);
        let indices: Vec<usize> = app.links.view().link_cards().map(|c| c.index).collect();
        assert_eq!(indices, [0, 1, 2]);
        assert_eq!(app.selected_link, 2);
        assert!(app.take_pending_open().is_none());
    }

    #[test]
    fn releasing_outside_the_board_cancels() {
        let (_dir, mut app) = app_with(&["A", "B", "C"]);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 10, 4);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 10, 13);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 10, 23);
        assert_eq!(names(&app), ["A", "B", "C"]);
        let visual: Vec<String> = app
            .links
            .view()
            .link_cards()
            .map(|c| c.entity.name.clone())
            .collect();
        assert_eq!(visual, ["A", "B", "C"]);
    }

    #[test]
    fn press_during_stale_drag_starts_over() {
        let (_dir, mut app) = app_with(&["A", "B", "C"]);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 10, 4);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 10, 13);
        // Released outside the terminal: no Up event.
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 10, 7);
        assert!(!app.reorder.is_dragging());
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 10, 7);
        assert_eq!(names(&app), ["A", "B", "C"]);
        assert_eq!(app.take_pending_open().as_deref(), Some("https://b.com"));
    }

    #[test]
    fn click_without_drag_opens_the_link() {
        let (_dir, mut app) = app_with(&["A", "B"]);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 10, 7);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 10, 7);
        assert_eq!(app.take_pending_open().as_deref(), Some("https://b.com"));
    }

    #[test]
    fn delete_asks_first() {
        let (_dir, mut app) = app_with(&["A", "B"]);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(names(&app), ["A", "B"]);
        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(names(&app), ["B"]);
    }

    #[test]
    fn card_controls_edit_and_delete() {
        let (_dir, mut app) = app_with(&["A"]);
        let area = app.links.view().slots()[0].area;
        mouse(
            &mut app,
            MouseEventKind::Down(MouseButton::Left),
            area.x + area.width - 6,
            area.y + 1,
        );
        assert!(matches!(
            &app.active_popup,
            Some(PopupState::LinkForm(form)) if form.context == FormContext::Edit(0)
        ));
        press(&mut app, KeyCode::Esc);
        mouse(
            &mut app,
            MouseEventKind::Down(MouseButton::Left),
            area.x + area.width - 3,
            area.y + 1,
        );
        assert!(matches!(app.active_popup, Some(PopupState::Confirm(_))));
    }

    #[test]
    fn import_replaces_after_confirmation() {
        let (dir, mut app) = app_with(&["A"]);
        let file = dir.path().join("links.json");
        fs::write(&file, r#"[{"url":"x.com","name":"X"},{"url":"y.com","name":"Y"}]"#).unwrap();
        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, &file.display().to_string());
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.active_popup, Some(PopupState::Confirm(_))));
        assert_eq!(names(&app), ["A"]);
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(names(&app), ["X", "Y"]);
    }

    #[test]
    fn invalid_import_changes_nothing() {
        let (dir, mut app) = app_with(&["A"]);
        let file = dir.path().join("bad.json");
        fs::write(&file, r#"[{"url":"x.com"}]"#).unwrap();
        press(&mut app, KeyCode::Char('i'));
        type_text(&mut app, &file.display().to_string());
        press(&mut app, KeyCode::Enter);
        assert!(matches!(app.active_popup, Some(PopupState::Message(_))));
        assert_eq!(names(&app), ["A"]);
    }

    #[test]
    fn export_of_empty_list_is_refused() {
        let (dir, mut app) = app();
        app.settings.export_dir = Some(dir.path().join("out"));
        press(&mut app, KeyCode::Char('x'));
        match &app.active_popup {
            Some(PopupState::Message(msg)) => assert_eq!(msg, "No data to export."),
            other => panic!("unexpected popup {other:?}"),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn theme_toggle_is_persisted() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('t'));
        assert!(app.theme.is_dark());
        assert_eq!(app.prefs.get_string(THEME_KEY).as_deref(), Some("dark"));
    }

    #[test]
    fn background_rejects_unknown_values() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('b'));
        type_text(&mut app, "ftp://nope");
        press(&mut app, KeyCode::Enter);
        assert!(matches!(
            &app.active_popup,
            Some(PopupState::Prompt(prompt)) if prompt.error.is_some()
        ));
        press(&mut app, KeyCode::Delete);
        type_text(&mut app, "https://example.com/bg.png");
        press(&mut app, KeyCode::Enter);
        assert!(app.active_popup.is_none());
        assert_eq!(
            app.prefs.get_string(BACKGROUND_KEY).as_deref(),
            Some("https://example.com/bg.png")
        );
    }

    #[test]
    fn blank_search_is_ignored() {
        let (_dir, mut app) = app();
        press(&mut app, KeyCode::Char('g'));
        type_text(&mut app, "   ");
        press(&mut app, KeyCode::Enter);
        assert!(app.active_popup.is_none());
        assert!(app.take_pending_open().is_none());
        press(&mut app, KeyCode::Char('w'));
        type_text(&mut app, "Ferris");
        press(&mut app, KeyCode::Enter);
        assert_eq!(
            app.take_pending_open().as_deref(),
            Some("https://en.wikipedia.org/w/index.php?search=Ferris")
        );
    }

    #[test]
    fn bookmarks_panel_hidden_without_provider() {
        let (_dir, app) = app();
        assert!(!app.bookmarks_visible());
        assert!(app.layout().bookmarks.is_none());
    }

    #[test]
    fn failed_bookmark_mutation_shows_notice() {
        let (_dir, app) = app();
        let mut app = app.with_bookmarks(failing_bookmarks());
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.focus, Focus::Bookmarks);
        press(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "crates.io");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Crates");
        press(&mut app, KeyCode::Enter);
        match &app.active_popup {
            Some(PopupState::Message(msg)) => assert!(msg.starts_with("Could not add bookmark")),
            other => panic!("unexpected popup {other:?}"),
        }
        assert_eq!(app.visible_bookmarks().len(), 1);
    }

    #[test]
    fn footer_click_runs_shortcut() {
        let (_dir, mut app) = app();
        let data = app.footer_line_data();
        let start = SCREEN.width.saturating_sub(data.total_width) / 2;
        let quit = &data.segments[0];
        assert_eq!(quit.action, FooterAction::Quit);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), start + quit.start, 1);
        assert!(app.should_quit);
    }

    #[test]
    fn escape_cancels_drag_before_quitting() {
        let (_dir, mut app) = app_with(&["A", "B"]);
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 10, 4);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 10, 10);
        press(&mut app, KeyCode::Esc);
        assert!(!app.should_quit);
        assert!(!app.reorder.is_dragging());
        press(&mut app, KeyCode::Esc);
        assert!(app.should_quit);
    }
}
