use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::board::MAX_COLUMNS;
use crate::config::Settings;
use crate::search::SearchEngine;
use crate::theme::Theme;
use crate::transfer::PendingImport;

/// Outcome of feeding one key to a form.
#[derive(Debug, PartialEq)]
pub enum FormKeyResult<T> {
    Continue,
    Cancel,
    Submit(T),
}

/// Which record a link form writes to when submitted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormContext {
    Add,
    Edit(usize),
    AddBookmark,
    EditBookmark(String),
}

impl FormContext {
    pub fn title(&self) -> &'static str {
        match self {
            FormContext::Add => "Add Quick Link",
            FormContext::Edit(_) => "Edit Quick Link",
            FormContext::AddBookmark => "Add Bookmark",
            FormContext::EditBookmark(_) => "Edit Bookmark",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkField {
    Url,
    Name,
}

#[derive(Debug)]
pub struct LinkFormState {
    pub context: FormContext,
    pub url: String,
    pub name: String,
    pub selected_field: LinkField,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkFormInput {
    pub context: FormContext,
    pub url: String,
    pub name: String,
}

impl LinkFormState {
    pub fn new(context: FormContext, url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            context,
            url: url.into(),
            name: name.into(),
            selected_field: LinkField::Url,
            error: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormKeyResult<LinkFormInput> {
        self.error = None;
        match key.code {
            KeyCode::Esc => FormKeyResult::Cancel,
            KeyCode::Enter => FormKeyResult::Submit(self.to_input()),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
                self.selected_field = match self.selected_field {
                    LinkField::Url => LinkField::Name,
                    LinkField::Name => LinkField::Url,
                };
                FormKeyResult::Continue
            }
            KeyCode::Backspace => {
                self.active_value_mut().pop();
                FormKeyResult::Continue
            }
            KeyCode::Delete => {
                self.active_value_mut().clear();
                FormKeyResult::Continue
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.active_value_mut().push(c);
                FormKeyResult::Continue
            }
            _ => FormKeyResult::Continue,
        }
    }

    pub fn to_input(&self) -> LinkFormInput {
        LinkFormInput {
            context: self.context.clone(),
            url: self.url.clone(),
            name: self.name.clone(),
        }
    }

    fn active_value_mut(&mut self) -> &mut String {
        match self.selected_field {
            LinkField::Url => &mut self.url,
            LinkField::Name => &mut self.name,
        }
    }
}

/// What a single-line prompt is asking for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptPurpose {
    ImportPath,
    Background,
    WebSearch(SearchEngine),
    BookmarkFilter,
}

impl PromptPurpose {
    pub fn title(self) -> String {
        match self {
            PromptPurpose::ImportPath => "Import Quick Links".into(),
            PromptPurpose::Background => "Background".into(),
            PromptPurpose::WebSearch(engine) => format!("Search {}", engine.label()),
            PromptPurpose::BookmarkFilter => "Filter Bookmarks".into(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PromptPurpose::ImportPath => "File",
            PromptPurpose::Background => "Image",
            PromptPurpose::WebSearch(_) => "Query",
            PromptPurpose::BookmarkFilter => "Contains",
        }
    }
}

#[derive(Debug)]
pub struct PromptState {
    pub purpose: PromptPurpose,
    pub value: String,
    /// Extra lines shown under the input, such as the known wallpapers.
    pub hints: Vec<String>,
    pub error: Option<String>,
}

impl PromptState {
    pub fn new(purpose: PromptPurpose, value: impl Into<String>) -> Self {
        Self {
            purpose,
            value: value.into(),
            hints: Vec::new(),
            error: None,
        }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormKeyResult<String> {
        self.error = None;
        match key.code {
            KeyCode::Esc => FormKeyResult::Cancel,
            KeyCode::Enter => FormKeyResult::Submit(self.value.clone()),
            KeyCode::Backspace => {
                self.value.pop();
                FormKeyResult::Continue
            }
            KeyCode::Delete => {
                self.value.clear();
                FormKeyResult::Continue
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.value.push(c);
                FormKeyResult::Continue
            }
            _ => FormKeyResult::Continue,
        }
    }
}

#[derive(Debug)]
pub enum ConfirmAction {
    DeleteLink(usize),
    DeleteBookmark(String),
    Import(PendingImport),
}

#[derive(Debug)]
pub struct ConfirmState {
    pub message: String,
    pub action: ConfirmAction,
    pub yes_selected: bool,
}

impl ConfirmState {
    pub fn new(message: impl Into<String>, action: ConfirmAction) -> Self {
        Self {
            message: message.into(),
            action,
            yes_selected: false,
        }
    }

    /// `Submit(())` means the user agreed.
    pub fn handle_key(&mut self, key: KeyEvent) -> FormKeyResult<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => FormKeyResult::Submit(()),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => FormKeyResult::Cancel,
            KeyCode::Enter if self.yes_selected => FormKeyResult::Submit(()),
            KeyCode::Enter => FormKeyResult::Cancel,
            KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
                self.yes_selected = !self.yes_selected;
                FormKeyResult::Continue
            }
            _ => FormKeyResult::Continue,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsField {
    Title,
    Columns,
    Theme,
    Opener,
    ExportDir,
    BookmarksFile,
}

impl SettingsField {
    pub const ALL: [SettingsField; 6] = [
        SettingsField::Title,
        SettingsField::Columns,
        SettingsField::Theme,
        SettingsField::Opener,
        SettingsField::ExportDir,
        SettingsField::BookmarksFile,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingsField::Title => "Title",
            SettingsField::Columns => "Columns",
            SettingsField::Theme => "Theme",
            SettingsField::Opener => "Opener",
            SettingsField::ExportDir => "Export Folder",
            SettingsField::BookmarksFile => "Bookmarks File",
        }
    }
}

#[derive(Debug)]
pub struct SettingsFormState {
    pub title: String,
    pub columns: String,
    pub theme_key: &'static str,
    pub opener: String,
    pub export_dir: String,
    pub bookmarks_file: String,
    pub selected_field: SettingsField,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsFormInput {
    pub title: String,
    pub columns: String,
    pub theme_key: &'static str,
    pub opener: String,
    pub export_dir: String,
    pub bookmarks_file: String,
}

impl SettingsFormState {
    pub fn new(settings: &Settings, theme: &Theme) -> Self {
        let path_text = |path: &Option<PathBuf>| {
            path.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        Self {
            title: settings.title.clone(),
            columns: settings.columns.to_string(),
            theme_key: theme.key,
            opener: settings.opener.clone(),
            export_dir: path_text(&settings.export_dir),
            bookmarks_file: path_text(&settings.bookmarks_file),
            selected_field: SettingsField::Title,
            error: None,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormKeyResult<SettingsFormInput> {
        self.error = None;
        match key.code {
            KeyCode::Esc => FormKeyResult::Cancel,
            KeyCode::Enter => FormKeyResult::Submit(self.to_input()),
            KeyCode::Tab | KeyCode::Down => {
                self.step_field(1);
                FormKeyResult::Continue
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.step_field(SettingsField::ALL.len() - 1);
                FormKeyResult::Continue
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if self.selected_field == SettingsField::Theme =>
            {
                self.toggle_theme();
                FormKeyResult::Continue
            }
            KeyCode::Backspace => {
                if let Some(value) = self.active_value_mut() {
                    value.pop();
                }
                FormKeyResult::Continue
            }
            KeyCode::Delete => {
                if let Some(value) = self.active_value_mut() {
                    value.clear();
                }
                FormKeyResult::Continue
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                if let Some(value) = self.active_value_mut() {
                    value.push(c);
                }
                FormKeyResult::Continue
            }
            _ => FormKeyResult::Continue,
        }
    }

    pub fn toggle_theme(&mut self) {
        self.theme_key = Theme::from_name(self.theme_key).toggled().key;
    }

    pub fn to_input(&self) -> SettingsFormInput {
        SettingsFormInput {
            title: self.title.clone(),
            columns: self.columns.clone(),
            theme_key: self.theme_key,
            opener: self.opener.clone(),
            export_dir: self.export_dir.clone(),
            bookmarks_file: self.bookmarks_file.clone(),
        }
    }

    fn step_field(&mut self, by: usize) {
        let fields = SettingsField::ALL;
        let current = fields
            .iter()
            .position(|field| *field == self.selected_field)
            .unwrap_or(0);
        self.selected_field = fields[(current + by) % fields.len()];
    }

    fn active_value_mut(&mut self) -> Option<&mut String> {
        match self.selected_field {
            SettingsField::Title => Some(&mut self.title),
            SettingsField::Columns => Some(&mut self.columns),
            SettingsField::Theme => None,
            SettingsField::Opener => Some(&mut self.opener),
            SettingsField::ExportDir => Some(&mut self.export_dir),
            SettingsField::BookmarksFile => Some(&mut self.bookmarks_file),
        }
    }
}

impl SettingsFormInput {
    /// Apply the form on top of `base`. Only the column count can be
    /// rejected.
    pub fn to_settings(&self, base: &Settings) -> Result<Settings, String> {
        let columns = self
            .columns
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|c| (1..=MAX_COLUMNS).contains(c))
            .ok_or_else(|| format!("Columns must be a number between 1 and {MAX_COLUMNS}."))?;
        let optional_path = |text: &str| {
            let text = text.trim();
            (!text.is_empty()).then(|| PathBuf::from(text))
        };
        let title = self.title.trim();
        let opener = self.opener.trim();
        Ok(Settings {
            title: if title.is_empty() {
                base.title.clone()
            } else {
                title.to_string()
            },
            columns,
            opener: if opener.is_empty() {
                base.opener.clone()
            } else {
                opener.to_string()
            },
            export_dir: optional_path(&self.export_dir),
            bookmarks_file: optional_path(&self.bookmarks_file),
            storage_quota_bytes: base.storage_quota_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text<T>(handler: &mut impl FnMut(KeyEvent) -> FormKeyResult<T>, text: &str) {
        for c in text.chars() {
            handler(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn link_form_collects_both_fields() {
        let mut form = LinkFormState::new(FormContext::Add, "", "");
        type_text(&mut |k| form.handle_key(k), "rust-lang.org");
        form.handle_key(key(KeyCode::Tab));
        type_text(&mut |k| form.handle_key(k), "Rustx");
        form.handle_key(key(KeyCode::Backspace));
        let result = form.handle_key(key(KeyCode::Enter));
        assert_eq!(
            result,
            FormKeyResult::Submit(LinkFormInput {
                context: FormContext::Add,
                url: "rust-lang.org".into(),
                name: "Rust".into(),
            })
        );
    }

    #[test]
    fn control_chords_are_not_typed() {
        let mut form = LinkFormState::new(FormContext::Edit(2), "a.com", "A");
        form.handle_key(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL));
        assert_eq!(form.url, "a.com");
        assert_eq!(form.handle_key(key(KeyCode::Esc)), FormKeyResult::Cancel);
    }

    #[test]
    fn confirm_defaults_to_no() {
        let mut confirm = ConfirmState::new("Delete?", ConfirmAction::DeleteLink(0));
        assert_eq!(confirm.handle_key(key(KeyCode::Enter)), FormKeyResult::Cancel);
        confirm.handle_key(key(KeyCode::Left));
        assert_eq!(confirm.handle_key(key(KeyCode::Enter)), FormKeyResult::Submit(()));
        assert_eq!(
            confirm.handle_key(key(KeyCode::Char('y'))),
            FormKeyResult::Submit(())
        );
    }

    #[test]
    fn prompt_edits_its_value() {
        let mut prompt = PromptState::new(PromptPurpose::BookmarkFilter, "ru");
        type_text(&mut |k| prompt.handle_key(k), "st");
        assert_eq!(
            prompt.handle_key(key(KeyCode::Enter)),
            FormKeyResult::Submit("rust".to_string())
        );
    }

    #[test]
    fn settings_form_cycles_fields_and_toggles_theme() {
        let mut form = SettingsFormState::new(&Settings::default(), &Theme::from_name("light"));
        form.handle_key(key(KeyCode::Tab));
        form.handle_key(key(KeyCode::Tab));
        assert_eq!(form.selected_field, SettingsField::Theme);
        form.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(form.theme_key, "dark");
        form.handle_key(key(KeyCode::BackTab));
        assert_eq!(form.selected_field, SettingsField::Columns);
        form.handle_key(key(KeyCode::Delete));
        type_text(&mut |k| form.handle_key(k), "3");
        let FormKeyResult::Submit(input) = form.handle_key(key(KeyCode::Enter)) else {
            panic!("expected submit");
        };
        let settings = input.to_settings(&Settings::default()).unwrap();
        assert_eq!(settings.columns, 3);
        assert_eq!(input.theme_key, "dark");
    }

    #[test]
    fn settings_reject_bad_columns() {
        let mut input = SettingsFormState::new(&Settings::default(), &Theme::from_name("light"))
            .to_input();
        input.columns = "9".into();
        assert!(input.to_settings(&Settings::default()).is_err());
        input.columns = "two".into();
        assert!(input.to_settings(&Settings::default()).is_err());
    }

    #[test]
    fn blank_paths_become_none() {
        let mut input = SettingsFormState::new(&Settings::default(), &Theme::from_name("light"))
            .to_input();
        input.bookmarks_file = "  ".into();
        input.export_dir = "/tmp/out".into();
        let settings = input.to_settings(&Settings::default()).unwrap();
        assert_eq!(settings.bookmarks_file, None);
        assert_eq!(settings.export_dir, Some(PathBuf::from("/tmp/out")));
    }
}
