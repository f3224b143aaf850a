use chrono::{Local, NaiveDateTime};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::forms::{
    ConfirmState, LinkField, LinkFormState, PromptState, SettingsField, SettingsFormState,
};
use super::{list_offset, AppState, Focus, PopupState};
use crate::board::{LinkCard, SlotKind, MIN_CONTROL_WIDTH};
use crate::entity::host_of;
use crate::theme::Theme;

pub fn draw(frame: &mut Frame, app: &AppState) {
    let size = frame.size();
    frame.render_widget(
        Block::default().style(Style::default().bg(app.theme.background)),
        size,
    );
    let layout = app.layout();

    render_header(frame, layout.header, app);

    let shortcuts = Paragraph::new(app.footer_line())
        .alignment(Alignment::Center)
        .style(Style::default().bg(app.theme.highlight));
    frame.render_widget(shortcuts, layout.shortcuts);

    render_board(frame, app);
    render_bookmarks(frame, app);

    let status = Paragraph::new(app.status_text())
        .alignment(Alignment::Center)
        .style(bar_style(&app.theme));
    frame.render_widget(status, layout.status);

    if let Some(popup) = &app.active_popup {
        render_popup(frame, popup, app);
    }
}

fn bar_style(theme: &Theme) -> Style {
    let fg = if theme.is_dark() {
        theme.text
    } else {
        theme.surface
    };
    Style::default()
        .bg(theme.primary)
        .fg(fg)
        .add_modifier(Modifier::BOLD)
}

fn selection_style(theme: &Theme) -> Style {
    let fg = if theme.is_dark() {
        theme.background
    } else {
        theme.text
    };
    Style::default()
        .bg(theme.highlight)
        .fg(fg)
        .add_modifier(Modifier::BOLD)
}

pub fn clock_text(now: NaiveDateTime) -> String {
    now.format("%I:%M %p · %A, %B %-d, %Y").to_string()
}

fn render_header(frame: &mut Frame, area: Rect, app: &AppState) {
    let clock = format!("{} ", clock_text(Local::now().naive_local()));
    let clock_width = UnicodeWidthStr::width(clock.as_str()) as u16;
    let parts = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(clock_width)])
        .split(area);
    let style = bar_style(&app.theme);
    frame.render_widget(
        Paragraph::new(format!(" {}", app.settings.title)).style(style),
        parts[0],
    );
    frame.render_widget(
        Paragraph::new(clock)
            .alignment(Alignment::Right)
            .style(style),
        parts[1],
    );
}

fn render_board(frame: &mut Frame, app: &AppState) {
    let layout = app.layout();
    let focused = app.focus == Focus::Links;
    let border = if focused {
        app.theme.primary
    } else {
        app.theme.muted
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Quick Links ")
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text));
    frame.render_widget(block, layout.links);

    let board = app.links().view();
    for (idx, slot) in board.slots().iter().enumerate() {
        if !board.is_visible(idx) {
            continue;
        }
        match &slot.kind {
            SlotKind::Link(card) => {
                let selected = focused && card.index == app.selected_link;
                render_card(frame, slot.area, card, selected, app);
            }
            SlotKind::AddNew => render_add_card(frame, slot.area, app),
        }
    }
}

fn render_card(frame: &mut Frame, area: Rect, card: &LinkCard, selected: bool, app: &AppState) {
    let theme = &app.theme;
    let (border_type, border_style) = if card.dragging {
        (
            BorderType::Double,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )
    } else if selected {
        (BorderType::Thick, Style::default().fg(theme.primary))
    } else {
        (BorderType::Rounded, Style::default().fg(theme.muted))
    };
    let body = if selected {
        selection_style(theme)
    } else {
        Style::default().bg(theme.surface).fg(theme.text)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(border_type)
        .border_style(border_style)
        .style(body);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let controls = area.width >= MIN_CONTROL_WIDTH;
    let text_width = usize::from(inner.width.saturating_sub(if controls { 7 } else { 0 }));
    let label = truncate_to_width(&card.label, text_width.saturating_sub(1));
    let remaining = text_width.saturating_sub(1 + UnicodeWidthStr::width(label.as_str()));
    let mut spans = vec![
        Span::raw(" "),
        Span::styled(label, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if remaining > 4 {
        spans.push(Span::styled(
            format!("  {}", truncate_to_width(&card.subtitle, remaining - 2)),
            Style::default().fg(theme.muted),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)),
        Rect::new(inner.x, inner.y, text_width as u16, 1),
    );

    if controls {
        let row = area.y + 1;
        let buf = frame.buffer_mut();
        buf.set_string(
            area.x + area.width - 6,
            row,
            "✎",
            Style::default().fg(theme.accent),
        );
        buf.set_string(
            area.x + area.width - 3,
            row,
            "✕",
            Style::default().fg(Color::Red),
        );
    }
}

fn render_add_card(frame: &mut Frame, area: Rect, app: &AppState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(app.theme.muted))
        .style(Style::default().bg(app.theme.surface));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(
        Paragraph::new("+ Add quick link")
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.muted)),
        inner,
    );
}

fn render_bookmarks(frame: &mut Frame, app: &AppState) {
    let layout = app.layout();
    let (Some(area), Some(rows)) = (layout.bookmarks, layout.bookmark_rows) else {
        return;
    };
    let focused = app.focus == Focus::Bookmarks;
    let title = if app.bookmark_filter.is_empty() {
        " Bookmarks ".to_string()
    } else {
        format!(" Bookmarks: {} ", app.bookmark_filter)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(if focused {
            app.theme.primary
        } else {
            app.theme.muted
        }))
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text));
    frame.render_widget(block, area);

    let visible = app.visible_bookmarks();
    if visible.is_empty() {
        frame.render_widget(
            Paragraph::new("No bookmarks").style(Style::default().fg(app.theme.muted)),
            rows,
        );
        return;
    }
    let height = usize::from(rows.height);
    let width = usize::from(rows.width);
    let offset = list_offset(app.selected_bookmark, height);
    let items: Vec<ListItem> = visible
        .iter()
        .enumerate()
        .skip(offset)
        .take(height)
        .map(|(idx, bookmark)| {
            let title = truncate_to_width(bookmark.display_title(), width.saturating_sub(1));
            let room = width.saturating_sub(UnicodeWidthStr::width(title.as_str()) + 2);
            let host = host_of(&bookmark.url).unwrap_or_default();
            let mut spans = vec![Span::raw(title)];
            if room > 3 && !host.is_empty() {
                spans.push(Span::styled(
                    format!("  {}", truncate_to_width(&host, room)),
                    Style::default().fg(app.theme.muted),
                ));
            }
            let style = if focused && idx == app.selected_bookmark {
                selection_style(&app.theme)
            } else {
                Style::default()
            };
            ListItem::new(Line::from(spans)).style(style)
        })
        .collect();
    frame.render_widget(List::new(items), rows);
}

/// Cut `text` to at most `max` columns, marking the cut with an ellipsis.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if UnicodeWidthStr::width(text) <= max {
        return text.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn render_popup(frame: &mut Frame, popup: &PopupState, app: &AppState) {
    match popup {
        PopupState::Message(msg) => {
            let area = centered_rect(frame.size(), 50, 30);
            frame.render_widget(Clear, area);
            let block = Paragraph::new(format!("{msg}\n\nPress Enter or Esc to close."))
                .wrap(Wrap { trim: true })
                .style(Style::default().bg(app.theme.surface).fg(app.theme.text))
                .block(
                    Block::default()
                        .title("Message")
                        .borders(Borders::ALL)
                        .style(Style::default().bg(app.theme.surface)),
                );
            frame.render_widget(block, area);
        }
        PopupState::LinkForm(form) => render_link_form(frame, form, app),
        PopupState::Prompt(prompt) => render_prompt(frame, prompt, app),
        PopupState::Confirm(confirm) => render_confirm(frame, confirm, app),
        PopupState::Settings(form) => render_settings_form(frame, form, app),
    }
}

fn popup_frame(frame: &mut Frame, area: Rect, title: &str, app: &AppState) -> Rect {
    frame.render_widget(Clear, area);
    let block = Block::default()
        .title(format!(" {title} "))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.primary))
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    inner.inner(&Margin {
        horizontal: 1,
        vertical: 0,
    })
}

fn render_form_lines(frame: &mut Frame, area: Rect, lines: &[FormLine], app: &AppState) {
    let rendered = materialize_form_lines(lines, usize::from(area.width), app);
    frame.render_widget(
        Paragraph::new(rendered).wrap(Wrap { trim: false }),
        area,
    );
}

fn render_link_form(frame: &mut Frame, form: &LinkFormState, app: &AppState) {
    let area = centered_rect(frame.size(), 60, 40);
    let inner = popup_frame(frame, area, form.context.title(), app);
    let mut lines = vec![
        plain_line(""),
        make_field_line("URL", &form.url, form.selected_field == LinkField::Url, app),
        make_field_line("Name", &form.name, form.selected_field == LinkField::Name, app),
        plain_line(""),
    ];
    push_error(&mut lines, form.error.as_deref());
    lines.push(shortcut_hint(&[("Tab", "Next field"), ("Enter", "Save"), ("Esc", "Cancel")], app));
    render_form_lines(frame, inner, &lines, app);
}

fn render_prompt(frame: &mut Frame, prompt: &PromptState, app: &AppState) {
    let area = centered_rect(frame.size(), 60, 50);
    let inner = popup_frame(frame, area, &prompt.purpose.title(), app);
    let mut lines = vec![
        plain_line(""),
        make_field_line(prompt.purpose.label(), &prompt.value, true, app),
        plain_line(""),
    ];
    push_error(&mut lines, prompt.error.as_deref());
    lines.push(shortcut_hint(&[("Enter", "Apply"), ("Esc", "Cancel")], app));
    if !prompt.hints.is_empty() {
        lines.push(plain_line(""));
        for hint in &prompt.hints {
            lines.push(FormLine::plain(Line::from(Span::styled(
                hint.clone(),
                Style::default().fg(app.theme.muted),
            ))));
        }
    }
    render_form_lines(frame, inner, &lines, app);
}

pub struct ConfirmLayout {
    pub area: Rect,
    pub yes: Rect,
    pub no: Rect,
}

/// Placement of the confirmation popup and its two buttons.
pub fn confirm_layout(screen: Rect) -> ConfirmLayout {
    let area = centered_rect(screen, 50, 30);
    let inner = Block::default().borders(Borders::ALL).inner(area);
    let row = inner.y + inner.height.saturating_sub(1);
    let mid = inner.x + inner.width / 2;
    ConfirmLayout {
        area,
        yes: Rect::new(mid.saturating_sub(9), row, 7, 1),
        no: Rect::new(mid + 2, row, 6, 1),
    }
}

fn render_confirm(frame: &mut Frame, confirm: &ConfirmState, app: &AppState) {
    let layout = confirm_layout(frame.size());
    frame.render_widget(Clear, layout.area);
    let block = Block::default()
        .title(" Confirm ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.theme.accent))
        .style(Style::default().bg(app.theme.surface).fg(app.theme.text));
    let inner = block.inner(layout.area);
    frame.render_widget(block, layout.area);
    frame.render_widget(
        Paragraph::new(confirm.message.clone())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        Rect::new(
            inner.x,
            inner.y + inner.height.min(1),
            inner.width,
            inner.height.saturating_sub(2),
        ),
    );
    let button = |active: bool| {
        if active {
            selection_style(&app.theme)
        } else {
            Style::default().fg(app.theme.muted)
        }
    };
    frame.render_widget(
        Paragraph::new("[ Yes ]").style(button(confirm.yes_selected)),
        layout.yes,
    );
    frame.render_widget(
        Paragraph::new("[ No ]").style(button(!confirm.yes_selected)),
        layout.no,
    );
}

fn render_settings_form(frame: &mut Frame, form: &SettingsFormState, app: &AppState) {
    let area = centered_rect(frame.size(), 70, 60);
    let inner = popup_frame(frame, area, "Settings", app);
    let mut lines = vec![plain_line("")];
    for field in SettingsField::ALL {
        let selected = form.selected_field == field;
        let line = match field {
            SettingsField::Title => make_field_line(field.label(), &form.title, selected, app),
            SettingsField::Columns => make_field_line(field.label(), &form.columns, selected, app),
            SettingsField::Theme => {
                let name = Theme::from_name(form.theme_key).name;
                make_field_line(field.label(), &format!("{name}  (Space to switch)"), selected, app)
            }
            SettingsField::Opener => make_field_line(field.label(), &form.opener, selected, app),
            SettingsField::ExportDir => {
                make_field_line(field.label(), &form.export_dir, selected, app)
            }
            SettingsField::BookmarksFile => {
                make_field_line(field.label(), &form.bookmarks_file, selected, app)
            }
        };
        lines.push(line);
    }
    lines.push(plain_line(""));
    push_error(&mut lines, form.error.as_deref());
    lines.push(shortcut_hint(
        &[("Tab", "Next field"), ("Enter", "Save"), ("Esc", "Cancel")],
        app,
    ));
    render_form_lines(frame, inner, &lines, app);
}

#[derive(Clone)]
struct FormLine {
    line: Line<'static>,
    highlight: bool,
}

impl FormLine {
    fn plain(line: Line<'static>) -> Self {
        Self {
            line,
            highlight: false,
        }
    }

    fn highlighted(line: Line<'static>) -> Self {
        Self {
            line,
            highlight: true,
        }
    }
}

fn materialize_form_lines(lines: &[FormLine], width: usize, app: &AppState) -> Vec<Line<'static>> {
    lines
        .iter()
        .map(|form_line| {
            if form_line.highlight {
                highlight_line_with_width(form_line.line.clone(), width, app)
            } else {
                form_line.line.clone()
            }
        })
        .collect()
}

fn highlight_line_with_width(mut line: Line<'static>, width: usize, app: &AppState) -> Line<'static> {
    let mut text_width = 0usize;
    let highlight_style = selection_style(&app.theme);
    for span in &mut line.spans {
        span.style = highlight_style;
        text_width += UnicodeWidthStr::width(span.content.as_ref());
    }
    if width > text_width {
        line.spans
            .push(Span::styled(" ".repeat(width - text_width), highlight_style));
    }
    line
}

fn plain_line(line: impl Into<Line<'static>>) -> FormLine {
    FormLine::plain(line.into())
}

fn push_error(lines: &mut Vec<FormLine>, error: Option<&str>) {
    if let Some(error) = error {
        lines.push(FormLine::plain(Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ))));
        lines.push(plain_line(""));
    }
}

fn make_field_line(label: &str, value: &str, selected: bool, app: &AppState) -> FormLine {
    let value_display = if selected {
        format!("{value}_")
    } else if value.trim().is_empty() {
        "(empty)".to_string()
    } else {
        value.to_string()
    };
    let label_style = Style::default()
        .fg(app.theme.accent)
        .add_modifier(Modifier::BOLD);
    let label_span = Span::styled(format!("{label}: "), label_style);
    let value_span = Span::styled(value_display, Style::default().fg(app.theme.text));
    let line = Line::from(vec![label_span, value_span]);
    if selected {
        FormLine::highlighted(line)
    } else {
        FormLine::plain(line)
    }
}

fn shortcut_hint(pairs: &[(&str, &str)], app: &AppState) -> FormLine {
    let key_style = Style::default()
        .fg(app.theme.accent)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::new();
    for (idx, (key, label)) in pairs.iter().enumerate() {
        if idx > 0 {
            spans.push(Span::raw("    "));
        }
        spans.push(Span::styled(key.to_string(), key_style));
        spans.push(Span::raw(format!(" {label}")));
    }
    FormLine::plain(Line::from(spans))
}

fn centered_rect(area: Rect, width_percent: u16, height_percent: u16) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - height_percent) / 2),
            Constraint::Percentage(height_percent),
            Constraint::Percentage((100 - height_percent) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}
