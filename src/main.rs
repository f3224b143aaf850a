use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use tabdeck::app::{render, AppState};
use tabdeck::config::AppPaths;

fn main() -> Result<()> {
    let paths = AppPaths::new()?;
    init_logging(&paths.log_file)?;
    let mut app = AppState::with_paths(paths)?;
    let result = run_app(&mut app);
    if let Err(err) = &result {
        log::error!("tabdeck exited with error: {err:#}");
    }
    result
}

/// The terminal belongs to the UI, so log records go to a file.
fn init_logging(log_file: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("Unable to open log file {}", log_file.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn run_app(app: &mut AppState) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = event_loop(&mut terminal, app);

    restore_terminal(&mut terminal)?;
    result
}

fn event_loop<B>(terminal: &mut Terminal<B>, app: &mut AppState) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    let tick_rate = Duration::from_millis(200);
    loop {
        let size = terminal.size()?;
        app.sync_layout(size);
        terminal.draw(|frame| render::draw(frame, app))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    app.handle_mouse(mouse, size);
                }
                Event::FocusLost => app.handle_focus_lost(),
                Event::Resize(_, _) | Event::FocusGained | Event::Paste(_) => {}
            };
        }

        if let Some(target) = app.take_pending_open() {
            let opener = app.settings.opener.clone();
            match open_target(terminal, &opener, &target) {
                Ok(Some(0)) => app.set_status(Some(format!("Opened {target}"))),
                Ok(code) => app.set_status(Some(format!(
                    "{opener} exited with status {}",
                    code.unwrap_or_default()
                ))),
                Err(err) => {
                    log::error!("could not open {target}: {err:#}");
                    app.set_status(Some(format!("Open failed: {err}")));
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

fn restore_terminal<B>(terminal: &mut Terminal<B>) -> Result<()>
where
    B: ratatui::backend::Backend + Write,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn with_terminal_suspension<B, F, T>(terminal: &mut Terminal<B>, f: F) -> Result<T>
where
    B: ratatui::backend::Backend + Write,
    F: FnOnce() -> Result<T>,
{
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    let result = f();
    enable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        EnterAlternateScreen,
        EnableMouseCapture
    )?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    result
}

/// Hand `target` to the opener. Terminal browsers take over the screen
/// until they exit.
fn open_target<B>(terminal: &mut Terminal<B>, opener: &str, target: &str) -> Result<Option<i32>>
where
    B: ratatui::backend::Backend + Write,
{
    log::info!("opening {target} with {opener}");
    with_terminal_suspension(terminal, || {
        let status = Command::new(opener)
            .arg(target)
            .stdin(Stdio::inherit())
            .status()
            .with_context(|| format!("Unable to run {opener}"))?;
        Ok(status.code())
    })
}
