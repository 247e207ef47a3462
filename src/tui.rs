// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::config::{self, VidmetaConfig};
use crate::flow::{Effect, FlowEvent, FlowState, SelectionFlow};
use crate::permission::{self, PERMISSION_PROMPT};
use crate::picker::{ExplorerPicker, FileFilter, PICKER_TITLE, PickerOutcome};
use crate::report;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers,
    },
    cursor::Show,
    execute,
    terminal::{
        EnterAlternateScreen, LeaveAlternateScreen, SetTitle, disable_raw_mode, enable_raw_mode,
    },
};
use ratatui::{
    Frame, Terminal,
    backend::{Backend, CrosstermBackend},
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::{
    error::Error,
    io::{self, Stdout, Write},
};

pub struct Colors {
    pub buffer_bg: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub row_fg: Color,
    pub button_fg: Color,
    pub border: Color,
    pub notice: Color,
    pub disabled: Color,
}

impl Colors {
    const fn new(color: &tailwind::Palette) -> Self {
        Self {
            buffer_bg: tailwind::SLATE.c950,
            header_bg: color.c900,
            header_fg: tailwind::SLATE.c200,
            row_fg: tailwind::SLATE.c200,
            button_fg: color.c200,
            border: color.c400,
            notice: tailwind::AMBER.c400,
            disabled: tailwind::SLATE.c400,
        }
    }
}

mod tailwind {
    use ratatui::style::Color;

    pub struct Palette {
        pub c200: Color,
        pub c400: Color,
        pub c900: Color,
        pub c950: Color,
    }

    pub const SLATE: Palette = Palette {
        c200: Color::Rgb(226, 232, 240),
        c400: Color::Rgb(148, 163, 184),
        c900: Color::Rgb(15, 23, 42),
        c950: Color::Rgb(2, 6, 23),
    };

    pub const BLUE: Palette = Palette {
        c200: Color::Rgb(191, 219, 254),
        c400: Color::Rgb(96, 165, 250),
        c900: Color::Rgb(30, 58, 138),
        c950: Color::Rgb(23, 37, 84),
    };

    pub const AMBER: Palette = Palette {
        c200: Color::Rgb(253, 230, 138),
        c400: Color::Rgb(251, 191, 36),
        c900: Color::Rgb(120, 53, 15),
        c950: Color::Rgb(69, 26, 3),
    };
}

pub struct App {
    pub colors: Colors,
    pub config: VidmetaConfig,
    pub flow: SelectionFlow,
    pub picker: Option<ExplorerPicker>,
    pub report_text: String,
    pub scroll: u16,
    pub notice: Option<String>,
    pub asking_permission: bool,
}

impl App {
    pub fn new(config: VidmetaConfig) -> Self {
        let flow = SelectionFlow::new(permission::check(&config));
        Self {
            colors: Colors::new(&tailwind::BLUE),
            config,
            flow,
            picker: None,
            report_text: String::new(),
            scroll: 0,
            notice: None,
            asking_permission: false,
        }
    }

    /// Runs effects until one needs the user again.
    fn apply(&mut self, mut effect: Effect) {
        loop {
            effect = match effect {
                Effect::Nothing => return,
                Effect::RequestPermission => {
                    self.asking_permission = true;
                    return;
                }
                Effect::OpenPicker => match self.open_picker() {
                    Ok(picker) => {
                        self.picker = Some(picker);
                        return;
                    }
                    Err(e) => {
                        self.notice = Some(e.to_string());
                        self.flow.handle(FlowEvent::PickerResult(None))
                    }
                },
                Effect::Notify(message) => {
                    self.notice = Some(message);
                    return;
                }
                Effect::Extract(path) => {
                    let result = report::inspect_and_render(&path, &self.config, false)
                        .map_err(|e| e.to_string());
                    self.flow.handle(FlowEvent::Extracted(result))
                }
                Effect::Render(text) => {
                    self.report_text = text;
                    self.scroll = 0;
                    return;
                }
            };
        }
    }

    fn open_picker(&self) -> crate::error::Result<ExplorerPicker> {
        let filter = FileFilter::new(&self.config.file_filter)?;
        ExplorerPicker::open(
            &self.config.start_directory(),
            filter,
            Style::default().bg(self.colors.buffer_bg),
        )
    }

    fn answer_permission(&mut self, granted: bool) {
        self.asking_permission = false;
        permission::record_decision(&mut self.config, granted);
        let effect = self.flow.handle(FlowEvent::PermissionResult(granted));
        self.apply(effect);
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some(picker) = self.picker.as_mut() else {
            return;
        };
        match picker.handle_key(key) {
            Ok(PickerOutcome::Browsing) => {}
            Ok(PickerOutcome::Rejected(message)) => self.notice = Some(message),
            Ok(PickerOutcome::Selected(path)) => {
                self.picker = None;
                let effect = self.flow.handle(FlowEvent::PickerResult(Some(path)));
                self.apply(effect);
            }
            Ok(PickerOutcome::Cancelled) => {
                self.picker = None;
                let effect = self.flow.handle(FlowEvent::PickerResult(None));
                self.apply(effect);
            }
            Err(e) => self.notice = Some(e.to_string()),
        }
    }

    /// Returns true when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        // Notices are transient: any key dismisses them.
        self.notice = None;

        if self.asking_permission {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.answer_permission(true),
                KeyCode::Char('n') | KeyCode::Esc => self.answer_permission(false),
                _ => {}
            }
            return false;
        }

        if self.picker.is_some() {
            self.handle_picker_key(key);
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Enter | KeyCode::Char(' ') => {
                let effect = self.flow.handle(FlowEvent::Click);
                self.apply(effect);
            }
            KeyCode::Up | KeyCode::Char('k') => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                let max = self.report_text.lines().count().saturating_sub(1) as u16;
                self.scroll = (self.scroll + 1).min(max);
            }
            _ => {}
        }
        false
    }
}

/// Restores the terminal when dropped, whichever way `run` returns.
struct TerminalGuard<W: Write> {
    out: W,
}

impl TerminalGuard<Stdout> {
    fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut guard = TerminalGuard { out: io::stdout() };
        execute!(
            guard.out,
            SetTitle("vidmeta"),
            EnterAlternateScreen,
            EnableMouseCapture
        )?;
        Ok(guard)
    }
}

impl<W: Write> Drop for TerminalGuard<W> {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            tracing::warn!("Failed to disable raw mode: {}", e);
        }
        if let Err(e) = execute!(self.out, LeaveAlternateScreen, DisableMouseCapture, Show) {
            tracing::warn!("Failed to restore terminal: {}", e);
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let config = config::load_config_or_default();

    let _guard = TerminalGuard::enter()?;
    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    run_app(&mut terminal, &mut app)
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && app.handle_key(key)
        {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3), // Button
                Constraint::Min(3),    // Report
                Constraint::Length(3), // Notice / controls
            ]
            .as_ref(),
        )
        .split(f.area());

    f.render_widget(
        Block::default().style(Style::default().bg(app.colors.buffer_bg)),
        f.area(),
    );

    let button = Paragraph::new(Line::from(Span::styled(
        format!("[ {} ]", PICKER_TITLE),
        Style::default()
            .fg(app.colors.button_fg)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title("vidmeta")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.colors.border))
            .style(Style::default().bg(app.colors.header_bg).fg(app.colors.header_fg)),
    );
    f.render_widget(button, chunks[0]);

    let report_lines: Vec<Line> = if app.report_text.is_empty() {
        vec![Line::from(Span::styled(
            "No video selected",
            Style::default().fg(app.colors.disabled),
        ))]
    } else {
        app.report_text.lines().map(Line::from).collect()
    };
    let report_view = Paragraph::new(report_lines)
        .style(Style::default().fg(app.colors.row_fg))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0))
        .block(
            Block::default()
                .title("Report")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.colors.border)),
        );
    f.render_widget(report_view, chunks[1]);

    let footer = match &app.notice {
        Some(notice) => Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(app.colors.notice),
        )),
        None if *app.flow.state() == FlowState::FilePickerOpen => {
            Line::from("jk: Navigate  Enter: Open/Select  h/Backspace: Up  Esc: Cancel")
        }
        None => Line::from("Enter: Select Video  jk: Scroll  q: Quit"),
    };
    let footer = Paragraph::new(footer)
        .style(Style::default().fg(app.colors.row_fg))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.colors.border)),
        );
    f.render_widget(footer, chunks[2]);

    if let Some(picker) = &app.picker {
        render_picker(f, app, picker);
    }

    if app.asking_permission {
        render_permission_prompt(f, app);
    }
}

fn render_picker(f: &mut Frame, app: &App, picker: &ExplorerPicker) {
    let area = centered_rect(80, 70, f.area());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(PICKER_TITLE)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(app.colors.border));
    f.render_widget(block, area);

    let inner = Rect {
        x: area.x + 1,
        y: area.y + 1,
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    };
    f.render_widget_ref(picker.explorer().widget(), inner);
}

fn render_permission_prompt(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.area());
    f.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(PERMISSION_PROMPT),
        Line::from(""),
        Line::from(Span::styled(
            "y: Allow  n: Deny",
            Style::default().fg(app.colors.border),
        )),
    ];
    let prompt = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .style(Style::default().fg(app.colors.row_fg).bg(app.colors.header_bg))
        .block(
            Block::default()
                .title("Storage access")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.colors.notice)),
        );
    f.render_widget(prompt, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityTier;
    use crate::permission::PERMISSION_NOTICE;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_stored_denial_shows_notice_until_next_key() {
        let cfg = VidmetaConfig {
            allow_storage_read: Some(false),
            ..VidmetaConfig::default()
        };
        let mut app = App::new(cfg);
        assert!(!app.handle_key(key(KeyCode::Enter)));
        assert_eq!(app.notice.as_deref(), Some(PERMISSION_NOTICE));
        assert!(app.picker.is_none());

        app.handle_key(key(KeyCode::Down));
        assert_eq!(app.notice, None);
    }

    #[test]
    fn test_undetermined_permission_opens_prompt() {
        let mut app = App::new(VidmetaConfig::default());
        app.handle_key(key(KeyCode::Enter));
        assert!(app.asking_permission);
        assert_eq!(app.flow.state(), &FlowState::PermissionRequested);
    }

    #[test]
    fn test_picker_opens_on_click_and_cancels_silently() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = VidmetaConfig {
            capability_tier: CapabilityTier::Legacy,
            start_directory: dir.path().to_string_lossy().to_string(),
            ..VidmetaConfig::default()
        };
        let mut app = App::new(cfg);
        app.handle_key(key(KeyCode::Enter));
        assert!(app.picker.is_some());
        assert_eq!(app.flow.state(), &FlowState::FilePickerOpen);

        app.handle_key(key(KeyCode::Esc));
        assert!(app.picker.is_none());
        assert_eq!(app.notice, None);
        assert!(app.flow.is_idle());
    }

    fn footer_text(app: &App) -> String {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, buffer.area.height - 3)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_footer_follows_flow_state() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = VidmetaConfig {
            capability_tier: CapabilityTier::Legacy,
            start_directory: dir.path().to_string_lossy().to_string(),
            ..VidmetaConfig::default()
        };
        let mut app = App::new(cfg);
        assert!(footer_text(&app).contains("Enter: Select Video"));

        app.handle_key(key(KeyCode::Enter));
        assert!(footer_text(&app).contains("Esc: Cancel"));

        app.handle_key(key(KeyCode::Esc));
        assert!(footer_text(&app).contains("q: Quit"));
    }

    #[test]
    fn test_guard_leaves_alternate_screen_on_drop() {
        let mut out: Vec<u8> = Vec::new();
        {
            let _guard = TerminalGuard { out: &mut out };
        }
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("\x1b[?1049l"));
        assert!(written.contains("\x1b[?25h"));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = App::new(VidmetaConfig::default());
        assert!(app.handle_key(key(KeyCode::Char('q'))));
        let ctrl_c = KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            ..key(KeyCode::Char('c'))
        };
        assert!(app.handle_key(ctrl_c));
    }
}
