use std::io;
use std::time::Duration;

use anyhow::Result;
use chrono::{Local, TimeDelta, Utc};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    crossterm::{
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    layout::{Constraint, Direction, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use crate::db::Db;
use crate::error::Error;
use crate::models::{Task, WorkEntry, format_duration};

// Redraw interval so running timers tick without key presses.
const TICK: Duration = Duration::from_millis(500);

#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Creating,
    CompleteConfirm,
    Help,
}

/// Timer state of the selected task.
#[derive(Debug, Default)]
pub struct Details {
    pub current: Option<WorkEntry>,
    pub total: TimeDelta,
}

pub struct App {
    pub tasks: Vec<Task>,
    pub running: Vec<bool>,
    pub task_state: ListState,
    pub details: Details,
    pub db: Db,
    pub input_mode: InputMode,
    pub input_buffer: String,
    pub status: Option<String>,
}

impl App {
    pub fn new(db: Db) -> Self {
        Self {
            tasks: vec![],
            running: vec![],
            task_state: ListState::default(),
            details: Details::default(),
            db,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status: None,
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.task_state.selected().and_then(|i| self.tasks.get(i))
    }

    pub async fn load_tasks(&mut self) -> Result<()> {
        let selected_id = self.selected_task().map(|t| t.id);

        self.tasks = self.db.tasks().find_all_non_completed_tasks().await?;
        self.tasks.sort_by_key(|t| t.id);

        let entries = self.db.work_entries();
        self.running.clear();
        for task in &self.tasks {
            self.running
                .push(entries.find_current_work_entry(task.id).await?.is_some());
        }

        let index = selected_id
            .and_then(|id| self.tasks.iter().position(|t| t.id == id))
            .or_else(|| {
                let previous = self.task_state.selected().unwrap_or(0);
                (!self.tasks.is_empty()).then(|| previous.min(self.tasks.len() - 1))
            });
        self.task_state.select(index);

        self.load_details().await
    }

    pub async fn load_details(&mut self) -> Result<()> {
        self.details = match self.selected_task().map(|t| t.id) {
            Some(task_id) => {
                let entries = self.db.work_entries();
                Details {
                    current: entries.find_current_work_entry(task_id).await?,
                    total: entries.calculate_total_time(task_id).await?,
                }
            }
            None => Details::default(),
        };
        Ok(())
    }

    pub async fn next_task(&mut self) -> Result<()> {
        if self.tasks.is_empty() {
            return Ok(());
        }
        let i = match self.task_state.selected() {
            Some(i) if i + 1 < self.tasks.len() => i + 1,
            _ => 0,
        };
        self.task_state.select(Some(i));
        self.load_details().await
    }

    pub async fn previous_task(&mut self) -> Result<()> {
        if self.tasks.is_empty() {
            return Ok(());
        }
        let i = match self.task_state.selected() {
            Some(0) | None => self.tasks.len() - 1,
            Some(i) => i - 1,
        };
        self.task_state.select(Some(i));
        self.load_details().await
    }

    pub fn start_creating(&mut self) {
        self.input_buffer.clear();
        self.input_mode = InputMode::Creating;
    }

    pub async fn finish_creating(&mut self) -> Result<()> {
        let name = self.input_buffer.trim().to_string();
        self.cancel_input();
        if name.is_empty() {
            return Ok(());
        }

        let id = self.db.tasks().create(&name).await?;
        self.load_tasks().await?;
        if let Some(index) = self.tasks.iter().position(|t| t.id == id) {
            self.task_state.select(Some(index));
            self.load_details().await?;
        }
        self.status = Some(format!("added task {id}"));
        Ok(())
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
    }

    /// Starts a timer on the selected task, or stops the running one.
    pub async fn toggle_timer(&mut self) -> Result<()> {
        let Some(task_id) = self.selected_task().map(|t| t.id) else {
            return Ok(());
        };

        let entries = self.db.work_entries();
        match entries.find_current_work_entry(task_id).await? {
            Some(entry) => {
                entries.finish_work_entry(entry.id).await?;
                self.status = Some(format!("stopped timer on task {task_id}"));
            }
            None => match entries.create_work_entry(task_id).await {
                Ok(_) => self.status = Some(format!("started timer on task {task_id}")),
                Err(Error::WorkEntryAlreadyOpen { .. }) => {
                    self.status = Some(format!("timer already running on task {task_id}"))
                }
                Err(err) => return Err(err.into()),
            },
        }

        self.load_tasks().await
    }

    pub fn start_complete_confirm(&mut self) {
        if self.selected_task().is_some() {
            self.input_mode = InputMode::CompleteConfirm;
        }
    }

    /// Completing a task also stops its running timer.
    pub async fn confirm_complete(&mut self) -> Result<()> {
        self.input_mode = InputMode::Normal;
        let Some(task_id) = self.selected_task().map(|t| t.id) else {
            return Ok(());
        };

        self.db.complete_task(task_id).await?;
        self.status = Some(format!("completed task {task_id}"));

        self.load_tasks().await
    }

    pub fn show_help(&mut self) {
        self.input_mode = InputMode::Help;
    }

    pub fn hide_help(&mut self) {
        self.input_mode = InputMode::Normal;
    }
}

pub async fn run_app(db: Db) -> Result<()> {
    let mut app = App::new(db);
    app.load_tasks().await?;

    let mut terminal = match setup_terminal() {
        Ok(terminal) => terminal,
        Err(err) => {
            let _ = restore_terminal(&mut io::stdout());
            return Err(err);
        }
    };

    let res = run_app_loop(&mut terminal, &mut app).await;

    restore_terminal(terminal.backend_mut())?;
    terminal.show_cursor()?;

    res
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

/// Leaves raw mode, the alternate screen and mouse capture. Safe after a
/// partial `setup_terminal`.
fn restore_terminal<W: io::Write>(out: &mut W) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(out, LeaveAlternateScreen, DisableMouseCapture)
}

async fn run_app_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if !event::poll(TICK)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input_mode {
            InputMode::Normal => {
                app.status = None;
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Down | KeyCode::Char('j') => app.next_task().await?,
                    KeyCode::Up | KeyCode::Char('k') => app.previous_task().await?,
                    KeyCode::Char('a') => app.start_creating(),
                    KeyCode::Char('s') | KeyCode::Enter => app.toggle_timer().await?,
                    KeyCode::Char('c') => app.start_complete_confirm(),
                    KeyCode::Char('?') => app.show_help(),
                    _ => {}
                }
            }
            InputMode::Creating => match key.code {
                KeyCode::Enter => app.finish_creating().await?,
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                KeyCode::Char(c) => app.input_buffer.push(c),
                _ => {}
            },
            InputMode::CompleteConfirm => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => app.confirm_complete().await?,
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.cancel_input(),
                _ => {}
            },
            InputMode::Help => match key.code {
                KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => app.hide_help(),
                _ => {}
            },
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);

    let task_items: Vec<ListItem> = app
        .tasks
        .iter()
        .zip(&app.running)
        .map(|(t, running)| {
            let marker = if *running { "●" } else { " " };
            ListItem::new(Span::raw(format!("{marker} {:>3}  {}", t.id, t.name)))
        })
        .collect();

    let tasks = List::new(task_items)
        .block(
            Block::default()
                .title("tasks")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol(">> ");

    f.render_stateful_widget(tasks, content_chunks[0], &mut app.task_state);

    let details = Paragraph::new(detail_lines(app))
        .block(Block::default().title("time").borders(Borders::ALL));
    f.render_widget(details, content_chunks[1]);

    let footer = app
        .status
        .clone()
        .unwrap_or_else(|| "?: help  q: quit".to_string());
    f.render_widget(
        Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
        rows[1],
    );

    match app.input_mode {
        InputMode::Creating => {
            let popup_area = centered_rect(60, 20, f.area());
            f.render_widget(Clear, popup_area);

            let input = Paragraph::new(app.input_buffer.as_str())
                .block(Block::default().title("new task").borders(Borders::ALL))
                .style(Style::default().fg(Color::Green));
            f.render_widget(input, popup_area);
        }
        InputMode::CompleteConfirm => {
            let popup_area = centered_rect(60, 20, f.area());
            f.render_widget(Clear, popup_area);

            let target_name = app
                .selected_task()
                .map(|t| t.name.as_str())
                .unwrap_or("task");
            let confirm_text = format!("Complete '{target_name}'?\n\ny: confirm | n/esc: cancel");
            let confirm = Paragraph::new(confirm_text)
                .block(Block::default().title("confirm complete").borders(Borders::ALL))
                .style(Style::default().fg(Color::Yellow));
            f.render_widget(confirm, popup_area);
        }
        InputMode::Help => {
            let popup_area = centered_rect(80, 60, f.area());
            f.render_widget(Clear, popup_area);

            let help_text = "HELP\n\nNavigation:\n  j/k: move up/down\n\nActions:\n  a: add new task\n  s/enter: start/stop timer on selected task\n  c: complete selected task\n  ?: show/hide this help\n  q: quit\n\nPress ? or ESC to close";
            let help = Paragraph::new(help_text)
                .block(Block::default().title("help").borders(Borders::ALL))
                .style(Style::default().fg(Color::White));
            f.render_widget(help, popup_area);
        }
        InputMode::Normal => {}
    }
}

fn detail_lines(app: &App) -> Vec<Line<'static>> {
    let Some(task) = app.selected_task() else {
        return vec![Line::from("no open tasks, press 'a' to add one")];
    };

    let now = Utc::now();
    let mut lines = vec![
        Line::from(Span::styled(
            task.name.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];

    match &app.details.current {
        Some(entry) => {
            lines.push(Line::from(Span::styled(
                format!("running  {}", format_duration(entry.elapsed(now))),
                Style::default().fg(Color::Green),
            )));
            lines.push(Line::from(format!(
                "since    {}",
                entry.started_on.with_timezone(&Local).format("%H:%M:%S")
            )));
        }
        None => lines.push(Line::from("idle")),
    }

    let running = app
        .details
        .current
        .as_ref()
        .map(|e| e.elapsed(now))
        .unwrap_or_else(TimeDelta::zero);
    lines.push(Line::from(format!(
        "total    {}",
        format_duration(app.details.total + running)
    )));

    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [popup] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(popup);
    popup
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn app_with(names: &[&str]) -> App {
        let db = Db::in_memory().await.unwrap();
        for name in names {
            db.tasks().create(name).await.unwrap();
        }
        let mut app = App::new(db);
        app.load_tasks().await.unwrap();
        app
    }

    #[test]
    fn popup_is_centered() {
        let popup = centered_rect(60, 20, Rect::new(0, 0, 100, 50));
        assert_eq!(popup, Rect::new(20, 20, 60, 10));
    }

    #[test]
    fn restore_leaves_alternate_screen() {
        let mut out = Vec::new();
        restore_terminal(&mut out).unwrap();

        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("\x1b[?1049l"));
    }

    #[tokio::test]
    async fn selection_wraps_around() {
        let mut app = app_with(&["one", "two"]).await;
        assert_eq!(app.task_state.selected(), Some(0));

        app.next_task().await.unwrap();
        assert_eq!(app.selected_task().unwrap().name, "two");
        app.next_task().await.unwrap();
        assert_eq!(app.selected_task().unwrap().name, "one");
        app.previous_task().await.unwrap();
        assert_eq!(app.selected_task().unwrap().name, "two");
    }

    #[tokio::test]
    async fn toggle_timer_starts_then_stops() {
        let mut app = app_with(&["focus"]).await;

        app.toggle_timer().await.unwrap();
        assert!(app.details.current.is_some());
        assert_eq!(app.running, vec![true]);

        app.toggle_timer().await.unwrap();
        assert!(app.details.current.is_none());
        assert_eq!(app.running, vec![false]);
    }

    #[tokio::test]
    async fn completing_removes_task_and_closes_timer() {
        let mut app = app_with(&["ship it", "later"]).await;
        let task_id = app.selected_task().unwrap().id;
        app.toggle_timer().await.unwrap();

        app.start_complete_confirm();
        assert_eq!(app.input_mode, InputMode::CompleteConfirm);
        app.confirm_complete().await.unwrap();

        assert_eq!(app.tasks.len(), 1);
        assert_eq!(app.selected_task().unwrap().name, "later");
        let entries = app.db.work_entries();
        let current = entries.find_current_work_entry(task_id).await.unwrap();
        assert_eq!(current, None);
    }

    #[tokio::test]
    async fn blank_names_are_not_created() {
        let mut app = app_with(&[]).await;
        app.start_creating();
        app.input_buffer.push_str("   ");
        app.finish_creating().await.unwrap();
        assert!(app.tasks.is_empty());

        app.start_creating();
        app.input_buffer.push_str("new one");
        app.finish_creating().await.unwrap();
        assert_eq!(app.selected_task().unwrap().name, "new one");
        assert_eq!(app.input_mode, InputMode::Normal);
    }
}
