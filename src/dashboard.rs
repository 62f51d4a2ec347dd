//! Terminal dashboard
//!
//! A read-only table over the result cache. The dashboard never touches the
//! engine beyond subscribing to its state: it redraws whenever a cycle
//! finishes.
//!
//! While the table is live nothing else may write to the terminal, or the
//! inline viewport ends up drawn over stale rows. Console output is routed
//! through [`ConsoleLines`] instead and printed above the table.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use ratatui::{
    Frame, Terminal, TerminalOptions, Viewport,
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, Widget},
};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::{
    cache::{CacheEntry, ResultCache},
    engine::EngineState,
};

/// Display form of one cache slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardRow {
    pub name: String,
    pub status: &'static str,
    pub response: String,
    pub message: String,
    pub color: Color,
}

impl From<&CacheEntry> for DashboardRow {
    fn from(entry: &CacheEntry) -> Self {
        match &entry.result {
            None => DashboardRow {
                name: entry.name.clone(),
                status: "INITIALIZING",
                response: "-".to_string(),
                message: "Waiting for first run...".to_string(),
                color: Color::Yellow,
            },
            Some(result) => DashboardRow {
                name: entry.name.clone(),
                status: if result.status { "✔ UP" } else { "✘ DOWN" },
                response: if result.is_measured() {
                    format!("{}s", result.response_time)
                } else {
                    "-".to_string()
                },
                message: result.message.clone(),
                color: if result.status { Color::Green } else { Color::Red },
            },
        }
    }
}

/// Render the result table into `area`.
pub fn render(frame: &mut Frame, area: Rect, rows: &[DashboardRow]) {
    let header = Row::new(vec!["Check Name", "Status", "Response", "Last Message"]).style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let body: Vec<Row> = rows
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.name.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(row.status).style(Style::default().fg(row.color)),
                Cell::from(row.response.clone()),
                Cell::from(row.message.clone()).style(Style::default().fg(row.color)),
            ])
        })
        .collect();

    let table = Table::new(
        body,
        [
            Constraint::Percentage(20),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Double)
            .title("Sentinel Monitoring System"),
    );

    frame.render_widget(table, area);
}

/// A writer that forwards complete lines to a running [`Dashboard`].
///
/// Hand it to [`crate::alerts::ConsoleAlert::with_writer`] so console output
/// is printed above the table instead of through it.
pub struct ConsoleLines {
    tx: mpsc::UnboundedSender<String>,
    pending: Vec<u8>,
}

impl ConsoleLines {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self {
            tx,
            pending: Vec::new(),
        }
    }
}

/// Channel connecting [`ConsoleLines`] writers to [`Dashboard::with_console`].
pub fn console_channel() -> (mpsc::UnboundedSender<String>, mpsc::UnboundedReceiver<String>) {
    mpsc::unbounded_channel()
}

impl Write for ConsoleLines {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);

        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let line = String::from_utf8_lossy(&line[..end]).into_owned();
            self.tx
                .send(line)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "dashboard is gone"))?;
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub struct Dashboard<B: Backend> {
    terminal: Terminal<B>,
    cache: Arc<ResultCache>,

    /// Lines to print above the table
    console: Option<mpsc::UnboundedReceiver<String>>,
}

impl Dashboard<CrosstermBackend<io::Stdout>> {
    /// Dashboard drawn inline below the current cursor position.
    pub async fn inline(cache: Arc<ResultCache>) -> Result<Self> {
        // borders + header + one line per check
        let height = cache.len().await as u16 + 3;
        let terminal = Terminal::with_options(
            CrosstermBackend::new(io::stdout()),
            TerminalOptions {
                viewport: Viewport::Inline(height),
            },
        )?;
        Ok(Self::new(terminal, cache))
    }
}

impl<B: Backend> Dashboard<B> {
    pub fn new(terminal: Terminal<B>, cache: Arc<ResultCache>) -> Self {
        Self {
            terminal,
            cache,
            console: None,
        }
    }

    pub fn with_console(mut self, lines: mpsc::UnboundedReceiver<String>) -> Self {
        self.console = Some(lines);
        self
    }

    pub fn terminal(&self) -> &Terminal<B> {
        &self.terminal
    }

    /// Draw the current snapshot.
    pub async fn refresh(&mut self) -> Result<()> {
        let rows: Vec<DashboardRow> = self
            .cache
            .snapshot()
            .await
            .iter()
            .map(DashboardRow::from)
            .collect();

        self.terminal.draw(|frame| {
            let area = frame.area();
            render(frame, area, &rows);
        })?;
        Ok(())
    }

    /// Print one line above the table. Only inline viewports have room for
    /// it; other viewports drop the line.
    pub fn print_above(&mut self, line: &str) -> Result<()> {
        let line = line.to_string();
        self.terminal.insert_before(1, |buf| {
            Paragraph::new(line).render(buf.area, buf);
        })?;
        Ok(())
    }

    fn drain_console(&mut self) {
        let mut lines = Vec::new();
        if let Some(console) = self.console.as_mut() {
            while let Ok(line) = console.try_recv() {
                lines.push(line);
            }
        }

        for line in lines {
            if let Err(e) = self.print_above(&line) {
                warn!("failed to print console line: {e:#}");
            }
        }
    }

    /// Redraw after every cycle until the engine stops. Console lines are
    /// printed above the table as they arrive.
    pub async fn run(mut self, mut state: watch::Receiver<EngineState>) {
        if let Err(e) = self.refresh().await {
            warn!("failed to draw dashboard: {e:#}");
        }

        loop {
            let console = async {
                match self.console.as_mut() {
                    Some(console) => console.recv().await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                changed = state.changed() => {
                    if changed.is_err() {
                        break;
                    }

                    let current = *state.borrow_and_update();
                    match current {
                        EngineState::Running => {}
                        EngineState::Idle => {
                            self.drain_console();
                            if let Err(e) = self.refresh().await {
                                warn!("failed to draw dashboard: {e:#}");
                            }
                        }
                        EngineState::Stopped => break,
                    }
                }

                Some(line) = console => {
                    if let Err(e) = self.print_above(&line) {
                        warn!("failed to print console line: {e:#}");
                    }
                }
            }
        }

        self.drain_console();
        debug!("dashboard stopped");
    }
}
