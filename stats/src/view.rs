//
// DHCP-RS
//   Copyright (C) 2024-2025, Toshiaki Takada
//

use std::io::{self, Stdout, Write};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::Line,
    widgets::{Block, Borders, Paragraph, Row, Table},
    Terminal,
};

use crate::*;
use crate::alert::*;
use crate::prefix::*;

/// Table column titles.
pub const HEADER: [&str; 4] = ["IP-Prefix", "Max-hosts", "Allocated addresses", "Utilization"];

const FINISHED_STATUS: &str = "Capture finished, press any key to exit";

/// Presentation of the statistics table.
pub trait StatsSink {
    /// Statistics changed, redraw from a full snapshot.
    fn refresh(&mut self, stats: &[PrefixStats]) -> Result<(), DhcpError>;

    /// A prefix crossed the alert threshold.
    fn notice(&mut self, alert: &Alert) -> Result<(), DhcpError>;

    /// Return true if the user asked to quit.
    fn stop_requested(&mut self) -> Result<bool, DhcpError> {
        Ok(false)
    }

    /// Wait up to `timeout` for a key press, true once one arrived.
    ///
    /// Views without a keyboard have nothing to wait for.
    fn wait_key(&mut self, _timeout: Duration) -> Result<bool, DhcpError> {
        Ok(true)
    }

    /// Release the output.
    fn finish(&mut self) -> Result<(), DhcpError>;
}

/// Full screen table on the terminal.
pub struct TerminalView {
    terminal: Terminal<CrosstermBackend<Stdout>>,

    /// Last snapshot.
    rows: Vec<PrefixStats>,

    /// Alert lines, oldest first.
    notices: Vec<String>,

    /// Footer line.
    status: String,

    /// Terminal is in raw mode on the alternate screen.
    active: bool,
}

impl TerminalView {
    pub fn new() -> Result<TerminalView, DhcpError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e.into())
        }

        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        Ok(TerminalView {
            terminal,
            rows: Vec::new(),
            notices: Vec::new(),
            status: String::from("q: quit"),
            active: true,
        })
    }

    fn draw(&mut self) -> Result<(), DhcpError> {
        let rows = &self.rows;
        let notices = &self.notices;
        let status = &self.status;

        self.terminal.draw(|frame| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Min(3),
                    Constraint::Length(notices.len() as u16 + 2),
                    Constraint::Length(1),
                ])
                .split(frame.area());

            let table = Table::new(
                rows.iter().map(|r| Row::new(vec![
                    format!("{}/{}", r.address, r.length),
                    r.capacity.to_string(),
                    r.allocated.to_string(),
                    format!("{:.2}%", r.utilization),
                ])),
                [
                    Constraint::Length(20),
                    Constraint::Length(12),
                    Constraint::Length(21),
                    Constraint::Length(12),
                ],
            )
            .header(Row::new(HEADER.to_vec()).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL).title("DHCP prefix utilization"));
            frame.render_widget(table, chunks[0]);

            let lines: Vec<Line> = notices.iter().map(|n| Line::from(n.as_str())).collect();
            let alerts = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Alerts"));
            frame.render_widget(alerts, chunks[1]);

            frame.render_widget(Paragraph::new(status.as_str()), chunks[2]);
        })?;

        Ok(())
    }

    fn restore(&mut self) -> Result<(), DhcpError> {
        if self.active {
            self.active = false;
            disable_raw_mode()?;
            execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
            self.terminal.show_cursor()?;
        }
        Ok(())
    }
}

fn is_quit_key(event: &Event) -> bool {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
                || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
        }
        _ => false,
    }
}

impl StatsSink for TerminalView {
    fn refresh(&mut self, stats: &[PrefixStats]) -> Result<(), DhcpError> {
        self.rows = stats.to_vec();
        self.draw()
    }

    fn notice(&mut self, alert: &Alert) -> Result<(), DhcpError> {
        self.notices.push(alert.to_string());
        self.draw()
    }

    fn stop_requested(&mut self) -> Result<bool, DhcpError> {
        while event::poll(Duration::ZERO)? {
            let event = event::read()?;
            if is_quit_key(&event) {
                debug!("Quit requested from terminal");
                return Ok(true)
            }
            if let Event::Resize(_, _) = event {
                self.draw()?;
            }
        }
        Ok(false)
    }

    fn wait_key(&mut self, timeout: Duration) -> Result<bool, DhcpError> {
        if !self.active {
            return Ok(true)
        }
        if self.status != FINISHED_STATUS {
            self.status = String::from(FINISHED_STATUS);
            self.draw()?;
        }

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => return Ok(true),
                Event::Resize(_, _) => self.draw()?,
                _ => {}
            }
        }
        Ok(false)
    }

    fn finish(&mut self) -> Result<(), DhcpError> {
        self.restore()
    }
}

impl Drop for TerminalView {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Plain text table written on every change.
pub struct PlainView<W: Write> {
    out: W,
}

impl<W: Write> PlainView<W> {
    pub fn new(out: W) -> PlainView<W> {
        PlainView { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatsSink for PlainView<W> {
    fn refresh(&mut self, stats: &[PrefixStats]) -> Result<(), DhcpError> {
        writeln!(self.out, "{}", HEADER.join(" "))?;
        for row in stats {
            writeln!(self.out, "{}", row)?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn notice(&mut self, alert: &Alert) -> Result<(), DhcpError> {
        writeln!(self.out, "{}", alert)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DhcpError> {
        self.out.flush()?;
        Ok(())
    }
}
