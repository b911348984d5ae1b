//! Ratatui dashboard that plays a simulation round by round.
//!
//! The loop runs on a blocking thread and executes fetches through the tokio
//! runtime handle. Both snapshots of a round are fetched before anything is
//! scheduled, so at most one pending round exists and a pause can never race
//! an in-flight fetch.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell as TableCell, Paragraph, Row, Table},
};
use tokio::runtime::Handle;
use tracing::{info, warn};

use crate::board::{BoardKind, BoardSnapshot, Cell, CellClass};
use crate::client::{ClientError, SimulationClient};
use crate::session::{RoundSession, round_delay};
use crate::stats::{DistanceStats, ObservedStats};

const EVENT_POLL_MILLIS: u64 = 50;
const MAX_SPEED: f64 = 64.0;
const MIN_SPEED: f64 = 0.0625;

/// Parameters for one playback run.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub simulation_id: String,
    pub rounds_total: u32,
    pub speed: f64,
    pub beacon_of_interest: Option<String>,
}

/// Run the round player until the user quits.
pub async fn run_player(client: SimulationClient, config: PlayerConfig) -> Result<()> {
    tokio::task::spawn_blocking(move || player_blocking(client, config)).await??;
    Ok(())
}

fn player_blocking(client: SimulationClient, config: PlayerConfig) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Hide).context("failed to enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
    let _cleanup = TerminalCleanup;

    let result = player_loop(&mut terminal, client, config);

    terminal.show_cursor().ok();
    result
}

fn player_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    client: SimulationClient,
    config: PlayerConfig,
) -> Result<()> {
    let handle = Handle::current();
    let mut app = PlayerApp::new(config);

    loop {
        if app.round_due(Instant::now()) {
            app.play_round(&handle, &client);
        }

        terminal
            .draw(|frame| app.draw(frame))
            .context("failed to draw player UI")?;

        if event::poll(Duration::from_millis(EVENT_POLL_MILLIS))
            .context("failed to poll terminal events")?
            && let Event::Key(key) = event::read().context("failed to read terminal event")?
            && app.handle_key(key.code, &handle, &client)
        {
            break;
        }
    }

    Ok(())
}

struct TerminalCleanup;

impl Drop for TerminalCleanup {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen, Show);
    }
}

/// Statistics screen shown after the simulation finishes.
struct StatsView {
    distance: DistanceStats,
    observed: ObservedStats,
}

struct PlayerApp {
    simulation_id: String,
    session: RoundSession,
    speed: f64,
    beacon_of_interest: String,
    displayed_round: Option<u32>,
    real: Option<BoardSnapshot>,
    estimated: Option<BoardSnapshot>,
    stats: Option<StatsView>,
    next_round_at: Option<Instant>,
    last_error: Option<String>,
}

impl PlayerApp {
    fn new(config: PlayerConfig) -> Self {
        Self {
            simulation_id: config.simulation_id,
            session: RoundSession::new(config.rounds_total),
            speed: config.speed,
            beacon_of_interest: config.beacon_of_interest.unwrap_or_default(),
            displayed_round: None,
            real: None,
            estimated: None,
            stats: None,
            next_round_at: Some(Instant::now()),
            last_error: None,
        }
    }

    fn wanted(&self) -> Option<&str> {
        if self.beacon_of_interest.is_empty() {
            None
        } else {
            Some(self.beacon_of_interest.as_str())
        }
    }

    fn round_due(&self, now: Instant) -> bool {
        self.stats.is_none()
            && self.session.should_schedule()
            && self.next_round_at.is_some_and(|at| now >= at)
    }

    /// Fetch and display both snapshots of the current round, then advance.
    fn play_round(&mut self, handle: &Handle, client: &SimulationClient) {
        let round = self.session.current_round();
        let fetched = handle.block_on(async {
            let real = client
                .board_state(&self.simulation_id, round, BoardKind::Real)
                .await?;
            let estimated = client
                .board_state(&self.simulation_id, round, BoardKind::Estimated)
                .await?;
            Ok::<_, ClientError>((real, estimated))
        });

        match fetched {
            Ok((real, estimated)) => {
                self.displayed_round = Some(round);
                self.real = Some(real);
                self.estimated = Some(estimated);
                self.last_error = None;
                self.session.advance();
                if self.session.is_finished() {
                    info!(simulation = %self.simulation_id, round, "simulation playback finished");
                }
                if self.session.should_schedule() {
                    self.schedule_next();
                } else {
                    self.next_round_at = None;
                }
            }
            Err(err) => {
                warn!(simulation = %self.simulation_id, round, error = %err, "round fetch failed");
                self.last_error = Some(err.to_string());
                // Retry the same round on the next schedule.
                if self.session.should_schedule() {
                    self.schedule_next();
                } else {
                    self.next_round_at = None;
                }
            }
        }
    }

    fn schedule_next(&mut self) {
        self.next_round_at = round_delay(self.speed).map(|delay| Instant::now() + delay);
    }

    fn toggle_pause(&mut self) {
        if self.session.is_paused() {
            if self.session.resume() {
                self.next_round_at = Some(Instant::now());
            }
        } else if self.session.pause() {
            self.next_round_at = None;
        }
    }

    /// Restart from round 0. A paused session stays paused, but round 0 is
    /// still fetched and rendered once so the reset is visible right away.
    fn reset(&mut self, handle: &Handle, client: &SimulationClient) {
        self.session.reset();
        self.stats = None;
        self.displayed_round = None;
        self.real = None;
        self.estimated = None;
        self.next_round_at = Some(Instant::now());
        if self.session.is_paused() {
            self.play_round(handle, client);
        }
    }

    fn show_stats(&mut self, handle: &Handle, client: &SimulationClient) {
        if !self.session.is_finished() || self.stats.is_some() {
            return;
        }
        let fetched = handle.block_on(async {
            let distance = client.distance_stats(&self.simulation_id).await?;
            let observed = client.observed_stats(&self.simulation_id).await?;
            Ok::<_, ClientError>((distance, observed))
        });
        match fetched {
            Ok((distance, observed)) => {
                self.stats = Some(StatsView { distance, observed });
                self.last_error = None;
            }
            Err(err) => {
                warn!(simulation = %self.simulation_id, error = %err, "statistics fetch failed");
                self.last_error = Some(err.to_string());
            }
        }
    }

    fn adjust_speed(&mut self, factor: f64) {
        let speed = (self.speed * factor).clamp(MIN_SPEED, MAX_SPEED);
        self.speed = speed;
        if self.stats.is_none() && self.session.should_schedule() {
            self.schedule_next();
        }
    }

    /// Returns true when the player should quit.
    fn handle_key(&mut self, code: KeyCode, handle: &Handle, client: &SimulationClient) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char(' ') | KeyCode::Char('p') => self.toggle_pause(),
            KeyCode::Char('r') => self.reset(handle, client),
            KeyCode::Char('s') => self.show_stats(handle, client),
            KeyCode::Char('+') | KeyCode::Char('=') => self.adjust_speed(2.0),
            KeyCode::Char('-') => self.adjust_speed(0.5),
            KeyCode::Char('c') => self.beacon_of_interest.clear(),
            KeyCode::Backspace => {
                self.beacon_of_interest.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => self.beacon_of_interest.push(c),
            _ => {}
        }
        false
    }

    fn draw(&self, frame: &mut Frame) {
        match &self.stats {
            Some(view) => self.draw_stats(frame, view),
            None => self.draw_boards(frame),
        }
    }

    fn draw_boards(&self, frame: &mut Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(frame.size());

        frame.render_widget(self.header_widget(), layout[0]);

        let boards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(layout[1]);
        self.render_board(frame, boards[0], BoardKind::Real, self.real.as_ref());
        self.render_board(frame, boards[1], BoardKind::Estimated, self.estimated.as_ref());

        frame.render_widget(legend_widget(), layout[2]);
    }

    fn header_widget(&self) -> Paragraph<'_> {
        let status = if self.session.is_finished() {
            Span::styled(
                "Finished: press 's' for statistics, 'r' to replay",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
        } else if self.session.is_paused() {
            Span::styled("Paused", Style::default().fg(Color::Yellow))
        } else {
            Span::styled("Playing", Style::default().fg(Color::Green))
        };

        let round_label = self
            .displayed_round
            .map_or_else(|| "-".to_owned(), |round| round.to_string());
        let beacon_label = if self.beacon_of_interest.is_empty() {
            "none".to_owned()
        } else {
            self.beacon_of_interest.clone()
        };

        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    format!("Visualizing simulation {} ", self.simulation_id),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw("('q' quit, space pause, 'r' reset, '+'/'-' speed, digits pick beacon)"),
            ]),
            Line::from(vec![
                Span::raw(format!(
                    "Round {round_label} of {}   Speed {:.2} rounds/s   Beacon of interest: {beacon_label}   ",
                    self.session.rounds_total(),
                    self.speed,
                )),
                status,
            ]),
        ];

        if let Some(message) = &self.last_error {
            lines.push(Line::from(Span::styled(
                format!("Last error: {message}"),
                Style::default().fg(Color::Red),
            )));
        }

        Paragraph::new(lines).block(Block::default().borders(Borders::ALL))
    }

    fn render_board(
        &self,
        frame: &mut Frame,
        area: Rect,
        kind: BoardKind,
        snapshot: Option<&BoardSnapshot>,
    ) {
        let block = Block::default().borders(Borders::ALL).title(kind.label());
        match snapshot {
            Some(snapshot) if snapshot.row_count() > 0 => {
                frame.render_widget(board_table(snapshot, self.wanted()).block(block), area);
            }
            _ => {
                frame.render_widget(Paragraph::new("Waiting for board data...").block(block), area);
            }
        }
    }

    fn draw_stats(&self, frame: &mut Frame, view: &StatsView) {
        let observed_height = (view.observed.rows().len() as u16).saturating_add(3);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(4),
                Constraint::Length(observed_height.max(4)),
                Constraint::Min(0),
            ])
            .split(frame.size());

        let title = Paragraph::new(Line::from(vec![
            Span::styled(
                format!("Statistics for simulation {} ", self.simulation_id),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("('r' replay, 'q' quit)"),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(title, layout[0]);

        frame.render_widget(distance_table(&view.distance), layout[1]);
        frame.render_widget(observed_table(&view.observed), layout[2]);
    }
}

fn board_table<'a>(snapshot: &'a BoardSnapshot, wanted: Option<&str>) -> Table<'a> {
    let cell_width = snapshot
        .rows()
        .iter()
        .flatten()
        .map(|cell| cell.label().len())
        .max()
        .unwrap_or(1)
        .max(1) as u16;

    let rows: Vec<Row> = snapshot
        .rows()
        .iter()
        .map(|row| {
            let cells: Vec<TableCell> = row
                .iter()
                .map(|cell| {
                    let class = cell.classify(wanted);
                    TableCell::from(cell_text(cell, class)).style(cell_style(class))
                })
                .collect();
            Row::new(cells)
        })
        .collect();

    let widths = vec![Constraint::Length(cell_width); snapshot.col_count()];
    Table::new(rows, widths).column_spacing(1)
}

fn cell_text(cell: &Cell, class: CellClass) -> String {
    match class {
        CellClass::Empty => "·".to_owned(),
        CellClass::ObserversOnly => "o".to_owned(),
        CellClass::WantedBeacon | CellClass::Beacon => cell.label(),
    }
}

fn cell_style(class: CellClass) -> Style {
    match class {
        CellClass::Empty => Style::default().fg(Color::DarkGray),
        CellClass::WantedBeacon => Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
        CellClass::Beacon => Style::default().fg(Color::Cyan),
        CellClass::ObserversOnly => Style::default().fg(Color::Green),
    }
}

fn legend_widget() -> Paragraph<'static> {
    Paragraph::new(Line::from(vec![
        Span::raw("Legend: "),
        Span::styled("·", cell_style(CellClass::Empty)),
        Span::raw(" empty  "),
        Span::styled("ids", cell_style(CellClass::Beacon)),
        Span::raw(" beacons  "),
        Span::styled("ids", cell_style(CellClass::WantedBeacon)),
        Span::raw(" wanted beacon  "),
        Span::styled("o", cell_style(CellClass::ObserversOnly)),
        Span::raw(" observers only"),
    ]))
    .block(Block::default().borders(Borders::ALL))
}

fn distance_table(stats: &DistanceStats) -> Table<'_> {
    let columns = stats.measures().count().max(1);
    let header = Row::new(
        stats
            .measures()
            .map(|name| {
                TableCell::from(name.to_owned()).style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            })
            .collect::<Vec<_>>(),
    );
    let values = Row::new(stats.values().map(TableCell::from).collect::<Vec<_>>());
    let widths = vec![Constraint::Ratio(1, columns as u32); columns];
    Table::new(vec![values], widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Distance statistics"))
}

fn observed_table(stats: &ObservedStats) -> Table<'_> {
    let properties = stats.properties();
    let columns = properties.len() + 1;

    let mut header_cells = vec![TableCell::from("beacon id").style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )];
    header_cells.extend(properties.iter().map(|name| {
        TableCell::from((*name).to_owned()).style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let rows: Vec<Row> = stats
        .rows()
        .iter()
        .map(|row| {
            let mut cells = vec![TableCell::from(format!("beacon #{}", row.beacon_id))];
            cells.extend(
                row.values
                    .iter()
                    .map(|(_, value)| TableCell::from(crate::stats::format_optional(*value))),
            );
            Row::new(cells)
        })
        .collect();

    let widths = vec![Constraint::Ratio(1, columns as u32); columns];
    Table::new(rows, widths)
        .header(Row::new(header_cells))
        .block(Block::default().borders(Borders::ALL).title("Observed statistics"))
}
