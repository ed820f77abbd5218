mod app;

use std::io;
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures_util::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use app::{format_odds, format_time_ns, truncate, AppState, ChangeFrame, ConnectionStatus, FeedMsg};

const REFRESH_INTERVAL: Duration = Duration::from_secs(2);
/// Upper bound on how long a change event waits before it is drawn.
const UI_TICK: Duration = Duration::from_millis(250);
const RECONNECT_DELAY: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:4000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    let (feed_tx, feed_rx) = mpsc::channel(256);
    tokio::spawn(listen_changes(app.subscriptions_url(), feed_tx));

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut table_state = TableState::default();

    let result = run_loop(&mut terminal, &mut app, &client, feed_rx, &mut table_state).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Change stream
// ---------------------------------------------------------------------------

/// Follows `/subscriptions` forever, reconnecting after a fixed delay.
/// Returns once the UI side has gone away.
async fn listen_changes(url: String, tx: mpsc::Sender<FeedMsg>) {
    loop {
        let reason = match connect_async(&url).await {
            Ok((mut stream, _)) => {
                if tx.send(FeedMsg::Connected).await.is_err() {
                    return;
                }
                loop {
                    match stream.next().await {
                        Some(Ok(Message::Text(text))) => {
                            // Unknown frames are ignored; the next poll resyncs.
                            if let Ok(frame) = serde_json::from_str::<ChangeFrame>(&text) {
                                if tx.send(FeedMsg::Change(frame)).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break "stream closed".to_string(),
                        Some(Err(e)) => break e.to_string(),
                        Some(Ok(_)) => {}
                    }
                }
            }
            Err(e) => e.to_string(),
        };

        if tx.send(FeedMsg::Disconnected(reason)).await.is_err() {
            return;
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
    mut feed_rx: mpsc::Receiver<FeedMsg>,
    table_state: &mut TableState,
) -> io::Result<()> {
    let mut last_tick = Instant::now();

    loop {
        let now = Instant::now();
        while let Ok(msg) = feed_rx.try_recv() {
            app.apply_feed(msg, now);
        }
        app.prune_recent(now);

        terminal.draw(|f| render(f, app, table_state))?;

        let timeout = REFRESH_INTERVAL
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO)
            .min(UI_TICK);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = Instant::now();
                        }
                        KeyCode::Char('s') | KeyCode::Char('S') => {
                            app.cycle_sport_filter();
                            table_state.select(None);
                        }
                        KeyCode::Down | KeyCode::Char('j') => {
                            let max = app.visible_matches().len().saturating_sub(1);
                            let next = table_state.selected().map_or(0, |i| (i + 1).min(max));
                            table_state.select(Some(next));
                        }
                        KeyCode::Up | KeyCode::Char('k') => {
                            let prev = table_state.selected().map_or(0, |i| i.saturating_sub(1));
                            table_state.select(Some(prev));
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= REFRESH_INTERVAL {
            app.refresh(client).await;
            last_tick = Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState, table_state: &mut TableState) {
    let area = f.area();

    // header | body | footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, table_state, chunks[1]);
    render_footer(f, chunks[2]);
}

fn status_span(label: &str, status: &ConnectionStatus) -> Span<'static> {
    match status {
        ConnectionStatus::Connected => Span::styled(format!("● {label}"), Style::default().fg(Color::Green)),
        ConnectionStatus::Connecting => Span::styled(format!("◌ {label}"), Style::default().fg(Color::Yellow)),
        ConnectionStatus::Error(e) => {
            Span::styled(format!("✗ {label}: {}", truncate(e, 30)), Style::default().fg(Color::Red))
        }
    }
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let cycle = if app.health.cycle_running {
        Span::styled("scraping…", Style::default().fg(Color::Yellow))
    } else if app.health.last_cycle_at_ns > 0 {
        Span::styled(
            format!(
                "last cycle {} ({:.1}s)",
                format_time_ns(app.health.last_cycle_at_ns as i64),
                app.health.last_cycle_duration_ms as f64 / 1000.0
            ),
            Style::default().fg(Color::White),
        )
    } else {
        Span::styled("no cycle yet", Style::default().fg(Color::DarkGray))
    };

    let filter = app.sport_filter.as_deref().unwrap_or("all sports");

    let spans = vec![
        Span::styled(" Live Scores  ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        status_span("api", &app.status),
        Span::raw("  "),
        status_span("feed", &app.feed),
        Span::raw("  │  "),
        cycle,
        Span::raw("  │  "),
        Span::styled(format!("{} matches", app.matches.len()), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(format!("{} events", app.events_seen), Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(filter.to_string(), Style::default().fg(Color::Cyan)),
    ];

    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::DarkGray)));
    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, table_state: &mut TableState, area: Rect) {
    // matches (75%) | render latency (25%)
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(75), Constraint::Percentage(25)])
        .split(area);

    render_matches_table(f, app, table_state, halves[0]);
    render_latency_table(f, app, halves[1]);
}

fn header_row(labels: &[&'static str]) -> Row<'static> {
    let cells = labels
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    Row::new(cells).height(1)
}

fn render_matches_table(f: &mut Frame, app: &AppState, state: &mut TableState, area: Rect) {
    let now = Instant::now();

    let rows: Vec<Row> = app
        .visible_matches()
        .into_iter()
        .map(|m| {
            let style = if app.is_recent(&m.id, now) {
                Style::default().fg(Color::Black).bg(Color::LightGreen)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(truncate(&m.sport, 12)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&m.teams.home, 22)),
                Cell::from(truncate(&m.teams.away, 22)),
                Cell::from(m.score.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
                Cell::from(truncate(&m.time, 8)).style(Style::default().fg(Color::Cyan)),
                Cell::from(format_odds(m.odds.home)),
                Cell::from(format_odds(m.odds.draw)),
                Cell::from(format_odds(m.odds.away)),
                Cell::from(format_time_ns(m.updated_at_ns)).style(Style::default().fg(Color::DarkGray)),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Min(10),
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Sport", "Home", "Away", "Score", "Clock", "1", "X", "2", "Updated"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(Span::styled(" LIVE MATCHES ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
    )
    .row_highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    f.render_stateful_widget(table, area, state);
}

fn render_latency_table(f: &mut Frame, app: &AppState, area: Rect) {
    let rows: Vec<Row> = app
        .latency
        .iter()
        .map(|l| {
            Row::new(vec![
                Cell::from(truncate(&l.sport, 12)),
                Cell::from(format!("{:.1}s", l.p50_ms as f64 / 1000.0)),
                Cell::from(format!("{:.1}s", l.p95_ms as f64 / 1000.0)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Min(8), Constraint::Length(6), Constraint::Length(6)])
        .header(header_row(&["Sport", "p50", "p95"]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(Span::styled(" RENDER ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))),
        );

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[s] ", Style::default().fg(Color::Yellow)),
        Span::raw("filter sport  "),
        Span::styled("[↑↓ / j k] ", Style::default().fg(Color::Yellow)),
        Span::raw("scroll  "),
        Span::styled("auto-refresh: 2s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
