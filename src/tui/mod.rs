// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Trailmap-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Trailmap and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Terminal viewer.
//!
//! One viewer among N on the sync channel: it re-reads through the channel's
//! debounce, and its own edits (close/reopen, focus moves) flow back through
//! the same channel as viewer messages.

use std::collections::BTreeMap;
use std::error::Error;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::format::parser::parse_document;
use crate::model::{NodeId, NodeState, NodeType};
use crate::ops;
use crate::store::TrajectoryFile;
use crate::sync::{
    SyncChannel, ViewerAction, ViewerId, ViewerMessage, ViewerSink, ViewerUpdate,
};
use crate::viewer::{render_graph, shape_delimiters, RenderGraph};

const TICK_INTERVAL: Duration = Duration::from_millis(100);
const MAX_OFFSET: u16 = 16;
const SEARCH_RESULT_ROWS: usize = 8;

const FOCUS_COLOR: Color = Color::LightGreen;
const FOOTER_LABEL_COLOR: Color = Color::Gray;
const FOOTER_KEY_COLOR: Color = Color::Cyan;

fn type_color(node_type: NodeType) -> Color {
    match node_type {
        NodeType::Start | NodeType::End => Color::Green,
        NodeType::AiTask => Color::LightBlue,
        NodeType::HumanTask => Color::Yellow,
        NodeType::Condition => Color::Magenta,
        NodeType::Blocker => Color::Red,
    }
}

struct ChannelSink {
    tx: mpsc::Sender<ViewerUpdate>,
}

impl ViewerSink for ChannelSink {
    fn send(&mut self, update: ViewerUpdate) {
        let _ = self.tx.send(update);
    }
}

pub fn run(file: TrajectoryFile) -> Result<(), Box<dyn Error>> {
    let mut channel = SyncChannel::new(file);
    let (tx, rx) = mpsc::channel();
    let viewer_id = channel.attach(Box::new(ChannelSink { tx }));

    let mut terminal = TerminalSession::new()?;
    let mut app = App::new(channel, viewer_id, rx);

    while !app.should_quit {
        app.tick(Instant::now());
        terminal.draw(|frame| draw(frame, &mut app))?;

        if event::poll(TICK_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    app.handle_key(key, Instant::now());
                }
                _ => {}
            }
        }
    }

    Ok(())
}

struct SearchState {
    input: String,
    /// Node indices paired with their fuzzy score, best first.
    matches: Vec<(usize, i64)>,
    selected: usize,
}

impl SearchState {
    fn new() -> Self {
        Self {
            input: String::new(),
            matches: Vec::new(),
            selected: 0,
        }
    }
}

struct App {
    channel: SyncChannel,
    viewer_id: ViewerId,
    updates: mpsc::Receiver<ViewerUpdate>,
    text: String,
    graph: RenderGraph,
    warning_count: usize,
    selected: usize,
    /// Viewer-local horizontal nudge per node. Presentation state only:
    /// discarded whenever the document reloads from outside.
    offsets: BTreeMap<NodeId, u16>,
    search: Option<SearchState>,
    last_modified: Option<SystemTime>,
    status: Option<String>,
    should_quit: bool,
}

impl App {
    fn new(channel: SyncChannel, viewer_id: ViewerId, updates: mpsc::Receiver<ViewerUpdate>) -> Self {
        let text = channel.current_text().unwrap_or_default().to_owned();
        let last_modified = channel.file().document_modified();
        let mut app = Self {
            channel,
            viewer_id,
            updates,
            text: String::new(),
            graph: render_graph(&Default::default()),
            warning_count: 0,
            selected: 0,
            offsets: BTreeMap::new(),
            search: None,
            last_modified,
            status: None,
            should_quit: false,
        };
        app.apply_text(text, false);
        app.selected = app.graph.focus().unwrap_or(0);
        app
    }

    fn tick(&mut self, now: Instant) {
        // Poll the file's mtime as the change-notification source; the
        // channel coalesces bursts into one re-read.
        let modified = self.channel.file().document_modified();
        if modified != self.last_modified {
            self.last_modified = modified;
            self.channel.note_file_event(now);
        }

        if let Err(err) = self.channel.poll(now) {
            self.status = Some(format!("sync error: {err}"));
        }

        let mut latest = None;
        while let Ok(update) = self.updates.try_recv() {
            latest = Some(update);
        }
        if let Some(update) = latest {
            self.apply_text(update.text().to_owned(), true);
        } else if let Some(current) = self.channel.current_text() {
            if current != self.text {
                // Our own committed edit; keep local presentation state.
                self.apply_text(current.to_owned(), false);
            }
        }
    }

    fn apply_text(&mut self, text: String, external: bool) {
        let previous_selection = self
            .graph
            .nodes()
            .get(self.selected)
            .map(|node| node.node_id().clone());

        let parsed = parse_document(&text);
        self.warning_count = parsed.warnings().len();
        self.graph = render_graph(parsed.document());
        self.text = text;

        if external {
            self.offsets.clear();
        }

        self.selected = previous_selection
            .and_then(|node_id| self.graph.position_of(&node_id))
            .or_else(|| self.graph.focus())
            .unwrap_or(0)
            .min(self.graph.nodes().len().saturating_sub(1));
    }

    fn selected_node_id(&self) -> Option<NodeId> {
        self.graph
            .nodes()
            .get(self.selected)
            .map(|node| node.node_id().clone())
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        self.status = None;
        if self.search.is_some() {
            self.handle_search_key(key, now);
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Enter => self.select_current(now),
            KeyCode::Char('/') => {
                if let Some(ViewerAction::OpenSearch) = self.channel.on_viewer_message(
                    self.viewer_id,
                    ViewerMessage::OpenSearch,
                    now,
                ) {
                    self.search = Some(SearchState::new());
                }
            }
            KeyCode::Char('c') => self.set_selected_state(NodeState::Closed, now),
            KeyCode::Char('o') => self.set_selected_state(NodeState::Opened, now),
            KeyCode::Right | KeyCode::Char('l') => self.nudge_selected(1),
            KeyCode::Left | KeyCode::Char('h') => self.nudge_selected(-1),
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: i64) {
        let len = self.graph.nodes().len();
        if len == 0 {
            return;
        }
        let next = self.selected as i64 + delta;
        self.selected = next.clamp(0, len as i64 - 1) as usize;
    }

    fn select_current(&mut self, now: Instant) {
        let Some(node_id) = self.selected_node_id() else {
            return;
        };
        let action = self.channel.on_viewer_message(
            self.viewer_id,
            ViewerMessage::NodeSelected { node_id },
            now,
        );
        if let Some(ViewerAction::Focus { node_id }) = action {
            self.status = Some(format!("focused {node_id}"));
        }
    }

    fn set_selected_state(&mut self, state: NodeState, now: Instant) {
        let Some(node_id) = self.selected_node_id() else {
            return;
        };
        let base = self
            .channel
            .current_text()
            .unwrap_or_default()
            .to_owned();
        match ops::set_node_state(&base, &node_id, state) {
            Ok(updated) => {
                self.channel.on_viewer_message(
                    self.viewer_id,
                    ViewerMessage::Edited { text: updated },
                    now,
                );
                self.status = Some(format!("{node_id} {}", state.as_str()));
            }
            Err(err) => self.status = Some(err.to_string()),
        }
    }

    fn nudge_selected(&mut self, delta: i64) {
        let Some(node_id) = self.selected_node_id() else {
            return;
        };
        let offset = self.offsets.entry(node_id).or_insert(0);
        let next = *offset as i64 + delta;
        *offset = next.clamp(0, MAX_OFFSET as i64) as u16;
    }

    fn handle_search_key(&mut self, key: KeyEvent, now: Instant) {
        let Some(search) = self.search.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.search = None,
            KeyCode::Enter => {
                if let Some((node_index, _)) = search.matches.get(search.selected).copied() {
                    self.selected = node_index;
                    self.search = None;
                    self.select_current(now);
                } else {
                    self.search = None;
                }
            }
            KeyCode::Down => {
                if !search.matches.is_empty() {
                    search.selected = (search.selected + 1).min(search.matches.len() - 1);
                }
            }
            KeyCode::Up => {
                search.selected = search.selected.saturating_sub(1);
            }
            KeyCode::Backspace => {
                search.input.pop();
                self.refresh_search_matches();
            }
            KeyCode::Char(ch) => {
                search.input.push(ch);
                self.refresh_search_matches();
            }
            _ => {}
        }
    }

    fn refresh_search_matches(&mut self) {
        let Some(search) = self.search.as_mut() else {
            return;
        };
        search.selected = 0;
        search.matches.clear();
        let needle = search.input.trim();
        if needle.is_empty() {
            return;
        }

        for (index, node) in self.graph.nodes().iter().enumerate() {
            let ratio = rapidfuzz::fuzz::ratio(needle.chars(), node.label().chars());
            let score = (ratio * 1000.0).round() as i64;
            if score > 0 {
                search.matches.push((index, score));
            }
        }
        search.matches.sort_by(|a, b| b.1.cmp(&a.1));
        search.matches.truncate(SEARCH_RESULT_ROWS);
    }
}

fn draw(frame: &mut Frame<'_>, app: &mut App) {
    let area = frame.size();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);
    draw_nodes(frame, layout[0], app);
    draw_footer(frame, layout[1], app);
    if app.search.is_some() {
        draw_search_overlay(frame, area, app);
    }
}

fn draw_nodes(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let mut lines = Vec::new();
    for (index, node) in app.graph.nodes().iter().enumerate() {
        let (open, close) = shape_delimiters(node.shape());
        let offset = app.offsets.get(node.node_id()).copied().unwrap_or(0);
        let closed = node.state() == NodeState::Closed;

        let mut style = Style::default().fg(type_color(node.node_type()));
        if closed {
            style = Style::default().fg(Color::DarkGray);
        }
        if index == app.selected {
            style = style.add_modifier(Modifier::REVERSED);
        }

        let mut spans = vec![Span::raw(" ".repeat(offset as usize + 1))];
        spans.push(if node.is_last_active() {
            Span::styled("● ", Style::default().fg(FOCUS_COLOR))
        } else {
            Span::raw("  ")
        });
        spans.push(Span::styled(
            format!("{open} {} {close}", node.label()),
            style,
        ));
        spans.push(Span::styled(
            format!("  #{}", node.node_id()),
            Style::default().fg(Color::DarkGray),
        ));
        if closed {
            spans.push(Span::styled(
                "  closed",
                Style::default().fg(Color::DarkGray),
            ));
        }
        if !node.predecessors().is_empty() {
            let from = node
                .predecessors()
                .iter()
                .map(|node_id| node_id.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            spans.push(Span::styled(
                format!("  <- {from}"),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "  no trajectory yet; run `trailmap init`",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" trajectory ({}) ", app.graph.direction().as_token()));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = if let Some(status) = &app.status {
        Line::from(Span::styled(
            status.clone(),
            Style::default().fg(FOOTER_LABEL_COLOR),
        ))
    } else {
        let open = app
            .graph
            .nodes()
            .iter()
            .filter(|node| node.state() == NodeState::Opened)
            .count();
        let mut spans = vec![Span::styled(
            format!(
                " {} nodes ({open} open)  ",
                app.graph.nodes().len()
            ),
            Style::default().fg(FOOTER_LABEL_COLOR),
        )];
        if app.warning_count > 0 {
            spans.push(Span::styled(
                format!("{} warnings  ", app.warning_count),
                Style::default().fg(Color::Yellow),
            ));
        }
        spans.push(Span::styled(
            "j/k",
            Style::default().fg(FOOTER_KEY_COLOR),
        ));
        spans.push(Span::styled(" move  ", Style::default().fg(FOOTER_LABEL_COLOR)));
        spans.push(Span::styled("enter", Style::default().fg(FOOTER_KEY_COLOR)));
        spans.push(Span::styled(" focus  ", Style::default().fg(FOOTER_LABEL_COLOR)));
        spans.push(Span::styled("c/o", Style::default().fg(FOOTER_KEY_COLOR)));
        spans.push(Span::styled(
            " close/reopen  ",
            Style::default().fg(FOOTER_LABEL_COLOR),
        ));
        spans.push(Span::styled("/", Style::default().fg(FOOTER_KEY_COLOR)));
        spans.push(Span::styled(" search  ", Style::default().fg(FOOTER_LABEL_COLOR)));
        spans.push(Span::styled("q", Style::default().fg(FOOTER_KEY_COLOR)));
        spans.push(Span::styled(" quit", Style::default().fg(FOOTER_LABEL_COLOR)));
        Line::from(spans)
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_search_overlay(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let Some(search) = &app.search else {
        return;
    };

    let width = area.width.saturating_sub(8).min(60).max(20);
    let height = (SEARCH_RESULT_ROWS as u16 + 3).min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 3;
    let overlay = Rect::new(x, y, width, height);

    let mut lines = vec![Line::from(vec![
        Span::styled("> ", Style::default().fg(FOOTER_KEY_COLOR)),
        Span::raw(search.input.clone()),
    ])];
    for (row, (node_index, _)) in search.matches.iter().enumerate() {
        if let Some(node) = app.graph.nodes().get(*node_index) {
            let style = if row == search.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!(" {}  #{}", node.label(), node.node_id()),
                style,
            )));
        }
    }

    frame.render_widget(Clear, overlay);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" search ")),
        overlay,
    );
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> Result<Self, Box<dyn Error>> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(|err| {
            teardown_terminal();
            err
        })?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(|err| {
            teardown_terminal();
            err
        })?;
        terminal.clear().map_err(|err| {
            teardown_terminal();
            err
        })?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
}
