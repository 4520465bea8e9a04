pub mod render;
pub mod state;

use crate::route::Route;
use anyhow::Result;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use futures_util::StreamExt;
use ratatui::prelude::*;
use state::{AppState, Focus};
use std::io::stdout;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// Commands the TUI sends to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiCommand {
    Quit,
    /// Feed pane height in rows, sent whenever it changes.
    Viewport(u16),
    Char(char),
    Backspace,
    Submit,
    NextField,
    Cancel,
    SelectNext,
    SelectPrev,
    PageDown,
    PageUp,
    Top,
    Bottom,
    ToggleLike,
    ToggleRetweet,
    Reply,
    Delete,
    OpenAuthor,
    Compose,
    OpenMenu,
    OpenSearch,
    ToggleLogs,
    Reload,
    ToggleFollow,
    ToggleBlock,
    EditProfile,
    Navigate(Route),
}

/// Run the TUI. Reads state from `state_rx`, sends commands on `cmd_tx`.
pub async fn run_tui(state_rx: watch::Receiver<AppState>, cmd_tx: mpsc::Sender<TuiCommand>) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = tui_loop(&mut terminal, state_rx, cmd_tx).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn tui_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut state_rx: watch::Receiver<AppState>,
    cmd_tx: mpsc::Sender<TuiCommand>,
) -> Result<()> {
    let mut events = EventStream::new();
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut spinner_frame: u8 = 0;
    let mut reported_rows: Option<u16> = None;

    loop {
        let state = state_rx.borrow_and_update().clone();

        let size = terminal.size()?;
        let rows = render::feed_viewport_rows(Rect::new(0, 0, size.width, size.height), &state);
        if rows != reported_rows {
            reported_rows = rows;
            if let Some(rows) = rows {
                let _ = cmd_tx.send(TuiCommand::Viewport(rows)).await;
            }
        }

        terminal.draw(|f| render::draw(f, &state, spinner_frame))?;

        tokio::select! {
            _ = tick.tick() => {
                if state.feed.is_loading() || state.pending_interactions > 0 {
                    spinner_frame = spinner_frame.wrapping_add(1);
                }
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) => {
                        if let Some(cmd) = map_key(key, &state) {
                            let quit = cmd == TuiCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                return Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Ok(()),
                }
            }
        }
    }
}

/// Translate a key press into a command for the pane that has focus.
pub fn map_key(key: KeyEvent, state: &AppState) -> Option<TuiCommand> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(TuiCommand::Quit);
    }

    if state.route == Route::NotFound && state.focus == Focus::Feed {
        return match key.code {
            KeyCode::Char('q') => Some(TuiCommand::Quit),
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char('h') => Some(TuiCommand::Navigate(Route::Home)),
            _ => None,
        };
    }

    if state.focus.is_text_input() {
        return match key.code {
            KeyCode::Esc if state.focus == Focus::Login => Some(TuiCommand::Quit),
            KeyCode::Esc => Some(TuiCommand::Cancel),
            KeyCode::Enter => Some(TuiCommand::Submit),
            KeyCode::Backspace => Some(TuiCommand::Backspace),
            KeyCode::Tab => Some(TuiCommand::NextField),
            KeyCode::Down if state.focus == Focus::Search => Some(TuiCommand::SelectNext),
            KeyCode::Up if state.focus == Focus::Search => Some(TuiCommand::SelectPrev),
            KeyCode::Char(c) => Some(TuiCommand::Char(c)),
            _ => None,
        };
    }

    match state.focus {
        Focus::Menu => match key.code {
            KeyCode::Esc | KeyCode::Char('m') => Some(TuiCommand::Cancel),
            KeyCode::Enter => Some(TuiCommand::Submit),
            KeyCode::Down | KeyCode::Char('j') => Some(TuiCommand::SelectNext),
            KeyCode::Up | KeyCode::Char('k') => Some(TuiCommand::SelectPrev),
            _ => None,
        },
        Focus::Logs => match key.code {
            KeyCode::Esc | KeyCode::Char('L') => Some(TuiCommand::Cancel),
            KeyCode::Down | KeyCode::Char('j') => Some(TuiCommand::SelectNext),
            KeyCode::Up | KeyCode::Char('k') => Some(TuiCommand::SelectPrev),
            KeyCode::Char('g') | KeyCode::Home => Some(TuiCommand::Top),
            KeyCode::Char('G') | KeyCode::End => Some(TuiCommand::Bottom),
            _ => None,
        },
        _ => match key.code {
            KeyCode::Char('q') => Some(TuiCommand::Quit),
            KeyCode::Esc => Some(TuiCommand::Cancel),
            KeyCode::Down | KeyCode::Char('j') => Some(TuiCommand::SelectNext),
            KeyCode::Up | KeyCode::Char('k') => Some(TuiCommand::SelectPrev),
            KeyCode::PageDown => Some(TuiCommand::PageDown),
            KeyCode::PageUp => Some(TuiCommand::PageUp),
            KeyCode::Char('g') | KeyCode::Home => Some(TuiCommand::Top),
            KeyCode::Char('G') | KeyCode::End => Some(TuiCommand::Bottom),
            KeyCode::Char('l') => Some(TuiCommand::ToggleLike),
            KeyCode::Char('t') => Some(TuiCommand::ToggleRetweet),
            KeyCode::Char('c') | KeyCode::Enter => Some(TuiCommand::Reply),
            KeyCode::Char('d') | KeyCode::Delete => Some(TuiCommand::Delete),
            KeyCode::Char('p') => Some(TuiCommand::OpenAuthor),
            KeyCode::Char('n') | KeyCode::Char('i') => Some(TuiCommand::Compose),
            KeyCode::Char('m') => Some(TuiCommand::OpenMenu),
            KeyCode::Char('/') => Some(TuiCommand::OpenSearch),
            KeyCode::Char('L') => Some(TuiCommand::ToggleLogs),
            KeyCode::Char('r') => Some(TuiCommand::Reload),
            KeyCode::Char('h') => Some(TuiCommand::Navigate(Route::Home)),
            KeyCode::Char('F') => Some(TuiCommand::ToggleFollow),
            KeyCode::Char('B') => Some(TuiCommand::ToggleBlock),
            KeyCode::Char('e') => Some(TuiCommand::EditProfile),
            _ => None,
        },
    }
}
