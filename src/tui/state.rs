use crate::compose::Composer;
use crate::directory::UserDirectory;
use crate::feed::{FeedState, LoadPhase, Post};
use crate::profile::{ProfileEditor, ProfileView};
use crate::route::Route;
use crate::session::Session;
use std::collections::VecDeque;
use std::time::Instant;

const MAX_LOGS: usize = 200;

/// Which pane receives keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Login,
    Feed,
    Composer,
    Menu,
    Search,
    Editor,
    Logs,
}

impl Focus {
    /// Panes that take free text, so letter keys are input rather than shortcuts.
    pub fn is_text_input(self) -> bool {
        matches!(self, Focus::Login | Focus::Composer | Focus::Search | Focus::Editor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuItem {
    Profile,
    Home,
    Close,
    Logout,
}

pub const MENU_ITEMS: [MenuItem; 4] = [MenuItem::Profile, MenuItem::Home, MenuItem::Close, MenuItem::Logout];

impl MenuItem {
    pub fn label(self) -> &'static str {
        match self {
            MenuItem::Profile => "Profile",
            MenuItem::Home => "Home",
            MenuItem::Close => "Close",
            MenuItem::Logout => "Logout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

impl StatusLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Warn => "WARN",
            StatusLevel::Error => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub level: StatusLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub message: String,
}

/// Everything the renderer needs, published by the controller after each change.
#[derive(Debug, Clone)]
pub struct AppState {
    pub route: Route,
    pub session: Option<Session>,
    /// "offline demo" or the API base URL.
    pub backend_label: String,
    pub feed: FeedState,
    pub feed_selected: usize,
    /// Feed pane scroll offset, in rows.
    pub feed_scroll: u32,
    pub card_rows: u16,
    /// Height of the feed pane; `None` until the first frame is drawn.
    pub viewport_rows: Option<u16>,
    pub composer: Composer,
    pub profile: Option<ProfileView>,
    pub editor: Option<ProfileEditor>,
    pub directory: UserDirectory,
    pub login_input: String,
    pub focus: Focus,
    pub menu_selected: usize,
    pub pending_interactions: usize,
    pub status: Option<StatusLine>,
    pub logs: VecDeque<LogEntry>,
    pub log_scroll_offset: usize,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(chunk_size: usize, card_rows: u16, max_chars: usize) -> Self {
        Self {
            route: Route::Login,
            session: None,
            backend_label: String::new(),
            feed: FeedState::new(chunk_size),
            feed_selected: 0,
            feed_scroll: 0,
            card_rows: card_rows.max(1),
            viewport_rows: None,
            composer: Composer::new(max_chars),
            profile: None,
            editor: None,
            directory: UserDirectory::new(),
            login_input: String::new(),
            focus: Focus::Login,
            menu_selected: 0,
            pending_interactions: 0,
            status: None,
            logs: VecDeque::with_capacity(MAX_LOGS),
            log_scroll_offset: 0,
            start_time: Instant::now(),
        }
    }

    pub fn push_log(&mut self, level: &str, message: String) {
        let time = chrono::Local::now().format("%H:%M:%S%.3f").to_string();
        if self.logs.len() >= MAX_LOGS {
            self.logs.pop_front();
        }
        self.logs.push_back(LogEntry {
            time,
            level: level.to_string(),
            message,
        });
    }

    /// Show `message` in the status line and keep it in the log.
    pub fn notify(&mut self, level: StatusLevel, message: impl Into<String>) {
        let message = message.into();
        self.push_log(level.as_str(), message.clone());
        self.status = Some(StatusLine { level, message });
    }

    /// The highlighted card. `None` while the list is hidden behind a load.
    pub fn selected_post(&self) -> Option<&Post> {
        if *self.feed.phase() != LoadPhase::Loaded {
            return None;
        }
        self.feed.visible().get(self.feed_selected)
    }

    pub fn uptime(&self) -> String {
        let secs = self.start_time.elapsed().as_secs();
        let h = secs / 3600;
        let m = (secs % 3600) / 60;
        format!("{}h {:02}m", h, m)
    }
}
