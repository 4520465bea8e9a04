use crate::api::types::{CreateUserResponse, UpdateProfileRequest, UserSummary};
use crate::api::{ApiResult, PostId, SocialApi};
use crate::config::Config;
use crate::directory::UserDirectory;
use crate::feed::state::LoadTicket;
use crate::feed::{
    can_delete, FeedDataSource, FeedState, FetchOutcome, InteractionController, InteractionKind,
    PendingToggle, ScrollController, ScrollMetrics, ToggleOutcome,
};
use crate::profile::{ProfileEditor, ProfileView, Relationship, RelationshipAction, SAVE_FAILED};
use crate::route::Route;
use crate::session::Session;
use crate::tui::state::{AppState, Focus, MenuItem, StatusLevel, MENU_ITEMS};
use crate::tui::TuiCommand;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Completed network work, applied on the controller task.
#[derive(Debug)]
pub enum AppEvent {
    FeedLoaded { ticket: LoadTicket, outcome: FetchOutcome },
    ToggleDone { toggle: PendingToggle, result: ApiResult<()> },
    Deleted { post_id: PostId, result: ApiResult<()> },
    Posted { result: ApiResult<()> },
    ProfileLoaded { username: String, view: ProfileView },
    RelationshipDone { action: RelationshipAction, result: ApiResult<()> },
    ProfileSaved { request: UpdateProfileRequest, result: ApiResult<()> },
    UsersLoaded { result: ApiResult<Vec<UserSummary>> },
    UserCreated { result: ApiResult<CreateUserResponse> },
}

/// Owns all client state. Commands from the TUI and results from spawned
/// requests are applied one at a time; a snapshot is published after each.
pub struct App {
    api: Arc<dyn SocialApi>,
    source: FeedDataSource,
    interactions: InteractionController,
    scroll: ScrollController,
    state: AppState,
    state_tx: watch::Sender<AppState>,
    events_tx: mpsc::Sender<AppEvent>,
    events_rx: mpsc::Receiver<AppEvent>,
    in_flight: usize,
}

impl App {
    pub fn new(config: &Config, api: Arc<dyn SocialApi>, backend_label: impl Into<String>) -> (Self, watch::Receiver<AppState>) {
        let mut state = AppState::new(config.feed.chunk_size, config.feed.post_card_rows, config.compose.max_chars);
        state.backend_label = backend_label.into();
        let (state_tx, state_rx) = watch::channel(state.clone());
        let (events_tx, events_rx) = mpsc::channel(64);
        let app = Self {
            source: FeedDataSource::new(api.clone()),
            interactions: InteractionController::new(api.clone()),
            scroll: ScrollController::new(config.feed.scroll_threshold),
            api,
            state,
            state_tx,
            events_tx,
            events_rx,
            in_flight: 0,
        };
        (app, state_rx)
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn scroll(&self) -> &ScrollController {
        &self.scroll
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Main loop. Returns when the TUI quits or drops its sender.
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<TuiCommand>) {
        self.publish();
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle_command(cmd) {
                            break;
                        }
                    }
                    None => break,
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
            }
            self.publish();
        }
        tracing::info!("controller stopped");
    }

    /// Apply every outstanding request result. Used by tests and at shutdown.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
        self.publish();
    }

    fn publish(&mut self) {
        self.state.pending_interactions = self.interactions.pending_count();
        self.state_tx.send_replace(self.state.clone());
    }

    fn spawn<F>(&mut self, work: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.in_flight += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let event = work.await;
            let _ = tx.send(event).await;
        });
    }

    fn viewer(&self) -> Option<String> {
        self.state.session.as_ref().map(|s| s.user_id.clone())
    }

    // --- session and routing ---

    /// Adopt `session`, register it with the server, and open the home feed.
    pub fn start_session(&mut self, session: Session) {
        tracing::info!(user_id = %session.user_id, username = %session.username, "signed in");
        let request = session.create_user_request();
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.create_user(&request).await;
            AppEvent::UserCreated { result }
        });
        self.state.push_log("INFO", format!("Signed in as @{}", session.username));
        self.state.session = Some(session);
        self.navigate(Route::Home);
    }

    fn submit_login(&mut self) {
        match Session::sign_in(&self.state.login_input) {
            Some(session) => {
                self.state.login_input.clear();
                self.start_session(session);
            }
            None => self.state.notify(StatusLevel::Warn, "Enter a name to sign in."),
        }
    }

    fn sign_out(&mut self) {
        if let Some(session) = self.state.session.take() {
            tracing::info!(username = %session.username, "signed out");
            self.state.push_log("INFO", format!("Signed out @{}", session.username));
        }
        self.interactions.reset();
        self.state.feed = FeedState::new(self.state.feed.chunk_size());
        self.state.directory = UserDirectory::new();
        self.state.composer.clear();
        self.state.status = None;
    }

    /// Switch screens. Every screen change clears the root post and reloads the feed.
    pub fn navigate(&mut self, route: Route) {
        let route = if self.state.session.is_none() { Route::Login } else { route };
        tracing::debug!(path = %route.path(), "navigate");
        if route == Route::Login {
            self.sign_out();
        }

        self.state.feed.clear_root();
        self.state.feed.request_reload();
        self.reset_feed_position();
        self.state.editor = None;
        self.state.profile = None;
        self.state.focus = if route == Route::Login { Focus::Login } else { Focus::Feed };

        if route.has_feed() {
            if !self.scroll.is_attached() {
                self.scroll.attach();
            }
        } else {
            self.scroll.detach();
        }

        if let (Route::Profile { username }, Some(viewer)) = (&route, self.state.session.clone()) {
            self.state.profile = Some(ProfileView::pending(username));
            let api = self.api.clone();
            let username = username.clone();
            self.spawn(async move {
                let view = ProfileView::load(api.as_ref(), &viewer, &username).await;
                AppEvent::ProfileLoaded { username, view }
            });
        }
        self.state.route = route;
        self.maybe_load();
    }

    // --- feed ---

    fn reset_feed_position(&mut self) {
        self.state.feed_selected = 0;
        self.state.feed_scroll = 0;
    }

    /// Start a load if the feed has been invalidated and a feed screen is showing.
    fn maybe_load(&mut self) {
        if !self.state.route.has_feed() || !self.state.feed.needs_load() {
            return;
        }
        let Some(viewer) = self.viewer() else {
            return;
        };
        let ticket = self.state.feed.begin_load();
        self.reset_feed_position();
        tracing::debug!(seq = ticket.seq(), scope = ?ticket.scope().map(PostId::as_str), "loading feed");
        let source = self.source.clone();
        self.spawn(async move {
            let outcome = source.fetch_posts(&viewer, ticket.scope()).await;
            AppEvent::FeedLoaded { ticket, outcome }
        });
    }

    /// Feed pane metrics, or `None` while the list is not on screen.
    fn scroll_metrics(&self) -> Option<ScrollMetrics> {
        let client_height = u32::from(self.state.viewport_rows?);
        if !self.state.route.has_feed() || self.state.feed.is_loading() {
            return None;
        }
        Some(ScrollMetrics {
            scroll_top: self.state.feed_scroll,
            scroll_height: self.state.feed.visible().len() as u32 * u32::from(self.state.card_rows),
            client_height,
        })
    }

    fn report_scroll(&mut self) {
        let metrics = self.scroll_metrics();
        if self.scroll.on_scroll_current(metrics, &mut self.state.feed) {
            self.state.push_log("INFO", format!("Showing {} posts", self.state.feed.visible().len()));
        }
    }

    /// Scroll so the selected card is fully on screen.
    fn ensure_selected_visible(&mut self) {
        let Some(client) = self.state.viewport_rows.map(u32::from) else {
            return;
        };
        let card = u32::from(self.state.card_rows);
        let top = self.state.feed_selected as u32 * card;
        let bottom = top + card;
        if top < self.state.feed_scroll {
            self.state.feed_scroll = top;
        } else if bottom > self.state.feed_scroll + client {
            self.state.feed_scroll = bottom.saturating_sub(client);
        }
        let content = self.state.feed.visible().len() as u32 * card;
        self.state.feed_scroll = self.state.feed_scroll.min(content.saturating_sub(client));
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.state.feed.visible().len();
        if len > 0 {
            let next = (self.state.feed_selected as isize + delta).clamp(0, len as isize - 1);
            self.state.feed_selected = next as usize;
            self.ensure_selected_visible();
        }
        self.report_scroll();
    }

    fn page_size(&self) -> isize {
        let rows = self.state.viewport_rows.unwrap_or(0);
        (rows / self.state.card_rows).max(1) as isize
    }

    fn toggle_interaction(&mut self, kind: InteractionKind) {
        let Some(viewer) = self.viewer() else {
            return;
        };
        let Some(post_id) = self.state.selected_post().map(|p| p.post_id.clone()) else {
            return;
        };
        let Some(toggle) = self.interactions.begin_toggle(&mut self.state.feed, &post_id, kind) else {
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            let result = InteractionController::send(api.as_ref(), &viewer, &toggle).await;
            AppEvent::ToggleDone { toggle, result }
        });
    }

    fn delete_selected(&mut self) {
        let (Some(session), Some(post)) = (self.state.session.as_ref(), self.state.selected_post()) else {
            return;
        };
        if !can_delete(session, post) {
            self.state.notify(StatusLevel::Warn, "You can only delete your own posts.");
            return;
        }
        let post_id = post.post_id.clone();
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.delete_tweet(&post_id).await;
            AppEvent::Deleted { post_id, result }
        });
    }

    fn reply_to_selected(&mut self) {
        let Some(post) = self.state.selected_post().cloned() else {
            return;
        };
        if self.interactions.handle_reply_select(&mut self.state.feed, post) {
            self.reset_feed_position();
        }
        self.state.focus = Focus::Composer;
    }

    fn submit_post(&mut self) {
        let Some(viewer) = self.viewer() else {
            return;
        };
        let root = self.state.feed.root_post().cloned();
        let Some(submission) = self.state.composer.take_submission(root.as_ref()) else {
            return;
        };
        self.state.focus = Focus::Feed;
        let api = self.api.clone();
        self.spawn(async move {
            let result = submission.send(api.as_ref(), &viewer).await;
            AppEvent::Posted { result }
        });
    }

    // --- profile ---

    fn toggle_relationship(&mut self, kind: Relationship) {
        let (Some(session), Some(profile)) = (self.state.session.as_ref(), self.state.profile.as_ref()) else {
            return;
        };
        let Some(action) = profile.action(session, kind) else {
            return;
        };
        let viewer = session.user_id.clone();
        let api = self.api.clone();
        self.spawn(async move {
            let result = action.send(api.as_ref(), &viewer).await;
            AppEvent::RelationshipDone { action, result }
        });
    }

    fn open_editor(&mut self) {
        let (Some(session), Some(profile)) = (self.state.session.as_ref(), self.state.profile.as_ref()) else {
            return;
        };
        if profile.can_edit(session) {
            self.state.editor = Some(ProfileEditor::new(session));
            self.state.focus = Focus::Editor;
        }
    }

    fn save_profile(&mut self) {
        let (Some(session), Some(editor)) = (self.state.session.as_ref(), self.state.editor.as_mut()) else {
            return;
        };
        let Some(request) = editor.begin_save(session) else {
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            let result = api.update_profile(&request).await;
            AppEvent::ProfileSaved { request, result }
        });
    }

    // --- drawers ---

    fn open_search(&mut self) {
        self.state.focus = Focus::Search;
        self.state.directory.clear_query();
        if self.state.directory.is_loaded() {
            return;
        }
        let Some(viewer) = self.viewer() else {
            return;
        };
        let api = self.api.clone();
        self.spawn(async move {
            let result = UserDirectory::fetch(api.as_ref(), &viewer).await;
            AppEvent::UsersLoaded { result }
        });
    }

    fn activate_menu(&mut self) {
        let item = MENU_ITEMS[self.state.menu_selected.min(MENU_ITEMS.len() - 1)];
        self.state.focus = Focus::Feed;
        match item {
            MenuItem::Profile => {
                if let Some(username) = self.state.session.as_ref().map(|s| s.username.clone()) {
                    self.navigate(Route::Profile { username });
                }
            }
            MenuItem::Home => self.navigate(Route::Home),
            MenuItem::Close => {}
            MenuItem::Logout => self.navigate(Route::Login),
        }
    }

    // --- dispatch ---

    /// Apply one TUI command. Returns false when the app should exit.
    pub fn handle_command(&mut self, cmd: TuiCommand) -> bool {
        let focus = self.state.focus;
        match cmd {
            TuiCommand::Quit => return false,
            TuiCommand::Viewport(rows) => {
                self.state.viewport_rows = Some(rows);
                self.ensure_selected_visible();
            }
            TuiCommand::Char(c) => match focus {
                Focus::Login => self.state.login_input.push(c),
                Focus::Composer => {
                    // Input past the limit is dropped.
                    self.state.composer.push(c);
                }
                Focus::Editor => {
                    if let Some(editor) = self.state.editor.as_mut() {
                        editor.push(c);
                    }
                }
                Focus::Search => self.state.directory.push(c),
                _ => {}
            },
            TuiCommand::Backspace => match focus {
                Focus::Login => {
                    self.state.login_input.pop();
                }
                Focus::Composer => self.state.composer.backspace(),
                Focus::Editor => {
                    if let Some(editor) = self.state.editor.as_mut() {
                        editor.backspace();
                    }
                }
                Focus::Search => self.state.directory.backspace(),
                _ => {}
            },
            TuiCommand::NextField => {
                if let Some(editor) = self.state.editor.as_mut() {
                    editor.next_field();
                }
            }
            TuiCommand::Submit => match focus {
                Focus::Login => self.submit_login(),
                Focus::Composer => self.submit_post(),
                Focus::Editor => self.save_profile(),
                Focus::Search => {
                    let target = self.state.directory.selected().map(|u| u.username.clone());
                    self.state.focus = Focus::Feed;
                    if let Some(username) = target {
                        self.navigate(Route::Profile { username });
                    }
                }
                Focus::Menu => self.activate_menu(),
                _ => {}
            },
            TuiCommand::Cancel => match focus {
                Focus::Editor => {
                    self.state.editor = None;
                    self.state.focus = Focus::Feed;
                }
                Focus::Composer | Focus::Search | Focus::Menu | Focus::Logs => self.state.focus = Focus::Feed,
                Focus::Feed => {
                    if self.state.route == Route::NotFound {
                        self.navigate(Route::Home);
                    } else if self.state.feed.clear_root() {
                        self.reset_feed_position();
                    }
                }
                Focus::Login => {}
            },
            TuiCommand::SelectNext => match focus {
                Focus::Menu => self.state.menu_selected = (self.state.menu_selected + 1).min(MENU_ITEMS.len() - 1),
                Focus::Search => self.state.directory.select_next(),
                Focus::Logs => {
                    self.state.log_scroll_offset = self.state.log_scroll_offset.saturating_sub(1);
                }
                _ => self.move_selection(1),
            },
            TuiCommand::SelectPrev => match focus {
                Focus::Menu => self.state.menu_selected = self.state.menu_selected.saturating_sub(1),
                Focus::Search => self.state.directory.select_prev(),
                Focus::Logs => {
                    self.state.log_scroll_offset = (self.state.log_scroll_offset + 1).min(self.state.logs.len());
                }
                _ => self.move_selection(-1),
            },
            TuiCommand::PageDown => self.move_selection(self.page_size()),
            TuiCommand::PageUp => self.move_selection(-self.page_size()),
            TuiCommand::Top => match focus {
                Focus::Logs => self.state.log_scroll_offset = self.state.logs.len(),
                _ => self.move_selection(-(self.state.feed.visible().len() as isize)),
            },
            TuiCommand::Bottom => match focus {
                Focus::Logs => self.state.log_scroll_offset = 0,
                _ => self.move_selection(self.state.feed.visible().len() as isize),
            },
            TuiCommand::ToggleLike => self.toggle_interaction(InteractionKind::Like),
            TuiCommand::ToggleRetweet => self.toggle_interaction(InteractionKind::Retweet),
            TuiCommand::Reply => self.reply_to_selected(),
            TuiCommand::Delete => self.delete_selected(),
            TuiCommand::OpenAuthor => match self.state.selected_post().map(|p| p.author_username.clone()) {
                Some(Some(username)) => self.navigate(Route::Profile { username }),
                Some(None) => self.state.notify(StatusLevel::Warn, "This author has no public profile."),
                None => {}
            },
            TuiCommand::Compose => {
                if self.state.route.has_feed() {
                    self.state.focus = Focus::Composer;
                }
            }
            TuiCommand::OpenMenu => {
                self.state.menu_selected = 0;
                self.state.focus = Focus::Menu;
            }
            TuiCommand::OpenSearch => self.open_search(),
            TuiCommand::ToggleLogs => {
                self.state.log_scroll_offset = 0;
                self.state.focus = Focus::Logs;
            }
            TuiCommand::Reload => self.state.feed.request_reload(),
            TuiCommand::ToggleFollow => self.toggle_relationship(Relationship::Follow),
            TuiCommand::ToggleBlock => self.toggle_relationship(Relationship::Block),
            TuiCommand::EditProfile => self.open_editor(),
            TuiCommand::Navigate(route) => self.navigate(route),
        }
        self.maybe_load();
        true
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match event {
            AppEvent::FeedLoaded { ticket, outcome } => {
                let failure = match &outcome {
                    FetchOutcome::Failed(e) => Some(e.to_string()),
                    _ => None,
                };
                if self.state.feed.finish_load(ticket, outcome) {
                    self.interactions.reset();
                    self.reset_feed_position();
                    if let Some(message) = failure {
                        self.state.notify(StatusLevel::Error, format!("Couldn't load posts: {}", message));
                    }
                }
            }
            AppEvent::ToggleDone { toggle, result } => {
                let verb = match (toggle.kind, toggle.activate) {
                    (InteractionKind::Like, true) => "like",
                    (InteractionKind::Like, false) => "unlike",
                    (InteractionKind::Retweet, true) => "retweet",
                    (InteractionKind::Retweet, false) => "unretweet",
                };
                let outcome = self.interactions.resolve(&mut self.state.feed, &toggle, result);
                if outcome == ToggleOutcome::RolledBack {
                    self.state.notify(StatusLevel::Warn, format!("Couldn't {} post; change reverted.", verb));
                }
            }
            AppEvent::Deleted { post_id, result } => match result {
                Ok(()) => {
                    tracing::info!(post_id = %post_id, "post deleted");
                    self.state.feed.request_reload();
                    self.state.notify(StatusLevel::Info, "Post deleted.");
                }
                Err(e) => {
                    tracing::warn!(post_id = %post_id, error = %e, "delete failed");
                    self.state.notify(StatusLevel::Error, format!("Couldn't delete post: {}", e));
                }
            },
            AppEvent::Posted { result } => match result {
                Ok(()) => {
                    self.state.feed.request_reload();
                    self.state.notify(StatusLevel::Info, "Posted.");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "post failed");
                    self.state.notify(StatusLevel::Error, format!("Couldn't publish post: {}", e));
                }
            },
            AppEvent::ProfileLoaded { username, view } => {
                // Stale if the viewer has already moved on.
                let current = matches!(&self.state.route, Route::Profile { username: shown } if *shown == username);
                if current {
                    if let Some(error) = &view.error {
                        self.state.notify(StatusLevel::Warn, format!("Couldn't load @{}: {}", username, error));
                    }
                    self.state.profile = Some(view);
                }
            }
            AppEvent::RelationshipDone { action, result } => {
                let applied = match self.state.profile.as_mut() {
                    Some(profile) if profile.username == action.username => profile.apply(&action, &result),
                    _ => result.is_ok(),
                };
                if applied {
                    // Following and blocking change which posts the home feed holds.
                    self.state.feed.request_reload();
                    self.state.notify(StatusLevel::Info, format!("{} @{}: done.", action.label(), action.username));
                } else {
                    self.state.notify(
                        StatusLevel::Error,
                        format!("Couldn't {} @{}.", action.label().to_lowercase(), action.username),
                    );
                }
            }
            AppEvent::ProfileSaved { request, result } => {
                let closed = match (self.state.session.as_mut(), self.state.editor.as_mut()) {
                    (Some(session), Some(editor)) => Some(editor.finish_save(session, &request, result)),
                    _ => None,
                };
                if closed == Some(true) {
                    self.state.editor = None;
                    self.state.focus = Focus::Feed;
                    if let Some(profile) = self.state.profile.as_mut() {
                        profile.username = request.username.clone();
                        profile.bio = request.bio.clone();
                        profile.picture = Some(request.picture.clone()).filter(|p| !p.is_empty());
                    }
                    if matches!(self.state.route, Route::Profile { .. }) {
                        self.state.route = Route::Profile { username: request.username.clone() };
                    }
                    self.state.notify(StatusLevel::Info, "Profile updated.");
                } else if closed == Some(false) {
                    self.state.notify(StatusLevel::Error, SAVE_FAILED);
                }
            }
            AppEvent::UsersLoaded { result } => match result {
                Ok(users) => {
                    let viewer = self.viewer().unwrap_or_default();
                    self.state.directory.set_users(&viewer, users);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "user list fetch failed");
                    self.state.notify(StatusLevel::Error, format!("Couldn't load users: {}", e));
                }
            },
            AppEvent::UserCreated { result } => match result {
                Ok(created) => {
                    if let Some(session) = self.state.session.as_mut() {
                        session.apply_created(created);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "account registration failed, continuing with local session");
                    self.state.push_log("WARN", format!("Account registration failed: {}", e));
                }
            },
        }
        self.maybe_load();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryApi;
    use crate::api::Endpoint;
    use crate::feed::LoadPhase;

    fn config() -> Config {
        let mut config = Config::default();
        config.feed.scroll_threshold = 3;
        config
    }

    async fn signed_in(api: Arc<MemoryApi>) -> App {
        let (mut app, _rx) = App::new(&config(), api, "test");
        app.start_session(Session::new("alice1", "alice"));
        app.handle_command(TuiCommand::Viewport(24));
        app.settle().await;
        app
    }

    fn world(posts: usize) -> Arc<MemoryApi> {
        let api = MemoryApi::new();
        api.add_user("alice1", "alice");
        api.add_user("bob1", "bob");
        api.add_follow("alice1", "bob1");
        for i in 0..posts {
            let author = if i % 2 == 0 { "bob1" } else { "alice1" };
            api.add_post(author, &format!("post {}", i));
        }
        Arc::new(api)
    }

    #[tokio::test]
    async fn test_sign_in_loads_home_feed() {
        let api = world(3);
        let app = signed_in(api.clone()).await;
        assert_eq!(app.state().route, Route::Home);
        assert_eq!(app.state().focus, Focus::Feed);
        assert_eq!(app.state().feed.phase(), &LoadPhase::Loaded);
        assert_eq!(app.state().feed.visible().len(), 3);
        assert_eq!(api.call_count(Endpoint::CreateUser), 1);
        assert!(app.scroll().is_attached());
    }

    #[tokio::test]
    async fn test_blank_login_is_rejected() {
        let (mut app, _rx) = App::new(&config(), world(0), "test");
        app.handle_command(TuiCommand::Char(' '));
        app.handle_command(TuiCommand::Submit);
        assert_eq!(app.state().route, Route::Login);
        assert!(app.state().status.is_some());
    }

    #[tokio::test]
    async fn test_login_from_typed_name() {
        let api = world(0);
        let (mut app, _rx) = App::new(&config(), api.clone(), "test");
        for c in "Jo Bloggs".chars() {
            app.handle_command(TuiCommand::Char(c));
        }
        app.handle_command(TuiCommand::Submit);
        app.settle().await;
        let session = app.state().session.as_ref().unwrap();
        assert_eq!(session.username, "jobloggs");
        assert!(session.user_id.starts_with("jobloggs"));
        assert_eq!(app.state().route, Route::Home);
    }

    #[tokio::test]
    async fn test_moving_down_grows_window() {
        let api = world(25);
        let mut app = signed_in(api).await;
        assert_eq!(app.state().feed.visible().len(), 10);
        app.handle_command(TuiCommand::Bottom);
        assert_eq!(app.state().feed.visible().len(), 20);
        app.handle_command(TuiCommand::Bottom);
        assert_eq!(app.state().feed.visible().len(), 25);
        app.handle_command(TuiCommand::Bottom);
        assert_eq!(app.state().feed.visible().len(), 25);
        assert!(app.state().feed.shows_end_marker());
    }

    #[tokio::test]
    async fn test_default_config_grows_only_near_bottom() {
        let (mut app, _rx) = App::new(&Config::default(), world(25), "test");
        app.start_session(Session::new("alice1", "alice"));
        app.handle_command(TuiCommand::Viewport(24));
        app.settle().await;

        app.handle_command(TuiCommand::SelectNext);
        assert_eq!(app.state().feed_selected, 1);
        assert_eq!(app.state().feed.visible().len(), 10);

        app.handle_command(TuiCommand::Bottom);
        assert_eq!(app.state().feed.visible().len(), 20);
    }

    #[tokio::test]
    async fn test_post_actions_ignored_while_reloading() {
        let api = world(2);
        let mut app = signed_in(api.clone()).await;
        app.handle_command(TuiCommand::Reload);
        assert!(app.state().feed.is_loading());
        assert!(app.state().selected_post().is_none());

        app.handle_command(TuiCommand::ToggleLike);
        app.handle_command(TuiCommand::Delete);
        app.handle_command(TuiCommand::OpenAuthor);
        app.settle().await;
        assert_eq!(api.call_count(Endpoint::Like), 0);
        assert_eq!(api.call_count(Endpoint::DeleteTweet), 0);
        assert_eq!(app.state().route, Route::Home);
        assert_eq!(app.state().feed.all_posts().len(), 2);
    }

    #[tokio::test]
    async fn test_open_author_uses_username() {
        let api = world(1);
        let mut app = signed_in(api.clone()).await;
        app.handle_command(TuiCommand::OpenAuthor);
        assert_eq!(app.state().route, Route::Profile { username: "bob".to_string() });
    }

    #[tokio::test]
    async fn test_open_author_without_username_stays_put() {
        let api = world(0);
        api.add_follow("alice1", "ghost1");
        api.add_post("ghost1", "boo");
        let mut app = signed_in(api.clone()).await;
        assert_eq!(app.state().selected_post().unwrap().author_display_name, "ghost1");

        app.handle_command(TuiCommand::OpenAuthor);
        app.settle().await;
        assert_eq!(app.state().route, Route::Home);
        assert_eq!(api.call_count(Endpoint::GetUser), 0);
        assert_eq!(app.state().status.as_ref().unwrap().level, StatusLevel::Warn);
    }

    #[tokio::test]
    async fn test_no_growth_without_viewport() {
        let api = world(25);
        let (mut app, _rx) = App::new(&config(), api, "test");
        app.start_session(Session::new("alice1", "alice"));
        app.settle().await;
        app.handle_command(TuiCommand::Bottom);
        assert_eq!(app.state().feed.visible().len(), 10);
    }

    #[tokio::test]
    async fn test_failed_like_rolls_back_and_reports() {
        let api = world(2);
        let mut app = signed_in(api.clone()).await;
        api.fail(Endpoint::Like);
        app.handle_command(TuiCommand::ToggleLike);
        let id = app.state().selected_post().unwrap().post_id.clone();
        assert!(app.state().feed.effective(&id).unwrap().liked);
        app.settle().await;
        let shown = app.state().feed.effective(&id).unwrap();
        assert!(!shown.liked);
        assert_eq!(shown.like_count, 0);
        assert_eq!(app.state().status.as_ref().unwrap().level, StatusLevel::Warn);
    }

    #[tokio::test]
    async fn test_reply_scopes_and_posts_reply() {
        let api = world(2);
        let mut app = signed_in(api.clone()).await;
        let root = app.state().selected_post().unwrap().clone();
        app.handle_command(TuiCommand::Reply);
        assert_eq!(app.state().focus, Focus::Composer);
        app.settle().await;
        assert_eq!(app.state().feed.scope(), Some(&root.post_id));
        assert!(app.state().feed.visible().is_empty());

        for c in "nice".chars() {
            app.handle_command(TuiCommand::Char(c));
        }
        app.handle_command(TuiCommand::Submit);
        app.settle().await;
        assert_eq!(app.state().feed.visible().len(), 1);
        assert_eq!(app.state().feed.visible()[0].text, "nice");

        app.handle_command(TuiCommand::Cancel);
        app.settle().await;
        assert!(app.state().feed.root_post().is_none());
        assert_eq!(app.state().feed.visible().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_only_own_posts() {
        let api = world(2);
        let mut app = signed_in(api.clone()).await;
        // Newest first: "post 1" by alice, then "post 0" by bob.
        app.handle_command(TuiCommand::SelectNext);
        app.handle_command(TuiCommand::Delete);
        assert_eq!(api.call_count(Endpoint::DeleteTweet), 0);

        app.handle_command(TuiCommand::SelectPrev);
        let own = app.state().selected_post().unwrap().post_id.clone();
        app.handle_command(TuiCommand::Delete);
        app.settle().await;
        assert!(app.state().feed.post(&own).is_none());
        assert_eq!(app.state().feed.all_posts().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_navigation_and_follow() {
        let api = world(0);
        api.add_user("carol1", "carol");
        let mut app = signed_in(api.clone()).await;
        app.handle_command(TuiCommand::Navigate(Route::Profile { username: "carol".to_string() }));
        app.settle().await;
        let profile = app.state().profile.as_ref().unwrap();
        assert_eq!(profile.is_following, Some(false));

        app.handle_command(TuiCommand::ToggleFollow);
        app.settle().await;
        assert_eq!(app.state().profile.as_ref().unwrap().is_following, Some(true));
        assert_eq!(api.call_count(Endpoint::Follow), 1);
    }

    #[tokio::test]
    async fn test_search_opens_profile() {
        let api = world(0);
        let mut app = signed_in(api).await;
        app.handle_command(TuiCommand::OpenSearch);
        app.settle().await;
        app.handle_command(TuiCommand::Char('b'));
        app.handle_command(TuiCommand::Submit);
        app.settle().await;
        assert_eq!(app.state().route, Route::Profile { username: "bob".to_string() });
    }

    #[tokio::test]
    async fn test_logout_from_menu() {
        let api = world(1);
        let mut app = signed_in(api).await;
        app.handle_command(TuiCommand::OpenMenu);
        for _ in 0..3 {
            app.handle_command(TuiCommand::SelectNext);
        }
        app.handle_command(TuiCommand::Submit);
        assert_eq!(app.state().route, Route::Login);
        assert!(app.state().session.is_none());
        assert!(app.state().feed.all_posts().is_empty());
        assert!(!app.scroll().is_attached());
    }

    #[tokio::test]
    async fn test_quit_command() {
        let (mut app, _rx) = App::new(&config(), world(0), "test");
        assert!(!app.handle_command(TuiCommand::Quit));
    }
}
