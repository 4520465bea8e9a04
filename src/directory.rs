use crate::api::types::UserSummary;
use crate::api::{ApiResult, SocialApi};

/// The user search drawer: every other account, filtered as the viewer types.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<UserSummary>,
    query: String,
    selected: usize,
    loaded: bool,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fetch(api: &dyn SocialApi, viewer: &str) -> ApiResult<Vec<UserSummary>> {
        api.list_users(viewer).await
    }

    /// Replace the list. The viewer is dropped even if the server included them.
    pub fn set_users(&mut self, viewer: &str, mut users: Vec<UserSummary>) {
        users.retain(|u| u.userid != viewer);
        users.sort_by(|a, b| a.username.to_lowercase().cmp(&b.username.to_lowercase()));
        self.users = users;
        self.loaded = true;
        self.clamp();
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn push(&mut self, c: char) {
        self.query.push(c);
        self.selected = 0;
    }

    pub fn backspace(&mut self) {
        self.query.pop();
        self.selected = 0;
    }

    pub fn clear_query(&mut self) {
        self.query.clear();
        self.selected = 0;
    }

    /// Case-insensitive substring match on username.
    pub fn matches(&self) -> Vec<&UserSummary> {
        let needle = self.query.to_lowercase();
        self.users
            .iter()
            .filter(|u| u.username.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        let len = self.matches().len();
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn selected(&self) -> Option<&UserSummary> {
        self.matches().get(self.selected).copied()
    }

    fn clamp(&mut self) {
        let len = self.matches().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }
}
