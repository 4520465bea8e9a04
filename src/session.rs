use crate::api::types::{CreateUserRequest, CreateUserResponse};
use rand::Rng;

/// The signed-in viewer. Passed explicitly to everything that acts on
/// their behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub picture: Option<String>,
    pub bio: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            picture: None,
            bio: String::new(),
        }
    }

    /// Start a session from a display name. The username is the name with
    /// whitespace removed and lower-cased; the user id appends a base-36
    /// timestamp and random suffix. Returns `None` for a blank name.
    pub fn sign_in(display_name: &str) -> Option<Self> {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let salt = rand::thread_rng().gen_range(0..1_000_000u64);
        Self::sign_in_with(display_name, now_ms, salt)
    }

    pub fn sign_in_with(display_name: &str, now_ms: u64, salt: u64) -> Option<Self> {
        let username: String = display_name
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        if username.is_empty() {
            return None;
        }
        let user_id = format!("{}{}{}", username, to_base36(now_ms), to_base36(salt));
        Some(Self::new(user_id, username))
    }

    pub fn create_user_request(&self) -> CreateUserRequest {
        CreateUserRequest {
            userid: self.user_id.clone(),
            username: self.username.clone(),
            picture: self.picture.clone(),
        }
    }

    /// Take the server's view of the account after `users/create/`.
    pub fn apply_created(&mut self, created: CreateUserResponse) {
        self.username = created.username;
        self.picture = created.picture.filter(|p| !p.is_empty());
        self.bio = created.bio.unwrap_or_default();
    }

    /// Post ownership is decided by user id only.
    pub fn owns(&self, author_id: &str) -> bool {
        self.user_id == author_id
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
