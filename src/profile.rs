use crate::api::types::{UpdateProfileRequest, UserProfileResponse};
use crate::api::{ApiResult, SocialApi};
use crate::session::Session;

pub const SAVE_FAILED: &str = "Failed to update profile.";
const NO_BIO: &str = "No bio yet.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Follow,
    Block,
}

/// A follow/unfollow or block/unblock request against one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipAction {
    pub kind: Relationship,
    pub username: String,
    /// True for follow/block, false for unfollow/unblock.
    pub activate: bool,
}

impl RelationshipAction {
    pub async fn send(&self, api: &dyn SocialApi, viewer: &str) -> ApiResult<()> {
        match (self.kind, self.activate) {
            (Relationship::Follow, true) => api.follow(viewer, &self.username).await,
            (Relationship::Follow, false) => api.unfollow(viewer, &self.username).await,
            (Relationship::Block, true) => api.block(viewer, &self.username).await,
            (Relationship::Block, false) => api.unblock(viewer, &self.username).await,
        }
    }

    pub fn label(&self) -> &'static str {
        match (self.kind, self.activate) {
            (Relationship::Follow, true) => "Follow",
            (Relationship::Follow, false) => "Unfollow",
            (Relationship::Block, true) => "Block",
            (Relationship::Block, false) => "Unblock",
        }
    }
}

/// Header data for a profile page.
///
/// `is_following` / `is_blocked` are `None` until a lookup succeeds; the
/// relationship buttons are hidden unless both are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
    pub username: String,
    pub bio: String,
    pub picture: Option<String>,
    pub is_following: Option<bool>,
    pub is_blocked: Option<bool>,
    pub error: Option<String>,
}

impl ProfileView {
    /// State shown while the lookup is in flight.
    pub fn pending(username: &str) -> Self {
        Self {
            username: username.to_string(),
            bio: String::new(),
            picture: None,
            is_following: None,
            is_blocked: None,
            error: None,
        }
    }

    /// Build from a `users/get-user` result. Any failure degrades to blank
    /// defaults with the error recorded.
    pub fn from_result(username: &str, result: ApiResult<UserProfileResponse>) -> Self {
        match result {
            Ok(profile) => Self {
                username: username.to_string(),
                bio: profile.bio.unwrap_or_default(),
                picture: profile.picture.filter(|p| !p.is_empty()),
                is_following: Some(profile.is_following),
                is_blocked: Some(profile.is_blocked),
                error: None,
            },
            Err(e) => {
                tracing::warn!(username, error = %e, "profile lookup failed");
                Self {
                    error: Some(e.to_string()),
                    ..Self::pending(username)
                }
            }
        }
    }

    pub async fn load(api: &dyn SocialApi, session: &Session, username: &str) -> Self {
        let result = api.get_user(&session.user_id, username).await;
        Self::from_result(username, result)
    }

    pub fn is_own(&self, session: &Session) -> bool {
        session.username == self.username
    }

    /// Own profile offers Edit instead.
    pub fn can_edit(&self, session: &Session) -> bool {
        self.is_own(session)
    }

    pub fn shows_relationship_buttons(&self, session: &Session) -> bool {
        !self.is_own(session) && self.is_following.is_some() && self.is_blocked.is_some()
    }

    pub fn bio_text(&self) -> &str {
        if self.bio.is_empty() {
            NO_BIO
        } else {
            &self.bio
        }
    }

    /// The action the button for `kind` would perform, if it is shown.
    pub fn action(&self, session: &Session, kind: Relationship) -> Option<RelationshipAction> {
        if !self.shows_relationship_buttons(session) {
            return None;
        }
        let current = match kind {
            Relationship::Follow => self.is_following?,
            Relationship::Block => self.is_blocked?,
        };
        Some(RelationshipAction {
            kind,
            username: self.username.clone(),
            activate: !current,
        })
    }

    /// Flags only move once the server accepted the change.
    pub fn apply(&mut self, action: &RelationshipAction, result: &ApiResult<()>) -> bool {
        if let Err(e) = result {
            tracing::warn!(username = %action.username, action = action.label(), error = %e, "relationship change failed");
            return false;
        }
        match action.kind {
            Relationship::Follow => self.is_following = Some(action.activate),
            Relationship::Block => {
                self.is_blocked = Some(action.activate);
                // Blocking drops any follow on the server side.
                if action.activate {
                    self.is_following = Some(false);
                }
            }
        }
        true
    }

    pub async fn toggle(&mut self, api: &dyn SocialApi, session: &Session, kind: Relationship) -> Option<bool> {
        let action = self.action(session, kind)?;
        let result = action.send(api, &session.user_id).await;
        Some(self.apply(&action, &result))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Username,
    Bio,
    Picture,
}

impl EditorField {
    pub fn next(self) -> Self {
        match self {
            EditorField::Username => EditorField::Bio,
            EditorField::Bio => EditorField::Picture,
            EditorField::Picture => EditorField::Username,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EditorField::Username => "Username",
            EditorField::Bio => "Bio",
            EditorField::Picture => "Profile Picture URL",
        }
    }
}

/// Edit form for the viewer's own profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEditor {
    pub username: String,
    pub bio: String,
    pub picture: String,
    pub field: EditorField,
    saving: bool,
    error: Option<String>,
}

impl ProfileEditor {
    pub fn new(session: &Session) -> Self {
        Self {
            username: session.username.clone(),
            bio: session.bio.clone(),
            picture: session.picture.clone().unwrap_or_default(),
            field: EditorField::Username,
            saving: false,
            error: None,
        }
    }

    pub fn is_saving(&self) -> bool {
        self.saving
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn can_save(&self) -> bool {
        !self.saving && !self.username.trim().is_empty()
    }

    pub fn value(&self, field: EditorField) -> &str {
        match field {
            EditorField::Username => &self.username,
            EditorField::Bio => &self.bio,
            EditorField::Picture => &self.picture,
        }
    }

    fn value_mut(&mut self) -> &mut String {
        match self.field {
            EditorField::Username => &mut self.username,
            EditorField::Bio => &mut self.bio,
            EditorField::Picture => &mut self.picture,
        }
    }

    pub fn push(&mut self, c: char) {
        self.value_mut().push(c);
    }

    pub fn backspace(&mut self) {
        self.value_mut().pop();
    }

    pub fn next_field(&mut self) {
        self.field = self.field.next();
    }

    /// Enter the saving state and build the request. `None` if saving is not allowed.
    pub fn begin_save(&mut self, session: &Session) -> Option<UpdateProfileRequest> {
        if !self.can_save() {
            return None;
        }
        self.saving = true;
        self.error = None;
        Some(UpdateProfileRequest {
            userid: session.user_id.clone(),
            username: self.username.trim().to_string(),
            bio: self.bio.clone(),
            picture: self.picture.trim().to_string(),
        })
    }

    /// Returns true when the editor should close. On success the session takes the new values.
    pub fn finish_save(&mut self, session: &mut Session, request: &UpdateProfileRequest, result: ApiResult<()>) -> bool {
        self.saving = false;
        match result {
            Ok(()) => {
                session.username = request.username.clone();
                session.bio = request.bio.clone();
                session.picture = Some(request.picture.clone()).filter(|p| !p.is_empty());
                tracing::info!(username = %session.username, "profile updated");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile update failed");
                self.error = Some(SAVE_FAILED.to_string());
                false
            }
        }
    }

    pub async fn save(&mut self, api: &dyn SocialApi, session: &mut Session) -> bool {
        let Some(request) = self.begin_save(session) else {
            return false;
        };
        let result = api.update_profile(&request).await;
        self.finish_save(session, &request, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryApi;
    use crate::api::Endpoint;

    fn world() -> (MemoryApi, Session) {
        let api = MemoryApi::new();
        api.add_user("alice1", "alice");
        api.add_user("bob1", "bob");
        api.set_bio("bob1", "hi, I'm bob");
        (api, Session::new("alice1", "alice"))
    }

    #[tokio::test]
    async fn test_load_fills_profile() {
        let (api, session) = world();
        api.add_follow("alice1", "bob1");
        let view = ProfileView::load(&api, &session, "bob").await;
        assert_eq!(view.bio, "hi, I'm bob");
        assert_eq!(view.is_following, Some(true));
        assert_eq!(view.is_blocked, Some(false));
        assert!(view.shows_relationship_buttons(&session));
        assert!(!view.can_edit(&session));
    }

    #[tokio::test]
    async fn test_failed_lookup_hides_buttons() {
        let (api, session) = world();
        api.fail(Endpoint::GetUser);
        let view = ProfileView::load(&api, &session, "bob").await;
        assert_eq!(view.bio, "");
        assert_eq!(view.picture, None);
        assert_eq!(view.is_following, None);
        assert_eq!(view.is_blocked, None);
        assert!(view.error.is_some());
        assert!(!view.shows_relationship_buttons(&session));
        assert!(view.action(&session, Relationship::Follow).is_none());
        assert_eq!(view.bio_text(), "No bio yet.");
    }

    #[tokio::test]
    async fn test_unknown_user_is_not_found() {
        let (api, session) = world();
        let view = ProfileView::load(&api, &session, "nobody").await;
        assert!(view.error.as_deref().unwrap().contains("not found"));
        assert!(!view.shows_relationship_buttons(&session));
    }

    #[tokio::test]
    async fn test_own_profile_offers_edit() {
        let (api, session) = world();
        let view = ProfileView::load(&api, &session, "alice").await;
        assert!(view.can_edit(&session));
        assert!(!view.shows_relationship_buttons(&session));
    }

    #[tokio::test]
    async fn test_follow_then_unfollow() {
        let (api, session) = world();
        let mut view = ProfileView::load(&api, &session, "bob").await;
        assert_eq!(view.toggle(&api, &session, Relationship::Follow).await, Some(true));
        assert_eq!(view.is_following, Some(true));
        assert_eq!(api.call_count(Endpoint::Follow), 1);
        view.toggle(&api, &session, Relationship::Follow).await;
        assert_eq!(view.is_following, Some(false));
        assert_eq!(api.call_count(Endpoint::Unfollow), 1);
    }

    #[tokio::test]
    async fn test_failed_block_leaves_flag() {
        let (api, session) = world();
        let mut view = ProfileView::load(&api, &session, "bob").await;
        api.fail(Endpoint::Block);
        assert_eq!(view.toggle(&api, &session, Relationship::Block).await, Some(false));
        assert_eq!(view.is_blocked, Some(false));
    }

    #[tokio::test]
    async fn test_block_clears_follow() {
        let (api, session) = world();
        api.add_follow("alice1", "bob1");
        let mut view = ProfileView::load(&api, &session, "bob").await;
        view.toggle(&api, &session, Relationship::Block).await;
        assert_eq!(view.is_blocked, Some(true));
        assert_eq!(view.is_following, Some(false));
        assert_eq!(view.action(&session, Relationship::Block).unwrap().label(), "Unblock");
    }

    #[tokio::test]
    async fn test_editor_saves_into_session() {
        let (api, mut session) = world();
        let mut editor = ProfileEditor::new(&session);
        editor.next_field();
        for c in "new bio".chars() {
            editor.push(c);
        }
        assert!(editor.save(&api, &mut session).await);
        assert_eq!(session.bio, "new bio");
        assert_eq!(api.call_count(Endpoint::UpdateProfile), 1);
    }

    #[tokio::test]
    async fn test_editor_failure_keeps_form_open() {
        let (api, mut session) = world();
        api.fail(Endpoint::UpdateProfile);
        let mut editor = ProfileEditor::new(&session);
        editor.username = "renamed".to_string();
        assert!(!editor.save(&api, &mut session).await);
        assert_eq!(editor.error(), Some(SAVE_FAILED));
        assert!(!editor.is_saving());
        assert_eq!(session.username, "alice");
    }

    #[test]
    fn test_blank_username_cannot_save() {
        let session = Session::new("alice1", "alice");
        let mut editor = ProfileEditor::new(&session);
        editor.username = "   ".to_string();
        assert!(!editor.can_save());
        assert!(editor.begin_save(&session).is_none());
    }

    #[test]
    fn test_cannot_save_twice_while_saving() {
        let session = Session::new("alice1", "alice");
        let mut editor = ProfileEditor::new(&session);
        assert!(editor.begin_save(&session).is_some());
        assert!(editor.is_saving());
        assert!(editor.begin_save(&session).is_none());
    }
}
