use super::pending::{FailureResolution, MutationId, PendingMutationRegistry};
use super::post::{InteractionKind, Post};
use super::source::FeedDataSource;
use super::state::{FeedState, InteractionSnapshot};
use crate::api::{ApiResult, PostId, SocialApi};
use crate::session::Session;
use std::sync::Arc;

/// An optimistic toggle that has been applied locally and still needs its
/// network call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    pub id: MutationId,
    pub post_id: PostId,
    pub kind: InteractionKind,
    /// True for like/retweet, false for unlike/unretweet.
    pub activate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Confirmed,
    RolledBack,
    /// Failed, but a newer toggle on the same post already owns the display.
    Superseded,
    /// The mutation was no longer tracked (feed reloaded in between).
    Ignored,
}

/// Optimistic like/retweet with rollback, plus delete and reply selection.
pub struct InteractionController {
    api: Arc<dyn SocialApi>,
    registry: PendingMutationRegistry,
}

impl InteractionController {
    pub fn new(api: Arc<dyn SocialApi>) -> Self {
        Self {
            api,
            registry: PendingMutationRegistry::new(),
        }
    }

    pub fn api(&self) -> Arc<dyn SocialApi> {
        self.api.clone()
    }

    pub fn pending_count(&self) -> usize {
        self.registry.count()
    }

    pub fn registry(&self) -> &PendingMutationRegistry {
        &self.registry
    }

    /// Flip `kind` on the post right away and register the mutation.
    /// Returns `None` if the post is not in the feed.
    pub fn begin_toggle(&mut self, feed: &mut FeedState, post_id: &PostId, kind: InteractionKind) -> Option<PendingToggle> {
        let current = feed.effective(post_id)?;
        let activate = !current.flag(kind);
        let delta = if activate { 1 } else { -1 };
        let snapshot = feed.apply_optimistic(post_id, kind, delta)?;
        let id = self.registry.register(post_id.clone(), kind, snapshot.before);
        tracing::debug!(post_id = %post_id, kind = kind.label(), activate, mutation = id.value(), "optimistic toggle applied");
        Some(PendingToggle {
            id,
            post_id: post_id.clone(),
            kind,
            activate,
        })
    }

    /// Issue the API call matching `toggle`.
    pub async fn send(api: &dyn SocialApi, viewer: &str, toggle: &PendingToggle) -> ApiResult<()> {
        match (toggle.kind, toggle.activate) {
            (InteractionKind::Like, true) => api.like(viewer, &toggle.post_id).await,
            (InteractionKind::Like, false) => api.unlike(viewer, &toggle.post_id).await,
            (InteractionKind::Retweet, true) => api.retweet(viewer, &toggle.post_id).await,
            (InteractionKind::Retweet, false) => api.unretweet(viewer, &toggle.post_id).await,
        }
    }

    /// Settle a toggle once its call returns. Failures roll the post back
    /// unless a newer toggle has taken over; nothing is retried.
    pub fn resolve(&mut self, feed: &mut FeedState, toggle: &PendingToggle, result: ApiResult<()>) -> ToggleOutcome {
        match result {
            Ok(()) => match self.registry.confirm(toggle.id) {
                Some(_) => ToggleOutcome::Confirmed,
                None => ToggleOutcome::Ignored,
            },
            Err(e) => {
                tracing::warn!(
                    post_id = %toggle.post_id,
                    kind = toggle.kind.label(),
                    error = %e,
                    "interaction failed"
                );
                match self.registry.fail(toggle.id) {
                    FailureResolution::Restore(before) => {
                        feed.rollback(&InteractionSnapshot {
                            post_id: toggle.post_id.clone(),
                            kind: toggle.kind,
                            before,
                        });
                        ToggleOutcome::RolledBack
                    }
                    FailureResolution::Superseded => ToggleOutcome::Superseded,
                    FailureResolution::Unknown => ToggleOutcome::Ignored,
                }
            }
        }
    }

    /// Apply, call, and settle in one step.
    pub async fn toggle(&mut self, feed: &mut FeedState, viewer: &str, post_id: &PostId, kind: InteractionKind) -> Option<ToggleOutcome> {
        let toggle = self.begin_toggle(feed, post_id, kind)?;
        let result = Self::send(self.api.as_ref(), viewer, &toggle).await;
        Some(self.resolve(feed, &toggle, result))
    }

    pub async fn toggle_like(&mut self, feed: &mut FeedState, viewer: &str, post_id: &PostId) -> Option<ToggleOutcome> {
        self.toggle(feed, viewer, post_id, InteractionKind::Like).await
    }

    pub async fn toggle_retweet(&mut self, feed: &mut FeedState, viewer: &str, post_id: &PostId) -> Option<ToggleOutcome> {
        self.toggle(feed, viewer, post_id, InteractionKind::Retweet).await
    }

    /// Drop all pending mutations; called whenever a load replaces the overrides.
    pub fn reset(&mut self) {
        let dropped = self.registry.drain();
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "pending interactions dropped by reload");
        }
    }

    /// Delete a post, then reload the feed in full to resync counts and order.
    pub async fn handle_delete(&mut self, feed: &mut FeedState, source: &FeedDataSource, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        if let Err(e) = self.api.delete_tweet(post_id).await {
            tracing::warn!(post_id = %post_id, error = %e, "delete failed");
            return Err(e);
        }
        tracing::info!(post_id = %post_id, "post deleted");
        self.reset();
        feed.load(source, viewer).await;
        Ok(())
    }

    /// Scope the feed to replies of `post`. The caller passes the same post to the composer.
    pub fn handle_reply_select(&self, feed: &mut FeedState, post: Post) -> bool {
        feed.select_root(post)
    }
}

/// Delete is offered only on the viewer's own posts; the server enforces it regardless.
pub fn can_delete(session: &Session, post: &Post) -> bool {
    session.owns(&post.author_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::MemoryApi;
    use crate::api::Endpoint;

    struct Fixture {
        api: Arc<MemoryApi>,
        source: FeedDataSource,
        feed: FeedState,
        interactions: InteractionController,
    }

    async fn fixture() -> Fixture {
        let api = Arc::new(MemoryApi::new());
        api.add_user("alice1", "alice");
        api.add_user("bob1", "bob");
        api.add_follow("alice1", "bob1");
        let liked = api.add_post("bob1", "already liked");
        api.add_like("alice1", &liked);
        api.add_like("bob1", &liked);
        api.add_post("bob1", "fresh");
        api.add_post("alice1", "mine");

        let source = FeedDataSource::new(api.clone());
        let mut feed = FeedState::default();
        feed.load(&source, "alice1").await;
        let interactions = InteractionController::new(api.clone());
        Fixture { api, source, feed, interactions }
    }

    fn id_of(feed: &FeedState, text: &str) -> PostId {
        feed.all_posts().iter().find(|p| p.text == text).unwrap().post_id.clone()
    }

    #[tokio::test]
    async fn test_like_then_unlike_round_trips() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "fresh");

        let out = f.interactions.toggle_like(&mut f.feed, "alice1", &id).await;
        assert_eq!(out, Some(ToggleOutcome::Confirmed));
        let after_like = f.feed.effective(&id).unwrap();
        assert!(after_like.liked);
        assert_eq!(after_like.like_count, 1);
        assert!(f.api.is_liked("alice1", &id));

        f.interactions.toggle_like(&mut f.feed, "alice1", &id).await;
        let after_unlike = f.feed.effective(&id).unwrap();
        assert!(!after_unlike.liked);
        assert_eq!(after_unlike.like_count, 0);
        assert!(!f.api.is_liked("alice1", &id));
    }

    #[tokio::test]
    async fn test_failed_unlike_restores_exact_state() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "already liked");
        let before = f.feed.effective(&id).unwrap();
        assert!(before.liked);
        assert_eq!(before.like_count, 2);

        f.api.fail(Endpoint::Unlike);
        let out = f.interactions.toggle_like(&mut f.feed, "alice1", &id).await;
        assert_eq!(out, Some(ToggleOutcome::RolledBack));
        assert_eq!(f.feed.effective(&id).unwrap(), before);
        assert_eq!(f.interactions.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_optimistic_state_visible_before_call_resolves() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "fresh");
        let toggle = f.interactions.begin_toggle(&mut f.feed, &id, InteractionKind::Retweet).unwrap();
        assert!(toggle.activate);
        assert!(f.feed.effective(&id).unwrap().retweeted);
        assert_eq!(f.api.call_count(Endpoint::Retweet), 0);

        let result = InteractionController::send(f.api.as_ref(), "alice1", &toggle).await;
        assert_eq!(f.interactions.resolve(&mut f.feed, &toggle, result), ToggleOutcome::Confirmed);
        assert_eq!(f.feed.effective(&id).unwrap().retweet_count, 1);
    }

    #[tokio::test]
    async fn test_overlapping_toggles_resolve_out_of_order() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "fresh");
        let like = f.interactions.begin_toggle(&mut f.feed, &id, InteractionKind::Like).unwrap();
        let unlike = f.interactions.begin_toggle(&mut f.feed, &id, InteractionKind::Like).unwrap();
        assert!(like.activate);
        assert!(!unlike.activate);

        // The unlike confirms first; the earlier like then fails.
        assert_eq!(f.interactions.resolve(&mut f.feed, &unlike, Ok(())), ToggleOutcome::Confirmed);
        let err = crate::api::ApiError::Network { endpoint: "tweets/like", message: "timeout".to_string() };
        assert_eq!(f.interactions.resolve(&mut f.feed, &like, Err(err)), ToggleOutcome::Superseded);

        let shown = f.feed.effective(&id).unwrap();
        assert!(!shown.liked);
        assert_eq!(shown.like_count, 0);
    }

    #[tokio::test]
    async fn test_delete_reloads_feed_without_post() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "mine");
        f.interactions
            .handle_delete(&mut f.feed, &f.source, "alice1", &id)
            .await
            .unwrap();
        assert!(f.feed.post(&id).is_none());
        assert_eq!(f.feed.all_posts().len(), 2);
        assert_eq!(f.api.call_count(Endpoint::RecentTweets), 2);
    }

    #[tokio::test]
    async fn test_failed_delete_keeps_feed() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "mine");
        f.api.fail(Endpoint::DeleteTweet);
        assert!(f.interactions.handle_delete(&mut f.feed, &f.source, "alice1", &id).await.is_err());
        assert!(f.feed.post(&id).is_some());
    }

    #[tokio::test]
    async fn test_reply_select_scopes_feed() {
        let mut f = fixture().await;
        let root = f.feed.post(&id_of(&f.feed, "fresh")).unwrap().clone();
        assert!(f.interactions.handle_reply_select(&mut f.feed, root.clone()));
        assert!(f.feed.needs_load());
        assert_eq!(f.feed.scope(), Some(&root.post_id));
    }

    #[tokio::test]
    async fn test_reset_ignores_late_responses() {
        let mut f = fixture().await;
        let id = id_of(&f.feed, "fresh");
        let toggle = f.interactions.begin_toggle(&mut f.feed, &id, InteractionKind::Like).unwrap();
        f.interactions.reset();
        f.feed.load(&f.source, "alice1").await;
        let err = crate::api::ApiError::Network { endpoint: "tweets/like", message: "late".to_string() };
        assert_eq!(f.interactions.resolve(&mut f.feed, &toggle, Err(err)), ToggleOutcome::Ignored);
        assert!(!f.feed.effective(&id).unwrap().liked);
    }

    #[test]
    fn test_can_delete_uses_user_id() {
        let session = Session::new("alice1", "alice");
        let mut post = Post {
            post_id: PostId::from(1),
            author_id: "alice1".to_string(),
            author_display_name: "alice".to_string(),
            author_username: Some("alice".to_string()),
            text: String::new(),
            image_url: None,
            posted_at: None,
            like_count: 0,
            retweet_count: 0,
            reply_count: 0,
            liked: false,
            retweeted: false,
        };
        assert!(can_delete(&session, &post));
        post.author_id = "bob1".to_string();
        post.author_display_name = "alice".to_string();
        assert!(!can_delete(&session, &post));
    }
}
