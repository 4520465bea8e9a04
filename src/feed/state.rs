//! Feed contents, the growing visible window, and the load state machine.

use super::post::{InteractionKind, InteractionOverride, Post};
use super::source::{FeedDataSource, FetchOutcome};
use crate::api::PostId;
use std::collections::HashMap;

/// Posts revealed per window growth.
pub const CHUNK_SIZE: usize = 10;

/// Where the feed is in its fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

/// Issued by `begin_load`; only the ticket with the latest sequence number
/// may complete a load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
    scope: Option<PostId>,
}

impl LoadTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn scope(&self) -> Option<&PostId> {
        self.scope.as_ref()
    }
}

/// Pre-mutation state returned by `apply_optimistic`, for `rollback`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionSnapshot {
    pub post_id: PostId,
    pub kind: InteractionKind,
    pub before: InteractionOverride,
}

/// The fetched feed, its visible window, and local interaction overrides.
///
/// `visible()` is always the first `visible_len` posts of `all_posts()` in
/// server order. The window only grows between loads; a load resets it to
/// one chunk.
#[derive(Debug, Clone)]
pub struct FeedState {
    chunk_size: usize,
    all_posts: Vec<Post>,
    visible_len: usize,
    overrides: HashMap<PostId, InteractionOverride>,
    root_post: Option<Post>,
    phase: LoadPhase,
    load_pending: bool,
    latest_seq: u64,
}

impl Default for FeedState {
    fn default() -> Self {
        Self::new(CHUNK_SIZE)
    }
}

impl FeedState {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            all_posts: Vec::new(),
            visible_len: 0,
            overrides: HashMap::new(),
            root_post: None,
            phase: LoadPhase::Idle,
            load_pending: true,
            latest_seq: 0,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn all_posts(&self) -> &[Post] {
        &self.all_posts
    }

    pub fn visible(&self) -> &[Post] {
        &self.all_posts[..self.visible_len]
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }

    pub fn root_post(&self) -> Option<&Post> {
        self.root_post.as_ref()
    }

    /// Post id the feed is scoped to, if any.
    pub fn scope(&self) -> Option<&PostId> {
        self.root_post.as_ref().map(|p| &p.post_id)
    }

    pub fn post(&self, post_id: &PostId) -> Option<&Post> {
        self.all_posts.iter().find(|p| &p.post_id == post_id)
    }

    // --- load triggers ---

    /// Scope the feed to replies of `post`. Returns false if it was already the root.
    pub fn select_root(&mut self, post: Post) -> bool {
        if self.scope() == Some(&post.post_id) {
            return false;
        }
        tracing::debug!(post_id = %post.post_id, "root post selected");
        self.root_post = Some(post);
        self.load_pending = true;
        true
    }

    /// Back to the top-level feed. Returns false if no root was selected.
    pub fn clear_root(&mut self) -> bool {
        if self.root_post.take().is_none() {
            return false;
        }
        tracing::debug!("root post cleared");
        self.load_pending = true;
        true
    }

    /// Raised after an external mutation (post created or deleted).
    pub fn request_reload(&mut self) {
        self.load_pending = true;
    }

    pub fn needs_load(&self) -> bool {
        self.load_pending
    }

    // --- load cycle ---

    /// Enter `Loading` for the current scope. Any earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.latest_seq += 1;
        self.load_pending = false;
        self.phase = LoadPhase::Loading;
        LoadTicket {
            seq: self.latest_seq,
            scope: self.scope().cloned(),
        }
    }

    /// Apply a fetch result. Returns false and changes nothing when the ticket
    /// has been superseded by a later `begin_load`.
    pub fn finish_load(&mut self, ticket: LoadTicket, outcome: FetchOutcome) -> bool {
        if ticket.seq != self.latest_seq {
            tracing::debug!(seq = ticket.seq, latest = self.latest_seq, "discarding stale feed response");
            return false;
        }
        match outcome {
            FetchOutcome::Loaded(posts) => {
                self.replace_posts(posts);
                self.phase = LoadPhase::Loaded;
            }
            FetchOutcome::Empty => {
                self.replace_posts(Vec::new());
                self.phase = LoadPhase::Loaded;
            }
            FetchOutcome::Failed(e) => {
                self.replace_posts(Vec::new());
                self.phase = LoadPhase::Failed(e.to_string());
            }
        }
        true
    }

    /// Fetch and apply in one step.
    pub async fn load(&mut self, source: &FeedDataSource, viewer: &str) -> bool {
        let ticket = self.begin_load();
        let outcome = source.fetch_posts(viewer, ticket.scope()).await;
        self.finish_load(ticket, outcome)
    }

    fn replace_posts(&mut self, posts: Vec<Post>) {
        self.overrides = posts
            .iter()
            .map(|p| (p.post_id.clone(), InteractionOverride::from_post(p)))
            .collect();
        self.visible_len = posts.len().min(self.chunk_size);
        self.all_posts = posts;
    }

    // --- window ---

    /// Reveal up to one more chunk. Returns how many posts were added.
    pub fn grow_window(&mut self) -> usize {
        let next = (self.visible_len + self.chunk_size).min(self.all_posts.len());
        let added = next - self.visible_len;
        self.visible_len = next;
        added
    }

    pub fn is_fully_grown(&self) -> bool {
        self.visible_len == self.all_posts.len()
    }

    pub fn shows_end_marker(&self) -> bool {
        self.phase == LoadPhase::Loaded && self.is_fully_grown() && !self.all_posts.is_empty()
    }

    // --- interaction overrides ---

    pub fn effective(&self, post_id: &PostId) -> Option<InteractionOverride> {
        self.overrides
            .get(post_id)
            .copied()
            .or_else(|| self.post(post_id).map(InteractionOverride::from_post))
    }

    /// The post with its override applied, for display.
    pub fn effective_post(&self, post: &Post) -> Post {
        let mut shown = post.clone();
        if let Some(o) = self.overrides.get(&post.post_id) {
            shown.liked = o.liked;
            shown.retweeted = o.retweeted;
            shown.like_count = o.like_count;
            shown.retweet_count = o.retweet_count;
        }
        shown
    }

    /// Flip `kind` on `post_id` and shift its count by `delta`. Returns the
    /// state from before the change, or `None` for a post not in the feed.
    pub fn apply_optimistic(&mut self, post_id: &PostId, kind: InteractionKind, delta: i32) -> Option<InteractionSnapshot> {
        let before = self.effective(post_id)?;
        let mut after = before;
        after.apply(kind, delta);
        self.overrides.insert(post_id.clone(), after);
        Some(InteractionSnapshot {
            post_id: post_id.clone(),
            kind,
            before,
        })
    }

    /// Put the `snapshot.kind` fields back to their pre-mutation values.
    pub fn rollback(&mut self, snapshot: &InteractionSnapshot) {
        if let Some(current) = self.overrides.get_mut(&snapshot.post_id) {
            current.restore(snapshot.kind, &snapshot.before);
        }
    }
}
