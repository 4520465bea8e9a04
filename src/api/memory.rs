//! In-process backend used for offline mode and tests.

use super::error::{ApiError, ApiResult};
use super::types::*;
use super::SocialApi;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const MAX_POST_CHARS: usize = 500;
const RECENT_LIMIT: usize = 500;

#[derive(Debug, Clone)]
struct UserRecord {
    userid: String,
    username: String,
    bio: String,
    picture: Option<String>,
}

#[derive(Debug, Clone)]
struct StoredPost {
    id: PostId,
    author: String,
    posted_at: String,
    text: String,
    image_url: Option<String>,
    reply_to: Option<PostId>,
}

#[derive(Default)]
struct Store {
    users: Vec<UserRecord>,
    /// Oldest first; the feed reads it back to front.
    posts: Vec<StoredPost>,
    likes: HashSet<(String, PostId)>,
    retweets: HashSet<(String, PostId)>,
    /// (follower userid, followee userid)
    follows: HashSet<(String, String)>,
    /// (blocker userid, blockee userid)
    blocks: HashSet<(String, String)>,
    next_post: u64,
    clock: u64,
    failing: HashSet<Endpoint>,
    calls: Vec<Endpoint>,
}

impl Store {
    fn user_by_name(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }

    fn user_by_id(&self, userid: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.userid == userid)
    }

    fn tick(&mut self) -> String {
        self.clock += 1;
        let ts = chrono::DateTime::from_timestamp(1_700_000_000 + self.clock as i64 * 60, 0)
            .unwrap_or_default();
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }

    fn insert_post(&mut self, author: &str, text: &str, reply_to: Option<PostId>, image_url: Option<String>) -> PostId {
        self.next_post += 1;
        let id = PostId::from(self.next_post);
        let posted_at = self.tick();
        self.posts.push(StoredPost {
            id: id.clone(),
            author: author.to_string(),
            posted_at,
            text: text.to_string(),
            image_url,
            reply_to,
        });
        id
    }

    fn has_post(&self, id: &PostId) -> bool {
        self.posts.iter().any(|p| &p.id == id)
    }
}

/// In-process implementation of the social API.
///
/// Mirrors the server's observable behavior closely enough to drive the
/// client offline: the top-level feed holds the viewer's own posts plus those
/// of accounts they follow (minus blocked accounts), newest first; a scoped
/// feed holds the replies to one post. Individual endpoints can be switched
/// into failure mode to exercise rollback and degraded paths.
pub struct MemoryApi {
    store: Mutex<Store>,
    latency: Duration,
    rng: Mutex<StdRng>,
}

impl Default for MemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryApi {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
            latency: Duration::ZERO,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Delay every call by `latency` plus up to half again, so loading states
    /// are visible and overlapping calls can complete out of order.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        // A poisoned store only means a panicking test thread; the data is still usable.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_user(&self, userid: &str, username: &str) {
        let mut store = self.lock();
        if store.user_by_id(userid).is_none() {
            store.users.push(UserRecord {
                userid: userid.to_string(),
                username: username.to_string(),
                bio: String::new(),
                picture: None,
            });
        }
    }

    pub fn set_bio(&self, userid: &str, bio: &str) {
        let mut store = self.lock();
        if let Some(user) = store.users.iter_mut().find(|u| u.userid == userid) {
            user.bio = bio.to_string();
        }
    }

    pub fn add_post(&self, author: &str, text: &str) -> PostId {
        self.lock().insert_post(author, text, None, None)
    }

    pub fn add_post_with_image(&self, author: &str, text: &str, image_url: &str) -> PostId {
        self.lock().insert_post(author, text, None, Some(image_url.to_string()))
    }

    pub fn add_reply(&self, author: &str, parent: &PostId, text: &str) -> PostId {
        self.lock().insert_post(author, text, Some(parent.clone()), None)
    }

    pub fn add_follow(&self, follower: &str, followee: &str) {
        self.lock()
            .follows
            .insert((follower.to_string(), followee.to_string()));
    }

    pub fn add_like(&self, userid: &str, post_id: &PostId) {
        self.lock().likes.insert((userid.to_string(), post_id.clone()));
    }

    /// Make every call to `endpoint` fail with a network error until `recover`.
    pub fn fail(&self, endpoint: Endpoint) {
        self.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.lock().failing.remove(&endpoint);
    }

    /// Endpoints called so far, in order (including failed calls).
    pub fn calls(&self) -> Vec<Endpoint> {
        self.lock().calls.clone()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.lock().calls.iter().filter(|e| **e == endpoint).count()
    }

    pub fn post_ids(&self) -> Vec<PostId> {
        self.lock().posts.iter().map(|p| p.id.clone()).collect()
    }

    pub fn is_liked(&self, userid: &str, post_id: &PostId) -> bool {
        self.lock().likes.contains(&(userid.to_string(), post_id.clone()))
    }

    /// Seed a small world around `viewer` for offline mode.
    pub fn demo(viewer_id: &str, viewer_name: &str) -> Self {
        let api = Self::new();
        api.add_user(viewer_id, viewer_name);
        api.add_user("john123", "john_doe");
        api.add_user("jane456", "jane_smith");
        api.add_user("sam789", "sam_wilson");
        api.set_bio("john123", "Loves coding and coffee.");
        api.set_bio("jane456", "Frontend developer and cat lover.");
        api.set_bio("sam789", "Enjoys hiking and backend development.");
        api.add_follow(viewer_id, "john123");
        api.add_follow(viewer_id, "jane456");

        let lines = [
            ("john123", "Shipped the new build pipeline today."),
            ("jane456", "Cats > dogs. Fight me."),
            ("john123", "Coffee number three. Send help."),
            ("jane456", "Flexbox finally makes sense."),
            ("sam789", "Trail was muddy but worth it."),
            (viewer_id, "Hello from the terminal!"),
            ("john123", "Reading about borrow checkers at midnight."),
            ("jane456", "Who else is refactoring on a Friday?"),
        ];
        let mut first = None;
        for round in 0..3 {
            for (author, text) in lines {
                let text = if round == 0 { text.to_string() } else { format!("{} (#{})", text, round + 1) };
                let id = api.add_post(author, &text);
                first.get_or_insert(id);
            }
        }
        if let Some(root) = first {
            api.add_reply("jane456", &root, "Congrats!");
            api.add_reply(viewer_id, &root, "Nice work.");
            api.add_like("jane456", &root);
        }
        api.add_post_with_image("jane456", "Look at this view", "https://example.com/view.png");
        api
    }

    fn delay(&self) -> Duration {
        if self.latency.is_zero() {
            return Duration::ZERO;
        }
        let spread = self.latency.as_millis() as u64 / 2;
        let extra = self.rng.lock().unwrap_or_else(|e| e.into_inner()).gen_range(0..=spread);
        self.latency + Duration::from_millis(extra)
    }

    /// Record the call, apply latency, and fail if the endpoint is switched off.
    async fn enter(&self, endpoint: Endpoint) -> ApiResult<()> {
        let delay = self.delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut store = self.lock();
        store.calls.push(endpoint);
        if store.failing.contains(&endpoint) {
            return Err(ApiError::Network {
                endpoint: endpoint.path(),
                message: "simulated network failure".to_string(),
            });
        }
        Ok(())
    }
}

fn bad_request(endpoint: Endpoint, message: &str) -> ApiError {
    ApiError::Server {
        endpoint: endpoint.path(),
        status: 400,
        body: message.to_string(),
    }
}

#[async_trait]
impl SocialApi for MemoryApi {
    async fn recent_tweets(&self, viewer: &str, scope: Option<&PostId>) -> ApiResult<Vec<TweetRow>> {
        self.enter(Endpoint::RecentTweets).await?;
        let store = self.lock();
        let rows = store
            .posts
            .iter()
            .rev()
            .filter(|p| match scope {
                Some(root) => p.reply_to.as_ref() == Some(root),
                None => {
                    p.reply_to.is_none()
                        && (p.author == viewer
                            || store.follows.contains(&(viewer.to_string(), p.author.clone())))
                }
            })
            .filter(|p| !store.blocks.contains(&(viewer.to_string(), p.author.clone())))
            .take(RECENT_LIMIT)
            .map(|p| TweetRow {
                post_id: p.id.clone(),
                userid: p.author.clone(),
                username: store.user_by_id(&p.author).map(|u| u.username.clone()),
                dateposted: Some(p.posted_at.clone()),
                content: Some(p.text.clone()),
                text: None,
                image_url: p.image_url.clone(),
                liked: store.likes.contains(&(viewer.to_string(), p.id.clone())),
                retweeted: store.retweets.contains(&(viewer.to_string(), p.id.clone())),
            })
            .collect();
        Ok(rows)
    }

    async fn counts(&self, post_ids: &[PostId]) -> ApiResult<CountsResponse> {
        self.enter(Endpoint::Counts).await?;
        let store = self.lock();
        let wanted: HashSet<&PostId> = post_ids.iter().collect();

        let mut likes: HashMap<PostId, u32> = HashMap::new();
        for (_, id) in store.likes.iter().filter(|(_, id)| wanted.contains(id)) {
            *likes.entry(id.clone()).or_default() += 1;
        }
        let mut retweets: HashMap<PostId, u32> = HashMap::new();
        for (_, id) in store.retweets.iter().filter(|(_, id)| wanted.contains(id)) {
            *retweets.entry(id.clone()).or_default() += 1;
        }
        let mut replies: HashMap<PostId, u32> = HashMap::new();
        for parent in store.posts.iter().filter_map(|p| p.reply_to.as_ref()) {
            if wanted.contains(parent) {
                *replies.entry(parent.clone()).or_default() += 1;
            }
        }

        Ok(CountsResponse {
            likes: likes
                .into_iter()
                .map(|(originalpost, like_count)| LikeCount { originalpost, like_count })
                .collect(),
            retweets: retweets
                .into_iter()
                .map(|(originalpost, retweet_count)| RetweetCount { originalpost, retweet_count })
                .collect(),
            comment_counts: replies
                .into_iter()
                .map(|(reply_to_postid, comment_count)| CommentCount { reply_to_postid, comment_count })
                .collect(),
        })
    }

    async fn create_tweet(&self, viewer: &str, text: &str, reply_to: Option<&PostId>) -> ApiResult<()> {
        self.enter(Endpoint::CreateTweet).await?;
        if text.chars().count() > MAX_POST_CHARS {
            return Err(bad_request(Endpoint::CreateTweet, "Text content exceeds 500 characters."));
        }
        let mut store = self.lock();
        if let Some(parent) = reply_to {
            if !store.has_post(parent) {
                return Err(ApiError::NotFound { endpoint: Endpoint::CreateTweet.path() });
            }
        }
        store.insert_post(viewer, text, reply_to.cloned(), None);
        Ok(())
    }

    async fn delete_tweet(&self, post_id: &PostId) -> ApiResult<()> {
        self.enter(Endpoint::DeleteTweet).await?;
        let mut store = self.lock();
        if !store.has_post(post_id) {
            return Err(ApiError::NotFound { endpoint: Endpoint::DeleteTweet.path() });
        }
        store.posts.retain(|p| &p.id != post_id);
        store.likes.retain(|(_, id)| id != post_id);
        store.retweets.retain(|(_, id)| id != post_id);
        Ok(())
    }

    async fn like(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.enter(Endpoint::Like).await?;
        let mut store = self.lock();
        if !store.has_post(post_id) {
            return Err(ApiError::NotFound { endpoint: Endpoint::Like.path() });
        }
        if !store.likes.insert((viewer.to_string(), post_id.clone())) {
            return Err(bad_request(Endpoint::Like, "Post already liked."));
        }
        Ok(())
    }

    async fn unlike(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.enter(Endpoint::Unlike).await?;
        self.lock().likes.remove(&(viewer.to_string(), post_id.clone()));
        Ok(())
    }

    async fn retweet(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.enter(Endpoint::Retweet).await?;
        let mut store = self.lock();
        if !store.has_post(post_id) {
            return Err(ApiError::NotFound { endpoint: Endpoint::Retweet.path() });
        }
        if !store.retweets.insert((viewer.to_string(), post_id.clone())) {
            return Err(bad_request(Endpoint::Retweet, "Post already retweeted."));
        }
        Ok(())
    }

    async fn unretweet(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.enter(Endpoint::Unretweet).await?;
        self.lock().retweets.remove(&(viewer.to_string(), post_id.clone()));
        Ok(())
    }

    async fn get_user(&self, viewer: &str, username: &str) -> ApiResult<UserProfileResponse> {
        self.enter(Endpoint::GetUser).await?;
        let store = self.lock();
        let user = store
            .user_by_name(username)
            .ok_or(ApiError::NotFound { endpoint: Endpoint::GetUser.path() })?;
        Ok(UserProfileResponse {
            bio: Some(user.bio.clone()),
            picture: user.picture.clone(),
            is_following: store.follows.contains(&(viewer.to_string(), user.userid.clone())),
            is_blocked: store.blocks.contains(&(viewer.to_string(), user.userid.clone())),
        })
    }

    async fn update_profile(&self, update: &UpdateProfileRequest) -> ApiResult<()> {
        self.enter(Endpoint::UpdateProfile).await?;
        let mut store = self.lock();
        let taken = store
            .users
            .iter()
            .any(|u| u.username == update.username && u.userid != update.userid);
        if taken {
            return Err(bad_request(Endpoint::UpdateProfile, "Username already taken."));
        }
        let user = store
            .users
            .iter_mut()
            .find(|u| u.userid == update.userid)
            .ok_or(ApiError::NotFound { endpoint: Endpoint::UpdateProfile.path() })?;
        user.username = update.username.clone();
        user.bio = update.bio.clone();
        user.picture = Some(update.picture.clone()).filter(|p| !p.is_empty());
        Ok(())
    }

    async fn follow(&self, viewer: &str, username: &str) -> ApiResult<()> {
        self.enter(Endpoint::Follow).await?;
        let mut store = self.lock();
        let target = store
            .user_by_name(username)
            .map(|u| u.userid.clone())
            .ok_or(ApiError::NotFound { endpoint: Endpoint::Follow.path() })?;
        if target == viewer {
            return Err(bad_request(Endpoint::Follow, "Users cannot follow themselves."));
        }
        if store.blocks.contains(&(target.clone(), viewer.to_string())) {
            return Err(ApiError::Server {
                endpoint: Endpoint::Follow.path(),
                status: 403,
                body: "You are blocked by this user.".to_string(),
            });
        }
        store.follows.insert((viewer.to_string(), target));
        Ok(())
    }

    async fn unfollow(&self, viewer: &str, username: &str) -> ApiResult<()> {
        self.enter(Endpoint::Unfollow).await?;
        let mut store = self.lock();
        let target = store
            .user_by_name(username)
            .map(|u| u.userid.clone())
            .ok_or(ApiError::NotFound { endpoint: Endpoint::Unfollow.path() })?;
        store.follows.remove(&(viewer.to_string(), target));
        Ok(())
    }

    async fn block(&self, viewer: &str, username: &str) -> ApiResult<()> {
        self.enter(Endpoint::Block).await?;
        let mut store = self.lock();
        let target = store
            .user_by_name(username)
            .map(|u| u.userid.clone())
            .ok_or(ApiError::NotFound { endpoint: Endpoint::Block.path() })?;
        if target == viewer {
            return Err(bad_request(Endpoint::Block, "Users cannot block themselves."));
        }
        store.follows.remove(&(viewer.to_string(), target.clone()));
        store.blocks.insert((viewer.to_string(), target));
        Ok(())
    }

    async fn unblock(&self, viewer: &str, username: &str) -> ApiResult<()> {
        self.enter(Endpoint::Unblock).await?;
        let mut store = self.lock();
        let target = store
            .user_by_name(username)
            .map(|u| u.userid.clone())
            .ok_or(ApiError::NotFound { endpoint: Endpoint::Unblock.path() })?;
        store.blocks.remove(&(viewer.to_string(), target));
        Ok(())
    }

    async fn create_user(&self, user: &CreateUserRequest) -> ApiResult<CreateUserResponse> {
        self.enter(Endpoint::CreateUser).await?;
        let mut store = self.lock();
        if store.user_by_id(&user.userid).is_none() {
            store.users.push(UserRecord {
                userid: user.userid.clone(),
                username: user.username.clone(),
                bio: String::new(),
                picture: user.picture.clone(),
            });
        }
        let record = store
            .user_by_id(&user.userid)
            .ok_or(ApiError::NotFound { endpoint: Endpoint::CreateUser.path() })?;
        Ok(CreateUserResponse {
            username: record.username.clone(),
            picture: record.picture.clone(),
            bio: Some(record.bio.clone()),
        })
    }

    async fn list_users(&self, viewer: &str) -> ApiResult<Vec<UserSummary>> {
        self.enter(Endpoint::ListUsers).await?;
        let store = self.lock();
        Ok(store
            .users
            .iter()
            .filter(|u| u.userid != viewer)
            .map(|u| UserSummary {
                userid: u.userid.clone(),
                username: u.username.clone(),
            })
            .collect())
    }
}
