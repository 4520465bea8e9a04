pub mod error;
pub mod memory;
pub mod rest;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use types::{Endpoint, PostId};

use async_trait::async_trait;
use types::{
    CountsResponse, CreateUserRequest, CreateUserResponse, TweetRow, UpdateProfileRequest,
    UserProfileResponse, UserSummary,
};

/// The remote social API. `RestClient` talks HTTP; `MemoryApi` keeps
/// everything in process for offline mode and tests.
#[async_trait]
pub trait SocialApi: Send + Sync {
    /// `scope = None` is the viewer's top-level feed, `Some(id)` the replies to `id`.
    async fn recent_tweets(&self, viewer: &str, scope: Option<&PostId>) -> ApiResult<Vec<TweetRow>>;
    async fn counts(&self, post_ids: &[PostId]) -> ApiResult<CountsResponse>;
    async fn create_tweet(&self, viewer: &str, text: &str, reply_to: Option<&PostId>) -> ApiResult<()>;
    async fn delete_tweet(&self, post_id: &PostId) -> ApiResult<()>;

    async fn like(&self, viewer: &str, post_id: &PostId) -> ApiResult<()>;
    async fn unlike(&self, viewer: &str, post_id: &PostId) -> ApiResult<()>;
    async fn retweet(&self, viewer: &str, post_id: &PostId) -> ApiResult<()>;
    async fn unretweet(&self, viewer: &str, post_id: &PostId) -> ApiResult<()>;

    async fn get_user(&self, viewer: &str, username: &str) -> ApiResult<UserProfileResponse>;
    async fn update_profile(&self, update: &UpdateProfileRequest) -> ApiResult<()>;
    async fn follow(&self, viewer: &str, username: &str) -> ApiResult<()>;
    async fn unfollow(&self, viewer: &str, username: &str) -> ApiResult<()>;
    async fn block(&self, viewer: &str, username: &str) -> ApiResult<()>;
    async fn unblock(&self, viewer: &str, username: &str) -> ApiResult<()>;
    async fn create_user(&self, user: &CreateUserRequest) -> ApiResult<CreateUserResponse>;
    /// Every other user, as `(userid, username)`.
    async fn list_users(&self, viewer: &str) -> ApiResult<Vec<UserSummary>>;
}
