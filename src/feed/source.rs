use super::post::Post;
use crate::api::types::{CountsResponse, TweetRow};
use crate::api::{ApiError, PostId, SocialApi};
use std::collections::HashMap;
use std::sync::Arc;

/// Result of one feed fetch. Keeps "nothing to show" apart from "couldn't fetch".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded(Vec<Post>),
    Empty,
    Failed(ApiError),
}

/// Fetches a page of posts and enriches it with engagement counts.
#[derive(Clone)]
pub struct FeedDataSource {
    api: Arc<dyn SocialApi>,
}

impl FeedDataSource {
    pub fn new(api: Arc<dyn SocialApi>) -> Self {
        Self { api }
    }

    /// `tweets/recent` followed by `tweets/counts` for the returned ids.
    /// Any failure in either call becomes `Failed`; the error is logged here.
    pub async fn fetch_posts(&self, viewer: &str, scope: Option<&PostId>) -> FetchOutcome {
        let rows = match self.api.recent_tweets(viewer, scope).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(error = %e, scope = ?scope.map(PostId::as_str), "recent posts fetch failed");
                return FetchOutcome::Failed(e);
            }
        };
        if rows.is_empty() {
            return FetchOutcome::Empty;
        }

        let ids: Vec<PostId> = rows.iter().map(|r| r.post_id.clone()).collect();
        let counts = match self.api.counts(&ids).await {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, posts = ids.len(), "post counts fetch failed");
                return FetchOutcome::Failed(e);
            }
        };

        let posts = enrich(rows, &counts);
        tracing::debug!(count = posts.len(), scope = ?scope.map(PostId::as_str), "feed fetched");
        FetchOutcome::Loaded(posts)
    }
}

/// Merge counts into rows by post id; missing entries count as zero. Order is preserved.
pub fn enrich(rows: Vec<TweetRow>, counts: &CountsResponse) -> Vec<Post> {
    let likes: HashMap<&PostId, u32> = counts
        .likes
        .iter()
        .map(|c| (&c.originalpost, c.like_count))
        .collect();
    let retweets: HashMap<&PostId, u32> = counts
        .retweets
        .iter()
        .map(|c| (&c.originalpost, c.retweet_count))
        .collect();
    let replies: HashMap<&PostId, u32> = counts
        .comment_counts
        .iter()
        .map(|c| (&c.reply_to_postid, c.comment_count))
        .collect();

    rows.into_iter()
        .map(|row| {
            let mut post = Post::from_row(row);
            post.like_count = likes.get(&post.post_id).copied().unwrap_or(0);
            post.retweet_count = retweets.get(&post.post_id).copied().unwrap_or(0);
            post.reply_count = replies.get(&post.post_id).copied().unwrap_or(0);
            post
        })
        .collect()
}
