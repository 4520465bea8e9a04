use crate::api::types::TweetRow;
use crate::api::PostId;

/// A post as the feed shows it: the `tweets/recent` row merged with its counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub post_id: PostId,
    pub author_id: String,
    pub author_display_name: String,
    /// The author's username as sent by the server; profiles are keyed by it.
    pub author_username: Option<String>,
    pub text: String,
    pub image_url: Option<String>,
    pub posted_at: Option<String>,
    pub like_count: u32,
    pub retweet_count: u32,
    pub reply_count: u32,
    pub liked: bool,
    pub retweeted: bool,
}

impl Post {
    /// Build from a wire row with zero counts; counts are merged afterwards.
    pub fn from_row(row: TweetRow) -> Self {
        let author_username = row.username.filter(|u| !u.is_empty());
        let author_display_name = author_username.clone().unwrap_or_else(|| row.userid.clone());
        Self {
            post_id: row.post_id,
            author_id: row.userid,
            author_display_name,
            author_username,
            text: row.content.or(row.text).unwrap_or_default(),
            image_url: row.image_url.filter(|u| !u.is_empty()),
            posted_at: row.dateposted,
            like_count: 0,
            retweet_count: 0,
            reply_count: 0,
            liked: row.liked,
            retweeted: row.retweeted,
        }
    }

    /// First letter of the author's name, for the avatar glyph.
    pub fn initial(&self) -> char {
        self.author_display_name
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('?')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    Like,
    Retweet,
}

impl InteractionKind {
    pub fn label(self) -> &'static str {
        match self {
            InteractionKind::Like => "like",
            InteractionKind::Retweet => "retweet",
        }
    }
}

/// Locally-owned interaction state for one post. Shadows the fetched values
/// until the next load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionOverride {
    pub liked: bool,
    pub retweeted: bool,
    pub like_count: u32,
    pub retweet_count: u32,
}

impl InteractionOverride {
    pub fn from_post(post: &Post) -> Self {
        Self {
            liked: post.liked,
            retweeted: post.retweeted,
            like_count: post.like_count,
            retweet_count: post.retweet_count,
        }
    }

    pub fn flag(&self, kind: InteractionKind) -> bool {
        match kind {
            InteractionKind::Like => self.liked,
            InteractionKind::Retweet => self.retweeted,
        }
    }

    pub fn count(&self, kind: InteractionKind) -> u32 {
        match kind {
            InteractionKind::Like => self.like_count,
            InteractionKind::Retweet => self.retweet_count,
        }
    }

    /// Flip the flag for `kind` and shift its count by `delta`, saturating at zero.
    pub fn apply(&mut self, kind: InteractionKind, delta: i32) {
        let (flag, count) = match kind {
            InteractionKind::Like => (&mut self.liked, &mut self.like_count),
            InteractionKind::Retweet => (&mut self.retweeted, &mut self.retweet_count),
        };
        *flag = !*flag;
        *count = count.saturating_add_signed(delta);
    }

    /// Copy the `kind` fields from `other`, leaving the other kind untouched.
    pub fn restore(&mut self, kind: InteractionKind, other: &InteractionOverride) {
        match kind {
            InteractionKind::Like => {
                self.liked = other.liked;
                self.like_count = other.like_count;
            }
            InteractionKind::Retweet => {
                self.retweeted = other.retweeted;
                self.retweet_count = other.retweet_count;
            }
        }
    }
}
