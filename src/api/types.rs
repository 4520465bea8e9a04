use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Server-assigned post identifier. The backend emits these as integers in
/// some responses and strings in others; both forms compare equal here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostId(String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PostId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl From<&str> for PostId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Serialize for PostId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // Canonical integers go back out as numbers so the SQL side sees its own
        // type; anything else ("007", "+5") is sent verbatim.
        match self.0.parse::<i64>() {
            Ok(n) if n.to_string() == self.0 => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for PostId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => PostId(n.to_string()),
            Raw::Text(s) => PostId(s),
        })
    }
}

/// Accepts `true`/`false`, `0`/`1`, `"0"`/`"1"`, `"true"`, or a missing/null value.
pub fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => false,
        Some(serde_json::Value::Bool(b)) => b,
        Some(serde_json::Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            match s.parse::<f64>() {
                Ok(f) => f != 0.0,
                Err(_) => s.eq_ignore_ascii_case("true"),
            }
        }
        Some(_) => false,
    })
}

/// Every endpoint the client talks to. Paths are relative to the base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    RecentTweets,
    Counts,
    CreateTweet,
    DeleteTweet,
    Like,
    Unlike,
    Retweet,
    Unretweet,
    GetUser,
    UpdateProfile,
    Follow,
    Unfollow,
    Block,
    Unblock,
    CreateUser,
    ListUsers,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::RecentTweets => "tweets/recent",
            Endpoint::Counts => "tweets/counts",
            Endpoint::CreateTweet => "tweets/create",
            Endpoint::DeleteTweet => "tweets/delete",
            Endpoint::Like => "tweets/like",
            Endpoint::Unlike => "tweets/unlike",
            Endpoint::Retweet => "tweets/retweet",
            Endpoint::Unretweet => "tweets/unretweet",
            Endpoint::GetUser => "users/get-user",
            Endpoint::UpdateProfile => "users/update-profile",
            Endpoint::Follow => "users/follow",
            Endpoint::Unfollow => "users/unfollow",
            Endpoint::Block => "users/block",
            Endpoint::Unblock => "users/unblock",
            Endpoint::CreateUser => "users/create/",
            Endpoint::ListUsers => "users/",
        }
    }
}

// --- tweets ---

#[derive(Debug, Clone, Serialize)]
pub struct RecentTweetsRequest {
    pub userid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postid: Option<PostId>,
}

/// One row of `tweets/recent`.
#[derive(Debug, Clone, Deserialize)]
pub struct TweetRow {
    pub post_id: PostId,
    pub userid: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub dateposted: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub liked: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub retweeted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountsRequest {
    pub postids: Vec<PostId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountsResponse {
    #[serde(default)]
    pub likes: Vec<LikeCount>,
    #[serde(default)]
    pub retweets: Vec<RetweetCount>,
    #[serde(default)]
    pub comment_counts: Vec<CommentCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeCount {
    pub originalpost: PostId,
    pub like_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetweetCount {
    pub originalpost: PostId,
    pub retweet_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentCount {
    pub reply_to_postid: PostId,
    pub comment_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateTweetRequest {
    pub userid: String,
    pub textcontent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_postid: Option<PostId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteTweetRequest {
    pub postid: PostId,
}

/// Body shared by like/unlike/retweet/unretweet.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementRequest {
    pub userid: String,
    pub postid: PostId,
}

// --- users ---

#[derive(Debug, Clone, Serialize)]
pub struct GetUserRequest {
    pub current_userid: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfileResponse {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_following: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub is_blocked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateProfileRequest {
    pub userid: String,
    pub username: String,
    pub bio: String,
    pub picture: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowRequest {
    pub follower: String,
    pub followee_username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockRequest {
    pub blocker: String,
    pub blockee_username: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    pub userid: String,
    pub username: String,
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserResponse {
    pub username: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListUsersRequest {
    pub userid: String,
}

/// `users/` returns `[userid, username]` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String)")]
pub struct UserSummary {
    pub userid: String,
    pub username: String,
}

impl From<(String, String)> for UserSummary {
    fn from((userid, username): (String, String)) -> Self {
        Self { userid, username }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_id_accepts_number_and_string() {
        let a: PostId = serde_json::from_str("123").unwrap();
        let b: PostId = serde_json::from_str("\"123\"").unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_string(&a).unwrap(), "123");

        let c: PostId = serde_json::from_str("\"abc-1\"").unwrap();
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"abc-1\"");
    }

    #[test]
    fn test_non_canonical_numeric_ids_stay_strings() {
        for raw in ["007", "+5", "-0"] {
            let id = PostId::from(raw);
            assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", raw));
        }
        assert_eq!(serde_json::to_string(&PostId::from("-12")).unwrap(), "-12");
    }

    #[test]
    fn test_tweet_row_flag_variants() {
        let rows: Vec<TweetRow> = serde_json::from_str(
            r#"[
                {"post_id": 1, "userid": "u1", "content": "a", "liked": 1, "retweeted": "0"},
                {"post_id": "2", "userid": "u2", "text": "b", "liked": true},
                {"post_id": 3, "userid": "u3", "liked": null, "retweeted": "1"}
            ]"#,
        )
        .unwrap();
        assert!(rows[0].liked);
        assert!(!rows[0].retweeted);
        assert!(rows[1].liked);
        assert!(!rows[1].retweeted);
        assert!(!rows[2].liked);
        assert!(rows[2].retweeted);
    }

    #[test]
    fn test_counts_response_tolerates_missing_sections() {
        let counts: CountsResponse =
            serde_json::from_str(r#"{"likes": [{"originalpost": "7", "like_count": 3}]}"#).unwrap();
        assert_eq!(counts.likes.len(), 1);
        assert_eq!(counts.likes[0].originalpost, PostId::from(7));
        assert!(counts.retweets.is_empty());
        assert!(counts.comment_counts.is_empty());
    }

    #[test]
    fn test_user_summary_from_pair() {
        let users: Vec<UserSummary> =
            serde_json::from_str(r#"[["jane456", "jane_smith"], ["sam789", "sam_wilson"]]"#).unwrap();
        assert_eq!(users[1].username, "sam_wilson");
        assert_eq!(users[0].userid, "jane456");
    }

    #[test]
    fn test_recent_request_omits_absent_scope() {
        let top = RecentTweetsRequest { userid: "u".to_string(), postid: None };
        assert_eq!(serde_json::to_string(&top).unwrap(), r#"{"userid":"u"}"#);
        let scoped = RecentTweetsRequest { userid: "u".to_string(), postid: Some(PostId::from(9)) };
        assert_eq!(serde_json::to_string(&scoped).unwrap(), r#"{"userid":"u","postid":9}"#);
    }
}
