use super::error::{ApiError, ApiResult};
use super::types::*;
use super::SocialApi;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// HTTP client for the social API. Every endpoint is a JSON POST.
pub struct RestClient {
    client: Client,
    base_url: String,
}

impl RestClient {
    pub fn new(base_url: &str, timeout: Duration, pool_max_idle_per_host: usize) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(pool_max_idle_per_host)
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// POST `body` and return the raw bytes of a 2xx response.
    async fn post_raw<B: Serialize + ?Sized>(&self, endpoint: Endpoint, body: &B) -> ApiResult<Vec<u8>> {
        let path = endpoint.path();
        let resp = self
            .client
            .post(self.url(endpoint))
            .header(header::CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::Network {
                endpoint: path,
                message: e.to_string(),
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { endpoint: path });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                endpoint: path,
                status: status.as_u16(),
                body,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ApiError::Network {
            endpoint: path,
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    async fn post_json<B, T>(&self, endpoint: Endpoint, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.post_raw(endpoint, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode {
            endpoint: endpoint.path(),
            message: e.to_string(),
        })
    }

    /// POST where only the status matters; the body is discarded.
    async fn post_unit<B: Serialize + ?Sized>(&self, endpoint: Endpoint, body: &B) -> ApiResult<()> {
        self.post_raw(endpoint, body).await?;
        tracing::debug!(endpoint = endpoint.path(), "ok");
        Ok(())
    }

    async fn engagement(&self, endpoint: Endpoint, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        let body = EngagementRequest {
            userid: viewer.to_string(),
            postid: post_id.clone(),
        };
        self.post_unit(endpoint, &body).await
    }
}

/// Ensure the base URL ends with exactly one `/`.
pub fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim().trim_end_matches('/'))
}

#[async_trait]
impl SocialApi for RestClient {
    async fn recent_tweets(&self, viewer: &str, scope: Option<&PostId>) -> ApiResult<Vec<TweetRow>> {
        let body = RecentTweetsRequest {
            userid: viewer.to_string(),
            postid: scope.cloned(),
        };
        self.post_json(Endpoint::RecentTweets, &body).await
    }

    async fn counts(&self, post_ids: &[PostId]) -> ApiResult<CountsResponse> {
        let body = CountsRequest {
            postids: post_ids.to_vec(),
        };
        self.post_json(Endpoint::Counts, &body).await
    }

    async fn create_tweet(&self, viewer: &str, text: &str, reply_to: Option<&PostId>) -> ApiResult<()> {
        let body = CreateTweetRequest {
            userid: viewer.to_string(),
            textcontent: text.to_string(),
            reply_to_postid: reply_to.cloned(),
        };
        self.post_unit(Endpoint::CreateTweet, &body).await
    }

    async fn delete_tweet(&self, post_id: &PostId) -> ApiResult<()> {
        let body = DeleteTweetRequest {
            postid: post_id.clone(),
        };
        self.post_unit(Endpoint::DeleteTweet, &body).await
    }

    async fn like(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.engagement(Endpoint::Like, viewer, post_id).await
    }

    async fn unlike(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.engagement(Endpoint::Unlike, viewer, post_id).await
    }

    async fn retweet(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.engagement(Endpoint::Retweet, viewer, post_id).await
    }

    async fn unretweet(&self, viewer: &str, post_id: &PostId) -> ApiResult<()> {
        self.engagement(Endpoint::Unretweet, viewer, post_id).await
    }

    async fn get_user(&self, viewer: &str, username: &str) -> ApiResult<UserProfileResponse> {
        let body = GetUserRequest {
            current_userid: viewer.to_string(),
            username: username.to_string(),
        };
        self.post_json(Endpoint::GetUser, &body).await
    }

    async fn update_profile(&self, update: &UpdateProfileRequest) -> ApiResult<()> {
        self.post_unit(Endpoint::UpdateProfile, update).await
    }

    async fn follow(&self, viewer: &str, username: &str) -> ApiResult<()> {
        let body = FollowRequest {
            follower: viewer.to_string(),
            followee_username: username.to_string(),
        };
        self.post_unit(Endpoint::Follow, &body).await
    }

    async fn unfollow(&self, viewer: &str, username: &str) -> ApiResult<()> {
        let body = FollowRequest {
            follower: viewer.to_string(),
            followee_username: username.to_string(),
        };
        self.post_unit(Endpoint::Unfollow, &body).await
    }

    async fn block(&self, viewer: &str, username: &str) -> ApiResult<()> {
        let body = BlockRequest {
            blocker: viewer.to_string(),
            blockee_username: username.to_string(),
        };
        self.post_unit(Endpoint::Block, &body).await
    }

    async fn unblock(&self, viewer: &str, username: &str) -> ApiResult<()> {
        let body = BlockRequest {
            blocker: viewer.to_string(),
            blockee_username: username.to_string(),
        };
        self.post_unit(Endpoint::Unblock, &body).await
    }

    async fn create_user(&self, user: &CreateUserRequest) -> ApiResult<CreateUserResponse> {
        self.post_json(Endpoint::CreateUser, user).await
    }

    async fn list_users(&self, viewer: &str) -> ApiResult<Vec<UserSummary>> {
        let body = ListUsersRequest {
            userid: viewer.to_string(),
        };
        self.post_json(Endpoint::ListUsers, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> RestClient {
        RestClient::new(&server.uri(), Duration::from_secs(5), 4).unwrap()
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://api.example.com/prod"), "https://api.example.com/prod/");
        assert_eq!(normalize_base_url("https://api.example.com/prod///"), "https://api.example.com/prod/");
    }

    #[tokio::test]
    async fn test_recent_tweets_posts_json_with_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tweets/recent"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"userid": "alice1", "postid": 42})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"post_id": 43, "userid": "bob1", "username": "bob", "content": "reply", "liked": 0, "retweeted": 1}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rows = client(&server)
            .recent_tweets("alice1", Some(&PostId::from(42)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post_id, PostId::from(43));
        assert!(rows[0].retweeted);
    }

    #[tokio::test]
    async fn test_server_error_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tweets/like"))
            .respond_with(ResponseTemplate::new(500).set_body_string("db down"))
            .mount(&server)
            .await;

        let err = client(&server).like("alice1", &PostId::from(1)).await.unwrap_err();
        assert_eq!(
            err,
            ApiError::Server {
                endpoint: "tweets/like",
                status: 500,
                body: "db down".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_404_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/get-user"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "User not found."})))
            .mount(&server)
            .await;

        let err = client(&server).get_user("alice1", "ghost").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tweets/counts"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).counts(&[PostId::from(1)]).await.unwrap_err();
        assert!(matches!(err, ApiError::Decode { endpoint: "tweets/counts", .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // Bind then drop so the port is closed.
        let uri = {
            let server = MockServer::start().await;
            server.uri()
        };
        let client = RestClient::new(&uri, Duration::from_secs(2), 1).unwrap();
        let err = client.delete_tweet(&PostId::from(1)).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { endpoint: "tweets/delete", .. }));
    }

    #[tokio::test]
    async fn test_list_users_and_create_user_paths_keep_trailing_slash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([["u2", "bob"]])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/users/create/"))
            .and(body_json(json!({"userid": "u1", "username": "alice", "picture": null})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"username": "alice", "picture": null, "bio": ""})))
            .mount(&server)
            .await;

        let api = client(&server);
        let users = api.list_users("u1").await.unwrap();
        assert_eq!(users, vec![UserSummary { userid: "u2".to_string(), username: "bob".to_string() }]);

        let created = api
            .create_user(&CreateUserRequest {
                userid: "u1".to_string(),
                username: "alice".to_string(),
                picture: None,
            })
            .await
            .unwrap();
        assert_eq!(created.username, "alice");
    }
}
