//! Reqwest implementation of the Helix API seam.
//!
//! Maps per-endpoint HTTP rejections into the structured
//! [`HelixError`] kinds the dispatcher knows how to phrase.

use super::{AnnouncementColor, BanRequest, ChannelUser, HelixUser, StreamInfo, TwitchApi};
use crate::error::{ApiError, ApiResult, HelixError};
use crate::ident::{UserId, UserName};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://api.twitch.tv/helix";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const PAGE_SIZE: &str = "100";

/// Helix REST client.
pub struct HelixClient {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    token: String,
}

/// Endpoint family, used to disambiguate status-code mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Users,
    Moderators,
    Vips,
    Bans,
    Whispers,
    Announcements,
    Streams,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Vec<T>,
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Deserialize)]
struct Pagination {
    cursor: Option<String>,
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    message: Option<String>,
}

impl HelixClient {
    /// Create a client against the production Helix endpoint.
    pub fn new(client_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self::with_base_url(client_id, token, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL (tests, proxies).
    pub fn with_base_url(
        client_id: impl Into<String>,
        token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            token: token.into(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Client-Id", &self.client_id)
    }

    /// Execute a request and turn a non-2xx response into a classified
    /// [`ApiError::Helix`].
    async fn execute(&self, endpoint: Endpoint, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = strip_query(response.url().as_str());
        let message = response
            .json::<ErrorBody>()
            .await
            .unwrap_or_default()
            .message
            .filter(|m| !m.is_empty());
        let kind = classify(endpoint, status, message.as_deref());
        debug!(%url, status = status.as_u16(), ?kind, "helix request rejected");
        Err(ApiError::Helix {
            kind,
            status: status.as_u16(),
            url,
            message,
        })
    }

    async fn fetch_page<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        query: &[(&str, &str)],
        cursor: Option<&str>,
    ) -> ApiResult<Envelope<T>> {
        let mut request = self
            .request(Method::GET, path)
            .query(query)
            .query(&[("first", PAGE_SIZE)]);
        if let Some(cursor) = cursor {
            request = request.query(&[("after", cursor)]);
        }
        let response = self.execute(endpoint, request).await?;
        Ok(response.json::<Envelope<T>>().await?)
    }

    /// Follow pagination cursors until the listing is exhausted.
    async fn fetch_all<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        path: &str,
        query: &[(&str, &str)],
    ) -> ApiResult<Vec<T>> {
        let mut results = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: Envelope<T> = self
                .fetch_page(endpoint, path, query, cursor.as_deref())
                .await?;
            results.extend(page.data);
            cursor = page.pagination.and_then(|p| p.cursor).filter(|c| !c.is_empty());
            if cursor.is_none() {
                return Ok(results);
            }
        }
    }
}

#[async_trait]
impl TwitchApi for HelixClient {
    async fn get_user_by_name(&self, name: &UserName) -> ApiResult<HelixUser> {
        let request = self
            .request(Method::GET, "users")
            .query(&[("login", name.as_str())]);
        let response = self.execute(Endpoint::Users, request).await?;
        let url = strip_query(response.url().as_str());
        let mut envelope = response.json::<Envelope<HelixUser>>().await?;
        match envelope.data.pop() {
            Some(user) => Ok(user),
            // Helix answers 200 with an empty list for unknown logins.
            None => Err(ApiError::Helix {
                kind: HelixError::Unknown,
                status: 404,
                url,
                message: Some(format!("user {name} not found")),
            }),
        }
    }

    async fn get_users_by_names(&self, names: &[UserName]) -> ApiResult<Vec<HelixUser>> {
        let mut users = Vec::with_capacity(names.len());
        for chunk in names.chunks(100) {
            let query: Vec<(&str, &str)> =
                chunk.iter().map(|name| ("login", name.as_str())).collect();
            let request = self.request(Method::GET, "users").query(&query);
            let response = self.execute(Endpoint::Users, request).await?;
            users.extend(response.json::<Envelope<HelixUser>>().await?.data);
        }
        Ok(users)
    }

    async fn get_moderators(&self, broadcaster: &UserId) -> ApiResult<Vec<ChannelUser>> {
        self.fetch_all(
            Endpoint::Moderators,
            "moderation/moderators",
            &[("broadcaster_id", broadcaster.as_str())],
        )
        .await
    }

    async fn add_moderator(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()> {
        let request = self
            .request(Method::POST, "moderation/moderators")
            .query(&[
                ("broadcaster_id", broadcaster.as_str()),
                ("user_id", user.as_str()),
            ]);
        self.execute(Endpoint::Moderators, request).await?;
        Ok(())
    }

    async fn remove_moderator(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()> {
        let request = self
            .request(Method::DELETE, "moderation/moderators")
            .query(&[
                ("broadcaster_id", broadcaster.as_str()),
                ("user_id", user.as_str()),
            ]);
        self.execute(Endpoint::Moderators, request).await?;
        Ok(())
    }

    async fn get_vips(&self, broadcaster: &UserId) -> ApiResult<Vec<ChannelUser>> {
        self.fetch_all(
            Endpoint::Vips,
            "channels/vips",
            &[("broadcaster_id", broadcaster.as_str())],
        )
        .await
    }

    async fn add_vip(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()> {
        let request = self.request(Method::POST, "channels/vips").query(&[
            ("broadcaster_id", broadcaster.as_str()),
            ("user_id", user.as_str()),
        ]);
        self.execute(Endpoint::Vips, request).await?;
        Ok(())
    }

    async fn remove_vip(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()> {
        let request = self.request(Method::DELETE, "channels/vips").query(&[
            ("broadcaster_id", broadcaster.as_str()),
            ("user_id", user.as_str()),
        ]);
        self.execute(Endpoint::Vips, request).await?;
        Ok(())
    }

    async fn ban_user(
        &self,
        broadcaster: &UserId,
        moderator: &UserId,
        request: &BanRequest,
    ) -> ApiResult<()> {
        let request = self
            .request(Method::POST, "moderation/bans")
            .query(&[
                ("broadcaster_id", broadcaster.as_str()),
                ("moderator_id", moderator.as_str()),
            ])
            .json(&serde_json::json!({ "data": request }));
        self.execute(Endpoint::Bans, request).await?;
        Ok(())
    }

    async fn unban_user(
        &self,
        broadcaster: &UserId,
        moderator: &UserId,
        target: &UserId,
    ) -> ApiResult<()> {
        let request = self.request(Method::DELETE, "moderation/bans").query(&[
            ("broadcaster_id", broadcaster.as_str()),
            ("moderator_id", moderator.as_str()),
            ("user_id", target.as_str()),
        ]);
        self.execute(Endpoint::Bans, request).await?;
        Ok(())
    }

    async fn send_whisper(&self, from: &UserId, to: &UserId, message: &str) -> ApiResult<()> {
        let request = self
            .request(Method::POST, "whispers")
            .query(&[("from_user_id", from.as_str()), ("to_user_id", to.as_str())])
            .json(&serde_json::json!({ "message": message }));
        self.execute(Endpoint::Whispers, request).await?;
        Ok(())
    }

    async fn send_announcement(
        &self,
        broadcaster: &UserId,
        moderator: &UserId,
        message: &str,
        color: AnnouncementColor,
    ) -> ApiResult<()> {
        let request = self
            .request(Method::POST, "chat/announcements")
            .query(&[
                ("broadcaster_id", broadcaster.as_str()),
                ("moderator_id", moderator.as_str()),
            ])
            .json(&serde_json::json!({ "message": message, "color": color }));
        self.execute(Endpoint::Announcements, request).await?;
        Ok(())
    }

    async fn get_streams(&self, channels: &[UserName]) -> ApiResult<Vec<StreamInfo>> {
        let mut streams = Vec::new();
        for chunk in channels.chunks(100) {
            let query: Vec<(&str, &str)> = chunk
                .iter()
                .map(|name| ("user_login", name.as_str()))
                .collect();
            let request = self
                .request(Method::GET, "streams")
                .query(&query)
                .query(&[("first", PAGE_SIZE)]);
            let response = self.execute(Endpoint::Streams, request).await?;
            streams.extend(response.json::<Envelope<StreamInfo>>().await?.data);
        }
        Ok(streams)
    }
}

fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

/// Map an HTTP rejection to a structured Helix kind.
///
/// Helix reuses status codes heavily across endpoints, so the mapping
/// keys off the endpoint family plus phrases from the error body.
fn classify(endpoint: Endpoint, status: StatusCode, message: Option<&str>) -> HelixError {
    let message = message.unwrap_or_default().to_ascii_lowercase();
    let contains = |needle: &str| message.contains(needle);

    match status.as_u16() {
        400 => match endpoint {
            Endpoint::Whispers if contains("themself") => HelixError::WhisperSelf,
            Endpoint::Bans if contains("already banned") => HelixError::TargetAlreadyBanned,
            Endpoint::Bans if contains("not banned") => HelixError::TargetNotBanned,
            Endpoint::Bans if contains("may not be banned") => HelixError::TargetCannotBeBanned,
            Endpoint::Moderators if contains("already a moderator") => {
                HelixError::TargetAlreadyModded
            }
            Endpoint::Moderators if contains("is a vip") => HelixError::TargetIsVip,
            Endpoint::Moderators if contains("not a moderator") => HelixError::TargetNotModded,
            _ if !message.is_empty() => HelixError::Forwarded,
            _ => HelixError::Unknown,
        },
        401 => {
            if contains("scope") {
                HelixError::MissingScopes
            } else if contains("token") || contains("oauth") {
                HelixError::NotLoggedIn
            } else {
                HelixError::UserNotAuthorized
            }
        }
        403 => match endpoint {
            Endpoint::Whispers if contains("verified phone") => HelixError::NoVerifiedPhone,
            Endpoint::Whispers => HelixError::RecipientBlockedUser,
            _ if contains("broadcaster") => HelixError::BroadcasterTokenRequired,
            _ => HelixError::UserNotAuthorized,
        },
        409 => HelixError::ConflictingBanOperation,
        422 if !message.is_empty() => HelixError::Forwarded,
        429 => match endpoint {
            Endpoint::Whispers => HelixError::WhisperRateLimited,
            _ => HelixError::RateLimited,
        },
        _ if !message.is_empty() => HelixError::Forwarded,
        _ => HelixError::Unknown,
    }
}
