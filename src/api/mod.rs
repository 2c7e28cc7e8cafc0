//! Twitch Helix API surface.
//!
//! The engine talks to Twitch through the [`TwitchApi`] seam; the
//! dispatcher and the stream poller only ever see this trait. The
//! bundled [`HelixClient`] is a reqwest implementation of it.

mod helix;

pub use helix::HelixClient;

use crate::error::ApiResult;
use crate::ident::{DisplayName, UserId, UserName};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user record from the Helix users endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HelixUser {
    /// Opaque user id.
    pub id: UserId,
    /// Login name.
    pub login: UserName,
    /// User-chosen display name.
    pub display_name: DisplayName,
}

impl HelixUser {
    /// Render the user the way chat messages name users.
    pub fn format_name(&self) -> String {
        self.login.format_with_display(&self.display_name)
    }
}

/// One entry of a moderator or VIP listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChannelUser {
    /// Opaque user id.
    pub user_id: UserId,
    /// Login name.
    pub user_login: UserName,
    /// User-chosen display name.
    pub user_name: DisplayName,
}

impl ChannelUser {
    /// Render the user the way chat messages name users.
    pub fn format_name(&self) -> String {
        self.user_login.format_with_display(&self.user_name)
    }
}

/// Highlight color for the announcements endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnouncementColor {
    /// Channel accent color (the default).
    Primary,
    Blue,
    Green,
    Orange,
    Purple,
}

/// Payload of a ban or timeout request.
///
/// A ban and a timeout share the endpoint; a timeout is a ban with a
/// duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BanRequest {
    /// Target user id.
    pub user_id: UserId,
    /// Timeout duration in seconds; `None` for a permanent ban.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    /// Reason shown to the target and other moderators.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Live-stream metadata for one channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StreamInfo {
    /// Broadcaster login.
    pub user_login: UserName,
    /// Current viewer count.
    pub viewer_count: u64,
    /// When the stream went live.
    pub started_at: DateTime<Utc>,
}

/// The REST operations the engine needs from Twitch.
///
/// Every method performs exactly one API call and returns either its
/// payload or a structured [`crate::error::ApiError`].
#[async_trait]
pub trait TwitchApi: Send + Sync {
    /// Look up a single user by login.
    async fn get_user_by_name(&self, name: &UserName) -> ApiResult<HelixUser>;

    /// Look up a user id by login.
    async fn get_user_id_by_name(&self, name: &UserName) -> ApiResult<UserId> {
        Ok(self.get_user_by_name(name).await?.id)
    }

    /// Bulk login-to-user resolution.
    async fn get_users_by_names(&self, names: &[UserName]) -> ApiResult<Vec<HelixUser>>;

    /// List the moderators of a channel.
    async fn get_moderators(&self, broadcaster: &UserId) -> ApiResult<Vec<ChannelUser>>;

    /// Grant moderator status.
    async fn add_moderator(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()>;

    /// Revoke moderator status.
    async fn remove_moderator(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()>;

    /// List the VIPs of a channel.
    async fn get_vips(&self, broadcaster: &UserId) -> ApiResult<Vec<ChannelUser>>;

    /// Grant VIP status.
    async fn add_vip(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()>;

    /// Revoke VIP status.
    async fn remove_vip(&self, broadcaster: &UserId, user: &UserId) -> ApiResult<()>;

    /// Ban or time out a user.
    async fn ban_user(
        &self,
        broadcaster: &UserId,
        moderator: &UserId,
        request: &BanRequest,
    ) -> ApiResult<()>;

    /// Lift a ban or timeout.
    async fn unban_user(
        &self,
        broadcaster: &UserId,
        moderator: &UserId,
        target: &UserId,
    ) -> ApiResult<()>;

    /// Send a whisper.
    async fn send_whisper(&self, from: &UserId, to: &UserId, message: &str) -> ApiResult<()>;

    /// Post an announcement to a channel.
    async fn send_announcement(
        &self,
        broadcaster: &UserId,
        moderator: &UserId,
        message: &str,
        color: AnnouncementColor,
    ) -> ApiResult<()>;

    /// Fetch live-stream metadata for the given channels. Channels that
    /// are offline are absent from the result.
    async fn get_streams(&self, channels: &[UserName]) -> ApiResult<Vec<StreamInfo>>;
}
