//! Data repository seam: badge and emote providers.
//!
//! Each method is one independently-failable fetch against one provider
//! endpoint. The aggregator decides which of them run and records their
//! outcomes; the repository itself keeps no failure state.

use crate::error::LoadError;
use crate::ident::{UserId, UserName};
use async_trait::async_trait;
use std::collections::HashMap;

/// Provider fetch operations for badges and emotes.
#[async_trait]
pub trait DataRepository: Send + Sync {
    /// Global Twitch chat badges.
    async fn load_global_badges(&self) -> Result<(), LoadError>;

    /// App-level supporter badges.
    async fn load_supporter_badges(&self) -> Result<(), LoadError>;

    /// Global BTTV emotes.
    async fn load_global_bttv_emotes(&self) -> Result<(), LoadError>;

    /// Global FFZ emotes.
    async fn load_global_ffz_emotes(&self) -> Result<(), LoadError>;

    /// Global 7TV emotes.
    async fn load_global_seventv_emotes(&self) -> Result<(), LoadError>;

    /// Channel-specific Twitch badges.
    async fn load_channel_badges(
        &self,
        channel: &UserName,
        channel_id: &UserId,
    ) -> Result<(), LoadError>;

    /// Channel BTTV emotes.
    async fn load_channel_bttv_emotes(
        &self,
        channel: &UserName,
        channel_id: &UserId,
    ) -> Result<(), LoadError>;

    /// Channel FFZ emotes.
    async fn load_channel_ffz_emotes(
        &self,
        channel: &UserName,
        channel_id: &UserId,
    ) -> Result<(), LoadError>;

    /// Channel 7TV emotes.
    async fn load_channel_seventv_emotes(
        &self,
        channel: &UserName,
        channel_id: &UserId,
    ) -> Result<(), LoadError>;

    /// Resolve the session user's own emotes from the emote sets named
    /// by the user state.
    async fn load_user_state_emotes(
        &self,
        global_sets: &[String],
        follower_sets: &HashMap<UserName, Vec<String>>,
    ) -> Result<(), LoadError>;
}
