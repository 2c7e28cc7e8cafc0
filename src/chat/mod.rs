//! Chat transport seam and per-channel state snapshots.
//!
//! The IRC connection itself lives outside this crate; the engine only
//! needs to send text, post system messages, trigger chat-side loads
//! and read the room/user state snapshots the connection maintains.

use crate::error::LoadError;
use crate::ident::{UserId, UserName};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Per-channel room flags, taken from the ROOMSTATE the server sends on
/// join and on every mode change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomState {
    /// Channel login.
    pub channel: UserName,
    /// Broadcaster user id; doubles as the channel id for Helix calls.
    pub channel_id: UserId,
    /// Only emotes may be sent.
    pub emote_only: bool,
    /// Minimum follow age in minutes, when followers-only is active.
    pub followers_only: Option<u32>,
    /// Messages must be unique.
    pub unique_chat: bool,
    /// Seconds between messages per user, when slow mode is active.
    pub slow_mode: Option<u32>,
    /// Only subscribers may chat.
    pub subscriber_only: bool,
}

/// The authenticated session's own state, received asynchronously after
/// connecting (GLOBALUSERSTATE plus per-channel USERSTATE).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserState {
    /// Emote sets available everywhere.
    pub global_emote_sets: Vec<String>,
    /// Follower emote sets keyed by channel.
    pub follower_emote_sets: HashMap<UserName, Vec<String>>,
    /// Channels where the session user is a moderator.
    pub moderation_channels: HashSet<UserName>,
    /// Channels where the session user is a VIP.
    pub vip_channels: HashSet<UserName>,
}

/// The engine's view of the chat connection.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Current room state snapshot for a channel, if one has arrived.
    /// Synchronous by contract; the dispatcher queries it before guards.
    fn room_state(&self, channel: &UserName) -> Option<RoomState>;

    /// Resolve once the channel's room state arrives. May never resolve
    /// when the connection stalls; callers bound the wait.
    async fn await_room_state(&self, channel: &UserName) -> Option<RoomState>;

    /// Resolve once a user state covering at least `min_channels`
    /// channels has been seen. May never resolve; callers bound the
    /// wait.
    async fn wait_for_user_state(&self, min_channels: usize) -> UserState;

    /// Whether outgoing text is suppressed by the caller-side ignore
    /// layer (blocked users, filters).
    fn should_block(&self, message: &str) -> bool;

    /// Send raw chat text to the active channel's connection.
    async fn send_message(&self, message: &str);

    /// Post a local system line into a channel's buffer.
    async fn post_system_message(&self, channel: &UserName, text: &str);

    /// Fetch the chatter list for a channel.
    async fn load_chatters(&self, channel: &UserName) -> Result<(), LoadError>;

    /// Backfill recent messages for a channel.
    async fn load_recent_messages(&self, channel: &UserName) -> Result<(), LoadError>;

    /// Re-resolve emote and badge references across all buffered
    /// messages. Run once per load cycle, after every step settled.
    async fn reparse_emotes_and_badges(&self);

    /// Drop the session user's emote sets (before a reconnect that will
    /// deliver fresh ones).
    async fn clear_user_state_emotes(&self);

    /// Tear down and re-establish the connection. `full` also recycles
    /// auxiliary connections (pubsub and the like).
    async fn reconnect(&self, full: bool);
}
