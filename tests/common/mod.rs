//! Integration test common infrastructure.
//!
//! Programmable in-memory doubles for the three engine seams: the
//! Helix API, the chat transport and the badge/emote repository.

#![allow(dead_code)]

use async_trait::async_trait;
use frostchat::api::{
    AnnouncementColor, BanRequest, ChannelUser, HelixUser, StreamInfo, TwitchApi,
};
use frostchat::chat::{ChatTransport, RoomState, UserState};
use frostchat::error::{ApiError, ApiResult, HelixError, LoadError};
use frostchat::ident::{DisplayName, UserId, UserName};
use frostchat::repo::DataRepository;
use frostchat::session::ChatSession;
use frostchat::EngineConfig;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// ============================================================================
// Mock Helix API
// ============================================================================

/// In-memory [`TwitchApi`] with per-method failure injection and call
/// recording.
#[derive(Default)]
pub struct MockApi {
    users: Mutex<Vec<HelixUser>>,
    moderators: Mutex<Vec<ChannelUser>>,
    vips: Mutex<Vec<ChannelUser>>,
    streams: Mutex<Vec<StreamInfo>>,
    failures: Mutex<HashMap<&'static str, (HelixError, u16, Option<String>)>>,
    pub calls: Mutex<Vec<String>>,
    pub ban_requests: Mutex<Vec<BanRequest>>,
    pub unbans: Mutex<Vec<UserId>>,
    pub whispers: Mutex<Vec<(UserId, UserId, String)>>,
    pub announcements: Mutex<Vec<(String, AnnouncementColor)>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a known user for lookups.
    pub fn with_user(self, login: &str, id: &str, display: &str) -> Self {
        self.users.lock().push(HelixUser {
            id: UserId::new(id),
            login: UserName::new(login),
            display_name: DisplayName::new(display),
        });
        self
    }

    pub fn with_moderator(self, login: &str, id: &str, display: &str) -> Self {
        self.moderators.lock().push(ChannelUser {
            user_id: UserId::new(id),
            user_login: UserName::new(login),
            user_name: DisplayName::new(display),
        });
        self
    }

    pub fn with_vip(self, login: &str, id: &str, display: &str) -> Self {
        self.vips.lock().push(ChannelUser {
            user_id: UserId::new(id),
            user_login: UserName::new(login),
            user_name: DisplayName::new(display),
        });
        self
    }

    /// Mark a channel as live.
    pub fn with_stream(self, login: &str, viewer_count: u64) -> Self {
        self.streams.lock().push(StreamInfo {
            user_login: UserName::new(login),
            viewer_count,
            started_at: chrono::Utc::now(),
        });
        self
    }

    /// Make one API method fail with a classified Helix error.
    pub fn fail_with(self, method: &'static str, kind: HelixError) -> Self {
        self.failures.lock().insert(method, (kind, 400, None));
        self
    }

    /// Make one API method fail with a server-supplied message.
    pub fn fail_with_message(
        self,
        method: &'static str,
        kind: HelixError,
        status: u16,
        message: &str,
    ) -> Self {
        self.failures
            .lock()
            .insert(method, (kind, status, Some(message.to_string())));
        self
    }

    fn check(&self, method: &'static str) -> ApiResult<()> {
        self.calls.lock().push(method.to_string());
        if let Some((kind, status, message)) = self.failures.lock().get(method).cloned() {
            return Err(ApiError::Helix {
                kind,
                status,
                url: format!("https://api.twitch.tv/helix/{method}"),
                message,
            });
        }
        Ok(())
    }

    fn not_found(method: &'static str) -> ApiError {
        ApiError::Helix {
            kind: HelixError::Unknown,
            status: 404,
            url: format!("https://api.twitch.tv/helix/{method}"),
            message: None,
        }
    }
}

#[async_trait]
impl TwitchApi for MockApi {
    async fn get_user_by_name(&self, name: &UserName) -> ApiResult<HelixUser> {
        self.check("users")?;
        self.users
            .lock()
            .iter()
            .find(|user| user.login == *name)
            .cloned()
            .ok_or_else(|| Self::not_found("users"))
    }

    async fn get_users_by_names(&self, names: &[UserName]) -> ApiResult<Vec<HelixUser>> {
        self.check("users_bulk")?;
        Ok(self
            .users
            .lock()
            .iter()
            .filter(|user| names.contains(&user.login))
            .cloned()
            .collect())
    }

    async fn get_moderators(&self, _broadcaster: &UserId) -> ApiResult<Vec<ChannelUser>> {
        self.check("moderators")?;
        Ok(self.moderators.lock().clone())
    }

    async fn add_moderator(&self, _broadcaster: &UserId, _user: &UserId) -> ApiResult<()> {
        self.check("add_moderator")
    }

    async fn remove_moderator(&self, _broadcaster: &UserId, _user: &UserId) -> ApiResult<()> {
        self.check("remove_moderator")
    }

    async fn get_vips(&self, _broadcaster: &UserId) -> ApiResult<Vec<ChannelUser>> {
        self.check("vips")?;
        Ok(self.vips.lock().clone())
    }

    async fn add_vip(&self, _broadcaster: &UserId, _user: &UserId) -> ApiResult<()> {
        self.check("add_vip")
    }

    async fn remove_vip(&self, _broadcaster: &UserId, _user: &UserId) -> ApiResult<()> {
        self.check("remove_vip")
    }

    async fn ban_user(
        &self,
        _broadcaster: &UserId,
        _moderator: &UserId,
        request: &BanRequest,
    ) -> ApiResult<()> {
        self.check("bans")?;
        self.ban_requests.lock().push(request.clone());
        Ok(())
    }

    async fn unban_user(
        &self,
        _broadcaster: &UserId,
        _moderator: &UserId,
        target: &UserId,
    ) -> ApiResult<()> {
        self.check("unban")?;
        self.unbans.lock().push(target.clone());
        Ok(())
    }

    async fn send_whisper(&self, from: &UserId, to: &UserId, message: &str) -> ApiResult<()> {
        self.check("whispers")?;
        self.whispers
            .lock()
            .push((from.clone(), to.clone(), message.to_string()));
        Ok(())
    }

    async fn send_announcement(
        &self,
        _broadcaster: &UserId,
        _moderator: &UserId,
        message: &str,
        color: AnnouncementColor,
    ) -> ApiResult<()> {
        self.check("announcements")?;
        self.announcements.lock().push((message.to_string(), color));
        Ok(())
    }

    async fn get_streams(&self, channels: &[UserName]) -> ApiResult<Vec<StreamInfo>> {
        self.check("streams")?;
        Ok(self
            .streams
            .lock()
            .iter()
            .filter(|stream| channels.contains(&stream.user_login))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Mock chat transport
// ============================================================================

/// In-memory [`ChatTransport`] recording everything sent through it.
#[derive(Default)]
pub struct MockChat {
    room_states: Mutex<HashMap<UserName, RoomState>>,
    user_state: Mutex<Option<UserState>>,
    blocked: Mutex<Vec<String>>,
    chat_failures: Mutex<HashMap<String, LoadError>>,
    pub sent: Mutex<Vec<String>>,
    pub system_messages: Mutex<Vec<(UserName, String)>>,
    pub chat_loads: Mutex<Vec<String>>,
    pub reparse_count: AtomicUsize,
    pub cleared_emotes: AtomicUsize,
    pub reconnects: Mutex<Vec<bool>>,
}

impl MockChat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a joined channel's room state.
    pub fn with_room_state(self, channel: &str, channel_id: &str) -> Self {
        self.room_states.lock().insert(
            UserName::new(channel),
            RoomState {
                channel: UserName::new(channel),
                channel_id: UserId::new(channel_id),
                emote_only: false,
                followers_only: None,
                unique_chat: false,
                slow_mode: None,
                subscriber_only: false,
            },
        );
        self
    }

    /// Make the session user state available.
    pub fn with_user_state(self, state: UserState) -> Self {
        *self.user_state.lock() = Some(state);
        self
    }

    /// Suppress a specific outgoing message.
    pub fn blocking(self, message: &str) -> Self {
        self.blocked.lock().push(message.to_string());
        self
    }

    /// Make one chat-side load fail (`"chatters:<channel>"` or
    /// `"recent:<channel>"`).
    pub fn fail_load(self, key: &str, error: LoadError) -> Self {
        self.chat_failures.lock().insert(key.to_string(), error);
        self
    }

    fn run_load(&self, key: String) -> Result<(), LoadError> {
        self.chat_loads.lock().push(key.clone());
        match self.chat_failures.lock().get(&key) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ChatTransport for MockChat {
    fn room_state(&self, channel: &UserName) -> Option<RoomState> {
        self.room_states.lock().get(channel).cloned()
    }

    async fn await_room_state(&self, channel: &UserName) -> Option<RoomState> {
        // The guard must drop before the pending await below, or the
        // future stops being Send.
        let state = self.room_states.lock().get(channel).cloned();
        match state {
            Some(state) => Some(state),
            // Never resolves; callers bound the wait.
            None => futures_util::future::pending().await,
        }
    }

    async fn wait_for_user_state(&self, _min_channels: usize) -> UserState {
        let state = self.user_state.lock().clone();
        match state {
            Some(state) => state,
            None => futures_util::future::pending().await,
        }
    }

    fn should_block(&self, message: &str) -> bool {
        self.blocked.lock().iter().any(|blocked| blocked == message)
    }

    async fn send_message(&self, message: &str) {
        self.sent.lock().push(message.to_string());
    }

    async fn post_system_message(&self, channel: &UserName, text: &str) {
        self.system_messages
            .lock()
            .push((channel.clone(), text.to_string()));
    }

    async fn load_chatters(&self, channel: &UserName) -> Result<(), LoadError> {
        self.run_load(format!("chatters:{channel}"))
    }

    async fn load_recent_messages(&self, channel: &UserName) -> Result<(), LoadError> {
        self.run_load(format!("recent:{channel}"))
    }

    async fn reparse_emotes_and_badges(&self) {
        self.reparse_count.fetch_add(1, Ordering::SeqCst);
    }

    async fn clear_user_state_emotes(&self) {
        self.cleared_emotes.fetch_add(1, Ordering::SeqCst);
    }

    async fn reconnect(&self, full: bool) {
        self.reconnects.lock().push(full);
    }
}

// ============================================================================
// Mock data repository
// ============================================================================

/// In-memory [`DataRepository`] with per-step failure injection.
///
/// Steps are keyed by short names: `global_badges`,
/// `supporter_badges`, `global_bttv`, `global_ffz`, `global_seventv`,
/// `channel_badges:<channel>`, `channel_bttv:<channel>`,
/// `channel_ffz:<channel>`, `channel_seventv:<channel>`,
/// `user_state_emotes`.
#[derive(Default)]
pub struct MockRepo {
    failures: Mutex<HashMap<String, LoadError>>,
    pub calls: Mutex<Vec<String>>,
    pub user_state_sets: Mutex<Vec<Vec<String>>>,
}

impl MockRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self, key: &str, error: LoadError) -> Self {
        self.failures.lock().insert(key.to_string(), error);
        self
    }

    /// Clear injected failures, so a retry succeeds.
    pub fn heal(&self) {
        self.failures.lock().clear();
    }

    pub fn call_count(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|call| *call == key).count()
    }

    fn run(&self, key: String) -> Result<(), LoadError> {
        self.calls.lock().push(key.clone());
        match self.failures.lock().get(&key) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DataRepository for MockRepo {
    async fn load_global_badges(&self) -> Result<(), LoadError> {
        self.run("global_badges".to_string())
    }

    async fn load_supporter_badges(&self) -> Result<(), LoadError> {
        self.run("supporter_badges".to_string())
    }

    async fn load_global_bttv_emotes(&self) -> Result<(), LoadError> {
        self.run("global_bttv".to_string())
    }

    async fn load_global_ffz_emotes(&self) -> Result<(), LoadError> {
        self.run("global_ffz".to_string())
    }

    async fn load_global_seventv_emotes(&self) -> Result<(), LoadError> {
        self.run("global_seventv".to_string())
    }

    async fn load_channel_badges(
        &self,
        channel: &UserName,
        _channel_id: &UserId,
    ) -> Result<(), LoadError> {
        self.run(format!("channel_badges:{channel}"))
    }

    async fn load_channel_bttv_emotes(
        &self,
        channel: &UserName,
        _channel_id: &UserId,
    ) -> Result<(), LoadError> {
        self.run(format!("channel_bttv:{channel}"))
    }

    async fn load_channel_ffz_emotes(
        &self,
        channel: &UserName,
        _channel_id: &UserId,
    ) -> Result<(), LoadError> {
        self.run(format!("channel_ffz:{channel}"))
    }

    async fn load_channel_seventv_emotes(
        &self,
        channel: &UserName,
        _channel_id: &UserId,
    ) -> Result<(), LoadError> {
        self.run(format!("channel_seventv:{channel}"))
    }

    async fn load_user_state_emotes(
        &self,
        global_sets: &[String],
        _follower_sets: &HashMap<UserName, Vec<String>>,
    ) -> Result<(), LoadError> {
        self.user_state_sets.lock().push(global_sets.to_vec());
        self.run("user_state_emotes".to_string())
    }
}

// ============================================================================
// Session wiring
// ============================================================================

/// Build a session over the three mocks with the default config.
pub fn session(api: Arc<MockApi>, chat: Arc<MockChat>, repo: Arc<MockRepo>) -> ChatSession {
    session_with_config(api, chat, repo, EngineConfig::default())
}

pub fn session_with_config(
    api: Arc<MockApi>,
    chat: Arc<MockChat>,
    repo: Arc<MockRepo>,
    config: EngineConfig,
) -> ChatSession {
    ChatSession::new(repo, chat, api, config)
}

/// A 404 from a provider endpoint.
pub fn not_found_error(url: &str) -> LoadError {
    LoadError::Api {
        url: url.to_string(),
        status: 404,
        message: None,
    }
}
