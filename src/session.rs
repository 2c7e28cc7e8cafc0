//! Session facade: input submission, identity, stream polling.
//!
//! [`ChatSession`] ties the grammar, the dispatcher and the data loader
//! together behind the surface a chat UI drives. It owns the session
//! identity, the per-channel last-message bookkeeping and the single
//! stream-metadata poller.

use crate::api::{StreamInfo, TwitchApi};
use crate::chat::ChatTransport;
use crate::command::{CommandDispatcher, CommandResult, ParsedInput, parse_input};
use crate::config::EngineConfig;
use crate::ident::{UserId, UserName};
use crate::loading::{DataLoader, DataLoadingState};
use crate::repo::DataRepository;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Live-stream metadata as published to the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamData {
    pub channel: UserName,
    pub viewer_count: u64,
    pub started_at: DateTime<Utc>,
}

impl StreamData {
    /// Uptime rendered as `3h 21m` (or `21m` under an hour).
    pub fn format_uptime(&self, now: DateTime<Utc>) -> String {
        let minutes = (now - self.started_at).num_minutes().max(0);
        let (hours, minutes) = (minutes / 60, minutes % 60);
        if hours > 0 {
            format!("{hours}h {minutes}m")
        } else {
            format!("{minutes}m")
        }
    }
}

impl From<StreamInfo> for StreamData {
    fn from(info: StreamInfo) -> Self {
        Self {
            channel: info.user_login,
            viewer_count: info.viewer_count,
            started_at: info.started_at,
        }
    }
}

/// One authenticated (or anonymous) chat session.
pub struct ChatSession {
    chat: Arc<dyn ChatTransport>,
    api: Arc<dyn TwitchApi>,
    dispatcher: CommandDispatcher,
    loader: DataLoader,
    config: EngineConfig,
    current_user: RwLock<Option<UserId>>,
    last_messages: DashMap<UserName, String>,
    stream_poll: Mutex<Option<JoinHandle<()>>>,
    streams_tx: watch::Sender<Vec<StreamData>>,
}

impl ChatSession {
    pub fn new(
        repo: Arc<dyn DataRepository>,
        chat: Arc<dyn ChatTransport>,
        api: Arc<dyn TwitchApi>,
        config: EngineConfig,
    ) -> Self {
        let dispatcher = CommandDispatcher::new(Arc::clone(&api));
        let loader = DataLoader::new(
            repo,
            Arc::clone(&chat),
            Arc::clone(&api),
            config.clone(),
        );
        let (streams_tx, _) = watch::channel(Vec::new());
        Self {
            chat,
            api,
            dispatcher,
            loader,
            config,
            current_user: RwLock::new(None),
            last_messages: DashMap::new(),
            stream_poll: Mutex::new(None),
            streams_tx,
        }
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Set or clear the authenticated user. Logging out stops the
    /// stream poller, which needs credentials.
    pub fn set_current_user(&self, user: Option<UserId>) {
        let logged_out = user.is_none();
        *self.current_user.write() = user;
        if logged_out {
            self.cancel_stream_data();
        }
    }

    pub fn current_user(&self) -> Option<UserId> {
        self.current_user.read().clone()
    }

    // ========================================================================
    // Input submission
    // ========================================================================

    /// Resolve and act on one line of chat input.
    ///
    /// Exactly one [`CommandResult`] comes back per call; sending,
    /// system messages and last-message bookkeeping have already
    /// happened by the time it does.
    pub async fn submit_input(&self, channel: &UserName, message: &str) -> CommandResult {
        // Input history recalls what was typed, even when the input is
        // suppressed or a command rewrites what goes over the wire.
        self.last_messages
            .insert(channel.clone(), message.to_string());

        if self.chat.should_block(message) {
            return CommandResult::Blocked;
        }
        // Input typed before the room state arrives is consumed rather
        // than sent to a channel whose id is still unknown.
        let Some(room) = self.chat.room_state(channel) else {
            debug!(%channel, "no room state yet, dropping input");
            return CommandResult::Accepted;
        };

        match parse_input(message, self.config.command_prefix, channel, &room.channel_id) {
            ParsedInput::Chat => {
                self.chat.send_message(message).await;
                CommandResult::NotFound
            }
            ParsedInput::Irc => {
                self.chat.send_message(message).await;
                CommandResult::IrcCommand
            }
            ParsedInput::Twitch { command, context } => {
                let current_user = self.current_user();
                let result = self
                    .dispatcher
                    .handle(command, &context, current_user.as_ref())
                    .await;
                self.apply_result(channel, result).await
            }
        }
    }

    /// Act on a command result: post responses, send rewritten text.
    /// Also the entry point for caller-side command layers that produce
    /// their own [`CommandResult::AcceptedWithResponse`].
    pub async fn apply_result(
        &self,
        channel: &UserName,
        result: CommandResult,
    ) -> CommandResult {
        match &result {
            CommandResult::AcceptedTwitchCommand {
                response: Some(response),
                ..
            } => {
                self.chat.post_system_message(channel, response).await;
            }
            CommandResult::AcceptedWithResponse { response } => {
                self.chat.post_system_message(channel, response).await;
            }
            CommandResult::Message(text) => {
                self.chat.send_message(text).await;
            }
            _ => {}
        }
        result
    }

    /// The last text sent to a channel, for input-history recall.
    pub fn last_message(&self, channel: &UserName) -> Option<String> {
        self.last_messages
            .get(channel)
            .map(|entry| entry.value().clone())
    }

    // ========================================================================
    // Data loading
    // ========================================================================

    /// Run a full load cycle over the given channels.
    pub async fn load_data(&self, channels: &[UserName]) {
        let current_user = self.current_user();
        self.loader.load(channels, current_user.as_ref()).await;
    }

    /// Re-run exactly the steps recorded by the last failed cycle.
    /// A no-op unless the current state is failed.
    pub async fn retry_data_loading(&self) {
        let failed = match &*self.loader.state().borrow() {
            DataLoadingState::Failed {
                data_failures,
                chat_failures,
                ..
            } => Some((data_failures.clone(), chat_failures.clone())),
            _ => None,
        };
        if let Some((data_failures, chat_failures)) = failed {
            self.loader.retry(data_failures, chat_failures).await;
        }
    }

    /// Reload all emote sources for one channel.
    pub async fn reload_emotes(&self, channel: &UserName) {
        let current_user = self.current_user();
        self.loader.reload_emotes(channel, current_user.as_ref()).await;
    }

    /// Subscribe to the aggregate loading state.
    pub fn loading_state(&self) -> watch::Receiver<DataLoadingState> {
        self.loader.state()
    }

    // ========================================================================
    // Stream metadata polling
    // ========================================================================

    /// Start (or restart) the periodic stream-metadata poller for the
    /// given channels. At most one poller runs per session; anonymous
    /// sessions never poll.
    pub fn fetch_stream_data(&self, channels: Vec<UserName>) {
        self.cancel_stream_data();
        if !self.config.fetch_streams || channels.is_empty() || self.current_user().is_none() {
            return;
        }

        let api = Arc::clone(&self.api);
        let interval = self.config.stream_refresh_interval();
        let streams_tx = self.streams_tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match api.get_streams(&channels).await {
                    Ok(streams) => {
                        streams_tx
                            .send_replace(streams.into_iter().map(StreamData::from).collect());
                    }
                    Err(err) => debug!(error = %err, "stream data refresh failed"),
                }
            }
        });
        *self.stream_poll.lock() = Some(handle);
    }

    /// Stop the poller, if one is running, and drop the published
    /// snapshot so subscribers stop showing stale stream data.
    pub fn cancel_stream_data(&self) {
        if let Some(handle) = self.stream_poll.lock().take() {
            handle.abort();
            self.streams_tx.send_replace(Vec::new());
        }
    }

    /// Subscribe to polled stream metadata. Offline channels are absent.
    pub fn stream_data(&self) -> watch::Receiver<Vec<StreamData>> {
        self.streams_tx.subscribe()
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Tear down and re-establish the chat connection. A full reconnect
    /// also recycles auxiliary connections and drops the cached user
    /// emote sets, which the fresh connection re-delivers.
    pub async fn close_and_reconnect(&self, full: bool) {
        self.cancel_stream_data();
        if full {
            self.chat.clear_user_state_emotes().await;
        }
        self.chat.reconnect(full).await;
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(handle) = self.stream_poll.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn uptime_formats_hours_and_minutes() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let data = StreamData {
            channel: UserName::new("pajlada"),
            viewer_count: 3_500,
            started_at: started,
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 15, 21, 30).unwrap();
        assert_eq!(data.format_uptime(now), "3h 21m");

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 40, 0).unwrap();
        assert_eq!(data.format_uptime(now), "40m");
    }

    #[test]
    fn uptime_clamps_clock_skew() {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let data = StreamData {
            channel: UserName::new("pajlada"),
            viewer_count: 1,
            started_at: started,
        };
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 11, 59, 0).unwrap();
        assert_eq!(data.format_uptime(now), "0m");
    }
}
