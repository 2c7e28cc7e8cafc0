//! Concurrent load-cycle orchestration.
//!
//! One [`DataLoader::load`] call is one cycle: resolve channel ids, fan
//! out every step, wait for all of them, reconcile emotes and badges
//! across buffered messages once, then publish the reduced state.
//! Failed cycles keep their failure sets so [`DataLoader::retry`] can
//! re-run exactly the failed steps.

use super::collector::FailureCollector;
use super::state::{self, DataLoadingState};
use super::{ChatLoadingFailure, ChatLoadingStep, DataLoadingFailure, DataLoadingStep};
use crate::api::TwitchApi;
use crate::chat::ChatTransport;
use crate::config::EngineConfig;
use crate::ident::{UserId, UserName};
use crate::repo::DataRepository;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, join_all};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Runs load cycles and publishes their aggregate state.
pub struct DataLoader {
    repo: Arc<dyn DataRepository>,
    chat: Arc<dyn ChatTransport>,
    api: Arc<dyn TwitchApi>,
    config: EngineConfig,
    data_failures: FailureCollector<DataLoadingStep>,
    chat_failures: FailureCollector<ChatLoadingStep>,
    state_tx: watch::Sender<DataLoadingState>,
}

impl DataLoader {
    pub fn new(
        repo: Arc<dyn DataRepository>,
        chat: Arc<dyn ChatTransport>,
        api: Arc<dyn TwitchApi>,
        config: EngineConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(DataLoadingState::Loading);
        Self {
            repo,
            chat,
            api,
            config,
            data_failures: FailureCollector::new(),
            chat_failures: FailureCollector::new(),
            state_tx,
        }
    }

    /// Subscribe to the published loading state.
    pub fn state(&self) -> watch::Receiver<DataLoadingState> {
        self.state_tx.subscribe()
    }

    /// Run a full load cycle over the given channels.
    ///
    /// `current_user` enables the bulk API lookup for channels whose
    /// room state has not arrived yet; without it, unresolved channels
    /// fall back to a bounded room-state wait.
    pub async fn load(&self, channels: &[UserName], current_user: Option<&UserId>) {
        self.state_tx.send_replace(DataLoadingState::Loading);

        let resolved = self.resolve_channels(channels, current_user).await;

        let mut steps: Vec<BoxFuture<'_, ()>> = vec![
            self.data_step(DataLoadingStep::GlobalBadges),
            self.data_step(DataLoadingStep::SupporterBadges),
            self.data_step(DataLoadingStep::GlobalBttvEmotes),
            self.data_step(DataLoadingStep::GlobalFfzEmotes),
            self.data_step(DataLoadingStep::GlobalSevenTvEmotes),
        ];
        for (channel, channel_id) in &resolved {
            steps.extend(self.channel_data_steps(channel, channel_id));
            steps.push(self.chat_step(ChatLoadingStep::Chatters {
                channel: channel.clone(),
            }));
            if self.config.load_recent_messages {
                steps.push(self.chat_step(ChatLoadingStep::RecentMessages {
                    channel: channel.clone(),
                }));
            }
        }
        join_all(steps).await;

        self.chat.reparse_emotes_and_badges().await;
        // Own-emote sets only exist for authenticated sessions; waiting
        // on the user state without one would just burn the timeout.
        if current_user.is_some() {
            self.load_user_state_emotes(channels.len()).await;
        }
        self.finish_cycle().await;
    }

    /// Re-run exactly the steps of a failed cycle. An empty step set
    /// still runs the reconciliation and reduce passes, so the
    /// published state is recomputed from the (empty) collectors.
    pub async fn retry(
        &self,
        data_failures: Vec<DataLoadingFailure>,
        chat_failures: Vec<ChatLoadingFailure>,
    ) {
        self.state_tx.send_replace(DataLoadingState::Loading);

        let steps: Vec<BoxFuture<'_, ()>> = data_failures
            .into_iter()
            .map(|failure| self.data_step(failure.step))
            .chain(
                chat_failures
                    .into_iter()
                    .map(|failure| self.chat_step(failure.step)),
            )
            .collect();
        join_all(steps).await;

        self.chat.reparse_emotes_and_badges().await;
        self.finish_cycle().await;
    }

    /// Reload every emote source relevant to one channel, plus the
    /// session user's own emotes when logged in.
    pub async fn reload_emotes(&self, channel: &UserName, current_user: Option<&UserId>) {
        self.state_tx.send_replace(DataLoadingState::Loading);

        // The cached own-emote sets go stale with the reload; drop them
        // before fetching fresh ones.
        self.chat.clear_user_state_emotes().await;

        let channel_id = match self.chat.room_state(channel) {
            Some(room) => Some(room.channel_id),
            None => timeout(
                self.config.room_state_timeout(1),
                self.chat.await_room_state(channel),
            )
            .await
            .ok()
            .flatten()
            .map(|room| room.channel_id),
        };

        let mut steps: Vec<BoxFuture<'_, ()>> = vec![
            self.data_step(DataLoadingStep::GlobalBttvEmotes),
            self.data_step(DataLoadingStep::GlobalFfzEmotes),
            self.data_step(DataLoadingStep::GlobalSevenTvEmotes),
        ];
        match channel_id {
            Some(channel_id) => {
                steps.push(self.data_step(DataLoadingStep::ChannelBttvEmotes {
                    channel: channel.clone(),
                    channel_id: channel_id.clone(),
                }));
                steps.push(self.data_step(DataLoadingStep::ChannelFfzEmotes {
                    channel: channel.clone(),
                    channel_id: channel_id.clone(),
                }));
                steps.push(self.data_step(DataLoadingStep::ChannelSevenTvEmotes {
                    channel: channel.clone(),
                    channel_id,
                }));
            }
            None => warn!(%channel, "channel id unresolved, reloading global emotes only"),
        }
        join_all(steps).await;

        self.chat.reparse_emotes_and_badges().await;
        if current_user.is_some() {
            self.load_user_state_emotes(1).await;
        }
        self.finish_cycle().await;
    }

    /// Channel-id resolution order: room-state snapshot, then one bulk
    /// API lookup when logged in, then a bounded room-state wait.
    async fn resolve_channels(
        &self,
        channels: &[UserName],
        current_user: Option<&UserId>,
    ) -> Vec<(UserName, UserId)> {
        let mut resolved = Vec::with_capacity(channels.len());
        let mut pending = Vec::new();
        for channel in channels {
            match self.chat.room_state(channel) {
                Some(room) => resolved.push((channel.clone(), room.channel_id)),
                None => pending.push(channel.clone()),
            }
        }
        if pending.is_empty() {
            return resolved;
        }

        if current_user.is_some() {
            match self.api.get_users_by_names(&pending).await {
                Ok(users) => {
                    for user in users {
                        if let Some(position) = pending.iter().position(|c| *c == user.login) {
                            let channel = pending.swap_remove(position);
                            resolved.push((channel, user.id));
                        }
                    }
                }
                Err(err) => debug!(error = %err, "bulk channel id lookup failed"),
            }
        }

        // The room-state wait covers channels joined in the same burst,
        // so it scales with the total channel count.
        let wait = self.config.room_state_timeout(channels.len());
        for channel in pending {
            match timeout(wait, self.chat.await_room_state(&channel)).await {
                Ok(Some(room)) => resolved.push((channel, room.channel_id)),
                _ => warn!(%channel, "channel id unresolved, skipping channel loads"),
            }
        }
        resolved
    }

    fn channel_data_steps(
        &self,
        channel: &UserName,
        channel_id: &UserId,
    ) -> Vec<BoxFuture<'_, ()>> {
        vec![
            self.data_step(DataLoadingStep::ChannelBadges {
                channel: channel.clone(),
                channel_id: channel_id.clone(),
            }),
            self.data_step(DataLoadingStep::ChannelBttvEmotes {
                channel: channel.clone(),
                channel_id: channel_id.clone(),
            }),
            self.data_step(DataLoadingStep::ChannelFfzEmotes {
                channel: channel.clone(),
                channel_id: channel_id.clone(),
            }),
            self.data_step(DataLoadingStep::ChannelSevenTvEmotes {
                channel: channel.clone(),
                channel_id: channel_id.clone(),
            }),
        ]
    }

    /// Run one data step, recording its failure if any. Steps never
    /// abort the cycle.
    fn data_step(&self, step: DataLoadingStep) -> BoxFuture<'_, ()> {
        async move {
            let result = match &step {
                DataLoadingStep::GlobalBadges => self.repo.load_global_badges().await,
                DataLoadingStep::SupporterBadges => self.repo.load_supporter_badges().await,
                DataLoadingStep::GlobalBttvEmotes => self.repo.load_global_bttv_emotes().await,
                DataLoadingStep::GlobalFfzEmotes => self.repo.load_global_ffz_emotes().await,
                DataLoadingStep::GlobalSevenTvEmotes => {
                    self.repo.load_global_seventv_emotes().await
                }
                DataLoadingStep::ChannelBadges {
                    channel,
                    channel_id,
                } => self.repo.load_channel_badges(channel, channel_id).await,
                DataLoadingStep::ChannelBttvEmotes {
                    channel,
                    channel_id,
                } => self.repo.load_channel_bttv_emotes(channel, channel_id).await,
                DataLoadingStep::ChannelFfzEmotes {
                    channel,
                    channel_id,
                } => self.repo.load_channel_ffz_emotes(channel, channel_id).await,
                DataLoadingStep::ChannelSevenTvEmotes {
                    channel,
                    channel_id,
                } => {
                    self.repo
                        .load_channel_seventv_emotes(channel, channel_id)
                        .await
                }
            };
            if let Err(err) = result {
                debug!(step = %step, error = %err, "data loading step failed");
                self.data_failures.record(step, err);
            }
        }
        .boxed()
    }

    fn chat_step(&self, step: ChatLoadingStep) -> BoxFuture<'_, ()> {
        async move {
            let result = match &step {
                ChatLoadingStep::Chatters { channel } => self.chat.load_chatters(channel).await,
                ChatLoadingStep::RecentMessages { channel } => {
                    self.chat.load_recent_messages(channel).await
                }
            };
            if let Err(err) = result {
                debug!(step = %step, error = %err, "chat loading step failed");
                self.chat_failures.record(step, err);
            }
        }
        .boxed()
    }

    /// Two-tier wait for the user state: the full wait expects coverage
    /// of every joined channel; the short fallback accepts whatever has
    /// arrived.
    async fn load_user_state_emotes(&self, channel_count: usize) {
        let user_state = match timeout(
            self.config.user_state_timeout(),
            self.chat.wait_for_user_state(channel_count),
        )
        .await
        {
            Ok(state) => Some(state),
            Err(_) => timeout(
                self.config.user_state_short_timeout(),
                self.chat.wait_for_user_state(0),
            )
            .await
            .ok(),
        };

        let Some(user_state) = user_state else {
            warn!("user state never arrived, skipping own-emote load");
            return;
        };
        if let Err(err) = self
            .repo
            .load_user_state_emotes(
                &user_state.global_emote_sets,
                &user_state.follower_emote_sets,
            )
            .await
        {
            warn!(error = %err, "failed to load own emotes");
        }
    }

    /// Drain the collectors, post per-channel provider notices and
    /// publish the reduced state.
    async fn finish_cycle(&self) {
        let data = self.data_failures.drain();
        let chat = self.chat_failures.drain();

        for (step, error) in &data {
            let provider = match step {
                DataLoadingStep::ChannelBttvEmotes { .. } => "BTTV",
                DataLoadingStep::ChannelFfzEmotes { .. } => "FFZ",
                DataLoadingStep::ChannelSevenTvEmotes { .. } => "7TV",
                _ => continue,
            };
            if let Some(channel) = step.channel() {
                self.chat
                    .post_system_message(
                        channel,
                        &format!(
                            "Failed to load {provider} channel emotes. ({})",
                            error.status_label()
                        ),
                    )
                    .await;
            }
        }

        let data_failures = data
            .into_iter()
            .map(|(step, error)| DataLoadingFailure { step, error })
            .collect();
        let chat_failures = chat
            .into_iter()
            .map(|(step, error)| ChatLoadingFailure { step, error })
            .collect();
        self.state_tx
            .send_replace(state::reduce(data_failures, chat_failures));
    }
}
