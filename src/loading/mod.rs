//! Aggregated data loading.
//!
//! A load cycle fans out every badge, emote and chat fetch
//! concurrently, records failures per step, runs one emote/badge
//! reconciliation pass after all steps settle and reduces the recorded
//! failures to a single [`DataLoadingState`] for the UI.

pub mod aggregator;
pub mod collector;
pub mod state;

pub use aggregator::DataLoader;
pub use state::DataLoadingState;

use crate::ident::{UserId, UserName};
use crate::error::LoadError;
use std::fmt;

/// One independently-failable fetch against a badge or emote provider.
///
/// Channel steps carry their channel so a failed step can be retried
/// exactly, and so provider failures can be reported into the right
/// channel's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataLoadingStep {
    GlobalBadges,
    SupporterBadges,
    GlobalBttvEmotes,
    GlobalFfzEmotes,
    GlobalSevenTvEmotes,
    ChannelBadges { channel: UserName, channel_id: UserId },
    ChannelBttvEmotes { channel: UserName, channel_id: UserId },
    ChannelFfzEmotes { channel: UserName, channel_id: UserId },
    ChannelSevenTvEmotes { channel: UserName, channel_id: UserId },
}

impl DataLoadingStep {
    /// Step name as shown in the reduced failure message. Channel steps
    /// share one label across channels so repeated failures collapse.
    pub fn label(&self) -> &'static str {
        match self {
            Self::GlobalBadges => "GlobalBadges",
            Self::SupporterBadges => "SupporterBadges",
            Self::GlobalBttvEmotes => "GlobalBttvEmotes",
            Self::GlobalFfzEmotes => "GlobalFfzEmotes",
            Self::GlobalSevenTvEmotes => "GlobalSevenTvEmotes",
            Self::ChannelBadges { .. } => "ChannelBadges",
            Self::ChannelBttvEmotes { .. } => "ChannelBttvEmotes",
            Self::ChannelFfzEmotes { .. } => "ChannelFfzEmotes",
            Self::ChannelSevenTvEmotes { .. } => "ChannelSevenTvEmotes",
        }
    }

    /// The channel a channel-scoped step belongs to.
    pub fn channel(&self) -> Option<&UserName> {
        match self {
            Self::ChannelBadges { channel, .. }
            | Self::ChannelBttvEmotes { channel, .. }
            | Self::ChannelFfzEmotes { channel, .. }
            | Self::ChannelSevenTvEmotes { channel, .. } => Some(channel),
            _ => None,
        }
    }
}

impl fmt::Display for DataLoadingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.channel() {
            Some(channel) => write!(f, "{} #{channel}", self.label()),
            None => f.write_str(self.label()),
        }
    }
}

/// A fetch that goes through the chat connection rather than a
/// provider endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLoadingStep {
    Chatters { channel: UserName },
    RecentMessages { channel: UserName },
}

impl ChatLoadingStep {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chatters { .. } => "Chatters",
            Self::RecentMessages { .. } => "RecentMessages",
        }
    }

    pub fn channel(&self) -> &UserName {
        match self {
            Self::Chatters { channel } | Self::RecentMessages { channel } => channel,
        }
    }
}

impl fmt::Display for ChatLoadingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.label(), self.channel())
    }
}

/// A recorded data-step failure, kept so the step can be re-run as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLoadingFailure {
    pub step: DataLoadingStep,
    pub error: LoadError,
}

/// A recorded chat-step failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLoadingFailure {
    pub step: ChatLoadingStep,
    pub error: LoadError,
}
