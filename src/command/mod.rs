//! Command resolution: grammar, trigger table and dispatch.
//!
//! Outgoing chat input is classified by [`grammar::parse_input`] into
//! plain text, an IRC-native command that passes through unchanged, or
//! a Twitch command that [`dispatcher::CommandDispatcher`] executes
//! against the Helix API.

pub mod dispatcher;
pub mod duration;
pub mod grammar;

pub use dispatcher::CommandDispatcher;
pub use grammar::{ParsedInput, parse_input};

use crate::ident::{UserId, UserName};

/// The closed set of recognized Twitch command triggers.
///
/// Placeholders (room modes, raids, markers and the like) are
/// recognized so they are not mistaken for chat text, but dispatch
/// passes their original message through to the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TwitchCommand {
    Announce,
    AnnounceBlue,
    AnnounceGreen,
    AnnounceOrange,
    AnnouncePurple,
    Ban,
    Clear,
    Color,
    Commercial,
    Delete,
    EmoteOnly,
    EmoteOnlyOff,
    Followers,
    FollowersOff,
    Marker,
    Mod,
    Mods,
    R9kBeta,
    R9kBetaOff,
    Raid,
    Slow,
    SlowOff,
    Subscribers,
    SubscribersOff,
    Timeout,
    Unban,
    UniqueChat,
    UniqueChatOff,
    Unmod,
    Unraid,
    Untimeout,
    Unvip,
    Vip,
    Vips,
    Whisper,
}

impl TwitchCommand {
    /// Every recognized command, in trigger-table order.
    pub const ALL: [TwitchCommand; 35] = [
        Self::Announce,
        Self::AnnounceBlue,
        Self::AnnounceGreen,
        Self::AnnounceOrange,
        Self::AnnouncePurple,
        Self::Ban,
        Self::Clear,
        Self::Color,
        Self::Commercial,
        Self::Delete,
        Self::EmoteOnly,
        Self::EmoteOnlyOff,
        Self::Followers,
        Self::FollowersOff,
        Self::Marker,
        Self::Mod,
        Self::Mods,
        Self::R9kBeta,
        Self::R9kBetaOff,
        Self::Raid,
        Self::Slow,
        Self::SlowOff,
        Self::Subscribers,
        Self::SubscribersOff,
        Self::Timeout,
        Self::Unban,
        Self::UniqueChat,
        Self::UniqueChatOff,
        Self::Unmod,
        Self::Unraid,
        Self::Untimeout,
        Self::Unvip,
        Self::Vip,
        Self::Vips,
        Self::Whisper,
    ];

    /// Canonical trigger keyword, without the command prefix.
    pub fn trigger(self) -> &'static str {
        match self {
            Self::Announce => "announce",
            Self::AnnounceBlue => "announceblue",
            Self::AnnounceGreen => "announcegreen",
            Self::AnnounceOrange => "announceorange",
            Self::AnnouncePurple => "announcepurple",
            Self::Ban => "ban",
            Self::Clear => "clear",
            Self::Color => "color",
            Self::Commercial => "commercial",
            Self::Delete => "delete",
            Self::EmoteOnly => "emoteonly",
            Self::EmoteOnlyOff => "emoteonlyoff",
            Self::Followers => "followers",
            Self::FollowersOff => "followersoff",
            Self::Marker => "marker",
            Self::Mod => "mod",
            Self::Mods => "mods",
            Self::R9kBeta => "r9kbeta",
            Self::R9kBetaOff => "r9kbetaoff",
            Self::Raid => "raid",
            Self::Slow => "slow",
            Self::SlowOff => "slowoff",
            Self::Subscribers => "subscribers",
            Self::SubscribersOff => "subscribersoff",
            Self::Timeout => "timeout",
            Self::Unban => "unban",
            Self::UniqueChat => "uniquechat",
            Self::UniqueChatOff => "uniquechatoff",
            Self::Unmod => "unmod",
            Self::Unraid => "unraid",
            Self::Untimeout => "untimeout",
            Self::Unvip => "unvip",
            Self::Vip => "vip",
            Self::Vips => "vips",
            Self::Whisper => "w",
        }
    }

    /// Case-insensitive trigger lookup.
    pub fn from_trigger(trigger: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|command| command.trigger().eq_ignore_ascii_case(trigger))
    }
}

/// Per-invocation command context, created fresh from one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// The trigger token as typed, including the prefix (`/ban`).
    pub trigger: String,
    /// Whitespace-split arguments after the trigger.
    pub args: Vec<String>,
    /// Channel the input was typed in.
    pub channel: UserName,
    /// Broadcaster id of that channel.
    pub channel_id: UserId,
    /// The unmodified input line.
    pub original_message: String,
}

/// Outcome of resolving one input line.
///
/// Exactly one variant is produced per submission; it determines the
/// caller's next action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Consumed with no output.
    Accepted,
    /// Suppressed by the ignore layer; nothing is sent.
    Blocked,
    /// IRC-native command; the original text goes to the transport
    /// unmodified.
    IrcCommand,
    /// Not a command; the original text is sent as chat.
    NotFound,
    /// A Twitch command was dispatched; `response` is posted as a
    /// system message when present.
    AcceptedTwitchCommand {
        command: TwitchCommand,
        response: Option<String>,
    },
    /// Handled by a caller-side command layer with a response to post.
    AcceptedWithResponse { response: String },
    /// Rewritten text to send in place of the input.
    Message(String),
}

impl CommandResult {
    pub(crate) fn accepted(command: TwitchCommand) -> Self {
        Self::AcceptedTwitchCommand {
            command,
            response: None,
        }
    }

    pub(crate) fn accepted_with(command: TwitchCommand, response: impl Into<String>) -> Self {
        Self::AcceptedTwitchCommand {
            command,
            response: Some(response.into()),
        }
    }
}
