//! Twitch command dispatch.
//!
//! Every moderation-style command follows the same shape: validate
//! usage locally, resolve the target login to an id, run the self and
//! broadcaster guards, make exactly one API call, then map the outcome
//! to user-facing text. Failures never leave this module as raw errors;
//! the caller only ever sees a [`CommandResult`].

use super::duration::duration_to_seconds;
use super::{CommandContext, CommandResult, TwitchCommand};
use crate::api::{AnnouncementColor, BanRequest, HelixUser, TwitchApi};
use crate::error::{ApiError, HelixError};
use crate::ident::{UserId, UserName};
use std::sync::Arc;
use tracing::debug;

const GENERIC_ERROR_MESSAGE: &str = "An unknown error has occurred.";
const USER_NOT_FOUND_MESSAGE: &str = "No user matching that username.";
const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

/// Executes parsed Twitch commands against the API.
pub struct CommandDispatcher {
    api: Arc<dyn TwitchApi>,
}

impl CommandDispatcher {
    /// Create a dispatcher over an API client.
    pub fn new(api: Arc<dyn TwitchApi>) -> Self {
        Self { api }
    }

    /// Dispatch one command. `current_user` is the authenticated
    /// session user; without one, no command reaches the API.
    pub async fn handle(
        &self,
        command: TwitchCommand,
        context: &CommandContext,
        current_user: Option<&UserId>,
    ) -> CommandResult {
        let Some(current_user) = current_user else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "You must be logged in to use the {} command",
                    context.trigger
                ),
            );
        };

        match command {
            TwitchCommand::Announce
            | TwitchCommand::AnnounceBlue
            | TwitchCommand::AnnounceGreen
            | TwitchCommand::AnnounceOrange
            | TwitchCommand::AnnouncePurple => {
                self.send_announcement(command, current_user, context).await
            }

            TwitchCommand::Ban => self.ban_user(command, current_user, context).await,
            TwitchCommand::Timeout => self.timeout_user(command, current_user, context).await,
            TwitchCommand::Unban | TwitchCommand::Untimeout => {
                self.unban_user(command, current_user, context).await
            }

            TwitchCommand::Mod => self.add_moderator(command, context).await,
            TwitchCommand::Unmod => self.remove_moderator(command, context).await,
            TwitchCommand::Mods => self.get_moderators(command, context).await,
            TwitchCommand::Vip => self.add_vip(command, context).await,
            TwitchCommand::Unvip => self.remove_vip(command, context).await,
            TwitchCommand::Vips => self.get_vips(command, context).await,

            TwitchCommand::Whisper => self.send_whisper(command, current_user, context).await,

            // Recognized but not implemented against the API yet; the
            // original text still goes out over the transport.
            TwitchCommand::Clear
            | TwitchCommand::Color
            | TwitchCommand::Commercial
            | TwitchCommand::Delete
            | TwitchCommand::EmoteOnly
            | TwitchCommand::EmoteOnlyOff
            | TwitchCommand::Followers
            | TwitchCommand::FollowersOff
            | TwitchCommand::Marker
            | TwitchCommand::R9kBeta
            | TwitchCommand::R9kBetaOff
            | TwitchCommand::Raid
            | TwitchCommand::Slow
            | TwitchCommand::SlowOff
            | TwitchCommand::Subscribers
            | TwitchCommand::SubscribersOff
            | TwitchCommand::UniqueChat
            | TwitchCommand::UniqueChatOff
            | TwitchCommand::Unraid => CommandResult::Message(context.original_message.clone()),
        }
    }

    /// Resolve a target login to a full user record. A failed lookup is
    /// already a complete command outcome.
    async fn resolve_target(
        &self,
        command: TwitchCommand,
        login: &str,
    ) -> Result<HelixUser, CommandResult> {
        self.api
            .get_user_by_name(&UserName::new(login))
            .await
            .map_err(|err| {
                debug!(command = ?command, error = %err, "target lookup failed");
                CommandResult::accepted_with(command, USER_NOT_FOUND_MESSAGE)
            })
    }

    async fn send_announcement(
        &self,
        command: TwitchCommand,
        current_user: &UserId,
        context: &CommandContext,
    ) -> CommandResult {
        if first_arg(context).is_none() {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <message> - Call attention to your message with a highlight.",
                    context.trigger
                ),
            );
        }

        let message = context.args.join(" ");
        let color = match command {
            TwitchCommand::AnnounceBlue => AnnouncementColor::Blue,
            TwitchCommand::AnnounceGreen => AnnouncementColor::Green,
            TwitchCommand::AnnounceOrange => AnnouncementColor::Orange,
            TwitchCommand::AnnouncePurple => AnnouncementColor::Purple,
            _ => AnnouncementColor::Primary,
        };

        match self
            .api
            .send_announcement(&context.channel_id, current_user, &message, color)
            .await
        {
            Ok(()) => CommandResult::accepted(command),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to send announcement - {}",
                    error_message(&err, command, None)
                ),
            ),
        }
    }

    async fn send_whisper(
        &self,
        command: TwitchCommand,
        current_user: &UserId,
        context: &CommandContext,
    ) -> CommandResult {
        let usage = || {
            CommandResult::accepted_with(
                command,
                format!("Usage: {} <username> <message>", context.trigger),
            )
        };
        let (Some(target_login), Some(_)) = (first_arg(context), nonblank_arg(context, 1)) else {
            return usage();
        };

        let target_id = match self
            .api
            .get_user_id_by_name(&UserName::new(target_login))
            .await
        {
            Ok(id) => id,
            Err(err) => {
                debug!(command = ?command, error = %err, "target lookup failed");
                return CommandResult::accepted_with(command, USER_NOT_FOUND_MESSAGE);
            }
        };

        // Self-check runs after the lookup: the send needs the target
        // id anyway, and aliases may resolve to the session user.
        if target_id == *current_user {
            return CommandResult::accepted_with(
                command,
                "Failed to send whisper - You cannot whisper yourself.",
            );
        }

        let message = context.args[1..].join(" ");
        match self
            .api
            .send_whisper(current_user, &target_id, &message)
            .await
        {
            Ok(()) => CommandResult::accepted_with(command, "Whisper sent."),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to send whisper - {}",
                    error_message(&err, command, None)
                ),
            ),
        }
    }

    async fn get_moderators(
        &self,
        command: TwitchCommand,
        context: &CommandContext,
    ) -> CommandResult {
        match self.api.get_moderators(&context.channel_id).await {
            Ok(moderators) if moderators.is_empty() => CommandResult::accepted_with(
                command,
                "This channel does not have any moderators.",
            ),
            Ok(moderators) => CommandResult::accepted_with(
                command,
                format!(
                    "The moderators of this channel are {}.",
                    join_names(&moderators)
                ),
            ),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to list moderators - {}",
                    error_message(&err, command, None)
                ),
            ),
        }
    }

    async fn add_moderator(
        &self,
        command: TwitchCommand,
        context: &CommandContext,
    ) -> CommandResult {
        let Some(target_login) = first_arg(context) else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> - Grant moderation status to a user.",
                    context.trigger
                ),
            );
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        let formatted_name = target.format_name();
        match self
            .api
            .add_moderator(&context.channel_id, &target.id)
            .await
        {
            Ok(()) => CommandResult::accepted_with(
                command,
                format!("You have added {formatted_name} as a moderator of this channel."),
            ),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to add channel moderator - {}",
                    error_message(&err, command, Some(&formatted_name))
                ),
            ),
        }
    }

    async fn remove_moderator(
        &self,
        command: TwitchCommand,
        context: &CommandContext,
    ) -> CommandResult {
        let Some(target_login) = first_arg(context) else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> - Revoke moderation status from a user.",
                    context.trigger
                ),
            );
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        let formatted_name = target.format_name();
        match self
            .api
            .remove_moderator(&context.channel_id, &target.id)
            .await
        {
            Ok(()) => CommandResult::accepted_with(
                command,
                format!("You have removed {formatted_name} as a moderator of this channel."),
            ),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to remove channel moderator - {}",
                    error_message(&err, command, Some(&formatted_name))
                ),
            ),
        }
    }

    async fn get_vips(&self, command: TwitchCommand, context: &CommandContext) -> CommandResult {
        match self.api.get_vips(&context.channel_id).await {
            Ok(vips) if vips.is_empty() => {
                CommandResult::accepted_with(command, "This channel does not have any VIPs.")
            }
            Ok(vips) => CommandResult::accepted_with(
                command,
                format!("The vips of this channel are {}.", join_names(&vips)),
            ),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to list VIPs - {}",
                    error_message(&err, command, None)
                ),
            ),
        }
    }

    async fn add_vip(&self, command: TwitchCommand, context: &CommandContext) -> CommandResult {
        let Some(target_login) = first_arg(context) else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> - Grant VIP status to a user.",
                    context.trigger
                ),
            );
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        let formatted_name = target.format_name();
        match self.api.add_vip(&context.channel_id, &target.id).await {
            Ok(()) => CommandResult::accepted_with(
                command,
                format!("You have added {formatted_name} as a VIP of this channel."),
            ),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to add VIP - {}",
                    error_message(&err, command, Some(&formatted_name))
                ),
            ),
        }
    }

    async fn remove_vip(&self, command: TwitchCommand, context: &CommandContext) -> CommandResult {
        let Some(target_login) = first_arg(context) else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> - Revoke VIP status from a user.",
                    context.trigger
                ),
            );
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        let formatted_name = target.format_name();
        match self.api.remove_vip(&context.channel_id, &target.id).await {
            Ok(()) => CommandResult::accepted_with(
                command,
                format!("You have removed {formatted_name} as a VIP of this channel."),
            ),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to remove VIP - {}",
                    error_message(&err, command, Some(&formatted_name))
                ),
            ),
        }
    }

    async fn ban_user(
        &self,
        command: TwitchCommand,
        current_user: &UserId,
        context: &CommandContext,
    ) -> CommandResult {
        let Some(target_login) = first_arg(context) else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> [reason] - Permanently prevent a user from chatting. \
                     Reason is optional and will be shown to the target user and other moderators. \
                     Use /unban to remove a ban.",
                    context.trigger
                ),
            );
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        if target.id == *current_user {
            return CommandResult::accepted_with(
                command,
                "Failed to ban user - You cannot ban yourself.",
            );
        } else if target.id == context.channel_id {
            return CommandResult::accepted_with(
                command,
                "Failed to ban user - You cannot ban the broadcaster.",
            );
        }

        let reason = rest_joined(context, 1);
        let request = BanRequest {
            user_id: target.id.clone(),
            duration: None,
            reason,
        };
        match self
            .api
            .ban_user(&context.channel_id, current_user, &request)
            .await
        {
            Ok(()) => CommandResult::accepted(command),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to ban user - {}",
                    error_message(&err, command, Some(&target.format_name()))
                ),
            ),
        }
    }

    async fn timeout_user(
        &self,
        command: TwitchCommand,
        current_user: &UserId,
        context: &CommandContext,
    ) -> CommandResult {
        let usage = || {
            CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> [duration][time unit] [reason] - \
                     Temporarily prevent a user from chatting. Duration (optional, \
                     default=10 minutes) must be a positive integer; time unit \
                     (optional, default=s) must be one of s, m, h, d, w; maximum \
                     duration is 2 weeks. Combinations like 1d2h are also allowed. \
                     Reason is optional and will be shown to the target user and other \
                     moderators. Use /untimeout to remove a timeout.",
                    context.trigger
                ),
            )
        };
        let Some(target_login) = first_arg(context) else {
            return usage();
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        if target.id == *current_user {
            return CommandResult::accepted_with(
                command,
                "Failed to ban user - You cannot timeout yourself.",
            );
        } else if target.id == context.channel_id {
            return CommandResult::accepted_with(
                command,
                "Failed to ban user - You cannot timeout the broadcaster.",
            );
        }

        let duration = match nonblank_arg(context, 1) {
            Some(raw) => match duration_to_seconds(raw.trim()) {
                Some(seconds) => seconds,
                None => return usage(),
            },
            None => DEFAULT_TIMEOUT_SECONDS,
        };
        let reason = rest_joined(context, 2);

        let request = BanRequest {
            user_id: target.id.clone(),
            duration: Some(duration),
            reason,
        };
        match self
            .api
            .ban_user(&context.channel_id, current_user, &request)
            .await
        {
            Ok(()) => CommandResult::accepted(command),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to timeout user - {}",
                    error_message(&err, command, Some(&target.format_name()))
                ),
            ),
        }
    }

    async fn unban_user(
        &self,
        command: TwitchCommand,
        current_user: &UserId,
        context: &CommandContext,
    ) -> CommandResult {
        let Some(target_login) = first_arg(context) else {
            return CommandResult::accepted_with(
                command,
                format!(
                    "Usage: {} <username> - Removes a ban on a user.",
                    context.trigger
                ),
            );
        };
        let target = match self.resolve_target(command, target_login).await {
            Ok(target) => target,
            Err(result) => return result,
        };

        match self
            .api
            .unban_user(&context.channel_id, current_user, &target.id)
            .await
        {
            Ok(()) => CommandResult::accepted(command),
            Err(err) => CommandResult::accepted_with(
                command,
                format!(
                    "Failed to unban user - {}",
                    error_message(&err, command, Some(&target.format_name()))
                ),
            ),
        }
    }
}

fn first_arg(context: &CommandContext) -> Option<&str> {
    nonblank_arg(context, 0)
}

fn nonblank_arg(context: &CommandContext, index: usize) -> Option<&str> {
    context
        .args
        .get(index)
        .map(String::as_str)
        .filter(|arg| !arg.trim().is_empty())
}

/// Remaining tokens from `from` on, rejoined with single spaces; `None`
/// when blank.
fn rest_joined(context: &CommandContext, from: usize) -> Option<String> {
    let rest = context.args.get(from..).unwrap_or_default().join(" ");
    (!rest.trim().is_empty()).then_some(rest)
}

fn join_names(users: &[crate::api::ChannelUser]) -> String {
    users
        .iter()
        .map(crate::api::ChannelUser::format_name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map an API failure to its fixed user-facing message.
///
/// `formatted_user` replaces the generic "The target user" phrase when
/// the failing command had a resolved target.
fn error_message(
    err: &ApiError,
    command: TwitchCommand,
    formatted_user: Option<&str>,
) -> String {
    debug!(command = ?command, error = %err, "twitch command failed");
    let Some(kind) = err.helix_kind() else {
        return GENERIC_ERROR_MESSAGE.to_string();
    };

    let target = formatted_user.unwrap_or("The target user");
    match kind {
        HelixError::UserNotAuthorized => {
            "You don't have permission to perform that action.".to_string()
        }
        HelixError::Forwarded => err
            .server_message()
            .map(str::to_string)
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string()),
        HelixError::MissingScopes => {
            "Missing required scope. Re-login with your account and try again.".to_string()
        }
        HelixError::NotLoggedIn => {
            "Missing login credentials. Re-login with your account and try again.".to_string()
        }
        HelixError::WhisperSelf => "You cannot whisper yourself.".to_string(),
        HelixError::NoVerifiedPhone => {
            "Due to Twitch restrictions, you are now required to have a verified phone number \
             to send whispers. You can add a phone number in Twitch settings. \
             https://www.twitch.tv/settings/security"
                .to_string()
        }
        HelixError::RecipientBlockedUser => {
            "The recipient doesn't allow whispers from strangers or you directly.".to_string()
        }
        HelixError::RateLimited => {
            "You are being rate-limited by Twitch. Try again in a few seconds.".to_string()
        }
        HelixError::WhisperRateLimited => {
            "You may only whisper a maximum of 40 unique recipients per day. Within the per day \
             limit, you may whisper a maximum of 3 whispers per second and a maximum of 100 \
             whispers per minute."
                .to_string()
        }
        HelixError::BroadcasterTokenRequired => {
            "Due to Twitch restrictions, this command can only be used by the broadcaster. \
             Please use the Twitch website instead."
                .to_string()
        }
        HelixError::TargetAlreadyModded => {
            format!("{target} is already a moderator of this channel.")
        }
        HelixError::TargetIsVip => {
            format!("{target} is currently a VIP, /unvip them and retry this command.")
        }
        HelixError::TargetNotModded => format!("{target} is not a moderator of this channel."),
        HelixError::TargetNotBanned => format!("{target} is not banned from this channel."),
        HelixError::TargetAlreadyBanned => format!("{target} is already banned in this channel."),
        HelixError::TargetCannotBeBanned => format!(
            "You cannot {} {}.",
            command.trigger(),
            formatted_user.unwrap_or("this user")
        ),
        HelixError::ConflictingBanOperation => {
            "There was a conflicting ban operation on this user. Please try again.".to_string()
        }
        HelixError::Unknown => GENERIC_ERROR_MESSAGE.to_string(),
    }
}
