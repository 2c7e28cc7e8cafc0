//! Pure input classification. No I/O.

use super::{CommandContext, TwitchCommand};
use crate::ident::{UserId, UserName};

/// Triggers handled natively by the IRC connection; they pass through
/// to the transport unchanged and never reach the dispatcher.
pub const IRC_COMMAND_TRIGGERS: [&str; 2] = ["me", "disconnect"];

/// Classification of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInput {
    /// Plain chat text (no prefix, bare prefix, or unknown trigger).
    /// The original text is preserved verbatim for transport.
    Chat,
    /// An IRC-native command; passes through unchanged.
    Irc,
    /// A recognized Twitch command with its invocation context.
    Twitch {
        command: TwitchCommand,
        context: CommandContext,
    },
}

/// Classify raw input against the fixed trigger table.
///
/// Arguments are whitespace-delimited; commands with a trailing
/// free-text argument rejoin the remaining tokens with single spaces in
/// the dispatcher.
pub fn parse_input(
    message: &str,
    prefix: char,
    channel: &UserName,
    channel_id: &UserId,
) -> ParsedInput {
    let Some(after_prefix) = message.strip_prefix(prefix) else {
        return ParsedInput::Chat;
    };
    // A bare prefix or "/ text" is chat, not a command.
    match after_prefix.chars().next() {
        None => return ParsedInput::Chat,
        Some(c) if c.is_whitespace() => return ParsedInput::Chat,
        Some(_) => {}
    }

    let mut tokens = message.split_whitespace();
    let trigger_token = tokens.next().unwrap_or_default();
    let trigger = &trigger_token[prefix.len_utf8()..];

    if IRC_COMMAND_TRIGGERS
        .iter()
        .any(|t| t.eq_ignore_ascii_case(trigger))
    {
        return ParsedInput::Irc;
    }

    match TwitchCommand::from_trigger(trigger) {
        Some(command) => ParsedInput::Twitch {
            command,
            context: CommandContext {
                trigger: trigger_token.to_string(),
                args: tokens.map(str::to_string).collect(),
                channel: channel.clone(),
                channel_id: channel_id.clone(),
                original_message: message.to_string(),
            },
        },
        None => ParsedInput::Chat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(message: &str) -> ParsedInput {
        parse_input(
            message,
            '/',
            &UserName::new("channel"),
            &UserId::new("123"),
        )
    }

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(parse("hello chat"), ParsedInput::Chat);
        assert_eq!(parse("ban hammer time"), ParsedInput::Chat);
    }

    #[test]
    fn bare_prefix_is_chat() {
        assert_eq!(parse("/"), ParsedInput::Chat);
        assert_eq!(parse("/ ban someone"), ParsedInput::Chat);
    }

    #[test]
    fn unknown_trigger_is_chat() {
        assert_eq!(parse("/frankerz"), ParsedInput::Chat);
    }

    #[test]
    fn irc_native_triggers_pass_through() {
        assert_eq!(parse("/me slaps the table"), ParsedInput::Irc);
        assert_eq!(parse("/ME loudly"), ParsedInput::Irc);
        assert_eq!(parse("/disconnect"), ParsedInput::Irc);
    }

    #[test]
    fn known_trigger_builds_context() {
        let ParsedInput::Twitch { command, context } = parse("/ban troll being rude") else {
            panic!("expected a twitch command");
        };
        assert_eq!(command, TwitchCommand::Ban);
        assert_eq!(context.trigger, "/ban");
        assert_eq!(context.args, vec!["troll", "being", "rude"]);
        assert_eq!(context.original_message, "/ban troll being rude");
        assert_eq!(context.channel, UserName::new("channel"));
    }

    #[test]
    fn trigger_match_ignores_case() {
        let ParsedInput::Twitch { command, context } = parse("/TIMEOUT troll 10m") else {
            panic!("expected a twitch command");
        };
        assert_eq!(command, TwitchCommand::Timeout);
        // The typed spelling is kept for usage messages.
        assert_eq!(context.trigger, "/TIMEOUT");
    }

    #[test]
    fn collapsed_whitespace_in_args() {
        let ParsedInput::Twitch { context, .. } = parse("/ban   troll   two  words") else {
            panic!("expected a twitch command");
        };
        assert_eq!(context.args, vec!["troll", "two", "words"]);
    }

    #[test]
    fn custom_prefix() {
        let result = parse_input(
            "!ban troll",
            '!',
            &UserName::new("channel"),
            &UserId::new("123"),
        );
        assert!(matches!(result, ParsedInput::Twitch { .. }));
    }
}
