//! Unified error handling for frostchat.
//!
//! This module provides the error hierarchy shared by the API client,
//! the command dispatcher and the data-loading aggregator. Dispatcher
//! failures are resolved to user-facing text inside the dispatcher;
//! loading failures are only classified here and rendered by the
//! loading-state reducer.

use thiserror::Error;

// ============================================================================
// Helix API Errors (command dispatch)
// ============================================================================

/// Structured error kinds reported by the Helix API.
///
/// The dispatcher maps each kind to one fixed user-facing message; see
/// `command::dispatcher`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelixError {
    /// The authenticated user lacks the required role.
    UserNotAuthorized,
    /// The server supplied a message that should be shown as-is.
    Forwarded,
    /// The OAuth token is missing a required scope.
    MissingScopes,
    /// No usable login credentials.
    NotLoggedIn,
    /// Whisper target is the sender.
    WhisperSelf,
    /// Whispers require a verified phone number.
    NoVerifiedPhone,
    /// The whisper recipient blocks whispers from the sender.
    RecipientBlockedUser,
    /// Generic rate limit.
    RateLimited,
    /// Whisper-specific rate limit.
    WhisperRateLimited,
    /// The endpoint requires a broadcaster token.
    BroadcasterTokenRequired,
    /// Target is already a moderator.
    TargetAlreadyModded,
    /// Target holds VIP status, which conflicts with the operation.
    TargetIsVip,
    /// Target is not a moderator.
    TargetNotModded,
    /// Target is not banned.
    TargetNotBanned,
    /// Target is already banned.
    TargetAlreadyBanned,
    /// Target may not be banned at all (e.g. staff).
    TargetCannotBeBanned,
    /// A concurrent ban operation raced this one.
    ConflictingBanOperation,
    /// Anything the client does not recognize.
    Unknown,
}

/// Errors produced by the Twitch API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A structured Helix failure: the request reached Twitch and was
    /// rejected with a classifiable status/body.
    #[error("{}", format_api_detail(url, *status, message.as_deref()))]
    Helix {
        /// Classified error kind.
        kind: HelixError,
        /// HTTP status code.
        status: u16,
        /// Request URL (without query credentials).
        url: String,
        /// Server-supplied message, if any.
        message: Option<String>,
    },

    /// Transport-level failure (connect, timeout, body decode).
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    /// The structured Helix kind, when this is a Helix rejection.
    pub fn helix_kind(&self) -> Option<HelixError> {
        match self {
            Self::Helix { kind, .. } => Some(*kind),
            Self::Http(_) => None,
        }
    }

    /// The server-supplied message, when one exists.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Helix { message, .. } => message.as_deref(),
            Self::Http(_) => None,
        }
    }
}

/// Result alias for API client calls.
pub type ApiResult<T> = Result<T, ApiError>;

fn format_api_detail(url: &str, status: u16, message: Option<&str>) -> String {
    match message {
        Some(message) => format!("{url}({status}): {message}"),
        None => format!("{url}({status})"),
    }
}

// ============================================================================
// Loading Errors (data aggregation)
// ============================================================================

/// Failure of one data-loading step.
///
/// Stored in the per-step failure collectors and rendered by the
/// loading-state reducer, so it is pre-flattened into clonable detail
/// rather than carrying a live error chain. The `Display` output is the
/// exact detail line the reducer appends to a step name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// A structured API failure with endpoint and status.
    #[error("{}", format_api_detail(url, *status, message.as_deref()))]
    Api {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Server-supplied message, if any.
        message: Option<String>,
    },

    /// Anything else, pre-rendered.
    #[error("{0}")]
    Other(String),
}

impl LoadError {
    /// HTTP status label for per-channel provider system messages;
    /// `"0"` when the failure was not an HTTP rejection.
    pub fn status_label(&self) -> String {
        match self {
            Self::Api { status, .. } => status.to_string(),
            Self::Other(_) => "0".to_string(),
        }
    }
}

impl From<ApiError> for LoadError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Helix {
                status,
                url,
                message,
                ..
            } => Self::Api {
                url,
                status,
                message,
            },
            ApiError::Http(err) => Self::Other(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_detail_with_message() {
        let err = ApiError::Helix {
            kind: HelixError::RateLimited,
            status: 429,
            url: "https://api.twitch.tv/helix/whispers".to_string(),
            message: Some("Too Many Requests".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "https://api.twitch.tv/helix/whispers(429): Too Many Requests"
        );
        assert_eq!(err.helix_kind(), Some(HelixError::RateLimited));
    }

    #[test]
    fn load_error_detail_without_message() {
        let err = LoadError::Api {
            url: "https://badges.example/global".to_string(),
            status: 404,
            message: None,
        };
        assert_eq!(err.to_string(), "https://badges.example/global(404)");
        assert_eq!(err.status_label(), "404");
    }

    #[test]
    fn other_load_error_keeps_text() {
        let err = LoadError::Other("connection reset".to_string());
        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(err.status_label(), "0");
    }
}
