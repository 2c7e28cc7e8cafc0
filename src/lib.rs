//! frostchat - Twitch chat command and data-loading engine
//!
//! The embeddable core of a Twitch chat client: classifies outgoing
//! input against the fixed command grammar, dispatches recognized
//! commands against the Helix API and runs the aggregated load cycles
//! that fetch badges, emotes and chat history for joined channels.

pub mod api;
pub mod chat;
pub mod command;
pub mod config;
pub mod error;
pub mod ident;
pub mod loading;
pub mod repo;
pub mod session;
pub mod telemetry;

pub use api::{HelixClient, TwitchApi};
pub use chat::{ChatTransport, RoomState, UserState};
pub use command::{CommandContext, CommandDispatcher, CommandResult, TwitchCommand};
pub use config::EngineConfig;
pub use error::{ApiError, HelixError, LoadError};
pub use ident::{DisplayName, UserId, UserName};
pub use loading::{DataLoader, DataLoadingState};
pub use repo::DataRepository;
pub use session::{ChatSession, StreamData};
