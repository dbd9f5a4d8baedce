//! Error types surfaced by the session core.

use serenity::model::id::GuildId;
use thiserror::Error;

/// Errors returned to callers of [`Player`](crate::player::Player) and
/// [`Queue`](crate::player::Queue).
///
/// The voice-state reconciler never produces these: a missing session, a
/// missing connection or stale state at timer-fire time are expected races
/// and are handled as silent no-ops.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The guild identifier could not be resolved by the client.
    #[error("invalid guild: {0} is not available to this client")]
    InvalidGuild(GuildId),

    /// The session was already terminated.
    #[error("queue for guild {0} has been destroyed")]
    QueueDestroyed(GuildId),

    /// The underlying voice connection rejected an operation.
    #[error("voice connection error: {0}")]
    Connection(String),
}

pub type PlayerResult<T> = std::result::Result<T, PlayerError>;
