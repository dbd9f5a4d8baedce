use serenity::model::id::{GuildId, UserId};

/// Minimal guild handle returned by [`PlatformClient::resolve_guild`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    pub id: GuildId,
    pub name: String,
}

/// What the session core needs from the chat platform client.
#[cfg_attr(test, mockall::automock)]
pub trait PlatformClient: Send + Sync {
    /// Resolves a guild known to the client. `None` for unknown guilds.
    fn resolve_guild(&self, guild_id: GuildId) -> Option<GuildInfo>;

    /// Identity of the running client, once known.
    fn current_user_id(&self) -> Option<UserId>;
}
