//! # Bot Module
//!
//! Discord integration for Open Player.
//!
//! This module connects the gateway to the session core:
//! - Voice state updates are turned into [`VoiceSnapshot`] pairs and fed to
//!   the [`Player`]
//! - `/join` and `/leave` create, connect and terminate queues
//! - Player notifications are announced in the originating text channel
//!
//! ## Architecture
//!
//! [`OpenPlayerBot`] implements Serenity's [`EventHandler`] trait. The
//! platform side of the core ([`PlatformClient`]) is provided by
//! [`SerenityPlatform`], which reads from the client's cache once it is bound.

use serenity::{
    all::{ChannelId, Context, EventHandler, GuildId, Interaction, Ready, UserId, VoiceState},
    async_trait,
    cache::Cache,
};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

pub mod commands;
pub mod connection;
pub mod events;

use crate::{
    config::Config,
    player::{GuildInfo, PlatformClient, Player, VoiceSnapshot},
};

/// Payload attached to every queue created from Discord.
#[derive(Debug, Clone)]
pub struct GuildSession {
    /// Channel where lifecycle notices are posted.
    pub text_channel: ChannelId,
    /// Member mentioned in those notices.
    pub requested_by: UserId,
}

/// [`PlatformClient`] backed by the serenity cache.
///
/// Until [`SerenityPlatform::bind`] runs every guild is unknown and the
/// client has no identity.
#[derive(Default)]
pub struct SerenityPlatform {
    cache: OnceLock<Arc<Cache>>,
}

impl SerenityPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds the client cache. Later calls are ignored.
    pub fn bind(&self, cache: Arc<Cache>) {
        if self.cache.set(cache).is_err() {
            warn!("⚠️ Caché de serenity ya enlazado, se ignora");
        }
    }
}

impl PlatformClient for SerenityPlatform {
    fn resolve_guild(&self, guild_id: GuildId) -> Option<GuildInfo> {
        let guild = self.cache.get()?.guild(guild_id)?;
        Some(GuildInfo {
            id: guild.id,
            name: guild.name.clone(),
        })
    }

    fn current_user_id(&self) -> Option<UserId> {
        self.cache.get().map(|cache| cache.current_user().id)
    }
}

/// Main Discord event handler for Open Player.
pub struct OpenPlayerBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    /// Session registry and voice-state reconciler
    pub player: Arc<Player<GuildSession>>,
}

impl OpenPlayerBot {
    pub fn new(config: Config, player: Arc<Player<GuildSession>>) -> Self {
        Self {
            config: Arc::new(config),
            player,
        }
    }

    /// Registers slash commands, per guild when `GUILD_ID` is set (faster
    /// propagation during development), globally otherwise.
    async fn register_commands(&self, ctx: &Context) -> anyhow::Result<()> {
        info!("📝 Registrando comandos slash...");

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);
                commands::register_guild_commands(ctx, guild_id).await?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx).await?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl EventHandler for OpenPlayerBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = commands::handle_command(&ctx, command, self).await {
                error!("Error manejando comando: {:?}", e);
            }
        }
    }

    /// Forwards every guild voice state transition to the player.
    ///
    /// Without a cached previous state the member is treated as coming from
    /// outside any channel.
    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(new) = VoiceSnapshot::from_voice_state(&new) else {
            return;
        };
        let old = old
            .as_ref()
            .and_then(VoiceSnapshot::from_voice_state)
            .unwrap_or_else(|| new.departed());

        self.player.handle_voice_state(&old, &new).await;
    }
}
