//! # Player Module
//!
//! Per-guild playback sessions and their lifecycle.
//!
//! The [`Player`] owns one [`Queue`] per guild and reacts to voice-state
//! updates from the gateway:
//!
//! - **Self-disconnect**: the client was removed from voice, the session is
//!   terminated and [`PlayerEvent::ClientDisconnect`] is emitted.
//! - **Un-deafen**: with `deafen_on_join`, lifting the server deafen emits
//!   [`PlayerEvent::ClientUndeafen`].
//! - **Empty channel**: with `leave_on_empty`, the channel is re-checked after
//!   `timeout` and left if the client is still alone in it
//!   ([`PlayerEvent::ChannelEmpty`]).
//!
//! ## Example
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use open_player::player::{Player, PlayerOptions, PlayerOptionsOverride, PlatformClient};
//! # use serenity::model::id::GuildId;
//! # async fn example(platform: Arc<dyn PlatformClient>) -> anyhow::Result<()> {
//! let player: Player<String> = Player::new(platform, PlayerOptions::default());
//! let mut events = player.subscribe();
//!
//! let queue = player.create_queue(
//!     GuildId::new(123456789),
//!     PlayerOptionsOverride::default().leave_on_empty(false),
//!     "requested from #music".to_string(),
//! )?;
//! assert!(player.has_queue(queue.guild_id()));
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{} in {}", event.kind(), event.queue().guild_id());
//! }
//! # Ok(())
//! # }
//! ```

pub mod options;
pub mod platform;
pub mod queue;
pub mod reconciler;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use options::{PlayerOptions, PlayerOptionsOverride};
pub use platform::{GuildInfo, PlatformClient};
pub use queue::{ChannelMembers, Queue, VoiceConnection};
pub use reconciler::VoiceSnapshot;
pub use registry::QueueRegistry;

use serenity::model::id::GuildId;
use std::{fmt, sync::Arc};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheStore, SharedCache},
    error::{PlayerError, PlayerResult},
};
use reconciler::VoiceStateReconciler;

const EVENT_CAPACITY: usize = 64;

/// Lifecycle notifications, each carrying the affected session.
pub enum PlayerEvent<D> {
    /// The client was disconnected from voice; the session was terminated.
    ClientDisconnect(Arc<Queue<D>>),
    /// The server lifted the client's deafen.
    ClientUndeafen(Arc<Queue<D>>),
    /// The client was left alone in its channel; the session was terminated.
    ChannelEmpty(Arc<Queue<D>>),
}

impl<D> PlayerEvent<D> {
    pub fn queue(&self) -> &Arc<Queue<D>> {
        match self {
            Self::ClientDisconnect(queue)
            | Self::ClientUndeafen(queue)
            | Self::ChannelEmpty(queue) => queue,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ClientDisconnect(_) => "clientDisconnect",
            Self::ClientUndeafen(_) => "clientUndeafen",
            Self::ChannelEmpty(_) => "channelEmpty",
        }
    }
}

impl<D> Clone for PlayerEvent<D> {
    fn clone(&self) -> Self {
        match self {
            Self::ClientDisconnect(queue) => Self::ClientDisconnect(Arc::clone(queue)),
            Self::ClientUndeafen(queue) => Self::ClientUndeafen(Arc::clone(queue)),
            Self::ChannelEmpty(queue) => Self::ChannelEmpty(Arc::clone(queue)),
        }
    }
}

impl<D> fmt::Debug for PlayerEvent<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple(self.kind()).field(self.queue()).finish()
    }
}

/// Session registry plus voice-state reconciliation.
///
/// `D` is the caller payload attached to every queue.
pub struct Player<D> {
    registry: Arc<QueueRegistry<D>>,
    reconciler: VoiceStateReconciler<D>,
    platform: Arc<dyn PlatformClient>,
    defaults: PlayerOptions,
    events: broadcast::Sender<PlayerEvent<D>>,
    cache: SharedCache,
}

impl<D> Player<D>
where
    D: Send + Sync + 'static,
{
    /// Creates a player with process-wide `defaults` and an uninitialized
    /// lookup cache.
    pub fn new(platform: Arc<dyn PlatformClient>, defaults: PlayerOptions) -> Self {
        let registry = Arc::new(QueueRegistry::new());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let reconciler =
            VoiceStateReconciler::new(Arc::clone(&registry), Arc::clone(&platform), events.clone());

        Self {
            registry,
            reconciler,
            platform,
            defaults,
            events,
            cache: SharedCache::new(),
        }
    }

    /// Uses `cache` as the lookup cache handed out by [`Player::cache`].
    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn defaults(&self) -> &PlayerOptions {
        &self.defaults
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    /// Binds the lookup cache from the defaults.
    ///
    /// Does nothing unless the defaults carry `cache = true` and a
    /// `cache_path`; per-queue `cache` overrides only show up in that queue's
    /// options. Returns the bound store.
    pub async fn init_cache(&self, namespace: &str) -> Option<Arc<CacheStore>> {
        if !self.defaults.cache {
            debug!("Caché de búsquedas deshabilitado");
            return None;
        }

        let Some(base_path) = self.defaults.cache_path.as_deref() else {
            warn!("⚠️ Caché habilitado sin cache_path, se omite");
            return None;
        };

        let store = self.cache.initialize(base_path, namespace).await;
        info!(
            "💾 Caché de búsquedas listo en {} ({} entradas)",
            store.path().display(),
            store.len()
        );
        Some(store)
    }

    /// Returns the live queue of `guild_id`, creating it if needed.
    ///
    /// An existing, non-destroyed queue is returned unchanged: `overrides`
    /// and `data` are dropped in that case.
    ///
    /// # Errors
    ///
    /// [`PlayerError::InvalidGuild`] if the client does not know the guild.
    pub fn create_queue(
        &self,
        guild_id: GuildId,
        overrides: PlayerOptionsOverride,
        data: D,
    ) -> PlayerResult<Arc<Queue<D>>> {
        let guild = self.platform.resolve_guild(guild_id).ok_or_else(|| {
            warn!("❌ Guild {} desconocida para el cliente", guild_id);
            PlayerError::InvalidGuild(guild_id)
        })?;

        let (queue, created) = self.registry.get_or_insert_with(guild_id, || {
            Queue::new(guild_id, self.defaults.merge(&overrides), data)
        });

        if created {
            info!("📝 Cola creada para guild {} ({})", guild.id, guild.name);
        } else {
            debug!("Cola existente reutilizada en guild {}", guild_id);
        }

        Ok(queue)
    }

    /// `true` while an entry exists, destroyed or not.
    pub fn has_queue(&self, guild_id: GuildId) -> bool {
        self.registry.has(guild_id)
    }

    pub fn get_queue(&self, guild_id: GuildId) -> Option<Arc<Queue<D>>> {
        self.registry.get(guild_id)
    }

    /// Replaces the entry unconditionally. Destroy the previous queue first
    /// or its connection is orphaned.
    pub fn set_queue(&self, guild_id: GuildId, queue: Arc<Queue<D>>) {
        if let Some(previous) = self.registry.set(guild_id, queue) {
            if !previous.is_destroyed() {
                warn!("⚠️ Cola reemplazada sin destruir en guild {}", guild_id);
            }
        }
    }

    /// Removes the entry. The connection is not torn down.
    pub fn delete_queue(&self, guild_id: GuildId) {
        if self.registry.remove(guild_id).is_some() {
            debug!("🗑️ Cola eliminada del registro en guild {}", guild_id);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent<D>> {
        self.events.subscribe()
    }

    /// Feeds one voice-state transition into the reconciler.
    pub async fn handle_voice_state(&self, old: &VoiceSnapshot, new: &VoiceSnapshot) {
        self.reconciler.handle(old, new).await;
    }
}
