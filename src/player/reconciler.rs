//! Voice-state reconciliation.
//!
//! Every voice-state update from the gateway is reduced to an old/new pair of
//! [`VoiceSnapshot`]s and fed through [`VoiceStateReconciler::handle`], which
//! decides whether the guild's session has to be terminated, whether a
//! notification goes out, or whether an empty channel should be re-checked
//! after the session's `timeout`.
//!
//! The re-check is a one-shot task. It is never cancelled: later updates only
//! change what it observes when it wakes up, because it re-reads the live
//! membership of whatever connection the session holds at that moment.

use serenity::model::{
    id::{ChannelId, GuildId, UserId},
    voice::VoiceState,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, trace};

use super::{platform::PlatformClient, queue::Queue, registry::QueueRegistry, PlayerEvent};

/// Point-in-time voice presence of one guild member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceSnapshot {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub channel_id: Option<ChannelId>,
    /// Deafened by the server (not self-deafened).
    pub server_deaf: bool,
}

impl VoiceSnapshot {
    /// `None` for voice states that do not belong to a guild.
    pub fn from_voice_state(state: &VoiceState) -> Option<Self> {
        Some(Self {
            guild_id: state.guild_id?,
            user_id: state.user_id,
            channel_id: state.channel_id,
            server_deaf: state.deaf,
        })
    }

    /// The same member outside of any channel.
    pub fn departed(&self) -> Self {
        Self {
            channel_id: None,
            server_deaf: false,
            ..*self
        }
    }
}

pub(crate) struct VoiceStateReconciler<D> {
    registry: Arc<QueueRegistry<D>>,
    platform: Arc<dyn PlatformClient>,
    events: broadcast::Sender<PlayerEvent<D>>,
}

impl<D> VoiceStateReconciler<D>
where
    D: Send + Sync + 'static,
{
    pub(crate) fn new(
        registry: Arc<QueueRegistry<D>>,
        platform: Arc<dyn PlatformClient>,
        events: broadcast::Sender<PlayerEvent<D>>,
    ) -> Self {
        Self {
            registry,
            platform,
            events,
        }
    }

    pub(crate) async fn handle(&self, old: &VoiceSnapshot, new: &VoiceSnapshot) {
        let Some(queue) = self.registry.get(old.guild_id) else {
            trace!("Sin cola para guild {}, evento ignorado", old.guild_id);
            return;
        };
        let Some(connection) = queue.connection() else {
            trace!("Cola sin conexión en guild {}, evento ignorado", old.guild_id);
            return;
        };

        let me = self.platform.current_user_id();

        if new.channel_id.is_none() && me == Some(old.user_id) {
            if queue.leave().await {
                info!("🔌 Cliente desconectado del canal de voz en guild {}", old.guild_id);
                emit(&self.events, PlayerEvent::ClientDisconnect(queue));
            }
            return;
        }

        let options = queue.options();

        if options.deafen_on_join && old.server_deaf && !new.server_deaf {
            info!("🔈 El servidor quitó el ensordecimiento del cliente en guild {}", old.guild_id);
            emit(&self.events, PlayerEvent::ClientUndeafen(Arc::clone(&queue)));
        }

        if old.channel_id == new.channel_id {
            return;
        }
        if !options.leave_on_empty {
            return;
        }
        if connection.members().await.len() > 1 {
            return;
        }

        self.schedule_empty_check(queue);
    }

    fn schedule_empty_check(&self, queue: Arc<Queue<D>>) {
        let timeout = queue.options().timeout;
        let platform = Arc::clone(&self.platform);
        let events = self.events.clone();

        debug!(
            "⏳ Canal vacío en guild {}, revisando en {:?}",
            queue.guild_id(),
            timeout
        );

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            recheck_empty_channel(queue, platform.as_ref(), &events).await;
        });
    }
}

/// Runs when the empty-channel delay elapses. Everything is re-read: the
/// session may have been destroyed, reconnected, or re-populated meanwhile.
async fn recheck_empty_channel<D>(
    queue: Arc<Queue<D>>,
    platform: &dyn PlatformClient,
    events: &broadcast::Sender<PlayerEvent<D>>,
) {
    let Some(connection) = queue.connection() else {
        debug!("Cola en guild {} ya sin conexión", queue.guild_id());
        return;
    };

    let members = connection.members().await;
    // Bots count as members here, same as humans.
    if members.len() > 1 {
        debug!("Canal ocupado otra vez en guild {}, se cancela la salida", queue.guild_id());
        return;
    }

    let still_present = platform
        .current_user_id()
        .is_some_and(|me| members.contains(me));
    if !still_present {
        return;
    }

    if queue.leave().await {
        info!("🚪 Canal vacío, saliendo de guild {}", queue.guild_id());
        emit(events, PlayerEvent::ChannelEmpty(queue));
    }
}

fn emit<D>(events: &broadcast::Sender<PlayerEvent<D>>, event: PlayerEvent<D>) {
    // Sin suscriptores no hay a quién avisar.
    let _ = events.send(event);
}
