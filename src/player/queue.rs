use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, info};

use super::options::PlayerOptions;
use crate::error::{PlayerError, PlayerResult};

/// Point-in-time membership of a voice channel, the client included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMembers {
    members: Vec<UserId>,
}

impl ChannelMembers {
    pub fn new(members: impl IntoIterator<Item = UserId>) -> Self {
        members.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, user_id: UserId) -> bool {
        self.members.contains(&user_id)
    }
}

impl FromIterator<UserId> for ChannelMembers {
    fn from_iter<I: IntoIterator<Item = UserId>>(iter: I) -> Self {
        let mut members: Vec<UserId> = iter.into_iter().collect();
        members.sort_unstable();
        members.dedup();
        Self { members }
    }
}

/// Transport-side view of an active voice connection.
///
/// Implementations must answer membership queries from live state, never
/// from a snapshot taken when the connection was created.
#[async_trait]
pub trait VoiceConnection: Send + Sync {
    /// Voice channel the connection is currently attached to.
    async fn channel_id(&self) -> Option<ChannelId>;

    /// Current members of the connected channel.
    async fn members(&self) -> ChannelMembers;

    /// Sets the client's server-side deafen state in its guild.
    async fn set_deafened(&self, deafened: bool) -> PlayerResult<()>;

    /// Tears the connection down. Repeated calls must be harmless.
    async fn disconnect(&self);
}

/// Per-guild playback session.
///
/// Owned by the registry and shared as `Arc<Queue<D>>`. `D` is an opaque
/// caller payload that the core never looks at.
pub struct Queue<D> {
    guild_id: GuildId,
    options: PlayerOptions,
    connection: RwLock<Option<Arc<dyn VoiceConnection>>>,
    data: D,
    destroyed: AtomicBool,
    created_at: DateTime<Utc>,
}

impl<D> Queue<D> {
    pub(crate) fn new(guild_id: GuildId, options: PlayerOptions, data: D) -> Self {
        Self {
            guild_id,
            options,
            connection: RwLock::new(None),
            data,
            destroyed: AtomicBool::new(false),
            created_at: Utc::now(),
        }
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn options(&self) -> &PlayerOptions {
        &self.options
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Returns the current connection, if any. Callers holding the returned
    /// handle across an await must expect it to be stale.
    pub fn connection(&self) -> Option<Arc<dyn VoiceConnection>> {
        self.connection.read().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Attaches a voice connection to the session.
    ///
    /// With `deafen_on_join` the client is server-deafened through the
    /// connection before it is stored; a failure leaves the session
    /// unconnected. If the session is terminated while the deafen is in
    /// flight, the new connection is torn down instead of stored.
    pub async fn join(&self, connection: Arc<dyn VoiceConnection>) -> PlayerResult<()> {
        if self.is_destroyed() {
            return Err(PlayerError::QueueDestroyed(self.guild_id));
        }

        if self.options.deafen_on_join {
            connection.set_deafened(true).await?;
        }

        // `leave` marca la cola antes de tomar este lock
        {
            let mut slot = self.connection.write();
            if !self.is_destroyed() {
                if slot.replace(connection).is_some() {
                    debug!("Conexión reemplazada en guild {}", self.guild_id);
                }
                info!("🔊 Cola conectada en guild {}", self.guild_id);
                return Ok(());
            }
        }

        debug!(
            "Cola destruida durante la conexión en guild {}, se descarta",
            self.guild_id
        );
        connection.disconnect().await;
        Err(PlayerError::QueueDestroyed(self.guild_id))
    }

    /// Terminates the session.
    ///
    /// Idempotent: only the first call marks the queue destroyed and
    /// disconnects the transport. Returns `true` for that first call.
    pub async fn leave(&self) -> bool {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return false;
        }

        let connection = self.connection.write().take();
        if let Some(connection) = connection {
            connection.disconnect().await;
        }

        info!("👋 Cola destruida en guild {}", self.guild_id);
        true
    }
}

impl<D> fmt::Debug for Queue<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("guild_id", &self.guild_id)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .field("destroyed", &self.is_destroyed())
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::test_support::FakeConnection;
    use std::time::Duration;

    fn queue(options: PlayerOptions) -> Queue<()> {
        Queue::new(GuildId::new(1), options, ())
    }

    #[test]
    fn channel_members_dedups_and_answers_containment() {
        let members = ChannelMembers::new([UserId::new(3), UserId::new(1), UserId::new(3)]);

        assert_eq!(members.len(), 2);
        assert!(members.contains(UserId::new(1)));
        assert!(!members.contains(UserId::new(2)));
        assert!(ChannelMembers::default().is_empty());
    }

    #[tokio::test]
    async fn leave_disconnects_exactly_once() {
        let queue = queue(PlayerOptions::default());
        let connection = FakeConnection::new(10, &[100]);
        queue.join(connection.clone()).await.unwrap();

        assert!(queue.leave().await);
        assert!(!queue.leave().await);

        assert!(queue.is_destroyed());
        assert!(!queue.is_connected());
        assert_eq!(connection.disconnects(), 1);
    }

    #[tokio::test]
    async fn leave_without_connection_still_destroys() {
        let queue = queue(PlayerOptions::default());

        assert!(queue.leave().await);
        assert!(queue.is_destroyed());
    }

    #[tokio::test]
    async fn join_deafens_when_configured() {
        let queue = queue(PlayerOptions {
            deafen_on_join: true,
            ..Default::default()
        });
        let connection = FakeConnection::new(10, &[100]);

        queue.join(connection.clone()).await.unwrap();

        assert!(connection.is_deafened());
        assert!(queue.is_connected());
    }

    #[tokio::test]
    async fn join_leaves_deafen_alone_by_default() {
        let queue = queue(PlayerOptions::default());
        let connection = FakeConnection::new(10, &[100]);

        queue.join(connection.clone()).await.unwrap();

        assert!(!connection.is_deafened());
    }

    #[tokio::test]
    async fn join_after_leave_is_rejected() {
        let queue = queue(PlayerOptions::default());
        queue.leave().await;

        let result = queue.join(FakeConnection::new(10, &[100])).await;

        assert!(matches!(result, Err(PlayerError::QueueDestroyed(_))));
        assert!(!queue.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn leave_during_deafen_tears_down_the_new_connection() {
        let queue = Arc::new(queue(PlayerOptions {
            deafen_on_join: true,
            ..Default::default()
        }));
        let connection = FakeConnection::with_deafen_delay(10, &[100], Duration::from_millis(50));

        let joining = tokio::spawn({
            let queue = Arc::clone(&queue);
            let connection: Arc<dyn VoiceConnection> = connection.clone();
            async move { queue.join(connection).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(queue.leave().await);
        let result = joining.await.unwrap();

        assert!(matches!(result, Err(PlayerError::QueueDestroyed(_))));
        assert!(queue.is_destroyed());
        assert!(!queue.is_connected());
        assert_eq!(connection.disconnects(), 1);
        assert!(!queue.leave().await);
    }
}
