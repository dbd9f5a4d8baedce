//! Fakes shared by the player tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use super::platform::{GuildInfo, MockPlatformClient};
use super::queue::{ChannelMembers, VoiceConnection};
use crate::error::PlayerResult;

/// In-memory voice connection whose membership tests can rewrite at will.
pub struct FakeConnection {
    channel_id: ChannelId,
    members: Mutex<Vec<UserId>>,
    disconnects: AtomicUsize,
    deafened: AtomicBool,
    deafen_delay: Duration,
}

impl FakeConnection {
    pub fn new(channel_id: u64, members: &[u64]) -> Arc<Self> {
        Self::with_deafen_delay(channel_id, members, Duration::ZERO)
    }

    /// Connection whose `set_deafened` takes `delay` to complete.
    pub fn with_deafen_delay(channel_id: u64, members: &[u64], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            channel_id: ChannelId::new(channel_id),
            members: Mutex::new(members.iter().copied().map(UserId::new).collect()),
            disconnects: AtomicUsize::new(0),
            deafened: AtomicBool::new(false),
            deafen_delay: delay,
        })
    }

    pub fn set_members(&self, members: &[u64]) {
        *self.members.lock() = members.iter().copied().map(UserId::new).collect();
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn is_deafened(&self) -> bool {
        self.deafened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceConnection for FakeConnection {
    async fn channel_id(&self) -> Option<ChannelId> {
        Some(self.channel_id)
    }

    async fn members(&self) -> ChannelMembers {
        ChannelMembers::new(self.members.lock().clone())
    }

    async fn set_deafened(&self, deafened: bool) -> PlayerResult<()> {
        if !self.deafen_delay.is_zero() {
            tokio::time::sleep(self.deafen_delay).await;
        }
        self.deafened.store(deafened, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Platform mock that knows `guilds` and runs as user `me`.
pub fn platform(guilds: &[u64], me: u64) -> MockPlatformClient {
    let known: Vec<GuildId> = guilds.iter().copied().map(GuildId::new).collect();

    let mut platform = MockPlatformClient::new();
    platform.expect_resolve_guild().returning(move |id| {
        known.contains(&id).then(|| GuildInfo {
            id,
            name: format!("guild-{id}"),
        })
    });
    platform
        .expect_current_user_id()
        .return_const(Some(UserId::new(me)));
    platform
}
