use async_trait::async_trait;
use serenity::{
    builder::EditMember,
    cache::Cache,
    http::Http,
    model::id::{ChannelId, GuildId},
};
use songbird::{Call, Songbird};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    error::{PlayerError, PlayerResult},
    player::{ChannelMembers, VoiceConnection},
};

/// [`VoiceConnection`] backed by a songbird call.
///
/// Membership is read from the serenity cache's voice states on every call,
/// so it reflects the gateway's latest view rather than a snapshot.
/// Deafening goes through the REST API as a server deafen on the client's
/// own member, the same flag voice state updates report.
pub struct SongbirdConnection {
    guild_id: GuildId,
    manager: Arc<Songbird>,
    call: Arc<Mutex<Call>>,
    cache: Arc<Cache>,
    http: Arc<Http>,
}

impl SongbirdConnection {
    pub fn new(
        guild_id: GuildId,
        manager: Arc<Songbird>,
        call: Arc<Mutex<Call>>,
        cache: Arc<Cache>,
        http: Arc<Http>,
    ) -> Self {
        Self {
            guild_id,
            manager,
            call,
            cache,
            http,
        }
    }
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    async fn channel_id(&self) -> Option<ChannelId> {
        let call = self.call.lock().await;
        call.current_channel().map(|channel| ChannelId::from(channel.0))
    }

    async fn members(&self) -> ChannelMembers {
        let Some(channel_id) = self.channel_id().await else {
            return ChannelMembers::default();
        };
        let Some(guild) = self.cache.guild(self.guild_id) else {
            return ChannelMembers::default();
        };

        guild
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel_id))
            .map(|state| state.user_id)
            .collect()
    }

    async fn set_deafened(&self, deafened: bool) -> PlayerResult<()> {
        let me = self.cache.current_user().id;
        self.guild_id
            .edit_member(&self.http, me, EditMember::new().deafen(deafened))
            .await
            .map(|_| ())
            .map_err(|e| PlayerError::Connection(e.to_string()))
    }

    async fn disconnect(&self) {
        // NoCall si ya se había ido: no es un error
        if let Err(e) = self.manager.remove(self.guild_id).await {
            debug!("Llamada ya cerrada en guild {}: {:?}", self.guild_id, e);
        }
    }
}
