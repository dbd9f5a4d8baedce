use serenity::http::Http;
use std::sync::Arc;
use tokio::{
    sync::broadcast::{self, error::RecvError},
    task::JoinHandle,
};
use tracing::{info, warn};

use super::GuildSession;
use crate::player::PlayerEvent;

/// Consumes player notifications and announces them in the text channel the
/// session was started from.
pub fn spawn_event_listener(
    http: Arc<Http>,
    mut events: broadcast::Receiver<PlayerEvent<GuildSession>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => announce(&http, &event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("⚠️ Se perdieron {} eventos del reproductor", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

async fn announce(http: &Http, event: &PlayerEvent<GuildSession>) {
    let queue = event.queue();
    info!("📣 Evento {} en guild {}", event.kind(), queue.guild_id());

    let text_channel = queue.data().text_channel;
    if let Err(e) = text_channel.say(http, announcement(event)).await {
        warn!(
            "No se pudo avisar en el canal {} de guild {}: {:?}",
            text_channel,
            queue.guild_id(),
            e
        );
    }
}

/// Notice addressed to the member who started the session.
fn announcement(event: &PlayerEvent<GuildSession>) -> String {
    format!("<@{}> {}", event.queue().data().requested_by, notice(event))
}

fn notice<D>(event: &PlayerEvent<D>) -> &'static str {
    match event {
        PlayerEvent::ClientDisconnect(_) => "🔌 Me desconectaron del canal de voz, cola finalizada",
        PlayerEvent::ClientUndeafen(_) => "🔈 Me quitaron el ensordecimiento del servidor",
        PlayerEvent::ChannelEmpty(_) => "👋 El canal quedó vacío, me voy",
    }
}
