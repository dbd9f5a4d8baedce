use anyhow::Result;
use serenity::{
    builder::{CreateCommand, CreateInteractionResponse, CreateInteractionResponseMessage},
    model::{
        application::CommandInteraction,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{connection::SongbirdConnection, GuildSession, OpenPlayerBot};
use crate::player::PlayerOptionsOverride;

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context) -> Result<()> {
    for command in commands() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(ctx: &Context, guild_id: GuildId) -> Result<()> {
    guild_id.set_commands(&ctx.http, commands()).await?;

    Ok(())
}

fn commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new("join").description("Conecta el bot a tu canal de voz"),
        CreateCommand::new("leave").description("Desconecta el bot y finaliza la cola"),
    ]
}

/// Maneja comandos slash
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &OpenPlayerBot,
) -> Result<()> {
    let guild_id = command
        .guild_id
        .ok_or_else(|| anyhow::anyhow!("Comando usado fuera de un servidor"))?;

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    let reply = match command.data.name.as_str() {
        "join" => handle_join(ctx, &command, guild_id, bot)
            .await
            .unwrap_or_else(|e| {
                warn!("Error en /join para guild {}: {:?}", guild_id, e);
                format!("❌ {}", e)
            }),
        "leave" => handle_leave(guild_id, bot).await.to_string(),
        _ => "❌ Comando no reconocido".to_string(),
    };

    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(reply)
                    .ephemeral(true),
            ),
        )
        .await?;

    Ok(())
}

async fn handle_join(
    ctx: &Context,
    command: &CommandInteraction,
    guild_id: GuildId,
    bot: &OpenPlayerBot,
) -> Result<String> {
    let voice_channel_id = get_user_voice_channel(ctx, guild_id, command.user.id)?;

    let queue = bot.player.create_queue(
        guild_id,
        PlayerOptionsOverride::default(),
        GuildSession {
            text_channel: command.channel_id,
            requested_by: command.user.id,
        },
    )?;

    if queue.is_connected() {
        return Ok("ℹ️ Ya estoy conectado en este servidor".to_string());
    }

    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;
    let call = manager.join(guild_id, voice_channel_id).await?;

    let connection = SongbirdConnection::new(
        guild_id,
        Arc::clone(&manager),
        call,
        ctx.cache.clone(),
        ctx.http.clone(),
    );
    if let Err(e) = queue.join(Arc::new(connection)).await {
        // Sin sesión que la controle, la llamada no debe quedar abierta
        let _ = manager.remove(guild_id).await;
        return Err(e.into());
    }

    Ok(format!("🔊 Conectado a <#{}>", voice_channel_id))
}

async fn handle_leave(guild_id: GuildId, bot: &OpenPlayerBot) -> &'static str {
    match bot.player.get_queue(guild_id) {
        Some(queue) => {
            queue.leave().await;
            bot.player.delete_queue(guild_id);
            "👋 Desconectado, cola finalizada"
        }
        None => "❌ No hay una cola activa en este servidor",
    }
}

fn get_user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Result<ChannelId> {
    let guild = guild_id
        .to_guild_cached(&ctx.cache)
        .ok_or_else(|| anyhow::anyhow!("Guild no encontrada en caché"))?;

    let channel_id = guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
        .ok_or_else(|| anyhow::anyhow!("Debes estar en un canal de voz"))?;

    Ok(channel_id)
}
