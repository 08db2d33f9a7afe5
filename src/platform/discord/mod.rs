// ABOUTME: Discord platform implementation for the move-request workflow
// ABOUTME: Implements Tier 2 VoicePlatform on serenity's HTTP client and gateway cache

pub mod components;
pub mod handler;
pub mod profile;
pub mod responder;

pub use handler::{run, DiscordHandler};
pub use profile::DiscordProfileEditor;
pub use responder::InteractionResponder;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dragme_core::traits::{
    Capabilities, ChannelCreator, MessageContent, MessagingPlatform, ProfileEditor, VoicePlatform,
};
use serenity::all::{
    Cache, ChannelId, ChannelType, CreateChannel, CreateMessage, EditMessage, GuildId, Http,
    MessageId, UserId,
};
use std::sync::Arc;

/// Parse a snowflake string into its numeric form; zero is not a valid id
pub fn parse_snowflake(id: &str) -> Result<u64> {
    let value: u64 = id
        .trim()
        .parse()
        .with_context(|| format!("Invalid Discord id: {:?}", id))?;
    if value == 0 {
        anyhow::bail!("Invalid Discord id: 0");
    }
    Ok(value)
}

fn channel_id(id: &str) -> Result<ChannelId> {
    parse_snowflake(id).map(ChannelId::new)
}

fn guild_id(id: &str) -> Result<GuildId> {
    parse_snowflake(id).map(GuildId::new)
}

fn user_id(id: &str) -> Result<UserId> {
    parse_snowflake(id).map(UserId::new)
}

fn message_id(id: &str) -> Result<MessageId> {
    parse_snowflake(id).map(MessageId::new)
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(e) => e.status_code().map(|s| s.as_u16()) == Some(404),
        _ => false,
    }
}

/// Discord guilds as a voice community platform
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
    bot_user_id: String,
    profile: DiscordProfileEditor,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>, bot_user_id: UserId) -> Self {
        Self {
            profile: DiscordProfileEditor::new(Arc::clone(&http)),
            http,
            cache,
            bot_user_id: bot_user_id.to_string(),
        }
    }

    fn http(&self) -> &Http {
        &self.http
    }
}

#[async_trait]
impl MessagingPlatform for DiscordPlatform {
    fn platform_id(&self) -> &'static str {
        "discord"
    }

    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn send(&self, channel: &str, content: MessageContent) -> Result<String> {
        let builder = match content {
            MessageContent::Plain(text) => CreateMessage::new().content(text),
            MessageContent::Prompt { text, handle } => CreateMessage::new()
                .content(text)
                .components(components::decision_buttons(&handle)),
        };
        let message = channel_id(channel)?
            .send_message(self.http(), builder)
            .await
            .with_context(|| format!("Failed to send message to channel {}", channel))?;
        Ok(message.id.to_string())
    }

    async fn edit(&self, channel: &str, message: &str, content: MessageContent) -> Result<()> {
        let builder = match content {
            MessageContent::Plain(text) => EditMessage::new().content(text).components(Vec::new()),
            MessageContent::Prompt { text, handle } => EditMessage::new()
                .content(text)
                .components(components::decision_buttons(&handle)),
        };
        channel_id(channel)?
            .edit_message(self.http(), message_id(message)?, builder)
            .await
            .with_context(|| format!("Failed to edit message {}", message))?;
        Ok(())
    }

    async fn delete(&self, channel: &str, message: &str) -> Result<()> {
        channel_id(channel)?
            .delete_message(self.http(), message_id(message)?)
            .await
            .with_context(|| format!("Failed to delete message {}", message))
    }
}

#[async_trait]
impl VoicePlatform for DiscordPlatform {
    async fn channel_exists(&self, community: &str, channel: &str) -> bool {
        let (Ok(guild), Ok(channel)) = (guild_id(community), channel_id(channel)) else {
            return false;
        };

        let cached = self
            .cache
            .guild(guild)
            .map(|g| g.channels.contains_key(&channel));
        if let Some(exists) = cached {
            return exists;
        }

        match channel.to_channel(self.http()).await {
            Ok(_) => true,
            Err(e) if is_not_found(&e) => false,
            Err(e) => {
                // Keep the entry when Discord can't be asked right now
                tracing::warn!(error = %e, channel_id = %channel, "Could not resolve channel");
                true
            }
        }
    }

    async fn voice_channel_of(&self, community: &str, user: &str) -> Option<String> {
        let guild = guild_id(community).ok()?;
        let user = user_id(user).ok()?;
        let guild = self.cache.guild(guild)?;
        guild
            .voice_states
            .get(&user)
            .and_then(|state| state.channel_id)
            .map(|channel| channel.to_string())
    }

    async fn bot_capabilities(&self, community: &str) -> Result<Capabilities> {
        let guild_id = guild_id(community)?;
        let bot = user_id(&self.bot_user_id)?;
        let guild = self
            .cache
            .guild(guild_id)
            .with_context(|| format!("Guild {} is not cached", guild_id))?;
        let member = guild
            .members
            .get(&bot)
            .with_context(|| format!("Bot member missing from guild {}", guild_id))?;
        #[allow(deprecated)]
        let permissions = guild.member_permissions(member);
        Ok(handler::capabilities_from(permissions))
    }

    async fn move_member(&self, community: &str, user: &str, voice_channel: &str) -> Result<()> {
        guild_id(community)?
            .move_member(self.http(), user_id(user)?, channel_id(voice_channel)?)
            .await
            .with_context(|| format!("Failed to move {} into {}", user, voice_channel))?;
        Ok(())
    }

    fn channel_creator(&self) -> Option<&dyn ChannelCreator> {
        Some(self)
    }

    fn profile_editor(&self) -> Option<&dyn ProfileEditor> {
        Some(&self.profile)
    }
}

#[async_trait]
impl ChannelCreator for DiscordPlatform {
    async fn create_text_channel(&self, community: &str, name: &str) -> Result<String> {
        let channel = guild_id(community)?
            .create_channel(self.http(), CreateChannel::new(name).kind(ChannelType::Text))
            .await
            .with_context(|| format!("Failed to create channel {} in guild {}", name, community))?;
        tracing::info!(
            guild_id = %community,
            channel_id = %channel.id,
            name = %name,
            "Created text channel"
        );
        Ok(channel.id.to_string())
    }
}
