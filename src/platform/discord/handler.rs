// ABOUTME: Serenity event handler wiring Discord interactions into the CommandRouter
// ABOUTME: Registers slash commands on ready and translates commands and button clicks into invocations

use anyhow::{Context as _, Result};
use dragme_core::metrics;
use dragme_core::router::command;
use dragme_core::traits::{
    AttachmentInfo, Capabilities, ChatUser, Invocation, ProfileImageKind, Reply, Responder,
};
use dragme_core::{ChannelRegistry, CommandRouter, Config, RequestError, RequestId};
use serenity::all::{
    Client, Command, CommandInteraction, CommandOptionType, ComponentInteraction, Context,
    CreateCommand, CreateCommandOption, EventHandler, GatewayIntents, GuildId, Interaction,
    Member, Permissions, Ready, ResolvedValue, User,
};
use serenity::async_trait;
use std::sync::Arc;

use super::components::parse_custom_id;
use super::{parse_snowflake, DiscordPlatform, InteractionResponder};
use crate::SharedRouter;

const GUILD_ONLY: &str = "This command can only be used in a server.";

// =============================================================================
// Slash command definitions
// =============================================================================

/// Commands every guild gets
pub fn move_commands() -> Vec<CreateCommand> {
    vec![
        CreateCommand::new(command::DRAG)
            .description("Request to join someone's voice channel")
            .dm_permission(false)
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::User,
                    "target",
                    "The user whose voice channel you want to join",
                )
                .required(true),
            ),
        CreateCommand::new(command::SETUP)
            .description("Create the drag-requests channel for this server")
            .dm_permission(false)
            .default_member_permissions(Permissions::ADMINISTRATOR),
    ]
}

/// Owner-only commands for changing the bot's profile images
pub fn profile_commands() -> Vec<CreateCommand> {
    let image_option = |kind: &str| {
        CreateCommandOption::new(
            CommandOptionType::Attachment,
            "image",
            format!("The new {} image", kind),
        )
        .required(true)
    };
    vec![
        CreateCommand::new(command::UPDATE_AVATAR)
            .description("Update the bot's avatar")
            .add_option(image_option("avatar")),
        CreateCommand::new(command::UPDATE_BANNER)
            .description("Update the bot's banner")
            .add_option(image_option("banner")),
    ]
}

pub(super) fn capabilities_from(permissions: Permissions) -> Capabilities {
    Capabilities {
        administrator: permissions.administrator(),
        manage_channels: permissions.manage_channels(),
        move_members: permissions.move_members(),
        connect: permissions.connect(),
    }
}

fn member_capabilities(member: Option<&Member>) -> Capabilities {
    member
        .and_then(|m| m.permissions)
        .map(capabilities_from)
        .unwrap_or_default()
}

fn chat_user(user: &User) -> ChatUser {
    ChatUser {
        id: user.id.to_string(),
        display_name: Some(user.global_name.clone().unwrap_or_else(|| user.name.clone())),
    }
}

// =============================================================================
// Event handler
// =============================================================================

pub struct DiscordHandler {
    config: Arc<Config>,
    registry: Arc<ChannelRegistry>,
    router: SharedRouter,
}

impl DiscordHandler {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<ChannelRegistry>,
        router: SharedRouter,
    ) -> Self {
        Self {
            config,
            registry,
            router,
        }
    }

    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        let home_guild = match &self.config.discord.home_guild_id {
            Some(id) => Some(GuildId::new(parse_snowflake(id)?)),
            None => None,
        };

        let mut global = move_commands();
        if home_guild.is_none() {
            global.extend(profile_commands());
        }
        let registered = Command::set_global_commands(&ctx.http, global)
            .await
            .context("Failed to register global commands")?;
        let names: Vec<&str> = registered.iter().map(|c| c.name.as_str()).collect();
        tracing::info!(count = registered.len(), commands = ?names, "Synced global commands");

        if let Some(guild) = home_guild {
            let registered = guild
                .set_commands(&ctx.http, profile_commands())
                .await
                .with_context(|| format!("Failed to register commands in guild {}", guild))?;
            let names: Vec<&str> = registered.iter().map(|c| c.name.as_str()).collect();
            tracing::info!(guild_id = %guild, commands = ?names, "Synced home guild commands");
        }
        Ok(())
    }

    async fn on_command(
        &self,
        ctx: &Context,
        router: &CommandRouter,
        interaction: CommandInteraction,
    ) {
        let name = interaction.data.name.clone();
        let invocation = interaction.guild_id.map(|guild_id| Invocation {
            community_id: guild_id.to_string(),
            channel_id: interaction.channel_id.to_string(),
            user: chat_user(&interaction.user),
            permissions: member_capabilities(interaction.member.as_deref()),
        });

        let mut target = None;
        let mut attachment = None;
        for option in interaction.data.options() {
            match option.value {
                ResolvedValue::User(user, _) if option.name == "target" => {
                    target = Some(chat_user(user));
                }
                ResolvedValue::Attachment(file) if option.name == "image" => {
                    attachment = Some(AttachmentInfo {
                        source_id: file.url.clone(),
                        filename: file.filename.clone(),
                        mime_type: file.content_type.clone(),
                        size: u64::from(file.size),
                    });
                }
                _ => {}
            }
        }

        tracing::debug!(
            command = %name,
            user = %interaction.user.id,
            guild_id = ?interaction.guild_id,
            "Received slash command"
        );

        let responder = InteractionResponder::for_command(Arc::clone(&ctx.http), interaction);
        let Some(invocation) = invocation else {
            report(responder.reply(Reply::private(GUILD_ONLY)).await);
            return;
        };

        let result = match name.as_str() {
            command::DRAG => match target {
                Some(target) => router.handle_move(&invocation, &target, &responder).await,
                None => {
                    responder
                        .reply(Reply::private("Please choose a user to send the request to."))
                        .await
                }
            },
            command::SETUP => router.handle_setup(&invocation, &responder).await,
            command::UPDATE_AVATAR | command::UPDATE_BANNER => {
                let kind = if name == command::UPDATE_AVATAR {
                    ProfileImageKind::Avatar
                } else {
                    ProfileImageKind::Banner
                };
                match attachment {
                    Some(file) => {
                        router
                            .handle_profile_update(&invocation, kind, &file, &responder)
                            .await
                    }
                    None => {
                        responder
                            .reply(Reply::private("Please attach an image."))
                            .await
                    }
                }
            }
            other => {
                tracing::warn!(command = %other, "Unknown slash command");
                Ok(())
            }
        };
        report(result);
    }

    async fn on_component(
        &self,
        ctx: &Context,
        router: &CommandRouter,
        interaction: ComponentInteraction,
    ) {
        let Some((decision, handle)) = parse_custom_id(&interaction.data.custom_id) else {
            tracing::debug!(custom_id = %interaction.data.custom_id, "Ignoring foreign component");
            return;
        };
        let request_id = RequestId::parse(handle);
        let invocation = interaction.guild_id.map(|guild_id| Invocation {
            community_id: guild_id.to_string(),
            channel_id: interaction.channel_id.to_string(),
            user: chat_user(&interaction.user),
            permissions: member_capabilities(interaction.member.as_ref()),
        });

        let responder = InteractionResponder::for_component(Arc::clone(&ctx.http), interaction);
        let result = match (invocation, request_id) {
            (Some(invocation), Some(request_id)) => {
                router
                    .handle_decision(&invocation, request_id, decision, &responder)
                    .await
            }
            _ => {
                responder
                    .reply(Reply::private(RequestError::Stale.to_string()))
                    .await
            }
        };
        report(result);
    }
}

fn report(result: Result<()>) {
    if let Err(e) = result {
        metrics::record_error("interaction_reply");
        tracing::error!(error = %e, "Failed to answer interaction");
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        tracing::info!(
            user = %ready.user.name,
            user_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Connected to Discord"
        );

        self.router.get_or_init(|| {
            let platform = Arc::new(DiscordPlatform::new(
                Arc::clone(&ctx.http),
                Arc::clone(&ctx.cache),
                ready.user.id,
            ));
            Arc::new(CommandRouter::new(
                &self.config,
                platform,
                Arc::clone(&self.registry),
            ))
        });

        if let Err(e) = self.register_commands(&ctx).await {
            metrics::record_error("command_sync");
            tracing::error!(error = %e, "Failed to sync slash commands");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Some(router) = self.router.get().cloned() else {
            tracing::warn!("Interaction received before ready, ignoring");
            return;
        };
        match interaction {
            Interaction::Command(command) => self.on_command(&ctx, &router, command).await,
            Interaction::Component(component) => {
                self.on_component(&ctx, &router, component).await
            }
            _ => {}
        }
    }
}

/// Connect to the gateway and process events until the client stops or Ctrl+C
pub async fn run(
    config: Arc<Config>,
    registry: Arc<ChannelRegistry>,
    router: SharedRouter,
) -> Result<()> {
    let token = config.discord_token()?.to_string();
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;
    let handler = DiscordHandler::new(config, registry, Arc::clone(&router));

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C, shutting down");
            shard_manager.shutdown_all().await;
        }
    });

    tracing::info!("Connecting to Discord gateway");
    let result = client.start().await.context("Discord client error");

    if let Some(router) = router.get() {
        router.requests().shutdown();
    }
    result
}
