// ABOUTME: Routes slash commands and prompt decisions to the move-request workflow
// ABOUTME: Validates preconditions in a fixed order and turns every outcome into a reply

use anyhow::Result;
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::Config;
use crate::error::{Precondition, ProfileError, RegistryError, RequestError};
use crate::metrics;
use crate::move_request::{MoveRequest, RequestId};
use crate::pending::PendingRequests;
use crate::profile::ProfileGate;
use crate::registry::ChannelRegistry;
use crate::throttle::RequestThrottle;
use crate::traits::{
    AttachmentInfo, Capabilities, ChatUser, Decision, Invocation, ProfileImageKind, Reply,
    Responder, Tone, VoicePlatform,
};

/// Fallback reply when something outside the workflow's control fails
pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred. Please try again later.";

/// Slash command names as registered with the platform
pub mod command {
    pub const DRAG: &str = "dragmee";
    pub const SETUP: &str = "setup";
    pub const UPDATE_AVATAR: &str = "updateavatar";
    pub const UPDATE_BANNER: &str = "updatebanner";
}

pub struct CommandRouter {
    platform: Arc<dyn VoicePlatform>,
    registry: Arc<ChannelRegistry>,
    requests: Arc<PendingRequests>,
    move_throttle: RequestThrottle,
    profile: ProfileGate,
    intake_channel_name: String,
}

impl CommandRouter {
    pub fn new(
        config: &Config,
        platform: Arc<dyn VoicePlatform>,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        let requests = Arc::new(PendingRequests::new(
            Arc::clone(&platform),
            config.requests.timeout(),
        ));
        Self {
            platform,
            registry,
            requests,
            move_throttle: RequestThrottle::new(config.requests.cooldown()),
            profile: ProfileGate::new(&config.profile),
            intake_channel_name: config.requests.intake_channel_name.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn requests(&self) -> &Arc<PendingRequests> {
        &self.requests
    }

    // =========================================================================
    // Move requests
    // =========================================================================

    /// Handle `/dragmee target`: ask `target` to let the invoker into their voice room
    pub async fn handle_move(
        &self,
        invocation: &Invocation,
        target: &ChatUser,
        responder: &dyn Responder,
    ) -> Result<()> {
        metrics::record_command(command::DRAG);
        let reply = match self.request_move(invocation, target).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::debug!(
                    community_id = %invocation.community_id,
                    requester = %invocation.user.id,
                    target = %target.id,
                    reason = %err,
                    "Move request refused"
                );
                Reply::private(err.to_string())
            }
        };
        responder.reply(reply).await
    }

    /// Hold the requester's cooldown slot for the whole attempt and give it
    /// back unless a prompt was actually posted
    async fn request_move(
        &self,
        invocation: &Invocation,
        target: &ChatUser,
    ) -> Result<Reply, RequestError> {
        let now = Instant::now();
        let requester = &invocation.user.id;

        let reservation = self
            .move_throttle
            .try_acquire(requester, now)
            .map_err(|wait| RequestError::Throttled {
                remaining: wait.remaining,
            })?;

        let opened = self.open_move(invocation, target, now).await;
        if !matches!(opened, Ok(Some(_))) {
            self.move_throttle.release(requester, reservation);
        }

        let target_mention = self.platform.mention_user(&target.id);
        match opened? {
            Some(request_id) => {
                tracing::info!(
                    request_id = %request_id,
                    community_id = %invocation.community_id,
                    requester = %requester,
                    target = %target.id,
                    "Move request opened"
                );
                Ok(Reply::private(format!(
                    "Request to join {}'s voice channel has been sent.",
                    target_mention
                )))
            }
            None => Ok(Reply::private(UNEXPECTED_ERROR)),
        }
    }

    /// Check every precondition and post the prompt.
    ///
    /// `Ok(None)` means the preconditions held but the prompt could not be posted.
    async fn open_move(
        &self,
        invocation: &Invocation,
        target: &ChatUser,
        now: Instant,
    ) -> Result<Option<RequestId>, RequestError> {
        let requester = &invocation.user;

        let intake = self
            .registry
            .get(&invocation.community_id, self.platform.as_ref())
            .await;
        if intake.as_deref() != Some(invocation.channel_id.as_str()) {
            return Err(Precondition::WrongChannel.into());
        }

        let capabilities = self.bot_capabilities(&invocation.community_id).await;
        if !capabilities.can_relocate() {
            return Err(Precondition::MissingCapability.into());
        }

        if target.id == requester.id {
            return Err(Precondition::SelfTarget.into());
        }

        let requester_mention = self.platform.mention_user(&requester.id);
        let target_mention = self.platform.mention_user(&target.id);

        let requester_room = self
            .platform
            .voice_channel_of(&invocation.community_id, &requester.id)
            .await
            .ok_or_else(|| Precondition::RequesterNotInVoice {
                requester: requester_mention.clone(),
            })?;
        let target_room = self
            .platform
            .voice_channel_of(&invocation.community_id, &target.id)
            .await
            .ok_or_else(|| Precondition::TargetNotInVoice {
                target: target_mention.clone(),
            })?;
        if requester_room == target_room {
            return Err(Precondition::SameVoiceChannel {
                requester: requester_mention,
                target: target_mention,
            }
            .into());
        }

        let request = MoveRequest::new(
            &invocation.community_id,
            &invocation.channel_id,
            &requester.id,
            &target.id,
            target_room,
            now,
        );
        let prompt = format!(
            "{}, {} wants to join your voice channel.",
            target_mention, requester_mention
        );

        match self.requests.open(request, prompt).await {
            Ok(request_id) => Ok(Some(request_id)),
            Err(e) => {
                metrics::record_error("prompt_post");
                tracing::error!(
                    error = %e,
                    community_id = %invocation.community_id,
                    requester = %requester.id,
                    "Failed to open move request"
                );
                Ok(None)
            }
        }
    }

    /// Unresolvable permissions count as none
    async fn bot_capabilities(&self, community_id: &str) -> Capabilities {
        match self.platform.bot_capabilities(community_id).await {
            Ok(capabilities) => capabilities,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    community_id = %community_id,
                    "Could not resolve bot permissions"
                );
                Capabilities::default()
            }
        }
    }

    /// Handle a click on a prompt's accept or reject affordance
    pub async fn handle_decision(
        &self,
        invocation: &Invocation,
        request_id: RequestId,
        decision: Decision,
        responder: &dyn Responder,
    ) -> Result<()> {
        self.requests
            .decide(request_id, &invocation.user, decision, responder)
            .await
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Handle `/setup`: create and register the community's intake channel
    pub async fn handle_setup(
        &self,
        invocation: &Invocation,
        responder: &dyn Responder,
    ) -> Result<()> {
        metrics::record_command(command::SETUP);
        let reply = self.bootstrap(invocation).await;
        responder.reply(reply).await
    }

    async fn bootstrap(&self, invocation: &Invocation) -> Reply {
        let community_id = invocation.community_id.as_str();

        if !invocation.permissions.administrator {
            return error_embed(
                "Permission Denied",
                "You must have administrator permissions to use this command.",
            );
        }

        if let Some(existing) = self.registry.get(community_id, self.platform.as_ref()).await {
            return self.conflict(&existing);
        }

        let capabilities = self.bot_capabilities(community_id).await;
        if !capabilities.manage_channels {
            return error_embed("Error", "I do not have permission to manage channels.");
        }

        let Some(creator) = self.platform.channel_creator() else {
            return error_embed("Error", "This platform cannot create channels.");
        };

        let channel_id = match creator
            .create_text_channel(community_id, &self.intake_channel_name)
            .await
        {
            Ok(channel_id) => channel_id,
            Err(e) => {
                metrics::record_error("channel_create");
                tracing::error!(
                    error = %e,
                    community_id = %community_id,
                    "Failed to create request channel"
                );
                return error_embed(
                    "Error",
                    format!("Failed to create the request channel: {}", e),
                );
            }
        };

        match self
            .registry
            .create(community_id, &channel_id, self.platform.as_ref())
            .await
        {
            Ok(()) => Reply::public(format!(
                "Request channel {} has been created successfully!",
                self.platform.mention_channel(&channel_id)
            ))
            .titled("Setup Complete")
            .with_tone(Tone::Success),
            Err(RegistryError::AlreadyExists { existing, .. }) => {
                tracing::warn!(
                    community_id = %community_id,
                    created = %channel_id,
                    existing = %existing,
                    "Intake channel registered concurrently"
                );
                self.conflict(&existing)
            }
        }
    }

    fn conflict(&self, existing: &str) -> Reply {
        let err = RequestError::RegistryConflict {
            existing: self.platform.mention_channel(existing),
        };
        error_embed("Error", err.to_string())
    }

    // =========================================================================
    // Profile images
    // =========================================================================

    /// Handle `/updateavatar` and `/updatebanner`
    pub async fn handle_profile_update(
        &self,
        invocation: &Invocation,
        kind: ProfileImageKind,
        attachment: &AttachmentInfo,
        responder: &dyn Responder,
    ) -> Result<()> {
        metrics::record_command(match kind {
            ProfileImageKind::Avatar => command::UPDATE_AVATAR,
            ProfileImageKind::Banner => command::UPDATE_BANNER,
        });

        let Some(editor) = self.platform.profile_editor() else {
            return responder
                .reply(Reply::private(ProfileError::Unsupported.to_string()))
                .await;
        };

        let user = &invocation.user.id;
        let admission = match self.profile.admit(user, kind, attachment, Instant::now()) {
            Ok(admission) => admission,
            Err(err) => return responder.reply(Reply::private(err.to_string())).await,
        };

        let notice = Reply::private(format!("Processing {} update... Please wait.", kind));
        if let Err(e) = responder.reply(notice).await {
            self.profile.release(kind, admission);
            return Err(e);
        }

        let updated = match editor.download(attachment).await {
            Ok(data) => editor.update_image(kind, data, admission.mime_type).await,
            Err(e) => Err(e),
        };

        match updated {
            Ok(()) => {
                tracing::info!(user = %user, kind = %kind, "Bot profile image updated");
                responder
                    .reply(Reply::public(format!("Bot {} updated successfully!", kind)))
                    .await
            }
            Err(e) => {
                self.profile.release(kind, admission);
                metrics::record_error("profile_update");
                tracing::error!(
                    error = %e,
                    user = %user,
                    kind = %kind,
                    "Failed to update bot profile image"
                );
                responder
                    .reply(Reply::private(format!("Failed to update {}: {}", kind, e)))
                    .await
            }
        }
    }
}

fn error_embed(title: &str, content: impl Into<String>) -> Reply {
    Reply::private(content).titled(title).with_tone(Tone::Error)
}
