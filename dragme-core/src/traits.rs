// ABOUTME: Core traits for tiered platform abstraction
// ABOUTME: Tier 1 (MessagingPlatform) posts messages, Tier 2 (VoicePlatform) adds presence and relocation

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

// =============================================================================
// Message Content Types
// =============================================================================

/// Content that can be posted to a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageContent {
    /// Plain text message, no interactive affordances
    Plain(String),
    /// Message carrying accept/reject affordances bound to an opaque handle
    Prompt { text: String, handle: String },
}

impl MessageContent {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    pub fn prompt(text: impl Into<String>, handle: impl Into<String>) -> Self {
        Self::Prompt {
            text: text.into(),
            handle: handle.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Prompt { text, .. } => text,
        }
    }

    /// Whether this content carries interactive affordances
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Prompt { .. })
    }
}

/// Information about an attachment passed as a command argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// Platform-specific source identifier for downloading (a URL on Discord)
    pub source_id: String,
    /// Original filename
    pub filename: String,
    /// MIME type, if the platform reported one
    pub mime_type: Option<String>,
    /// File size in bytes
    pub size: u64,
}

// =============================================================================
// User Identity & Permissions
// =============================================================================

/// Identity of a chat user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatUser {
    /// Unique identifier (a snowflake on Discord)
    pub id: String,
    /// Display name
    pub display_name: Option<String>,
}

impl ChatUser {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    pub fn with_name(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(name.into()),
        }
    }
}

/// Permission bits the workflow cares about, for the bot or for an invoking member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub administrator: bool,
    pub manage_channels: bool,
    pub move_members: bool,
    pub connect: bool,
}

impl Capabilities {
    pub fn all() -> Self {
        Self {
            administrator: true,
            manage_channels: true,
            move_members: true,
            connect: true,
        }
    }

    /// Move members and connect are both needed to relocate someone
    pub fn can_relocate(&self) -> bool {
        self.move_members && self.connect
    }
}

// =============================================================================
// Invocations & Replies
// =============================================================================

/// Context of a slash command or component interaction
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Community (guild) the interaction happened in
    pub community_id: String,
    /// Channel the interaction happened in
    pub channel_id: String,
    /// The user who triggered it
    pub user: ChatUser,
    /// The invoking member's resolved permissions
    pub permissions: Capabilities,
}

/// Visual tone of a reply; platforms that render embeds map it to a colour
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tone {
    #[default]
    Neutral,
    Success,
    Error,
}

/// A short human-readable acknowledgment sent back to an interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub title: Option<String>,
    pub tone: Tone,
    /// Only visible to the invoking user
    pub ephemeral: bool,
}

impl Reply {
    pub fn private(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            title: None,
            tone: Tone::Neutral,
            ephemeral: true,
        }
    }

    pub fn public(content: impl Into<String>) -> Self {
        Self {
            ephemeral: false,
            ..Self::private(content)
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }
}

/// The two affordances attached to a move-request prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Accept => "accept",
            Decision::Reject => "reject",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "accept" => Some(Decision::Accept),
            "reject" => Some(Decision::Reject),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which profile image an owner command replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileImageKind {
    Avatar,
    Banner,
}

impl ProfileImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileImageKind::Avatar => "avatar",
            ProfileImageKind::Banner => "banner",
        }
    }
}

impl fmt::Display for ProfileImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tier 1: Messaging Platform
// =============================================================================

/// Tier 1: post, edit and delete messages in channels.
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// Platform identifier (e.g., "discord")
    fn platform_id(&self) -> &'static str;

    /// Bot's user ID on this platform
    fn bot_user_id(&self) -> &str;

    /// Check if a user ID is the bot itself
    fn is_self(&self, user_id: &str) -> bool {
        user_id == self.bot_user_id()
    }

    /// Post a message, returning the platform message ID
    async fn send(&self, channel_id: &str, content: MessageContent) -> Result<String>;

    /// Replace a message's content. Plain content strips any affordances.
    async fn edit(&self, channel_id: &str, message_id: &str, content: MessageContent)
        -> Result<()>;

    /// Delete a message
    async fn delete(&self, channel_id: &str, message_id: &str) -> Result<()>;

    /// Render a user mention
    fn mention_user(&self, user_id: &str) -> String {
        format!("<@{}>", user_id)
    }

    /// Render a channel mention
    fn mention_channel(&self, channel_id: &str) -> String {
        format!("<#{}>", channel_id)
    }
}

// =============================================================================
// Tier 2: Voice Community Platform
// =============================================================================

/// Tier 2: communities with voice rooms, member presence and relocation.
///
/// Examples: Discord guilds
#[async_trait]
pub trait VoicePlatform: MessagingPlatform {
    /// Whether a channel still resolves to a live object in the community
    async fn channel_exists(&self, community_id: &str, channel_id: &str) -> bool;

    /// The voice room a user currently occupies, if any
    async fn voice_channel_of(&self, community_id: &str, user_id: &str) -> Option<String>;

    /// The bot's own permissions in the community
    async fn bot_capabilities(&self, community_id: &str) -> Result<Capabilities>;

    /// Move a member into a voice room
    async fn move_member(
        &self,
        community_id: &str,
        user_id: &str,
        voice_channel_id: &str,
    ) -> Result<()>;

    /// Optional: text channel creation capability
    fn channel_creator(&self) -> Option<&dyn ChannelCreator> {
        None
    }

    /// Optional: bot profile editing capability
    fn profile_editor(&self) -> Option<&dyn ProfileEditor> {
        None
    }
}

// =============================================================================
// Optional Capabilities
// =============================================================================

/// Channel creation capability
#[async_trait]
pub trait ChannelCreator: Send + Sync {
    /// Create a text channel in a community, returning its ID
    async fn create_text_channel(&self, community_id: &str, name: &str) -> Result<String>;
}

/// Bot profile editing capability
#[async_trait]
pub trait ProfileEditor: Send + Sync {
    /// Download an attachment's bytes
    async fn download(&self, attachment: &AttachmentInfo) -> Result<Vec<u8>>;

    /// Replace the bot's avatar or banner
    async fn update_image(
        &self,
        kind: ProfileImageKind,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<()>;
}

/// Sends replies back to the interaction that triggered a handler.
///
/// The first reply answers the interaction; later ones are follow-ups.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn reply(&self, reply: Reply) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_roundtrip_through_str() {
        for d in [Decision::Accept, Decision::Reject] {
            assert_eq!(Decision::parse(d.as_str()), Some(d));
        }
        assert_eq!(Decision::parse("maybe"), None);
    }

    #[test]
    fn test_reply_builders() {
        let reply = Reply::public("done")
            .titled("Setup Complete")
            .with_tone(Tone::Success);
        assert!(!reply.ephemeral);
        assert_eq!(reply.title.as_deref(), Some("Setup Complete"));
        assert_eq!(reply.tone, Tone::Success);

        let private = Reply::private("nope");
        assert!(private.ephemeral);
        assert_eq!(private.tone, Tone::Neutral);
    }

    #[test]
    fn test_capabilities_can_relocate_needs_both_bits() {
        let mut caps = Capabilities::default();
        assert!(!caps.can_relocate());
        caps.move_members = true;
        assert!(!caps.can_relocate());
        caps.connect = true;
        assert!(caps.can_relocate());
        assert!(Capabilities::all().can_relocate());
    }

    #[test]
    fn test_message_content_interactivity() {
        let prompt = MessageContent::prompt("hey", "abc");
        assert!(prompt.is_interactive());
        assert_eq!(prompt.text(), "hey");
        assert!(!MessageContent::plain("x").is_interactive());
    }
}
