// ABOUTME: Shared mock platform and responder for dragme-core integration tests
// ABOUTME: Records every platform call in a single journal so ordering can be asserted

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use dragme_core::traits::{
    AttachmentInfo, Capabilities, ChannelCreator, ChatUser, Invocation, MessageContent,
    MessagingPlatform, ProfileEditor, ProfileImageKind, Reply, Responder, VoicePlatform,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub const GUILD: &str = "guild-1";
pub const INTAKE: &str = "intake-1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub channel_id: String,
    pub message_id: String,
    pub content: MessageContent,
}

#[derive(Default)]
struct MockState {
    channels: HashSet<String>,
    voice: HashMap<String, String>,
    capabilities: Capabilities,
    sent: Vec<Sent>,
    edits: Vec<(String, MessageContent)>,
    deletes: Vec<String>,
    moves: Vec<(String, String)>,
    profile_updates: Vec<(ProfileImageKind, usize, String)>,
    journal: Vec<String>,
    next_id: u64,
    fail_moves: bool,
    fail_sends: bool,
    fail_downloads: bool,
    held_lookups: HashMap<String, Arc<Semaphore>>,
}

/// In-memory voice platform. Ids are plain strings; mentions use the Discord shapes.
pub struct MockPlatform {
    state: Mutex<MockState>,
}

impl MockPlatform {
    pub fn new() -> Arc<Self> {
        let state = MockState {
            capabilities: Capabilities::all(),
            ..Default::default()
        };
        Arc::new(Self {
            state: Mutex::new(state),
        })
    }

    fn with<T>(&self, f: impl FnOnce(&mut MockState) -> T) -> T {
        f(&mut self.state.lock().unwrap())
    }

    pub fn add_channel(&self, channel_id: &str) {
        self.with(|s| s.channels.insert(channel_id.to_string()));
    }

    pub fn remove_channel(&self, channel_id: &str) {
        self.with(|s| s.channels.remove(channel_id));
    }

    pub fn join_voice(&self, user_id: &str, room_id: &str) {
        self.with(|s| s.voice.insert(user_id.to_string(), room_id.to_string()));
    }

    pub fn leave_voice(&self, user_id: &str) {
        self.with(|s| s.voice.remove(user_id));
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.with(|s| s.capabilities = capabilities);
    }

    /// Make existence checks for `channel_id` wait until the returned gate gets a permit
    pub fn hold_lookups(&self, channel_id: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.with(|s| {
            s.held_lookups
                .insert(channel_id.to_string(), Arc::clone(&gate))
        });
        gate
    }

    pub fn fail_moves(&self) {
        self.with(|s| s.fail_moves = true);
    }

    pub fn fail_sends(&self) {
        self.with(|s| s.fail_sends = true);
    }

    pub fn fail_downloads(&self) {
        self.with(|s| s.fail_downloads = true);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.with(|s| s.sent.clone())
    }

    pub fn edits(&self) -> Vec<(String, MessageContent)> {
        self.with(|s| s.edits.clone())
    }

    pub fn deletes(&self) -> Vec<String> {
        self.with(|s| s.deletes.clone())
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.with(|s| s.moves.clone())
    }

    pub fn profile_updates(&self) -> Vec<(ProfileImageKind, usize, String)> {
        self.with(|s| s.profile_updates.clone())
    }

    pub fn journal(&self) -> Vec<String> {
        self.with(|s| s.journal.clone())
    }

    pub fn note(&self, entry: String) {
        self.with(|s| s.journal.push(entry));
    }

    /// The handle bound to the most recent prompt
    pub fn last_prompt_handle(&self) -> Option<String> {
        self.with(|s| {
            s.sent.iter().rev().find_map(|sent| match &sent.content {
                MessageContent::Prompt { handle, .. } => Some(handle.clone()),
                MessageContent::Plain(_) => None,
            })
        })
    }
}

#[async_trait]
impl MessagingPlatform for MockPlatform {
    fn platform_id(&self) -> &'static str {
        "mock"
    }

    fn bot_user_id(&self) -> &str {
        "bot"
    }

    async fn send(&self, channel_id: &str, content: MessageContent) -> Result<String> {
        // Suspend like a network call so concurrent commands interleave
        tokio::task::yield_now().await;
        self.with(|s| {
            if s.fail_sends {
                bail!("send refused");
            }
            s.next_id += 1;
            let message_id = format!("msg-{}", s.next_id);
            s.journal.push(format!("send:{}", message_id));
            s.sent.push(Sent {
                channel_id: channel_id.to_string(),
                message_id: message_id.clone(),
                content,
            });
            Ok(message_id)
        })
    }

    async fn edit(
        &self,
        _channel_id: &str,
        message_id: &str,
        content: MessageContent,
    ) -> Result<()> {
        self.with(|s| {
            s.journal.push(format!("edit:{}", message_id));
            s.edits.push((message_id.to_string(), content));
        });
        Ok(())
    }

    async fn delete(&self, _channel_id: &str, message_id: &str) -> Result<()> {
        self.with(|s| {
            s.journal.push(format!("delete:{}", message_id));
            s.deletes.push(message_id.to_string());
        });
        Ok(())
    }
}

#[async_trait]
impl VoicePlatform for MockPlatform {
    async fn channel_exists(&self, _community_id: &str, channel_id: &str) -> bool {
        let gate = self.with(|s| s.held_lookups.get(channel_id).cloned());
        if let Some(gate) = gate {
            let _permit = gate.acquire().await;
        }
        self.with(|s| s.channels.contains(channel_id))
    }

    async fn voice_channel_of(&self, _community_id: &str, user_id: &str) -> Option<String> {
        self.with(|s| s.voice.get(user_id).cloned())
    }

    async fn bot_capabilities(&self, _community_id: &str) -> Result<Capabilities> {
        Ok(self.with(|s| s.capabilities))
    }

    async fn move_member(&self, _community_id: &str, user_id: &str, room_id: &str) -> Result<()> {
        self.with(|s| {
            s.journal.push(format!("move:{}", user_id));
            if s.fail_moves {
                bail!("Target user is not connected to voice");
            }
            s.voice.insert(user_id.to_string(), room_id.to_string());
            s.moves.push((user_id.to_string(), room_id.to_string()));
            Ok(())
        })
    }

    fn channel_creator(&self) -> Option<&dyn ChannelCreator> {
        Some(self)
    }

    fn profile_editor(&self) -> Option<&dyn ProfileEditor> {
        Some(self)
    }
}

#[async_trait]
impl ChannelCreator for MockPlatform {
    async fn create_text_channel(&self, _community_id: &str, name: &str) -> Result<String> {
        Ok(self.with(|s| {
            s.next_id += 1;
            let channel_id = format!("{}-{}", name, s.next_id);
            s.channels.insert(channel_id.clone());
            channel_id
        }))
    }
}

#[async_trait]
impl ProfileEditor for MockPlatform {
    async fn download(&self, attachment: &AttachmentInfo) -> Result<Vec<u8>> {
        tokio::task::yield_now().await;
        if self.with(|s| s.fail_downloads) {
            bail!("download failed");
        }
        Ok(vec![0u8; attachment.size as usize])
    }

    async fn update_image(
        &self,
        kind: ProfileImageKind,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<()> {
        self.with(|s| {
            s.profile_updates
                .push((kind, data.len(), mime_type.to_string()))
        });
        Ok(())
    }
}

/// Captures replies and notes them in the platform journal
pub struct RecordingResponder {
    platform: Arc<MockPlatform>,
    replies: Mutex<Vec<Reply>>,
}

impl RecordingResponder {
    pub fn new(platform: &Arc<MockPlatform>) -> Self {
        Self {
            platform: Arc::clone(platform),
            replies: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(&self) -> Vec<Reply> {
        self.replies.lock().unwrap().clone()
    }

    pub fn last(&self) -> Reply {
        self.replies().last().cloned().expect("no reply recorded")
    }
}

#[async_trait]
impl Responder for RecordingResponder {
    async fn reply(&self, reply: Reply) -> Result<()> {
        self.platform.note(format!("reply:{}", reply.content));
        self.replies.lock().unwrap().push(reply);
        Ok(())
    }
}

pub fn invocation(user_id: &str, channel_id: &str) -> Invocation {
    Invocation {
        community_id: GUILD.to_string(),
        channel_id: channel_id.to_string(),
        user: ChatUser::new(user_id),
        permissions: Capabilities::default(),
    }
}

pub fn admin_invocation(user_id: &str, channel_id: &str) -> Invocation {
    Invocation {
        permissions: Capabilities::all(),
        ..invocation(user_id, channel_id)
    }
}
