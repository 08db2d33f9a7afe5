// ABOUTME: Bot profile image updates through serenity's HTTP client
// ABOUTME: Fetches the uploaded attachment and applies it as the bot's avatar or banner

use anyhow::{Context, Result};
use async_trait::async_trait;
use dragme_core::traits::{AttachmentInfo, ProfileEditor, ProfileImageKind};
use serenity::all::{CreateAttachment, EditProfile, Http};
use std::sync::Arc;

pub struct DiscordProfileEditor {
    http: Arc<Http>,
}

impl DiscordProfileEditor {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

/// Profile edit that replaces only the image for `kind`
pub fn profile_edit(kind: ProfileImageKind, image: &CreateAttachment) -> EditProfile {
    match kind {
        ProfileImageKind::Avatar => EditProfile::new().avatar(image),
        ProfileImageKind::Banner => EditProfile::new().banner(image),
    }
}

fn image_filename(kind: ProfileImageKind, mime_type: &str) -> String {
    let extension = mime_type.strip_prefix("image/").unwrap_or("png");
    format!("{}.{}", kind, extension)
}

#[async_trait]
impl ProfileEditor for DiscordProfileEditor {
    async fn download(&self, attachment: &AttachmentInfo) -> Result<Vec<u8>> {
        let file = CreateAttachment::url(&self.http, &attachment.source_id)
            .await
            .with_context(|| format!("Failed to download {}", attachment.filename))?;
        Ok(file.data)
    }

    async fn update_image(
        &self,
        kind: ProfileImageKind,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<()> {
        let size = data.len();
        let image = CreateAttachment::bytes(data, image_filename(kind, mime_type));

        let http: &Http = &self.http;
        let mut bot = http
            .get_current_user()
            .await
            .context("Failed to fetch the bot user")?;
        bot.edit(http, profile_edit(kind, &image))
            .await
            .with_context(|| format!("Discord refused the new {}", kind))?;

        tracing::debug!(kind = %kind, bytes = size, "Uploaded profile image");
        Ok(())
    }
}
