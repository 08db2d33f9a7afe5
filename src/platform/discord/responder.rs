// ABOUTME: Responder that answers Discord interactions
// ABOUTME: The first reply is the interaction response; every later one is a follow-up

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use dragme_core::traits::{Reply, Responder};
use serenity::all::{
    CommandInteraction, ComponentInteraction, CreateInteractionResponse,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, Http,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::components::reply_embed;

enum Source {
    Command(CommandInteraction),
    Component(ComponentInteraction),
}

pub struct InteractionResponder {
    http: Arc<Http>,
    source: Source,
    answered: AtomicBool,
}

impl InteractionResponder {
    pub fn for_command(http: Arc<Http>, interaction: CommandInteraction) -> Self {
        Self::new(http, Source::Command(interaction))
    }

    pub fn for_component(http: Arc<Http>, interaction: ComponentInteraction) -> Self {
        Self::new(http, Source::Component(interaction))
    }

    fn new(http: Arc<Http>, source: Source) -> Self {
        Self {
            http,
            source,
            answered: AtomicBool::new(false),
        }
    }

    async fn respond(&self, reply: &Reply) -> Result<()> {
        let mut message = CreateInteractionResponseMessage::new().ephemeral(reply.ephemeral);
        message = match &reply.title {
            Some(title) => message.embed(reply_embed(title, &reply.content, reply.tone)),
            None => message.content(&reply.content),
        };
        let response = CreateInteractionResponse::Message(message);
        let http: &Http = &self.http;
        match &self.source {
            Source::Command(i) => i.create_response(http, response).await,
            Source::Component(i) => i.create_response(http, response).await,
        }
        .context("Failed to respond to interaction")
    }

    async fn follow_up(&self, reply: &Reply) -> Result<()> {
        let mut followup = CreateInteractionResponseFollowup::new().ephemeral(reply.ephemeral);
        followup = match &reply.title {
            Some(title) => followup.embed(reply_embed(title, &reply.content, reply.tone)),
            None => followup.content(&reply.content),
        };
        let http: &Http = &self.http;
        match &self.source {
            Source::Command(i) => i.create_followup(http, followup).await,
            Source::Component(i) => i.create_followup(http, followup).await,
        }
        .map(|_| ())
        .context("Failed to send interaction follow-up")
    }
}

#[async_trait]
impl Responder for InteractionResponder {
    async fn reply(&self, reply: Reply) -> Result<()> {
        if self.answered.swap(true, Ordering::SeqCst) {
            self.follow_up(&reply).await
        } else {
            self.respond(&reply).await
        }
    }
}
