// ABOUTME: Typed outcomes for the move-request workflow and its supporting commands
// ABOUTME: Each Display string is the user-facing text; mentions are rendered before construction

use std::time::Duration;
use thiserror::Error;

/// A move-request precondition that did not hold
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("This command can only be used in the designated drag-requests channel.")]
    WrongChannel,

    #[error("The bot does not have the necessary permissions to move users into voice channels.")]
    MissingCapability,

    #[error("{requester}, you must be in a voice channel to use this command.")]
    RequesterNotInVoice { requester: String },

    #[error("{target} is not in a voice channel.")]
    TargetNotInVoice { target: String },

    #[error("{requester}, you are already in {target}'s voice channel!")]
    SameVoiceChannel { requester: String, target: String },

    #[error("You cannot send a move request to yourself.")]
    SelfTarget,
}

/// Errors that end a request attempt or decision without changing any state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error(transparent)]
    PreconditionFailed(#[from] Precondition),

    #[error("You are not authorized to {action} this request.")]
    Unauthorized { action: &'static str },

    #[error("This request is no longer active.")]
    Stale,

    #[error("Please wait {} seconds before using this command again.", format_wait(.remaining))]
    Throttled { remaining: Duration },

    #[error("A request channel is already set up: {existing}")]
    RegistryConflict { existing: String },
}

/// Refused state machine transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("only the request target may decide")]
    Unauthorized,
    #[error("request already resolved")]
    AlreadyResolved,
}

/// Registry mutations that were refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("community {community_id} already has intake channel {existing}")]
    AlreadyExists {
        community_id: String,
        existing: String,
    },
}

/// Reasons a profile image upload is refused before touching the platform
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("You do not have permission to use this command.")]
    NotOwner,

    #[error("Please wait {} more seconds before updating the {kind}.", .remaining.as_secs())]
    Cooldown {
        kind: &'static str,
        remaining: Duration,
    },

    #[error("Unsupported file type. Please upload an image in PNG, JPG, JPEG, GIF, or WEBP format.")]
    UnsupportedType,

    #[error("File is too large. Please upload an image under {} MB.", .limit / (1024 * 1024))]
    TooLarge { limit: u64 },

    #[error("This platform does not support profile updates.")]
    Unsupported,
}

fn format_wait(remaining: &Duration) -> String {
    format!("{:.2}", remaining.as_secs_f64())
}
