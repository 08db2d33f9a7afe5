// ABOUTME: Platform abstraction module for dragme
// ABOUTME: Re-exports platform implementations (Discord)

#[cfg(feature = "discord")]
pub mod discord;

#[cfg(feature = "discord")]
pub use discord::{DiscordHandler, DiscordPlatform};
