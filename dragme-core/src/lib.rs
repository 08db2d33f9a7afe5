// ABOUTME: Platform-agnostic move-request workflow for voice community bots
// ABOUTME: Provides platform traits, the intake channel registry, throttling and the request state machine

pub mod config;
pub mod error;
pub mod metrics;
pub mod move_request;
pub mod paths;
pub mod pending;
pub mod profile;
pub mod registry;
pub mod router;
pub mod throttle;
pub mod traits;

pub use config::Config;
pub use error::{Precondition, ProfileError, RegistryError, RequestError, TransitionError};
pub use move_request::{MoveRequest, RequestId, RequestState};
pub use pending::PendingRequests;
pub use registry::ChannelRegistry;
pub use router::CommandRouter;
pub use throttle::RequestThrottle;

// Re-export core traits for convenient access
pub use traits::{
    // Tier 1: Messaging Platform
    MessagingPlatform,
    // Tier 2: Voice Platform
    VoicePlatform,
    // Optional Capabilities
    ChannelCreator, ProfileEditor,
    // Interaction replies
    Responder,
    // Data Types
    AttachmentInfo, Capabilities, ChatUser, Decision, Invocation, MessageContent,
    ProfileImageKind, Reply, Tone,
};
