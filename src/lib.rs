// ABOUTME: Root library module exposing the Discord adapter, keep-alive server and logging setup
// ABOUTME: Re-exports the platform-agnostic workflow modules from dragme-core

use std::sync::{Arc, OnceLock};

pub mod keepalive;
pub mod logging;
pub mod platform;

// Re-export platform-agnostic modules from dragme-core
pub use dragme_core::config;
pub use dragme_core::metrics;
pub use dragme_core::paths;
pub use dragme_core::registry;
pub use dragme_core::router;
pub use dragme_core::traits;

/// Router handle filled in once the platform reports ready; shared with the keep-alive server
pub type SharedRouter = Arc<OnceLock<Arc<dragme_core::CommandRouter>>>;
