// ABOUTME: Gate for owner-only bot profile image updates
// ABOUTME: Checks the owner list, a per-kind global cooldown and the file before any download

use std::collections::HashSet;
use std::path::Path;
use tokio::time::Instant;

use crate::config::ProfileConfig;
use crate::error::ProfileError;
use crate::throttle::{RequestThrottle, Reservation};
use crate::traits::{AttachmentInfo, ProfileImageKind};

/// Cooldowns are shared by every owner
const GLOBAL_KEY: &str = "bot";

/// Map an image filename to its MIME type by extension
pub fn image_mime_type(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())?
        .to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

/// An admitted upload: the MIME type to send and the cooldown slot it holds
#[must_use]
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub mime_type: &'static str,
    reservation: Reservation,
}

pub struct ProfileGate {
    owners: HashSet<String>,
    max_bytes: u64,
    avatar: RequestThrottle,
    banner: RequestThrottle,
}

impl ProfileGate {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            owners: config.owners(),
            max_bytes: config.max_image_bytes,
            avatar: RequestThrottle::new(config.cooldown()),
            banner: RequestThrottle::new(config.cooldown()),
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owners.contains(user_id)
    }

    /// Validate an update request and take the cooldown slot for `kind`.
    ///
    /// Hand the admission to `release` if the update then fails.
    pub fn admit(
        &self,
        user_id: &str,
        kind: ProfileImageKind,
        attachment: &AttachmentInfo,
        now: Instant,
    ) -> Result<Admission, ProfileError> {
        if !self.is_owner(user_id) {
            return Err(ProfileError::NotOwner);
        }
        let reservation = self
            .throttle(kind)
            .try_acquire(GLOBAL_KEY, now)
            .map_err(|wait| ProfileError::Cooldown {
                kind: kind.as_str(),
                remaining: wait.remaining,
            })?;
        let admission = self.check_file(attachment).map(|mime_type| Admission {
            mime_type,
            reservation,
        });
        if admission.is_err() {
            self.throttle(kind).release(GLOBAL_KEY, reservation);
        }
        admission
    }

    /// Return the cooldown slot of an update that did not go through
    pub fn release(&self, kind: ProfileImageKind, admission: Admission) {
        self.throttle(kind).release(GLOBAL_KEY, admission.reservation);
    }

    fn check_file(&self, attachment: &AttachmentInfo) -> Result<&'static str, ProfileError> {
        let mime_type =
            image_mime_type(&attachment.filename).ok_or(ProfileError::UnsupportedType)?;
        if attachment.size > self.max_bytes {
            return Err(ProfileError::TooLarge {
                limit: self.max_bytes,
            });
        }
        Ok(mime_type)
    }

    fn throttle(&self, kind: ProfileImageKind) -> &RequestThrottle {
        match kind {
            ProfileImageKind::Avatar => &self.avatar,
            ProfileImageKind::Banner => &self.banner,
        }
    }
}
