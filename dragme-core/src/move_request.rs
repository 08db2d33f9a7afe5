// ABOUTME: State machine for a single request to be moved into another user's voice room
// ABOUTME: PENDING moves exactly once to ACCEPTED, REJECTED or EXPIRED; only the target may decide

use std::fmt;
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::TransitionError;
use crate::traits::Decision;

/// Opaque handle binding a prompt's affordances to its request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Pending,
    Accepted,
    Rejected,
    Expired,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Accepted => "accepted",
            RequestState::Rejected => "rejected",
            RequestState::Expired => "expired",
        }
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outstanding request from `requester_id` to join `target_id`.
///
/// `target_destination_id` is captured at creation and never re-validated;
/// the accept path has to cope with it having gone stale.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub id: RequestId,
    pub community_id: String,
    /// Channel the prompt is posted in
    pub channel_id: String,
    pub requester_id: String,
    pub target_id: String,
    pub target_destination_id: String,
    pub prompt_message_id: Option<String>,
    pub created_at: Instant,
    state: RequestState,
}

impl MoveRequest {
    pub fn new(
        community_id: impl Into<String>,
        channel_id: impl Into<String>,
        requester_id: impl Into<String>,
        target_id: impl Into<String>,
        target_destination_id: impl Into<String>,
        created_at: Instant,
    ) -> Self {
        Self {
            id: RequestId::new(),
            community_id: community_id.into(),
            channel_id: channel_id.into(),
            requester_id: requester_id.into(),
            target_id: target_id.into(),
            target_destination_id: target_destination_id.into(),
            prompt_message_id: None,
            created_at,
            state: RequestState::Pending,
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Apply the target's decision.
    ///
    /// Anyone other than the target is refused and the request stays pending.
    pub fn decide(
        &mut self,
        actor_id: &str,
        decision: Decision,
    ) -> Result<RequestState, TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::AlreadyResolved);
        }
        if actor_id != self.target_id {
            return Err(TransitionError::Unauthorized);
        }
        self.state = match decision {
            Decision::Accept => RequestState::Accepted,
            Decision::Reject => RequestState::Rejected,
        };
        Ok(self.state)
    }

    /// Expire a request nobody answered
    pub fn expire(&mut self) -> Result<RequestState, TransitionError> {
        if self.state.is_terminal() {
            return Err(TransitionError::AlreadyResolved);
        }
        self.state = RequestState::Expired;
        Ok(self.state)
    }
}
