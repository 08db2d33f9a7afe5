// ABOUTME: Table of outstanding move-requests with their expiry timers and side effects
// ABOUTME: Decisions and timeouts race for the single transition under one lock that is never held across I/O

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::error::{RequestError, TransitionError};
use crate::metrics;
use crate::move_request::{MoveRequest, RequestId, RequestState};
use crate::traits::{ChatUser, Decision, MessageContent, Reply, Responder, VoicePlatform};

/// Text left on a prompt nobody answered
pub const EXPIRED_NOTICE: &str = "This request has timed out.";

/// Public notice when the relocation call fails after an accept
pub const RELOCATION_FAILED_NOTICE: &str =
    "There was an error moving the user to the voice channel.";

struct Outstanding {
    request: MoveRequest,
    timer: Option<JoinHandle<()>>,
}

/// Owns every PENDING request and the prompts tied to them.
///
/// A request leaves the table at the moment it transitions, before any
/// notice is posted, so a late timer or a second click finds nothing to act on.
pub struct PendingRequests {
    platform: Arc<dyn VoicePlatform>,
    timeout: Duration,
    requests: Mutex<HashMap<RequestId, Outstanding>>,
}

impl PendingRequests {
    pub fn new(platform: Arc<dyn VoicePlatform>, timeout: Duration) -> Self {
        Self {
            platform,
            timeout,
            requests: Mutex::new(HashMap::new()),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of requests still awaiting a decision
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot of a pending request
    pub fn get(&self, id: RequestId) -> Option<MoveRequest> {
        self.lock().get(&id).map(|entry| entry.request.clone())
    }

    /// Post the prompt for `request` and start its expiry timer.
    ///
    /// The request is dropped again if the prompt cannot be posted.
    pub async fn open(
        self: &Arc<Self>,
        request: MoveRequest,
        prompt_text: String,
    ) -> Result<RequestId> {
        let id = request.id;
        let channel_id = request.channel_id.clone();
        let deadline = request.created_at + self.timeout;

        {
            let mut requests = self.lock();
            requests.insert(
                id,
                Outstanding {
                    request,
                    timer: None,
                },
            );
            metrics::set_outstanding_requests(requests.len());
        }

        let message_id = match self
            .platform
            .send(&channel_id, MessageContent::prompt(prompt_text, id.to_string()))
            .await
        {
            Ok(message_id) => message_id,
            Err(e) => {
                let mut requests = self.lock();
                requests.remove(&id);
                metrics::set_outstanding_requests(requests.len());
                return Err(e.context("Failed to post move request prompt"));
            }
        };

        let this = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            this.expire(id).await;
        });

        let attached = {
            let mut requests = self.lock();
            match requests.get_mut(&id) {
                Some(entry) => {
                    entry.request.prompt_message_id = Some(message_id.clone());
                    entry.timer = Some(timer);
                    true
                }
                None => {
                    timer.abort();
                    false
                }
            }
        };

        if !attached {
            // Decided before the prompt id was recorded; clean the prompt up here
            tracing::debug!(request_id = %id, "Request resolved before prompt was attached");
            if let Err(e) = self.platform.delete(&channel_id, &message_id).await {
                tracing::warn!(error = %e, request_id = %id, "Failed to delete orphaned prompt");
            }
        }

        tracing::info!(
            request_id = %id,
            channel_id = %channel_id,
            message_id = %message_id,
            "Move request prompt posted"
        );
        Ok(id)
    }

    /// Apply the actor's decision to request `id` and carry out its side effects.
    pub async fn decide(
        &self,
        id: RequestId,
        actor: &ChatUser,
        decision: Decision,
        responder: &dyn Responder,
    ) -> Result<()> {
        let request = match self.claim(id, &actor.id, decision) {
            Ok(request) => request,
            Err(err) => {
                tracing::debug!(
                    request_id = %id,
                    actor = %actor.id,
                    decision = %decision,
                    reason = %err,
                    "Decision refused"
                );
                return responder.reply(Reply::private(err.to_string())).await;
            }
        };

        tracing::info!(
            request_id = %id,
            requester = %request.requester_id,
            target = %request.target_id,
            state = %request.state(),
            "Move request decided"
        );

        let requester = self.platform.mention_user(&request.requester_id);
        let notice = match request.state() {
            RequestState::Accepted => self.relocate(&request, &requester).await,
            _ => {
                metrics::record_move_outcome("rejected");
                Reply::public(format!("{}'s request has been rejected.", requester))
            }
        };

        let replied = responder.reply(notice).await;
        self.retire_prompt(&request).await;
        replied
    }

    /// Expire request `id` if it is still pending. Returns whether it expired.
    pub async fn expire(&self, id: RequestId) -> bool {
        let request = {
            let mut requests = self.lock();
            let Some(entry) = requests.get_mut(&id) else {
                return false;
            };
            if entry.request.expire().is_err() {
                return false;
            }
            let removed = requests.remove(&id);
            metrics::set_outstanding_requests(requests.len());
            match removed {
                Some(entry) => entry.request,
                None => return false,
            }
        };

        metrics::record_move_outcome("expired");
        tracing::info!(
            request_id = %id,
            requester = %request.requester_id,
            target = %request.target_id,
            "Move request expired"
        );

        if let Some(message_id) = &request.prompt_message_id {
            if let Err(e) = self
                .platform
                .edit(
                    &request.channel_id,
                    message_id,
                    MessageContent::plain(EXPIRED_NOTICE),
                )
                .await
            {
                metrics::record_error("prompt_edit");
                tracing::warn!(error = %e, request_id = %id, "Failed to mark prompt as expired");
            }
        }
        true
    }

    /// Cancel every timer; pending prompts are left as they are
    pub fn shutdown(&self) {
        let mut requests = self.lock();
        for entry in requests.values_mut() {
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
        }
    }

    /// Perform the transition under the lock and pull the request out of the table
    fn claim(
        &self,
        id: RequestId,
        actor_id: &str,
        decision: Decision,
    ) -> Result<MoveRequest, RequestError> {
        let mut requests = self.lock();
        let entry = requests.get_mut(&id).ok_or(RequestError::Stale)?;
        entry
            .request
            .decide(actor_id, decision)
            .map_err(|e| match e {
                TransitionError::Unauthorized => RequestError::Unauthorized {
                    action: decision.as_str(),
                },
                TransitionError::AlreadyResolved => RequestError::Stale,
            })?;

        let Outstanding { request, timer } = requests.remove(&id).ok_or(RequestError::Stale)?;
        if let Some(timer) = timer {
            timer.abort();
        }
        metrics::set_outstanding_requests(requests.len());
        Ok(request)
    }

    async fn relocate(&self, request: &MoveRequest, requester: &str) -> Reply {
        match self
            .platform
            .move_member(
                &request.community_id,
                &request.requester_id,
                &request.target_destination_id,
            )
            .await
        {
            Ok(()) => {
                metrics::record_move_outcome("accepted");
                Reply::public(format!(
                    "{} has been moved to {}.",
                    requester,
                    self.platform.mention_channel(&request.target_destination_id)
                ))
            }
            Err(e) => {
                metrics::record_move_outcome("relocation_failed");
                tracing::error!(
                    error = %e,
                    request_id = %request.id,
                    requester = %request.requester_id,
                    destination = %request.target_destination_id,
                    "Error moving requester to target voice channel"
                );
                Reply::public(RELOCATION_FAILED_NOTICE)
            }
        }
    }

    async fn retire_prompt(&self, request: &MoveRequest) {
        let Some(message_id) = &request.prompt_message_id else {
            return;
        };
        if let Err(e) = self.platform.delete(&request.channel_id, message_id).await {
            metrics::record_error("prompt_delete");
            tracing::warn!(
                error = %e,
                request_id = %request.id,
                "Failed to delete move request prompt"
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, Outstanding>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}
