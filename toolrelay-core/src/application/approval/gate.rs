use super::error::ApprovalError;
use crate::channel::Channel;
use crate::config::ApprovalSettings;
use crate::domain::{ApprovalRequest, ApprovalStatus, ConversationId, Decision};
use crate::storage::{ApprovalStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, sleep};
use tracing::{info, warn};
use uuid::Uuid;

const TOKEN_LEN: usize = 8;
const TOKEN_ATTEMPTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateSettings {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl From<&ApprovalSettings> for GateSettings {
    fn from(settings: &ApprovalSettings) -> Self {
        Self {
            timeout: settings.timeout(),
            poll_interval: settings.poll_interval(),
        }
    }
}

/// Terminal result of one approval cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved,
    Denied,
    Expired,
}

impl ApprovalOutcome {
    pub fn is_approved(self) -> bool {
        matches!(self, ApprovalOutcome::Approved)
    }

    fn from_status(status: ApprovalStatus) -> Option<Self> {
        match status {
            ApprovalStatus::Pending => None,
            ApprovalStatus::Approved => Some(ApprovalOutcome::Approved),
            ApprovalStatus::Denied => Some(ApprovalOutcome::Denied),
            ApprovalStatus::Expired => Some(ApprovalOutcome::Expired),
        }
    }
}

/// What happened to an inbound APPROVE / DENY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    Recorded(ApprovalStatus),
    NotFound,
    AlreadyResolved(ApprovalStatus),
    Expired,
}

/// Short opaque token the human types back: 8 uppercase hex characters.
pub fn new_token() -> String {
    let mut token = Uuid::new_v4().simple().to_string();
    token.truncate(TOKEN_LEN);
    token.to_uppercase()
}

/// Records approval requests, notifies the approver and waits for the decision.
///
/// Waiting is a poll against the store that also wakes early when [`ApprovalGate::decide`]
/// runs in the same process. No lock is held while waiting.
pub struct ApprovalGate {
    store: Arc<dyn ApprovalStore>,
    channel: Arc<dyn Channel>,
    settings: GateSettings,
    decided: Notify,
}

impl ApprovalGate {
    pub fn new(
        store: Arc<dyn ApprovalStore>,
        channel: Arc<dyn Channel>,
        settings: GateSettings,
    ) -> Self {
        Self {
            store,
            channel,
            settings,
            decided: Notify::new(),
        }
    }

    pub fn settings(&self) -> GateSettings {
        self.settings
    }

    /// Persist a pending request, notify `principal` and return the token.
    pub async fn request(
        &self,
        conversation_id: ConversationId,
        principal: &str,
        tool_name: &str,
        tool_input: &serde_json::Value,
        description: &str,
    ) -> Result<String, ApprovalError> {
        let created_at = Utc::now();
        let expires_at = created_at + chrono_duration(self.settings.timeout);

        let mut attempts = 0;
        let token = loop {
            attempts += 1;
            let token = new_token();
            let record = ApprovalRequest {
                token: token.clone(),
                conversation_id,
                tool_name: tool_name.to_string(),
                tool_input: tool_input.to_string(),
                description: description.to_string(),
                created_at,
                expires_at,
                status: ApprovalStatus::Pending,
                decided_at: None,
            };
            match self.store.insert(record).await {
                Ok(()) => break token,
                Err(StoreError::DuplicateApproval(_)) if attempts < TOKEN_ATTEMPTS => continue,
                Err(err) => return Err(err.into()),
            }
        };

        info!(
            token = %token,
            tool = tool_name,
            conversation = conversation_id,
            "approval requested"
        );
        if let Err(err) = self
            .channel
            .send_approval_request(principal, description, &token)
            .await
        {
            // Nobody can answer a request that was never shown; close it out now.
            warn!(token = %token, error = %err, "approver unreachable, expiring request");
            self.store
                .transition(&token, ApprovalStatus::Pending, ApprovalStatus::Expired, Utc::now())
                .await?;
            return Err(err.into());
        }
        Ok(token)
    }

    /// Wait for a terminal status, expiring the request when the timeout elapses.
    ///
    /// A decision that lands before the expiry transition wins.
    pub async fn await_decision(
        &self,
        token: &str,
        principal: &str,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let deadline = Instant::now() + self.settings.timeout;

        loop {
            let notified = self.decided.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.store.get(token).await? {
                Some(record) => {
                    if let Some(outcome) = ApprovalOutcome::from_status(record.status) {
                        info!(token, outcome = ?outcome, "approval resolved");
                        return Ok(outcome);
                    }
                }
                None => {
                    warn!(token, "approval record vanished, treating as expired");
                    return Ok(ApprovalOutcome::Expired);
                }
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let wait = self.settings.poll_interval.min(deadline - now);
            tokio::select! {
                _ = &mut notified => {}
                _ = sleep(wait) => {}
            }
        }

        if self
            .store
            .transition(token, ApprovalStatus::Pending, ApprovalStatus::Expired, Utc::now())
            .await?
        {
            warn!(token, "approval expired");
            if let Err(err) = self
                .channel
                .send_text(principal, &format!("Approval {token} expired."))
                .await
            {
                warn!(token, error = %err, "failed to send expiry notice");
            }
            return Ok(ApprovalOutcome::Expired);
        }

        let status = self.store.get(token).await?.map(|record| record.status);
        Ok(status
            .and_then(ApprovalOutcome::from_status)
            .unwrap_or(ApprovalOutcome::Expired))
    }

    /// Request and wait in one step.
    pub async fn authorize(
        &self,
        conversation_id: ConversationId,
        principal: &str,
        tool_name: &str,
        tool_input: &serde_json::Value,
        description: &str,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let token = self
            .request(conversation_id, principal, tool_name, tool_input, description)
            .await?;
        self.await_decision(&token, principal).await
    }

    /// Record a human decision. Tokens are matched case-insensitively.
    pub async fn decide(
        &self,
        token: &str,
        decision: Decision,
    ) -> Result<DecisionOutcome, ApprovalError> {
        let token = token.trim().to_uppercase();
        let now = Utc::now();

        let Some(record) = self.store.get(&token).await? else {
            return Ok(DecisionOutcome::NotFound);
        };
        if record.status.is_terminal() {
            return Ok(DecisionOutcome::AlreadyResolved(record.status));
        }
        if record.is_overdue(now) {
            self.store
                .transition(&token, ApprovalStatus::Pending, ApprovalStatus::Expired, now)
                .await?;
            self.decided.notify_waiters();
            return Ok(DecisionOutcome::Expired);
        }

        let next = decision.status();
        if self
            .store
            .transition(&token, ApprovalStatus::Pending, next, now)
            .await?
        {
            info!(token = %token, status = next.as_str(), "approval decided");
            self.decided.notify_waiters();
            return Ok(DecisionOutcome::Recorded(next));
        }

        let current = self
            .store
            .get(&token)
            .await?
            .map(|record| record.status)
            .unwrap_or(ApprovalStatus::Expired);
        Ok(DecisionOutcome::AlreadyResolved(current))
    }

    /// Current status as of `now`; an overdue pending request is expired on read.
    pub async fn status_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ApprovalStatus>, ApprovalError> {
        let Some(record) = self.store.get(token).await? else {
            return Ok(None);
        };
        if record.is_overdue(now) {
            self.store
                .transition(token, ApprovalStatus::Pending, ApprovalStatus::Expired, now)
                .await?;
            let status = self.store.get(token).await?.map(|record| record.status);
            return Ok(status);
        }
        Ok(Some(record.status))
    }

    pub async fn status(&self, token: &str) -> Result<Option<ApprovalStatus>, ApprovalError> {
        self.status_at(token, Utc::now()).await
    }

    /// Expire every overdue pending request, e.g. after a restart. Returns how many.
    pub async fn sweep_expired(&self) -> Result<usize, ApprovalError> {
        let now = Utc::now();
        let mut expired = 0;
        for record in self.store.pending().await? {
            if record.is_overdue(now)
                && self
                    .store
                    .transition(
                        &record.token,
                        ApprovalStatus::Pending,
                        ApprovalStatus::Expired,
                        now,
                    )
                    .await?
            {
                expired += 1;
            }
        }
        if expired > 0 {
            info!(count = expired, "expired stale approvals");
        }
        Ok(expired)
    }
}

fn chrono_duration(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::days(36_500))
}
