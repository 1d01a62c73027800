use super::busy::BusyRegistry;
use super::command::InboundCommand;
use super::error::ServiceError;
use super::manager::ConversationManager;
use crate::agent::{Orchestrator, TurnOutcome};
use crate::approval::{ApprovalGate, DecisionOutcome};
use crate::channel::Channel;
use crate::constants::{BUSY_MESSAGE, RESET_MESSAGE};
use crate::domain::{ApprovalStatus, NewTurnMessage};
use crate::history;
use crate::storage::ConversationStore;
use std::sync::Arc;
use tracing::{error, info, warn};

const MALFORMED_DECISION_MESSAGE: &str = "Invalid format. Use: APPROVE <id> or DENY <id>";

/// What became of one inbound text.
#[derive(Debug, Clone)]
pub enum InboundOutcome {
    Reset,
    Decision {
        token: String,
        outcome: DecisionOutcome,
    },
    MalformedDecision,
    Busy,
    Turn(TurnOutcome),
    /// The turn was aborted; the apology has been sent.
    Failed(String),
}

/// Turn boundary: routes inbound texts and never lets an error escape.
pub struct ConversationService {
    conversations: ConversationManager,
    store: Arc<dyn ConversationStore>,
    busy: Arc<BusyRegistry>,
    gate: Arc<ApprovalGate>,
    orchestrator: Arc<Orchestrator>,
    channel: Arc<dyn Channel>,
    max_messages: usize,
}

impl ConversationService {
    pub fn new(
        conversations: ConversationManager,
        store: Arc<dyn ConversationStore>,
        gate: Arc<ApprovalGate>,
        orchestrator: Arc<Orchestrator>,
        channel: Arc<dyn Channel>,
        max_messages: usize,
    ) -> Self {
        Self {
            conversations,
            store,
            busy: BusyRegistry::new(),
            gate,
            orchestrator,
            channel,
            max_messages,
        }
    }

    pub fn busy(&self) -> &Arc<BusyRegistry> {
        &self.busy
    }

    pub async fn handle_inbound(&self, principal: &str, text: &str) -> InboundOutcome {
        let command = InboundCommand::parse(text);
        match self.dispatch(principal, command).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(principal, error = %err, "inbound handling failed");
                let message = err.user_message();
                self.send(principal, &message).await;
                InboundOutcome::Failed(message)
            }
        }
    }

    async fn dispatch(
        &self,
        principal: &str,
        command: InboundCommand,
    ) -> Result<InboundOutcome, ServiceError> {
        match command {
            InboundCommand::Reset => {
                self.conversations.reset(principal).await?;
                self.send(principal, RESET_MESSAGE).await;
                Ok(InboundOutcome::Reset)
            }
            InboundCommand::MalformedDecision => {
                self.send(principal, MALFORMED_DECISION_MESSAGE).await;
                Ok(InboundOutcome::MalformedDecision)
            }
            InboundCommand::Decide { token, decision } => {
                let outcome = self.gate.decide(&token, decision).await?;
                self.send(principal, &decision_reply(&token, &outcome)).await;
                Ok(InboundOutcome::Decision { token, outcome })
            }
            InboundCommand::Message(text) => self.run_message(principal, text).await,
        }
    }

    async fn run_message(
        &self,
        principal: &str,
        text: String,
    ) -> Result<InboundOutcome, ServiceError> {
        let conversation = self.conversations.get_or_create(principal).await?;
        let Some(_guard) = self.busy.try_acquire(conversation.id) else {
            warn!(conversation = conversation.id, "turn refused, previous one still running");
            self.send(principal, BUSY_MESSAGE).await;
            return Ok(InboundOutcome::Busy);
        };

        self.store
            .append(conversation.id, NewTurnMessage::user(text))
            .await?;
        let log = self.store.read_all(conversation.id).await?;
        let context = history::reconstruct(&log, self.max_messages);
        info!(
            conversation = conversation.id,
            logged = log.len(),
            context = context.len(),
            "context rebuilt"
        );

        let outcome = self
            .orchestrator
            .run_turn(conversation.id, principal, context)
            .await?;
        Ok(InboundOutcome::Turn(outcome))
    }

    async fn send(&self, principal: &str, text: &str) {
        if let Err(err) = self.channel.send_text(principal, text).await {
            warn!(principal, error = %err, "failed to deliver message");
        }
    }
}

fn decision_reply(token: &str, outcome: &DecisionOutcome) -> String {
    match outcome {
        DecisionOutcome::Recorded(ApprovalStatus::Approved) => {
            format!("\u{2705} Request {token} approved.")
        }
        DecisionOutcome::Recorded(status) => {
            format!("\u{274c} Request {token} {}.", status.as_str())
        }
        DecisionOutcome::NotFound | DecisionOutcome::AlreadyResolved(_) => {
            format!("Approval {token} not found or already handled.")
        }
        DecisionOutcome::Expired => format!("Approval {token} has expired."),
    }
}
