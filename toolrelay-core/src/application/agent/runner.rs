use super::errors::AgentError;
use super::models::{OrchestratorOptions, ToolStep, TurnOutcome, TurnStatus};
use crate::approval::ApprovalGate;
use crate::capability::{CapabilityRegistry, MediaMarker};
use crate::channel::Channel;
use crate::constants::{DENIED_RESULT, MAX_ROUNDS_MESSAGE};
use crate::domain::{ConversationId, NewTurnMessage};
use crate::model::{ModelProvider, ModelRequest, ModelResponse, StopReason, ToolInvocation};
use crate::storage::ConversationStore;
use crate::types::{ContentBlock, WireMessage};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Orchestrator {
    provider: Arc<dyn ModelProvider>,
    registry: Arc<CapabilityRegistry>,
    gate: Arc<ApprovalGate>,
    store: Arc<dyn ConversationStore>,
    channel: Arc<dyn Channel>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        registry: Arc<CapabilityRegistry>,
        gate: Arc<ApprovalGate>,
        store: Arc<dyn ConversationStore>,
        channel: Arc<dyn Channel>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            provider,
            registry,
            gate,
            store,
            channel,
            options,
        }
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run one turn on top of `context`, which must already end with the new user
    /// content. Every assistant message and tool result is persisted as it happens.
    pub async fn run_turn(
        &self,
        conversation_id: ConversationId,
        principal: &str,
        mut context: Vec<WireMessage>,
    ) -> Result<TurnOutcome, AgentError> {
        info!(conversation = conversation_id, "turn started");
        let tools = self.registry.definitions();
        let mut steps = Vec::new();
        let mut rounds = 0;
        let mut notice_sent = false;

        while rounds < self.options.max_rounds {
            rounds += 1;
            debug!(
                conversation = conversation_id,
                round = rounds,
                messages = context.len(),
                "calling model"
            );
            let response = self
                .provider
                .send(ModelRequest {
                    model: self.options.model.clone(),
                    system: self.options.system.clone(),
                    max_tokens: self.options.max_tokens,
                    messages: context.clone(),
                    tools: tools.clone(),
                })
                .await?;
            let invocations = response.invocations();

            match response.stop_reason.clone() {
                StopReason::ToolUse if !invocations.is_empty() => {
                    self.store
                        .append(
                            conversation_id,
                            NewTurnMessage::assistant(response.content.clone()),
                        )
                        .await?;

                    if !notice_sent {
                        notice_sent = true;
                        if let Some(notice) = self.options.working_notice.as_deref() {
                            self.send(principal, notice).await;
                        }
                    }

                    let mut results = Vec::with_capacity(invocations.len());
                    for invocation in invocations {
                        let step = self
                            .dispatch(conversation_id, principal, rounds, invocation)
                            .await;
                        self.store
                            .append(
                                conversation_id,
                                NewTurnMessage::tool_result(
                                    &step.tool_use_id,
                                    &step.tool,
                                    &step.output,
                                ),
                            )
                            .await?;
                        results.push(ContentBlock::tool_result(&step.tool_use_id, &step.output));
                        steps.push(step);
                    }

                    context.push(WireMessage::assistant(response.content));
                    context.push(WireMessage::user(results));
                }
                StopReason::EndTurn | StopReason::ToolUse => {
                    let reply = self.finish(conversation_id, principal, response).await?;
                    info!(conversation = conversation_id, rounds, "turn completed");
                    return Ok(TurnOutcome {
                        status: TurnStatus::Completed,
                        reply,
                        rounds,
                        steps,
                    });
                }
                StopReason::Other(reason) => {
                    warn!(conversation = conversation_id, reason = %reason, "unexpected stop reason");
                    if !response.content.is_empty() {
                        self.store
                            .append(
                                conversation_id,
                                NewTurnMessage::assistant(response.content),
                            )
                            .await?;
                    }
                    let reply = format!("Unexpected stop reason: {reason}");
                    self.send(principal, &reply).await;
                    return Ok(TurnOutcome {
                        status: TurnStatus::UnexpectedStop(reason),
                        reply,
                        rounds,
                        steps,
                    });
                }
            }
        }

        warn!(conversation = conversation_id, rounds, "round ceiling reached");
        self.send(principal, MAX_ROUNDS_MESSAGE).await;
        Ok(TurnOutcome {
            status: TurnStatus::MaxRoundsExceeded,
            reply: MAX_ROUNDS_MESSAGE.to_string(),
            rounds,
            steps,
        })
    }

    /// Persist and emit the final text of a turn.
    async fn finish(
        &self,
        conversation_id: ConversationId,
        principal: &str,
        response: ModelResponse,
    ) -> Result<String, AgentError> {
        let reply = response.text();
        if reply.is_empty() {
            warn!(conversation = conversation_id, "model ended the turn without text");
            return Ok(reply);
        }
        let blocks = response
            .content
            .into_iter()
            .filter(|block| matches!(block, ContentBlock::Text { .. }))
            .collect();
        self.store
            .append(conversation_id, NewTurnMessage::assistant(blocks))
            .await?;
        self.send(principal, &reply).await;
        Ok(reply)
    }

    /// Run one invocation, asking for approval first when the policy says so.
    async fn dispatch(
        &self,
        conversation_id: ConversationId,
        principal: &str,
        round: usize,
        invocation: ToolInvocation,
    ) -> ToolStep {
        let ToolInvocation { id, name, input } = invocation;
        let mut step = ToolStep {
            round,
            tool: name,
            tool_use_id: id,
            input,
            executed: false,
            output: DENIED_RESULT.to_string(),
        };

        if self.registry.needs_approval(&step.tool, &step.input) {
            let description = self.registry.describe_invocation(&step.tool, &step.input);
            match self
                .gate
                .authorize(conversation_id, principal, &step.tool, &step.input, &description)
                .await
            {
                Ok(outcome) if outcome.is_approved() => {}
                Ok(outcome) => {
                    info!(tool = %step.tool, outcome = ?outcome, "invocation not approved");
                    return step;
                }
                Err(err) => {
                    warn!(tool = %step.tool, error = %err, "approval failed, treating as denied");
                    return step;
                }
            }
        }

        info!(tool = %step.tool, tool_use_id = %step.tool_use_id, "executing tool");
        let output = self.registry.execute(&step.tool, step.input.clone()).await;
        step.output = match MediaMarker::parse(&output) {
            Some(marker) => self.deliver_media(principal, marker).await,
            None => output,
        };
        step.executed = true;
        step
    }

    async fn deliver_media(&self, principal: &str, marker: MediaMarker) -> String {
        match self
            .channel
            .send_media(principal, &marker.media_url, &marker.caption)
            .await
        {
            Ok(()) => format!("Media sent to the user: {}", marker.media_url),
            Err(err) => {
                warn!(error = %err, "media delivery failed");
                format!("Error: failed to send media: {err}")
            }
        }
    }

    /// Outbound delivery failures are logged; the turn goes on.
    async fn send(&self, principal: &str, text: &str) {
        if let Err(err) = self.channel.send_text(principal, text).await {
            warn!(principal, error = %err, "failed to deliver message");
        }
    }
}
