//! Rebuilds a protocol-valid context from a conversation's append-only log.
//!
//! The result always starts with a user message, alternates roles, and only carries
//! tool results answering the assistant message right before them. Runs fresh on every
//! turn; nothing is cached.

use crate::domain::{TurnMessage, TurnRole};
use crate::types::{ContentBlock, MessageContent, MessageRole, WireMessage};
use tracing::debug;

/// Result substituted for invocations whose result never got persisted.
pub const INTERRUPTED_RESULT: &str = "Error: tool execution was interrupted.";

/// Rebuild the model context from the most recent `max_messages` log entries.
pub fn reconstruct(log: &[TurnMessage], max_messages: usize) -> Vec<WireMessage> {
    let start = log.len().saturating_sub(max_messages);
    let mut messages: Vec<WireMessage> = Vec::new();
    // Invocation ids of the latest assistant message still waiting for a result.
    let mut pending: Vec<String> = Vec::new();

    for entry in &log[start..] {
        match entry.role {
            TurnRole::User => {
                close_pending(&mut messages, &mut pending);
                push_user(&mut messages, entry.content.clone());
            }
            TurnRole::Assistant => {
                close_pending(&mut messages, &mut pending);
                pending = entry
                    .content
                    .blocks()
                    .iter()
                    .filter_map(ContentBlock::tool_use_id)
                    .map(str::to_string)
                    .collect();
                messages.push(WireMessage::assistant(entry.content.clone()));
            }
            TurnRole::ToolResult => {
                let Some(id) = entry.tool_use_id.as_deref() else {
                    debug!(entry = entry.id, "dropping tool result without invocation id");
                    continue;
                };
                let Some(position) = pending.iter().position(|pending_id| pending_id == id) else {
                    debug!(tool_use_id = id, "dropping orphaned tool result");
                    continue;
                };
                pending.remove(position);
                push_tool_result(
                    &mut messages,
                    ContentBlock::tool_result(id, entry.content.text()),
                );
            }
        }
    }
    close_pending(&mut messages, &mut pending);
    strip_leading(&mut messages);
    messages
}

/// Answer invocations the log never recorded a result for.
fn close_pending(messages: &mut Vec<WireMessage>, pending: &mut Vec<String>) {
    for id in pending.drain(..) {
        debug!(tool_use_id = %id, "filling in interrupted tool result");
        push_tool_result(messages, ContentBlock::tool_result(id, INTERRUPTED_RESULT));
    }
}

/// Tool results travel as one batched user message.
fn push_tool_result(messages: &mut Vec<WireMessage>, block: ContentBlock) {
    if let Some(last) = messages.last_mut() {
        if last.role == MessageRole::User && last.content.starts_with_tool_result() {
            if let MessageContent::Blocks(blocks) = &mut last.content {
                blocks.push(block);
                return;
            }
        }
    }
    messages.push(WireMessage::user(vec![block]));
}

/// Consecutive user messages (e.g. after a failed turn) are merged into one.
fn push_user(messages: &mut Vec<WireMessage>, content: MessageContent) {
    if let Some(last) = messages.last_mut() {
        if last.role == MessageRole::User {
            let previous = std::mem::replace(&mut last.content, MessageContent::Blocks(Vec::new()));
            let mut blocks = previous.into_blocks();
            blocks.extend(content.into_blocks());
            last.content = MessageContent::Blocks(blocks);
            return;
        }
    }
    messages.push(WireMessage::user(content));
}

/// Drop leading assistant messages and any tool results they orphan.
fn strip_leading(messages: &mut Vec<WireMessage>) {
    loop {
        let Some(first) = messages.first_mut() else {
            return;
        };
        if first.role != MessageRole::User {
            messages.remove(0);
            continue;
        }
        if !first.content.starts_with_tool_result() {
            return;
        }
        if let MessageContent::Blocks(blocks) = &mut first.content {
            blocks.retain(|block| !block.is_tool_result());
            if blocks.is_empty() {
                messages.remove(0);
                continue;
            }
        }
        return;
    }
}
