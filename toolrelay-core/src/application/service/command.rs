use crate::domain::Decision;

/// What an inbound text asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundCommand {
    Reset,
    Decide { token: String, decision: Decision },
    /// `APPROVE` / `DENY` without a token.
    MalformedDecision,
    Message(String),
}

impl InboundCommand {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("/reset") {
            return InboundCommand::Reset;
        }

        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (trimmed, ""),
        };
        let decision = if head.eq_ignore_ascii_case("approve") {
            Decision::Approve
        } else if head.eq_ignore_ascii_case("deny") {
            Decision::Deny
        } else {
            return InboundCommand::Message(trimmed.to_string());
        };

        if rest.is_empty() {
            InboundCommand::MalformedDecision
        } else {
            InboundCommand::Decide {
                token: rest.to_uppercase(),
                decision,
            }
        }
    }
}
