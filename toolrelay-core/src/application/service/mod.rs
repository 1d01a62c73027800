//! Turn boundary: conversation lifecycle, busy tracking, inbound command routing and
//! the wiring that assembles a running bridge.

mod bootstrap;
mod busy;
mod command;
mod error;
mod inbound;
mod manager;

pub use bootstrap::Bridge;
pub use busy::{BusyGuard, BusyRegistry};
pub use command::InboundCommand;
pub use error::ServiceError;
pub use inbound::{ConversationService, InboundOutcome};
pub use manager::ConversationManager;
