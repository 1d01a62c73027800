//! Persistence seams
//!
//! Conversation logs and approval records are the single source of truth; everything
//! the core keeps in memory can be rebuilt from them. [`MemoryStore`] is the bundled
//! backend.

mod error;
mod memory;
mod traits;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use traits::{ApprovalStore, ConversationStore};
