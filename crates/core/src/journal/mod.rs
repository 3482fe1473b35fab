//! Workflow event journal.
//!
//! Every raw inbound channel event and every state transition reason is
//! recorded chronologically. Components emit through a cheaply-cloneable
//! [`JournalHandle`]; a single recorder task appends timestamped envelopes
//! to the shared in-memory log that backs the user-visible history.

mod events;
mod handle;
mod recorder;

pub use events::WorkflowEvent;
pub use handle::{JournalEntry, JournalHandle};
pub use recorder::{create_journal, JournalLog, JournalRecorder};
