//! Status channel: the push-based subscription reporting segment-level
//! progress and terminal outcomes for one upload attempt.
//!
//! One logical session exists per attempt, tagged with a monotonically
//! increasing token captured at open time. The token check on every inbound
//! event is the sole cancellation mechanism: events from a superseded
//! connection are dropped unconditionally, even when its close or error
//! fires later.

mod message;
mod session;
mod types;
mod ws;

pub use message::{classify_failure_reason, FailureClass, StatusMessage};
pub use session::{SessionEvent, SessionEventKind, StatusConnector, StatusSession, StatusStream};
pub use types::{SessionToken, StatusError};
pub use ws::WsConnector;
