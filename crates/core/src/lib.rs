pub mod config;
pub mod endpoints;
pub mod journal;
pub mod playback;
pub mod progress;
pub mod ready;
pub mod retry;
pub mod status;
pub mod testing;
pub mod upload;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, EndpointsConfig,
    UploadConfig,
};
pub use journal::{create_journal, JournalEntry, JournalHandle, JournalLog, WorkflowEvent};
pub use playback::{PlaybackController, PlaybackEngine, PlaybackError, PlaybackSession};
pub use progress::ProgressTracker;
pub use ready::{HttpReadyClient, ReadyClient, ReadyError, ReadyListView};
pub use retry::{RetryConfig, RetryEvent, RetryScheduler};
pub use status::{StatusConnector, StatusMessage, StatusSession, WsConnector};
pub use upload::{
    HttpUploadClient, JobSlot, JobState, StatusLine, UploadClient, UploadOrchestrator,
    UploadPayload,
};
