//! Countdown-based retry scheduling for the single retryable failure class.
//!
//! One cycle per job: armed to a fixed budget when a retryable failure is
//! observed with no cycle active, ticking down once per second. Every tick
//! publishes the remaining budget so the orchestrator can surface a
//! countdown and re-invoke the upload in retry mode; the tick where the
//! budget would drop below one reports exhaustion instead, exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Configuration for the retry scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total countdown budget for one retry cycle, in ticks.
    #[serde(default = "default_budget_ticks")]
    pub budget_ticks: u32,

    /// Tick granularity in seconds.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

fn default_budget_ticks() -> u32 {
    10
}

fn default_tick_secs() -> u64 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            budget_ticks: default_budget_ticks(),
            tick_secs: default_tick_secs(),
        }
    }
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Budget decremented; this many ticks remain.
    Countdown(u32),
    /// The budget would drop below one: the cycle is over.
    Exhausted,
}

/// Pure countdown state for one retry cycle.
///
/// Ticking never increases the remaining budget; re-arming is the
/// scheduler's decision and only happens when no cycle is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryCycle {
    remaining: u32,
}

impl RetryCycle {
    /// Arm a cycle with the full budget.
    pub fn arm(budget: u32) -> Self {
        Self { remaining: budget }
    }

    /// Remaining ticks in the budget.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Consume one tick of budget.
    pub fn tick(&mut self) -> TickOutcome {
        if self.remaining <= 1 {
            self.remaining = 0;
            return TickOutcome::Exhausted;
        }
        self.remaining -= 1;
        TickOutcome::Countdown(self.remaining)
    }
}

/// Events published by a running retry cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryEvent {
    /// One tick elapsed; the orchestrator publishes the countdown and, if
    /// the job is still waiting, fires the retry attempt.
    Tick { remaining: u32 },
    /// The budget is consumed without success.
    Exhausted,
}

/// Owns the countdown timer task for the current retry cycle.
///
/// At most one cycle is active at a time. All pending timers are cancelable
/// and must be canceled when the job succeeds, fails terminally for a
/// non-retryable reason, or a brand-new attempt is started by the user.
pub struct RetryScheduler {
    config: RetryConfig,
    events: mpsc::Sender<RetryEvent>,
    active: Arc<AtomicBool>,
    cancel_tx: broadcast::Sender<()>,
}

impl RetryScheduler {
    /// Create a scheduler publishing cycle events to `events`.
    pub fn new(config: RetryConfig, events: mpsc::Sender<RetryEvent>) -> Self {
        let (cancel_tx, _) = broadcast::channel(1);
        Self {
            config,
            events,
            active: Arc::new(AtomicBool::new(false)),
            cancel_tx,
        }
    }

    /// Whether a retry cycle is currently counting down.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start a retry cycle for the given failure reason.
    ///
    /// Re-arms to the full budget only when no cycle is active; a second
    /// retryable failure mid-cycle is logged and otherwise ignored.
    /// Returns whether a new cycle was armed.
    pub fn schedule(&self, reason: &str) -> bool {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!(reason, "retry cycle already active, not re-arming budget");
            return false;
        }

        info!(
            reason,
            budget = self.config.budget_ticks,
            "arming retry cycle"
        );

        let mut cycle = RetryCycle::arm(self.config.budget_ticks);
        let tick = Duration::from_secs(self.config.tick_secs);
        let events = self.events.clone();
        let active = Arc::clone(&self.active);
        let mut cancel_rx = self.cancel_tx.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel_rx.recv() => {
                        debug!("retry cycle canceled");
                        break;
                    }
                    _ = tokio::time::sleep(tick) => {
                        match cycle.tick() {
                            TickOutcome::Countdown(remaining) => {
                                if events.send(RetryEvent::Tick { remaining }).await.is_err() {
                                    warn!("retry event receiver dropped, stopping cycle");
                                    active.store(false, Ordering::SeqCst);
                                    break;
                                }
                            }
                            TickOutcome::Exhausted => {
                                active.store(false, Ordering::SeqCst);
                                let _ = events.send(RetryEvent::Exhausted).await;
                                break;
                            }
                        }
                    }
                }
            }
        });

        true
    }

    /// Cancel the pending cycle, if any. Synchronous: after this returns no
    /// further retry attempts will fire from the canceled cycle.
    pub fn cancel(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            debug!("canceling retry cycle");
            let _ = self.cancel_tx.send(());
        }
    }
}
