//! Refresh state machine.
//!
//! The coordinator is always in exactly one [`RefreshPhase`]. Every change
//! goes through [`transition`], a pure function, so the rules can be tested
//! without a runtime.

use std::time::Duration;
use tokio::time::Instant;

use crate::settings::MAX_DURATION_SECS;

/// Longest cooldown the machine will schedule.
pub const MAX_COOLDOWN: Duration = Duration::from_secs(MAX_DURATION_SECS);

/// Phase of the refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPhase {
    /// Waiting for a trigger.
    Idle,
    /// A fetch is in flight.
    Fetching {
        /// When the fetch started.
        since: Instant,
    },
    /// A fetch recently finished; timer ticks are ignored until `until`.
    Cooldown {
        /// End of the cooldown.
        until: Instant,
    },
}

impl RefreshPhase {
    /// Returns true while a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching { .. })
    }

    /// Returns a short label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching { .. } => "fetching",
            Self::Cooldown { .. } => "cooldown",
        }
    }
}

/// What asked for a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The periodic timer.
    Timer,
    /// A user's "refresh now".
    Manual,
    /// A completed session renewal.
    Renewal,
}

impl RefreshTrigger {
    /// Returns true if the trigger may cut a cooldown short.
    pub fn overrides_cooldown(&self) -> bool {
        !matches!(self, Self::Timer)
    }
}

/// Input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshEvent {
    /// Someone asked for a refresh.
    Trigger(RefreshTrigger),
    /// The in-flight fetch completed, whatever its outcome.
    FetchFinished,
    /// The cooldown timer fired.
    CooldownElapsed,
}

/// Applies `event` to `phase` at `now`.
///
/// Returns the next phase, or `None` when the event is ignored:
///
/// - any trigger while `Fetching` (at most one fetch in flight; nothing
///   is queued)
/// - a timer trigger during a cooldown that has not yet ended
/// - a finished fetch or an elapsed cooldown that does not match the phase
pub fn transition(
    phase: RefreshPhase,
    event: RefreshEvent,
    now: Instant,
    interval: Duration,
) -> Option<RefreshPhase> {
    match (phase, event) {
        (RefreshPhase::Idle, RefreshEvent::Trigger(_)) => Some(RefreshPhase::Fetching { since: now }),
        (RefreshPhase::Cooldown { until }, RefreshEvent::Trigger(trigger))
            if trigger.overrides_cooldown() || now >= until =>
        {
            Some(RefreshPhase::Fetching { since: now })
        }
        (RefreshPhase::Fetching { .. }, RefreshEvent::FetchFinished) => {
            let until = now
                .checked_add(interval.min(MAX_COOLDOWN))
                .unwrap_or(now);
            Some(RefreshPhase::Cooldown { until })
        }
        (RefreshPhase::Cooldown { until }, RefreshEvent::CooldownElapsed) if now >= until => {
            Some(RefreshPhase::Idle)
        }
        _ => None,
    }
}
