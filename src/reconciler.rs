//! Local mirror of upstream blocking state.
//!
//! The upstream is the authority. [`Reconciler`] keeps the last status it saw
//! plus a [`Countdown`] anchored at the moment of that fetch, and replaces both
//! wholesale after every mutating action. Between fetches the countdown is
//! extrapolated from elapsed wall-clock time; it never triggers a fetch on its
//! own, so after it runs out the display reads "Stopped" until the next fetch.
//!
//! ```text
//!             fetch: enabled                fetch: disabled + countdown
//! Unknown ──────────────────▶ Active ◀──────────────────▶ Paused(remaining)
//!    │                          ▲                              │
//!    └── fetch: disabled ──▶ Stopped ◀── countdown hits 0 (display only)
//! ```

use crate::error::Result;
use crate::upstream::{BlockingControl, BlockingStatus};
use std::time::Instant;

/// Label shown while blocking is active.
pub const BLOCKING_LABEL: &str = "Blocking";

/// Label shown while blocking is off with no running countdown.
pub const STOPPED_LABEL: &str = "Stopped";

/// Named pause presets offered to users, mapped to upstream durations.
pub const PAUSE_PRESETS: [(&str, &str); 2] = [("5m", "300s"), ("30m", "1800s")];

/// Maps a preset name (`5m`, `30m`) to its duration string; anything else is
/// passed through unchanged.
#[must_use]
pub fn resolve_pause_duration(input: &str) -> &str {
    PAUSE_PRESETS
        .iter()
        .find(|(name, _)| *name == input)
        .map_or(input, |&(_, duration)| duration)
}

/// Server-reported seconds remaining, anchored at the time of the fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    remaining: u64,
    fetched_at: Instant,
}

impl Countdown {
    #[must_use]
    pub const fn new(remaining: u64, fetched_at: Instant) -> Self {
        Self {
            remaining,
            fetched_at,
        }
    }

    /// Seconds remaining as reported by the upstream.
    #[must_use]
    pub const fn remaining(&self) -> u64 {
        self.remaining
    }

    #[must_use]
    pub const fn fetched_at(&self) -> Instant {
        self.fetched_at
    }

    /// Seconds remaining at `now`, or `None` once the countdown has passed zero.
    ///
    /// Whole elapsed seconds are subtracted, so this steps down by one per
    /// second like a ticking timer.
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Option<u64> {
        let elapsed = now.saturating_duration_since(self.fetched_at).as_secs();
        self.remaining.checked_sub(elapsed)
    }

    /// Whether the countdown still has seconds left to tick at `now`.
    #[must_use]
    pub fn is_running(&self, now: Instant) -> bool {
        self.remaining_at(now).is_some_and(|r| r > 0)
    }
}

/// The local mirror of upstream blocking state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockingState {
    /// No status fetched yet.
    #[default]
    Unknown,
    /// Blocking is on.
    Active,
    /// Blocking is off and re-enables itself when the countdown ends.
    Paused(Countdown),
    /// Blocking is off with no automatic re-enable.
    Stopped,
}

impl BlockingState {
    /// Derives the state from a freshly fetched status.
    ///
    /// A countdown reported alongside `enabled = true` is ignored.
    #[must_use]
    pub const fn from_status(status: &BlockingStatus, fetched_at: Instant) -> Self {
        match (status.enabled, status.auto_enable_in_sec) {
            (true, _) => Self::Active,
            (false, Some(remaining)) => Self::Paused(Countdown::new(remaining, fetched_at)),
            (false, None) => Self::Stopped,
        }
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// The countdown value at `now`, if any.
    #[must_use]
    pub fn remaining_at(&self, now: Instant) -> Option<u64> {
        match self {
            Self::Paused(countdown) => countdown.remaining_at(now),
            _ => None,
        }
    }

    /// Human-readable label at `now`.
    #[must_use]
    pub fn label_at(&self, now: Instant) -> String {
        if self.is_active() {
            BLOCKING_LABEL.to_string()
        } else {
            format_remaining(self.remaining_at(now))
        }
    }
}

/// Renders a countdown: `"1m 5s"` above a minute, `"59s"` up to a minute,
/// [`STOPPED_LABEL`] for zero or no countdown.
#[must_use]
pub fn format_remaining(remaining: Option<u64>) -> String {
    match remaining {
        Some(secs) if secs > 60 => format!("{}m {}s", secs / 60, secs % 60),
        Some(secs) if secs > 0 => format!("{secs}s"),
        _ => STOPPED_LABEL.to_string(),
    }
}

/// Drives a [`BlockingControl`] and keeps [`BlockingState`] in sync with it.
///
/// Every mutating action is followed by [`fetch_status`](Self::fetch_status).
/// A failed request leaves the state as it was and returns the error; nothing
/// is retried.
pub struct Reconciler<C> {
    control: C,
    state: BlockingState,
    disabled_groups: Vec<String>,
}

impl<C: BlockingControl> Reconciler<C> {
    /// Creates a reconciler in [`BlockingState::Unknown`].
    #[must_use]
    pub const fn new(control: C) -> Self {
        Self {
            control,
            state: BlockingState::Unknown,
            disabled_groups: Vec::new(),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &BlockingState {
        &self.state
    }

    /// Groups the upstream reported as disabled in the last fetch.
    #[must_use]
    pub fn disabled_groups(&self) -> &[String] {
        &self.disabled_groups
    }

    #[must_use]
    pub const fn control(&self) -> &C {
        &self.control
    }

    /// Current label, evaluated against the system clock.
    #[must_use]
    pub fn label(&self) -> String {
        self.state.label_at(Instant::now())
    }

    /// Fetches the upstream status and replaces the local state with it.
    ///
    /// Any locally elapsed countdown is discarded in favour of the reported
    /// value.
    ///
    /// # Errors
    ///
    /// Propagates the upstream error; the state is left untouched.
    pub async fn fetch_status(&mut self) -> Result<BlockingState> {
        let status = self.control.status().await.inspect_err(|e| {
            tracing::warn!(error = %e, "Failed to fetch blocking status");
        })?;
        self.state = BlockingState::from_status(&status, Instant::now());
        self.disabled_groups = status.disabled_groups.unwrap_or_default();
        tracing::debug!(state = ?self.state, groups = ?self.disabled_groups, "Blocking status fetched");
        Ok(self.state)
    }

    /// Disables indefinitely when active, enables otherwise, then re-fetches.
    ///
    /// From [`BlockingState::Unknown`] this enables.
    ///
    /// # Errors
    ///
    /// Propagates the upstream error from either request.
    pub async fn toggle_blocking(&mut self) -> Result<BlockingState> {
        if self.state.is_active() {
            tracing::info!("Disabling blocking");
            self.control.disable(None).await?;
        } else {
            tracing::info!("Enabling blocking");
            self.control.enable().await?;
        }
        self.fetch_status().await
    }

    /// Disables for `duration` (e.g. `"300s"`), then re-fetches.
    ///
    /// # Errors
    ///
    /// Propagates the upstream error from either request.
    pub async fn pause(&mut self, duration: &str) -> Result<BlockingState> {
        tracing::info!(duration = %duration, "Pausing blocking");
        self.control.disable(Some(duration)).await?;
        self.fetch_status().await
    }

    /// Asks the upstream to reload its lists, then re-fetches.
    ///
    /// Pattern edits must already be persisted for the reload to pick them up.
    ///
    /// # Errors
    ///
    /// Propagates the upstream error from either request.
    pub async fn refresh(&mut self) -> Result<BlockingState> {
        tracing::info!("Refreshing upstream lists");
        self.control.refresh().await?;
        self.fetch_status().await
    }
}
