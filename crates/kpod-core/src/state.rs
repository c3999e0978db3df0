//! Per-device knob state.

use std::time::{Duration, Instant};

use crate::report::InputEvent;
use crate::step::StepMultiplier;

/// How long the local frequency mirror is trusted before it is re-read from
/// the rig.
pub const SYNC_INTERVAL: Duration = Duration::from_millis(1000);

/// Tuning state owned by the controller of one device.
#[derive(Debug, Clone, Default)]
pub struct KnobState {
    /// Local mirror of the rig frequency in hertz
    pub frequency: i64,
    /// Current step multiplier
    pub step: StepMultiplier,
    /// Time of the last successful rig read or write
    pub last_sync: Option<Instant>,
}

impl KnobState {
    /// Whether the frequency mirror must be refreshed before use.
    ///
    /// A state that has never synced is always due.
    #[must_use]
    pub fn sync_due(&self, now: Instant) -> bool {
        self.last_sync
            .is_none_or(|last| now.saturating_duration_since(last) > SYNC_INTERVAL)
    }

    /// Record a successful exchange with the rig.
    pub fn mark_synced(&mut self, now: Instant) {
        self.last_sync = Some(now);
    }

    /// Apply the rotation of an event and return the new frequency.
    ///
    /// Returns `None` if the event carries no rotation.
    pub fn apply_rotation(&mut self, event: &InputEvent) -> Option<i64> {
        if event.rotation_delta == 0 {
            return None;
        }
        let delta = i64::from(event.rotation_delta).saturating_mul(self.step.factor());
        self.frequency = self.frequency.saturating_add(delta);
        Some(self.frequency)
    }

    /// Update the step multiplier for a step-button press.
    ///
    /// A hold resets to 1, a tap advances to the next coarser step.
    pub fn press_step(&mut self, hold: bool) -> StepMultiplier {
        self.step = if hold { StepMultiplier::X1 } else { self.step.next() };
        self.step
    }
}

/// Spoken form of a frequency: megahertz with three decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn frequency_utterance(hz: i64) -> String {
    format!("{:.3}", hz as f64 / 1_000_000.0)
}
