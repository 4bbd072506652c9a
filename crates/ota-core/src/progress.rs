//! Engine status normalization.
//!
//! [`map_status`] is the pure mapping from a raw `(status, fraction)` tuple
//! to a user-facing [`ProgressEvent`]. [`ProgressTracker`] sits behind it and
//! keeps the stream monotonic and free of repeats.

use ota_schema::{EngineStatus, Phase, ProgressEvent};
use std::collections::HashMap;

/// Scale a `0.0..=1.0` fraction to a whole percent. Truncates, so 100 is
/// only reported for a full 1.0; the small bias absorbs f32 representation
/// error (0.42 is stored as 0.41999...).
pub fn scale_percent(fraction: f32) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    let scaled = fraction.clamp(0.0, 1.0) * 100.0 + 1e-3;
    scaled.floor().min(100.0) as u8
}

/// Map one engine status update to a progress event.
///
/// Returns `None` when an error has already been latched, and for statuses
/// that carry no user-facing progress (including `ReportingErrorEvent`,
/// which the session latches separately).
pub fn map_status(status: EngineStatus, fraction: f32, latched: bool) -> Option<ProgressEvent> {
    if latched {
        return None;
    }

    let percent = scale_percent(fraction);
    match status {
        EngineStatus::Downloading => Some(ProgressEvent::new(Phase::Downloading, percent)),
        EngineStatus::Verifying => Some(ProgressEvent::new(Phase::Applying, percent)),
        EngineStatus::Finalizing => Some(match percent {
            0 => ProgressEvent::indeterminate(Phase::Finalizing).with_message("finalizing"),
            100 => ProgressEvent::ready_to_reboot(),
            _ => ProgressEvent::new(Phase::Finalizing, percent)
                .with_message("preparing for first boot"),
        }),
        EngineStatus::UpdatedNeedReboot => Some(ProgressEvent::ready_to_reboot()),
        _ => None,
    }
}

/// Filters a stream of progress events.
///
/// Within a phase, percent never goes below the highest value already
/// accepted for that phase, even when the stream leaves the phase and comes
/// back. An event identical to the previous one is dropped. An indeterminate
/// event is only accepted before any measurable progress in its phase.
#[derive(Debug, Default, Clone)]
pub struct ProgressTracker {
    last: Option<ProgressEvent>,
    high_water: HashMap<Phase, u8>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the event if it should reach the sink.
    pub fn accept(&mut self, event: ProgressEvent) -> Option<ProgressEvent> {
        if self.last.as_ref() == Some(&event) {
            return None;
        }
        let high = self.high_water.get(&event.phase).copied();
        match (high, event.percent) {
            (Some(prev), Some(next)) if next < prev => return None,
            (Some(_), None) => return None,
            (_, Some(next)) => {
                self.high_water.insert(event.phase, next);
            }
            (None, None) => {}
        }
        self.last = Some(event.clone());
        Some(event)
    }

    /// Percent of the last accepted event.
    pub fn last_percent(&self) -> Option<u8> {
        self.last.as_ref().and_then(|e| e.percent)
    }

    /// Phase of the last accepted event.
    pub fn last_phase(&self) -> Option<Phase> {
        self.last.as_ref().map(|e| e.phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_percent() {
        assert_eq!(scale_percent(0.0), 0);
        assert_eq!(scale_percent(0.257), 25);
        assert_eq!(scale_percent(1.0), 100);
        assert_eq!(scale_percent(1.7), 100);
        assert_eq!(scale_percent(-0.3), 0);
        assert_eq!(scale_percent(f32::NAN), 0);
    }

    #[test]
    fn test_downloading_maps_to_percent() {
        let event = map_status(EngineStatus::Downloading, 0.42, false).unwrap();
        assert_eq!(event.phase, Phase::Downloading);
        assert_eq!(event.percent, Some(42));
    }

    #[test]
    fn test_finalizing_zero_is_indeterminate() {
        let event = map_status(EngineStatus::Finalizing, 0.0, false).unwrap();
        assert_eq!(event.phase, Phase::Finalizing);
        assert!(event.is_indeterminate());
    }

    #[test]
    fn test_finalizing_full_and_need_reboot_are_the_same_event() {
        let finalized = map_status(EngineStatus::Finalizing, 1.0, false).unwrap();
        let need_reboot = map_status(EngineStatus::UpdatedNeedReboot, 0.0, false).unwrap();
        assert!(finalized.is_ready_to_reboot());
        assert_eq!(finalized, need_reboot);
    }

    #[test]
    fn test_latched_suppresses_everything() {
        for code in 0..12 {
            assert!(map_status(EngineStatus::from_code(code), 0.5, true).is_none());
        }
    }

    #[test]
    fn test_unrecognized_statuses_are_ignored() {
        assert!(map_status(EngineStatus::Idle, 0.0, false).is_none());
        assert!(map_status(EngineStatus::ReportingErrorEvent, 0.0, false).is_none());
        assert!(map_status(EngineStatus::Unknown(77), 0.5, false).is_none());
    }

    #[test]
    fn test_tracker_is_monotonic_within_phase() {
        let mut tracker = ProgressTracker::new();
        let inputs = [0.1, 0.3, 0.2, 0.3, 0.5, 0.49, 0.9];
        let accepted: Vec<u8> = inputs
            .iter()
            .filter_map(|f| map_status(EngineStatus::Downloading, *f, false))
            .filter_map(|e| tracker.accept(e))
            .filter_map(|e| e.percent)
            .collect();

        assert_eq!(accepted, vec![10, 30, 50, 90]);
        assert!(accepted.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_tracker_resets_on_phase_change() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.accept(ProgressEvent::new(Phase::Downloading, 100)).is_some());
        let reset = tracker.accept(ProgressEvent::indeterminate(Phase::Finalizing));
        assert!(reset.is_some());
        assert!(tracker.accept(ProgressEvent::new(Phase::Finalizing, 30)).is_some());
        assert!(tracker.accept(ProgressEvent::indeterminate(Phase::Finalizing)).is_none());
        assert_eq!(tracker.last_percent(), Some(30));
        assert_eq!(tracker.last_phase(), Some(Phase::Finalizing));
    }

    #[test]
    fn test_tracker_remembers_each_phase() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.accept(ProgressEvent::new(Phase::Downloading, 50)).is_some());
        assert!(tracker.accept(ProgressEvent::new(Phase::Applying, 10)).is_some());
        assert!(tracker.accept(ProgressEvent::new(Phase::Downloading, 20)).is_none());
        assert!(tracker.accept(ProgressEvent::indeterminate(Phase::Downloading)).is_none());
        assert_eq!(tracker.last_phase(), Some(Phase::Applying));

        let resumed = tracker.accept(ProgressEvent::new(Phase::Downloading, 60)).unwrap();
        assert_eq!(resumed.percent, Some(60));
    }

    #[test]
    fn test_tracker_drops_duplicate_ready_to_reboot() {
        let mut tracker = ProgressTracker::new();
        assert!(tracker.accept(ProgressEvent::ready_to_reboot()).is_some());
        assert!(tracker.accept(ProgressEvent::ready_to_reboot()).is_none());
    }
}
