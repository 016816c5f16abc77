use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    PROGRESS_SAVE_INTERVAL_SECS, PROGRESS_SAVE_MIN_DELTA, SEEK_FORWARD_SLACK,
    VIDEO_COMPLETION_THRESHOLD,
};
use crate::store::operations::progress::LessonProgress;

/// One playback-position sample from the video source.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSample {
    /// Fraction of the video played, in [0, 1].
    pub played_fraction: f64,
    pub duration_seconds: f64,
}

/// Answer to a seek request against the no-skip-ahead policy.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeekDecision {
    /// Where playback may actually land, as a percentage.
    pub allowed_percent: f64,
    pub clamped: bool,
}

/// What to do with a sample: whether to persist, at which percentage, and
/// whether the 95% completion signal fired on this sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleOutcome {
    pub progress_percent: f64,
    pub persist: Option<f64>,
    pub completed_signal: bool,
}

/// Session-scoped playback tracker for one (student, lesson).
///
/// Keeps a monotonically increasing watched watermark, debounces persistence
/// (a write at most every [`PROGRESS_SAVE_INTERVAL_SECS`] seconds and only
/// after more than [`PROGRESS_SAVE_MIN_DELTA`] points of advance), and fires
/// the completion signal exactly once when the watermark crosses
/// [`VIDEO_COMPLETION_THRESHOLD`]. The first threshold crossing always
/// persists, debounce or not: the completion flag must not wait for the next
/// granule.
#[derive(Debug, Clone)]
pub struct VideoTracker {
    watch_required: bool,
    max_watched_percent: f64,
    last_saved_percent: Option<f64>,
    last_saved_at: Option<DateTime<Utc>>,
    completion_fired: bool,
}

impl VideoTracker {
    pub fn new(watch_required: bool) -> Self {
        Self {
            watch_required,
            max_watched_percent: 0.0,
            last_saved_percent: None,
            last_saved_at: None,
            completion_fired: false,
        }
    }

    /// Rehydrate the tracker from the stored progress record, so a resumed
    /// session continues from the persisted watermark instead of zero.
    pub fn from_progress(watch_required: bool, stored: Option<&LessonProgress>) -> Self {
        match stored {
            Some(progress) => Self {
                watch_required,
                max_watched_percent: progress.video_progress.clamp(0.0, 100.0),
                last_saved_percent: Some(progress.video_progress),
                last_saved_at: Some(progress.last_watched_at),
                completion_fired: progress.video_completed,
            },
            None => Self::new(watch_required),
        }
    }

    pub fn max_watched_percent(&self) -> f64 {
        self.max_watched_percent
    }

    /// Ingest one sample. The watermark never decreases; backwards seeks
    /// replay earlier positions without eroding progress.
    pub fn report_sample(&mut self, sample: PlaybackSample, now: DateTime<Utc>) -> SampleOutcome {
        let progress_percent = to_percent(sample.played_fraction);

        if progress_percent > self.max_watched_percent {
            self.max_watched_percent = progress_percent;
        }

        let crossed_threshold =
            !self.completion_fired && self.max_watched_percent >= VIDEO_COMPLETION_THRESHOLD;

        let persist = if crossed_threshold || self.should_persist(now) {
            self.last_saved_percent = Some(self.max_watched_percent);
            self.last_saved_at = Some(now);
            Some(self.max_watched_percent)
        } else {
            None
        };

        if crossed_threshold {
            self.completion_fired = true;
        }

        SampleOutcome {
            progress_percent,
            persist,
            completed_signal: crossed_threshold,
        }
    }

    fn should_persist(&self, now: DateTime<Utc>) -> bool {
        let delta_ok = match self.last_saved_percent {
            Some(saved) => self.max_watched_percent > saved + PROGRESS_SAVE_MIN_DELTA,
            None => true,
        };
        let interval_ok = match self.last_saved_at {
            Some(at) => (now - at).num_seconds() >= PROGRESS_SAVE_INTERVAL_SECS,
            None => true,
        };
        delta_ok && interval_ok
    }

    /// Decide a seek request. Without a watch gate seeking is unrestricted;
    /// with one, a target past `watermark + slack` is clamped back to exactly
    /// that bound.
    pub fn decide_seek(&self, target_percent: f64) -> SeekDecision {
        let target = target_percent.clamp(0.0, 100.0);
        if !self.watch_required {
            return SeekDecision {
                allowed_percent: target,
                clamped: false,
            };
        }

        let bound = (self.max_watched_percent + SEEK_FORWARD_SLACK).min(100.0);
        if target <= bound {
            SeekDecision {
                allowed_percent: target,
                clamped: false,
            }
        } else {
            SeekDecision {
                allowed_percent: bound,
                clamped: true,
            }
        }
    }
}

/// Played fraction -> percentage, clamped and rounded to two decimals so
/// threshold and slack arithmetic stays exact across the wire.
fn to_percent(played_fraction: f64) -> f64 {
    let percent = (played_fraction * 100.0).clamp(0.0, 100.0);
    (percent * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn percent_conversion_is_exact_at_two_decimals() {
        assert_eq!(to_percent(0.94), 94.0);
        assert_eq!(to_percent(0.1), 10.0);
        assert_eq!(to_percent(1.5), 100.0);
        assert_eq!(to_percent(-0.5), 0.0);
    }

    fn sample(played_fraction: f64) -> PlaybackSample {
        PlaybackSample {
            played_fraction,
            duration_seconds: 600.0,
        }
    }

    #[test]
    fn watermark_never_decreases() {
        let mut tracker = VideoTracker::new(true);
        let now = Utc::now();

        tracker.report_sample(sample(0.50), now);
        assert_eq!(tracker.max_watched_percent(), 50.0);

        // Replaying an earlier position leaves the watermark alone.
        tracker.report_sample(sample(0.20), now + Duration::seconds(10));
        assert_eq!(tracker.max_watched_percent(), 50.0);
    }

    #[test]
    fn first_sample_persists_then_debounces() {
        let mut tracker = VideoTracker::new(true);
        let now = Utc::now();

        let first = tracker.report_sample(sample(0.10), now);
        assert_eq!(first.persist, Some(10.0));

        // Advanced 12 points but only 2 seconds elapsed.
        let too_soon = tracker.report_sample(sample(0.22), now + Duration::seconds(2));
        assert_eq!(too_soon.persist, None);

        // Same position with enough time passed: the pending advance flushes.
        let flushed = tracker.report_sample(sample(0.22), now + Duration::seconds(8));
        assert_eq!(flushed.persist, Some(22.0));

        // Only 3 points over the last saved value: below the minimum delta.
        let small = tracker.report_sample(sample(0.25), now + Duration::seconds(16));
        assert_eq!(small.persist, None);
    }

    #[test]
    fn completion_fires_once_and_forces_persist() {
        let mut tracker = VideoTracker::new(true);
        let now = Utc::now();

        tracker.report_sample(sample(0.93), now);
        // 93 -> 96 is under the 5-point delta, but crossing 95 must persist.
        let crossing = tracker.report_sample(sample(0.96), now + Duration::seconds(1));
        assert!(crossing.completed_signal);
        assert_eq!(crossing.persist, Some(96.0));

        // Re-crossing does not re-fire.
        let after = tracker.report_sample(sample(0.97), now + Duration::seconds(2));
        assert!(!after.completed_signal);
    }

    #[test]
    fn completion_not_refired_after_rehydration() {
        let stored = LessonProgress {
            student_id: "s1".to_string(),
            lesson_id: "l1".to_string(),
            video_progress: 96.0,
            video_completed: true,
            quiz_passed: false,
            lesson_completed: false,
            last_watched_at: Utc::now() - Duration::hours(1),
            completed_at: None,
        };
        let mut tracker = VideoTracker::from_progress(true, Some(&stored));

        let outcome = tracker.report_sample(sample(0.97), Utc::now());
        assert!(!outcome.completed_signal);
    }

    #[test]
    fn seek_is_clamped_to_watermark_plus_slack() {
        let mut tracker = VideoTracker::new(true);
        tracker.report_sample(sample(0.40), Utc::now());

        let decision = tracker.decide_seek(80.0);
        assert_eq!(
            decision,
            SeekDecision {
                allowed_percent: 45.0,
                clamped: true
            }
        );

        let within = tracker.decide_seek(43.0);
        assert!(!within.clamped);
        assert_eq!(within.allowed_percent, 43.0);
    }

    #[test]
    fn seek_is_unrestricted_without_watch_gate() {
        let tracker = VideoTracker::new(false);
        let decision = tracker.decide_seek(99.0);
        assert!(!decision.clamped);
        assert_eq!(decision.allowed_percent, 99.0);
    }
}
