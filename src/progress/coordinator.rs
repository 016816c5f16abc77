use chrono::{DateTime, Utc};

use crate::constants::VIDEO_COMPLETION_THRESHOLD;
use crate::store::operations::progress::LessonProgress;

/// Pure merge logic for `LessonProgress`. The store applies these functions
/// under a compare-and-swap loop, so each one receives the latest stored
/// record and returns the full replacement.
///
/// Invariants enforced here:
/// - `video_progress` is a high-water mark,
/// - `video_completed`, `quiz_passed` and `lesson_completed` latch on and
///   never revert,
/// - `lesson_completed` is true only when `video_completed` and (for lessons
///   with a quiz) `quiz_passed` are both true,
/// - `completed_at` is stamped on the first transition into completed and
///   never rewritten.

fn blank(student_id: &str, lesson_id: &str, now: DateTime<Utc>) -> LessonProgress {
    LessonProgress {
        student_id: student_id.to_string(),
        lesson_id: lesson_id.to_string(),
        video_progress: 0.0,
        video_completed: false,
        quiz_passed: false,
        lesson_completed: false,
        last_watched_at: now,
        completed_at: None,
    }
}

fn recompute_completion(progress: &mut LessonProgress, has_quiz: bool, now: DateTime<Utc>) {
    let quiz_gate = if has_quiz { progress.quiz_passed } else { true };
    let completed = progress.video_completed && quiz_gate;

    // One-way gate: never unset, never restamp.
    if completed && !progress.lesson_completed {
        progress.lesson_completed = true;
        progress.completed_at = Some(now);
    }
}

/// Merge a persisted video-progress value. `has_quiz` tells the coordinator
/// whether a quiz pass is a prerequisite for this lesson.
pub fn merge_video_progress(
    current: Option<LessonProgress>,
    student_id: &str,
    lesson_id: &str,
    progress_percent: f64,
    has_quiz: bool,
    now: DateTime<Utc>,
) -> LessonProgress {
    let mut next = current.unwrap_or_else(|| blank(student_id, lesson_id, now));

    if progress_percent > next.video_progress {
        next.video_progress = progress_percent;
    }
    if next.video_progress >= VIDEO_COMPLETION_THRESHOLD {
        next.video_completed = true;
    }
    next.last_watched_at = now;

    recompute_completion(&mut next, has_quiz, now);
    next
}

/// Merge a passing quiz attempt. Failed attempts must not reach this
/// function: the caller records the attempt and leaves progress untouched.
pub fn merge_quiz_pass(
    current: Option<LessonProgress>,
    student_id: &str,
    lesson_id: &str,
    now: DateTime<Utc>,
) -> LessonProgress {
    let mut next = current.unwrap_or_else(|| blank(student_id, lesson_id, now));

    next.quiz_passed = true;
    recompute_completion(&mut next, true, now);
    next
}
