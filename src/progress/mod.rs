//! Lesson-completion workflow: video tracking, quiz scoring and the
//! completion state merge.
//!
//! Three pieces cooperate around one `LessonProgress` record per
//! (student, lesson): the [`tracker`] decides when a playback sample is worth
//! persisting and polices seeks, the [`scoring`] engine grades submitted
//! answer sets, and the [`coordinator`] is the single authority that merges
//! both signals into `lesson_completed`.

pub mod coordinator;
pub mod scoring;
pub mod tracker;
