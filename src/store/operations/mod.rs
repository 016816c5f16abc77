pub mod attempts;
pub mod courses;
pub mod enrollments;
pub mod lessons;
pub mod live_sessions;
pub mod messages;
pub mod modules;
pub mod progress;
pub mod quizzes;
pub mod sessions;
pub mod users;
