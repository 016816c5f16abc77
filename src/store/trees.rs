pub const USERS: &str = "users";
pub const SESSIONS: &str = "sessions";
pub const COURSES: &str = "courses";
pub const MODULES: &str = "modules";
pub const LESSONS: &str = "lessons";
pub const QUIZZES: &str = "quizzes";
pub const ENROLLMENTS: &str = "enrollments";
pub const LESSON_PROGRESS: &str = "lesson_progress";
pub const QUIZ_ATTEMPTS: &str = "quiz_attempts";
pub const MESSAGES: &str = "messages";
pub const LIVE_SESSIONS: &str = "live_sessions";
pub const CONFIG_VERSIONS: &str = "config_versions";

// Secondary index trees
pub const MODULE_COURSE_INDEX: &str = "module_course_index";
pub const LESSON_MODULE_INDEX: &str = "lesson_module_index";
pub const MESSAGE_INBOX: &str = "message_inbox";
