/// Watch percentage at which a lesson video counts as completed.
pub const VIDEO_COMPLETION_THRESHOLD: f64 = 95.0;

/// Minimum seconds between persisted progress writes for one lesson.
pub const PROGRESS_SAVE_INTERVAL_SECS: i64 = 5;

/// Minimum progress advance (percentage points) before a new persist.
pub const PROGRESS_SAVE_MIN_DELTA: f64 = 5.0;

/// How far ahead of the watched watermark a seek may land (percentage points).
pub const SEEK_FORWARD_SLACK: f64 = 5.0;

/// Passing score applied when a quiz is created without one.
pub const DEFAULT_PASSING_SCORE: u32 = 70;

/// CAS merge-upsert maximum retry count.
pub const MAX_CAS_RETRIES: u32 = 20;

/// Maximum concurrent sessions kept per user; older ones are evicted.
pub const MAX_SESSIONS_PER_USER: usize = 10;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum page size for list endpoints.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Default number of messages returned for a conversation.
pub const DEFAULT_CONVERSATION_LIMIT: usize = 200;

/// Maximum number of messages returned for a conversation.
pub const MAX_CONVERSATION_LIMIT: usize = 500;

/// Maximum length of a direct message body (characters).
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Maximum concurrent SSE connections across the process.
pub const MAX_SSE_CONNECTIONS: usize = 256;

/// Default participant cap for a live session room.
pub const DEFAULT_LIVE_MAX_PARTICIPANTS: u32 = 10;
