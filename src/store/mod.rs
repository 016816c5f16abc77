pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub users: sled::Tree,
    pub sessions: sled::Tree,
    pub courses: sled::Tree,
    pub modules: sled::Tree,
    pub lessons: sled::Tree,
    pub quizzes: sled::Tree,
    pub enrollments: sled::Tree,
    pub lesson_progress: sled::Tree,
    pub quiz_attempts: sled::Tree,
    pub messages: sled::Tree,
    pub live_sessions: sled::Tree,
    pub config_versions: sled::Tree,
    // Secondary index trees
    pub module_course_index: sled::Tree,
    pub lesson_module_index: sled::Tree,
    pub message_inbox: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("not found: entity={entity}, key={key}")]
    NotFound { entity: String, key: String },
    #[error("conflict: entity={entity}, key={key}")]
    Conflict { entity: String, key: String },
    #[error("CAS retry exhausted after {attempts} attempts: entity={entity}, key={key}")]
    CasRetryExhausted {
        entity: String,
        key: String,
        attempts: u32,
    },
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let users = db.open_tree(trees::USERS)?;
        let sessions = db.open_tree(trees::SESSIONS)?;
        let courses = db.open_tree(trees::COURSES)?;
        let modules = db.open_tree(trees::MODULES)?;
        let lessons = db.open_tree(trees::LESSONS)?;
        let quizzes = db.open_tree(trees::QUIZZES)?;
        let enrollments = db.open_tree(trees::ENROLLMENTS)?;
        let lesson_progress = db.open_tree(trees::LESSON_PROGRESS)?;
        let quiz_attempts = db.open_tree(trees::QUIZ_ATTEMPTS)?;
        let messages = db.open_tree(trees::MESSAGES)?;
        let live_sessions = db.open_tree(trees::LIVE_SESSIONS)?;
        let config_versions = db.open_tree(trees::CONFIG_VERSIONS)?;
        // Secondary index trees
        let module_course_index = db.open_tree(trees::MODULE_COURSE_INDEX)?;
        let lesson_module_index = db.open_tree(trees::LESSON_MODULE_INDEX)?;
        let message_inbox = db.open_tree(trees::MESSAGE_INBOX)?;

        Ok(Self {
            db,
            users,
            sessions,
            courses,
            modules,
            lessons,
            quizzes,
            enrollments,
            lesson_progress,
            quiz_attempts,
            messages,
            live_sessions,
            config_versions,
            module_course_index,
            lesson_module_index,
            message_inbox,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn raw_db(&self) -> &Db {
        &self.db
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
