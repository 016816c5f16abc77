use crate::store::Store;

/// Delete expired and revoked auth sessions.
pub async fn run(store: &Store) {
    match store.cleanup_expired_sessions() {
        Ok(0) => tracing::debug!("Session cleanup: nothing to do"),
        Ok(count) => tracing::info!(count, "Session cleanup: removed expired sessions"),
        Err(error) => tracing::error!(error = %error, "Session cleanup failed"),
    }
}
