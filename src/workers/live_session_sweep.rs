use chrono::Utc;

use crate::store::operations::live_sessions::LiveStatus;
use crate::store::Store;

/// Close out live sessions whose scheduled window has passed but that were
/// never ended by their instructor. Provider rooms expire on their own; this
/// only fixes up the stored status so listings stay truthful.
pub async fn run(store: &Store) {
    let now = Utc::now();
    let stale = match store.list_stale_live_sessions(now) {
        Ok(stale) => stale,
        Err(error) => {
            tracing::error!(error = %error, "Live session sweep: listing failed");
            return;
        }
    };

    if stale.is_empty() {
        tracing::debug!("Live session sweep: nothing to do");
        return;
    }

    let mut swept = 0usize;
    for mut session in stale {
        session.status = LiveStatus::Ended;
        session.updated_at = now;
        match store.update_live_session(&session) {
            Ok(()) => swept += 1,
            Err(error) => {
                tracing::warn!(session_id = %session.id, error = %error, "Live session sweep: update failed");
            }
        }
    }
    tracing::info!(swept, "Live session sweep: closed stale sessions");
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    use crate::store::operations::live_sessions::{LiveSession, LiveStatus};
    use crate::store::Store;

    fn session(id: &str, offset_mins: i64, status: LiveStatus) -> LiveSession {
        LiveSession {
            id: id.to_string(),
            instructor_id: "i1".to_string(),
            title: "Session".to_string(),
            description: None,
            scheduled_at: Utc::now() + Duration::minutes(offset_mins),
            duration_mins: 30,
            max_participants: 10,
            status,
            room_name: None,
            room_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn closes_only_stale_sessions() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("sweep-db").to_str().unwrap()).unwrap();

        store
            .create_live_session(&session("stale", -120, LiveStatus::Live))
            .unwrap();
        store
            .create_live_session(&session("future", 60, LiveStatus::Scheduled))
            .unwrap();

        super::run(&store).await;

        assert_eq!(
            store.get_live_session("stale").unwrap().unwrap().status,
            LiveStatus::Ended
        );
        assert_eq!(
            store.get_live_session("future").unwrap().unwrap().status,
            LiveStatus::Scheduled
        );
    }
}
