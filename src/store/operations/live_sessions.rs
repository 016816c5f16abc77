use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LiveStatus {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSession {
    pub id: String,
    pub instructor_id: String,
    pub title: String,
    pub description: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub duration_mins: u32,
    pub max_participants: u32,
    pub status: LiveStatus,
    /// Room name/url at the hosted provider; set when the session goes live.
    pub room_name: Option<String>,
    pub room_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LiveSession {
    pub fn scheduled_end(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(self.duration_mins as i64)
    }
}

impl Store {
    pub fn create_live_session(&self, session: &LiveSession) -> Result<(), StoreError> {
        let key = keys::live_session_key(&session.id)?;
        self.live_sessions
            .insert(key.as_bytes(), Self::serialize(session)?)?;
        Ok(())
    }

    pub fn get_live_session(&self, session_id: &str) -> Result<Option<LiveSession>, StoreError> {
        let key = keys::live_session_key(session_id)?;
        match self.live_sessions.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn update_live_session(&self, session: &LiveSession) -> Result<(), StoreError> {
        if self.get_live_session(&session.id)?.is_none() {
            return Err(StoreError::NotFound {
                entity: "live_session".to_string(),
                key: session.id.clone(),
            });
        }
        let key = keys::live_session_key(&session.id)?;
        self.live_sessions
            .insert(key.as_bytes(), Self::serialize(session)?)?;
        Ok(())
    }

    /// Sessions that are live now or still ahead of `now`, soonest first.
    pub fn list_upcoming_live_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<LiveSession>, StoreError> {
        let mut sessions = Vec::new();
        for item in self.live_sessions.iter() {
            let (_, value) = item?;
            let session: LiveSession = Self::deserialize(&value)?;
            match session.status {
                LiveStatus::Live => sessions.push(session),
                LiveStatus::Scheduled if session.scheduled_end() > now => sessions.push(session),
                _ => {}
            }
        }
        sessions.sort_by_key(|s| s.scheduled_at);
        Ok(sessions)
    }

    /// Sessions whose scheduled window has passed but were never ended,
    /// picked up by the sweep worker.
    pub fn list_stale_live_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<LiveSession>, StoreError> {
        let mut sessions = Vec::new();
        for item in self.live_sessions.iter() {
            let (_, value) = item?;
            let session: LiveSession = Self::deserialize(&value)?;
            if matches!(session.status, LiveStatus::Scheduled | LiveStatus::Live)
                && session.scheduled_end() <= now
            {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn sample_session(id: &str, offset_mins: i64, status: LiveStatus) -> LiveSession {
        LiveSession {
            id: id.to_string(),
            instructor_id: "i1".to_string(),
            title: "Group warmup".to_string(),
            description: None,
            scheduled_at: Utc::now() + Duration::minutes(offset_mins),
            duration_mins: 60,
            max_participants: 10,
            status,
            room_name: None,
            room_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn upcoming_excludes_past_and_cancelled() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("live-db").to_str().unwrap()).unwrap();

        store
            .create_live_session(&sample_session("past", -180, LiveStatus::Scheduled))
            .unwrap();
        store
            .create_live_session(&sample_session("soon", 30, LiveStatus::Scheduled))
            .unwrap();
        store
            .create_live_session(&sample_session("gone", 60, LiveStatus::Cancelled))
            .unwrap();
        store
            .create_live_session(&sample_session("now", -10, LiveStatus::Live))
            .unwrap();

        let upcoming = store.list_upcoming_live_sessions(Utc::now()).unwrap();
        let ids: Vec<_> = upcoming.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["now", "soon"]);
    }

    #[test]
    fn stale_sessions_are_reported() {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join("live-db2").to_str().unwrap()).unwrap();

        store
            .create_live_session(&sample_session("stale", -180, LiveStatus::Live))
            .unwrap();
        store
            .create_live_session(&sample_session("fresh", 30, LiveStatus::Scheduled))
            .unwrap();

        let stale = store.list_stale_live_sessions(Utc::now()).unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, "stale");
    }
}
