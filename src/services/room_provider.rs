use rand::Rng;
use serde::Deserialize;

use crate::config::LiveRoomConfig;

/// Client for the hosted video-room provider (Daily-compatible REST API).
/// Mock mode fabricates rooms locally so tests and development never touch
/// the network.
#[derive(Debug, Clone)]
pub struct RoomProvider {
    config: LiveRoomConfig,
    client: reqwest::Client,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRoom {
    pub name: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("live rooms are disabled")]
    Disabled,
    #[error("room provider network error: {0}")]
    Network(String),
    #[error("room provider api error: status={status}, message={message}")]
    ApiError { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct RoomResponse {
    name: String,
    url: String,
}

impl RoomProvider {
    pub fn new(config: &LiveRoomConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            client,
        }
    }

    /// Validate the provider configuration at startup.
    /// Panics when real mode is requested without an API key, because every
    /// session start would fail at runtime otherwise.
    pub fn validate_config(config: &LiveRoomConfig) {
        if config.enabled && !config.mock && config.api_key.is_empty() {
            panic!(
                "Invalid live-room configuration: enabled=true and mock=false, \
                 but LIVE_ROOMS_API_KEY is empty. \
                 Set the API key or enable LIVE_ROOMS_MOCK."
            );
        }
    }

    /// Generate a collision-resistant room name for a session.
    pub fn room_name_for(session_id: &str) -> String {
        let suffix: u32 = rand::thread_rng().gen_range(0x1000..0xffff);
        let short_id: String = session_id.chars().take(8).collect();
        format!("live-{short_id}-{suffix:x}")
    }

    pub async fn create_room(
        &self,
        name: &str,
        max_participants: u32,
    ) -> Result<LiveRoom, RoomError> {
        if !self.config.enabled {
            return Err(RoomError::Disabled);
        }
        if self.config.mock {
            return Ok(LiveRoom {
                name: name.to_string(),
                url: format!("https://{}/{}", self.config.room_domain, name),
            });
        }

        let payload = serde_json::json!({
            "name": name,
            "privacy": "private",
            "properties": {
                "max_participants": max_participants,
                "enable_chat": true,
                "enable_screenshare": true,
            },
        });

        let response = self
            .client
            .post(format!("{}/rooms", self.config.api_url))
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RoomError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RoomError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let room: RoomResponse = response
            .json()
            .await
            .map_err(|e| RoomError::Network(e.to_string()))?;
        Ok(LiveRoom {
            name: room.name,
            url: room.url,
        })
    }

    /// Best-effort room teardown when a session ends.
    pub async fn delete_room(&self, name: &str) -> Result<(), RoomError> {
        if !self.config.enabled {
            return Err(RoomError::Disabled);
        }
        if self.config.mock {
            return Ok(());
        }

        let response = self
            .client
            .delete(format!("{}/rooms/{}", self.config.api_url, name))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| RoomError::Network(e.to_string()))?;

        let status = response.status();
        // A room the provider already expired is fine.
        if !status.is_success() && status.as_u16() != 404 {
            let message = response.text().await.unwrap_or_default();
            return Err(RoomError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
