//! Avatar session client
//!
//! Creates an audio-to-video session with the avatar provider and
//! returns the session token the browser widget hands to the renderer.
//! The API key never leaves the backend.

use serde::{Deserialize, Serialize};
use serde_json::json;

use sommelier_config::AvatarConfig;

use crate::SessionError;

/// Token handed to the lip-sync renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarSession {
    pub session_token: String,
}

/// Client for the avatar provider's session API.
pub struct AvatarSessionClient {
    http: reqwest::Client,
    config: AvatarConfig,
}

impl AvatarSessionClient {
    pub fn new(config: AvatarConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Start an audio-to-video session for `face_id`.
    pub async fn start_session(&self, face_id: &str) -> Result<AvatarSession, SessionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| SessionError::Avatar("avatar api key not configured".into()))?;

        let body = json!({
            "faceId": face_id,
            "apiKey": api_key,
            "isJPG": false,
            "syncAudio": true,
            "handleSilence": true,
            "maxSessionLength": self.config.max_session_length_secs,
            "maxIdleTime": self.config.max_idle_secs,
            "model": "fasttalk",
        });

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| SessionError::Avatar(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "avatar session creation failed");
            return Err(SessionError::Avatar(format!(
                "session creation failed ({status}): {text}"
            )));
        }

        response
            .json::<AvatarSession>()
            .await
            .map_err(|e| SessionError::Avatar(format!("malformed session response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key_fails_before_network() {
        let client = AvatarSessionClient::new(AvatarConfig::default());
        let err = client.start_session("face-123").await.unwrap_err();
        assert!(matches!(err, SessionError::Avatar(_)));
        assert!(err.to_string().contains("not configured"));
    }

    #[test]
    fn test_session_token_round_trip() {
        let session: AvatarSession =
            serde_json::from_str(r#"{"session_token": "abc123"}"#).unwrap();
        assert_eq!(session.session_token, "abc123");
    }
}
