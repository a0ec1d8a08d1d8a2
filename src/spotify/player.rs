use crate::{
    error::ApiError,
    types::{
        Device, DevicesResponse, PlaybackState, Queue, RecentlyPlayedResponse, RepeatMode,
        SpotifyUri, Track, TransferPlaybackRequest,
    },
};

use super::client::SpotifyClient;

const PLAYER: &str = "me/player";

/// Typed wrappers around the `me/player` endpoints.
#[derive(Debug, Clone)]
pub struct PlayerApi {
    client: SpotifyClient,
}

fn device_param(device_id: Option<&str>) -> Vec<(&'static str, String)> {
    device_id
        .map(|id| vec![("device_id", id.to_string())])
        .unwrap_or_default()
}

impl PlayerApi {
    pub fn new(client: SpotifyClient) -> Self {
        Self { client }
    }

    /// Current playback state, `None` when no device is active.
    pub async fn playback_state(&self) -> Result<Option<PlaybackState>, ApiError> {
        self.client.get(PLAYER, &[]).await
    }

    pub async fn transfer_playback(&self, device_id: &str) -> Result<(), ApiError> {
        let body = TransferPlaybackRequest {
            device_ids: vec![device_id.to_string()],
            play: false,
        };
        self.client.put(PLAYER, &[], Some(&body)).await
    }

    pub async fn available_devices(&self) -> Result<Vec<Device>, ApiError> {
        let response: Option<DevicesResponse> =
            self.client.get(&format!("{PLAYER}/devices"), &[]).await?;
        Ok(response.map(|r| r.devices).unwrap_or_default())
    }

    pub async fn start_resume(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.client
            .put::<()>(&format!("{PLAYER}/play"), &device_param(device_id), None)
            .await
    }

    pub async fn pause(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.client
            .put::<()>(&format!("{PLAYER}/pause"), &device_param(device_id), None)
            .await
    }

    pub async fn skip_to_next(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.client
            .post(&format!("{PLAYER}/next"), &device_param(device_id))
            .await
    }

    pub async fn skip_to_previous(&self, device_id: Option<&str>) -> Result<(), ApiError> {
        self.client
            .post(&format!("{PLAYER}/previous"), &device_param(device_id))
            .await
    }

    pub async fn seek(&self, position_ms: u64, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut query = vec![("position_ms", position_ms.to_string())];
        query.extend(device_param(device_id));
        self.client
            .put::<()>(&format!("{PLAYER}/seek"), &query, None)
            .await
    }

    pub async fn set_repeat(&self, mode: RepeatMode, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut query = vec![("state", mode.as_str().to_string())];
        query.extend(device_param(device_id));
        self.client
            .put::<()>(&format!("{PLAYER}/repeat"), &query, None)
            .await
    }

    pub async fn set_volume(&self, percent: u8, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut query = vec![("volume_percent", percent.to_string())];
        query.extend(device_param(device_id));
        self.client
            .put::<()>(&format!("{PLAYER}/volume"), &query, None)
            .await
    }

    pub async fn set_shuffle(&self, state: bool, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut query = vec![("state", state.to_string())];
        query.extend(device_param(device_id));
        self.client
            .put::<()>(&format!("{PLAYER}/shuffle"), &query, None)
            .await
    }

    /// Recently played tracks, newest first.
    pub async fn recently_played(&self, limit: u8) -> Result<Vec<Track>, ApiError> {
        let response: Option<RecentlyPlayedResponse> = self
            .client
            .get(
                &format!("{PLAYER}/recently-played"),
                &[("limit", limit.to_string())],
            )
            .await?;
        Ok(response
            .map(|r| r.items.into_iter().map(|h| h.track).collect())
            .unwrap_or_default())
    }

    /// The currently playing item followed by the upcoming queue.
    pub async fn queue(&self) -> Result<Option<Queue>, ApiError> {
        self.client.get(&format!("{PLAYER}/queue"), &[]).await
    }

    pub async fn add_to_queue(&self, uri: &SpotifyUri, device_id: Option<&str>) -> Result<(), ApiError> {
        let mut query = vec![("uri", uri.as_str().to_string())];
        query.extend(device_param(device_id));
        self.client.post(&format!("{PLAYER}/queue"), &query).await
    }
}
