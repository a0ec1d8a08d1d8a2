use std::{fmt, str::FromStr};

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use url::Url;

/// Format of `expires_at` in the token file: local time, no offset.
pub const EXPIRES_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Resolved client credentials. Held for one invocation, never written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI exactly as configured; the provider compares it byte for byte.
    pub redirect_uri: String,
    /// Parsed form of `redirect_uri`, only used to bind the callback listener.
    pub listen_url: Url,
}

/// Single-use code captured by the loopback listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationCode(pub String);

impl AuthorizationCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Payload returned by the token endpoint for either grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The persisted unit of credential state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
    #[serde(with = "expires_at_format")]
    pub expires_at: NaiveDateTime,
    #[serde(default)]
    pub scope: String,
}

impl TokenRecord {
    /// Builds the first record from a code-exchange response.
    ///
    /// The authorization-code grant must hand out a refresh token, otherwise
    /// the record could never be renewed.
    pub fn issued(response: TokenResponse, now: NaiveDateTime) -> Result<Self, String> {
        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "missing refresh_token".to_string())?;

        let mut record = Self {
            access_token: response.access_token,
            refresh_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            expires_at: now,
            scope: response.scope.unwrap_or_default(),
        };
        record.stamp(now);
        Ok(record)
    }

    /// Applies a refresh response: present fields overwrite, absent ones are kept.
    pub fn merge(&mut self, response: TokenResponse) {
        self.access_token = response.access_token;
        self.token_type = response.token_type;
        self.expires_in = response.expires_in;
        if let Some(refresh_token) = response.refresh_token.filter(|t| !t.is_empty()) {
            self.refresh_token = refresh_token;
        }
        if let Some(scope) = response.scope {
            self.scope = scope;
        }
    }

    /// Recomputes `expires_at` as `now + expires_in`, truncated to whole seconds.
    pub fn stamp(&mut self, now: NaiveDateTime) {
        let secs = i64::try_from(self.expires_in).unwrap_or(i64::MAX);
        let lifetime = TimeDelta::try_seconds(secs).unwrap_or(TimeDelta::MAX);
        let expires_at = now.checked_add_signed(lifetime).unwrap_or(NaiveDateTime::MAX);
        self.expires_at = expires_at.with_nanosecond(0).unwrap_or(expires_at);
    }

    /// Strictly past expiry; a token expiring exactly at `now` is still usable.
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at < now
    }
}

mod expires_at_format {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::EXPIRES_AT_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(EXPIRES_AT_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, EXPIRES_AT_FORMAT).map_err(D::Error::custom)
    }
}

/// Classification of the stored token, computed once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenState {
    Missing,
    Expired(TokenRecord),
    Valid(TokenRecord),
}

impl TokenState {
    pub fn classify(record: Option<TokenRecord>, now: NaiveDateTime) -> Self {
        match record {
            None => TokenState::Missing,
            Some(record) if record.is_expired(now) => TokenState::Expired(record),
            Some(record) => TokenState::Valid(record),
        }
    }
}

/// How the returned access token was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenOutcome {
    Cached(String),
    Refreshed(String),
    Authorized(String),
}

impl TokenOutcome {
    pub fn access_token(&self) -> &str {
        match self {
            TokenOutcome::Cached(t) | TokenOutcome::Refreshed(t) | TokenOutcome::Authorized(t) => t,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub is_private_session: bool,
    #[serde(default)]
    pub is_restricted: bool,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub volume_percent: Option<u32>,
    #[serde(default)]
    pub supports_volume: bool,
}

impl Device {
    /// First five characters of the id, as shown next to device names.
    pub fn short_id(&self) -> &str {
        self.id.as_deref().map(crate::utils::short_id).unwrap_or("-----")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Album {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub album_type: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackState {
    pub device: Device,
    #[serde(default = "default_repeat_state")]
    pub repeat_state: String,
    #[serde(default)]
    pub shuffle_state: bool,
    #[serde(default)]
    pub progress_ms: Option<u64>,
    pub is_playing: bool,
    #[serde(default)]
    pub currently_playing_type: Option<String>,
    #[serde(default)]
    pub item: Option<Track>,
}

fn default_repeat_state() -> String {
    "off".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Queue {
    pub currently_playing: Option<Track>,
    #[serde(default)]
    pub queue: Vec<Track>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayHistory {
    pub track: Track,
    #[serde(default)]
    pub played_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentlyPlayedResponse {
    pub items: Vec<PlayHistory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferPlaybackRequest {
    pub device_ids: Vec<String>,
    pub play: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RepeatMode {
    /// Repeat the current track
    Track,
    /// Repeat the current context (album, playlist)
    Context,
    /// Turn repeat off
    Off,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Track => "track",
            RepeatMode::Context => "context",
            RepeatMode::Off => "off",
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `spotify:<type>:<id>` URI accepted by the queue endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyUri(String);

impl SpotifyUri {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SpotifyUri {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            ["spotify", kind, id]
                if matches!(*kind, "track" | "episode")
                    && !id.is_empty()
                    && id.chars().all(|c| c.is_ascii_alphanumeric()) =>
            {
                Ok(SpotifyUri(s.to_string()))
            }
            _ => Err(format!(
                "'{s}' is not a valid Spotify URI (expected spotify:track:<id> or spotify:episode:<id>)"
            )),
        }
    }
}

impl fmt::Display for SpotifyUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of picking a device by its number in the device table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceChoice {
    Target(String),
    /// The device exists but reports no id, so it cannot be addressed.
    Untargetable(String),
    Cancelled,
}

#[derive(Tabled)]
pub struct DeviceTableRow {
    #[tabled(rename = "#")]
    pub number: usize,
    pub active: String,
    pub id: String,
    pub private: String,
    pub restricted: String,
    pub name: String,
    #[tabled(rename = "type")]
    pub kind: String,
}
