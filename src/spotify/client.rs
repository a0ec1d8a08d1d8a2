use reqwest::{Client, Method, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::error::{ApiError, ApiErrorKind};

/// Thin bearer-authenticated wrapper over the Web API.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SpotifyClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// Sends one request and returns the JSON body, if any.
    ///
    /// `200` with a body yields `Some(json)`; `200` without one and
    /// `201`/`202`/`204` yield `None`. Every other status becomes an
    /// [`ApiError::Status`] carrying the provider's error message.
    pub async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<Option<Value>, ApiError> {
        let url = format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'));
        tracing::debug!(%method, %url, "api request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.access_token)
            .query(query);
        request = match body {
            Some(body) => request.json(body),
            // Spotify answers 411 to a body-less PUT/POST without a length.
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        match status {
            StatusCode::OK => {
                if text.trim().is_empty() {
                    return Ok(None);
                }
                serde_json::from_str(&text)
                    .map(Some)
                    .map_err(|source| ApiError::Decode {
                        endpoint: endpoint.to_string(),
                        source,
                    })
            }
            StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(None),
            other => Err(ApiError::Status {
                kind: ApiErrorKind::from_status(other.as_u16()),
                status: other.as_u16(),
                message: error_message(&text),
            }),
        }
    }

    /// GET that decodes into `T`, `None` when the API answers without content.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Option<T>, ApiError> {
        match self.request::<Value>(Method::GET, endpoint, query, None).await? {
            Some(json) => serde_json::from_value(json)
                .map(Some)
                .map_err(|source| ApiError::Decode {
                    endpoint: endpoint.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        self.request(Method::PUT, endpoint, query, body).await.map(|_| ())
    }

    pub async fn post(&self, endpoint: &str, query: &[(&str, String)]) -> Result<(), ApiError> {
        self.request::<Value>(Method::POST, endpoint, query, None)
            .await
            .map(|_| ())
    }
}

/// Pulls `error.message` out of a Spotify error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| match &json["error"] {
            Value::Object(err) => err.get("message").and_then(Value::as_str).map(str::to_string),
            Value::String(s) => Some(match json["error_description"].as_str() {
                Some(desc) => format!("{s}: {desc}"),
                None => s.clone(),
            }),
            _ => None,
        })
        .unwrap_or_else(|| body.trim().to_string())
}
