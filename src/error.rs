//! Error kinds surfaced by the token lifecycle and the Web API client.
//!
//! Every variant is fatal for the current command. The binary decides how
//! much of an error to show; these types only have to stay distinguishable.

use std::{fmt, io, path::PathBuf, time::Duration};

use thiserror::Error;

/// One of the three values needed before talking to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CredentialField {
    ClientId,
    ClientSecret,
    RedirectUri,
}

impl CredentialField {
    pub const ALL: [CredentialField; 3] = [
        CredentialField::ClientId,
        CredentialField::ClientSecret,
        CredentialField::RedirectUri,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CredentialField::ClientId => "client_id",
            CredentialField::ClientSecret => "client_secret",
            CredentialField::RedirectUri => "redirect_uri",
        }
    }

    /// Environment variable consulted when no flag is given.
    pub fn env_var(&self) -> &'static str {
        match self {
            CredentialField::ClientId => "SPOTLI_CLIENT_ID",
            CredentialField::ClientSecret => "SPOTLI_CLIENT_SECRET",
            CredentialField::RedirectUri => "SPOTLI_REDIRECT_URI",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn missing_list(missing: &[CredentialField]) -> String {
    missing
        .iter()
        .map(|field| format!("\n - {} ({})", field, field.env_var()))
        .collect()
}

fn provider_reason(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(" ({r})"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing required user credentials{}", missing_list(.missing))]
    MissingCredentials { missing: Vec<CredentialField> },

    #[error("Invalid redirect URI `{uri}`: {reason}")]
    InvalidRedirectUri { uri: String, reason: String },

    #[error("Unsuccessful authorization attempt{}. Please try again.", provider_reason(.reason))]
    AuthorizationFailed { reason: Option<String> },

    #[error("Token endpoint rejected the request [{status}]: {body}")]
    AuthExchangeFailed { status: u16, body: String },

    #[error("Token endpoint returned an unusable payload: {0}")]
    MalformedTokenResponse(String),

    #[error(
        "Token file {} is corrupt: {source}. Inspect or delete it, then run `spotli auth`.",
        .path.display()
    )]
    CorruptTokenStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot access token file {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No token available at {}. Request a new one with `spotli auth`.", .0.display())]
    NotAuthenticated(PathBuf),

    #[error("Cannot listen for the authorization callback on {addr}: {source}")]
    CallbackBind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("No authorization callback received within {}s", .0.as_secs())]
    CallbackTimeout(Duration),

    #[error("Aborted!")]
    Interrupted,

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Category of a non-success Web API response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError,
    Unexpected,
}

impl ApiErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ApiErrorKind::BadRequest,
            401 => ApiErrorKind::Unauthorized,
            403 => ApiErrorKind::Forbidden,
            404 => ApiErrorKind::NotFound,
            429 => ApiErrorKind::RateLimited,
            500 | 502 | 503 => ApiErrorKind::ServerError,
            _ => ApiErrorKind::Unexpected,
        }
    }
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ApiErrorKind::BadRequest => "Bad Request",
            ApiErrorKind::Unauthorized => "Unauthorized",
            ApiErrorKind::Forbidden => "Forbidden",
            ApiErrorKind::NotFound => "Not Found",
            ApiErrorKind::RateLimited => "Too Many Requests",
            ApiErrorKind::ServerError => "Internal Server Error",
            ApiErrorKind::Unexpected => "Unexpected Response",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{kind}; SpotifyApiError[{status}] - {message}")]
    Status {
        kind: ApiErrorKind,
        status: u16,
        message: String,
    },

    #[error("No active device found")]
    NoActiveDevice,

    #[error("Cannot decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            ApiError::Status { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}
