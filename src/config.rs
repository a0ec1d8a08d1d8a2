//! Configuration management for spotli.
//!
//! This module loads `.env` files, exposes the Spotify endpoints and the
//! token file location, and resolves the client credentials used by the
//! authorization flow.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Command-line flags (highest priority, credentials only)
//! 2. Environment variables
//! 3. `.env` files in `~/.spotli/` and the working directory
//! 4. Application defaults (endpoints and token path)

use std::{env, path::PathBuf};

use url::Url;

use crate::{
    error::{AuthError, CredentialField},
    types::Credentials,
};

pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Scopes requested during authorization, joined with spaces in the URL.
pub const SCOPES: &[&str] = &[
    "user-read-private",
    "user-read-email",
    "user-read-playback-state",
    "user-read-recently-played",
    "user-modify-playback-state",
];

/// Loads environment variables from `.env` files.
///
/// Reads `.env` in the working directory first and then `~/.spotli/.env`.
/// Variables that are already set are never overwritten, so the process
/// environment wins over the local file, which wins over the home file.
/// Missing files are not an error.
///
/// # Errors
///
/// Returns an error string if a `.env` file exists but cannot be parsed.
///
/// # Example
///
/// ```
/// use spotli::config;
///
/// #[tokio::main]
/// async fn main() {
///     if let Err(e) = config::load_env().await {
///         eprintln!("Configuration error: {}", e);
///     }
/// }
/// ```
pub async fn load_env() -> Result<(), String> {
    load_env_files(&[PathBuf::from(".env"), app_dir().join(".env")]).await
}

/// Loads each existing file in order; earlier files take precedence.
pub async fn load_env_files(paths: &[PathBuf]) -> Result<(), String> {
    for path in paths {
        if async_fs::metadata(path).await.is_err() {
            continue;
        }
        dotenv::from_path(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    }
    Ok(())
}

/// Directory holding the token file and the optional `.env`.
pub fn app_dir() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push(".spotli");
    path
}

/// Location of the token file.
///
/// Defaults to `~/.spotli/tokens.json`; `SPOTLI_TOKEN_PATH` overrides it.
pub fn token_path() -> PathBuf {
    match non_empty_var("SPOTLI_TOKEN_PATH") {
        Some(path) => PathBuf::from(path),
        None => app_dir().join("tokens.json"),
    }
}

/// Returns the Spotify OAuth authorization URL.
///
/// # Example
///
/// ```
/// let auth_url = auth_url(); // e.g., "https://accounts.spotify.com/authorize"
/// ```
pub fn auth_url() -> String {
    non_empty_var("SPOTLI_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string())
}

/// Returns the Spotify OAuth token exchange URL.
pub fn token_url() -> String {
    non_empty_var("SPOTLI_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string())
}

/// Returns the Spotify Web API base URL.
pub fn api_url() -> String {
    non_empty_var("SPOTLI_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Credential values gathered from flags and, failing that, the environment.
///
/// Validation is deferred to [`CredentialSource::resolve`]; a still-valid
/// cached token works without any credentials at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialSource {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
}

impl CredentialSource {
    pub fn new(
        client_id: Option<String>,
        client_secret: Option<String>,
        redirect_uri: Option<String>,
    ) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
        }
    }

    /// Fills the missing values from the process environment.
    pub fn with_env_fallback(self) -> Self {
        self.with_fallback(|name| env::var(name).ok())
    }

    /// Fills the missing values through `lookup`, keyed by environment
    /// variable name. Explicit values always win.
    pub fn with_fallback<F>(self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: Option<String>, field: CredentialField| {
            explicit
                .filter(|v| !v.trim().is_empty())
                .or_else(|| lookup(field.env_var()))
        };

        Self {
            client_id: pick(self.client_id, CredentialField::ClientId),
            client_secret: pick(self.client_secret, CredentialField::ClientSecret),
            redirect_uri: pick(self.redirect_uri, CredentialField::RedirectUri),
        }
    }

    /// Fields that are absent or blank, in declaration order.
    pub fn missing(&self) -> Vec<CredentialField> {
        CredentialField::ALL
            .into_iter()
            .filter(|field| self.get(*field).is_none())
            .collect()
    }

    fn get(&self, field: CredentialField) -> Option<&str> {
        let value = match field {
            CredentialField::ClientId => &self.client_id,
            CredentialField::ClientSecret => &self.client_secret,
            CredentialField::RedirectUri => &self.redirect_uri,
        };
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// Validates completeness and parses the redirect URI.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredentials`] listing every absent field
    /// - [`AuthError::InvalidRedirectUri`] if the URI cannot be parsed or
    ///   is not a plain `http` loopback URL with a host
    pub fn resolve(&self) -> Result<Credentials, AuthError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(AuthError::MissingCredentials { missing });
        }

        let (Some(client_id), Some(client_secret), Some(raw_uri)) = (
            self.get(CredentialField::ClientId),
            self.get(CredentialField::ClientSecret),
            self.get(CredentialField::RedirectUri),
        ) else {
            return Err(AuthError::MissingCredentials {
                missing: CredentialField::ALL.to_vec(),
            });
        };

        let listen_url = Url::parse(raw_uri).map_err(|e| AuthError::InvalidRedirectUri {
            uri: raw_uri.to_string(),
            reason: e.to_string(),
        })?;

        if listen_url.scheme() != "http" {
            return Err(AuthError::InvalidRedirectUri {
                uri: raw_uri.to_string(),
                reason: "the loopback listener only speaks plain http".to_string(),
            });
        }

        if listen_url.host_str().is_none() {
            return Err(AuthError::InvalidRedirectUri {
                uri: raw_uri.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Credentials {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: raw_uri.to_string(),
            listen_url,
        })
    }
}
