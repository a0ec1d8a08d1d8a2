use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime};

use crate::{error::AuthError, types::TokenRecord};

/// Reads and writes the single token record.
///
/// The location is injected so tests can work against a temporary
/// directory. There is no cross-process locking; two invocations refreshing
/// at the same time race and the last writer wins.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored record, `None` if the file does not exist.
    ///
    /// # Errors
    ///
    /// A file that exists but does not parse is reported as
    /// [`AuthError::CorruptTokenStore`], never treated as absent.
    pub async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        let content = match async_fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.storage_error(e)),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|source| AuthError::CorruptTokenStore {
                path: self.path.clone(),
                source,
            })
    }

    /// Stamps `expires_at` from the current local time and persists the record.
    pub async fn save(&self, record: TokenRecord) -> Result<TokenRecord, AuthError> {
        self.save_at(record, Local::now().naive_local()).await
    }

    /// Same as [`TokenStore::save`] with an explicit clock reading.
    pub async fn save_at(
        &self,
        mut record: TokenRecord,
        now: NaiveDateTime,
    ) -> Result<TokenRecord, AuthError> {
        record.stamp(now);
        self.write(&record).await?;
        Ok(record)
    }

    async fn write(&self, record: &TokenRecord) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| self.storage_error(e))?;
        }

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| self.storage_error(std::io::Error::other(e)))?;

        // Readers must never see a half-written file.
        let tmp = self.temp_path();
        async_fs::write(&tmp, json)
            .await
            .map_err(|e| self.storage_error(e))?;
        if let Err(e) = async_fs::rename(&tmp, &self.path).await {
            let _ = async_fs::remove_file(&tmp).await;
            return Err(self.storage_error(e));
        }

        tracing::debug!(path = %self.path.display(), "token record written");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tokens.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn storage_error(&self, source: std::io::Error) -> AuthError {
        AuthError::Storage {
            path: self.path.clone(),
            source,
        }
    }
}
