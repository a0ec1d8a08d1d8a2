use std::{future::Future, io, path::Path, pin::Pin, sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Local, NaiveDateTime, TimeDelta};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, header::AUTHORIZATION};
use url::Url;

use crate::{
    config::{self, CredentialSource},
    error::AuthError,
    info,
    management::TokenStore,
    server::CallbackServer,
    types::{AuthorizationCode, Credentials, TokenOutcome, TokenRecord, TokenResponse, TokenState},
    warning,
};

/// Client for the two token-endpoint grants.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    client: Client,
    token_url: String,
}

impl TokenExchanger {
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            token_url: token_url.into(),
        }
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Trades an authorization code for a fresh token pair.
    pub async fn exchange_code(
        &self,
        code: &AuthorizationCode,
        credentials: &Credentials,
    ) -> Result<TokenResponse, AuthError> {
        self.grant(
            credentials,
            &[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("redirect_uri", credentials.redirect_uri.as_str()),
            ],
        )
        .await
    }

    /// Trades a refresh token for a new access token.
    ///
    /// The response may leave out `refresh_token`; merging it into the
    /// stored record keeps the old one in that case.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        credentials: &Credentials,
    ) -> Result<TokenResponse, AuthError> {
        self.grant(
            credentials,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ],
        )
        .await
    }

    async fn grant(
        &self,
        credentials: &Credentials,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, AuthError> {
        let grant_type = form.first().map(|(_, v)| *v).unwrap_or_default();
        tracing::debug!(url = %self.token_url, grant_type, "requesting token");

        let response = self
            .client
            .post(&self.token_url)
            .header(AUTHORIZATION, basic_auth_header(credentials))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::AuthExchangeFailed {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AuthError::MalformedTokenResponse(e.to_string()))
    }
}

/// `Basic base64(client_id:client_secret)`.
pub fn basic_auth_header(credentials: &Credentials) -> String {
    let raw = format!("{}:{}", credentials.client_id, credentials.client_secret);
    format!("Basic {}", STANDARD.encode(raw))
}

/// Something that can show the authorize URL to the user.
pub trait Browser {
    fn open(&self, url: &str) -> Result<(), String>;
}

/// Prints the URL and launches the default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), String> {
        info!("Open this URL in your browser to authorize the app:\n{}", url);
        webbrowser::open(url).map_err(|e| e.to_string())
    }
}

pub type CancelFuture = Pin<Box<dyn Future<Output = io::Result<()>> + Send>>;

/// Produces the future that aborts the browser wait once it resolves to `Ok`.
pub type CancelSignal = Arc<dyn Fn() -> CancelFuture + Send + Sync>;

fn ctrl_c_signal() -> CancelSignal {
    Arc::new(|| -> CancelFuture { Box::pin(tokio::signal::ctrl_c()) })
}

/// Decides between the cached token, a refresh, or the full browser flow.
pub struct Authorizer<B = SystemBrowser> {
    store: TokenStore,
    exchanger: TokenExchanger,
    credentials: CredentialSource,
    authorize_url: String,
    scopes: Vec<String>,
    browser: B,
    callback_timeout: Option<Duration>,
    expiry_margin: TimeDelta,
    cancel: CancelSignal,
}

impl Authorizer<SystemBrowser> {
    pub fn new(store: TokenStore, exchanger: TokenExchanger, credentials: CredentialSource) -> Self {
        Self {
            store,
            exchanger,
            credentials,
            authorize_url: config::DEFAULT_AUTH_URL.to_string(),
            scopes: config::SCOPES.iter().map(|s| s.to_string()).collect(),
            browser: SystemBrowser,
            callback_timeout: None,
            expiry_margin: TimeDelta::zero(),
            cancel: ctrl_c_signal(),
        }
    }

    /// Wires the store and endpoints from the environment; `credentials`
    /// falls back to the environment for anything not given explicitly.
    pub fn from_env(credentials: CredentialSource) -> Self {
        Self::new(
            TokenStore::new(config::token_path()),
            TokenExchanger::new(config::token_url()),
            credentials.with_env_fallback(),
        )
        .with_authorize_url(config::auth_url())
    }
}

impl<B: Browser> Authorizer<B> {
    pub fn with_browser<T: Browser>(self, browser: T) -> Authorizer<T> {
        Authorizer {
            store: self.store,
            exchanger: self.exchanger,
            credentials: self.credentials,
            authorize_url: self.authorize_url,
            scopes: self.scopes,
            browser,
            callback_timeout: self.callback_timeout,
            expiry_margin: self.expiry_margin,
            cancel: self.cancel,
        }
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_callback_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Replaces Ctrl-C as the signal that aborts the wait for the browser.
    pub fn with_cancel_signal<F, Fut>(mut self, signal: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = io::Result<()>> + Send + 'static,
    {
        self.cancel = Arc::new(move || -> CancelFuture { Box::pin(signal()) });
        self
    }

    /// Treats tokens expiring within `margin` from now as already expired.
    pub fn with_expiry_margin(mut self, margin: TimeDelta) -> Self {
        self.expiry_margin = margin;
        self
    }

    pub fn token_path(&self) -> &Path {
        self.store.path()
    }

    /// Returns a usable access token, running whatever step is needed.
    ///
    /// # Flow
    ///
    /// 1. No stored token: resolve credentials, send the user through the
    ///    browser consent, exchange the code and persist the record
    /// 2. Expired token: resolve credentials, refresh, merge and persist
    /// 3. Valid token: return it without touching the network
    ///
    /// A failed refresh leaves the stored record untouched.
    pub async fn get_access_token(&self) -> Result<TokenOutcome, AuthError> {
        match self.current_state().await? {
            TokenState::Missing => {
                tracing::debug!("no stored token, starting authorization");
                self.authorize().await
            }
            TokenState::Expired(record) => self.refresh(record).await,
            TokenState::Valid(record) => Ok(TokenOutcome::Cached(record.access_token)),
        }
    }

    /// Like [`Authorizer::get_access_token`] but never opens a browser.
    ///
    /// # Errors
    ///
    /// [`AuthError::NotAuthenticated`] when no token is stored yet.
    pub async fn stored_access_token(&self) -> Result<TokenOutcome, AuthError> {
        match self.current_state().await? {
            TokenState::Missing => Err(AuthError::NotAuthenticated(self.store.path().to_path_buf())),
            TokenState::Expired(record) => self.refresh(record).await,
            TokenState::Valid(record) => Ok(TokenOutcome::Cached(record.access_token)),
        }
    }

    async fn current_state(&self) -> Result<TokenState, AuthError> {
        let record = self.store.load().await?;
        let now = self.now() + self.expiry_margin;
        let state = TokenState::classify(record, now);
        tracing::debug!(
            state = match &state {
                TokenState::Missing => "missing",
                TokenState::Expired(_) => "expired",
                TokenState::Valid(_) => "valid",
            },
            "token state"
        );
        Ok(state)
    }

    async fn refresh(&self, mut record: TokenRecord) -> Result<TokenOutcome, AuthError> {
        let credentials = self.credentials.resolve()?;
        let response = self.exchanger.refresh(&record.refresh_token, &credentials).await?;
        record.merge(response);
        let record = self.store.save(record).await?;
        Ok(TokenOutcome::Refreshed(record.access_token))
    }

    async fn authorize(&self) -> Result<TokenOutcome, AuthError> {
        let credentials = self.credentials.resolve()?;
        let url = self.authorize_url_for(&credentials)?;

        let server = CallbackServer::bind(&credentials.listen_url).await?;

        if let Err(e) = self.browser.open(url.as_str()) {
            warning!(
                "Failed to open browser ({}). Please navigate to the following URL manually:\n{}",
                e,
                url
            );
        }

        let cancelled = async {
            if let Err(e) = (self.cancel)().await {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        let pb = waiting_spinner();
        let code = tokio::select! {
            code = server.wait_for_code(self.callback_timeout) => code,
            _ = cancelled => Err(AuthError::Interrupted),
        };
        pb.finish_and_clear();
        let code = code?;

        let response = self.exchanger.exchange_code(&code, &credentials).await?;
        let record = TokenRecord::issued(response, self.now())
            .map_err(AuthError::MalformedTokenResponse)?;
        let record = self.store.save(record).await?;
        Ok(TokenOutcome::Authorized(record.access_token))
    }

    /// `<authorize-base>?client_id&response_type=code&redirect_uri&scope`.
    pub fn authorize_url_for(&self, credentials: &Credentials) -> Result<Url, AuthError> {
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &self.authorize_url,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", credentials.redirect_uri.as_str()),
                ("scope", scope.as_str()),
            ],
        )
        .map_err(|e| AuthError::InvalidRedirectUri {
            uri: self.authorize_url.clone(),
            reason: format!("cannot build authorize URL: {e}"),
        })
    }

    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

fn waiting_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_message("Waiting for authorization in the browser... (Ctrl-C to abort)");
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }
    pb
}
