use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Extension, Router};
use tokio::{
    net::TcpListener,
    sync::{Mutex, oneshot},
};
use url::Url;

use crate::{
    api::{self, CallbackParams},
    error::AuthError,
    types::AuthorizationCode,
};

/// How long a served response gets to flush before the listener is dropped.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Loopback listener that serves exactly one authorization redirect.
///
/// Must be bound before the browser is sent to the provider.
pub struct CallbackServer {
    listener: TcpListener,
    addr: SocketAddr,
}

impl CallbackServer {
    /// Binds on the host and port named by the redirect URI.
    pub async fn bind(redirect_uri: &Url) -> Result<Self, AuthError> {
        let host = redirect_uri.host_str().unwrap_or("localhost");
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = redirect_uri
            .port_or_known_default()
            .ok_or_else(|| AuthError::InvalidRedirectUri {
                uri: redirect_uri.to_string(),
                reason: "missing port".to_string(),
            })?;

        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|source| AuthError::CallbackBind {
                addr: format!("{host}:{port}"),
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| AuthError::CallbackBind {
                addr: format!("{host}:{port}"),
                source,
            })?;

        tracing::debug!(%addr, "callback listener bound");
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Blocks until the single redirect arrives, then stops listening.
    ///
    /// Without a timeout this waits for as long as the user takes in the
    /// browser.
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthorizationFailed`] if the redirect carries no code
    /// - [`AuthError::CallbackTimeout`] if `timeout` elapses first
    pub async fn wait_for_code(
        self,
        timeout: Option<Duration>,
    ) -> Result<AuthorizationCode, AuthError> {
        let (code_tx, code_rx) = oneshot::channel::<CallbackParams>();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let slot: api::CallbackSlot = Arc::new(Mutex::new(Some(code_tx)));

        let app = Router::new()
            .fallback(api::callback)
            .layer(Extension(slot));

        let mut server = tokio::spawn(async move {
            axum::serve(self.listener, app)
                .with_graceful_shutdown(async {
                    let _ = stop_rx.await;
                })
                .await
        });

        let received = match timeout {
            Some(limit) => tokio::time::timeout(limit, code_rx).await.ok(),
            None => Some(code_rx.await),
        };

        let _ = stop_tx.send(());
        if tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await.is_err() {
            tracing::debug!("callback listener did not drain in time, aborting");
            server.abort();
        }

        match received {
            None => Err(AuthError::CallbackTimeout(timeout.unwrap_or_default())),
            Some(Err(_)) => Err(AuthError::AuthorizationFailed { reason: None }),
            Some(Ok(params)) => match params.code {
                Some(code) => Ok(AuthorizationCode(code)),
                None => Err(AuthError::AuthorizationFailed {
                    reason: params.error,
                }),
            },
        }
    }
}
