use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{Local, TimeDelta};
use mockito::{Matcher, Mock, Server, ServerGuard};
use spotli::{
    config::CredentialSource,
    error::AuthError,
    management::TokenStore,
    spotify::auth::{Authorizer, Browser, TokenExchanger, basic_auth_header},
    types::{Credentials, TokenOutcome, TokenRecord},
};
use tempfile::TempDir;
use url::Url;

const AUTHORIZE_URL: &str = "https://accounts.example.test/authorize";
const BASIC: &str = "Basic bXktY2xpZW50Om15LXNlY3JldA==";

/// Stands in for the user: follows the redirect with a fixed query.
#[derive(Clone)]
struct FakeBrowser {
    query: &'static str,
    opened: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    fn new(query: &'static str) -> Self {
        Self {
            query,
            opened: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Browser for FakeBrowser {
    fn open(&self, url: &str) -> Result<(), String> {
        self.opened.lock().unwrap().push(url.to_string());

        let parsed = Url::parse(url).map_err(|e| e.to_string())?;
        let redirect = parsed
            .query_pairs()
            .find(|(k, _)| k == "redirect_uri")
            .map(|(_, v)| v.into_owned())
            .ok_or("no redirect_uri")?;
        let target = format!("{}?{}", redirect, self.query);

        tokio::spawn(async move {
            let _ = reqwest::get(target).await;
        });
        Ok(())
    }
}

/// Opens nothing; the redirect never arrives.
struct IdleBrowser;

impl Browser for IdleBrowser {
    fn open(&self, _url: &str) -> Result<(), String> {
        Ok(())
    }
}

fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn credentials(port: u16) -> CredentialSource {
    CredentialSource::new(
        Some("my-client".to_string()),
        Some("my-secret".to_string()),
        Some(format!("http://127.0.0.1:{port}/callback")),
    )
}

struct Fixture {
    _dir: TempDir,
    server: ServerGuard,
    store: TokenStore,
    port: u16,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::new(dir.path().join(".spotli").join("tokens.json"));
        Self {
            _dir: dir,
            server: Server::new_async().await,
            store,
            port: free_port(),
        }
    }

    fn authorizer<B: Browser>(&self, creds: CredentialSource, browser: B) -> Authorizer<B> {
        Authorizer::new(
            self.store.clone(),
            TokenExchanger::new(format!("{}/api/token", self.server.url())),
            creds,
        )
        .with_authorize_url(AUTHORIZE_URL)
        .with_browser(browser)
    }

    async fn token_mock(&mut self, grant: Matcher, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", "/api/token")
            .match_header("authorization", BASIC)
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(grant)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    async fn store_record(&self, hours_from_now: i64) -> TokenRecord {
        let record = TokenRecord {
            access_token: "stored-access".to_string(),
            refresh_token: "stored-refresh".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            expires_at: Local::now().naive_local(),
            scope: "user-read-private".to_string(),
        };
        // save_at adds expires_in (one hour) to the given instant.
        let issued = Local::now().naive_local() + TimeDelta::hours(hours_from_now - 1);
        self.store.save_at(record, issued).await.unwrap()
    }
}

fn code_grant(code: &str, redirect: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
        Matcher::UrlEncoded("code".into(), code.into()),
        Matcher::UrlEncoded("redirect_uri".into(), redirect.into()),
    ])
}

fn refresh_grant(refresh_token: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
        Matcher::UrlEncoded("refresh_token".into(), refresh_token.into()),
    ])
}

#[test]
fn test_basic_auth_header() {
    let creds = Credentials {
        client_id: "my-client".to_string(),
        client_secret: "my-secret".to_string(),
        redirect_uri: "http://localhost:8888/callback".to_string(),
        listen_url: Url::parse("http://localhost:8888/callback").unwrap(),
    };
    assert_eq!(basic_auth_header(&creds), BASIC);
}

#[tokio::test]
async fn test_authorize_url_carries_client_redirect_and_scopes() {
    let fx = Fixture::new().await;
    let authorizer = fx.authorizer(credentials(fx.port), FakeBrowser::new("code=x"));
    let creds = credentials(fx.port).resolve().unwrap();

    let url = authorizer.authorize_url_for(&creds).unwrap();
    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

    assert!(url.as_str().starts_with(AUTHORIZE_URL));
    assert!(pairs.contains(&("client_id".into(), "my-client".into())));
    assert!(pairs.contains(&("response_type".into(), "code".into())));
    assert!(pairs.contains(&(
        "redirect_uri".into(),
        format!("http://127.0.0.1:{}/callback", fx.port)
    )));
    let scope = pairs.iter().find(|(k, _)| k == "scope").unwrap();
    assert!(scope.1.split(' ').any(|s| s == "user-read-playback-state"));
    assert!(scope.1.split(' ').any(|s| s == "user-modify-playback-state"));
}

#[tokio::test]
async fn test_no_token_runs_full_authorization() {
    let mut fx = Fixture::new().await;
    let redirect = format!("http://127.0.0.1:{}/callback", fx.port);
    let exchange = fx
        .token_mock(
            code_grant("ABC123", &redirect),
            200,
            r#"{"access_token":"fresh-access","token_type":"Bearer","expires_in":3600,"refresh_token":"fresh-refresh","scope":"user-read-private"}"#,
        )
        .await;

    let browser = FakeBrowser::new("code=ABC123");
    let authorizer = fx.authorizer(credentials(fx.port), browser.clone());

    let outcome = authorizer.get_access_token().await.unwrap();
    assert_eq!(outcome, TokenOutcome::Authorized("fresh-access".to_string()));
    exchange.assert_async().await;
    assert_eq!(browser.opened().len(), 1);

    let stored = fx.store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh-access");
    assert_eq!(stored.refresh_token, "fresh-refresh");
    assert!(stored.expires_at > Local::now().naive_local());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_not_reauthorized() {
    let mut fx = Fixture::new().await;
    fx.store_record(-1).await;

    let refresh = fx
        .token_mock(
            refresh_grant("stored-refresh"),
            200,
            r#"{"access_token":"refreshed-access","token_type":"Bearer","expires_in":3600,"scope":"user-read-private"}"#,
        )
        .await;
    let exchange = fx
        .server
        .mock("POST", "/api/token")
        .match_body(Matcher::UrlEncoded(
            "grant_type".into(),
            "authorization_code".into(),
        ))
        .expect(0)
        .create_async()
        .await;

    let browser = FakeBrowser::new("code=unused");
    let authorizer = fx.authorizer(credentials(fx.port), browser.clone());

    let outcome = authorizer.get_access_token().await.unwrap();
    assert_eq!(
        outcome,
        TokenOutcome::Refreshed("refreshed-access".to_string())
    );
    refresh.assert_async().await;
    exchange.assert_async().await;
    assert!(browser.opened().is_empty());

    let stored = fx.store.load().await.unwrap().unwrap();
    assert_eq!(stored.access_token, "refreshed-access");
    // Provider omitted refresh_token, so the old one survives.
    assert_eq!(stored.refresh_token, "stored-refresh");
    assert!(stored.expires_at > Local::now().naive_local());
}

#[tokio::test]
async fn test_refresh_overwrites_rotated_refresh_token() {
    let mut fx = Fixture::new().await;
    fx.store_record(-1).await;
    let refresh = fx
        .token_mock(
            refresh_grant("stored-refresh"),
            200,
            r#"{"access_token":"refreshed-access","token_type":"Bearer","expires_in":3600,"refresh_token":"rotated"}"#,
        )
        .await;

    let authorizer = fx.authorizer(credentials(fx.port), FakeBrowser::new("code=unused"));
    authorizer.get_access_token().await.unwrap();
    refresh.assert_async().await;

    let stored = fx.store.load().await.unwrap().unwrap();
    assert_eq!(stored.refresh_token, "rotated");
    assert_eq!(stored.scope, "user-read-private");
}

#[tokio::test]
async fn test_valid_token_makes_no_network_call() {
    let mut fx = Fixture::new().await;
    fx.store_record(1).await;
    let any = fx
        .server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let browser = FakeBrowser::new("code=unused");
    // No credentials at all: a valid token must not need them.
    let authorizer = fx.authorizer(CredentialSource::default(), browser.clone());

    let outcome = authorizer.get_access_token().await.unwrap();
    assert_eq!(outcome, TokenOutcome::Cached("stored-access".to_string()));
    any.assert_async().await;
    assert!(browser.opened().is_empty());
}

#[tokio::test]
async fn test_expiry_margin_forces_early_refresh() {
    let mut fx = Fixture::new().await;
    fx.store_record(1).await;
    let refresh = fx
        .token_mock(
            refresh_grant("stored-refresh"),
            200,
            r#"{"access_token":"early","token_type":"Bearer","expires_in":3600}"#,
        )
        .await;

    let authorizer = fx
        .authorizer(credentials(fx.port), FakeBrowser::new("code=unused"))
        .with_expiry_margin(TimeDelta::hours(2));

    let outcome = authorizer.get_access_token().await.unwrap();
    assert_eq!(outcome, TokenOutcome::Refreshed("early".to_string()));
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_callback_without_code_fails_before_exchange() {
    let mut fx = Fixture::new().await;
    let exchange = fx
        .server
        .mock("POST", "/api/token")
        .expect(0)
        .create_async()
        .await;

    let authorizer = fx.authorizer(credentials(fx.port), FakeBrowser::new("error=access_denied"));

    let err = authorizer.get_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::AuthorizationFailed { .. }));
    exchange.assert_async().await;
    assert!(fx.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_refresh_rejection_leaves_store_untouched() {
    let mut fx = Fixture::new().await;
    let before = fx.store_record(-1).await;
    let refresh = fx
        .token_mock(
            refresh_grant("stored-refresh"),
            400,
            r#"{"error":"invalid_grant","error_description":"Refresh token revoked"}"#,
        )
        .await;

    let authorizer = fx.authorizer(credentials(fx.port), FakeBrowser::new("code=unused"));
    let err = authorizer.get_access_token().await.unwrap_err();

    match err {
        AuthError::AuthExchangeFailed { status, body } => {
            assert_eq!(status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected AuthExchangeFailed, got {:?}", other),
    }
    refresh.assert_async().await;
    assert_eq!(fx.store.load().await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_code_exchange_rejection_is_exchange_failure() {
    let mut fx = Fixture::new().await;
    let redirect = format!("http://127.0.0.1:{}/callback", fx.port);
    let exchange = fx
        .token_mock(
            code_grant("ABC123", &redirect),
            401,
            r#"{"error":"invalid_client"}"#,
        )
        .await;

    let authorizer = fx.authorizer(credentials(fx.port), FakeBrowser::new("code=ABC123"));
    let err = authorizer.get_access_token().await.unwrap_err();

    assert!(matches!(err, AuthError::AuthExchangeFailed { status: 401, .. }));
    exchange.assert_async().await;
    assert!(fx.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_credentials_stop_before_browser() {
    let fx = Fixture::new().await;
    let browser = FakeBrowser::new("code=unused");
    let authorizer = fx.authorizer(
        CredentialSource::new(Some("my-client".to_string()), None, None),
        browser.clone(),
    );

    let err = authorizer.get_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials { ref missing } if missing.len() == 2));
    assert!(browser.opened().is_empty());
}

#[tokio::test]
async fn test_expired_token_without_credentials_is_missing_credentials() {
    let fx = Fixture::new().await;
    fx.store_record(-1).await;

    let authorizer = fx.authorizer(CredentialSource::default(), FakeBrowser::new("code=unused"));
    let err = authorizer.get_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::MissingCredentials { .. }));
}

#[tokio::test]
async fn test_corrupt_store_is_reported_not_reauthorized() {
    let fx = Fixture::new().await;
    std::fs::create_dir_all(fx.store.path().parent().unwrap()).unwrap();
    std::fs::write(fx.store.path(), "garbage").unwrap();

    let browser = FakeBrowser::new("code=unused");
    let authorizer = fx.authorizer(credentials(fx.port), browser.clone());

    let err = authorizer.get_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::CorruptTokenStore { .. }));
    assert!(browser.opened().is_empty());
}

#[tokio::test]
async fn test_stored_access_token_never_starts_browser_flow() {
    let fx = Fixture::new().await;
    let browser = FakeBrowser::new("code=unused");
    let authorizer = fx.authorizer(credentials(fx.port), browser.clone());

    let err = authorizer.stored_access_token().await.unwrap_err();
    match err {
        AuthError::NotAuthenticated(path) => assert_eq!(path, fx.store.path()),
        other => panic!("expected NotAuthenticated, got {:?}", other),
    }
    assert!(browser.opened().is_empty());
}

#[tokio::test]
async fn test_pathless_redirect_uri_is_sent_verbatim() {
    let mut fx = Fixture::new().await;
    let redirect = format!("http://127.0.0.1:{}", fx.port);
    let exchange = fx
        .token_mock(
            code_grant("ABC123", &redirect),
            200,
            r#"{"access_token":"fresh-access","token_type":"Bearer","expires_in":3600,"refresh_token":"fresh-refresh"}"#,
        )
        .await;

    let browser = FakeBrowser::new("code=ABC123");
    let creds = CredentialSource::new(
        Some("my-client".to_string()),
        Some("my-secret".to_string()),
        Some(redirect.clone()),
    );
    let authorizer = fx.authorizer(creds, browser.clone());

    let outcome = authorizer.get_access_token().await.unwrap();
    assert_eq!(outcome, TokenOutcome::Authorized("fresh-access".to_string()));
    exchange.assert_async().await;

    let opened = Url::parse(&browser.opened()[0]).unwrap();
    let sent = opened
        .query_pairs()
        .find(|(k, _)| k == "redirect_uri")
        .map(|(_, v)| v.into_owned());
    assert_eq!(sent.as_deref(), Some(redirect.as_str()));
}

#[tokio::test]
async fn test_cancel_during_browser_wait_is_interrupted() {
    let mut fx = Fixture::new().await;
    let exchange = fx
        .server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let authorizer = fx
        .authorizer(credentials(fx.port), IdleBrowser)
        .with_cancel_signal(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(())
        });

    let err = authorizer.get_access_token().await.unwrap_err();
    assert!(matches!(err, AuthError::Interrupted));
    exchange.assert_async().await;
    assert!(fx.store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unavailable_cancel_signal_keeps_waiting() {
    let mut fx = Fixture::new().await;
    let redirect = format!("http://127.0.0.1:{}/callback", fx.port);
    let exchange = fx
        .token_mock(
            code_grant("ABC123", &redirect),
            200,
            r#"{"access_token":"fresh-access","token_type":"Bearer","expires_in":3600,"refresh_token":"fresh-refresh"}"#,
        )
        .await;

    let authorizer = fx
        .authorizer(credentials(fx.port), FakeBrowser::new("code=ABC123"))
        .with_cancel_signal(|| async { Err(io::Error::other("no signal handler")) });

    let outcome = authorizer.get_access_token().await.unwrap();
    assert_eq!(outcome, TokenOutcome::Authorized("fresh-access".to_string()));
    exchange.assert_async().await;
}
