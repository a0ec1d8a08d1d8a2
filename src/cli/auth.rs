use std::time::Duration;

use crate::{
    Res, config::CredentialSource, info, spotify::auth::Authorizer, success, types::TokenOutcome,
};

/// Runs the token lifecycle once and reports which path was taken.
pub async fn auth(credentials: CredentialSource, timeout: Option<Duration>) -> Res<()> {
    let authorizer = Authorizer::from_env(credentials).with_callback_timeout(timeout);

    info!("Checking for stored token...");
    match authorizer.get_access_token().await? {
        TokenOutcome::Cached(_) => success!("Token is still valid, nothing to do."),
        TokenOutcome::Refreshed(_) => success!("Token refreshed."),
        TokenOutcome::Authorized(_) => success!(
            "Access token created at: {}",
            authorizer.token_path().display()
        ),
    }

    Ok(())
}
