use std::{collections::HashMap, sync::Arc};

use axum::{Extension, extract::Query, http::StatusCode, response::Html};
use tokio::sync::{Mutex, oneshot};

/// Query parameters of the redirect the provider sends the browser to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

impl From<HashMap<String, String>> for CallbackParams {
    fn from(mut params: HashMap<String, String>) -> Self {
        CallbackParams {
            code: params.remove("code").filter(|c| !c.is_empty()),
            error: params.remove("error"),
        }
    }
}

/// Sender half handed to the one request the listener serves.
pub type CallbackSlot = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

pub const CLOSE_WINDOW_BODY: &str = "<script>window.close()</script>";

/// Captures the query of the first request on any path.
///
/// Whatever the request carries, the browser gets `200` and a script that
/// closes the tab; deciding whether a code arrived is left to the caller.
/// Requests racing in after the first one find the slot empty.
pub async fn callback(
    Query(params): Query<HashMap<String, String>>,
    Extension(slot): Extension<CallbackSlot>,
) -> (StatusCode, Html<&'static str>) {
    let Some(sender) = slot.lock().await.take() else {
        return (StatusCode::GONE, Html("<h4>Authorization already handled.</h4>"));
    };

    let params = CallbackParams::from(params);
    tracing::debug!(
        has_code = params.code.is_some(),
        error = ?params.error,
        "authorization callback received"
    );
    let _ = sender.send(params);

    (StatusCode::OK, Html(CLOSE_WINDOW_BODY))
}
