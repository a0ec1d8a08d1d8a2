//! # API Module
//!
//! HTTP handlers served by the loopback listener during authorization.
//!
//! - [`callback`] - Captures the `code` (or `error`) query parameter of the
//!   provider's redirect and tells the browser to close the tab.
//!
//! The handler is mounted as the router fallback by [`crate::server`], so
//! whatever path the redirect URI names is accepted.

mod callback;

pub use callback::{CLOSE_WINDOW_BODY, CallbackParams, CallbackSlot, callback};
