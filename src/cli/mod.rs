//! # CLI Module
//!
//! User-facing command implementations for spotli. Each command resolves an
//! access token through [`crate::spotify::auth::Authorizer`], calls the Web
//! API and prints the result with the crate's output macros.
//!
//! ## Command Categories
//!
//! ### Authentication
//!
//! - [`auth`] - Runs the OAuth authorization-code flow, or refreshes / reuses
//!   the stored token
//!
//! ### Player
//!
//! - [`PlayerSession`] - status, play/pause, next/previous, seek, volume,
//!   repeat, shuffle, device listing and transfer, queue and recently played
//!
//! Player commands never start the browser flow on their own; without a
//! stored token they ask the user to run `spotli auth` first.
//!
//! ## Usage Patterns
//!
//! ```bash
//! spotli auth                          # Authorize once
//! spotli player                        # Show the current status
//! spotli player volume 40              # Set volume
//! spotli player queue spotify:track:4uLU6hMCjMI75M1A2tKUQC
//! ```

mod auth;
mod player;

pub use auth::auth;
pub use player::PlayerSession;
