//! # Spotify Integration Module
//!
//! The integration layer between spotli and Spotify's services: the OAuth
//! token lifecycle and the Web API calls behind the player commands.
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer (auth, player)
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (authorization-code grant, refresh)
//!     ├── Web API client (bearer auth, status mapping)
//!     └── Player endpoints (me/player/*)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//! ```
//!
//! ## Core Modules
//!
//! ### Authentication Module
//!
//! [`auth`] - Token lifecycle:
//! - **Token Exchanger**: code exchange and refresh with HTTP Basic client
//!   authentication
//! - **Authorizer**: classifies the stored token as missing, expired or valid
//!   and runs the matching step
//! - **Browser Integration**: launches the authorize URL, falling back to
//!   printing it
//!
//! ### Client Module
//!
//! [`client`] - Generic request helper. `200` decodes JSON, `201`/`202`/`204`
//! are empty successes, anything else becomes a typed
//! [`crate::error::ApiError`].
//!
//! ### Player Module
//!
//! [`player`] - Playback state, devices, transfer, play/pause, skip, seek,
//! repeat, volume, shuffle, queue and recently played.
//!
//! ## Token Management
//!
//! Tokens are refreshed only once `expires_at` has passed; a refresh that the
//! provider rejects leaves the token file as it was. Nothing is retried
//! automatically.

pub mod auth;
pub mod client;
pub mod player;
