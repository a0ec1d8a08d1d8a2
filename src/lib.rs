//! Spotify Playback CLI Library
//!
//! This library provides everything the `spotli` binary needs to control a
//! Spotify session from the terminal: the OAuth2 authorization-code flow with
//! a loopback callback listener, a local token cache with automatic refresh,
//! a small Web API client for the `me/player` endpoints, and the formatting
//! used by the command-line layer.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the local callback listener
//! - `cli` - Command-line interface implementations
//! - `config` - Environment loading, endpoints and credential resolution
//! - `error` - Error kinds for authorization and Web API calls
//! - `management` - On-disk token store
//! - `server` - Single-request loopback listener for OAuth callbacks
//! - `spotify` - Token exchange, authorization orchestration and player API
//! - `types` - Data structures and type definitions
//! - `utils` - Formatting and parsing helpers
//!
//! # Example
//!
//! ```
//! use spotli::{config, spotify::auth::Authorizer};
//!
//! #[tokio::main]
//! async fn main() -> spotli::Res<()> {
//!     config::load_env().await?;
//!     let authorizer = Authorizer::from_env(config::CredentialSource::default());
//!     let token = authorizer.get_access_token().await?;
//!     println!("{}", token.access_token());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Used by the command-line layer, which only needs to print errors. Library
/// components return the concrete kinds from [`error`] so callers can tell
/// them apart.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```
/// info!("Open this URL in your browser to authorize the app:");
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Token refreshed");
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only the binary uses this, after an error has already been reported in
/// the chosen verbosity.
///
/// # Example
///
/// ```
/// error!("Missing required user credentials");
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// # Example
///
/// ```
/// warning!("Failed to open browser");
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
