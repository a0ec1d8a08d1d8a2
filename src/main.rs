use std::time::Duration;

use clap::{
    Args, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use spotli::{
    Res,
    cli::{self, PlayerSession},
    config::{self, CredentialSource},
    error,
    error::AuthError,
    types::{RepeatMode, SpotifyUri},
    utils, warning,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Display the full error chain and debug logs
    #[clap(long, global = true)]
    debug: bool,

    #[clap(flatten)]
    credentials: CredentialArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Overrides SPOTLI_CLIENT_ID
    #[clap(long, global = true)]
    client_id: Option<String>,

    /// Overrides SPOTLI_CLIENT_SECRET
    #[clap(long, global = true)]
    client_secret: Option<String>,

    /// Overrides SPOTLI_REDIRECT_URI
    #[clap(long, global = true)]
    redirect_uri: Option<String>,
}

impl From<CredentialArgs> for CredentialSource {
    fn from(args: CredentialArgs) -> Self {
        CredentialSource::new(args.client_id, args.client_secret, args.redirect_uri)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with the Spotify API and store the access token
    Auth(AuthOptions),

    /// Manage the Spotify player (shows the status by default)
    Player(PlayerOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct AuthOptions {
    /// Give up waiting for the browser callback after this many seconds
    #[clap(long)]
    timeout: Option<u64>,
}

#[derive(Parser, Debug, Clone)]
pub struct PlayerOptions {
    /// Target this device id instead of the active one
    #[clap(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Option<PlayerCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlayerCommand {
    /// Display the status of the active device
    Status {
        /// Display the status in short form
        #[clap(long)]
        short: bool,
    },

    /// Start or resume playback
    Play,

    /// Pause playback
    Pause,

    /// Skip to the next track in the queue
    Next,

    /// Skip to the previous track
    Previous,

    /// Change the volume of the active device
    Volume {
        #[clap(value_parser = clap::value_parser!(u8).range(0..=100))]
        value: u8,
    },

    /// Seek to a position in the current track (HH:MM:SS or MM:SS)
    Seek {
        #[clap(value_parser = utils::parse_seek_position)]
        position: u64,
    },

    /// Set the repeat mode
    Repeat {
        #[clap(value_enum, ignore_case = true)]
        mode: RepeatMode,
    },

    /// List available Spotify Connect devices
    Devices,

    /// Transfer playback to another device; prompts when no id is given
    Transfer { device_id: Option<String> },

    /// Toggle shuffle
    Shuffle,

    /// Show the queue, or add a track or episode URI to it
    Queue { uri: Option<SpotifyUri> },

    /// Show recently played tracks
    Recent {
        #[clap(long, default_value_t = 10, value_parser = clap::value_parser!(u8).range(1..=50))]
        limit: u8,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

fn init_tracing(debug: bool) {
    let default = if debug { "spotli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_player(opt: PlayerOptions, credentials: CredentialSource) -> Res<()> {
    let session = PlayerSession::connect(credentials, opt.device).await?;

    match opt.command.unwrap_or(PlayerCommand::Status { short: false }) {
        PlayerCommand::Status { short } => session.status(short).await,
        PlayerCommand::Play => session.play().await,
        PlayerCommand::Pause => session.pause().await,
        PlayerCommand::Next => session.next().await,
        PlayerCommand::Previous => session.previous().await,
        PlayerCommand::Volume { value } => session.volume(value).await,
        PlayerCommand::Seek { position } => session.seek(position).await,
        PlayerCommand::Repeat { mode } => session.repeat(mode).await,
        PlayerCommand::Devices => session.devices().await,
        PlayerCommand::Transfer { device_id } => session.transfer(device_id).await,
        PlayerCommand::Shuffle => session.shuffle().await,
        PlayerCommand::Queue { uri } => session.queue(uri).await,
        PlayerCommand::Recent { limit } => session.recent(limit).await,
    }
}

fn report(err: Box<dyn std::error::Error + Send + Sync>, debug: bool) -> ! {
    if let Some(AuthError::Interrupted) = err.downcast_ref::<AuthError>() {
        warning!("Aborted!");
        std::process::exit(1);
    }

    if debug {
        eprintln!("{:?}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            eprintln!("  caused by: {}", cause);
            source = cause.source();
        }
    }

    error!("{}", err)
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();
    init_tracing(cli.debug);

    let credentials = CredentialSource::from(cli.credentials);
    let result = match cli.command {
        Command::Auth(opt) => cli::auth(credentials, opt.timeout.map(Duration::from_secs)).await,
        Command::Player(opt) => run_player(opt, credentials).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        report(e, cli.debug);
    }
}
