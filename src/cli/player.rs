use dialoguer::{Confirm, Input};
use tabled::Table;

use crate::{
    Res, config,
    config::CredentialSource,
    error::ApiError,
    info,
    spotify::{auth::Authorizer, client::SpotifyClient, player::PlayerApi},
    success,
    types::{DeviceChoice, RepeatMode, SpotifyUri, TokenOutcome},
    utils, warning,
};

const QUEUE_PAGE: usize = 5;

/// Player commands bound to one access token and an optional target device.
pub struct PlayerSession {
    api: PlayerApi,
    device: Option<String>,
}

impl PlayerSession {
    /// Loads (and if needed refreshes) the stored token. Never opens a browser.
    pub async fn connect(credentials: CredentialSource, device: Option<String>) -> Res<Self> {
        let outcome = Authorizer::from_env(credentials).stored_access_token().await?;
        if let TokenOutcome::Refreshed(_) = outcome {
            tracing::debug!("access token refreshed before player call");
        }

        let client = SpotifyClient::new(config::api_url(), outcome.access_token());
        Ok(Self::new(PlayerApi::new(client), device))
    }

    pub fn new(api: PlayerApi, device: Option<String>) -> Self {
        Self { api, device }
    }

    fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub async fn status(&self, short: bool) -> Res<()> {
        match self.api.playback_state().await? {
            Some(state) if short => println!("{}", utils::status_short(&state)),
            Some(state) => println!(
                "{}",
                utils::status_long(&state, utils::progress_bar_width())
            ),
            None => warning!("No active device found"),
        }
        Ok(())
    }

    async fn print_short_status(&self) -> Res<()> {
        match self.api.playback_state().await? {
            Some(state) => println!("{}", utils::status_short(&state)),
            None => warning!("No active device found"),
        }
        Ok(())
    }

    pub async fn play(&self) -> Res<()> {
        self.api.start_resume(self.device()).await?;
        success!("Playback started{}", utils::device_suffix(self.device()));
        self.print_short_status().await
    }

    pub async fn pause(&self) -> Res<()> {
        self.api.pause(self.device()).await?;
        success!("Playback paused{}", utils::device_suffix(self.device()));
        self.print_short_status().await
    }

    pub async fn next(&self) -> Res<()> {
        self.api.skip_to_next(self.device()).await?;
        success!("Playing next song{}", utils::device_suffix(self.device()));
        Ok(())
    }

    pub async fn previous(&self) -> Res<()> {
        self.api.skip_to_previous(self.device()).await?;
        success!("Playing previous song{}", utils::device_suffix(self.device()));
        Ok(())
    }

    pub async fn volume(&self, percent: u8) -> Res<()> {
        self.api.set_volume(percent, self.device()).await?;
        success!(
            "Setting volume to {}%{}",
            percent,
            utils::device_suffix(self.device())
        );
        Ok(())
    }

    pub async fn seek(&self, position_ms: u64) -> Res<()> {
        self.api.seek(position_ms, self.device()).await?;
        self.print_short_status().await
    }

    pub async fn repeat(&self, mode: RepeatMode) -> Res<()> {
        self.api.set_repeat(mode, self.device()).await?;
        success!("Repeat mode set to: {}", mode);
        Ok(())
    }

    pub async fn devices(&self) -> Res<()> {
        let devices = self.api.available_devices().await?;
        if devices.is_empty() {
            warning!("No devices available");
            return Ok(());
        }
        println!("{}", Table::new(utils::device_rows(&devices)));
        Ok(())
    }

    /// Transfers playback; without an id the user picks from the device list.
    pub async fn transfer(&self, device_id: Option<String>) -> Res<()> {
        let target = match device_id {
            Some(id) => id,
            None => {
                let devices = self.api.available_devices().await?;
                if devices.is_empty() {
                    warning!("No devices available");
                    return Ok(());
                }
                println!("{}", Table::new(utils::device_rows(&devices)));

                let choice: String = Input::new()
                    .with_prompt("Provide device number (n) or pass x to exit")
                    .interact_text()?;
                match utils::choose_device(&devices, &choice) {
                    DeviceChoice::Target(id) => id,
                    DeviceChoice::Untargetable(name) => {
                        warning!("Device '{}' has no id and cannot be targeted", name);
                        return Ok(());
                    }
                    DeviceChoice::Cancelled => {
                        warning!("Aborted!");
                        return Ok(());
                    }
                }
            }
        };

        self.api.transfer_playback(&target).await?;
        success!("Transferring playback to {}", utils::short_id(&target));
        Ok(())
    }

    pub async fn shuffle(&self) -> Res<()> {
        let state = self
            .api
            .playback_state()
            .await?
            .ok_or(ApiError::NoActiveDevice)?;
        let shuffle_state = !state.shuffle_state;
        self.api.set_shuffle(shuffle_state, self.device()).await?;
        success!("Setting shuffle state to {}", shuffle_state);
        Ok(())
    }

    /// Adds `uri` to the queue, or pages through the queue five at a time.
    pub async fn queue(&self, uri: Option<SpotifyUri>) -> Res<()> {
        if let Some(uri) = uri {
            self.api.add_to_queue(&uri, self.device()).await?;
            success!("Added {} to queue", uri);
            return Ok(());
        }

        let Some(queue) = self.api.queue().await? else {
            warning!("No active device found");
            return Ok(());
        };
        let Some(current) = queue.currently_playing else {
            warning!("No active device found");
            return Ok(());
        };

        println!("-> {}", utils::track_line(&current));

        let mut pages = queue.queue.chunks(QUEUE_PAGE).enumerate().peekable();
        while let Some((page, tracks)) = pages.next() {
            for (offset, track) in tracks.iter().enumerate() {
                println!(" ({}) {}", page * QUEUE_PAGE + offset + 1, utils::track_line(track));
            }

            if pages.peek().is_some() {
                let more = Confirm::new()
                    .with_prompt("(more) Do you want to continue?")
                    .default(true)
                    .interact()?;
                if !more {
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn recent(&self, limit: u8) -> Res<()> {
        let tracks = self.api.recently_played(limit).await?;
        if tracks.is_empty() {
            info!("No recently played tracks");
        }
        for track in tracks {
            println!(" \\/ {}", utils::track_line(&track));
        }
        Ok(())
    }
}
