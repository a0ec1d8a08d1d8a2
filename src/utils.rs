use crate::types::{Device, DeviceChoice, DeviceTableRow, PlaybackState, Track};

const BAR_FILL: char = '█';
const BAR_EMPTY: char = '-';

/// First five characters of a device id.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(5) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Formats milliseconds as `MM:SS`; minutes are not wrapped into hours.
pub fn format_time(time_ms: u64) -> String {
    let seconds = time_ms / 1000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Parses a seek target given as `HH:MM:SS` or `MM:SS` into milliseconds.
pub fn parse_seek_position(value: &str) -> Result<u64, String> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    let numbers = parts
        .iter()
        .map(|p| p.parse::<u64>())
        .collect::<Result<Vec<u64>, _>>()
        .map_err(|_| format!("'{value}' is not a time in HH:MM:SS or MM:SS format"))?;

    let (hours, minutes, seconds) = match numbers.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return Err(format!("'{value}' is not a time in HH:MM:SS or MM:SS format")),
    };

    if hours > 23 || minutes > 59 || seconds > 59 {
        return Err(format!("'{value}' is out of range"));
    }

    Ok((hours * 3600 + minutes * 60 + seconds) * 1000)
}

/// Bar width derived from the terminal: a tenth of the columns, between 10 and 30.
pub fn progress_bar_width() -> usize {
    let columns = console::Term::stdout()
        .size_checked()
        .map(|(_, cols)| cols as usize)
        .unwrap_or(80);
    (columns / 10).clamp(10, 30)
}

/// `[████------] 01:02 / 03:04`, with `width` counting the brackets.
pub fn progress_bar(duration_ms: u64, progress_ms: u64, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let ratio = if duration_ms > 0 {
        (progress_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (inner as f64 * ratio) as usize;

    let bar: String = std::iter::repeat_n(BAR_FILL, filled)
        .chain(std::iter::repeat_n(BAR_EMPTY, inner - filled))
        .collect();

    format!(
        "[{}] {} / {}",
        bar,
        format_time(progress_ms),
        format_time(duration_ms)
    )
}

/// `Artist A x Artist B - Track`.
pub fn track_line(track: &Track) -> String {
    let artists = track
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(" x ");
    if artists.is_empty() {
        track.name.clone()
    } else {
        format!("{} - {}", artists, track.name)
    }
}

fn play_icon(is_playing: bool) -> &'static str {
    if is_playing { "▶️" } else { "⏸" }
}

fn repeat_icon(repeat_state: &str) -> &'static str {
    match repeat_state {
        "track" => "🔂",
        "context" => "🔁",
        _ => "🟦",
    }
}

fn volume_label(device: &Device) -> String {
    device
        .volume_percent
        .map(|v| format!("{v}%"))
        .unwrap_or_else(|| "n/a".to_string())
}

/// One-line status: `▶️  'Artist - Song' @ Device[abcde] vol: 50%`.
pub fn status_short(state: &PlaybackState) -> String {
    let song = state
        .item
        .as_ref()
        .map(track_line)
        .unwrap_or_else(|| "Nothing playing".to_string());
    format!(
        "{}  '{}' @ {}[{}] vol: {}",
        play_icon(state.is_playing),
        song,
        state.device.name,
        state.device.short_id(),
        volume_label(&state.device)
    )
}

/// Multi-line status with shuffle, repeat and a progress bar.
pub fn status_long(state: &PlaybackState, bar_width: usize) -> String {
    let (song, duration_ms) = match &state.item {
        Some(track) => (track_line(track), track.duration_ms),
        None => ("Nothing playing".to_string(), 0),
    };
    let shuffle = if state.shuffle_state { "🔀" } else { "🟦" };
    let bar = progress_bar(duration_ms, state.progress_ms.unwrap_or(0), bar_width);

    format!(
        "\ndevice: {}[{}]\n{}\n{} {} {}  {} vol: {}\n",
        state.device.name,
        state.device.short_id(),
        song,
        shuffle,
        repeat_icon(&state.repeat_state),
        play_icon(state.is_playing),
        bar,
        volume_label(&state.device)
    )
}

/// Table rows for the device list, numbered from 1.
pub fn device_rows(devices: &[Device]) -> Vec<DeviceTableRow> {
    devices
        .iter()
        .enumerate()
        .map(|(idx, device)| DeviceTableRow {
            number: idx + 1,
            active: if device.is_active { "🟢" } else { "🔴" }.to_string(),
            id: device.id.clone().unwrap_or_default(),
            private: if device.is_private_session { "🙈" } else { "🐵" }.to_string(),
            restricted: if device.is_restricted { "🔐" } else { "🔓" }.to_string(),
            name: device.name.clone(),
            kind: device.kind.clone(),
        })
        .collect()
}

/// `" on device [abcde]"` when a device was targeted, empty otherwise.
pub fn device_suffix(device_id: Option<&str>) -> String {
    device_id
        .map(|id| format!(" on device [{}]", short_id(id)))
        .unwrap_or_default()
}

/// Maps the 1-based number typed at the transfer prompt to a device.
///
/// Anything that is not a listed number (such as `x`) cancels.
pub fn choose_device(devices: &[Device], input: &str) -> DeviceChoice {
    let picked = input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| devices.get(idx));

    match picked {
        Some(device) => match &device.id {
            Some(id) => DeviceChoice::Target(id.clone()),
            None => DeviceChoice::Untargetable(device.name.clone()),
        },
        None => DeviceChoice::Cancelled,
    }
}
