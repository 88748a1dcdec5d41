//! Remote-control keys accepted by the `/key` endpoint.

use std::fmt;
use std::str::FromStr;

use crate::protocol_constants::KEY_SENDER;

/// A SoundTouch remote-control key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Play,
    Pause,
    PlayPause,
    Stop,
    PrevTrack,
    NextTrack,
    ThumbsUp,
    ThumbsDown,
    Bookmark,
    Power,
    Mute,
    VolumeUp,
    VolumeDown,
    Preset1,
    Preset2,
    Preset3,
    Preset4,
    Preset5,
    Preset6,
    AuxInput,
    ShuffleOff,
    ShuffleOn,
    RepeatOff,
    RepeatOne,
    RepeatAll,
    AddFavorite,
    RemoveFavorite,
}

impl Key {
    /// All keys, in the order the device documentation lists them.
    pub const ALL: [Key; 27] = [
        Key::Play,
        Key::Pause,
        Key::PlayPause,
        Key::Stop,
        Key::PrevTrack,
        Key::NextTrack,
        Key::ThumbsUp,
        Key::ThumbsDown,
        Key::Bookmark,
        Key::Power,
        Key::Mute,
        Key::VolumeUp,
        Key::VolumeDown,
        Key::Preset1,
        Key::Preset2,
        Key::Preset3,
        Key::Preset4,
        Key::Preset5,
        Key::Preset6,
        Key::AuxInput,
        Key::ShuffleOff,
        Key::ShuffleOn,
        Key::RepeatOff,
        Key::RepeatOne,
        Key::RepeatAll,
        Key::AddFavorite,
        Key::RemoveFavorite,
    ];

    /// Returns the wire name of the key.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::PlayPause => "PLAY_PAUSE",
            Self::Stop => "STOP",
            Self::PrevTrack => "PREV_TRACK",
            Self::NextTrack => "NEXT_TRACK",
            Self::ThumbsUp => "THUMBS_UP",
            Self::ThumbsDown => "THUMBS_DOWN",
            Self::Bookmark => "BOOKMARK",
            Self::Power => "POWER",
            Self::Mute => "MUTE",
            Self::VolumeUp => "VOLUME_UP",
            Self::VolumeDown => "VOLUME_DOWN",
            Self::Preset1 => "PRESET_1",
            Self::Preset2 => "PRESET_2",
            Self::Preset3 => "PRESET_3",
            Self::Preset4 => "PRESET_4",
            Self::Preset5 => "PRESET_5",
            Self::Preset6 => "PRESET_6",
            Self::AuxInput => "AUX_INPUT",
            Self::ShuffleOff => "SHUFFLE_OFF",
            Self::ShuffleOn => "SHUFFLE_ON",
            Self::RepeatOff => "REPEAT_OFF",
            Self::RepeatOne => "REPEAT_ONE",
            Self::RepeatAll => "REPEAT_ALL",
            Self::AddFavorite => "ADD_FAVORITE",
            Self::RemoveFavorite => "REMOVE_FAVORITE",
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a key name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown key: {0}")]
pub struct UnknownKey(pub String);

impl FromStr for Key {
    type Err = UnknownKey;

    /// Accepts wire names case-insensitively, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Key::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownKey(s.to_string()))
    }
}

/// Press or release phase of a key command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Press,
    Release,
}

impl KeyState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Press => "press",
            Self::Release => "release",
        }
    }
}

/// Builds the body of a `POST /key` request.
pub fn key_body(key: Key, state: KeyState) -> String {
    format!(
        r#"<key state="{}" sender="{}">{}</key>"#,
        state.as_str(),
        KEY_SENDER,
        key.as_str()
    )
}
