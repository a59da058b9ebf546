use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup configuration problems. Fatal: the selection table cannot be
/// built, so the program exits non-zero before touching any hardware.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid GPIO pin spec '{0}': expected comma-separated INPUT or INPUT:OUTPUT pairs")]
    InvalidPinSpec(String),

    #[error("duplicate GPIO input pin: {0}")]
    DuplicateInputPin(u8),

    #[error("video \"{0}\" not found")]
    VideoNotFound(PathBuf),

    #[error("no videos found in \"{0}\"; specify a different directory or filename(s)")]
    NoVideos(PathBuf),

    #[error("cannot read video directory \"{dir}\": {detail}")]
    VideoDirUnreadable { dir: PathBuf, detail: String },

    #[error("not enough GPIO input pins configured: {pins} pins for {videos} videos")]
    NotEnoughPins { pins: usize, videos: usize },

    #[error("failed to read config file \"{path}\": {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file \"{path}\": {source}")]
    Unparseable {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// The GPIO peripheral could not be opened or configured. Fatal at startup;
/// the hint tells the user how to fix their setup.
#[derive(Debug, Error)]
#[error("{message} ({hint})")]
pub struct HardwareError {
    pub message: String,
    pub hint: String,
}

impl HardwareError {
    pub fn new(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            hint: hint.into(),
        }
    }
}

/// The player process failed to start for one video. Recoverable: the
/// controller logs it, clears the active selection and keeps serving
/// switch presses.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("player '{program}' could not be spawned: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("video file \"{0}\" is not readable")]
    UnreadableVideo(PathBuf),
}
