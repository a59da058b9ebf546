use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::controller::Selection;
use crate::error::ConfigError;
use crate::file_scanner::scan_video_files;

/// Default input:indicator pin map, used when no switches are configured.
const DEFAULT_PINS: [(u8, Option<u8>); 4] =
    [(26, Some(21)), (19, Some(20)), (13, Some(16)), (6, Some(12))];

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub player: PlayerConfig,
    pub input: InputConfig,
    pub video: VideoConfig,
    pub logging: LoggingConfig,
    #[serde(rename = "switch")]
    pub switches: Vec<SwitchConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: String,
    /// Audio output: "hdmi", "local" or "both".
    pub audio: String,
    #[serde(rename = "loop")]
    pub loop_video: bool,
    pub no_osd: bool,
    pub autostart: bool,
    pub restart_on_press: bool,
    pub stop_timeout_ms: u64,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: "omxplayer".to_string(),
            audio: "hdmi".to_string(),
            loop_video: true,
            no_osd: false,
            autostart: true,
            restart_on_press: false,
            stop_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub debounce_ms: u64,
    pub shutdown_pin: Option<u8>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            shutdown_pin: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoConfig {
    pub directory: String,
    /// Explicit video files; when non-empty the directory is not scanned.
    pub files: Vec<PathBuf>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            directory: "./videos".to_string(),
            files: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: String,
    pub max_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "vidlooper.log".to_string(),
            max_lines: 10000,
        }
    }
}

/// One configured switch. `video` is optional; switches without one are
/// paired with scanned videos in order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwitchConfig {
    pub input_pin: u8,
    #[serde(default)]
    pub indicator_pin: Option<u8>,
    #[serde(default)]
    pub video: Option<PathBuf>,
}

impl Config {
    /// Load from a TOML file. A missing file falls back to defaults; a
    /// present but broken file is a fatal configuration error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| ConfigError::Unparseable {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.input.debounce_ms)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.player.stop_timeout_ms)
    }

    /// Build the ordered selection table: switches (or the default pin map)
    /// paired with their videos. Every resolved path is canonicalized and
    /// checked to exist. Pins without a video are left unused; videos
    /// without a pin are an error.
    pub fn selections(&self) -> Result<Vec<Selection>, ConfigError> {
        let switches: Vec<SwitchConfig> = if self.switches.is_empty() {
            DEFAULT_PINS
                .iter()
                .map(|&(input_pin, indicator_pin)| SwitchConfig {
                    input_pin,
                    indicator_pin,
                    video: None,
                })
                .collect()
        } else {
            self.switches.clone()
        };

        for (i, switch) in switches.iter().enumerate() {
            if switches[..i].iter().any(|s| s.input_pin == switch.input_pin) {
                return Err(ConfigError::DuplicateInputPin(switch.input_pin));
            }
        }

        // Videos for switches that don't name their own file.
        let unassigned = switches.iter().filter(|s| s.video.is_none()).count();
        let mut scanned = Vec::new();
        if unassigned > 0 {
            scanned = if !self.video.files.is_empty() {
                self.video.files.clone()
            } else {
                let dir = PathBuf::from(&self.video.directory);
                scan_video_files(&dir).map_err(|detail| ConfigError::VideoDirUnreadable {
                    dir: dir.clone(),
                    detail,
                })?
            };
            if scanned.len() > unassigned {
                return Err(ConfigError::NotEnoughPins {
                    pins: unassigned,
                    videos: scanned.len(),
                });
            }
        }

        let mut pool = scanned.into_iter();
        let mut selections = Vec::new();
        for switch in &switches {
            let video = match &switch.video {
                Some(video) => video.clone(),
                None => match pool.next() {
                    Some(video) => video,
                    None => continue, // more pins than videos; pin stays unused
                },
            };
            let video = dunce::canonicalize(&video)
                .map_err(|_| ConfigError::VideoNotFound(video.clone()))?;
            selections.push(Selection {
                index: selections.len(),
                input_pin: switch.input_pin,
                indicator_pin: switch.indicator_pin,
                video,
            });
        }

        if selections.is_empty() {
            return Err(ConfigError::NoVideos(PathBuf::from(&self.video.directory)));
        }

        Ok(selections)
    }
}

/// Parse a GPIO pin spec string: comma-separated `INPUT:OUTPUT` pairs, or
/// bare `INPUT` pins with no indicator. E.g. `"26:21,19:20,13,6"`.
pub fn parse_pin_spec(spec: &str) -> Result<Vec<SwitchConfig>, ConfigError> {
    let mut switches: Vec<SwitchConfig> = Vec::new();
    for pair in spec.split(',') {
        let mut parts = pair.split(':');
        let input = parts.next().unwrap_or("");
        let input_pin: u8 = input
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidPinSpec(spec.to_string()))?;
        let indicator_pin = match parts.next() {
            Some(output) => Some(
                output
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidPinSpec(spec.to_string()))?,
            ),
            None => None,
        };
        if parts.next().is_some() {
            return Err(ConfigError::InvalidPinSpec(spec.to_string()));
        }
        if switches.iter().any(|s| s.input_pin == input_pin) {
            return Err(ConfigError::DuplicateInputPin(input_pin));
        }
        switches.push(SwitchConfig {
            input_pin,
            indicator_pin,
            video: None,
        });
    }
    Ok(switches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin_spec_pairs() {
        let switches = parse_pin_spec("26:21,19:20,13:16,6:12").unwrap();
        assert_eq!(switches.len(), 4);
        assert_eq!(switches[0].input_pin, 26);
        assert_eq!(switches[0].indicator_pin, Some(21));
        assert_eq!(switches[3].input_pin, 6);
        assert_eq!(switches[3].indicator_pin, Some(12));
    }

    #[test]
    fn test_parse_pin_spec_bare_inputs() {
        let switches = parse_pin_spec("26,19").unwrap();
        assert_eq!(switches[0].indicator_pin, None);
        assert_eq!(switches[1].indicator_pin, None);
    }

    #[test]
    fn test_parse_pin_spec_rejects_garbage() {
        assert!(matches!(
            parse_pin_spec("26:x"),
            Err(ConfigError::InvalidPinSpec(_))
        ));
        assert!(matches!(
            parse_pin_spec("abc"),
            Err(ConfigError::InvalidPinSpec(_))
        ));
        assert!(matches!(
            parse_pin_spec("26:21:5"),
            Err(ConfigError::InvalidPinSpec(_))
        ));
    }

    #[test]
    fn test_parse_pin_spec_rejects_duplicates() {
        assert!(matches!(
            parse_pin_spec("26:21,26:20"),
            Err(ConfigError::DuplicateInputPin(26))
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.player.command, "omxplayer");
        assert_eq!(config.player.audio, "hdmi");
        assert!(config.player.loop_video);
        assert!(config.player.autostart);
        assert_eq!(config.input.debounce_ms, 200);
        assert_eq!(config.player.stop_timeout_ms, 500);
    }

    #[test]
    fn test_config_round_trip() {
        let mut config = Config::default();
        config.switches.push(SwitchConfig {
            input_pin: 26,
            indicator_pin: Some(21),
            video: Some(PathBuf::from("a.mp4")),
        });
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.switches.len(), 1);
        assert_eq!(parsed.switches[0].input_pin, 26);
        assert_eq!(parsed.player.stop_timeout_ms, config.player.stop_timeout_ms);
    }
}
