pub mod config;
pub mod controller;
pub mod debounce;
pub mod error;
pub mod file_scanner;
pub mod gpio;
pub mod indicator;
pub mod player;
pub mod watcher;

pub use config::{Config, LoggingConfig, PlayerConfig, SwitchConfig};
pub use controller::{DebouncedActivation, EventLoop, Selection, SelectionController};
pub use debounce::Debouncer;
pub use error::{ConfigError, HardwareError, LaunchError};
pub use gpio::{Gpio, Level};
pub use indicator::IndicatorDriver;
pub use player::{CommandLauncher, PlaybackSupervisor, PlayerHandle, PlayerLauncher};
pub use watcher::{InputWatcher, RawEdgeEvent};
