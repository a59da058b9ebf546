use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use vidlooper::config::{parse_pin_spec, Config, LoggingConfig};
use vidlooper::controller::{EventLoop, SelectionController};
use vidlooper::debounce::Debouncer;
use vidlooper::error::HardwareError;
use vidlooper::gpio::Gpio;
use vidlooper::indicator::IndicatorDriver;
use vidlooper::player::{CommandLauncher, PlaybackSupervisor};
use vidlooper::watcher::InputWatcher;

/// Raspberry Pi video player controlled by GPIO pins.
///
/// Powers a looping video display where the active video is changed by
/// pressing a button (shorting a GPIO pin). The active video can optionally
/// be indicated by an LED, one output pin per input pin; switches with
/// built-in LEDs work well. Playback uses omxplayer, the hardware-accelerated
/// video player for the Raspberry Pi, which must be installed separately.
#[derive(Parser)]
#[command(name = "vidlooper")]
struct Args {
    /// Config file path
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Directory containing video files
    #[arg(long)]
    video_dir: Option<PathBuf>,

    /// Video paths, paired with the GPIO input pins in order
    videos: Vec<PathBuf>,

    /// GPIO pins: comma-separated INPUT:OUTPUT pairs, or bare INPUT pins
    /// with no indicator output
    #[arg(long)]
    gpio_pins: Option<String>,

    /// Output audio over "hdmi", "local" (headphone jack) or "both"
    #[arg(long, value_parser = ["hdmi", "local", "both"])]
    audio: Option<String>,

    /// Don't start playing a video on startup
    #[arg(long)]
    no_autostart: bool,

    /// Don't loop the active video
    #[arg(long)]
    no_loop: bool,

    /// Restart the current video when the button for the active video is
    /// pressed again, instead of ignoring the press
    #[arg(long)]
    restart_on_press: bool,

    /// Don't show the player's on-screen display when changing videos
    #[arg(long)]
    no_osd: bool,

    /// Debounce window in milliseconds
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// How long to wait for a graceful player exit before killing it
    #[arg(long)]
    stop_timeout_ms: Option<u64>,

    /// GPIO pin that triggers a system shutdown
    #[arg(long)]
    shutdown_pin: Option<u8>,

    /// Countdown before start, in seconds
    #[arg(long, default_value_t = 0)]
    countdown: u64,

    /// Debug mode: keep player output on the terminal and log verbosely
    #[arg(long)]
    debug: bool,
}

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_signal(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

fn install_signal_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, on_signal as libc::sighandler_t);
        libc::signal(libc::SIGTERM, on_signal as libc::sighandler_t);
    }
}

#[cfg(feature = "hardware")]
fn open_gpio() -> Result<Arc<dyn Gpio>, HardwareError> {
    let gpio: Arc<dyn Gpio> = Arc::new(vidlooper::gpio::RpiGpio::new()?);
    Ok(gpio)
}

#[cfg(not(feature = "hardware"))]
fn open_gpio() -> Result<Arc<dyn Gpio>, HardwareError> {
    Err(HardwareError::new(
        "GPIO support is not compiled in",
        "rebuild with the 'hardware' feature",
    ))
}

/// The logger needs the config and loading the config wants a logger; read
/// just the logging section quietly, falling back to defaults.
fn load_config_for_logging(path: &Path) -> LoggingConfig {
    if let Ok(config_str) = fs::read_to_string(path) {
        if let Ok(config) = toml::from_str::<Config>(&config_str) {
            return config.logging;
        }
    }
    LoggingConfig::default()
}

fn init_logging(config: &LoggingConfig, debug: bool) -> anyhow::Result<()> {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .chain(fern::log_file(&config.file).context("failed to open log file")?)
        .apply()
        .context("failed to install logger")?;
    Ok(())
}

fn trim_log(config: &LoggingConfig) {
    let log_path = PathBuf::from(&config.file);
    if let Ok(content) = fs::read_to_string(&log_path) {
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() > config.max_lines {
            let start = lines.len() - config.max_lines;
            let trimmed = lines[start..].join("\n");
            if fs::write(&log_path, trimmed + "\n").is_ok() {
                info!("Trimmed log file to {} lines", config.max_lines);
            } else {
                warn!("Failed to trim log file");
            }
        }
    }
}

fn apply_args(config: &mut Config, args: &Args) -> anyhow::Result<()> {
    if let Some(dir) = &args.video_dir {
        config.video.directory = dir.to_string_lossy().to_string();
    }
    if !args.videos.is_empty() {
        config.video.files = args.videos.clone();
    }
    if let Some(spec) = &args.gpio_pins {
        config.switches = parse_pin_spec(spec)?;
    }
    if let Some(audio) = &args.audio {
        config.player.audio = audio.clone();
    }
    if args.no_autostart {
        config.player.autostart = false;
    }
    if args.no_loop {
        config.player.loop_video = false;
    }
    if args.restart_on_press {
        config.player.restart_on_press = true;
    }
    if args.no_osd {
        config.player.no_osd = true;
    }
    if let Some(ms) = args.debounce_ms {
        config.input.debounce_ms = ms;
    }
    if let Some(ms) = args.stop_timeout_ms {
        config.player.stop_timeout_ms = ms;
    }
    if args.shutdown_pin.is_some() {
        config.input.shutdown_pin = args.shutdown_pin;
    }
    Ok(())
}

fn countdown(seconds: u64) {
    let mut remaining = seconds;
    while remaining > 0 {
        print!(
            "\rvidlooper starting in {} seconds (Ctrl-C to abort)...",
            remaining
        );
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_secs(1));
        remaining -= 1;
    }
    if seconds > 0 {
        println!();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let logging_config = load_config_for_logging(&args.config);
    init_logging(&logging_config, args.debug)?;
    trim_log(&logging_config);

    info!("Starting vidlooper");

    let mut config = Config::load(&args.config).context("loading configuration")?;
    apply_args(&mut config, &args)?;

    let selections = config.selections().context("building selection table")?;
    for selection in &selections {
        info!(
            "Switch {}: input pin {}, indicator {}, video {}",
            selection.index,
            selection.input_pin,
            selection
                .indicator_pin
                .map_or("none".to_string(), |p| p.to_string()),
            selection.video.display()
        );
    }

    countdown(args.countdown);
    install_signal_handlers();

    let gpio = open_gpio().context("opening GPIO")?;
    let indicators = IndicatorDriver::new(gpio.clone(), &selections);
    indicators
        .initialize()
        .context("initializing indicator outputs")?;

    let launcher = CommandLauncher::new(&config.player, args.debug);
    let supervisor = PlaybackSupervisor::new(Box::new(launcher), config.stop_timeout());
    let controller = Arc::new(SelectionController::new(
        selections,
        supervisor,
        indicators,
        config.player.restart_on_press,
    ));

    let (tx, rx) = crossbeam_channel::unbounded();
    let watcher = InputWatcher::new(gpio.clone());
    let mut pins = controller.input_pins();
    if let Some(pin) = config.input.shutdown_pin {
        pins.push(pin);
    }
    watcher
        .watch(&pins, tx)
        .context("registering GPIO edge callbacks")?;

    if config.player.autostart {
        controller.autostart();
    }

    let debouncer = Debouncer::new(config.debounce_window());
    EventLoop::new(controller, debouncer, config.input.shutdown_pin).run(rx, &SHUTDOWN);

    watcher.unregister_all();
    info!("Clean shutdown");
    Ok(())
}
