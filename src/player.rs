//! External player process supervision.
//!
//! Playback itself is delegated to a hardware-accelerated player binary
//! (omxplayer by default). This module owns the one process at a time and
//! nothing else; the controller decides when transitions happen.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::config::PlayerConfig;
use crate::error::LaunchError;

/// How often `stop()` re-checks liveness while waiting for a graceful exit.
const STOP_POLL: Duration = Duration::from_millis(20);

/// Narrow capability handle over a running player process.
pub trait PlayerHandle: Send {
    fn is_alive(&mut self) -> bool;
    /// Request a graceful exit.
    fn terminate(&mut self);
    /// Force-kill and reap.
    fn kill(&mut self);
}

pub trait PlayerLauncher: Send {
    fn launch(&self, video: &Path) -> Result<Box<dyn PlayerHandle>, LaunchError>;
}

/// A spawned player process. The child runs in its own process group so the
/// whole player tree can be signalled at once.
struct ChildHandle {
    child: std::process::Child,
}

impl ChildHandle {
    fn signal_group(&self, signal: libc::c_int) {
        unsafe {
            libc::killpg(self.child.id() as libc::pid_t, signal);
        }
    }
}

impl PlayerHandle for ChildHandle {
    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn terminate(&mut self) {
        // SIGINT works best with omxplayer.
        self.signal_group(libc::SIGINT);
    }

    fn kill(&mut self) {
        self.signal_group(libc::SIGKILL);
        let _ = self.child.wait();
    }
}

/// Builds the player command line from configuration and spawns it.
pub struct CommandLauncher {
    program: String,
    audio: String,
    loop_video: bool,
    no_osd: bool,
    debug: bool,
}

impl CommandLauncher {
    pub fn new(config: &PlayerConfig, debug: bool) -> Self {
        Self {
            program: config.command.clone(),
            audio: config.audio.clone(),
            loop_video: config.loop_video,
            no_osd: config.no_osd,
            debug,
        }
    }
}

impl PlayerLauncher for CommandLauncher {
    fn launch(&self, video: &Path) -> Result<Box<dyn PlayerHandle>, LaunchError> {
        if !video.is_file() {
            return Err(LaunchError::UnreadableVideo(video.to_path_buf()));
        }

        let mut cmd = Command::new(&self.program);
        cmd.arg("-b").arg("-o").arg(&self.audio);
        if self.loop_video {
            cmd.arg("--loop");
        }
        if self.no_osd {
            cmd.arg("--no-osd");
        }
        cmd.arg(video);
        // Discard player output to keep the screen clear unless debugging.
        if !self.debug {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.program.clone(),
            source,
        })?;
        info!("Started player pid {} for {}", child.id(), video.display());
        Ok(Box::new(ChildHandle { child }))
    }
}

/// Owns the single external player process. At most one process is alive at
/// any time; the controller serializes `start`/`stop` through its lock.
pub struct PlaybackSupervisor {
    launcher: Box<dyn PlayerLauncher>,
    handle: Option<Box<dyn PlayerHandle>>,
    stop_timeout: Duration,
}

impl PlaybackSupervisor {
    pub fn new(launcher: Box<dyn PlayerLauncher>, stop_timeout: Duration) -> Self {
        Self {
            launcher,
            handle: None,
            stop_timeout,
        }
    }

    /// Spawn the player for `video`. The previous process must already have
    /// been stopped; the controller enforces that under its lock.
    pub fn start(&mut self, video: &Path) -> Result<(), LaunchError> {
        debug_assert!(self.handle.is_none(), "start while a player is running");
        self.handle = Some(self.launcher.launch(video)?);
        Ok(())
    }

    /// Stop the current process, if any: graceful signal, bounded wait, then
    /// force-kill and reap. Safe to call when nothing is running.
    pub fn stop(&mut self) {
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        if !handle.is_alive() {
            return;
        }
        handle.terminate();
        let deadline = Instant::now() + self.stop_timeout;
        while handle.is_alive() {
            if Instant::now() >= deadline {
                warn!(
                    "Player did not exit within {}ms, killing it",
                    self.stop_timeout.as_millis()
                );
                handle.kill();
                break;
            }
            std::thread::sleep(STOP_POLL);
        }
    }

    /// True while the player process is running. A process that exited on
    /// its own is dropped here, so a stale handle is never reused.
    pub fn is_alive(&mut self) -> bool {
        match self.handle.as_mut() {
            Some(handle) => {
                if handle.is_alive() {
                    true
                } else {
                    self.handle = None;
                    false
                }
            }
            None => false,
        }
    }
}
