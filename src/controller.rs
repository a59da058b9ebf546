//! The switch-to-playback state machine.
//!
//! Every playback transition (switch press, autostart, crash recovery,
//! shutdown) goes through the one mutex in [`SelectionController`], so at
//! most one player process is ever alive and it always matches the active
//! selection index.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use log::{debug, error, info, warn};

use crate::debounce::Debouncer;
use crate::gpio::Level;
use crate::indicator::IndicatorDriver;
use crate::player::PlaybackSupervisor;
use crate::watcher::RawEdgeEvent;

/// How long the event loop waits for an edge before checking on the player.
/// Bounds the latency of noticing a player that died on its own.
const LIVENESS_INTERVAL: Duration = Duration::from_millis(500);

/// One configured switch/video pairing. Immutable after configuration load.
#[derive(Clone, Debug)]
pub struct Selection {
    pub index: usize,
    pub input_pin: u8,
    pub indicator_pin: Option<u8>,
    pub video: PathBuf,
}

/// A debounced "this switch was pressed" event.
#[derive(Clone, Copy, Debug)]
pub struct DebouncedActivation {
    pub pin: u8,
    pub at: Instant,
}

/// Everything a playback transition mutates, behind the one lock: the
/// active index and the process handle only ever change together.
struct PlaybackState {
    active: Option<usize>,
    supervisor: PlaybackSupervisor,
    indicators: IndicatorDriver,
}

pub struct SelectionController {
    selections: Vec<Selection>,
    by_pin: HashMap<u8, usize>,
    state: Mutex<PlaybackState>,
    restart_on_press: bool,
}

impl SelectionController {
    pub fn new(
        selections: Vec<Selection>,
        supervisor: PlaybackSupervisor,
        indicators: IndicatorDriver,
        restart_on_press: bool,
    ) -> Self {
        let by_pin = selections.iter().map(|s| (s.input_pin, s.index)).collect();
        Self {
            selections,
            by_pin,
            state: Mutex::new(PlaybackState {
                active: None,
                supervisor,
                indicators,
            }),
            restart_on_press,
        }
    }

    pub fn selections(&self) -> &[Selection] {
        &self.selections
    }

    pub fn input_pins(&self) -> Vec<u8> {
        self.selections.iter().map(|s| s.input_pin).collect()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.state.lock().unwrap().active
    }

    /// Start playing the first selection without waiting for a switch press.
    pub fn autostart(&self) {
        if let Some(first) = self.selections.first() {
            info!("Autostarting {}", first.video.display());
            self.activate_index(first.index);
        }
    }

    /// Handle one debounced press. Unconfigured pins are ignored.
    pub fn on_activation(&self, activation: DebouncedActivation) {
        let Some(&index) = self.by_pin.get(&activation.pin) else {
            debug!("Ignoring activation on unconfigured pin {}", activation.pin);
            return;
        };
        self.activate_index(index);
    }

    fn activate_index(&self, index: usize) {
        let selection = &self.selections[index];
        let mut state = self.state.lock().unwrap();
        if state.active == Some(index) && state.supervisor.is_alive() && !self.restart_on_press {
            // Re-pressing the active switch must not restart the video.
            debug!("Selection {} already active, ignoring", index);
            return;
        }
        Self::transition(&mut state, selection);
    }

    /// Stop-old, start-new, update index, update indicator: one atomic unit
    /// from the perspective of any other activation.
    fn transition(state: &mut PlaybackState, selection: &Selection) {
        state.supervisor.stop();
        match state.supervisor.start(&selection.video) {
            Ok(()) => {
                state.active = Some(selection.index);
                state.indicators.set_active(Some(selection.index));
                info!(
                    "Now playing {} (switch {})",
                    selection.video.display(),
                    selection.index
                );
            }
            Err(e) => {
                error!(
                    "Failed to start player for {}: {}",
                    selection.video.display(),
                    e
                );
                state.active = None;
                state.indicators.set_active(None);
            }
        }
    }

    /// Liveness tick: notice a player that exited on its own (crash, end of
    /// stream, external kill) and clear state so the indicators reflect
    /// truth and the next activation starts clean.
    pub fn check_player(&self) {
        let mut state = self.state.lock().unwrap();
        if state.active.is_some() && !state.supervisor.is_alive() {
            let index = state.active.take().unwrap();
            state.indicators.set_active(None);
            warn!("Player for selection {} exited on its own", index);
        }
    }

    /// Stop playback and clear the indicators.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.supervisor.stop();
        state.active = None;
        state.indicators.set_active(None);
    }
}

/// Single consumer of the edge-event queue: debounces, dispatches
/// activations, and runs the liveness tick while idle. GPIO callbacks only
/// ever enqueue, so nothing re-enters the controller's critical section.
pub struct EventLoop {
    controller: Arc<SelectionController>,
    debouncer: Debouncer,
    shutdown_pin: Option<u8>,
}

impl EventLoop {
    pub fn new(
        controller: Arc<SelectionController>,
        debouncer: Debouncer,
        shutdown_pin: Option<u8>,
    ) -> Self {
        Self {
            controller,
            debouncer,
            shutdown_pin,
        }
    }

    /// Drain events until `shutdown` is set or every sender is gone, then
    /// stop playback.
    pub fn run(mut self, events: Receiver<RawEdgeEvent>, shutdown: &AtomicBool) {
        loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("Shutdown requested");
                break;
            }
            match events.recv_timeout(LIVENESS_INTERVAL) {
                Ok(event) => self.handle_edge(event),
                Err(RecvTimeoutError::Timeout) => self.controller.check_player(),
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        self.controller.shutdown();
    }

    fn handle_edge(&mut self, event: RawEdgeEvent) {
        if event.level != Level::High {
            // Only presses activate; releases are just the other edge.
            return;
        }
        if !self.debouncer.filter(event.pin, event.at) {
            return;
        }
        if self.shutdown_pin == Some(event.pin) {
            info!("Shutdown switch pressed, powering off");
            if let Err(e) = Command::new("shutdown").args(["-h", "now"]).spawn() {
                error!("Failed to run shutdown: {}", e);
            }
            return;
        }
        self.controller.on_activation(DebouncedActivation {
            pin: event.pin,
            at: event.at,
        });
    }
}
