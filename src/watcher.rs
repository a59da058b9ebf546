use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;
use log::debug;

use crate::error::HardwareError;
use crate::gpio::{Gpio, Level};

/// One electrical transition on an input line, as reported by the GPIO
/// notification thread. Contact bounce arrives here unfiltered.
#[derive(Clone, Copy, Debug)]
pub struct RawEdgeEvent {
    pub pin: u8,
    pub level: Level,
    pub at: Instant,
}

/// Registers an edge callback per input pin and forwards every transition
/// into the controller's event queue. Callbacks run on the GPIO driver's
/// notification thread and never touch controller state directly.
pub struct InputWatcher {
    gpio: Arc<dyn Gpio>,
}

impl InputWatcher {
    pub fn new(gpio: Arc<dyn Gpio>) -> Self {
        Self { gpio }
    }

    pub fn watch(&self, pins: &[u8], events: Sender<RawEdgeEvent>) -> Result<(), HardwareError> {
        for &pin in pins {
            let tx = events.clone();
            self.gpio.register_edge(
                pin,
                Box::new(move |level, at| {
                    // A send error only means the consumer is shutting down.
                    let _ = tx.send(RawEdgeEvent { pin, level, at });
                }),
            )?;
            let level = self.gpio.read_level(pin)?;
            debug!("Watching pin {} (currently {:?})", pin, level);
        }
        Ok(())
    }

    /// Release all callbacks during shutdown.
    pub fn unregister_all(&self) {
        self.gpio.unregister_all();
    }
}
