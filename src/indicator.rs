use std::sync::Arc;

use log::warn;

use crate::controller::Selection;
use crate::error::HardwareError;
use crate::gpio::{Gpio, Level};

/// Drives the per-selection indicator outputs. At most one indicator is lit
/// at any time; selections without a configured indicator pin are skipped.
pub struct IndicatorDriver {
    gpio: Arc<dyn Gpio>,
    pins: Vec<(usize, u8)>,
}

impl IndicatorDriver {
    pub fn new(gpio: Arc<dyn Gpio>, selections: &[Selection]) -> Self {
        let pins = selections
            .iter()
            .filter_map(|s| s.indicator_pin.map(|pin| (s.index, pin)))
            .collect();
        Self { gpio, pins }
    }

    /// Claim every indicator pin and switch it off. Called once at startup
    /// so a broken output line fails the whole program instead of silently
    /// lying later.
    pub fn initialize(&self) -> Result<(), HardwareError> {
        for &(_, pin) in &self.pins {
            self.gpio.set_output(pin, Level::Low)?;
        }
        Ok(())
    }

    /// Light the indicator for `active` and clear every other one; `None`
    /// clears all. Idempotent: re-asserting the current state just rewrites
    /// the lines with the levels they already carry.
    pub fn set_active(&self, active: Option<usize>) {
        for &(index, pin) in &self.pins {
            let level = if Some(index) == active {
                Level::High
            } else {
                Level::Low
            };
            if let Err(e) = self.gpio.set_output(pin, level) {
                warn!("Failed to set indicator on pin {}: {}", pin, e);
            }
        }
    }
}
