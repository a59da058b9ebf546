//! GPIO collaborator boundary.
//!
//! The controller only ever needs three operations from the hardware:
//! edge notifications on input lines, reading a line, and driving an
//! output line. Everything electrical (pull-ups, polarity, pin claiming)
//! lives behind this trait, so the rest of the crate runs unchanged
//! against a fake in tests.

use std::time::Instant;

use crate::error::HardwareError;

/// Logical line level. For inputs `High` means the switch is actuated
/// (electrical polarity is resolved by the backend); for outputs `High`
/// lights the indicator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

/// Invoked on the driver's notification thread for every electrical
/// transition. May fire many times per physical press; downstream
/// consumers are expected to debounce.
pub type EdgeCallback = Box<dyn FnMut(Level, Instant) + Send>;

pub trait Gpio: Send + Sync {
    /// Attach `callback` to every edge on `pin`. Same-pin callbacks fire in
    /// transition order; there is no ordering guarantee across pins.
    fn register_edge(&self, pin: u8, callback: EdgeCallback) -> Result<(), HardwareError>;

    /// Release every callback registered through this instance.
    fn unregister_all(&self);

    fn read_level(&self, pin: u8) -> Result<Level, HardwareError>;

    fn set_output(&self, pin: u8, level: Level) -> Result<(), HardwareError>;
}

#[cfg(feature = "hardware")]
mod rpi {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Instant;

    use rppal::gpio::{InputPin, OutputPin, Trigger};

    use super::{EdgeCallback, Gpio, Level};
    use crate::error::HardwareError;

    const ACCESS_HINT: &str =
        "run as root, or add your user to the 'gpio' group and re-login";

    fn access_error(message: &str, source: rppal::gpio::Error) -> HardwareError {
        HardwareError::new(format!("{}: {}", message, source), ACCESS_HINT)
    }

    /// Raspberry Pi GPIO backend. Switches are wired between the pin and
    /// ground against the internal pull-up, so a falling edge means the
    /// switch closed and is reported as `Level::High`.
    pub struct RpiGpio {
        chip: rppal::gpio::Gpio,
        inputs: Mutex<HashMap<u8, InputPin>>,
        outputs: Mutex<HashMap<u8, OutputPin>>,
    }

    impl RpiGpio {
        pub fn new() -> Result<Self, HardwareError> {
            let chip = rppal::gpio::Gpio::new()
                .map_err(|e| access_error("failed to open GPIO peripheral", e))?;
            Ok(Self {
                chip,
                inputs: Mutex::new(HashMap::new()),
                outputs: Mutex::new(HashMap::new()),
            })
        }

        fn claim_input(&self, pin: u8) -> Result<InputPin, HardwareError> {
            Ok(self
                .chip
                .get(pin)
                .map_err(|e| access_error(&format!("failed to claim GPIO pin {}", pin), e))?
                .into_input_pullup())
        }
    }

    impl Gpio for RpiGpio {
        fn register_edge(&self, pin: u8, mut callback: EdgeCallback) -> Result<(), HardwareError> {
            let mut input = self.claim_input(pin)?;
            input
                .set_async_interrupt(Trigger::Both, None, move |event| {
                    let level = match event.trigger {
                        Trigger::FallingEdge => Level::High,
                        _ => Level::Low,
                    };
                    callback(level, Instant::now());
                })
                .map_err(|e| {
                    access_error(&format!("failed to watch GPIO pin {}", pin), e)
                })?;
            self.inputs.lock().unwrap().insert(pin, input);
            Ok(())
        }

        fn unregister_all(&self) {
            let mut inputs = self.inputs.lock().unwrap();
            for input in inputs.values_mut() {
                let _ = input.clear_async_interrupt();
            }
            // Dropping the pins resets them to their pre-claim state.
            inputs.clear();
            self.outputs.lock().unwrap().clear();
        }

        fn read_level(&self, pin: u8) -> Result<Level, HardwareError> {
            let mut inputs = self.inputs.lock().unwrap();
            if !inputs.contains_key(&pin) {
                let input = self.claim_input(pin)?;
                inputs.insert(pin, input);
            }
            let input = inputs.get(&pin).unwrap();
            Ok(if input.is_low() { Level::High } else { Level::Low })
        }

        fn set_output(&self, pin: u8, level: Level) -> Result<(), HardwareError> {
            let mut outputs = self.outputs.lock().unwrap();
            if !outputs.contains_key(&pin) {
                let output = self
                    .chip
                    .get(pin)
                    .map_err(|e| {
                        access_error(&format!("failed to claim GPIO pin {}", pin), e)
                    })?
                    .into_output_low();
                outputs.insert(pin, output);
            }
            let output = outputs.get_mut(&pin).unwrap();
            match level {
                Level::High => output.set_high(),
                Level::Low => output.set_low(),
            }
            Ok(())
        }
    }
}

#[cfg(feature = "hardware")]
pub use rpi::RpiGpio;
