//! Provides the two control buttons.

use rppal::gpio::{Gpio, InputPin, Trigger};
use std::sync::mpsc::Sender;
use std::time::{Duration, Instant};

use crate::module::util::conf::Pin;
use crate::module::workflow::Event;
use crate::BoxError;

/// Physical control buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Toggles the live preview.
    Start,
    /// Takes a picture and classifies it.
    Capture,
}

/// Drops edges that follow an accepted one within the window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether an edge seen at `now` is a new press.
    pub fn accept(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Keeps the interrupt-armed input pins alive.
///
/// Each press is forwarded to the workflow as an [`Event::Pressed`]. Dropping this
/// struct disarms the interrupts.
pub struct Buttons {
    _start: InputPin,
    _capture: InputPin,
}

impl Buttons {
    /// Arms both buttons (pull-up, falling edge).
    pub fn listen(gpio: &Gpio, pin: &Pin, tx: Sender<Event>) -> Result<Self, BoxError> {
        let debounce = Duration::from_millis(pin.debounce_ms);
        Ok(Self {
            _start: watch(gpio, pin.start_button, Button::Start, debounce, tx.clone())?,
            _capture: watch(gpio, pin.capture_button, Button::Capture, debounce, tx)?,
        })
    }
}

fn watch(
    gpio: &Gpio,
    pin: u8,
    button: Button,
    debounce: Duration,
    tx: Sender<Event>,
) -> Result<InputPin, BoxError> {
    let mut input = gpio.get(pin)?.into_input_pullup();
    let mut debouncer = Debouncer::new(debounce);
    input.set_async_interrupt(Trigger::FallingEdge, move |_level| {
        let now = Instant::now();
        if !debouncer.accept(now) {
            return;
        }
        log::debug!("{:?} button pressed on GPIO {}", button, pin);
        if tx.send(Event::Pressed { button, at: now }).is_err() {
            log::warn!("{:?} button pressed after the workflow stopped", button);
        }
    })?;
    log::info!("{:?} button armed on GPIO {}", button, pin);
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_drops_bounces() {
        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(debouncer.accept(t0));
        assert!(!debouncer.accept(t0 + Duration::from_millis(10)));
        assert!(!debouncer.accept(t0 + Duration::from_millis(49)));
        assert!(debouncer.accept(t0 + Duration::from_millis(50)));
        assert!(!debouncer.accept(t0 + Duration::from_millis(60)));
    }

    #[test]
    fn zero_window_accepts_everything() {
        let mut debouncer = Debouncer::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(debouncer.accept(t0));
        assert!(debouncer.accept(t0));
    }
}
