//! Provides the result indicator LEDs.

use rppal::gpio::Gpio;

use crate::module::vision::Category;
use crate::BoxError;

/// Defines a single on/off output.
pub trait Lamp: Send {
    /// Light the lamp.
    fn on(&mut self);
    /// Darken the lamp.
    fn off(&mut self);
}

/// Represents an LED wired to a GPIO pin (active high).
pub struct Led {
    pin: rppal::gpio::OutputPin,
}

impl Led {
    /// Creates a new Led instance, initially off.
    ///
    /// # Arguments
    ///
    /// * `gpio` - Shared GPIO handle.
    /// * `pin` - GPIO pin number (BCM).
    ///
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self, BoxError> {
        Ok(Self {
            pin: gpio.get(pin)?.into_output_low(),
        })
    }
}

impl Lamp for Led {
    fn on(&mut self) {
        self.pin.set_high();
    }

    fn off(&mut self) {
        self.pin.set_low();
    }
}

/// Indicator colors, one per waste category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Yellow,
    Green,
    Blue,
}

impl Color {
    /// The indicator assigned to a category.
    pub fn of(category: Category) -> Color {
        match category {
            Category::Rubbish => Color::Red,
            Category::Recyclable => Color::Yellow,
            Category::Organics => Color::Green,
            Category::Ecowaste => Color::Blue,
        }
    }

    fn slot(&self) -> usize {
        match self {
            Color::Red => 0,
            Color::Yellow => 1,
            Color::Green => 2,
            Color::Blue => 3,
        }
    }
}

// Round-robin order of the "classifying" animation.
const BLINK_ORDER: [Color; 4] = [Color::Blue, Color::Red, Color::Yellow, Color::Green];

/// The four result indicators.
///
/// Outside the blink sequence at most one lamp is lit.
pub struct IndicatorBank {
    lamps: [Box<dyn Lamp>; 4],
    lit: Option<Color>,
    cursor: usize,
}

impl IndicatorBank {
    /// Creates a bank from its red, yellow, green and blue lamps. All lamps are switched off.
    pub fn new(
        red: Box<dyn Lamp>,
        yellow: Box<dyn Lamp>,
        green: Box<dyn Lamp>,
        blue: Box<dyn Lamp>,
    ) -> Self {
        let mut bank = Self {
            lamps: [red, yellow, green, blue],
            lit: None,
            cursor: 0,
        };
        bank.all_off();
        bank
    }

    /// Creates the bank on the configured GPIO pins.
    pub fn on_gpio(gpio: &Gpio, pin: &crate::module::util::conf::Pin) -> Result<Self, BoxError> {
        Ok(Self::new(
            Box::new(Led::new(gpio, pin.red_led)?),
            Box::new(Led::new(gpio, pin.yellow_led)?),
            Box::new(Led::new(gpio, pin.green_led)?),
            Box::new(Led::new(gpio, pin.blue_led)?),
        ))
    }

    /// Turn off all indicators and restart the blink sequence.
    pub fn all_off(&mut self) {
        self.darken();
        self.cursor = 0;
    }

    /// Light exactly the indicator of `category`.
    pub fn set(&mut self, category: Category) {
        self.all_off();
        let color = Color::of(category);
        log::info!("Activating {:?} indicator for {}.", color, category.name());
        self.light(color);
    }

    /// One step of the blink sequence. Returns the indicator now lit.
    pub fn blink_cycle(&mut self) -> Color {
        self.darken();
        let color = BLINK_ORDER[self.cursor];
        self.cursor = (self.cursor + 1) % BLINK_ORDER.len();
        self.light(color);
        color
    }

    /// The indicator currently lit, if any.
    pub fn lit(&self) -> Option<Color> {
        self.lit
    }

    fn light(&mut self, color: Color) {
        self.lamps[color.slot()].on();
        self.lit = Some(color);
    }

    fn darken(&mut self) {
        for lamp in self.lamps.iter_mut() {
            lamp.off();
        }
        self.lit = None;
    }
}

/// Lamp that only records its level, for exercising the bank without a board.
#[cfg(test)]
pub(crate) mod probe {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    pub struct ProbeLamp {
        level: Arc<AtomicBool>,
    }

    impl ProbeLamp {
        pub fn is_on(&self) -> bool {
            self.level.load(Ordering::SeqCst)
        }
    }

    impl Lamp for ProbeLamp {
        fn on(&mut self) {
            self.level.store(true, Ordering::SeqCst);
        }
        fn off(&mut self) {
            self.level.store(false, Ordering::SeqCst);
        }
    }

    /// A bank plus handles on its red, yellow, green and blue lamps.
    pub fn bank() -> (IndicatorBank, [ProbeLamp; 4]) {
        let lamps: [ProbeLamp; 4] = Default::default();
        let bank = IndicatorBank::new(
            Box::new(lamps[0].clone()),
            Box::new(lamps[1].clone()),
            Box::new(lamps[2].clone()),
            Box::new(lamps[3].clone()),
        );
        (bank, lamps)
    }

    /// Colors of the lamps that are physically on.
    pub fn lit(lamps: &[ProbeLamp; 4]) -> Vec<Color> {
        [Color::Red, Color::Yellow, Color::Green, Color::Blue]
            .into_iter()
            .filter(|c| lamps[c.slot()].is_on())
            .collect()
    }
}
