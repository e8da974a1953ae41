//! Provide Device Control.
//!
pub mod button;
pub mod display;
pub mod indicator;

use rppal::gpio::Gpio;

use crate::module::util::conf::Config;
use crate::BoxError;

/// Device aggregator
///
pub struct Appliance {
    pub gpio: Gpio,
    pub indicators: indicator::IndicatorBank,
    pub screen: display::St7789,
}

/// Device's methods
///
impl Appliance {
    /// Appliance constructor. Leaves every indicator off.
    ///
    pub fn new(conf: &Config) -> Result<Self, BoxError> {
        let gpio = Gpio::new()?;
        let indicators = indicator::IndicatorBank::on_gpio(&gpio, &conf.pin)?;
        let screen = display::St7789::new(&gpio, &conf.pin, &conf.display)?;
        Ok(Self {
            gpio,
            indicators,
            screen,
        })
    }
}
