//! Emergency lights out. Drives every indicator pin low.

use rppal::gpio::Gpio;
use wastecam::module::device::indicator::IndicatorBank;
use wastecam::module::util::init::resource::init;
use wastecam::BoxError;

fn main() {
    if let Err(e) = lights_off() {
        eprintln!("Can't switch the indicators off: {}", e);
        std::process::exit(1);
    }
}

fn lights_off() -> Result<(), BoxError> {
    let property = init()?;
    let gpio = Gpio::new()?;
    let mut indicators = IndicatorBank::on_gpio(&gpio, &property.conf.pin)?;
    indicators.all_off();
    Ok(())
}
