//! Provides the LCD panel.

use image::{imageops, imageops::FilterType, RgbImage};
use rppal::gpio::{Gpio, OutputPin};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};
use std::{thread, time};

use crate::module::util::conf;
use crate::BoxError;

/// Something that shows one full-screen image at a time.
pub trait RenderSurface: Send {
    /// Panel resolution (width, height).
    fn size(&self) -> (u32, u32);
    /// Draw `image`, returning once it is on the panel.
    fn display(&mut self, image: &RgbImage) -> Result<(), BoxError>;
    /// Blank the panel.
    fn clear(&mut self) -> Result<(), BoxError>;
}

// ST7789 commands
const SWRESET: u8 = 0x01;
const SLPOUT: u8 = 0x11;
const NORON: u8 = 0x13;
const INVON: u8 = 0x21;
const INVOFF: u8 = 0x20;
const DISPON: u8 = 0x29;
const CASET: u8 = 0x2A;
const RASET: u8 = 0x2B;
const RAMWR: u8 = 0x2C;
const MADCTL: u8 = 0x36;
const COLMOD: u8 = 0x3A;

// spidev refuses longer transfers with its default buffer size.
const SPI_CHUNK: usize = 4096;

/// ST7789 panel on SPI with data/command, reset and backlight lines.
pub struct St7789 {
    spi: Spi,
    dc: OutputPin,
    rst: OutputPin,
    backlight: OutputPin,
    width: u32,
    height: u32,
    x_offset: u16,
    y_offset: u16,
}

impl St7789 {
    /// Opens the panel, runs the init sequence and switches the backlight on.
    pub fn new(gpio: &Gpio, pin: &conf::Pin, display: &conf::Display) -> Result<Self, BoxError> {
        let bus = match display.spi_bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            n => return Err(format!("Unsupported SPI bus {}", n).into()),
        };
        let slave = match display.spi_slave {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            n => return Err(format!("Unsupported SPI chip select {}", n).into()),
        };
        let spi = Spi::new(bus, slave, display.spi_clock_hz, Mode::Mode0)?;
        let mut lcd = Self {
            spi,
            dc: gpio.get(pin.lcd_dc)?.into_output(),
            rst: gpio.get(pin.lcd_rst)?.into_output_high(),
            backlight: gpio.get(pin.lcd_backlight)?.into_output_low(),
            width: display.width,
            height: display.height,
            x_offset: display.x_offset,
            y_offset: display.y_offset,
        };
        lcd.init(display.madctl, display.invert)?;
        lcd.clear()?;
        lcd.backlight.set_high();
        log::info!("ST7789 {}x{} ready", lcd.width, lcd.height);
        Ok(lcd)
    }

    fn init(&mut self, madctl: u8, invert: bool) -> Result<(), BoxError> {
        // Hardware reset
        self.rst.set_low();
        thread::sleep(time::Duration::from_millis(10));
        self.rst.set_high();
        thread::sleep(time::Duration::from_millis(120));

        self.command(SWRESET, &[])?;
        thread::sleep(time::Duration::from_millis(150));
        self.command(SLPOUT, &[])?;
        thread::sleep(time::Duration::from_millis(120));
        self.command(COLMOD, &[0x55])?; // 16 bit per pixel
        self.command(MADCTL, &[madctl])?;
        self.command(if invert { INVON } else { INVOFF }, &[])?;
        self.command(NORON, &[])?;
        self.command(DISPON, &[])?;
        thread::sleep(time::Duration::from_millis(20));
        Ok(())
    }

    fn command(&mut self, cmd: u8, data: &[u8]) -> Result<(), BoxError> {
        self.dc.set_low();
        self.spi.write(&[cmd])?;
        if !data.is_empty() {
            self.data(data)?;
        }
        Ok(())
    }

    fn data(&mut self, data: &[u8]) -> Result<(), BoxError> {
        self.dc.set_high();
        for chunk in data.chunks(SPI_CHUNK) {
            self.spi.write(chunk)?;
        }
        Ok(())
    }

    fn write_frame(&mut self, rgb565: &[u8]) -> Result<(), BoxError> {
        let x0 = self.x_offset;
        let y0 = self.y_offset;
        let x1 = x0 + self.width as u16 - 1;
        let y1 = y0 + self.height as u16 - 1;
        self.command(CASET, &window(x0, x1))?;
        self.command(RASET, &window(y0, y1))?;
        self.command(RAMWR, &[])?;
        self.data(rgb565)
    }
}

impl RenderSurface for St7789 {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn display(&mut self, image: &RgbImage) -> Result<(), BoxError> {
        if image.dimensions() == (self.width, self.height) {
            let buf = to_rgb565(image);
            self.write_frame(&buf)
        } else {
            let fitted = imageops::resize(image, self.width, self.height, FilterType::Nearest);
            let buf = to_rgb565(&fitted);
            self.write_frame(&buf)
        }
    }

    fn clear(&mut self) -> Result<(), BoxError> {
        let black = vec![0u8; (self.width * self.height * 2) as usize];
        self.write_frame(&black)
    }
}

impl Drop for St7789 {
    fn drop(&mut self) {
        self.backlight.set_low();
    }
}

fn window(start: u16, end: u16) -> [u8; 4] {
    let [s_hi, s_lo] = start.to_be_bytes();
    let [e_hi, e_lo] = end.to_be_bytes();
    [s_hi, s_lo, e_hi, e_lo]
}

/// Packs RGB888 pixels into big-endian RGB565.
pub fn to_rgb565(image: &RgbImage) -> Vec<u8> {
    let mut buf = Vec::with_capacity((image.width() * image.height() * 2) as usize);
    for p in image.pixels() {
        let [r, g, b] = p.0;
        let v: u16 = ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3);
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn rgb565_packing() {
        let mut img = RgbImage::new(4, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        img.put_pixel(2, 0, Rgb([0, 0, 255]));
        img.put_pixel(3, 0, Rgb([255, 255, 255]));
        assert_eq!(
            to_rgb565(&img),
            vec![0xF8, 0x00, 0x07, 0xE0, 0x00, 0x1F, 0xFF, 0xFF]
        );
    }

    #[test]
    fn window_is_big_endian() {
        assert_eq!(window(0, 319), [0x00, 0x00, 0x01, 0x3F]);
    }
}
