//! Config Handler.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provides TOML config file handling.
pub mod toml {

    use super::DEFAULT_CONFIG;
    use crate::module::define;
    use crate::BoxError;
    use std::fs::File;
    use std::io::prelude::*;
    use std::path::Path;

    /// Loads a configuration file from the given directory.
    /// If not found, generates a default config file.
    ///
    /// # Arguments
    ///
    /// * `dir` - The directory where the configuration file is located or should be created.
    ///
    pub fn load(dir: &str) -> Result<super::Config, BoxError> {
        // Check if the config file exists
        let path = Path::new(dir).join(define::path::CONF_FILE);

        if !path.is_file() {
            // Write the commented default so operators see every knob.
            let mut file = File::create(&path)?;
            file.write_all(DEFAULT_CONFIG.as_bytes())?;
            log::info!("Default config written to {}", path.display());
        }

        // Load the config
        let conf_str: String = std::fs::read_to_string(&path)?;
        let conf: super::Config = toml::from_str(&conf_str)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        Ok(conf)
    }

    /// The built-in configuration.
    pub fn defaults() -> Result<super::Config, ::toml::de::Error> {
        toml::from_str(DEFAULT_CONFIG)
    }
}

/// Represents the configuration data structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub system: System,
    pub pin: Pin,
    pub display: Display,
    pub camera: Camera,
    pub timing: Timing,
    pub message: Message,
    pub classifier: Classifier,
}

/// Represents system-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct System {
    pub log_level: String,
    pub image_prefix: String,
}

/// Represents pin-related configuration parameters (BCM numbering).
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Pin {
    pub start_button: u8,
    pub capture_button: u8,
    pub debounce_ms: u64,
    pub red_led: u8,
    pub yellow_led: u8,
    pub green_led: u8,
    pub blue_led: u8,
    pub lcd_dc: u8,
    pub lcd_rst: u8,
    pub lcd_backlight: u8,
}

/// Represents display-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Display {
    pub width: u32,
    pub height: u32,
    pub spi_bus: u8,
    pub spi_slave: u8,
    pub spi_clock_hz: u32,
    pub madctl: u8,
    pub invert: bool,
    pub x_offset: u16,
    pub y_offset: u16,
}

/// Represents camera-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Camera {
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub format: String,
    pub frame_interval_ms: u64,
}

/// Represents timing-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Timing {
    pub poll_interval_ms: u64,
    pub blink_interval_ms: u64,
    pub task_join_timeout_ms: u64,
    pub classify_timeout_ms: u64,
    pub instruction_dwell_ms: u64,
    pub captured_dwell_ms: u64,
    pub result_dwell_ms: u64,
    pub error_dwell_ms: u64,
}

impl Timing {
    pub fn poll_interval(&self) -> Duration {
        // A zero poll would spin the background tasks.
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
    pub fn blink_interval(&self) -> Duration {
        Duration::from_millis(self.blink_interval_ms)
    }
    pub fn task_join_timeout(&self) -> Duration {
        Duration::from_millis(self.task_join_timeout_ms)
    }
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }
    pub fn instruction_dwell(&self) -> Duration {
        Duration::from_millis(self.instruction_dwell_ms)
    }
    pub fn captured_dwell(&self) -> Duration {
        Duration::from_millis(self.captured_dwell_ms)
    }
    pub fn result_dwell(&self) -> Duration {
        Duration::from_millis(self.result_dwell_ms)
    }
    pub fn error_dwell(&self) -> Duration {
        Duration::from_millis(self.error_dwell_ms)
    }
}

/// Represents message layout configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Message {
    pub font_ladder: Vec<String>,
    pub max_lines: usize,
}

/// Represents classifier-related configuration parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Classifier {
    pub kind: String,
    pub delay_ms: u64,
    pub endpoint: String,
    pub model: String,
    pub input_size: u32,
}

// Default configuration data in TOML format
const DEFAULT_CONFIG: &str = r#"
[system]
  log_level = 'INFO' # Log level ('DEBUG', 'INFO', 'WARN', 'ERROR')
  image_prefix = 'image' # File name prefix of captured images

[pin]
  start_button = 16 # Start / stop button (to GND)
  capture_button = 26 # Capture button (to GND)
  debounce_ms = 50 # Button debounce window
  red_led = 22 # Rubbish
  yellow_led = 27 # Recyclable
  green_led = 17 # Organics
  blue_led = 6 # Ecowaste
  lcd_dc = 25 # LCD data / command
  lcd_rst = 24 # LCD reset
  lcd_backlight = 23 # LCD backlight

[display]
  width = 320 # Panel width
  height = 240 # Panel height
  spi_bus = 0 # SPI bus (0 for /dev/spidev0.x)
  spi_slave = 0 # Chip select (0 for CE0)
  spi_clock_hz = 40000000 # SPI clock
  madctl = 112 # Memory access control (0x70, landscape)
  invert = true # Most ST7789 modules need inverted colors
  x_offset = 0 # Column offset of the visible area
  y_offset = 0 # Row offset of the visible area

[camera]
  device = '/dev/video0' # V4L2 device
  width = 320 # Frame width
  height = 240 # Frame height
  format = 'MJPG' # Pixel format ('MJPG', 'RGB3')
  frame_interval_ms = 50 # Preview frame period

[timing]
  poll_interval_ms = 20 # Background tasks re-check the run state at this period
  blink_interval_ms = 300 # Indicator blink step while classifying
  task_join_timeout_ms = 1000 # Warn when a stopping task takes longer than this
  classify_timeout_ms = 15000 # Give up on the classifier after this
  instruction_dwell_ms = 3000 # Start-up instruction message
  captured_dwell_ms = 1000 # "captured" message
  result_dwell_ms = 5000 # Result message
  error_dwell_ms = 3000 # Error messages

[message]
  font_ladder = ['10x20', '8x13', '6x10'] # Largest first
  max_lines = 6 # Drop to a smaller font above this

[classifier]
  kind = 'random' # 'random' (stub), 'http', 'onnx'
  delay_ms = 3000 # Simulated processing time of the stub
  endpoint = 'http://127.0.0.1:8000/classify' # For 'http'
  model = 'asset/model/waste_classifier.onnx' # For 'onnx'
  input_size = 224 # Model input edge for 'onnx'
"#;

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;
    use std::path::Path;

    #[test]
    fn run_load() {
        let dir = "/tmp/wastecamtest/conf_load/";
        let _ = fs::remove_dir_all(dir);
        fs::create_dir_all(Path::new(dir)).unwrap();
        let res = toml::load(dir).unwrap();
        assert_eq!(res.system.log_level, "INFO");
        assert_eq!(res.pin.start_button, 16);
        assert_eq!(res.pin.capture_button, 26);
        assert_eq!(res.display.width, 320);
        assert_eq!(res.message.font_ladder.len(), 3);
        assert!(Path::new(dir).join("conf.toml").is_file());
    }

    #[test]
    fn edited_file_overrides_defaults() {
        let dir = "/tmp/wastecamtest/conf_edit/";
        fs::create_dir_all(Path::new(dir)).unwrap();
        let edited = DEFAULT_CONFIG
            .replace("kind = 'random'", "kind = 'http'")
            .replace("classify_timeout_ms = 15000", "classify_timeout_ms = 500");
        fs::write(Path::new(dir).join("conf.toml"), edited).unwrap();
        let res = toml::load(dir).unwrap();
        assert_eq!(res.classifier.kind, "http");
        assert_eq!(res.timing.classify_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = "/tmp/wastecamtest/conf_broken/";
        fs::create_dir_all(Path::new(dir)).unwrap();
        fs::write(Path::new(dir).join("conf.toml"), "[system\nlog_level = 1").unwrap();
        assert!(toml::load(dir).is_err());
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let mut conf = toml::defaults().unwrap();
        conf.timing.poll_interval_ms = 0;
        assert_eq!(conf.timing.poll_interval(), Duration::from_millis(1));
    }
}
