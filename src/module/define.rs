//! Module for Constants and Paths Definitions
//!
//! This module defines various constants and paths used throughout the application.

/// System Constants
pub mod system {
    /// Name of the system
    pub const NAME: &str = "wastecam";
}

/// File Paths
pub mod path {

    // Persistent Data Directory
    pub const PERSISTENT_DIR: &str = "/data/";

    // Ephemeral Data Directory
    pub const EPHEMERAL_DIR: &str = "/run/user/1000/";

    // Captured Image Directory
    pub const IMG_DIR: &str = "img";

    // Log Directory
    pub const LOG_DIR: &str = "log";

    // Configuration File
    pub const CONF_FILE: &str = "conf.toml";

    // Captured Image Extension
    pub const IMG_EXT: &str = "jpg";
}

/// Texts shown on the display.
pub mod message {
    pub const STARTING: &str =
        "Camera Starting! Take a picture of your waste with the capture button";

    pub const CAPTURED: &str = "Image captured, classifying waste...";

    /// `{}` is replaced with the category name.
    pub const RESULT: &str = "Classification complete! {}. Press start to classify another item";

    pub const CLASSIFY_FAILED: &str = "Classification failed. Press start to try again";

    pub const UNKNOWN_CATEGORY: &str = "Unknown waste type. Press start to try again";

    pub const CAPTURE_FAILED: &str = "Capture failed. Press start to try again";

    pub const CAMERA_FAILED: &str = "Camera error. Check the connection and press start";
}
