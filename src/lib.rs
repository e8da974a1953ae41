//! Wastecam, a camera appliance that sorts waste into four bins.

pub mod module; // Import the module submodule that contains other modules

/// Error type shared by fallible hardware and workflow operations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;
