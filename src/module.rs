//! This module contains all the sub-modules of the project.

pub mod define; // Definition module: Contains definitions and constants used throughout the project.
pub mod device; // Device module: Manages hardware devices and interactions.
pub mod message; // Message module: Lays out text messages for the display.
pub mod util; // Utility module: Provides various utility functions and helpers.
pub mod vision; // Vision module: Handles the camera and waste classification.
pub mod workflow; // Workflow module: Runs the capture / classify / indicate state machine.
