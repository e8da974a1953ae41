//! Wastecam, a camera appliance that tells which bin a piece of waste belongs in.

use std::str::FromStr;
use std::sync::mpsc;

use log::LevelFilter;
use wastecam::module::define;
use wastecam::module::device::{button::Buttons, Appliance};
use wastecam::module::util::init::{resource::init, WastecamProperty};
use wastecam::module::util::signal;
use wastecam::module::vision::{camera::V4l2Camera, classifier};
use wastecam::module::workflow::{Devices, Workflow};
use wastecam::BoxError;

// The main function of Wastecam
pub fn main() {
    // Prepare the resources by initializing the property struct
    let property = match init() {
        Ok(property) => property,
        Err(e) => {
            eprintln!("Can't prepare {}: {}", define::system::NAME, e);
            std::process::exit(1);
        }
    };

    let level = LevelFilter::from_str(&property.conf.system.log_level).unwrap_or(LevelFilter::Info);
    if let Err(e) = init_log(property.path.dir.data.as_str(), define::system::NAME, level) {
        eprintln!("Can't start logging: {}", e);
        std::process::exit(1);
    }
    log::info!("Starting Wastecam...");

    if let Err(e) = run(property) {
        log::error!("Initialization error: {}", e);
        eprintln!("Initialization error: {}", e);
        std::process::exit(1);
    }
    log::info!("Wastecam stopped");
}

/// Wire the hardware to the workflow and block until shutdown.
fn run(property: WastecamProperty) -> Result<(), BoxError> {
    let conf = &property.conf;
    let Appliance {
        gpio,
        indicators,
        screen,
    } = Appliance::new(conf)?;

    let (tx, rx) = mpsc::channel();
    // Interrupts stay registered as long as the pins live.
    let _buttons = Buttons::listen(&gpio, &conf.pin, tx.clone())?;
    let _signal = signal::watch(tx.clone())?;

    let devices = Devices {
        camera: Box::new(V4l2Camera::new(&conf.camera.device)),
        screen: Box::new(screen),
        indicators,
        classifier: classifier::build(&conf.classifier)?,
    };
    let workflow = Workflow::new(&property, devices, tx)?;
    workflow.run(rx);
    Ok(())
}

/// This function initializes the logger system using the log4rs crate.
///
/// # Arguments
/// * `dir` - A string slice that holds the directory where the log file will be stored
/// * `name` - A string slice that holds the name of the logger and the log file
/// * `level` - Lowest level written to the file and the console
///
/// # Log Example
/// ```
/// log::debug!("Debug Message"); // Log a debug message
/// log::info!("Info Message"); // Log an info message
/// log::warn!("Warning Message"); // Log a warning message
/// log::error!("Error Message"); // Log an error message
/// ```
fn init_log(dir: &str, name: &str, level: LevelFilter) -> Result<(), BoxError> {
    use log4rs::append::console::ConsoleAppender;
    use log4rs::append::file::FileAppender;
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;
    use wastecam::module::util::path::join;

    let pattern = "{h({d} - {l}: {m}{n})}";
    let logfile = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build(join(&[
            dir,
            define::path::LOG_DIR,
            &format!("{}.log", name),
        ]))?;
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(pattern)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("logfile", Box::new(logfile)))
        .appender(Appender::builder().build("console", Box::new(console)))
        .build(
            Root::builder()
                .appender("logfile")
                .appender("console")
                .build(level),
        )?;
    log4rs::init_config(config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{debug, error, info, warn};
    use std::fs;
    use std::path::Path;

    #[test]
    fn test_log() {
        let dir = "/tmp/wastecamtest/";
        let name = "test_log";
        let _ = fs::remove_file("/tmp/wastecamtest/log/test_log.log");

        init_log(dir, name, LevelFilter::Info).unwrap();

        debug!("Debug Message");
        info!("Info Message");
        warn!("Warning Message");
        error!("Error Message");

        let log_file_path = Path::new("/tmp/wastecamtest/log/test_log.log");
        let log_contents = fs::read_to_string(log_file_path).expect("Failed to read log file");

        // Debug is below the configured level
        assert!(!log_contents.contains("Debug Message"));
        assert!(log_contents.contains("Info Message"));
        assert!(log_contents.contains("Warning Message"));
        assert!(log_contents.contains("Error Message"));
    }
}
