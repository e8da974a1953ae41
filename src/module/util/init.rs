//! This module is responsible for preparing the resources needed by the application, such as directories, configurations, logs, etc.
//!

pub mod resource {
    use super::WastecamProperty;
    use crate::BoxError;

    /// Initialize the application resources and return a WastecamProperty instance containing paths and configurations.
    ///
    pub fn init() -> Result<WastecamProperty, BoxError> {
        // Prepare the app data directory
        let paths = crate::module::util::path::dir::create_app_sub_dir()?;

        // Load the app configuration file
        let conf = crate::module::util::conf::toml::load(&paths.dir.data)?;

        Ok(WastecamProperty { path: paths, conf })
    }
}

/// This struct represents the properties of the app, such as paths and configurations.
///
#[derive(Debug, Clone)]
pub struct WastecamProperty {
    pub path: crate::module::util::path::WastecamPath, // The paths of the app resources
    pub conf: crate::module::util::conf::Config,       // The configurations of the app
}
