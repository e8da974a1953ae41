//! Path Operations Module
//!
//! This module handles path operations for directories and files.

use std::path::{Path, PathBuf};

/// Join Paths
///
/// This function takes a slice of strings as input and joins them into a single path string.
/// It uses the PathBuf type to handle platform-specific separators and conversions.
pub fn join(paths: &[&str]) -> String {
    let mut path: PathBuf = PathBuf::new();
    for p in paths {
        path.push(p);
    }
    path.to_string_lossy().into_owned()
}

pub mod dir {
    //! Directory Operations Submodule
    //!
    //! This submodule provides functions for directory operations.

    use std::fs;
    use std::io;
    use std::path::Path;

    use super::{WastecamDir, WastecamPath};
    use crate::module::define;

    /// Create Directory from Path List
    ///
    /// Creates a directory with the joined path and returns that path.
    pub fn create_dir_from_path_list(paths: &[&str]) -> io::Result<String> {
        let path = super::join(paths);
        fs::create_dir_all(Path::new(&path))?;
        Ok(path)
    }

    /// Create Subdirectory in Either Directory
    ///
    /// Uses `dir1` as the parent if it exists, otherwise `dir2`.
    pub fn create_subdir_in_either_dir(dir1: &str, dir2: &str, name: &str) -> io::Result<String> {
        let parent: &str = match Path::new(dir1).is_dir() {
            true => dir1,
            false => dir2,
        };
        create_dir_from_path_list(&[parent, name])
    }

    /// Create Data Directory
    ///
    /// Lives under `define::path::PERSISTENT_DIR` when that exists, so captures survive
    /// a reboot, and under `define::path::EPHEMERAL_DIR` otherwise.
    pub fn create_data_dir() -> io::Result<String> {
        create_subdir_in_either_dir(
            define::path::PERSISTENT_DIR,
            define::path::EPHEMERAL_DIR,
            define::system::NAME,
        )
    }

    /// Create Application Subdirectory and Paths
    ///
    /// Creates the data directory with its `img` and `log` subdirectories.
    pub fn create_app_sub_dir() -> io::Result<WastecamPath> {
        let data_dir = create_data_dir()?;
        create_app_sub_dir_in(&data_dir)
    }

    /// Same as [`create_app_sub_dir`] rooted at an explicit data directory.
    pub fn create_app_sub_dir_in(data_dir: &str) -> io::Result<WastecamPath> {
        let img_dir = create_dir_from_path_list(&[data_dir, define::path::IMG_DIR])?;
        let log_dir = create_dir_from_path_list(&[data_dir, define::path::LOG_DIR])?;
        Ok(WastecamPath {
            dir: WastecamDir {
                data: data_dir.to_string(),
                img: img_dir,
                log: log_dir,
            },
        })
    }
}

/// Paths of Resources
///
/// This struct represents the paths of the resources used by the application.
#[derive(Debug, Clone)]
pub struct WastecamPath {
    /// Directories Paths
    pub dir: WastecamDir,
}

/// Paths of Directories
#[derive(Debug, Clone)]
pub struct WastecamDir {
    /// Data Directory Path
    pub data: String,
    /// Captured Image Directory Path
    pub img: String,
    /// Log Directory Path
    pub log: String,
}

/// Builds a capture file path that does not exist yet.
///
/// The name is `<prefix>_<YYYYmmdd_HHMMSS_mmm>.<ext>`; a `_<n>` suffix is added when
/// two captures land in the same millisecond.
pub fn unique_capture_path(dir: &str, prefix: &str, ext: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
    let dir = Path::new(dir);
    let mut path = dir.join(format!("{}_{}.{}", prefix, stamp, ext));
    let mut n = 1;
    while path.exists() {
        path = dir.join(format!("{}_{}_{}.{}", prefix, stamp, n, ext));
        n += 1;
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_create_dir_from_path_list() {
        dir::create_dir_from_path_list(&["/tmp", "wastecamtest", "test_create_dir_from_path_list"])
            .unwrap();
        assert!(Path::new("/tmp/wastecamtest/test_create_dir_from_path_list").is_dir());
    }

    #[test]
    fn test_create_subdir_in_either_dir() {
        let res = dir::create_subdir_in_either_dir(
            "/tmp/wastecamtest_missing",
            "/tmp/wastecamtest",
            "test_create_subdir_in_either_dir",
        )
        .unwrap();
        assert_eq!(res, "/tmp/wastecamtest/test_create_subdir_in_either_dir");
        assert!(Path::new(&res).is_dir());
    }

    #[test]
    fn test_create_app_sub_dir_in() {
        let res = dir::create_app_sub_dir_in("/tmp/wastecamtest/app").unwrap();
        assert!(Path::new("/tmp/wastecamtest/app/img").is_dir());
        assert!(Path::new("/tmp/wastecamtest/app/log").is_dir());
        assert_eq!(res.dir.img, "/tmp/wastecamtest/app/img");
    }

    #[test]
    fn capture_paths_are_distinct() {
        let dir = "/tmp/wastecamtest/unique";
        fs::create_dir_all(dir).unwrap();
        let first = unique_capture_path(dir, "image", "jpg");
        fs::write(&first, b"x").unwrap();
        let second = unique_capture_path(dir, "image", "jpg");
        assert_ne!(first, second);
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("image_"));
        assert!(name.ends_with(".jpg"));
    }

    #[test]
    fn test_path_join() {
        assert_eq!(join(&["/test/", "test"]), "/test/test");
        assert_eq!(join(&["test", "test", "test"]), "test/test/test");
        assert_eq!(join(&["/test/", "test/"]), "/test/test/");
        assert_eq!(
            join(&["./test/", "test/", "test.txt"]),
            "./test/test/test.txt"
        );
    }
}
