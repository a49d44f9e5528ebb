//! Helper functions for file I/O
use std::{fs::File, io::Read, path::Path};

use log::error;
use zvm::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
};

/// Checks the existence of a file
///
/// # Arguments
/// * `name` - Filename
///
/// # Returns
/// `true` if the file exists, `false` if not
fn check_filename(name: &Path) -> bool {
    match name.try_exists() {
        Ok(b) => b,
        Err(e) => {
            error!(target: "app::state", "Error checking existence of {}: {}", name.display(), e);
            false
        }
    }
}

/// Looks for a configuration file
///
/// The current working directory is checked first, then ~/.zvm/
///
/// # Arguments
/// * `name` - Filename
///
/// # Returns
/// [Option] with the path to the file, if found, else [None]
pub fn config_file(name: &str) -> Option<String> {
    if check_filename(Path::new(name)) {
        Some(name.to_string())
    } else {
        let filename = dirs::home_dir()?.join(".zvm").join(name);
        if check_filename(&filename) {
            filename.to_str().map(|s| s.to_string())
        } else {
            None
        }
    }
}

/// Read a story file
///
/// # Arguments
/// * `filename` - File name
///
/// # Returns
/// [Result] with the file contents or a [RuntimeError]
pub fn read_story(filename: &str) -> Result<Vec<u8>, RuntimeError> {
    let mut data = Vec::new();
    match File::open(filename) {
        Ok(mut f) => match f.read_to_end(&mut data) {
            Ok(_) => Ok(data),
            Err(e) => recoverable_error!(ErrorCode::FileError, "Error reading {}: {}", filename, e),
        },
        Err(e) => recoverable_error!(ErrorCode::FileError, "Error opening {}: {}", filename, e),
    }
}

/// Base name of a story file, without any directory or extension
pub fn story_name(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}
