//! Interpreter configuration
use serde_yaml::{self, Value};
use std::fs::File;

use crate::{
    error::{ErrorCode, RuntimeError},
    recoverable_error,
    zmachine::ErrorHandling,
};

/// Smallest usable value stack
const MIN_STACK_SIZE: usize = 1;
/// The main routine holds one frame, so at least one more is needed for any call
const MIN_FRAME_LIMIT: usize = 2;

#[derive(Debug)]
/// Interpreter settings, normally loaded from `config.yml`
pub struct Config {
    /// Default foreground colour
    foreground: u8,
    /// Default background colour
    background: u8,
    /// Configure log4rs at start-up
    logging: bool,
    /// What to do about recoverable errors
    error_handling: ErrorHandling,
    /// Value stack capacity, in words
    stack_size: usize,
    /// Maximum call stack depth
    frame_limit: usize,
    /// Number of undo states to retain
    undo_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            foreground: 9, // white text
            background: 2, // on a black background
            logging: false,
            error_handling: ErrorHandling::ContinueWarnOnce,
            stack_size: 8192,
            frame_limit: 1024,
            undo_limit: 10,
        }
    }
}

impl TryFrom<File> for Config {
    type Error = RuntimeError;

    fn try_from(value: File) -> Result<Self, Self::Error> {
        match serde_yaml::from_reader::<File, Value>(value) {
            Ok(data) => {
                let defaults = Config::default();
                let foreground = match data["foreground"].as_u64() {
                    Some(v) => v as u8,
                    None => defaults.foreground,
                };
                let background = match data["background"].as_u64() {
                    Some(v) => v as u8,
                    None => defaults.background,
                };
                let logging = match data["logging"].as_str() {
                    Some(t) => t == "enabled",
                    None => false,
                };
                let error_handling = match data["error_handling"].as_str() {
                    Some(t) => match t {
                        "continue_warn_always" => ErrorHandling::ContinueWarnAlways,
                        "continue_warn_once" => ErrorHandling::ContinueWarnOnce,
                        "ignore" => ErrorHandling::Ignore,
                        "abort" => ErrorHandling::Abort,
                        _ => ErrorHandling::ContinueWarnOnce,
                    },
                    None => defaults.error_handling,
                };
                let stack_size = match data["stack_size"].as_u64() {
                    Some(v) => v as usize,
                    None => defaults.stack_size,
                };
                let frame_limit = match data["frame_limit"].as_u64() {
                    Some(v) => v as usize,
                    None => defaults.frame_limit,
                };
                let undo_limit = match data["undo_limit"].as_u64() {
                    Some(v) => v as usize,
                    None => defaults.undo_limit,
                };
                Ok(Config::new(
                    foreground,
                    background,
                    logging,
                    error_handling,
                    stack_size,
                    frame_limit,
                    undo_limit,
                ))
            }
            Err(e) => recoverable_error!(ErrorCode::ConfigError, "{}", e),
        }
    }
}

impl Config {
    /// Constructor
    ///
    /// # Arguments
    /// * `foreground` - Default foreground colour
    /// * `background` - Default background colour
    /// * `logging` - Configure logging
    /// * `error_handling` - Recoverable error policy
    /// * `stack_size` - Value stack capacity, at least 1
    /// * `frame_limit` - Call stack capacity, at least 2
    /// * `undo_limit` - Retained undo states
    pub fn new(
        foreground: u8,
        background: u8,
        logging: bool,
        error_handling: ErrorHandling,
        stack_size: usize,
        frame_limit: usize,
        undo_limit: usize,
    ) -> Self {
        Config {
            foreground,
            background,
            logging,
            error_handling,
            stack_size: usize::max(stack_size, MIN_STACK_SIZE),
            frame_limit: usize::max(frame_limit, MIN_FRAME_LIMIT),
            undo_limit,
        }
    }

    /// Colour number reported in the header as the default foreground
    pub fn foreground(&self) -> u8 {
        self.foreground
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    /// Should the binary configure log4rs?
    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn error_handling(&self) -> ErrorHandling {
        self.error_handling
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub fn frame_limit(&self) -> usize {
        self.frame_limit
    }

    pub fn undo_limit(&self) -> usize {
        self.undo_limit
    }
}
