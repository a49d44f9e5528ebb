//! Errors raised while loading or executing a story
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigError,
    DivideByZero,
    FileError,
    FrameOverflow,
    FrameUnderflow,
    IllegalMemoryAccess,
    Interpreter,
    InvalidAbbreviation,
    InvalidAddress,
    InvalidFont,
    InvalidInput,
    InvalidInstruction,
    InvalidLocalVariable,
    InvalidObject,
    InvalidObjectAttribute,
    InvalidObjectProperty,
    InvalidObjectPropertySize,
    InvalidObjectTree,
    InvalidOutputStream,
    InvalidRoutine,
    Restore,
    StackOverflow,
    StackUnderflow,
    Stream3Table,
    UndoNoState,
    UnimplementedInstruction,
    UnsupportedVersion,
}

/// Error raised by the engine; recoverable errors are subject to the configured [ErrorHandling](crate::zmachine::ErrorHandling)
pub struct RuntimeError {
    /// Can execution continue past this error?
    recoverable: bool,
    code: ErrorCode,
    message: String,
}

impl RuntimeError {
    /// An error the story can continue past
    pub fn recoverable(code: ErrorCode, message: String) -> RuntimeError {
        RuntimeError {
            recoverable: true,
            code,
            message,
        }
    }

    /// An error that stops the run loop
    pub fn fatal(code: ErrorCode, message: String) -> RuntimeError {
        RuntimeError {
            recoverable: false,
            code,
            message,
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_recoverable(&self) -> bool {
        self.recoverable
    }
}

#[macro_export]
macro_rules! fatal_error {
    ($code:expr, $($arg:tt)*) => {
        Err($crate::error::RuntimeError::fatal($code, format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! recoverable_error {
    ($code:expr, $($arg:tt)*) => {
        Err($crate::error::RuntimeError::recoverable($code, format!($($arg)*)))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} error - [{:?}]: {}",
            if self.recoverable {
                "Recoverable"
            } else {
                "Fatal"
            },
            self.code,
            self.message
        )
    }
}

impl fmt::Debug for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
