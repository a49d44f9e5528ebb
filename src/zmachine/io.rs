//! Interpreter I/O: the [Terminal] collaborator and [output streams](https://inform-fiction.org/zmachine/standards/z1point1/sect07.html)
use crate::{error::*, fatal_error};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
/// Result of a line input request
pub struct LineInput {
    /// Input text, without the terminator
    text: String,
    /// ZSCII terminating character, or 0 if the request timed out
    terminator: u16,
}

impl LineInput {
    pub fn new(text: &str, terminator: u16) -> LineInput {
        LineInput {
            text: text.to_string(),
            terminator,
        }
    }

    /// Input that ended in a timeout, with any partial text
    pub fn timed_out(text: &str) -> LineInput {
        LineInput::new(text, 0)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn terminator(&self) -> u16 {
        self.terminator
    }

    pub fn is_timeout(&self) -> bool {
        self.terminator == 0
    }
}

/// Screen model and input collaborator.
///
/// The engine writes all program output through [Terminal::write_text] and
/// [Terminal::write_char].  The remaining calls are only made by the screen-model opcodes.
pub trait Terminal {
    /// Write text to the current window
    fn write_text(&mut self, text: &str);

    /// Write a single character to the current window
    fn write_char(&mut self, c: char);

    /// Read a line of input, blocking until a terminator is typed or the timeout expires.
    ///
    /// # Arguments
    /// * `existing` - partial input from an earlier, interrupted request
    /// * `max_length` - maximum number of characters
    /// * `timeout` - timeout in tenths of a second, 0 for none
    ///
    /// # Returns
    /// [Result] with the [LineInput] or a [RuntimeError]
    fn request_line(
        &mut self,
        existing: &str,
        max_length: usize,
        timeout: u16,
    ) -> Result<LineInput, RuntimeError>;

    /// Read a single key, blocking until a key is pressed or the timeout expires.
    ///
    /// # Arguments
    /// * `timeout` - timeout in tenths of a second, 0 for none
    ///
    /// # Returns
    /// [Result] with [Some] key or [None] on timeout, or a [RuntimeError]
    fn request_char(&mut self, timeout: u16) -> Result<Option<char>, RuntimeError>;

    fn set_text_style(&mut self, style: u16);

    fn open_upper_window(&mut self, lines: u16);

    fn close_upper_window(&mut self);

    fn set_window(&mut self, window: u16);

    /// Move the cursor; rows and columns count from 1
    fn move_cursor(&mut self, window: u16, row: u16, column: u16);

    /// Cursor position as (row, column)
    fn cursor(&self) -> (u16, u16);

    /// Window size as (columns, rows)
    fn get_window_size(&self, window: u16) -> (u16, u16);

    /// Clear a window; -1 unsplits and clears the screen, -2 clears without unsplitting
    fn clear_window(&mut self, window: i16);

    fn erase_line(&mut self) {}

    fn show_status(&mut self, _left: &str, _right: &str) {}

    fn set_colours(&mut self, _foreground: u16, _background: u16) {}

    fn buffer_mode(&mut self, _mode: u16) {}

    fn beep(&mut self) {}
}

#[derive(Debug)]
struct Stream3 {
    address: usize,
    buffer: Vec<u16>,
}

#[derive(Debug)]
/// Output stream selection
pub struct Streams {
    /// Stream 1, the screen
    screen: bool,
    /// Stack of stream 3 memory tables; only the most recent receives output
    stream_3: Vec<Stream3>,
}

impl Default for Streams {
    fn default() -> Self {
        Streams {
            screen: true,
            stream_3: Vec::new(),
        }
    }
}

impl Streams {
    pub fn screen(&self) -> bool {
        self.screen && self.stream_3.is_empty()
    }

    pub fn set_screen(&mut self, enabled: bool) {
        debug!(target: "app::stream", "Stream 1: {}", enabled);
        self.screen = enabled;
    }

    /// Start redirecting output to a memory table
    ///
    /// # Arguments
    /// * `address` - table address
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if redirection is nested more than 16 deep
    pub fn open_table(&mut self, address: usize) -> Result<(), RuntimeError> {
        if self.stream_3.len() == 16 {
            fatal_error!(
                ErrorCode::Stream3Table,
                "Stream 3 nested more than 16 levels, table at ${:04x}",
                address
            )
        } else {
            debug!(target: "app::stream", "Stream 3: ${:04x}", address);
            self.stream_3.push(Stream3 {
                address,
                buffer: Vec::new(),
            });
            Ok(())
        }
    }

    /// Stop redirecting output to the most recent memory table
    ///
    /// # Returns
    /// [Option] with the table address and captured text, or [None] if stream 3 was not open
    pub fn close_table(&mut self) -> Option<(usize, Vec<u16>)> {
        self.stream_3.pop().map(|s| {
            debug!(target: "app::stream", "Close stream 3: ${:04x}, {} characters", s.address, s.buffer.len());
            (s.address, s.buffer)
        })
    }

    /// Capture output into stream 3, if it is open
    ///
    /// # Arguments
    /// * `text` - ZSCII text
    ///
    /// # Returns
    /// `true` if the text was captured, `false` if it should go to the screen
    pub fn capture(&mut self, text: &[u16]) -> bool {
        match self.stream_3.last_mut() {
            Some(s) => {
                s.buffer.extend_from_slice(text);
                true
            }
            None => false,
        }
    }

    pub fn reset(&mut self) {
        self.screen = true;
        self.stream_3.clear();
    }
}
