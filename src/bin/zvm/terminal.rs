//! Line-oriented stdio [Terminal]
use std::io::{self, BufRead, Write};

use zvm::{
    error::{ErrorCode, RuntimeError},
    fatal_error,
    zmachine::io::{LineInput, Terminal},
};

/// Writes output to stdout and reads whole lines from stdin.
///
/// There is no screen model: windows, cursor movement and styles are ignored, and timed
/// input blocks until a line is entered.
pub struct StdioTerminal {
    columns: u16,
    rows: u16,
    /// Characters written since the last newline
    column: u16,
}

impl StdioTerminal {
    pub fn new(columns: u16, rows: u16) -> StdioTerminal {
        StdioTerminal {
            columns,
            rows,
            column: 0,
        }
    }

    fn flush(&self) {
        if let Err(e) = io::stdout().flush() {
            error!(target: "app::screen", "Error flushing stdout: {}", e);
        }
    }

    fn read_stdin_line(&mut self) -> Result<String, RuntimeError> {
        self.flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) => fatal_error!(ErrorCode::InvalidInput, "End of input"),
            Ok(_) => {
                self.column = 0;
                Ok(line.trim_end_matches(['\r', '\n']).to_string())
            }
            Err(e) => fatal_error!(ErrorCode::InvalidInput, "Error reading input: {}", e),
        }
    }
}

impl Terminal for StdioTerminal {
    fn write_text(&mut self, text: &str) {
        print!("{}", text);
        match text.rfind('\n') {
            Some(i) => self.column = text[i + 1..].chars().count() as u16,
            None => self.column += text.chars().count() as u16,
        }
    }

    fn write_char(&mut self, c: char) {
        print!("{}", c);
        if c == '\n' {
            self.column = 0;
        } else {
            self.column += 1;
        }
    }

    fn request_line(
        &mut self,
        existing: &str,
        max_length: usize,
        timeout: u16,
    ) -> Result<LineInput, RuntimeError> {
        if timeout > 0 {
            debug!(target: "app::screen", "Timed input is not supported, timeout {} ignored", timeout);
        }

        let line = self.read_stdin_line()?;
        let text: String = format!("{}{}", existing, line).chars().take(max_length).collect();
        Ok(LineInput::new(&text, 13))
    }

    fn request_char(&mut self, _timeout: u16) -> Result<Option<char>, RuntimeError> {
        let line = self.read_stdin_line()?;
        Ok(Some(line.chars().next().unwrap_or('\n')))
    }

    fn set_text_style(&mut self, _style: u16) {}

    fn open_upper_window(&mut self, _lines: u16) {}

    fn close_upper_window(&mut self) {}

    fn set_window(&mut self, _window: u16) {}

    fn move_cursor(&mut self, _window: u16, _row: u16, _column: u16) {}

    fn cursor(&self) -> (u16, u16) {
        (self.rows, self.column + 1)
    }

    fn get_window_size(&self, _window: u16) -> (u16, u16) {
        (self.columns, self.rows)
    }

    fn clear_window(&mut self, _window: i16) {}

    fn show_status(&mut self, left: &str, right: &str) {
        let width = (self.columns as usize).saturating_sub(right.chars().count() + 1);
        if self.column > 0 {
            println!();
        }
        println!("[{:<width$}{}]", left, right, width = width.saturating_sub(1));
        self.column = 0;
    }

    fn beep(&mut self) {
        print!("\x07");
        self.flush();
    }
}
