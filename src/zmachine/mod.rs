//! The Z-Machine: a single VM context owning memory, stacks, I/O and the fetch-execute loop
use std::collections::HashSet;

use crate::{
    config::Config,
    error::*,
    fatal_error,
    instruction::{decoder, processor, Instruction, NextAddress, StoreResult},
    object, recoverable_error, text,
};

use self::{
    frame::Frame,
    header::{Flags1v3, Flags1v4, Flags2, HeaderField},
    io::{LineInput, Streams, Terminal},
    memory::Memory,
    rng::{chacha_rng::ChaChaRng, ZRng},
    snapshot::{Snapshot, SnapshotStore},
    stack::Stack,
    version::VersionProfile,
};

pub mod frame;
pub mod header;
pub mod io;
pub mod memory;
pub mod rng;
pub mod snapshot;
pub mod stack;
pub mod version;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// What to do when an instruction fails with a recoverable error
pub enum ErrorHandling {
    /// Warn every time and continue
    ContinueWarnAlways,
    /// Warn the first time each error code is seen and continue
    ContinueWarnOnce,
    /// Continue silently
    Ignore,
    /// Stop, as if the error were fatal
    Abort,
}

pub struct ZMachine {
    profile: VersionProfile,
    memory: Memory,
    stack: Stack,
    frames: Vec<Frame>,
    frame_limit: usize,
    pc: usize,
    rng: Box<dyn ZRng>,
    terminal: Box<dyn Terminal>,
    streams: Streams,
    snapshots: SnapshotStore,
    error_handling: ErrorHandling,
    errors: HashSet<ErrorCode>,
    default_colours: (u8, u8),
    font: u16,
    running: bool,
    interrupt_result: Option<u16>,
    instruction_count: usize,
}

impl ZMachine {
    /// Constructor
    ///
    /// # Arguments
    /// * `zcode` - Story file contents
    /// * `config` - Interpreter [Config]
    /// * `terminal` - The [Terminal] all I/O is routed through
    ///
    /// # Returns
    /// [Result] with the [ZMachine] ready to run or a [RuntimeError]
    pub fn new(
        zcode: Vec<u8>,
        config: &Config,
        terminal: Box<dyn Terminal>,
    ) -> Result<ZMachine, RuntimeError> {
        let memory = Memory::try_from(zcode)?;
        let profile = VersionProfile::try_from(header::field_byte(&memory, HeaderField::Version)?)?;
        let pc = header::field_word(&memory, HeaderField::InitialPC)? as usize;

        let mut zm = ZMachine {
            profile,
            memory,
            stack: Stack::new(config.stack_size()),
            frames: vec![Frame::main()],
            frame_limit: config.frame_limit(),
            pc,
            rng: Box::<ChaChaRng>::default(),
            terminal,
            streams: Streams::default(),
            snapshots: SnapshotStore::new(config.undo_limit()),
            error_handling: config.error_handling(),
            errors: HashSet::new(),
            default_colours: (config.foreground(), config.background()),
            font: 1,
            running: true,
            interrupt_result: None,
            instruction_count: 0,
        };

        zm.initialize()?;
        info!(target: "app::state", "Version {} story, initial PC ${:05x}", zm.version(), pc);
        Ok(zm)
    }

    /// Write the interpreter-owned header fields
    fn initialize(&mut self) -> Result<(), RuntimeError> {
        let (columns, rows) = self.terminal.get_window_size(0);
        let (foreground, background) = self.default_colours;

        if self.version() < 4 {
            header::clear_flag1(&mut self.memory, Flags1v3::StatusLineNotAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v3::ScreenSplitAvailable as u8)?;
            header::clear_flag1(&mut self.memory, Flags1v3::VariablePitchDefault as u8)?;
        } else {
            header::set_flag1(&mut self.memory, Flags1v4::BoldfaceAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::ItalicAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::FixedSpaceAvailable as u8)?;
            header::set_flag1(&mut self.memory, Flags1v4::TimedInputAvailable as u8)?;
        }

        if self.version() > 4 {
            header::set_flag1(&mut self.memory, Flags1v4::ColoursAvailable as u8)?;
            header::set_word(&mut self.memory, HeaderField::ScreenWidth, columns)?;
            header::set_word(&mut self.memory, HeaderField::ScreenHeight, rows)?;
            header::set_byte(&mut self.memory, HeaderField::FontWidth, 1)?;
            header::set_byte(&mut self.memory, HeaderField::FontHeight, 1)?;
            header::set_byte(&mut self.memory, HeaderField::DefaultBackground, background)?;
            header::set_byte(&mut self.memory, HeaderField::DefaultForeground, foreground)?;
        }

        header::set_byte(
            &mut self.memory,
            HeaderField::ScreenLines,
            u16::min(rows, 255) as u8,
        )?;
        header::set_byte(
            &mut self.memory,
            HeaderField::ScreenColumns,
            u16::min(columns, 255) as u8,
        )?;
        header::set_byte(&mut self.memory, HeaderField::InterpreterNumber, 6)?;
        header::set_byte(&mut self.memory, HeaderField::InterpreterVersion, b'Z')?;
        header::set_word(&mut self.memory, HeaderField::Revision, 0x0100)
    }

    pub fn version(&self) -> u8 {
        self.profile.version()
    }

    pub fn profile(&self) -> &VersionProfile {
        &self.profile
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn instruction_count(&self) -> usize {
        self.instruction_count
    }

    /// Access the I/O collaborator for the screen-model opcodes
    pub fn terminal(&mut self) -> &mut dyn Terminal {
        self.terminal.as_mut()
    }

    // Memory
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        self.memory.read_byte(address)
    }

    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        self.memory.read_word(address)
    }

    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        self.memory.write_byte(address, value)
    }

    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        self.memory.write_word(address, value)
    }

    /// Copy up to `length` bytes of memory, truncated at the end of the memory map
    pub fn memory_slice(&self, address: usize, length: usize) -> Vec<u8> {
        self.memory.slice(address, length)
    }

    pub fn checksum(&self) -> u16 {
        self.memory.checksum()
    }

    pub fn header_byte(&self, field: HeaderField) -> Result<u8, RuntimeError> {
        header::field_byte(&self.memory, field)
    }

    pub fn header_word(&self, field: HeaderField) -> Result<u16, RuntimeError> {
        header::field_word(&self.memory, field)
    }

    /// Read the words of an encoded string, up to and including the word with bit 15 set
    ///
    /// # Arguments
    /// * `address` - Byte address of the string
    ///
    /// # Returns
    /// [Result] with the encoded words or a [RuntimeError]
    pub fn string_literal(&self, address: usize) -> Result<Vec<u16>, RuntimeError> {
        let mut d = Vec::new();
        loop {
            let w = self.memory.read_word(address + (d.len() * 2))?;
            d.push(w);
            if w & 0x8000 == 0x8000 {
                return Ok(d);
            }
        }
    }

    pub fn packed_routine_address(&self, address: u16) -> usize {
        self.profile.unpack(address)
    }

    pub fn packed_string_address(&self, address: u16) -> usize {
        self.profile.unpack(address)
    }

    // Frames
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Current value stack pointer
    pub fn stack_pointer(&self) -> usize {
        self.stack.len()
    }

    fn current_frame(&self) -> Result<&Frame, RuntimeError> {
        match self.frames.last() {
            Some(frame) => Ok(frame),
            None => fatal_error!(ErrorCode::FrameUnderflow, "No routine frame"),
        }
    }

    fn current_frame_mut(&mut self) -> Result<&mut Frame, RuntimeError> {
        match self.frames.last_mut() {
            Some(frame) => Ok(frame),
            None => fatal_error!(ErrorCode::FrameUnderflow, "No routine frame"),
        }
    }

    pub fn argument_count(&self) -> Result<u8, RuntimeError> {
        Ok(self.current_frame()?.argument_count())
    }

    /// Read a routine header
    ///
    /// # Returns
    /// [Result] with a tuple (address of the first instruction, initial local variables) or a [RuntimeError]
    fn routine_header(&self, address: usize) -> Result<(usize, Vec<u16>), RuntimeError> {
        let variable_count = self.memory.read_byte(address)? as usize;
        if variable_count > 15 {
            return fatal_error!(
                ErrorCode::InvalidRoutine,
                "Routine at ${:05x} declares {} local variables",
                address,
                variable_count
            );
        }

        if self.profile.default_locals() {
            let mut l = Vec::new();
            for i in 0..variable_count {
                l.push(self.memory.read_word(address + 1 + (i * 2))?);
            }
            Ok((address + 1 + (variable_count * 2), l))
        } else {
            Ok((address + 1, vec![0; variable_count]))
        }
    }

    /// Call a routine
    ///
    /// # Arguments
    /// * `address` - Byte address of the routine header, or 0
    /// * `arguments` - Call arguments
    /// * `result` - [Option] with the [StoreResult] for the return value or [None] to discard it
    /// * `return_address` - Address to resume at when the routine returns
    ///
    /// # Returns
    /// [Result] with the [NextAddress] to execute or a [RuntimeError]
    pub fn call_routine(
        &mut self,
        address: usize,
        arguments: &[u16],
        result: Option<StoreResult>,
        return_address: usize,
    ) -> Result<NextAddress, RuntimeError> {
        if address == 0 {
            if let Some(r) = result {
                self.set_variable(r.variable(), 0)?;
            }
            return Ok(NextAddress::Address(return_address));
        }

        if self.frames.len() >= self.frame_limit {
            return fatal_error!(
                ErrorCode::FrameOverflow,
                "Call to ${:05x} exceeds {} frames",
                address,
                self.frame_limit
            );
        }

        let (initial_pc, local_variables) = self.routine_header(address)?;
        debug!(target: "app::state", "Call ${:05x} {:04x?} -> {:?}, return to ${:05x}", address, arguments, result, return_address);
        self.frames.push(Frame::new(
            address,
            return_address,
            self.stack.len(),
            result,
            &local_variables,
            arguments,
        ));

        Ok(NextAddress::Address(initial_pc))
    }

    /// Return from the current routine
    ///
    /// # Arguments
    /// * `value` - Return value
    ///
    /// # Returns
    /// [Result] with the [NextAddress] in the caller or a [RuntimeError]
    pub fn return_routine(&mut self, value: u16) -> Result<NextAddress, RuntimeError> {
        if self.frames.len() < 2 {
            return fatal_error!(
                ErrorCode::FrameUnderflow,
                "Return {:04x} from the main routine",
                value
            );
        }

        match self.frames.pop() {
            Some(frame) => {
                debug!(target: "app::state", "Return {:04x} -> {:?} to ${:05x}", value, frame.result(), frame.return_address());
                self.stack.truncate(frame.stack_pointer());
                if frame.interrupt() {
                    self.interrupt_result = Some(value);
                }
                if let Some(r) = frame.result() {
                    self.set_variable(r.variable(), value)?;
                }
                Ok(NextAddress::Address(frame.return_address()))
            }
            None => fatal_error!(ErrorCode::FrameUnderflow, "No routine frame"),
        }
    }

    /// Unwind to the frame identified by a CATCH, then return from it
    ///
    /// # Arguments
    /// * `depth` - Frame count returned by CATCH
    /// * `value` - Return value
    ///
    /// # Returns
    /// [Result] with the [NextAddress] in the catching routine's caller or a [RuntimeError]
    pub fn throw(&mut self, depth: u16, value: u16) -> Result<NextAddress, RuntimeError> {
        let depth = depth as usize;
        if depth < 2 || depth > self.frames.len() {
            return fatal_error!(
                ErrorCode::FrameUnderflow,
                "Throw to frame {} with {} frames active",
                depth,
                self.frames.len()
            );
        }

        self.frames.truncate(depth);
        self.return_routine(value)
    }

    /// Run an interrupt routine to completion in a nested fetch-execute loop
    ///
    /// # Arguments
    /// * `address` - Byte address of the routine
    ///
    /// # Returns
    /// [Result] with the routine's return value or a [RuntimeError]
    pub fn call_interrupt(&mut self, address: usize) -> Result<u16, RuntimeError> {
        let depth = self.frames.len();
        let pc = self.pc;
        if let NextAddress::Address(a) = self.call_routine(address, &[], None, pc)? {
            self.pc = a;
        }

        if self.frames.len() == depth {
            return Ok(0);
        }

        self.current_frame_mut()?.set_interrupt();
        self.interrupt_result = None;
        debug!(target: "app::state", "Interrupt ${:05x}", address);
        while self.running && self.frames.len() > depth {
            self.step()?;
        }

        self.pc = pc;
        // A QUIT inside the routine abandons the interrupted input
        Ok(self.interrupt_result.take().unwrap_or(1))
    }

    // Variables
    fn global_variable_address(&self, variable: u8) -> Result<usize, RuntimeError> {
        let table = header::field_word(&self.memory, HeaderField::GlobalTable)? as usize;
        Ok(table + ((variable as usize - 16) * 2))
    }

    /// Read a variable; variable 0 pops the stack
    pub fn variable(&mut self, variable: u8) -> Result<u16, RuntimeError> {
        match variable {
            0 => {
                let floor = self.current_frame()?.stack_pointer();
                self.stack.pop(floor)
            }
            1..=15 => self.current_frame()?.local_variable(variable),
            _ => self.memory.read_word(self.global_variable_address(variable)?),
        }
    }

    /// Read a variable; variable 0 reads the top of the stack in place
    pub fn peek_variable(&self, variable: u8) -> Result<u16, RuntimeError> {
        match variable {
            0 => self.stack.peek(self.current_frame()?.stack_pointer()),
            1..=15 => self.current_frame()?.local_variable(variable),
            _ => self.memory.read_word(self.global_variable_address(variable)?),
        }
    }

    /// Write a variable; variable 0 pushes onto the stack
    pub fn set_variable(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        match variable {
            0 => self.stack.push(value),
            1..=15 => self.current_frame_mut()?.set_local_variable(variable, value),
            _ => {
                let address = self.global_variable_address(variable)?;
                debug!(target: "app::state", "G{:02x} <- {:04x}", variable - 16, value);
                self.memory.write_word(address, value)
            }
        }
    }

    /// Write a variable; variable 0 replaces the top of the stack in place
    pub fn set_variable_indirect(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        if variable == 0 {
            let floor = self.current_frame()?.stack_pointer();
            self.stack.poke(floor, value)
        } else {
            self.set_variable(variable, value)
        }
    }

    pub fn push(&mut self, value: u16) -> Result<(), RuntimeError> {
        self.stack.push(value)
    }

    // RNG
    pub fn random(&mut self, range: u16) -> u16 {
        self.rng.random(range)
    }

    pub fn seed(&mut self, seed: u16) {
        self.rng.seed(seed)
    }

    pub fn predictable(&mut self, seed: u16) {
        self.rng.predictable(seed)
    }

    // Output
    /// Send ZSCII text to the selected output streams
    ///
    /// # Arguments
    /// * `text` - ZSCII text
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn print(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        if self.streams.capture(text) {
            return Ok(());
        }

        if self.streams.screen() {
            self.terminal.write_text(&text::zscii_to_string(text));
        }

        Ok(())
    }

    pub fn print_str(&mut self, s: &str) -> Result<(), RuntimeError> {
        let text: Vec<u16> = s.chars().filter_map(text::char_to_zscii).collect();
        self.print(&text)
    }

    pub fn new_line(&mut self) -> Result<(), RuntimeError> {
        self.print(&[13])
    }

    /// Write a character that has no ZSCII equivalent straight to the screen
    pub fn print_unicode(&mut self, c: char) -> Result<(), RuntimeError> {
        match text::char_to_zscii(c) {
            Some(z) => self.print(&[z]),
            None => {
                if !self.streams.capture(&[b'?' as u16]) && self.streams.screen() {
                    self.terminal.write_char(c);
                }
                Ok(())
            }
        }
    }

    /// Select or deselect an output stream
    ///
    /// # Arguments
    /// * `stream` - Stream number, negative to deselect
    /// * `table` - Table address for stream 3
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn output_stream(&mut self, stream: i16, table: Option<usize>) -> Result<(), RuntimeError> {
        debug!(target: "app::stream", "Output stream {} {:?}", stream, table);
        match stream {
            1 => self.streams.set_screen(true),
            -1 => self.streams.set_screen(false),
            2 => header::set_flag2(&mut self.memory, Flags2::Transcripting)?,
            -2 => header::clear_flag2(&mut self.memory, Flags2::Transcripting)?,
            3 => match table {
                Some(address) => self.streams.open_table(address)?,
                None => {
                    return fatal_error!(ErrorCode::Stream3Table, "Stream 3 opened without a table")
                }
            },
            -3 => {
                if let Some((address, buffer)) = self.streams.close_table() {
                    self.memory.write_word(address, buffer.len() as u16)?;
                    for (i, c) in buffer.iter().enumerate() {
                        self.memory.write_byte(address + 2 + i, *c as u8)?;
                    }
                }
            }
            4 | -4 => info!(target: "app::stream", "Stream 4 is not supported"),
            0 => {}
            _ => {
                return recoverable_error!(
                    ErrorCode::InvalidOutputStream,
                    "Output stream {} is not valid: [-4..4]",
                    stream
                )
            }
        }

        Ok(())
    }

    /// Build the v3 status line
    ///
    /// # Returns
    /// [Result] with a tuple (location name, score or time) or a [RuntimeError]
    pub fn status_line(&self) -> Result<(String, String), RuntimeError> {
        let location = self.peek_variable(16)? as usize;
        let left = if location == 0 {
            String::new()
        } else {
            text::zscii_to_string(&object::short_name(self, location)?)
        };

        let right = if header::flag1(&self.memory, Flags1v3::StatusLineType as u8)? {
            let hour = self.peek_variable(17)?;
            let minute = self.peek_variable(18)?;
            format!("{:02}:{:02}", hour, minute)
        } else {
            let score = self.peek_variable(17)? as i16;
            let moves = self.peek_variable(18)?;
            format!("Score: {} Moves: {}", score, moves)
        };

        Ok((left, right))
    }

    pub fn show_status(&mut self) -> Result<(), RuntimeError> {
        let (left, right) = self.status_line()?;
        self.terminal.show_status(&left, &right);
        Ok(())
    }

    /// Select a font
    ///
    /// # Arguments
    /// * `font` - Font number, 0 to query the current font
    ///
    /// # Returns
    /// [Result] with the previous font, 0 if the font is not available, or a [RuntimeError]
    pub fn set_font(&mut self, font: u16) -> Result<u16, RuntimeError> {
        match font {
            0 => Ok(self.font),
            1 | 4 => {
                let previous = self.font;
                self.font = font;
                Ok(previous)
            }
            3 => Ok(0),
            _ => recoverable_error!(ErrorCode::InvalidFont, "Font {} is not valid", font),
        }
    }

    // Input
    pub fn read_line(
        &mut self,
        existing: &str,
        max_length: usize,
        timeout: u16,
    ) -> Result<LineInput, RuntimeError> {
        self.terminal.request_line(existing, max_length, timeout)
    }

    pub fn read_key(&mut self, timeout: u16) -> Result<Option<char>, RuntimeError> {
        self.terminal.request_char(timeout)
    }

    // Snapshots
    fn snapshot(&self, pc: usize) -> Snapshot {
        Snapshot::new(pc, self.memory.dynamic(), self.stack.values(), &self.frames)
    }

    /// Reinstate a snapshot, keeping the interpreter-owned header fields and Flags 2
    fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<usize, RuntimeError> {
        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)? & 0x3;
        self.memory.restore(snapshot.dynamic())?;
        self.stack.restore(snapshot.stack())?;
        self.frames = snapshot.frames().to_vec();
        self.initialize()?;
        let f = header::field_word(&self.memory, HeaderField::Flags2)? & 0xFFFC;
        header::set_word(&mut self.memory, HeaderField::Flags2, f | flags2)?;
        Ok(snapshot.pc())
    }

    /// Save the game
    ///
    /// # Arguments
    /// * `pc` - Address of the SAVE instruction
    pub fn save(&mut self, pc: usize) {
        let snapshot = self.snapshot(pc);
        self.snapshots.save(snapshot);
    }

    /// Restore the saved game
    ///
    /// # Returns
    /// [Result] with [Some] address of the SAVE instruction that was restored, [None] if there is no saved game, or a [RuntimeError]
    pub fn restore(&mut self) -> Result<Option<usize>, RuntimeError> {
        match self.snapshots.restore() {
            Some(snapshot) => Ok(Some(self.restore_snapshot(&snapshot)?)),
            None => {
                warn!(target: "app::state", "No saved game to restore");
                Ok(None)
            }
        }
    }

    /// Record an undo state
    ///
    /// # Returns
    /// `true` if the state was recorded, `false` if undo is disabled
    pub fn save_undo(&mut self, pc: usize) -> bool {
        let snapshot = self.snapshot(pc);
        self.snapshots.save_undo(snapshot)
    }

    pub fn restore_undo(&mut self) -> Result<Option<usize>, RuntimeError> {
        match self.snapshots.restore_undo() {
            Some(snapshot) => Ok(Some(self.restore_snapshot(&snapshot)?)),
            None => {
                warn!(target: "app::state", "No undo state");
                Ok(None)
            }
        }
    }

    /// Restart the story
    ///
    /// # Returns
    /// [Result] with the initial PC or a [RuntimeError]
    pub fn restart(&mut self) -> Result<usize, RuntimeError> {
        let flags2 = header::field_word(&self.memory, HeaderField::Flags2)? & 0x3;
        self.memory.reset();
        self.stack.truncate(0);
        self.frames = vec![Frame::main()];
        self.streams.reset();
        self.rng.seed(0);
        self.initialize()?;
        let f = header::field_word(&self.memory, HeaderField::Flags2)? & 0xFFFC;
        header::set_word(&mut self.memory, HeaderField::Flags2, f | flags2)?;
        let pc = header::field_word(&self.memory, HeaderField::InitialPC)? as usize;
        info!(target: "app::state", "Restart at ${:05x}", pc);
        Ok(pc)
    }

    // Execution
    /// Execute one instruction
    ///
    /// # Returns
    /// Empty [Result] or a fatal [RuntimeError]
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        self.instruction_count += 1;
        let instruction = decoder::decode_instruction(self, self.pc)?;
        debug!(target: "app::instruction", "{}", instruction);
        match processor::dispatch(self, &instruction) {
            Ok(NextAddress::Address(a)) => {
                self.pc = a;
                Ok(())
            }
            Ok(NextAddress::Quit) => {
                info!(target: "app::state", "Quit after {} instructions", self.instruction_count);
                self.running = false;
                Ok(())
            }
            Err(e) => self.recover(&instruction, e),
        }
    }

    /// Apply the error handling policy to an instruction that failed
    fn recover(&mut self, instruction: &Instruction, error: RuntimeError) -> Result<(), RuntimeError> {
        if !error.is_recoverable() || self.error_handling == ErrorHandling::Abort {
            return Err(error);
        }

        warn!(target: "app::instruction", "${:05x}: {}", instruction.address(), error);
        let first = self.errors.insert(error.code());
        if self.error_handling == ErrorHandling::ContinueWarnAlways
            || (self.error_handling == ErrorHandling::ContinueWarnOnce && first)
        {
            self.terminal.write_text(&format!(
                "\n[Warning at ${:05x}]: {}\n",
                instruction.address(),
                error.message()
            ));
        }

        if let Some(s) = instruction.store() {
            self.set_variable(s.variable(), 0)?;
        }
        self.pc = instruction.next_address();
        Ok(())
    }

    /// Run until QUIT or a fatal error
    ///
    /// # Returns
    /// Empty [Result] or the fatal [RuntimeError] that stopped execution
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.running {
            log_mdc::insert("instruction_count", format!("{:8x}", self.instruction_count + 1));
            if let Err(e) = self.step() {
                error!(target: "app::instruction", "Fatal error at ${:05x}: {}", self.pc, e);
                self.terminal.write_text(&format!(
                    "\nFatal error at ${:05x}: {}\n",
                    self.pc,
                    e.message()
                ));
                self.running = false;
                return Err(e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        assert_ok, assert_ok_eq, assert_print, assert_some_eq,
        config::Config,
        test_util::{self, mock_object, mock_routine, mock_zmachine, set_variable, test_map, TestTerminal},
    };

    use super::*;

    #[test]
    fn test_new_v3_header() {
        let zmachine = mock_zmachine(test_map(3));
        assert_eq!(zmachine.version(), 3);
        assert_eq!(zmachine.pc(), 0x400);
        assert_eq!(zmachine.frame_count(), 1);
        assert_ok_eq!(zmachine.header_byte(HeaderField::InterpreterNumber), 6);
        assert_ok_eq!(zmachine.header_byte(HeaderField::InterpreterVersion), b'Z');
        assert_ok_eq!(zmachine.header_byte(HeaderField::ScreenLines), 24);
        assert_ok_eq!(zmachine.header_byte(HeaderField::ScreenColumns), 80);
        assert_ok_eq!(zmachine.header_word(HeaderField::Revision), 0x0100);
        assert_ok_eq!(zmachine.header_byte(HeaderField::Flags1), 0x20);
    }

    #[test]
    fn test_new_v5_header() {
        let zmachine = mock_zmachine(test_map(5));
        assert_ok_eq!(zmachine.header_byte(HeaderField::Flags1), 0x9D);
        assert_ok_eq!(zmachine.header_word(HeaderField::ScreenWidth), 80);
        assert_ok_eq!(zmachine.header_word(HeaderField::ScreenHeight), 24);
        assert_ok_eq!(zmachine.header_byte(HeaderField::FontWidth), 1);
        assert_ok_eq!(zmachine.header_byte(HeaderField::DefaultForeground), 9);
        assert_ok_eq!(zmachine.header_byte(HeaderField::DefaultBackground), 2);
    }

    #[test]
    fn test_new_unsupported_version() {
        for v in [1, 2, 6, 7] {
            let r = ZMachine::new(test_map(v), &Config::default(), Box::new(TestTerminal::new()));
            assert!(matches!(r, Err(e) if e.code() == ErrorCode::UnsupportedVersion));
        }
    }

    #[test]
    fn test_variables() {
        let mut map = test_map(5);
        set_variable(&mut map, 0x10, 0x1234);
        mock_routine(&mut map, 0x600, &[0, 0]);
        let mut zmachine = mock_zmachine(map);
        assert_ok_eq!(zmachine.variable(0x10), 0x1234);
        assert_ok!(zmachine.set_variable(0xFF, 0x5678));
        assert_ok_eq!(zmachine.read_word(0x100 + (0xEF * 2)), 0x5678);
        assert_ok!(zmachine.call_routine(0x600, &[0x11], None, 0x500));
        assert_ok_eq!(zmachine.variable(1), 0x11);
        assert_ok!(zmachine.set_variable(2, 0x22));
        assert_ok_eq!(zmachine.peek_variable(2), 0x22);
        assert!(zmachine.variable(3).is_err());
        // Stack
        assert_ok!(zmachine.set_variable(0, 1));
        assert_ok!(zmachine.set_variable(0, 2));
        assert_ok_eq!(zmachine.peek_variable(0), 2);
        assert_ok!(zmachine.set_variable_indirect(0, 3));
        assert_eq!(zmachine.stack_pointer(), 2);
        assert_ok_eq!(zmachine.variable(0), 3);
        assert_ok_eq!(zmachine.variable(0), 1);
        let e = zmachine.variable(0).unwrap_err();
        assert_eq!(e.code(), ErrorCode::StackUnderflow);
    }

    #[test]
    fn test_call_return_balance() {
        let mut map = test_map(3);
        mock_routine(&mut map, 0x600, &[0x1111, 0x2222, 0x3333]);
        let mut zmachine = mock_zmachine(map);
        assert_ok!(zmachine.push(0xAAAA));
        let sp = zmachine.stack_pointer();
        assert_ok_eq!(
            zmachine.call_routine(0x600, &[0x99], Some(StoreResult::new(0x4FF, 0x10)), 0x500),
            NextAddress::Address(0x607)
        );
        assert_eq!(zmachine.frame_count(), 2);
        assert_ok_eq!(zmachine.variable(1), 0x99);
        assert_ok_eq!(zmachine.variable(2), 0x2222);
        assert_ok_eq!(zmachine.argument_count(), 1);
        assert_ok!(zmachine.push(0xBBBB));
        assert_ok!(zmachine.push(0xCCCC));
        assert_ok_eq!(zmachine.return_routine(0x4321), NextAddress::Address(0x500));
        assert_eq!(zmachine.frame_count(), 1);
        assert_eq!(zmachine.stack_pointer(), sp);
        assert_ok_eq!(zmachine.variable(0x10), 0x4321);
    }

    #[test]
    fn test_call_v5_zeroes_locals() {
        let mut map = test_map(5);
        mock_routine(&mut map, 0x600, &[0x1111, 0x2222]);
        let mut zmachine = mock_zmachine(map);
        assert_ok_eq!(
            zmachine.call_routine(0x600, &[], None, 0x500),
            NextAddress::Address(0x601)
        );
        assert_ok_eq!(zmachine.variable(1), 0);
        assert_ok_eq!(zmachine.variable(2), 0);
    }

    #[test]
    fn test_call_address_zero() {
        let mut zmachine = mock_zmachine(test_map(5));
        assert_ok!(zmachine.push(0xFFFF));
        assert_ok_eq!(
            zmachine.call_routine(0, &[1, 2], Some(StoreResult::new(0x4FF, 0)), 0x500),
            NextAddress::Address(0x500)
        );
        assert_eq!(zmachine.frame_count(), 1);
        assert_ok_eq!(zmachine.variable(0), 0);
    }

    #[test]
    fn test_call_invalid_routine() {
        let mut map = test_map(5);
        map[0x600] = 16;
        let mut zmachine = mock_zmachine(map);
        let e = zmachine.call_routine(0x600, &[], None, 0x500).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidRoutine);
    }

    #[test]
    fn test_frame_overflow() {
        let mut map = test_map(5);
        mock_routine(&mut map, 0x600, &[]);
        let mut zmachine = mock_zmachine(map);
        for _ in 1..Config::default().frame_limit() {
            assert_ok!(zmachine.call_routine(0x600, &[], None, 0x500));
        }
        let e = zmachine.call_routine(0x600, &[], None, 0x500).unwrap_err();
        assert_eq!(e.code(), ErrorCode::FrameOverflow);
    }

    #[test]
    fn test_return_underflow() {
        let mut zmachine = mock_zmachine(test_map(5));
        let e = zmachine.return_routine(1).unwrap_err();
        assert_eq!(e.code(), ErrorCode::FrameUnderflow);
        assert!(!e.is_recoverable());
    }

    #[test]
    fn test_throw() {
        let mut map = test_map(5);
        mock_routine(&mut map, 0x600, &[0]);
        let mut zmachine = mock_zmachine(map);
        assert_ok!(zmachine.call_routine(0x600, &[], Some(StoreResult::new(0, 0x10)), 0x500));
        let depth = zmachine.frame_count() as u16;
        assert_ok!(zmachine.push(1));
        assert_ok!(zmachine.call_routine(0x600, &[], None, 0x610));
        assert_ok!(zmachine.push(2));
        assert_ok!(zmachine.call_routine(0x600, &[], None, 0x620));
        assert_ok_eq!(zmachine.throw(depth, 0x99), NextAddress::Address(0x500));
        assert_eq!(zmachine.frame_count(), 1);
        assert_eq!(zmachine.stack_pointer(), 0);
        assert_ok_eq!(zmachine.variable(0x10), 0x99);
    }

    #[test]
    fn test_print_streams() {
        let mut zmachine = mock_zmachine(test_map(5));
        assert_ok!(zmachine.print(&[b'H' as u16, b'i' as u16, 13]));
        assert_ok!(zmachine.output_stream(3, Some(0x300)));
        assert_ok!(zmachine.print_str("abc"));
        assert_ok!(zmachine.new_line());
        assert_ok!(zmachine.output_stream(-3, None));
        assert_ok_eq!(zmachine.read_word(0x300), 4);
        assert_ok_eq!(zmachine.read_byte(0x302), b'a');
        assert_ok_eq!(zmachine.read_byte(0x305), 13);
        assert_ok!(zmachine.output_stream(-1, None));
        assert_ok!(zmachine.print_str("hidden"));
        assert_ok!(zmachine.output_stream(1, None));
        assert_ok!(zmachine.print_str("!"));
        assert_print!("Hi\n!");
    }

    #[test]
    fn test_output_stream_transcript_bit() {
        let mut zmachine = mock_zmachine(test_map(5));
        assert_ok!(zmachine.output_stream(2, None));
        assert_ok_eq!(zmachine.header_word(HeaderField::Flags2), 1);
        assert_ok!(zmachine.output_stream(-2, None));
        assert_ok_eq!(zmachine.header_word(HeaderField::Flags2), 0);
        let e = zmachine.output_stream(5, None).unwrap_err();
        assert!(e.is_recoverable());
        assert_eq!(e.code(), ErrorCode::InvalidOutputStream);
    }

    #[test]
    fn test_status_line() {
        let mut map = test_map(3);
        // "cave"
        mock_object(&mut map, 1, &[0x20DB, 0xA8A5], (0, 0, 0));
        set_variable(&mut map, 0x10, 1);
        set_variable(&mut map, 0x11, 0xFFFB);
        set_variable(&mut map, 0x12, 12);
        let mut zmachine = mock_zmachine(map);
        assert_ok_eq!(
            zmachine.status_line(),
            ("cave".to_string(), "Score: -5 Moves: 12".to_string())
        );
        assert_ok!(zmachine.write_byte(0x01, 0x02));
        assert_ok!(zmachine.set_variable(0x11, 9));
        assert_ok_eq!(
            zmachine.status_line(),
            ("cave".to_string(), "09:12".to_string())
        );
    }

    #[test]
    fn test_save_restore() {
        let mut map = test_map(5);
        mock_routine(&mut map, 0x600, &[0]);
        let mut zmachine = mock_zmachine(map);
        assert_ok!(zmachine.push(0x1234));
        assert_ok!(zmachine.call_routine(0x600, &[5], None, 0x500));
        assert_ok!(zmachine.write_word(0x380, 0xABCD));
        zmachine.save(0x420);
        assert_ok!(zmachine.write_word(0x380, 0));
        assert_ok!(zmachine.return_routine(0));
        assert_ok!(zmachine.variable(0));
        assert_ok!(zmachine.output_stream(2, None));

        assert_some_eq!(assert_ok!(zmachine.restore()), 0x420);
        assert_ok_eq!(zmachine.read_word(0x380), 0xABCD);
        assert_eq!(zmachine.frame_count(), 2);
        assert_ok_eq!(zmachine.variable(1), 5);
        assert_eq!(zmachine.stack_pointer(), 1);
        // Flags 2 survives the restore
        assert_ok_eq!(zmachine.header_word(HeaderField::Flags2), 1);
    }

    #[test]
    fn test_restore_without_save() {
        let mut zmachine = mock_zmachine(test_map(5));
        assert!(assert_ok!(zmachine.restore()).is_none());
    }

    #[test]
    fn test_undo() {
        let mut zmachine = mock_zmachine(test_map(5));
        assert_ok!(zmachine.write_byte(0x380, 1));
        assert!(zmachine.save_undo(0x410));
        assert_ok!(zmachine.write_byte(0x380, 2));
        assert!(zmachine.save_undo(0x420));
        assert_ok!(zmachine.write_byte(0x380, 3));
        assert_some_eq!(assert_ok!(zmachine.restore_undo()), 0x420);
        assert_ok_eq!(zmachine.read_byte(0x380), 2);
        assert_some_eq!(assert_ok!(zmachine.restore_undo()), 0x410);
        assert_ok_eq!(zmachine.read_byte(0x380), 1);
        assert!(assert_ok!(zmachine.restore_undo()).is_none());
    }

    #[test]
    fn test_restart() {
        let mut map = test_map(5);
        mock_routine(&mut map, 0x600, &[]);
        let mut zmachine = mock_zmachine(map);
        assert_ok!(zmachine.write_byte(0x380, 1));
        assert_ok!(zmachine.output_stream(2, None));
        assert_ok!(zmachine.push(1));
        assert_ok!(zmachine.call_routine(0x600, &[], None, 0x500));
        assert_ok_eq!(zmachine.restart(), 0x400);
        assert_ok_eq!(zmachine.read_byte(0x380), 0);
        assert_eq!(zmachine.frame_count(), 1);
        assert_eq!(zmachine.stack_pointer(), 0);
        assert_ok_eq!(zmachine.header_word(HeaderField::Flags2), 1);
        assert_ok_eq!(zmachine.header_byte(HeaderField::InterpreterNumber), 6);
    }

    #[test]
    fn test_set_font() {
        let mut zmachine = mock_zmachine(test_map(5));
        assert_ok_eq!(zmachine.set_font(0), 1);
        assert_ok_eq!(zmachine.set_font(4), 1);
        assert_ok_eq!(zmachine.set_font(1), 4);
        assert_ok_eq!(zmachine.set_font(3), 0);
        let e = zmachine.set_font(9).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidFont);
    }

    #[test]
    fn test_run_quit() {
        let mut map = test_map(5);
        // PRINT "hi" ; QUIT
        map[0x400] = 0xB2;
        map[0x401] = 0xB5;
        map[0x402] = 0xC5;
        map[0x403] = 0xBA;
        let mut zmachine = mock_zmachine(map);
        assert_ok!(zmachine.run());
        assert!(!zmachine.is_running());
        assert_eq!(zmachine.instruction_count(), 2);
        assert_print!("hi");
    }

    #[test]
    fn test_run_recoverable_warns_once() {
        let mut map = test_map(5);
        // DIV #01 #00 -> G00, twice, then QUIT
        for a in [0x400, 0x404] {
            map[a] = 0x17;
            map[a + 1] = 0x01;
            map[a + 2] = 0x00;
            map[a + 3] = 0x10;
        }
        map[0x408] = 0xBA;
        let mut zmachine = mock_zmachine(map);
        assert_ok!(zmachine.run());
        assert_ok_eq!(zmachine.peek_variable(0x10), 0);
        assert_eq!(test_util::print().matches("Warning").count(), 1);
    }

    #[test]
    fn test_run_fatal() {
        let mut map = test_map(5);
        // RTRUE from the main routine
        map[0x400] = 0xB0;
        let mut zmachine = mock_zmachine(map);
        let e = zmachine.run().unwrap_err();
        assert_eq!(e.code(), ErrorCode::FrameUnderflow);
        assert!(test_util::print().starts_with("\nFatal error at $00400"));
    }

    #[test]
    fn test_call_interrupt() {
        let mut map = test_map(5);
        // Routine: PRINT "hi" ; RET #07
        mock_routine(&mut map, 0x600, &[]);
        map[0x601] = 0xB2;
        map[0x602] = 0xB5;
        map[0x603] = 0xC5;
        map[0x604] = 0x9B;
        map[0x605] = 0x07;
        let mut zmachine = mock_zmachine(map);
        assert_ok_eq!(zmachine.call_interrupt(0x600), 7);
        assert_eq!(zmachine.pc(), 0x400);
        assert_eq!(zmachine.frame_count(), 1);
        assert_print!("hi");
    }
}
