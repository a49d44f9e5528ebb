use std::{cell::RefCell, collections::VecDeque};

use crate::{
    config::Config,
    error::RuntimeError,
    instruction::{
        Branch, BranchTarget, Instruction, Opcode, OpcodeForm, Operand, OperandCount, OperandType,
        StoreResult,
    },
    text,
    zmachine::{
        io::{LineInput, Terminal},
        ZMachine,
    },
};

thread_local! {
    pub static PRINT:RefCell<String> = RefCell::new(String::new());
    pub static INPUT:RefCell<VecDeque<String>> = RefCell::new(VecDeque::new());
    pub static KEYS:RefCell<VecDeque<char>> = RefCell::new(VecDeque::new());
    pub static TIMEOUTS:RefCell<usize> = RefCell::new(0);
    pub static STYLE:RefCell<u16> = RefCell::new(0);
    pub static SPLIT:RefCell<u16> = RefCell::new(0);
    pub static WINDOW:RefCell<u16> = RefCell::new(0);
    pub static CURSOR:RefCell<(u16, u16)> = RefCell::new((1, 1));
    pub static ERASE_WINDOW:RefCell<Vec<i16>> = RefCell::new(Vec::new());
    pub static ERASE_LINE:RefCell<bool> = RefCell::new(false);
    pub static COLOURS:RefCell<(u16, u16)> = RefCell::new((0, 0));
    pub static BUFFER:RefCell<u16> = RefCell::new(1);
    pub static BEEP:RefCell<usize> = RefCell::new(0);
    pub static STATUS:RefCell<(String, String)> = RefCell::new((String::new(), String::new()));
}

#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {
        match $e {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok(..), got Err({:?})", e),
        }
    };
}

#[macro_export]
macro_rules! assert_ok_eq {
    ($e:expr, $v:expr) => {
        assert_eq!($crate::assert_ok!($e), $v)
    };
}

#[macro_export]
macro_rules! assert_some {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => panic!("Expected Some(..), got None"),
        }
    };
}

#[macro_export]
macro_rules! assert_some_eq {
    ($e:expr, $v:expr) => {
        assert_eq!($crate::assert_some!($e), $v)
    };
}

#[macro_export]
macro_rules! assert_print {
    ($s:expr) => {
        assert_eq!($crate::test_util::print(), $s)
    };
}

pub fn print() -> String {
    PRINT.with(|x| x.borrow().to_string())
}

/// Queue lines of input
pub fn input(lines: &[&str]) {
    for l in lines {
        INPUT.with(|x| x.borrow_mut().push_back(l.to_string()));
    }
}

/// Queue keypresses
pub fn keys(keys: &[char]) {
    for c in keys {
        KEYS.with(|x| x.borrow_mut().push_back(*c));
    }
}

/// The next `count` timed input requests will time out
pub fn set_timeouts(count: usize) {
    TIMEOUTS.with(|x| x.swap(&RefCell::new(count)));
}

fn take_timeout() -> bool {
    TIMEOUTS.with(|x| {
        let mut t = x.borrow_mut();
        if *t > 0 {
            *t -= 1;
            true
        } else {
            false
        }
    })
}

pub fn style() -> u16 {
    STYLE.with(|x| x.borrow().to_owned())
}

pub fn split() -> u16 {
    SPLIT.with(|x| x.borrow().to_owned())
}

pub fn window() -> u16 {
    WINDOW.with(|x| x.borrow().to_owned())
}

pub fn cursor() -> (u16, u16) {
    CURSOR.with(|x| x.borrow().to_owned())
}

pub fn erase_window() -> Vec<i16> {
    ERASE_WINDOW.with(|x| x.borrow().clone())
}

pub fn erase_line() -> bool {
    ERASE_LINE.with(|x| x.borrow().to_owned())
}

pub fn colours() -> (u16, u16) {
    COLOURS.with(|x| x.borrow().to_owned())
}

pub fn buffer_mode() -> u16 {
    BUFFER.with(|x| x.borrow().to_owned())
}

pub fn beeps() -> usize {
    BEEP.with(|x| x.borrow().to_owned())
}

pub fn status() -> (String, String) {
    STATUS.with(|x| x.borrow().clone())
}

/// [Terminal] that records output and screen operations and replays queued input
pub struct TestTerminal {
    size: (u16, u16),
}

impl TestTerminal {
    pub fn new() -> TestTerminal {
        TestTerminal { size: (80, 24) }
    }
}

impl Terminal for TestTerminal {
    fn write_text(&mut self, text: &str) {
        PRINT.with(|x| x.borrow_mut().push_str(text));
    }

    fn write_char(&mut self, c: char) {
        PRINT.with(|x| x.borrow_mut().push(c));
    }

    fn request_line(
        &mut self,
        existing: &str,
        max_length: usize,
        timeout: u16,
    ) -> Result<LineInput, RuntimeError> {
        if timeout > 0 && take_timeout() {
            return Ok(LineInput::timed_out(existing));
        }

        let line = INPUT.with(|x| x.borrow_mut().pop_front()).unwrap_or_default();
        let text: String = format!("{}{}", existing, line)
            .chars()
            .take(max_length)
            .collect();
        Ok(LineInput::new(&text, 13))
    }

    fn request_char(&mut self, timeout: u16) -> Result<Option<char>, RuntimeError> {
        if timeout > 0 && take_timeout() {
            return Ok(None);
        }

        Ok(KEYS.with(|x| x.borrow_mut().pop_front()))
    }

    fn set_text_style(&mut self, style: u16) {
        STYLE.with(|x| x.swap(&RefCell::new(style)));
    }

    fn open_upper_window(&mut self, lines: u16) {
        SPLIT.with(|x| x.swap(&RefCell::new(lines)));
    }

    fn close_upper_window(&mut self) {
        SPLIT.with(|x| x.swap(&RefCell::new(0)));
    }

    fn set_window(&mut self, window: u16) {
        WINDOW.with(|x| x.swap(&RefCell::new(window)));
    }

    fn move_cursor(&mut self, _window: u16, row: u16, column: u16) {
        CURSOR.with(|x| x.swap(&RefCell::new((row, column))));
    }

    fn cursor(&self) -> (u16, u16) {
        cursor()
    }

    fn get_window_size(&self, _window: u16) -> (u16, u16) {
        self.size
    }

    fn clear_window(&mut self, window: i16) {
        ERASE_WINDOW.with(|x| x.borrow_mut().push(window));
    }

    fn erase_line(&mut self) {
        ERASE_LINE.with(|x| x.swap(&RefCell::new(true)));
    }

    fn show_status(&mut self, left: &str, right: &str) {
        STATUS.with(|x| x.swap(&RefCell::new((left.to_string(), right.to_string()))));
    }

    fn set_colours(&mut self, foreground: u16, background: u16) {
        COLOURS.with(|x| x.swap(&RefCell::new((foreground, background))));
    }

    fn buffer_mode(&mut self, mode: u16) {
        BUFFER.with(|x| x.swap(&RefCell::new(mode)));
    }

    fn beep(&mut self) {
        BEEP.with(|x| *x.borrow_mut() += 1);
    }
}

pub fn test_map(version: u8) -> Vec<u8> {
    let mut v = vec![0; 0x800];
    v[0] = version;
    // Initial PC at $0400
    v[6] = 0x4;
    // Object table as 0x200
    v[0x0A] = 0x02;
    // Static mark at $0400
    v[0x0E] = 0x04;
    // Global variables at $0100
    v[0x0C] = 0x01;

    v
}

pub fn set_variable(map: &mut [u8], variable: u8, value: u16) {
    let address = 0x100 + ((variable - 16) as usize * 2);
    map[address] = (value >> 8) as u8;
    map[address + 1] = value as u8;
}

pub fn mock_zmachine(map: Vec<u8>) -> ZMachine {
    assert_ok!(ZMachine::new(
        map,
        &Config::default(),
        Box::new(TestTerminal::new())
    ))
}

pub fn operand(operand_type: OperandType, value: u16) -> Operand {
    Operand::new(operand_type, value)
}

pub fn opcode(version: u8, operand_count: OperandCount, instruction: u8) -> Opcode {
    let form = match operand_count {
        OperandCount::_0OP | OperandCount::_1OP => OpcodeForm::Short,
        OperandCount::_2OP => OpcodeForm::Long,
        OperandCount::_VAR => OpcodeForm::Var,
    };
    Opcode::new(version, instruction, instruction, form, operand_count)
}

pub fn ext_opcode(version: u8, instruction: u8) -> Opcode {
    Opcode::new(version, instruction, instruction, OpcodeForm::Ext, OperandCount::_VAR)
}

pub fn mock_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
) -> Instruction {
    Instruction::new(address, opcode, operands, None, None, next_address)
}

/// Branch descriptor; a `target` of 0 or 1 returns false or true
pub fn branch(byte_address: usize, condition: bool, target: usize) -> Branch {
    let target = match target {
        0 => BranchTarget::ReturnFalse,
        1 => BranchTarget::ReturnTrue,
        _ => BranchTarget::Address(target),
    };
    Branch::new(byte_address, condition, target)
}

pub fn mock_branch_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
    branch: Branch,
) -> Instruction {
    Instruction::new(address, opcode, operands, None, Some(branch), next_address)
}

pub fn store(byte_address: usize, variable: u8) -> StoreResult {
    StoreResult::new(byte_address, variable)
}

pub fn mock_store_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
    result: StoreResult,
) -> Instruction {
    Instruction::new(address, opcode, operands, Some(result), None, next_address)
}

pub fn mock_branch_store_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
    branch: Branch,
    result: StoreResult,
) -> Instruction {
    Instruction::new(
        address,
        opcode,
        operands,
        Some(result),
        Some(branch),
        next_address,
    )
}

pub fn mock_frame(
    zmachine: &mut ZMachine,
    address: usize,
    result: Option<u8>,
    return_address: usize,
) {
    let r = result.map(|x| StoreResult::new(0, x));
    assert_ok!(zmachine.call_routine(address, &[], r, return_address));
}

pub fn mock_routine(map: &mut [u8], address: usize, local_variables: &[u16]) {
    map[address] = local_variables.len() as u8;
    for (i, w) in local_variables.iter().enumerate() {
        if map[0] < 5 {
            map[address + 1 + (i * 2)] = (*w >> 8) as u8;
            map[address + 2 + (i * 2)] = *w as u8;
        }
    }
}

/// Write an encoded string to memory
pub fn mock_text(map: &mut [u8], address: usize, ztext: &[u16]) {
    for (i, w) in ztext.iter().enumerate() {
        map[address + (i * 2)] = (*w >> 8) as u8;
        map[address + 1 + (i * 2)] = *w as u8;
    }
}

/// Build a dictionary with separators `.`, `,` and `"` and 9-byte entries.
///
/// Words are stored in the order given; an unsorted dictionary has a negative entry count.
pub fn mock_dictionary(map: &mut [u8], address: usize, words: &[&str], sorted: bool) {
    let encoded_words = if map[0] < 4 { 2 } else { 3 };
    map[0x08] = (address >> 8) as u8;
    map[0x09] = address as u8;

    map[address] = 3;
    map[address + 1] = b'.';
    map[address + 2] = b',';
    map[address + 3] = b'"';
    map[address + 4] = 9;

    let count = if sorted {
        words.len() as i16
    } else {
        -(words.len() as i16)
    };
    map[address + 5] = (count >> 8) as u8;
    map[address + 6] = count as u8;

    for (i, w) in words.iter().enumerate() {
        let zscii: Vec<u16> = w.chars().map(|c| c as u16).collect();
        mock_text(
            map,
            address + 7 + (i * 9),
            &text::encode_text(&zscii, encoded_words),
        );
    }
}

fn mock_object_address(map: &[u8], object: usize) -> usize {
    let object_table = ((map[0x0a] as usize) << 8) + map[0x0b] as usize;
    if map[0] < 4 {
        object_table + 62 + ((object - 1) * 9)
    } else {
        object_table + 126 + ((object - 1) * 14)
    }
}

pub fn mock_object(
    map: &mut [u8],
    object: usize,
    short_name: &[u16],
    (parent, sibling, child): (u16, u16, u16),
) {
    let object_address = mock_object_address(map, object);

    // Property tables will be placed at 0x300
    let property_table_address = 0x300 + ((object - 1) * 20);
    if map[0] < 4 {
        map[object_address + 4] = parent as u8;
        map[object_address + 5] = sibling as u8;
        map[object_address + 6] = child as u8;
        map[object_address + 7] = (property_table_address >> 8) as u8;
        map[object_address + 8] = property_table_address as u8;
    } else {
        map[object_address + 6] = (parent >> 8) as u8;
        map[object_address + 7] = parent as u8;
        map[object_address + 8] = (sibling >> 8) as u8;
        map[object_address + 9] = sibling as u8;
        map[object_address + 10] = (child >> 8) as u8;
        map[object_address + 11] = child as u8;
        map[object_address + 12] = (property_table_address >> 8) as u8;
        map[object_address + 13] = property_table_address as u8;
    }

    map[property_table_address] = short_name.len() as u8;
    mock_text(map, property_table_address + 1, short_name);
}

pub fn mock_attributes(map: &mut [u8], object: usize, attributes: &[u8]) {
    let object_address = mock_object_address(map, object);
    for (i, b) in attributes.iter().enumerate() {
        map[object_address + i] = *b;
    }
}

pub fn mock_default_properties(map: &mut [u8]) {
    let words = if map[0] < 4 { 31 } else { 63 };

    let object_table = ((map[0x0a] as usize) << 8) + map[0x0b] as usize;
    for i in 0..words {
        let address = object_table + (i * 2);
        map[address] = (i as u8) % 0x10;
        map[address + 1] = i as u8;
    }
}

/// Write a property list after an object's short name.  Properties must be given in
/// descending order.
pub fn mock_properties(map: &mut [u8], object: usize, properties: &[(u8, &[u8])]) {
    let property_table_address = 0x300 + ((object - 1) * 20);
    let hl = map[property_table_address] as usize;

    let mut address = property_table_address + 1 + (hl * 2);
    for (number, data) in properties {
        let data_address = match (map[0], data.len()) {
            (3, _) => {
                map[address] = ((data.len() - 1) * 32) as u8 + *number;
                address + 1
            }
            (_, 1) => {
                map[address] = *number;
                address + 1
            }
            (_, 2) => {
                map[address] = 0x40 | *number;
                address + 1
            }
            (_, _) => {
                map[address] = 0x80 | *number;
                map[address + 1] = 0x80 | (data.len() as u8 & 0x3F);
                address + 2
            }
        };

        for (i, b) in data.iter().enumerate() {
            map[data_address + i] = *b;
        }
        address = data_address + data.len();
    }

    map[address] = 0;
}
