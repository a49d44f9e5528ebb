//! Story file [header](https://inform-fiction.org/zmachine/standards/z1point1/sect11.html)
use crate::error::RuntimeError;

use super::memory::Memory;

#[derive(Clone, Copy, Debug)]
pub enum HeaderField {
    Version = 0x00,
    Flags1 = 0x01,
    Release = 0x02,
    HighMark = 0x04,
    InitialPC = 0x06,
    Dictionary = 0x08,
    ObjectTable = 0x0A,
    GlobalTable = 0x0C,
    StaticMark = 0x0E,
    Flags2 = 0x10,
    Serial = 0x12,
    AbbreviationsTable = 0x18,
    FileLength = 0x1A,
    Checksum = 0x1C,
    InterpreterNumber = 0x1E,
    InterpreterVersion = 0x1F,
    ScreenLines = 0x20,
    ScreenColumns = 0x21,
    ScreenWidth = 0x22,
    ScreenHeight = 0x24,
    FontWidth = 0x26,
    FontHeight = 0x27,
    DefaultBackground = 0x2C,
    DefaultForeground = 0x2D,
    Revision = 0x32,
}

pub enum Flags1v3 {
    StatusLineType = 0x02,         // bit 1
    StatusLineNotAvailable = 0x10, // bit 4
    ScreenSplitAvailable = 0x20,   // bit 5
    VariablePitchDefault = 0x40,   // bit 6
}

pub enum Flags1v4 {
    ColoursAvailable = 0x01,    // bit 0
    BoldfaceAvailable = 0x04,   // bit 2
    ItalicAvailable = 0x08,     // bit 3
    FixedSpaceAvailable = 0x10, // bit 4
    TimedInputAvailable = 0x80, // bit 7
}

#[derive(Debug)]
pub enum Flags2 {
    Transcripting = 0x0001,   // bit 0
    ForceFixedPitch = 0x0002, // bit 1
}

pub fn field_byte(memory: &Memory, field: HeaderField) -> Result<u8, RuntimeError> {
    memory.read_byte(field as usize)
}

pub fn field_word(memory: &Memory, field: HeaderField) -> Result<u16, RuntimeError> {
    memory.read_word(field as usize)
}

pub fn set_byte(memory: &mut Memory, field: HeaderField, value: u8) -> Result<(), RuntimeError> {
    debug!(target: "app::state", "Header {:?} <- {:#04x}", field, value);
    memory.write_byte(field as usize, value)
}

pub fn set_word(memory: &mut Memory, field: HeaderField, value: u16) -> Result<(), RuntimeError> {
    debug!(target: "app::state", "Header {:?} <- {:#06x}", field, value);
    memory.write_word(field as usize, value)
}

/// Test a Flags 1 bit
///
/// # Arguments
/// * `memory` - Memory map
/// * `flag` - flag bit mask
///
/// # Returns
/// [Result] with `true` if the flag is set, `false` if not, or a [RuntimeError]
pub fn flag1(memory: &Memory, flag: u8) -> Result<bool, RuntimeError> {
    Ok(field_byte(memory, HeaderField::Flags1)? & flag == flag)
}

pub fn set_flag1(memory: &mut Memory, flag: u8) -> Result<(), RuntimeError> {
    let flags = field_byte(memory, HeaderField::Flags1)?;
    set_byte(memory, HeaderField::Flags1, flags | flag)
}

pub fn clear_flag1(memory: &mut Memory, flag: u8) -> Result<(), RuntimeError> {
    let flags = field_byte(memory, HeaderField::Flags1)?;
    set_byte(memory, HeaderField::Flags1, flags & !flag)
}

pub fn flag2(memory: &Memory, flag: Flags2) -> Result<bool, RuntimeError> {
    let flag = flag as u16;
    Ok(field_word(memory, HeaderField::Flags2)? & flag == flag)
}

pub fn set_flag2(memory: &mut Memory, flag: Flags2) -> Result<(), RuntimeError> {
    let flags = field_word(memory, HeaderField::Flags2)?;
    set_word(memory, HeaderField::Flags2, flags | flag as u16)
}

pub fn clear_flag2(memory: &mut Memory, flag: Flags2) -> Result<(), RuntimeError> {
    let flags = field_word(memory, HeaderField::Flags2)?;
    set_word(memory, HeaderField::Flags2, flags & !(flag as u16))
}
