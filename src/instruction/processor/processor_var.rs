use crate::{
    dictionary,
    object::property,
    text,
    zmachine::{header::HeaderField, io::LineInput},
};

use super::*;

fn lower_case(c: u16) -> u16 {
    match c {
        0x41..=0x5A => c + 0x20,
        _ => c,
    }
}

pub fn call_vs(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = required(&operands, 0, instruction)?;
    call_fn(zmachine, instruction, address, &operands[1..])
}

pub fn storew(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let array = required(&operands, 0, instruction)?;
    let index = required(&operands, 1, instruction)?;
    let value = required(&operands, 2, instruction)?;
    zmachine.write_word(array.wrapping_add(index.wrapping_mul(2)) as usize, value)?;
    Ok(InstructionResult::next())
}

pub fn storeb(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let array = required(&operands, 0, instruction)?;
    let index = required(&operands, 1, instruction)?;
    let value = required(&operands, 2, instruction)?;
    zmachine.write_byte(array.wrapping_add(index) as usize, value as u8)?;
    Ok(InstructionResult::next())
}

pub fn put_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    property::set_property(
        zmachine,
        required(&operands, 0, instruction)? as usize,
        required(&operands, 1, instruction)? as u8,
        required(&operands, 2, instruction)?,
    )?;
    Ok(InstructionResult::next())
}

/// Timed input parameters from the optional third and fourth operands
///
/// # Returns
/// Tuple (timeout, interrupt routine address); the timeout is 0 without a routine
fn timed_input(zmachine: &ZMachine, operands: &[u16], index: usize) -> (u16, usize) {
    match (operands.get(index), operands.get(index + 1)) {
        (Some(timeout), Some(routine)) if *timeout > 0 && *routine > 0 => {
            (*timeout, zmachine.packed_routine_address(*routine))
        }
        _ => (0, 0),
    }
}

/// Read a line, running the interrupt routine each time the request times out
///
/// # Returns
/// [Result] with the [LineInput], with terminator 0 if the interrupt routine abandoned the input, or a [RuntimeError]
fn read_line(
    zmachine: &mut ZMachine,
    existing: &str,
    max_length: usize,
    timeout: u16,
    routine: usize,
) -> Result<LineInput, RuntimeError> {
    let mut existing = existing.to_string();
    loop {
        let input = zmachine.read_line(&existing, max_length, timeout)?;
        if !input.is_timeout() || routine == 0 {
            return Ok(input);
        }

        if zmachine.call_interrupt(routine)? != 0 {
            debug!(target: "app::instruction", "READ abandoned by interrupt ${:05x}", routine);
            return Ok(LineInput::timed_out(""));
        }
        existing = input.text().to_string();
    }
}

/// SREAD/AREAD: read a line of input into the text buffer and tokenize it into the parse buffer
pub fn read(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text_buffer = required(&operands, 0, instruction)? as usize;
    let parse_buffer = operands.get(1).copied().unwrap_or(0) as usize;
    let (timeout, routine) = timed_input(zmachine, &operands, 2);
    let version = zmachine.version();

    if version == 3 {
        zmachine.show_status()?;
    }

    let capacity = zmachine.read_byte(text_buffer)? as usize;
    let (max_length, existing) = if version < 5 {
        (capacity.saturating_sub(1), String::new())
    } else {
        let n = usize::min(zmachine.read_byte(text_buffer + 1)? as usize, capacity);
        let existing: Vec<u16> = zmachine
            .memory_slice(text_buffer + 2, n)
            .iter()
            .map(|b| *b as u16)
            .collect();
        (capacity, text::zscii_to_string(&existing))
    };

    let input = read_line(zmachine, &existing, max_length, timeout, routine)?;
    let line: Vec<u16> = input
        .text()
        .chars()
        .filter_map(text::char_to_zscii)
        .filter(|c| *c != 13)
        .map(lower_case)
        .take(max_length)
        .collect();
    debug!(target: "app::instruction", "READ: {:?}, terminator {}", input.text(), input.terminator());

    if version < 5 {
        for (i, c) in line.iter().enumerate() {
            zmachine.write_byte(text_buffer + 1 + i, *c as u8)?;
        }
        zmachine.write_byte(text_buffer + 1 + line.len(), 0)?;
    } else {
        zmachine.write_byte(text_buffer + 1, line.len() as u8)?;
        for (i, c) in line.iter().enumerate() {
            zmachine.write_byte(text_buffer + 2 + i, *c as u8)?;
        }
    }

    if parse_buffer > 0 && !input.is_timeout() {
        let dictionary = zmachine.header_word(HeaderField::Dictionary)? as usize;
        dictionary::parse_text(zmachine, text_buffer, parse_buffer, dictionary, false)?;
    }

    Ok(InstructionResult::store(input.terminator()))
}

pub fn print_char(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.print(&[required(&operands, 0, instruction)?])?;
    Ok(InstructionResult::next())
}

pub fn print_num(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let n = required(&operands, 0, instruction)? as i16;
    zmachine.print_str(&n.to_string())?;
    Ok(InstructionResult::next())
}

/// RANDOM: a positive range returns 1..=range; otherwise the generator is reseeded and 0 stored
pub fn random(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let range = required(&operands, 0, instruction)? as i16;
    if range > 0 {
        return Ok(InstructionResult::store(zmachine.random(range as u16)));
    }

    let seed = range.unsigned_abs();
    if range == 0 || seed >= 1000 {
        zmachine.seed(seed);
    } else {
        zmachine.predictable(seed);
    }
    Ok(InstructionResult::store(0))
}

pub fn push(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.push(required(&operands, 0, instruction)?)?;
    Ok(InstructionResult::next())
}

/// PULL: pop the stack into a variable, writing the stack in place
pub fn pull(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = required(&operands, 0, instruction)? as u8;
    let value = zmachine.variable(0)?;
    zmachine.set_variable_indirect(variable, value)?;
    Ok(InstructionResult::next())
}

pub fn split_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match required(&operands, 0, instruction)? {
        0 => zmachine.terminal().close_upper_window(),
        lines => zmachine.terminal().open_upper_window(lines),
    }
    Ok(InstructionResult::next())
}

pub fn set_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine
        .terminal()
        .set_window(required(&operands, 0, instruction)?);
    Ok(InstructionResult::next())
}

pub fn call_vs2(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = required(&operands, 0, instruction)?;
    call_fn(zmachine, instruction, address, &operands[1..])
}

pub fn erase_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let window = required(&operands, 0, instruction)? as i16;
    zmachine.terminal().clear_window(window);
    Ok(InstructionResult::next())
}

pub fn erase_line(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if required(&operands, 0, instruction)? == 1 {
        zmachine.terminal().erase_line();
    }
    Ok(InstructionResult::next())
}

pub fn set_cursor(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let row = required(&operands, 0, instruction)?;
    let column = required(&operands, 1, instruction)?;
    // The cursor can only be moved in the upper window
    zmachine.terminal().move_cursor(1, row, column);
    Ok(InstructionResult::next())
}

pub fn get_cursor(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let array = required(&operands, 0, instruction)? as usize;
    let (row, column) = zmachine.terminal().cursor();
    zmachine.write_word(array, row)?;
    zmachine.write_word(array + 2, column)?;
    Ok(InstructionResult::next())
}

pub fn set_text_style(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine
        .terminal()
        .set_text_style(required(&operands, 0, instruction)?);
    Ok(InstructionResult::next())
}

pub fn buffer_mode(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine
        .terminal()
        .buffer_mode(required(&operands, 0, instruction)?);
    Ok(InstructionResult::next())
}

pub fn output_stream(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let stream = required(&operands, 0, instruction)? as i16;
    let table = operands.get(1).map(|t| *t as usize);
    zmachine.output_stream(stream, table)?;
    Ok(InstructionResult::next())
}

pub fn input_stream(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    info!(target: "app::stream", "INPUT_STREAM {:?} ignored", operands.first());
    Ok(InstructionResult::next())
}

/// SOUND_EFFECT: only the built-in bleeps are supported
pub fn sound_effect(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    match operands.first() {
        None | Some(1) | Some(2) => zmachine.terminal().beep(),
        Some(n) => info!(target: "app::instruction", "SOUND_EFFECT {} ignored", n),
    }
    Ok(InstructionResult::next())
}

pub fn read_char(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let (timeout, routine) = timed_input(zmachine, &operands, 1);
    loop {
        match zmachine.read_key(timeout)? {
            Some(c) => {
                let zscii = text::char_to_zscii(c).unwrap_or('?' as u16);
                return Ok(InstructionResult::store(zscii));
            }
            None => {
                if routine == 0 || zmachine.call_interrupt(routine)? != 0 {
                    return Ok(InstructionResult::store(0));
                }
            }
        }
    }
}

/// SCAN_TABLE: search a table of word or byte entries for a value
///
/// The optional form operand selects word entries with bit 7 and gives the entry length in bits 0-6.
///
/// # Returns
/// [Result] storing the address of the matching entry, or 0, and branching if found
pub fn scan_table(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = required(&operands, 0, instruction)?;
    let table = required(&operands, 1, instruction)? as usize;
    let length = required(&operands, 2, instruction)? as usize;
    let form = operands.get(3).copied().unwrap_or(0x82);
    let entry_size = (form & 0x7F) as usize;

    for i in 0..length {
        let address = table + (i * entry_size);
        let entry = if form & 0x80 == 0x80 {
            zmachine.read_word(address)?
        } else {
            zmachine.read_byte(address)? as u16
        };

        if entry == value {
            return Ok(InstructionResult::store_branch(address as u16, true));
        }
    }

    Ok(InstructionResult::store_branch(0, false))
}

pub fn not(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    Ok(InstructionResult::store(!required(&operands, 0, instruction)?))
}

pub fn call_vn(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = required(&operands, 0, instruction)?;
    call_fn(zmachine, instruction, address, &operands[1..])
}

pub fn call_vn2(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = required(&operands, 0, instruction)?;
    call_fn(zmachine, instruction, address, &operands[1..])
}

pub fn tokenise(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text_buffer = required(&operands, 0, instruction)? as usize;
    let parse_buffer = required(&operands, 1, instruction)? as usize;
    let dictionary = match operands.get(2) {
        Some(d) if *d > 0 => *d as usize,
        _ => zmachine.header_word(HeaderField::Dictionary)? as usize,
    };
    let skip_unknown = operands.get(3).is_some_and(|f| *f != 0);

    dictionary::parse_text(zmachine, text_buffer, parse_buffer, dictionary, skip_unknown)?;
    Ok(InstructionResult::next())
}

pub fn encode_text(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text_buffer = required(&operands, 0, instruction)? as usize;
    let length = required(&operands, 1, instruction)? as usize;
    let from = required(&operands, 2, instruction)? as usize;
    let coded_text = required(&operands, 3, instruction)? as usize;

    let text: Vec<u16> = zmachine
        .memory_slice(text_buffer + from, length)
        .iter()
        .map(|b| lower_case(*b as u16))
        .collect();
    let encoded = dictionary::encode_token(zmachine, &text);
    for (i, w) in encoded.iter().enumerate() {
        zmachine.write_word(coded_text + (i * 2), *w)?;
    }

    Ok(InstructionResult::next())
}

/// COPY_TABLE: zero `first` when `second` is 0.  Otherwise copy `first` to `second` so that an
/// overlapping copy is not corrupted, unless the size is negative, which forces a forward copy.
pub fn copy_table(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let first = required(&operands, 0, instruction)? as usize;
    let second = required(&operands, 1, instruction)? as usize;
    let size = required(&operands, 2, instruction)? as i16;
    let length = size.unsigned_abs() as usize;

    if second == 0 {
        for i in 0..length {
            zmachine.write_byte(first + i, 0)?;
        }
    } else if size > 0 && second > first && second < first + length {
        for i in (0..length).rev() {
            let b = zmachine.read_byte(first + i)?;
            zmachine.write_byte(second + i, b)?;
        }
    } else {
        for i in 0..length {
            let b = zmachine.read_byte(first + i)?;
            zmachine.write_byte(second + i, b)?;
        }
    }

    Ok(InstructionResult::next())
}

/// PRINT_TABLE: print a rectangle of ZSCII text, each row starting at the column of the first
pub fn print_table(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let table = required(&operands, 0, instruction)? as usize;
    let width = required(&operands, 1, instruction)? as usize;
    let height = operands.get(2).copied().unwrap_or(1) as usize;
    let skip = operands.get(3).copied().unwrap_or(0) as usize;

    let (_, column) = zmachine.terminal().cursor();
    for row in 0..height {
        if row > 0 {
            zmachine.new_line()?;
            zmachine.print(&vec![0x20; column.saturating_sub(1) as usize])?;
        }
        let text: Vec<u16> = zmachine
            .memory_slice(table + (row * (width + skip)), width)
            .iter()
            .map(|b| *b as u16)
            .collect();
        zmachine.print(&text)?;
    }

    Ok(InstructionResult::next())
}

pub fn check_arg_count(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let n = required(&operands, 0, instruction)?;
    Ok(InstructionResult::branch(
        zmachine.argument_count()? as u16 >= n,
    ))
}
