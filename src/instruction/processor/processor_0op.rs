use crate::{text, zmachine::header::HeaderField};

use super::*;

pub fn rtrue(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    Ok(InstructionResult::transfer(zmachine.return_routine(1)?))
}

pub fn rfalse(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    Ok(InstructionResult::transfer(zmachine.return_routine(0)?))
}

/// Print the string literal that follows the opcode
///
/// # Returns
/// [Result] with the [InstructionResult] continuing after the literal or a [RuntimeError]
pub fn print(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let ztext = zmachine.string_literal(instruction.address() + 1)?;
    let text = text::from_vec(zmachine, &ztext)?;
    zmachine.print(&text)?;
    Ok(InstructionResult::transfer(NextAddress::Address(
        instruction.next_address() + (ztext.len() * 2),
    )))
}

pub fn print_ret(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let ztext = zmachine.string_literal(instruction.address() + 1)?;
    let text = text::from_vec(zmachine, &ztext)?;
    zmachine.print(&text)?;
    zmachine.new_line()?;
    Ok(InstructionResult::transfer(zmachine.return_routine(1)?))
}

pub fn nop(
    _zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    Ok(InstructionResult::next())
}

/// SAVE: version 3 branches, version 4 stores
pub fn save(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    zmachine.save(instruction.address());
    if zmachine.version() == 3 {
        Ok(InstructionResult::branch(true))
    } else {
        Ok(InstructionResult::store(1))
    }
}

/// RESTORE: on success, execution continues as if the SAVE that made the
/// snapshot had just returned.  Version 3 branches, version 4 stores 2.
pub fn restore(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let version = zmachine.version();
    match zmachine.restore()? {
        Some(address) => {
            let result = if version == 3 {
                InstructionResult::branch(true)
            } else {
                InstructionResult::store(2)
            };
            resume_save(zmachine, address, result)
        }
        None => {
            if version == 3 {
                Ok(InstructionResult::branch(false))
            } else {
                Ok(InstructionResult::store(0))
            }
        }
    }
}

pub fn restart(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let pc = zmachine.restart()?;
    Ok(InstructionResult::transfer(NextAddress::Address(pc)))
}

pub fn ret_popped(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let value = zmachine.variable(0)?;
    Ok(InstructionResult::transfer(zmachine.return_routine(value)?))
}

pub fn pop(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    zmachine.variable(0)?;
    Ok(InstructionResult::next())
}

pub fn catch(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    Ok(InstructionResult::store(zmachine.frame_count() as u16))
}

pub fn quit(
    _zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    Ok(InstructionResult::quit())
}

pub fn new_line(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    zmachine.new_line()?;
    Ok(InstructionResult::next())
}

/// SHOW_STATUS redraws the status line in version 3 and does nothing in later versions
pub fn show_status(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    if zmachine.version() == 3 {
        zmachine.show_status()?;
    }
    Ok(InstructionResult::next())
}

pub fn verify(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let expected = zmachine.header_word(HeaderField::Checksum)?;
    let checksum = zmachine.checksum();
    debug!(target: "app::instruction", "VERIFY: checksum {:04x}, header {:04x}", checksum, expected);
    Ok(InstructionResult::branch(checksum == expected))
}

pub fn piracy(
    _zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    Ok(InstructionResult::branch(true))
}
