use crate::text;

use super::*;

/// SAVE (EXT): tables are not supported, so the whole game is saved
pub fn save(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() {
        info!(target: "app::state", "SAVE table ignored: {:?}", operands);
    }
    zmachine.save(instruction.address());
    Ok(InstructionResult::store(1))
}

pub fn restore(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() {
        info!(target: "app::state", "RESTORE table ignored: {:?}", operands);
    }
    match zmachine.restore()? {
        Some(address) => resume_save(zmachine, address, InstructionResult::store(2)),
        None => Ok(InstructionResult::store(0)),
    }
}

/// LOG_SHIFT: shift left by a positive count, logical shift right by a negative count
pub fn log_shift(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = required(&operands, 0, instruction)?;
    let places = required(&operands, 1, instruction)? as i16;
    let result = match places {
        1..=15 => value << places,
        -15..=-1 => value >> places.unsigned_abs(),
        0 => value,
        _ => 0,
    };
    Ok(InstructionResult::store(result))
}

/// ART_SHIFT: shift left by a positive count, arithmetic shift right by a negative count
pub fn art_shift(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = required(&operands, 0, instruction)? as i16;
    let places = required(&operands, 1, instruction)? as i16;
    let result = match places {
        1..=15 => value << places,
        -15..=-1 => value >> places.unsigned_abs(),
        0 => value,
        _ if places > 0 || value >= 0 => 0,
        _ => -1,
    };
    Ok(InstructionResult::store(result as u16))
}

pub fn set_font(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let font = required(&operands, 0, instruction)?;
    Ok(InstructionResult::store(zmachine.set_font(font)?))
}

pub fn save_undo(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    if zmachine.save_undo(instruction.address()) {
        Ok(InstructionResult::store(1))
    } else {
        Ok(InstructionResult::store(0))
    }
}

/// RESTORE_UNDO: continue after the SAVE_UNDO that recorded the state, which now stores 2
pub fn restore_undo(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    match zmachine.restore_undo()? {
        Some(address) => resume_save(zmachine, address, InstructionResult::store(2)),
        None => Ok(InstructionResult::store(0)),
    }
}

pub fn print_unicode(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let code = required(&operands, 0, instruction)?;
    match char::from_u32(code as u32) {
        Some(c) => zmachine.print_unicode(c)?,
        None => zmachine.print(&[b'?' as u16])?,
    }
    Ok(InstructionResult::next())
}

/// CHECK_UNICODE: bit 0 set if the character can be printed, bit 1 if it can be read
pub fn check_unicode(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let code = required(&operands, 0, instruction)?;
    let result = match char::from_u32(code as u32) {
        Some(c) if text::char_to_zscii(c).is_some() => 3,
        Some(c) if !c.is_control() => 1,
        _ => 0,
    };
    Ok(InstructionResult::store(result))
}
