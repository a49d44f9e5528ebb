use crate::{
    object::{self, property},
    text,
};

use super::*;

pub fn jz(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let a = required(&operands, 0, instruction)?;
    Ok(InstructionResult::branch(a == 0))
}

pub fn get_sibling(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let sibling = object::sibling(zmachine, required(&operands, 0, instruction)? as usize)?;
    Ok(InstructionResult::store_branch(sibling as u16, sibling != 0))
}

pub fn get_child(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let child = object::child(zmachine, required(&operands, 0, instruction)? as usize)?;
    Ok(InstructionResult::store_branch(child as u16, child != 0))
}

pub fn get_parent(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let parent = object::parent(zmachine, required(&operands, 0, instruction)? as usize)?;
    Ok(InstructionResult::store(parent as u16))
}

pub fn get_prop_len(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let length =
        property::property_length(zmachine, required(&operands, 0, instruction)? as usize)?;
    Ok(InstructionResult::store(length as u16))
}

/// INC: the operand names a variable, which is updated in place
pub fn inc(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = required(&operands, 0, instruction)? as u8;
    let value = zmachine.peek_variable(variable)? as i16;
    zmachine.set_variable_indirect(variable, value.wrapping_add(1) as u16)?;
    Ok(InstructionResult::next())
}

pub fn dec(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = required(&operands, 0, instruction)? as u8;
    let value = zmachine.peek_variable(variable)? as i16;
    zmachine.set_variable_indirect(variable, value.wrapping_sub(1) as u16)?;
    Ok(InstructionResult::next())
}

pub fn print_addr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text = text::as_text(zmachine, required(&operands, 0, instruction)? as usize)?;
    zmachine.print(&text)?;
    Ok(InstructionResult::next())
}

pub fn call_1s(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    call_fn(zmachine, instruction, required(&operands, 0, instruction)?, &[])
}

pub fn remove_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    object::remove(zmachine, required(&operands, 0, instruction)? as usize)?;
    Ok(InstructionResult::next())
}

pub fn print_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let name = object::short_name(zmachine, required(&operands, 0, instruction)? as usize)?;
    zmachine.print(&name)?;
    Ok(InstructionResult::next())
}

pub fn ret(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = required(&operands, 0, instruction)?;
    Ok(InstructionResult::transfer(zmachine.return_routine(value)?))
}

/// JUMP: the operand is a signed offset, with the same bias as a branch offset
pub fn jump(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let offset = required(&operands, 0, instruction)? as i16;
    let address = (instruction.next_address() as isize) + (offset as isize) - 2;
    if address < 0 {
        return fatal_error!(
            ErrorCode::InvalidInstruction,
            "JUMP at ${:05x} to invalid address ${:x}",
            instruction.address(),
            address
        );
    }

    Ok(InstructionResult::transfer(NextAddress::Address(
        address as usize,
    )))
}

pub fn print_paddr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_string_address(required(&operands, 0, instruction)?);
    let text = text::as_text(zmachine, address)?;
    zmachine.print(&text)?;
    Ok(InstructionResult::next())
}

pub fn load(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(required(&operands, 0, instruction)? as u8)?;
    Ok(InstructionResult::store(value))
}

pub fn not(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    Ok(InstructionResult::store(!required(&operands, 0, instruction)?))
}

pub fn call_1n(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    call_fn(zmachine, instruction, required(&operands, 0, instruction)?, &[])
}
