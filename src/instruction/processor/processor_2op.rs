use crate::{
    object::{self, attribute, property},
    recoverable_error,
};

use super::*;

/// Resolve the two operands every 2OP instruction requires
fn operands_2(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<(u16, u16), RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    Ok((
        required(&operands, 0, instruction)?,
        required(&operands, 1, instruction)?,
    ))
}

/// JE: branch if the first operand equals any of the others
pub fn je(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let a = required(&operands, 0, instruction)?;
    required(&operands, 1, instruction)?;
    Ok(InstructionResult::branch(
        operands[1..].iter().any(|b| *b == a),
    ))
}

pub fn jl(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::branch((a as i16) < (b as i16)))
}

pub fn jg(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::branch((a as i16) > (b as i16)))
}

pub fn dec_chk(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (variable, b) = operands_2(zmachine, instruction)?;
    let value = (zmachine.peek_variable(variable as u8)? as i16).wrapping_sub(1);
    zmachine.set_variable_indirect(variable as u8, value as u16)?;
    Ok(InstructionResult::branch(value < b as i16))
}

pub fn inc_chk(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (variable, b) = operands_2(zmachine, instruction)?;
    let value = (zmachine.peek_variable(variable as u8)? as i16).wrapping_add(1);
    zmachine.set_variable_indirect(variable as u8, value as u16)?;
    Ok(InstructionResult::branch(value > b as i16))
}

pub fn jin(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    let parent = object::parent(zmachine, a as usize)?;
    Ok(InstructionResult::branch(parent == b as usize))
}

pub fn test(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (bitmap, flags) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::branch(bitmap & flags == flags))
}

pub fn or(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::store(a | b))
}

pub fn and(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::store(a & b))
}

pub fn test_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, attribute) = operands_2(zmachine, instruction)?;
    let value = attribute::value(zmachine, object as usize, attribute as u8)?;
    Ok(InstructionResult::branch(value))
}

pub fn set_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, attribute) = operands_2(zmachine, instruction)?;
    attribute::set(zmachine, object as usize, attribute as u8)?;
    Ok(InstructionResult::next())
}

pub fn clear_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, attribute) = operands_2(zmachine, instruction)?;
    attribute::clear(zmachine, object as usize, attribute as u8)?;
    Ok(InstructionResult::next())
}

/// STORE: the first operand names a variable, which is written in place
pub fn store(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (variable, value) = operands_2(zmachine, instruction)?;
    zmachine.set_variable_indirect(variable as u8, value)?;
    Ok(InstructionResult::next())
}

pub fn insert_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, destination) = operands_2(zmachine, instruction)?;
    object::insert(zmachine, object as usize, destination as usize)?;
    Ok(InstructionResult::next())
}

pub fn loadw(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (array, index) = operands_2(zmachine, instruction)?;
    let address = array.wrapping_add(index.wrapping_mul(2)) as usize;
    Ok(InstructionResult::store(zmachine.read_word(address)?))
}

pub fn loadb(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (array, index) = operands_2(zmachine, instruction)?;
    let address = array.wrapping_add(index) as usize;
    Ok(InstructionResult::store(zmachine.read_byte(address)? as u16))
}

pub fn get_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, property) = operands_2(zmachine, instruction)?;
    let value = property::property(zmachine, object as usize, property as u8)?;
    Ok(InstructionResult::store(value))
}

pub fn get_prop_addr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, property) = operands_2(zmachine, instruction)?;
    let address = property::property_data_address(zmachine, object as usize, property as u8)?;
    Ok(InstructionResult::store(address as u16))
}

pub fn get_next_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (object, property) = operands_2(zmachine, instruction)?;
    let next = property::next_property(zmachine, object as usize, property as u8)?;
    Ok(InstructionResult::store(next as u16))
}

pub fn add(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::store(
        (a as i16).wrapping_add(b as i16) as u16,
    ))
}

pub fn sub(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::store(
        (a as i16).wrapping_sub(b as i16) as u16,
    ))
}

pub fn mul(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::store(
        (a as i16).wrapping_mul(b as i16) as u16,
    ))
}

pub fn div(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    if b == 0 {
        return recoverable_error!(ErrorCode::DivideByZero, "Divide by zero");
    }

    Ok(InstructionResult::store(
        (a as i16).wrapping_div(b as i16) as u16,
    ))
}

pub fn modulus(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (a, b) = operands_2(zmachine, instruction)?;
    if b == 0 {
        return recoverable_error!(ErrorCode::DivideByZero, "Modulo by zero");
    }

    Ok(InstructionResult::store(
        (a as i16).wrapping_rem(b as i16) as u16,
    ))
}

pub fn call_2s(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (address, argument) = operands_2(zmachine, instruction)?;
    call_fn(zmachine, instruction, address, &[argument])
}

pub fn call_2n(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (address, argument) = operands_2(zmachine, instruction)?;
    call_fn(zmachine, instruction, address, &[argument])
}

pub fn set_colour(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (foreground, background) = operands_2(zmachine, instruction)?;
    zmachine.terminal().set_colours(foreground, background);
    Ok(InstructionResult::next())
}

/// THROW: unwind to the frame recorded by CATCH and return from it
pub fn throw(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<InstructionResult, RuntimeError> {
    let (value, depth) = operands_2(zmachine, instruction)?;
    Ok(InstructionResult::transfer(zmachine.throw(depth, value)?))
}
