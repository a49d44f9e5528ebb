use crate::{error::*, fatal_error, zmachine::ZMachine};

use super::*;

mod processor_0op;
mod processor_1op;
mod processor_2op;
mod processor_ext;
mod processor_var;

type Handler = fn(&mut ZMachine, &Instruction) -> Result<InstructionResult, RuntimeError>;

fn operand_value(zmachine: &mut ZMachine, operand: &Operand) -> Result<u16, RuntimeError> {
    match operand.operand_type() {
        OperandType::SmallConstant | OperandType::LargeConstant => Ok(operand.value()),
        OperandType::Variable => zmachine.variable(operand.value() as u8),
    }
}

/// Resolve operand values, in order.
///
/// Variable operands are read once; stack operands pop.
fn operand_values(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<Vec<u16>, RuntimeError> {
    let mut v = Vec::new();
    let mut l = "Operand values:".to_string();
    for o in instruction.operands() {
        let value = operand_value(zmachine, o)?;
        match o.operand_type() {
            OperandType::SmallConstant => l.push_str(&format!(" #{:02x}", value as u8)),
            _ => l.push_str(&format!(" #{:04x}", value)),
        }
        v.push(value)
    }
    if !v.is_empty() {
        debug!(target: "app::instruction", "{}", l);
    }
    Ok(v)
}

/// Get an operand value that the instruction requires
fn required(values: &[u16], index: usize, instruction: &Instruction) -> Result<u16, RuntimeError> {
    match values.get(index) {
        Some(v) => Ok(*v),
        None => fatal_error!(
            ErrorCode::InvalidInstruction,
            "{} at ${:05x} is missing operand {}",
            instruction.opcode(),
            instruction.address(),
            index + 1
        ),
    }
}

/// Apply an [InstructionResult]: store the value, then branch or continue.
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `instruction` - The instruction that produced the result
/// * `result` - Outcome reported by the instruction handler
///
/// # Returns
/// [Result] with the [NextAddress] to execute or a [RuntimeError]
pub fn complete(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    result: InstructionResult,
) -> Result<NextAddress, RuntimeError> {
    if let Some(next) = result.next_address() {
        return Ok(next);
    }

    if let (Some(value), Some(store)) = (result.value(), instruction.store()) {
        zmachine.set_variable(store.variable(), value)?;
    }

    match (result.condition(), instruction.branch()) {
        (Some(condition), Some(branch)) if condition == branch.condition() => {
            match branch.target() {
                BranchTarget::ReturnFalse => zmachine.return_routine(0),
                BranchTarget::ReturnTrue => zmachine.return_routine(1),
                BranchTarget::Address(address) => Ok(NextAddress::Address(address)),
            }
        }
        _ => Ok(NextAddress::Address(instruction.next_address())),
    }
}

/// Call a routine from a packed address
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `instruction` - The calling instruction
/// * `packed_address` - Packed routine address, 0 for a call that just returns false
/// * `arguments` - Call arguments
///
/// # Returns
/// [Result] with the [InstructionResult] transferring to the routine or a [RuntimeError]
fn call_fn(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    packed_address: u16,
    arguments: &[u16],
) -> Result<InstructionResult, RuntimeError> {
    let address = zmachine.packed_routine_address(packed_address);
    let next = zmachine.call_routine(
        address,
        arguments,
        instruction.store().copied(),
        instruction.next_address(),
    )?;
    Ok(InstructionResult::transfer(next))
}

/// Resume after a successful restore by completing the SAVE instruction that made the snapshot
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `address` - Address of the SAVE instruction
/// * `result` - Result to complete the SAVE instruction with
///
/// # Returns
/// [Result] with the [InstructionResult] transferring to the instruction after the SAVE or a [RuntimeError]
fn resume_save(
    zmachine: &mut ZMachine,
    address: usize,
    result: InstructionResult,
) -> Result<InstructionResult, RuntimeError> {
    let save = decoder::decode_instruction(zmachine, address)?;
    info!(target: "app::state", "Resuming after {} at ${:05x}", save.opcode(), address);
    let next = complete(zmachine, &save, result)?;
    Ok(InstructionResult::transfer(next))
}

fn unimplemented(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<InstructionResult, RuntimeError> {
    fatal_error!(
        ErrorCode::UnimplementedInstruction,
        "Unimplemented instruction for version {}: {}",
        zmachine.version(),
        instruction.opcode()
    )
}

/// Look up the handler for an EXT opcode
fn ext_handler(version: u8, instruction: u8) -> Option<Handler> {
    if version < 5 {
        return None;
    }

    let handler: Handler = match instruction {
        0x00 => processor_ext::save,
        0x01 => processor_ext::restore,
        0x02 => processor_ext::log_shift,
        0x03 => processor_ext::art_shift,
        0x04 => processor_ext::set_font,
        0x09 => processor_ext::save_undo,
        0x0a => processor_ext::restore_undo,
        0x0b => processor_ext::print_unicode,
        0x0c => processor_ext::check_unicode,
        _ => return None,
    };

    Some(handler)
}

/// Look up the handler for an opcode, by operand count class and story version
fn handler(version: u8, operand_count: OperandCount, instruction: u8) -> Option<Handler> {
    let handler: Handler = match operand_count {
        OperandCount::_0OP => match (instruction, version) {
            (0x0, _) => processor_0op::rtrue,
            (0x1, _) => processor_0op::rfalse,
            (0x2, _) => processor_0op::print,
            (0x3, _) => processor_0op::print_ret,
            (0x4, _) => processor_0op::nop,
            (0x5, 3..=4) => processor_0op::save,
            (0x6, 3..=4) => processor_0op::restore,
            (0x7, _) => processor_0op::restart,
            (0x8, _) => processor_0op::ret_popped,
            (0x9, 3..=4) => processor_0op::pop,
            (0x9, _) => processor_0op::catch,
            (0xa, _) => processor_0op::quit,
            (0xb, _) => processor_0op::new_line,
            (0xc, _) => processor_0op::show_status,
            (0xd, _) => processor_0op::verify,
            (0xf, 5..) => processor_0op::piracy,
            _ => return None,
        },
        OperandCount::_1OP => match (instruction, version) {
            (0x0, _) => processor_1op::jz,
            (0x1, _) => processor_1op::get_sibling,
            (0x2, _) => processor_1op::get_child,
            (0x3, _) => processor_1op::get_parent,
            (0x4, _) => processor_1op::get_prop_len,
            (0x5, _) => processor_1op::inc,
            (0x6, _) => processor_1op::dec,
            (0x7, _) => processor_1op::print_addr,
            (0x8, 4..) => processor_1op::call_1s,
            (0x9, _) => processor_1op::remove_obj,
            (0xa, _) => processor_1op::print_obj,
            (0xb, _) => processor_1op::ret,
            (0xc, _) => processor_1op::jump,
            (0xd, _) => processor_1op::print_paddr,
            (0xe, _) => processor_1op::load,
            (0xf, 3..=4) => processor_1op::not,
            (0xf, _) => processor_1op::call_1n,
            _ => return None,
        },
        OperandCount::_2OP => match (instruction, version) {
            (0x01, _) => processor_2op::je,
            (0x02, _) => processor_2op::jl,
            (0x03, _) => processor_2op::jg,
            (0x04, _) => processor_2op::dec_chk,
            (0x05, _) => processor_2op::inc_chk,
            (0x06, _) => processor_2op::jin,
            (0x07, _) => processor_2op::test,
            (0x08, _) => processor_2op::or,
            (0x09, _) => processor_2op::and,
            (0x0a, _) => processor_2op::test_attr,
            (0x0b, _) => processor_2op::set_attr,
            (0x0c, _) => processor_2op::clear_attr,
            (0x0d, _) => processor_2op::store,
            (0x0e, _) => processor_2op::insert_obj,
            (0x0f, _) => processor_2op::loadw,
            (0x10, _) => processor_2op::loadb,
            (0x11, _) => processor_2op::get_prop,
            (0x12, _) => processor_2op::get_prop_addr,
            (0x13, _) => processor_2op::get_next_prop,
            (0x14, _) => processor_2op::add,
            (0x15, _) => processor_2op::sub,
            (0x16, _) => processor_2op::mul,
            (0x17, _) => processor_2op::div,
            (0x18, _) => processor_2op::modulus,
            (0x19, 4..) => processor_2op::call_2s,
            (0x1a, 5..) => processor_2op::call_2n,
            (0x1b, 5..) => processor_2op::set_colour,
            (0x1c, 5..) => processor_2op::throw,
            _ => return None,
        },
        OperandCount::_VAR => match (instruction, version) {
            (0x00, _) => processor_var::call_vs,
            (0x01, _) => processor_var::storew,
            (0x02, _) => processor_var::storeb,
            (0x03, _) => processor_var::put_prop,
            (0x04, _) => processor_var::read,
            (0x05, _) => processor_var::print_char,
            (0x06, _) => processor_var::print_num,
            (0x07, _) => processor_var::random,
            (0x08, _) => processor_var::push,
            (0x09, _) => processor_var::pull,
            (0x0a, _) => processor_var::split_window,
            (0x0b, _) => processor_var::set_window,
            (0x0c, 4..) => processor_var::call_vs2,
            (0x0d, 4..) => processor_var::erase_window,
            (0x0e, 4..) => processor_var::erase_line,
            (0x0f, 4..) => processor_var::set_cursor,
            (0x10, 4..) => processor_var::get_cursor,
            (0x11, 4..) => processor_var::set_text_style,
            (0x12, 4..) => processor_var::buffer_mode,
            (0x13, _) => processor_var::output_stream,
            (0x14, _) => processor_var::input_stream,
            (0x15, _) => processor_var::sound_effect,
            (0x16, 4..) => processor_var::read_char,
            (0x17, 4..) => processor_var::scan_table,
            (0x18, 5..) => processor_var::not,
            (0x19, 5..) => processor_var::call_vn,
            (0x1a, 5..) => processor_var::call_vn2,
            (0x1b, 5..) => processor_var::tokenise,
            (0x1c, 5..) => processor_var::encode_text,
            (0x1d, 5..) => processor_var::copy_table,
            (0x1e, 5..) => processor_var::print_table,
            (0x1f, 5..) => processor_var::check_arg_count,
            _ => return None,
        },
    };

    Some(handler)
}

/// Execute an instruction
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `instruction` - Decoded instruction
///
/// # Returns
/// [Result] with the [NextAddress] to execute or a [RuntimeError]
pub fn dispatch(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let version = zmachine.version();
    let opcode = instruction.opcode();
    let handler = match opcode.form() {
        OpcodeForm::Ext => ext_handler(version, opcode.instruction()),
        _ => handler(version, opcode.operand_count(), opcode.instruction()),
    }
    .unwrap_or(unimplemented);

    let result = handler(zmachine, instruction)?;
    complete(zmachine, instruction, result)
}
