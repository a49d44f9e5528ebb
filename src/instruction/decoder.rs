//! Instruction [decoder](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html)
use super::*;
use crate::{
    error::*,
    fatal_error,
    zmachine::{memory, ZMachine},
};

/// Longest possible instruction: EXT opcode, two type bytes, 8 large operands, store and branch
const MAX_INSTRUCTION_LENGTH: usize = 23;

fn byte(bytes: &[u8], offset: usize) -> Result<u8, RuntimeError> {
    match bytes.get(offset) {
        Some(b) => Ok(*b),
        None => fatal_error!(
            ErrorCode::InvalidInstruction,
            "Instruction runs past the end of memory at offset {}",
            offset
        ),
    }
}

fn operand_type(type_byte: u8, operand_index: u8) -> Option<OperandType> {
    // Types are packed in the byte: 00112233
    let t = (type_byte >> (6 - (operand_index * 2))) & 3;
    match t {
        0 => Some(OperandType::LargeConstant),
        1 => Some(OperandType::SmallConstant),
        2 => Some(OperandType::Variable),
        _ => None,
    }
}

fn long_operand_type(opcode: u8, index: u8) -> OperandType {
    if opcode >> (6 - index) & 1 == 1 {
        OperandType::Variable
    } else {
        OperandType::SmallConstant
    }
}

fn operand_types(
    bytes: &[u8],
    opcode: &Opcode,
    mut offset: usize,
) -> Result<(usize, Vec<OperandType>), RuntimeError> {
    let mut types = Vec::new();
    match opcode.form() {
        OpcodeForm::Short => {
            if let Some(t) = operand_type(opcode.opcode(), 1) {
                types.push(t);
            }
        }
        OpcodeForm::Long => {
            types.push(long_operand_type(opcode.opcode(), 0));
            types.push(long_operand_type(opcode.opcode(), 1));
        }
        OpcodeForm::Var | OpcodeForm::Ext => {
            // CALL_VS2 and CALL_VN2 have a second byte of operand types
            let type_bytes = if opcode.form() == OpcodeForm::Var
                && (opcode.opcode() == 0xEC || opcode.opcode() == 0xFA)
            {
                2
            } else {
                1
            };

            let mut omitted = false;
            for _ in 0..type_bytes {
                let b = byte(bytes, offset)?;
                offset += 1;
                for i in 0..4 {
                    match operand_type(b, i) {
                        Some(t) if !omitted => types.push(t),
                        _ => omitted = true,
                    }
                }
            }
        }
    }

    Ok((offset, types))
}

fn operands(
    bytes: &[u8],
    operand_types: &[OperandType],
    mut offset: usize,
) -> Result<(usize, Vec<Operand>), RuntimeError> {
    let mut operands = Vec::new();

    for optype in operand_types {
        match optype {
            OperandType::LargeConstant => {
                operands.push(Operand::new(
                    *optype,
                    memory::word_value(byte(bytes, offset)?, byte(bytes, offset + 1)?),
                ));
                offset += 2;
            }
            OperandType::SmallConstant | OperandType::Variable => {
                operands.push(Operand::new(*optype, byte(bytes, offset)? as u16));
                offset += 1;
            }
        }
    }

    Ok((offset, operands))
}

/// Does the instruction have a store byte?
fn is_store_instruction(opcode: &Opcode) -> bool {
    let version = opcode.version();
    match opcode.form() {
        OpcodeForm::Ext => matches!(
            opcode.instruction(),
            0x00 | 0x01 | 0x02 | 0x03 | 0x04 | 0x09 | 0x0A | 0x0C
        ),
        _ => match opcode.operand_count() {
            OperandCount::_0OP => match opcode.instruction() {
                0x05 | 0x06 => version == 4,
                0x09 => version >= 5,
                _ => false,
            },
            OperandCount::_1OP => match opcode.instruction() {
                0x01 | 0x02 | 0x03 | 0x04 | 0x08 | 0x0E => true,
                0x0F => version < 5,
                _ => false,
            },
            OperandCount::_2OP => matches!(opcode.instruction(), 0x08 | 0x09 | 0x0F..=0x19),
            OperandCount::_VAR => match opcode.instruction() {
                0x00 | 0x07 | 0x0C | 0x16 | 0x17 | 0x18 => true,
                0x04 => version >= 5,
                _ => false,
            },
        },
    }
}

/// Does the instruction have branch bytes?
fn is_branch_instruction(opcode: &Opcode) -> bool {
    match opcode.form() {
        OpcodeForm::Ext => matches!(opcode.instruction(), 0x06 | 0x18 | 0x1B),
        _ => match opcode.operand_count() {
            OperandCount::_0OP => match opcode.instruction() {
                0x0D | 0x0F => true,
                0x05 | 0x06 => opcode.version() == 3,
                _ => false,
            },
            OperandCount::_1OP => matches!(opcode.instruction(), 0x00 | 0x01 | 0x02),
            OperandCount::_2OP => matches!(opcode.instruction(), 0x01..=0x07 | 0x0A),
            OperandCount::_VAR => matches!(opcode.instruction(), 0x17 | 0x1F),
        },
    }
}

fn result_variable(
    address: usize,
    bytes: &[u8],
    opcode: &Opcode,
    offset: usize,
) -> Result<(usize, Option<StoreResult>), RuntimeError> {
    if is_store_instruction(opcode) {
        Ok((
            offset + 1,
            Some(StoreResult::new(address + offset, byte(bytes, offset)?)),
        ))
    } else {
        Ok((offset, None))
    }
}

/// Decode the branch descriptor: polarity and signed offset
fn branch_condition(bytes: &[u8], offset: usize) -> Result<(usize, bool, i16), RuntimeError> {
    let b = byte(bytes, offset)?;
    let condition = b & 0x80 == 0x80;
    if b & 0x40 == 0x40 {
        Ok((offset + 1, condition, (b & 0x3f) as i16))
    } else {
        let mut b_offset = ((b as u16 & 0x3f) << 8) | byte(bytes, offset + 1)? as u16;
        // Sign-extend the 14-bit value
        if b_offset & 0x2000 == 0x2000 {
            b_offset |= 0xC000;
        }
        Ok((offset + 2, condition, b_offset as i16))
    }
}

fn branch(
    address: usize,
    bytes: &[u8],
    opcode: &Opcode,
    offset: usize,
) -> Result<(usize, Option<Branch>), RuntimeError> {
    if !is_branch_instruction(opcode) {
        return Ok((offset, None));
    }

    let (next, condition, b_offset) = branch_condition(bytes, offset)?;
    let target = match b_offset {
        0 => BranchTarget::ReturnFalse,
        1 => BranchTarget::ReturnTrue,
        _ => BranchTarget::Address(
            ((address + next) as isize + b_offset as isize - 2) as usize,
        ),
    };

    Ok((
        next,
        Some(Branch::new(address + offset, condition, target)),
    ))
}

fn opcode(bytes: &[u8], version: u8, offset: usize) -> Result<(usize, Opcode), RuntimeError> {
    let mut opcode = byte(bytes, offset)?;
    let (offset, form) = match opcode {
        0xBE if version >= 5 => {
            opcode = byte(bytes, offset + 1)?;
            (offset + 2, OpcodeForm::Ext)
        }
        _ => (
            offset + 1,
            match (opcode >> 6) & 0x3 {
                3 => OpcodeForm::Var,
                2 => OpcodeForm::Short,
                _ => OpcodeForm::Long,
            },
        ),
    };

    let instruction = match form {
        OpcodeForm::Var | OpcodeForm::Long => opcode & 0x1F,
        OpcodeForm::Short => opcode & 0xF,
        OpcodeForm::Ext => opcode,
    };

    let operand_count = match form {
        OpcodeForm::Short => {
            if opcode & 0x30 == 0x30 {
                OperandCount::_0OP
            } else {
                OperandCount::_1OP
            }
        }
        OpcodeForm::Long => OperandCount::_2OP,
        OpcodeForm::Var => {
            if opcode & 0x20 == 0x20 {
                OperandCount::_VAR
            } else {
                OperandCount::_2OP
            }
        }
        OpcodeForm::Ext => OperandCount::_VAR,
    };

    Ok((
        offset,
        Opcode::new(version, opcode, instruction, form, operand_count),
    ))
}

/// Decode the instruction at an address
///
/// # Arguments
/// * `zmachine` - Reference to the Z-Machine
/// * `address` - Address of the instruction
///
/// # Returns
/// [Result] with the decoded [Instruction] or a [RuntimeError]
pub fn decode_instruction(zmachine: &ZMachine, address: usize) -> Result<Instruction, RuntimeError> {
    let version = zmachine.version();
    let bytes = zmachine.memory_slice(address, MAX_INSTRUCTION_LENGTH);
    let (offset, opcode) = opcode(&bytes, version, 0)?;
    let (offset, operand_types) = operand_types(&bytes, &opcode, offset)?;
    let (offset, operands) = operands(&bytes, &operand_types, offset)?;
    let (offset, store) = result_variable(address, &bytes, &opcode, offset)?;
    let (offset, branch) = branch(address, &bytes, &opcode, offset)?;

    Ok(Instruction::new(
        address,
        opcode,
        operands,
        store,
        branch,
        address + offset,
    ))
}

#[cfg(test)]
mod tests {
    use crate::{
        assert_ok, assert_some, assert_some_eq,
        test_util::{mock_zmachine, test_map},
    };

    use super::*;

    fn decode(version: u8, bytes: &[u8]) -> Instruction {
        let mut map = test_map(version);
        for (i, b) in bytes.iter().enumerate() {
            map[0x400 + i] = *b;
        }
        let zmachine = mock_zmachine(map);
        assert_ok!(decode_instruction(&zmachine, 0x400))
    }

    fn operand(operand_type: OperandType, value: u16) -> Operand {
        Operand::new(operand_type, value)
    }

    #[test]
    fn test_operand_type() {
        let types = 0x1B;
        assert_some_eq!(operand_type(types, 0), OperandType::LargeConstant);
        assert_some_eq!(operand_type(types, 1), OperandType::SmallConstant);
        assert_some_eq!(operand_type(types, 2), OperandType::Variable);
        assert!(operand_type(types, 3).is_none());
    }

    #[test]
    fn test_long_operand_type() {
        assert_eq!(long_operand_type(0x14, 0), OperandType::SmallConstant);
        assert_eq!(long_operand_type(0x14, 1), OperandType::SmallConstant);
        assert_eq!(long_operand_type(0x54, 0), OperandType::Variable);
        assert_eq!(long_operand_type(0x54, 1), OperandType::SmallConstant);
        assert_eq!(long_operand_type(0x34, 0), OperandType::SmallConstant);
        assert_eq!(long_operand_type(0x34, 1), OperandType::Variable);
        assert_eq!(long_operand_type(0x74, 0), OperandType::Variable);
    }

    #[test]
    fn test_decode_long_store() {
        // ADD G00, #02 -> (SP)
        let i = decode(3, &[0x54, 0x10, 0x02, 0x00]);
        assert_eq!(i.opcode().form(), OpcodeForm::Long);
        assert_eq!(i.opcode().operand_count(), OperandCount::_2OP);
        assert_eq!(i.opcode().instruction(), 0x14);
        assert_eq!(
            i.operands(),
            &[
                operand(OperandType::Variable, 0x10),
                operand(OperandType::SmallConstant, 0x02)
            ]
        );
        assert_some_eq!(i.store(), &StoreResult::new(0x403, 0x00));
        assert!(i.branch().is_none());
        assert_eq!(i.next_address(), 0x404);
    }

    #[test]
    fn test_decode_long_variable_branch() {
        // JE L00, #05 [TRUE] +0x10
        let i = decode(3, &[0x41, 0x01, 0x05, 0xD0]);
        assert_eq!(
            i.operands(),
            &[
                operand(OperandType::Variable, 0x01),
                operand(OperandType::SmallConstant, 0x05)
            ]
        );
        let b = assert_some!(i.branch());
        assert!(b.condition());
        assert_eq!(b.address(), 0x403);
        assert_eq!(b.target(), BranchTarget::Address(0x404 + 0x10 - 2));
        assert_eq!(i.next_address(), 0x404);
    }

    #[test]
    fn test_decode_branch_long_negative() {
        // JZ L00 [FALSE] -4
        let i = decode(3, &[0xA0, 0x01, 0x3F, 0xFC]);
        assert_eq!(i.opcode().operand_count(), OperandCount::_1OP);
        let b = assert_some!(i.branch());
        assert!(!b.condition());
        assert_eq!(b.target(), BranchTarget::Address(0x404 - 4 - 2));
        assert_eq!(i.next_address(), 0x404);
    }

    #[test]
    fn test_decode_branch_return() {
        // JZ #00 [TRUE] RFALSE
        let i = decode(3, &[0x90, 0x00, 0xC0]);
        assert_some_eq!(
            i.branch(),
            &Branch::new(0x402, true, BranchTarget::ReturnFalse)
        );
        // JZ #00 [FALSE] RTRUE
        let i = decode(3, &[0x90, 0x00, 0x41]);
        assert_some_eq!(
            i.branch(),
            &Branch::new(0x402, false, BranchTarget::ReturnTrue)
        );
    }

    #[test]
    fn test_decode_short_0op() {
        // RTRUE
        let i = decode(3, &[0xB0]);
        assert_eq!(i.opcode().form(), OpcodeForm::Short);
        assert_eq!(i.opcode().operand_count(), OperandCount::_0OP);
        assert!(i.operands().is_empty());
        assert_eq!(i.next_address(), 0x401);
    }

    #[test]
    fn test_decode_short_1op_large() {
        // JUMP #1234
        let i = decode(5, &[0x8C, 0x12, 0x34]);
        assert_eq!(i.opcode().instruction(), 0x0C);
        assert_eq!(
            i.operands(),
            &[operand(OperandType::LargeConstant, 0x1234)]
        );
        assert_eq!(i.next_address(), 0x403);
    }

    #[test]
    fn test_decode_var() {
        // CALL_VS #1234 #56 L01 -> G00
        let i = decode(5, &[0xE0, 0x1B, 0x12, 0x34, 0x56, 0x02, 0x10]);
        assert_eq!(i.opcode().form(), OpcodeForm::Var);
        assert_eq!(i.opcode().operand_count(), OperandCount::_VAR);
        assert_eq!(
            i.operands(),
            &[
                operand(OperandType::LargeConstant, 0x1234),
                operand(OperandType::SmallConstant, 0x56),
                operand(OperandType::Variable, 0x02)
            ]
        );
        assert_some_eq!(i.store(), &StoreResult::new(0x406, 0x10));
        assert_eq!(i.next_address(), 0x407);
    }

    #[test]
    fn test_decode_var_2op() {
        // JE (VAR form) with 3 operands
        let i = decode(5, &[0xC1, 0x57, 0x01, 0x02, 0x03, 0xC2]);
        assert_eq!(i.opcode().operand_count(), OperandCount::_2OP);
        assert_eq!(i.operands().len(), 3);
        assert!(i.branch().is_some());
        assert_eq!(i.next_address(), 0x406);
    }

    #[test]
    fn test_decode_var_omitted_stops() {
        // Operand types: small, omitted, small - everything after the first omitted is absent
        let i = decode(5, &[0xE8, 0x73, 0x05]);
        assert_eq!(i.operands(), &[operand(OperandType::SmallConstant, 0x05)]);
        assert_eq!(i.next_address(), 0x403);
    }

    #[test]
    fn test_decode_double_variable() {
        // CALL_VN2 with 5 operands, the sixth type is omitted
        let i = decode(
            5,
            &[0xFA, 0x15, 0x7F, 0x12, 0x34, 0x01, 0x02, 0x03, 0x04],
        );
        assert_eq!(i.opcode().instruction(), 0x1A);
        assert_eq!(i.operands().len(), 5);
        assert_eq!(i.operands()[0], operand(OperandType::LargeConstant, 0x1234));
        assert_eq!(i.operands()[4], operand(OperandType::SmallConstant, 0x04));
        assert!(i.store().is_none());
        assert_eq!(i.next_address(), 0x409);
    }

    #[test]
    fn test_decode_ext() {
        // SAVE_UNDO -> (SP)
        let i = decode(5, &[0xBE, 0x09, 0xFF, 0x00]);
        assert_eq!(i.opcode().form(), OpcodeForm::Ext);
        assert_eq!(i.opcode().instruction(), 0x09);
        assert!(i.operands().is_empty());
        assert_some_eq!(i.store(), &StoreResult::new(0x403, 0x00));
        assert_eq!(i.next_address(), 0x404);
    }

    #[test]
    fn test_decode_pop_catch_version_gating() {
        let i = decode(3, &[0xB9, 0x10]);
        assert_eq!(i.opcode().name(), "POP");
        assert!(i.store().is_none());
        assert_eq!(i.next_address(), 0x401);

        let i = decode(5, &[0xB9, 0x10]);
        assert_eq!(i.opcode().name(), "CATCH");
        assert_some_eq!(i.store(), &StoreResult::new(0x401, 0x10));
        assert_eq!(i.next_address(), 0x402);
    }

    #[test]
    fn test_decode_save_version_gating() {
        // v3: branch
        let i = decode(3, &[0xB5, 0xC5]);
        assert!(i.store().is_none());
        assert!(i.branch().is_some());
        // v4: store
        let i = decode(4, &[0xB5, 0x00]);
        assert!(i.store().is_some());
        assert!(i.branch().is_none());
        // v5: neither
        let i = decode(5, &[0xB5]);
        assert!(i.store().is_none());
        assert!(i.branch().is_none());
    }

    #[test]
    fn test_decode_not_call_1n() {
        let i = decode(3, &[0x9F, 0x01, 0x00]);
        assert_eq!(i.opcode().name(), "NOT");
        assert!(i.store().is_some());
        let i = decode(5, &[0x9F, 0x01]);
        assert_eq!(i.opcode().name(), "CALL_1N");
        assert!(i.store().is_none());
    }

    #[test]
    fn test_decode_truncated() {
        let mut map = test_map(5);
        map[0x7FF] = 0xE0;
        let zmachine = mock_zmachine(map);
        let e = decode_instruction(&zmachine, 0x7FF).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidInstruction);
    }
}
