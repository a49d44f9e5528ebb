//! Decoded [instructions](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html)
use std::fmt;

pub mod decoder;
pub mod processor;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// [Opcode forms](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html#three)
pub enum OpcodeForm {
    Short,
    Long,
    Var,
    Ext,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// [Operand types](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html#two)
pub enum OperandType {
    LargeConstant,
    SmallConstant,
    Variable,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// [Operands](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html#five)
pub struct Operand {
    /// The [OperandType]
    operand_type: OperandType,
    /// Operand value, or variable number for [OperandType::Variable]
    value: u16,
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.operand_type {
            OperandType::LargeConstant => write!(f, "#{:04x}", self.value),
            OperandType::SmallConstant => write!(f, "#{:02x}", self.value as u8),
            OperandType::Variable => {
                if self.value == 0 {
                    write!(f, "(SP)+")
                } else if self.value < 16 {
                    write!(f, "L{:02x}", self.value - 1)
                } else {
                    write!(f, "G{:02x}", self.value - 16)
                }
            }
        }
    }
}

impl Operand {
    /// Constructor
    ///
    /// # Arguments
    /// * `operand_type` - [OperandType]
    /// * `value` - Operand value
    pub fn new(operand_type: OperandType, value: u16) -> Operand {
        Operand {
            operand_type,
            value,
        }
    }

    pub fn operand_type(&self) -> OperandType {
        self.operand_type
    }

    pub fn value(&self) -> u16 {
        self.value
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Where a taken branch goes
pub enum BranchTarget {
    /// Return false from the current routine
    ReturnFalse,
    /// Return true from the current routine
    ReturnTrue,
    /// Continue at an address
    Address(usize),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Branch offset and polarity
pub struct Branch {
    /// Address of the first branch offset byte
    address: usize,
    /// Test result that takes the branch
    condition: bool,
    /// Branch destination
    target: BranchTarget,
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}] ", self.condition.to_string().to_uppercase())?;
        match self.target {
            BranchTarget::ReturnFalse => write!(f, "RFALSE"),
            BranchTarget::ReturnTrue => write!(f, "RTRUE"),
            BranchTarget::Address(a) => write!(f, "${:05x}", a),
        }
    }
}

impl Branch {
    /// Constructor
    ///
    /// # Arguments
    /// * `address` - address of the first branch offset byte
    /// * `condition` - branch when the test result equals this
    /// * `target` - branch destination
    pub fn new(address: usize, condition: bool, target: BranchTarget) -> Branch {
        Branch {
            address,
            condition,
            target,
        }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn condition(&self) -> bool {
        self.condition
    }

    pub fn target(&self) -> BranchTarget {
        self.target
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Result variable of a store instruction
pub struct StoreResult {
    /// Address of the store variable byte
    address: usize,
    /// Variable to store to
    variable: u8,
}

impl fmt::Display for StoreResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.variable == 0 {
            write!(f, "-(SP)")
        } else if self.variable < 16 {
            write!(f, "L{:02x}", self.variable - 1)
        } else {
            write!(f, "G{:02x}", self.variable - 16)
        }
    }
}

impl StoreResult {
    /// Constructor
    ///
    /// # Arguments
    /// * `address` - Address of the store variable byte
    /// * `variable` - Variable to store to
    pub fn new(address: usize, variable: u8) -> StoreResult {
        StoreResult { address, variable }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn variable(&self) -> u8 {
        self.variable
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// [Operand count](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html#five)
pub enum OperandCount {
    _0OP,
    _1OP,
    _2OP,
    _VAR,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Opcode
pub struct Opcode {
    /// Story file version, needed to name opcodes that changed meaning
    version: u8,
    /// Opcode byte (the second byte for EXT instructions)
    opcode: u8,
    /// Opcode form
    form: OpcodeForm,
    /// Instruction number within the operand count class
    instruction: u8,
    /// Operand count class
    operand_count: OperandCount,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Opcode {
    pub fn new(
        version: u8,
        opcode: u8,
        instruction: u8,
        form: OpcodeForm,
        operand_count: OperandCount,
    ) -> Opcode {
        Opcode {
            version,
            opcode,
            instruction,
            form,
            operand_count,
        }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn opcode(&self) -> u8 {
        self.opcode
    }

    pub fn form(&self) -> OpcodeForm {
        self.form
    }

    pub fn instruction(&self) -> u8 {
        self.instruction
    }

    pub fn operand_count(&self) -> OperandCount {
        self.operand_count
    }

    /// Mnemonic name for the opcode
    pub fn name(&self) -> &'static str {
        if self.form == OpcodeForm::Ext {
            return match self.instruction {
                0x00 => "SAVE",
                0x01 => "RESTORE",
                0x02 => "LOG_SHIFT",
                0x03 => "ART_SHIFT",
                0x04 => "SET_FONT",
                0x09 => "SAVE_UNDO",
                0x0A => "RESTORE_UNDO",
                0x0B => "PRINT_UNICODE",
                0x0C => "CHECK_UNICODE",
                _ => "UNKNOWN!",
            };
        }

        match self.operand_count {
            OperandCount::_0OP => match self.instruction {
                0x0 => "RTRUE",
                0x1 => "RFALSE",
                0x2 => "PRINT",
                0x3 => "PRINT_RET",
                0x4 => "NOP",
                0x5 => "SAVE",
                0x6 => "RESTORE",
                0x7 => "RESTART",
                0x8 => "RET_POPPED",
                0x9 if self.version < 5 => "POP",
                0x9 => "CATCH",
                0xA => "QUIT",
                0xB => "NEW_LINE",
                0xC => "SHOW_STATUS",
                0xD => "VERIFY",
                0xF => "PIRACY",
                _ => "UNKNOWN!",
            },
            OperandCount::_1OP => match self.instruction {
                0x0 => "JZ",
                0x1 => "GET_SIBLING",
                0x2 => "GET_CHILD",
                0x3 => "GET_PARENT",
                0x4 => "GET_PROP_LEN",
                0x5 => "INC",
                0x6 => "DEC",
                0x7 => "PRINT_ADDR",
                0x8 => "CALL_1S",
                0x9 => "REMOVE_OBJ",
                0xA => "PRINT_OBJ",
                0xB => "RET",
                0xC => "JUMP",
                0xD => "PRINT_PADDR",
                0xE => "LOAD",
                0xF if self.version < 5 => "NOT",
                0xF => "CALL_1N",
                _ => "UNKNOWN!",
            },
            OperandCount::_2OP => match self.instruction {
                0x01 => "JE",
                0x02 => "JL",
                0x03 => "JG",
                0x04 => "DEC_CHK",
                0x05 => "INC_CHK",
                0x06 => "JIN",
                0x07 => "TEST",
                0x08 => "OR",
                0x09 => "AND",
                0x0A => "TEST_ATTR",
                0x0B => "SET_ATTR",
                0x0C => "CLEAR_ATTR",
                0x0D => "STORE",
                0x0E => "INSERT_OBJ",
                0x0F => "LOADW",
                0x10 => "LOADB",
                0x11 => "GET_PROP",
                0x12 => "GET_PROP_ADDR",
                0x13 => "GET_NEXT_PROP",
                0x14 => "ADD",
                0x15 => "SUB",
                0x16 => "MUL",
                0x17 => "DIV",
                0x18 => "MOD",
                0x19 => "CALL_2S",
                0x1A => "CALL_2N",
                0x1B => "SET_COLOUR",
                0x1C => "THROW",
                _ => "UNKNOWN!",
            },
            OperandCount::_VAR => match self.instruction {
                0x00 if self.version < 4 => "CALL",
                0x00 => "CALL_VS",
                0x01 => "STOREW",
                0x02 => "STOREB",
                0x03 => "PUT_PROP",
                0x04 if self.version < 5 => "SREAD",
                0x04 => "AREAD",
                0x05 => "PRINT_CHAR",
                0x06 => "PRINT_NUM",
                0x07 => "RANDOM",
                0x08 => "PUSH",
                0x09 => "PULL",
                0x0A => "SPLIT_WINDOW",
                0x0B => "SET_WINDOW",
                0x0C => "CALL_VS2",
                0x0D => "ERASE_WINDOW",
                0x0E => "ERASE_LINE",
                0x0F => "SET_CURSOR",
                0x10 => "GET_CURSOR",
                0x11 => "SET_TEXT_STYLE",
                0x12 => "BUFFER_MODE",
                0x13 => "OUTPUT_STREAM",
                0x14 => "INPUT_STREAM",
                0x15 => "SOUND_EFFECT",
                0x16 => "READ_CHAR",
                0x17 => "SCAN_TABLE",
                0x18 => "NOT",
                0x19 => "CALL_VN",
                0x1A => "CALL_VN2",
                0x1B => "TOKENISE",
                0x1C => "ENCODE_TEXT",
                0x1D => "COPY_TABLE",
                0x1E => "PRINT_TABLE",
                0x1F => "CHECK_ARG_COUNT",
                _ => "UNKNOWN!",
            },
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
/// [Instruction](https://inform-fiction.org/zmachine/standards/z1point1/sect04.html#one)
pub struct Instruction {
    /// Byte address of the opcode
    address: usize,
    /// Instruction [Opcode]
    opcode: Opcode,
    /// Operands, in encoded order
    operands: Vec<Operand>,
    /// [StoreResult] for store instructions
    store: Option<StoreResult>,
    /// [Branch] for branch instructions
    branch: Option<Branch>,
    /// Address of the byte after this instruction
    next_address: usize,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${:05x}: {}", self.address, self.opcode)?;

        for o in &self.operands {
            write!(f, " {}", o)?;
        }

        if let Some(s) = self.store {
            write!(f, " -> {}", s)?
        }

        if let Some(b) = &self.branch {
            write!(f, " {}", b)?
        }

        Ok(())
    }
}

impl Instruction {
    pub fn new(
        address: usize,
        opcode: Opcode,
        operands: Vec<Operand>,
        store: Option<StoreResult>,
        branch: Option<Branch>,
        next_address: usize,
    ) -> Instruction {
        Instruction {
            address,
            opcode,
            operands,
            store,
            branch,
            next_address,
        }
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn opcode(&self) -> &Opcode {
        &self.opcode
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn store(&self) -> Option<&StoreResult> {
        self.store.as_ref()
    }

    pub fn branch(&self) -> Option<&Branch> {
        self.branch.as_ref()
    }

    pub fn next_address(&self) -> usize {
        self.next_address
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Where execution continues
pub enum NextAddress {
    /// Byte address
    Address(usize),
    /// Stop the run loop
    Quit,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
/// Outcome of executing an instruction.
///
/// Handlers describe their effect on control flow instead of performing it; the
/// [processor::complete] epilogue stores the value, evaluates the branch, and picks the
/// next address.
pub struct InstructionResult {
    /// Value for the instruction's store variable
    value: Option<u16>,
    /// Branch condition to test against the instruction's branch polarity
    condition: Option<bool>,
    /// Explicit transfer of control, e.g. a call, return or jump
    next_address: Option<NextAddress>,
}

impl InstructionResult {
    /// Continue with the next instruction
    pub fn next() -> InstructionResult {
        InstructionResult::default()
    }

    /// Store a value, then continue with the next instruction
    pub fn store(value: u16) -> InstructionResult {
        InstructionResult {
            value: Some(value),
            ..Default::default()
        }
    }

    /// Branch on a condition
    pub fn branch(condition: bool) -> InstructionResult {
        InstructionResult {
            condition: Some(condition),
            ..Default::default()
        }
    }

    /// Store a value and then branch on a condition
    pub fn store_branch(value: u16, condition: bool) -> InstructionResult {
        InstructionResult {
            value: Some(value),
            condition: Some(condition),
            next_address: None,
        }
    }

    /// Transfer control to an address
    pub fn transfer(next_address: NextAddress) -> InstructionResult {
        InstructionResult {
            next_address: Some(next_address),
            ..Default::default()
        }
    }

    /// Stop execution
    pub fn quit() -> InstructionResult {
        InstructionResult::transfer(NextAddress::Quit)
    }

    pub fn value(&self) -> Option<u16> {
        self.value
    }

    pub fn condition(&self) -> Option<bool> {
        self.condition
    }

    pub fn next_address(&self) -> Option<NextAddress> {
        self.next_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operand_display() {
        assert_eq!(
            format!("{}", Operand::new(OperandType::LargeConstant, 0x1234)),
            "#1234"
        );
        assert_eq!(
            format!("{}", Operand::new(OperandType::SmallConstant, 0x12)),
            "#12"
        );
        assert_eq!(format!("{}", Operand::new(OperandType::Variable, 0)), "(SP)+");
        assert_eq!(format!("{}", Operand::new(OperandType::Variable, 3)), "L02");
        assert_eq!(
            format!("{}", Operand::new(OperandType::Variable, 0x20)),
            "G10"
        );
    }

    #[test]
    fn test_opcode_names_by_version() {
        let pop = Opcode::new(3, 0xB9, 0x9, OpcodeForm::Short, OperandCount::_0OP);
        let catch = Opcode::new(5, 0xB9, 0x9, OpcodeForm::Short, OperandCount::_0OP);
        assert_eq!(pop.name(), "POP");
        assert_eq!(catch.name(), "CATCH");
        let not = Opcode::new(4, 0x8F, 0xF, OpcodeForm::Short, OperandCount::_1OP);
        let call_1n = Opcode::new(5, 0x8F, 0xF, OpcodeForm::Short, OperandCount::_1OP);
        assert_eq!(not.name(), "NOT");
        assert_eq!(call_1n.name(), "CALL_1N");
        let save_undo = Opcode::new(5, 0x09, 0x09, OpcodeForm::Ext, OperandCount::_VAR);
        assert_eq!(save_undo.name(), "SAVE_UNDO");
    }

    #[test]
    fn test_instruction_display() {
        let i = Instruction::new(
            0x1234,
            Opcode::new(3, 0x54, 0x14, OpcodeForm::Long, OperandCount::_2OP),
            vec![
                Operand::new(OperandType::Variable, 0x10),
                Operand::new(OperandType::SmallConstant, 0x02),
            ],
            Some(StoreResult::new(0x1237, 0x00)),
            None,
            0x1238,
        );
        assert_eq!(format!("{}", i), "$01234: ADD G00 #02 -> -(SP)");

        let i = Instruction::new(
            0x1234,
            Opcode::new(3, 0x41, 0x01, OpcodeForm::Long, OperandCount::_2OP),
            vec![
                Operand::new(OperandType::Variable, 0x01),
                Operand::new(OperandType::SmallConstant, 0x02),
            ],
            None,
            Some(Branch::new(0x1237, false, BranchTarget::ReturnTrue)),
            0x1238,
        );
        assert_eq!(format!("{}", i), "$01234: JE L00 #02 [FALSE] RTRUE");
    }

    #[test]
    fn test_instruction_result() {
        let r = InstructionResult::next();
        assert!(r.value().is_none() && r.condition().is_none() && r.next_address().is_none());
        let r = InstructionResult::store_branch(3, true);
        assert_eq!(r.value(), Some(3));
        assert_eq!(r.condition(), Some(true));
        assert_eq!(InstructionResult::quit().next_address(), Some(NextAddress::Quit));
    }
}
