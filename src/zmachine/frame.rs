//! ZMachine [routine call frame](https://inform-fiction.org/zmachine/standards/z1point1/sect06.html#five)
use crate::instruction::StoreResult;
use crate::{error::*, fatal_error};

#[derive(Clone, Debug, Eq, PartialEq)]
/// Routine call frame
pub struct Frame {
    /// Address of the routine this frame is executing
    address: usize,
    /// The address to return to when this frame returns
    return_address: usize,
    /// Value stack pointer when the frame was entered
    stack_pointer: usize,
    /// [Option] with the [StoreResult] location for the return value, or [None] to discard it
    result: Option<StoreResult>,
    /// Local variable storage
    local_variables: Vec<u16>,
    /// Bit n is set if argument n+1 was supplied by the caller
    argument_mask: u8,
    /// Is this frame running an interrupt routine for the interpreter?
    interrupt: bool,
}

impl Frame {
    /// Constructor
    ///
    /// Call arguments overlay the first local variables, lowest to highest.  Arguments beyond
    /// the number of local variables are dropped.
    ///
    /// # Arguments
    /// * `address` - address of the routine header this frame will execute
    /// * `return_address` - address to resume execution at when the frame returns
    /// * `stack_pointer` - value stack pointer of the caller
    /// * `result` - [Option] with the [StoreResult] location or [None]
    /// * `local_variables` - initial local variable values
    /// * `arguments` - call arguments
    pub fn new(
        address: usize,
        return_address: usize,
        stack_pointer: usize,
        result: Option<StoreResult>,
        local_variables: &[u16],
        arguments: &[u16],
    ) -> Frame {
        let mut local_variables = local_variables.to_vec();
        for (i, a) in arguments.iter().enumerate() {
            if i < local_variables.len() {
                local_variables[i] = *a;
            }
        }

        let argument_mask = (0..usize::min(arguments.len(), 8)).fold(0, |m, i| m | (1 << i));

        Frame {
            address,
            return_address,
            stack_pointer,
            result,
            local_variables,
            argument_mask,
            interrupt: false,
        }
    }

    /// The outermost frame, which executes the main program and has no caller
    pub fn main() -> Frame {
        Frame::new(0, 0, 0, None, &[], &[])
    }

    pub fn address(&self) -> usize {
        self.address
    }

    pub fn return_address(&self) -> usize {
        self.return_address
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack_pointer
    }

    /// Gets the store location for the routine's return value
    ///
    /// # Returns
    /// [Option] with a reference to the [StoreResult] or [None] if the value is discarded
    pub fn result(&self) -> Option<&StoreResult> {
        self.result.as_ref()
    }

    /// Is the return value kept (stored) rather than discarded?
    pub fn keep(&self) -> bool {
        self.result.is_some()
    }

    pub fn local_variables(&self) -> &[u16] {
        &self.local_variables
    }

    /// Was argument `argument` (counting from 1) supplied by the caller?
    pub fn argument_supplied(&self, argument: u16) -> bool {
        argument > 0 && argument <= 8 && self.argument_mask & (1 << (argument - 1)) != 0
    }

    pub fn argument_count(&self) -> u8 {
        self.argument_mask.count_ones() as u8
    }

    pub fn interrupt(&self) -> bool {
        self.interrupt
    }

    /// Mark this frame as an interrupt routine
    pub fn set_interrupt(&mut self) {
        self.interrupt = true;
    }

    /// Gets the value of a local variable.
    ///
    /// # Arguments
    /// * `variable` - Local variable number, from 1 to the number of local variables
    ///
    /// # Returns
    /// [Result] with the local variable value or a [RuntimeError]
    pub fn local_variable(&self, variable: u8) -> Result<u16, RuntimeError> {
        if variable > 0 && variable as usize <= self.local_variables.len() {
            Ok(self.local_variables[variable as usize - 1])
        } else {
            fatal_error!(
                ErrorCode::InvalidLocalVariable,
                "Read from invalid local variable {}, routine ${:05x} has {} locals",
                variable,
                self.address,
                self.local_variables.len()
            )
        }
    }

    /// Sets the value of a local variable.
    ///
    /// # Arguments
    /// * `variable` - Local variable number, from 1 to the number of local variables
    /// * `value` - New value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn set_local_variable(&mut self, variable: u8, value: u16) -> Result<(), RuntimeError> {
        if variable > 0 && variable as usize <= self.local_variables.len() {
            debug!(target: "app::state", "L{:02x} <- {:04x}", variable - 1, value);
            self.local_variables[variable as usize - 1] = value;
            Ok(())
        } else {
            fatal_error!(
                ErrorCode::InvalidLocalVariable,
                "Write to invalid local variable {}, routine ${:05x} has {} locals",
                variable,
                self.address,
                self.local_variables.len()
            )
        }
    }
}
