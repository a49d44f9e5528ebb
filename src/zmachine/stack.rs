//! Value stack
use crate::{error::*, fatal_error};

#[derive(Debug)]
/// Fixed-capacity stack of words shared by all routine frames.
///
/// Each frame owns the region above the stack pointer captured when it was entered, the
/// `floor` passed to [Stack::pop], [Stack::peek] and [Stack::poke].
pub struct Stack {
    values: Vec<u16>,
    capacity: usize,
}

impl Stack {
    pub fn new(capacity: usize) -> Stack {
        Stack {
            values: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Current stack pointer
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Push a value
    ///
    /// # Arguments
    /// * `value` - Value to push
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if the stack is full
    pub fn push(&mut self, value: u16) -> Result<(), RuntimeError> {
        if self.values.len() < self.capacity {
            self.values.push(value);
            debug!(target: "app::stack", "Push {:04x} [{}]", value, self.values.len());
            Ok(())
        } else {
            fatal_error!(
                ErrorCode::StackOverflow,
                "Pushed {:04x} onto a full stack ({} words)",
                value,
                self.capacity
            )
        }
    }

    /// Pop a value
    ///
    /// # Arguments
    /// * `floor` - stack pointer of the current frame
    ///
    /// # Returns
    /// [Result] with the value from the top of the stack or a [RuntimeError] if the current frame's stack is empty
    pub fn pop(&mut self, floor: usize) -> Result<u16, RuntimeError> {
        if self.values.len() > floor {
            match self.values.pop() {
                Some(v) => {
                    debug!(target: "app::stack", "Pop {:04x} [{}]", v, self.values.len());
                    Ok(v)
                }
                None => fatal_error!(ErrorCode::StackUnderflow, "Popped an empty stack"),
            }
        } else {
            fatal_error!(
                ErrorCode::StackUnderflow,
                "Popped an empty frame stack at {}",
                floor
            )
        }
    }

    /// Read the top value without removing it
    ///
    /// # Arguments
    /// * `floor` - stack pointer of the current frame
    ///
    /// # Returns
    /// [Result] with the value from the top of the stack or a [RuntimeError] if the current frame's stack is empty
    pub fn peek(&self, floor: usize) -> Result<u16, RuntimeError> {
        match self.values.last() {
            Some(v) if self.values.len() > floor => Ok(*v),
            _ => fatal_error!(
                ErrorCode::StackUnderflow,
                "Peeked an empty frame stack at {}",
                floor
            ),
        }
    }

    /// Replace the top value in place
    ///
    /// # Arguments
    /// * `floor` - stack pointer of the current frame
    /// * `value` - new value
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if the current frame's stack is empty
    pub fn poke(&mut self, floor: usize, value: u16) -> Result<(), RuntimeError> {
        let len = self.values.len();
        if len > floor {
            debug!(target: "app::stack", "Poke {:04x} [{}]", value, len);
            self.values[len - 1] = value;
            Ok(())
        } else {
            fatal_error!(
                ErrorCode::StackUnderflow,
                "Poked an empty frame stack at {}",
                floor
            )
        }
    }

    /// Discard everything above `stack_pointer`
    pub fn truncate(&mut self, stack_pointer: usize) {
        self.values.truncate(stack_pointer);
    }

    /// Replace the stack contents
    ///
    /// # Arguments
    /// * `values` - new stack contents
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError] if `values` exceeds the stack capacity
    pub fn restore(&mut self, values: &[u16]) -> Result<(), RuntimeError> {
        if values.len() > self.capacity {
            fatal_error!(
                ErrorCode::StackOverflow,
                "Restored stack of {} words exceeds capacity {}",
                values.len(),
                self.capacity
            )
        } else {
            self.values = values.to_vec();
            Ok(())
        }
    }
}
