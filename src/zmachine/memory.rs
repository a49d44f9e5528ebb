//! ZMachine [memory map](https://inform-fiction.org/zmachine/standards/z1point1/sect01.html)
use std::fmt;

use crate::{error::*, fatal_error};

/// Memory map
pub struct Memory {
    /// Memory map bytes
    map: Vec<u8>,
    /// Byte address of the start of static memory
    static_mark: usize,
    /// File length from the header
    file_length: usize,
    /// Pristine copy of the dynamic memory region
    dynamic: Vec<u8>,
}

impl fmt::Debug for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory: {} bytes, static ${:04x}",
            self.map.len(),
            self.static_mark
        )
    }
}

/// Assemble a word from high- and low-byte values
///
/// # Arguments
/// * `hb` - high byte value
/// * `lb` - low byte value
///
/// # Returns
/// Word value
pub fn word_value(hb: u8, lb: u8) -> u16 {
    ((hb as u16) << 8) | lb as u16
}

/// Break a word value down into high- and low-byte values
///
/// # Arguments
/// * `w` - Word value
///
/// # Returns
/// Tuple containing (high-byte, low-byte)
pub fn byte_values(w: u16) -> (u8, u8) {
    ((w >> 8) as u8, w as u8)
}

impl TryFrom<Vec<u8>> for Memory {
    type Error = RuntimeError;

    fn try_from(map: Vec<u8>) -> Result<Self, Self::Error> {
        if map.len() < 0x40 {
            return fatal_error!(
                ErrorCode::InvalidAddress,
                "Story file is only {} bytes, too short for a header",
                map.len()
            );
        }

        let static_mark = word_value(map[0x0e], map[0x0f]) as usize;
        if static_mark < 0x40 || static_mark > map.len() {
            return fatal_error!(
                ErrorCode::InvalidAddress,
                "Static memory mark ${:04x} outside story file ({} bytes)",
                static_mark,
                map.len()
            );
        }

        let file_length = word_value(map[0x1a], map[0x1b]) as usize
            * match map[0] {
                1..=3 => 2,
                4 | 5 => 4,
                _ => 8,
            };

        let dynamic = map[0..static_mark].to_vec();
        Ok(Memory {
            map,
            static_mark,
            file_length,
            dynamic,
        })
    }
}

impl Memory {
    /// Get the start of the [static](https://inform-fiction.org/zmachine/standards/z1point1/sect01.html#one) memory region
    ///
    /// # Returns
    /// Byte address of the start of the static memory region
    pub fn static_mark(&self) -> usize {
        self.static_mark
    }

    /// Size of the memory map
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Copy a slice of the memory map.
    ///
    /// The slice is truncated at the end of memory.
    ///
    /// # Arguments
    /// * `start` - address of the start of the slice
    /// * `length` - length of the slice
    ///
    /// # Returns
    /// Vector containing a copy of the requested slice of memory
    pub fn slice(&self, start: usize, length: usize) -> Vec<u8> {
        let start = usize::min(start, self.map.len());
        let end = usize::min(start + length, self.map.len());
        self.map[start..end].to_vec()
    }

    /// Calculate the checksum of the story file.
    ///
    /// The pristine copy of dynamic memory is used for this calculation, so
    /// changes made by the running program do not affect the result.
    ///
    /// # Returns
    /// Checksum value
    pub fn checksum(&self) -> u16 {
        let end = usize::min(self.file_length, self.map.len());
        let mut checksum: u16 = 0;
        for i in 0x40..end {
            let b = if i < self.dynamic.len() {
                self.dynamic[i]
            } else {
                self.map[i]
            };
            checksum = checksum.wrapping_add(b as u16);
        }

        checksum
    }

    /// Read a byte from the memory map.
    ///
    /// # Arguments
    /// * `address` - Address to read from
    ///
    /// # Returns
    /// [Result] with the byte value at the requested `address` or a [RuntimeError]
    pub fn read_byte(&self, address: usize) -> Result<u8, RuntimeError> {
        match self.map.get(address) {
            Some(b) => Ok(*b),
            None => fatal_error!(
                ErrorCode::InvalidAddress,
                "Byte address {:#06x} beyond end of memory ({:#06x})",
                address,
                self.map.len() - 1
            ),
        }
    }

    /// Read a word from the memory map.
    ///
    /// # Arguments
    /// * `address` - Address to read from
    ///
    /// # Returns
    /// [Result] with the word value at the requested `address` or a [RuntimeError]
    pub fn read_word(&self, address: usize) -> Result<u16, RuntimeError> {
        if address + 1 < self.map.len() {
            Ok(word_value(self.map[address], self.map[address + 1]))
        } else {
            fatal_error!(
                ErrorCode::InvalidAddress,
                "Word address {:#06x} beyond end of memory ({:#06x})",
                address,
                self.map.len() - 1
            )
        }
    }

    /// Write a byte to dynamic memory.
    ///
    /// # Arguments
    /// * `address` - Address to write to
    /// * `value` - Byte value to write
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn write_byte(&mut self, address: usize, value: u8) -> Result<(), RuntimeError> {
        if address < self.static_mark {
            debug!(target: "app::state", "Write {:#04x} to ${:04x}", value, address);
            self.map[address] = value;
            Ok(())
        } else {
            fatal_error!(
                ErrorCode::IllegalMemoryAccess,
                "Byte address {:#06x} is above the end of dynamic memory ({:#06x})",
                address,
                self.static_mark - 1
            )
        }
    }

    /// Write a word to dynamic memory.
    ///
    /// # Arguments
    /// * `address` - Address to write to
    /// * `value` - Word value to write
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn write_word(&mut self, address: usize, value: u16) -> Result<(), RuntimeError> {
        if address + 1 < self.static_mark {
            debug!(target: "app::state", "Write {:#06x} to ${:04x}", value, address);
            let (hb, lb) = byte_values(value);
            self.map[address] = hb;
            self.map[address + 1] = lb;
            Ok(())
        } else {
            fatal_error!(
                ErrorCode::IllegalMemoryAccess,
                "Word address {:#06x} is above the end of dynamic memory ({:#06x})",
                address,
                self.static_mark - 1
            )
        }
    }

    /// Copy the current contents of dynamic memory
    ///
    /// # Returns
    /// Vector containing the dynamic memory region
    pub fn dynamic(&self) -> Vec<u8> {
        self.map[..self.static_mark].to_vec()
    }

    /// Reset dynamic memory back to the initial state
    pub fn reset(&mut self) {
        self.map[..self.dynamic.len()].copy_from_slice(&self.dynamic)
    }

    /// Replace dynamic memory from a snapshot
    ///
    /// # Arguments
    /// * `data` - Dynamic memory region to restore
    ///
    /// # Returns
    /// Empty [Result] or a [RuntimeError]
    pub fn restore(&mut self, data: &[u8]) -> Result<(), RuntimeError> {
        if data.len() != self.dynamic.len() {
            fatal_error!(
                ErrorCode::Restore,
                "Restore dynamic memory size doesn't match: {:04x} != {:04x}",
                self.dynamic.len(),
                data.len()
            )
        } else {
            self.map[..data.len()].copy_from_slice(data);
            Ok(())
        }
    }
}
