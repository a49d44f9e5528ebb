use crate::{error::*, recoverable_error, zmachine::ZMachine};

use super::{object_address, record};

/// Resolve an attribute to its byte address and bit mask
fn attribute_bit(
    zmachine: &ZMachine,
    object: usize,
    attribute: u8,
) -> Result<(usize, u8), RuntimeError> {
    let object_address = object_address(zmachine, object)?;
    if attribute >= record(zmachine).attribute_count() {
        warn!(target: "app::object", "Invalid attribute {} on object {}", attribute, object);
        return recoverable_error!(
            ErrorCode::InvalidObjectAttribute,
            "Invalid attribute {} on object {}",
            attribute,
            object
        );
    }

    let address = object_address + (attribute as usize / 8);
    let mask = 1 << (7 - (attribute % 8));
    Ok((address, mask))
}

pub fn value(zmachine: &ZMachine, object: usize, attribute: u8) -> Result<bool, RuntimeError> {
    let (address, mask) = attribute_bit(zmachine, object, attribute)?;
    let value = zmachine.read_byte(address)?;
    Ok(value & mask == mask)
}

pub fn set(zmachine: &mut ZMachine, object: usize, attribute: u8) -> Result<(), RuntimeError> {
    let (address, mask) = attribute_bit(zmachine, object, attribute)?;
    let attribute_byte = zmachine.read_byte(address)?;
    zmachine.write_byte(address, attribute_byte | mask)
}

pub fn clear(zmachine: &mut ZMachine, object: usize, attribute: u8) -> Result<(), RuntimeError> {
    let (address, mask) = attribute_bit(zmachine, object, attribute)?;
    let attribute_byte = zmachine.read_byte(address)?;
    zmachine.write_byte(address, attribute_byte & !mask)
}
