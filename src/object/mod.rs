//! [Object table](https://inform-fiction.org/zmachine/standards/z1point1/sect12.html) access
use crate::{
    error::*,
    fatal_error, text,
    zmachine::{header::HeaderField, ZMachine},
};

pub mod attribute;
pub mod property;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Object record shape, selected once from the story version
pub enum ObjectRecord {
    /// Version 3: 9-byte records with 1-byte links
    Short,
    /// Version 4+: 14-byte records with 2-byte links
    Long,
}

impl ObjectRecord {
    /// Size of a record, in bytes
    pub fn size(&self) -> usize {
        match self {
            ObjectRecord::Short => 9,
            ObjectRecord::Long => 14,
        }
    }

    /// Size of the property defaults table that precedes the records, in bytes
    pub fn defaults_size(&self) -> usize {
        match self {
            ObjectRecord::Short => 62,
            ObjectRecord::Long => 126,
        }
    }

    pub fn max_objects(&self) -> usize {
        match self {
            ObjectRecord::Short => 255,
            ObjectRecord::Long => 65534,
        }
    }

    pub fn attribute_count(&self) -> u8 {
        match self {
            ObjectRecord::Short => 32,
            ObjectRecord::Long => 48,
        }
    }

    pub fn max_property(&self) -> u8 {
        match self {
            ObjectRecord::Short => 31,
            ObjectRecord::Long => 63,
        }
    }

    fn parent_offset(&self) -> usize {
        match self {
            ObjectRecord::Short => 4,
            ObjectRecord::Long => 6,
        }
    }

    fn sibling_offset(&self) -> usize {
        match self {
            ObjectRecord::Short => 5,
            ObjectRecord::Long => 8,
        }
    }

    fn child_offset(&self) -> usize {
        match self {
            ObjectRecord::Short => 6,
            ObjectRecord::Long => 10,
        }
    }

    fn property_offset(&self) -> usize {
        match self {
            ObjectRecord::Short => 7,
            ObjectRecord::Long => 12,
        }
    }
}

fn record(zmachine: &ZMachine) -> ObjectRecord {
    zmachine.profile().object_record()
}

/// Get the address of an object's record
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `object` - Object number
///
/// # Returns
/// [Result] with the record address or a [RuntimeError] if the object number is invalid
pub fn object_address(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    let record = record(zmachine);
    if object == 0 || object > record.max_objects() {
        return fatal_error!(ErrorCode::InvalidObject, "Invalid object {}", object);
    }

    let table = zmachine.header_word(HeaderField::ObjectTable)? as usize;
    Ok(table + record.defaults_size() + (record.size() * (object - 1)))
}

fn link(zmachine: &ZMachine, object: usize, offset: usize) -> Result<usize, RuntimeError> {
    let address = object_address(zmachine, object)? + offset;
    match record(zmachine) {
        ObjectRecord::Short => Ok(zmachine.read_byte(address)? as usize),
        ObjectRecord::Long => Ok(zmachine.read_word(address)? as usize),
    }
}

fn set_link(
    zmachine: &mut ZMachine,
    object: usize,
    offset: usize,
    value: usize,
) -> Result<(), RuntimeError> {
    let address = object_address(zmachine, object)? + offset;
    match record(zmachine) {
        ObjectRecord::Short => zmachine.write_byte(address, value as u8),
        ObjectRecord::Long => zmachine.write_word(address, value as u16),
    }
}

pub fn parent(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    link(zmachine, object, record(zmachine).parent_offset())
}

pub fn sibling(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    link(zmachine, object, record(zmachine).sibling_offset())
}

pub fn child(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    link(zmachine, object, record(zmachine).child_offset())
}

pub fn set_parent(zmachine: &mut ZMachine, object: usize, parent: usize) -> Result<(), RuntimeError> {
    let offset = record(zmachine).parent_offset();
    set_link(zmachine, object, offset, parent)
}

pub fn set_sibling(
    zmachine: &mut ZMachine,
    object: usize,
    sibling: usize,
) -> Result<(), RuntimeError> {
    let offset = record(zmachine).sibling_offset();
    set_link(zmachine, object, offset, sibling)
}

pub fn set_child(zmachine: &mut ZMachine, object: usize, child: usize) -> Result<(), RuntimeError> {
    let offset = record(zmachine).child_offset();
    set_link(zmachine, object, offset, child)
}

/// Get the address of an object's property table
pub fn property_table_address(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    let address = object_address(zmachine, object)? + record(zmachine).property_offset();
    Ok(zmachine.read_word(address)? as usize)
}

/// Decode an object's short name
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `object` - Object number
///
/// # Returns
/// [Result] with the ZSCII short name or a [RuntimeError]
pub fn short_name(zmachine: &ZMachine, object: usize) -> Result<Vec<u16>, RuntimeError> {
    let table = property_table_address(zmachine, object)?;
    let words = zmachine.read_byte(table)? as usize;
    let mut ztext = Vec::new();
    for i in 0..words {
        ztext.push(zmachine.read_word(table + 1 + (i * 2))?);
    }

    text::from_vec(zmachine, &ztext)
}

/// Detach an object from its parent.
///
/// The object keeps its children; its parent and sibling links are cleared.
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `object` - Object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError] if the tree is corrupt
pub fn remove(zmachine: &mut ZMachine, object: usize) -> Result<(), RuntimeError> {
    let parent = parent(zmachine, object)?;
    let next = sibling(zmachine, object)?;

    if parent != 0 {
        let first = child(zmachine, parent)?;
        if first == object {
            set_child(zmachine, parent, next)?;
        } else {
            let max = record(zmachine).max_objects();
            let mut previous = first;
            let mut visited = 0;
            loop {
                if previous == 0 || visited > max {
                    return fatal_error!(
                        ErrorCode::InvalidObjectTree,
                        "Object {} not found in the children of its parent {}",
                        object,
                        parent
                    );
                }

                let s = sibling(zmachine, previous)?;
                if s == object {
                    set_sibling(zmachine, previous, next)?;
                    break;
                }
                previous = s;
                visited += 1;
            }
        }
    }

    debug!(target: "app::object", "Remove object {} from {}", object, parent);
    set_parent(zmachine, object, 0)?;
    set_sibling(zmachine, object, 0)
}

/// Move an object to become the first child of another
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `object` - Object number
/// * `destination` - New parent object number
///
/// # Returns
/// Empty [Result] or a [RuntimeError] if the move would create a cycle
pub fn insert(zmachine: &mut ZMachine, object: usize, destination: usize) -> Result<(), RuntimeError> {
    // Validate both objects before changing anything
    object_address(zmachine, object)?;
    object_address(zmachine, destination)?;

    let max = record(zmachine).max_objects();
    let mut ancestor = destination;
    let mut depth = 0;
    while ancestor != 0 {
        if ancestor == object || depth > max {
            return fatal_error!(
                ErrorCode::InvalidObjectTree,
                "Inserting object {} into {} would create a cycle",
                object,
                destination
            );
        }
        ancestor = parent(zmachine, ancestor)?;
        depth += 1;
    }

    remove(zmachine, object)?;
    let first = child(zmachine, destination)?;
    set_sibling(zmachine, object, first)?;
    set_child(zmachine, destination, object)?;
    debug!(target: "app::object", "Insert object {} into {}", object, destination);
    set_parent(zmachine, object, destination)
}
