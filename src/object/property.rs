use crate::{
    error::*,
    fatal_error, recoverable_error,
    zmachine::{header::HeaderField, ZMachine},
};

use super::{property_table_address, record, ObjectRecord};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// A decoded property list entry
struct PropertyEntry {
    number: u8,
    data_address: usize,
    length: usize,
}

impl PropertyEntry {
    /// Address of the following entry's size byte
    fn next(&self) -> usize {
        self.data_address + self.length
    }
}

/// Decode the property entry at an address
///
/// # Returns
/// [Result] with [Some] entry, [None] at the end of the list, or a [RuntimeError]
fn entry(zmachine: &ZMachine, address: usize) -> Result<Option<PropertyEntry>, RuntimeError> {
    let size_byte = zmachine.read_byte(address)?;
    if size_byte == 0 {
        return Ok(None);
    }

    let entry = match record(zmachine) {
        ObjectRecord::Short => PropertyEntry {
            number: size_byte & 0x1F,
            data_address: address + 1,
            length: (size_byte as usize >> 5) + 1,
        },
        ObjectRecord::Long => {
            if size_byte & 0x80 == 0x80 {
                let length = match zmachine.read_byte(address + 1)? as usize & 0x3F {
                    0 => 64,
                    l => l,
                };
                PropertyEntry {
                    number: size_byte & 0x3F,
                    data_address: address + 2,
                    length,
                }
            } else {
                PropertyEntry {
                    number: size_byte & 0x3F,
                    data_address: address + 1,
                    length: if size_byte & 0x40 == 0x40 { 2 } else { 1 },
                }
            }
        }
    };

    Ok(Some(entry))
}

/// Address of the first property entry, past the short name
fn first_entry_address(zmachine: &ZMachine, object: usize) -> Result<usize, RuntimeError> {
    let table = property_table_address(zmachine, object)?;
    let header_size = zmachine.read_byte(table)? as usize;
    Ok(table + 1 + (header_size * 2))
}

/// Find a property in an object's list.
///
/// Property numbers descend, so the walk stops at the first lower number.
fn find(
    zmachine: &ZMachine,
    object: usize,
    property: u8,
) -> Result<Option<PropertyEntry>, RuntimeError> {
    let mut address = first_entry_address(zmachine, object)?;
    while let Some(e) = entry(zmachine, address)? {
        if e.number == property {
            return Ok(Some(e));
        } else if e.number < property {
            break;
        }
        address = e.next();
    }

    Ok(None)
}

/// Read a property default value
pub fn default_property(zmachine: &ZMachine, property: u8) -> Result<u16, RuntimeError> {
    if property == 0 || property > record(zmachine).max_property() {
        return fatal_error!(
            ErrorCode::InvalidObjectProperty,
            "Invalid property {}",
            property
        );
    }

    let object_table = zmachine.header_word(HeaderField::ObjectTable)? as usize;
    zmachine.read_word(object_table + ((property as usize - 1) * 2))
}

/// Read a property value, or the default if the object doesn't have it
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `object` - Object number
/// * `property` - Property number
///
/// # Returns
/// [Result] with the value or a [RuntimeError]
pub fn property(zmachine: &ZMachine, object: usize, property: u8) -> Result<u16, RuntimeError> {
    match find(zmachine, object, property)? {
        None => default_property(zmachine, property),
        Some(e) => match e.length {
            1 => Ok(zmachine.read_byte(e.data_address)? as u16),
            2 => zmachine.read_word(e.data_address),
            _ => recoverable_error!(
                ErrorCode::InvalidObjectPropertySize,
                "Read of property {} on object {} has length {}",
                property,
                object,
                e.length
            ),
        },
    }
}

/// Get the address of a property's data
///
/// # Returns
/// [Result] with the data address, 0 if the object doesn't have the property, or a [RuntimeError]
pub fn property_data_address(
    zmachine: &ZMachine,
    object: usize,
    property: u8,
) -> Result<usize, RuntimeError> {
    Ok(find(zmachine, object, property)?.map_or(0, |e| e.data_address))
}

/// Get the length of a property from its data address
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `property_data_address` - Address of property data, as returned by [property_data_address]
///
/// # Returns
/// [Result] with the property length, 0 for address 0, or a [RuntimeError]
pub fn property_length(
    zmachine: &ZMachine,
    property_data_address: usize,
) -> Result<usize, RuntimeError> {
    if property_data_address == 0 {
        return Ok(0);
    }

    let size_byte = zmachine.read_byte(property_data_address - 1)?;
    match record(zmachine) {
        ObjectRecord::Short => Ok((size_byte as usize >> 5) + 1),
        ObjectRecord::Long => {
            if size_byte & 0x80 == 0x80 {
                // Second size byte
                match size_byte & 0x3F {
                    0 => Ok(64),
                    l => Ok(l as usize),
                }
            } else if size_byte & 0x40 == 0x40 {
                Ok(2)
            } else {
                Ok(1)
            }
        }
    }
}

/// Get the number of the property following another
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `object` - Object number
/// * `property` - Property number, or 0 for the first property
///
/// # Returns
/// [Result] with the next property number, 0 at the end of the list, or a [RuntimeError]
pub fn next_property(zmachine: &ZMachine, object: usize, property: u8) -> Result<u8, RuntimeError> {
    let address = if property == 0 {
        first_entry_address(zmachine, object)?
    } else {
        match find(zmachine, object, property)? {
            Some(e) => e.next(),
            None => {
                return fatal_error!(
                    ErrorCode::InvalidObjectProperty,
                    "Object {} does not have property {}",
                    object,
                    property
                )
            }
        }
    };

    Ok(entry(zmachine, address)?.map_or(0, |e| e.number))
}

/// Write a property value
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `object` - Object number
/// * `property` - Property number
/// * `value` - Value to write; only the low byte is written to a 1-byte property
///
/// # Returns
/// Empty [Result] or a [RuntimeError] if the object doesn't have the property
pub fn set_property(
    zmachine: &mut ZMachine,
    object: usize,
    property: u8,
    value: u16,
) -> Result<(), RuntimeError> {
    match find(zmachine, object, property)? {
        None => fatal_error!(
            ErrorCode::InvalidObjectProperty,
            "Object {} does not have property {}",
            object,
            property
        ),
        Some(e) => {
            if e.length == 1 {
                zmachine.write_byte(e.data_address, value as u8)
            } else {
                zmachine.write_word(e.data_address, value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        assert_ok, assert_ok_eq,
        test_util::{mock_default_properties, mock_object, mock_properties, mock_zmachine, test_map},
    };

    use super::*;

    fn objects(version: u8) -> ZMachine {
        let mut map = test_map(version);
        mock_default_properties(&mut map);
        mock_object(&mut map, 1, &[0x20DB, 0xA8A5], (0, 0, 0));
        if version == 3 {
            mock_properties(
                &mut map,
                1,
                &[(20, &[0x12, 0x34]), (12, &[0x56]), (5, &[1, 2, 3, 4])],
            );
        } else {
            mock_properties(
                &mut map,
                1,
                &[(40, &[0x12, 0x34]), (20, &[0x56]), (12, &[1, 2, 3, 4]), (5, &[9])],
            );
        }
        mock_object(&mut map, 2, &[], (0, 0, 0));
        mock_properties(&mut map, 2, &[]);
        mock_zmachine(map)
    }

    #[test]
    fn test_property_v3() {
        let zmachine = objects(3);
        assert_ok_eq!(property(&zmachine, 1, 20), 0x1234);
        assert_ok_eq!(property(&zmachine, 1, 12), 0x56);
        let e = property(&zmachine, 1, 5).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidObjectPropertySize);
        assert!(e.is_recoverable());
        // Default
        assert_ok_eq!(property(&zmachine, 1, 6), 0x0505);
        assert_ok_eq!(property(&zmachine, 2, 20), 0x0313);
    }

    #[test]
    fn test_property_v5() {
        let zmachine = objects(5);
        assert_ok_eq!(property(&zmachine, 1, 40), 0x1234);
        assert_ok_eq!(property(&zmachine, 1, 20), 0x56);
        assert_ok_eq!(property(&zmachine, 1, 5), 9);
        assert!(property(&zmachine, 1, 12).is_err());
        assert_ok_eq!(property(&zmachine, 1, 63), 0x0E3E);
    }

    #[test]
    fn test_default_property_invalid() {
        let zmachine = objects(3);
        let e = default_property(&zmachine, 0).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidObjectProperty);
        assert!(default_property(&zmachine, 32).is_err());
    }

    #[test]
    fn test_property_data_address_and_length() {
        let zmachine = objects(3);
        // Short name is 2 words: properties start at 0x305
        assert_ok_eq!(property_data_address(&zmachine, 1, 20), 0x306);
        assert_ok_eq!(property_data_address(&zmachine, 1, 12), 0x309);
        assert_ok_eq!(property_data_address(&zmachine, 1, 5), 0x30B);
        assert_ok_eq!(property_data_address(&zmachine, 1, 7), 0);
        assert_ok_eq!(property_length(&zmachine, 0x306), 2);
        assert_ok_eq!(property_length(&zmachine, 0x309), 1);
        assert_ok_eq!(property_length(&zmachine, 0x30B), 4);
        assert_ok_eq!(property_length(&zmachine, 0), 0);

        let zmachine = objects(5);
        assert_ok_eq!(property_data_address(&zmachine, 1, 40), 0x306);
        assert_ok_eq!(property_data_address(&zmachine, 1, 20), 0x309);
        // Two size bytes
        assert_ok_eq!(property_data_address(&zmachine, 1, 12), 0x30C);
        assert_ok_eq!(property_data_address(&zmachine, 1, 5), 0x311);
        assert_ok_eq!(property_length(&zmachine, 0x306), 2);
        assert_ok_eq!(property_length(&zmachine, 0x309), 1);
        assert_ok_eq!(property_length(&zmachine, 0x30C), 4);
        assert_ok_eq!(property_length(&zmachine, 0x311), 1);
    }

    #[test]
    fn test_property_length_64() {
        let mut map = test_map(5);
        mock_object(&mut map, 1, &[], (0, 0, 0));
        // Size bytes with a length field of 0
        map[0x301] = 0x80 | 10;
        map[0x302] = 0x80;
        let zmachine = mock_zmachine(map);
        assert_ok_eq!(property_data_address(&zmachine, 1, 10), 0x303);
        assert_ok_eq!(property_length(&zmachine, 0x303), 64);
    }

    #[test]
    fn test_next_property() {
        let zmachine = objects(3);
        assert_ok_eq!(next_property(&zmachine, 1, 0), 20);
        assert_ok_eq!(next_property(&zmachine, 1, 20), 12);
        assert_ok_eq!(next_property(&zmachine, 1, 12), 5);
        assert_ok_eq!(next_property(&zmachine, 1, 5), 0);
        assert_ok_eq!(next_property(&zmachine, 2, 0), 0);
        let e = next_property(&zmachine, 1, 6).unwrap_err();
        assert_eq!(e.code(), ErrorCode::InvalidObjectProperty);

        let zmachine = objects(5);
        assert_ok_eq!(next_property(&zmachine, 1, 20), 12);
        assert_ok_eq!(next_property(&zmachine, 1, 12), 5);
    }

    #[test]
    fn test_set_property() {
        for version in [3, 5] {
            let mut zmachine = objects(version);
            let (word, byte) = if version == 3 { (20, 12) } else { (40, 20) };
            assert_ok!(set_property(&mut zmachine, 1, word, 0xABCD));
            assert_ok_eq!(property(&zmachine, 1, word), 0xABCD);
            assert_ok!(set_property(&mut zmachine, 1, byte, 0xABCD));
            assert_ok_eq!(property(&zmachine, 1, byte), 0xCD);
            let e = set_property(&mut zmachine, 2, word, 1).unwrap_err();
            assert_eq!(e.code(), ErrorCode::InvalidObjectProperty);
            assert!(!e.is_recoverable());
        }
    }
}
