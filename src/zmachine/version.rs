//! Version profile, resolved once from the header version byte
use crate::{error::*, fatal_error, object::ObjectRecord};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// Version-dependent layout and addressing rules
pub struct VersionProfile {
    /// Story file version
    version: u8,
    /// Object table record shape
    object_record: ObjectRecord,
    /// Left shift applied to packed addresses
    packed_shift: u8,
    /// Routine headers carry default values for local variables
    default_locals: bool,
}

impl TryFrom<u8> for VersionProfile {
    type Error = RuntimeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        let (object_record, packed_shift, default_locals) = match value {
            3 => (ObjectRecord::Short, 1, true),
            4 => (ObjectRecord::Long, 2, true),
            5 => (ObjectRecord::Long, 2, false),
            8 => (ObjectRecord::Long, 3, false),
            _ => {
                return fatal_error!(
                    ErrorCode::UnsupportedVersion,
                    "Version {} is not supported",
                    value
                )
            }
        };

        Ok(VersionProfile {
            version: value,
            object_record,
            packed_shift,
            default_locals,
        })
    }
}

impl VersionProfile {
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn object_record(&self) -> ObjectRecord {
        self.object_record
    }

    /// Unpack a packed routine or string address
    ///
    /// # Arguments
    /// * `address` - packed address
    ///
    /// # Returns
    /// Byte address
    pub fn unpack(&self, address: u16) -> usize {
        (address as usize) << self.packed_shift
    }

    /// Do routine headers supply default local variable values?
    pub fn default_locals(&self) -> bool {
        self.default_locals
    }

    /// Number of words in an encoded dictionary word
    pub fn dictionary_words(&self) -> usize {
        if self.version < 4 {
            2
        } else {
            3
        }
    }

    /// Offset of the first character in a READ text buffer
    pub fn text_offset(&self) -> usize {
        if self.version < 5 {
            1
        } else {
            2
        }
    }
}
