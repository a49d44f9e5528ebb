//! [ZSCII](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html) text encoding
use crate::{
    error::*,
    fatal_error,
    zmachine::{header::HeaderField, ZMachine},
};

/// Version 3+ [alphabets](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html#two), as ZSCII.
///
/// A2 Z-character 6 is the ZSCII escape and never read from this table.
const ALPHABETS: [[u8; 26]; 3] = [
    *b"abcdefghijklmnopqrstuvwxyz",
    *b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    *b" \r0123456789.,!?_#'\"/\\-:()",
];

/// Deepest allowed abbreviation expansion
const ABBREVIATION_DEPTH: u8 = 3;

/// Default [Unicode translation table](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html#eight) for ZSCII 155-223
const EXTRA_CHARACTERS: [char; 69] = [
    'ä', 'ö', 'ü', 'Ä', 'Ö', 'Ü', 'ß', '»', '«', 'ë', 'ï', 'ÿ', 'Ë', 'Ï', 'á', 'é', 'í', 'ó', 'ú',
    'ý', 'Á', 'É', 'Í', 'Ó', 'Ú', 'Ý', 'à', 'è', 'ì', 'ò', 'ù', 'À', 'È', 'Ì', 'Ò', 'Ù', 'â', 'ê',
    'î', 'ô', 'û', 'Â', 'Ê', 'Î', 'Ô', 'Û', 'å', 'Å', 'ø', 'Ø', 'ã', 'ñ', 'õ', 'Ã', 'Ñ', 'Õ', 'æ',
    'Æ', 'ç', 'Ç', 'þ', 'ð', 'Þ', 'Ð', '£', 'œ', 'Œ', '¡', '¿',
];

fn zchars(ztext: &[u16]) -> Vec<u8> {
    ztext
        .iter()
        .flat_map(|w| [(w >> 10 & 0x1F) as u8, (w >> 5 & 0x1F) as u8, (w & 0x1F) as u8])
        .collect()
}

/// Decode an [abbreviation](https://inform-fiction.org/zmachine/standards/z1point1/sect03.html#three)
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `abbrev_table` - Abbreviation table, 1-3
/// * `index` - Abbreviation index within the table
/// * `depth` - Expansion depth of the abbreviation
///
/// # Returns
/// [Result] containing the abbreviation text or a [RuntimeError]
fn abbreviation(
    zmachine: &ZMachine,
    abbrev_table: u8,
    index: u8,
    depth: u8,
) -> Result<Vec<u16>, RuntimeError> {
    if depth > ABBREVIATION_DEPTH {
        return fatal_error!(
            ErrorCode::InvalidAbbreviation,
            "Abbreviation {}/{} nested more than {} deep",
            abbrev_table,
            index,
            ABBREVIATION_DEPTH
        );
    }

    let table = zmachine.header_word(HeaderField::AbbreviationsTable)? as usize;
    let entry = (32 * (abbrev_table as usize - 1) + index as usize) * 2;
    let address = zmachine.read_word(table + entry)? as usize * 2;
    debug!(target: "app::text", "Abbreviation {}/{} at ${:05x}", abbrev_table, index, address);
    decode(zmachine, &zmachine.string_literal(address)?, depth)
}

fn decode(zmachine: &ZMachine, ztext: &[u16], depth: u8) -> Result<Vec<u16>, RuntimeError> {
    let z = zchars(ztext);
    let mut s = Vec::new();
    let mut alphabet = 0;
    let mut i = 0;

    while i < z.len() {
        let b = z[i];
        match b {
            0 => s.push(0x20),
            1..=3 => {
                // An abbreviation split by the end of the string is dropped
                if let Some(index) = z.get(i + 1) {
                    s.append(&mut abbreviation(zmachine, b, *index, depth + 1)?);
                }
                i += 1;
            }
            4 => alphabet = 1,
            5 => alphabet = 2,
            6 if alphabet == 2 => {
                if let (Some(hb), Some(lb)) = (z.get(i + 1), z.get(i + 2)) {
                    s.push(((*hb as u16) << 5) | *lb as u16);
                }
                i += 2;
            }
            _ => s.push(ALPHABETS[alphabet][b as usize - 6] as u16),
        }

        if b != 4 && b != 5 {
            alphabet = 0;
        }
        i += 1;
    }

    Ok(s)
}

/// Decode encoded text to ZSCII
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `ztext` - Encoded text words
///
/// # Returns
/// [Result] containing the ZSCII text or a [RuntimeError]
pub fn from_vec(zmachine: &ZMachine, ztext: &[u16]) -> Result<Vec<u16>, RuntimeError> {
    decode(zmachine, ztext, 0)
}

/// Read encoded text from an address and decode it to ZSCII
///
/// # Arguments
/// * `zmachine` - Reference to the Z-machine
/// * `address` - Address of the text
///
/// # Returns
/// [Result] containing the ZSCII text or a [RuntimeError]
pub fn as_text(zmachine: &ZMachine, address: usize) -> Result<Vec<u16>, RuntimeError> {
    from_vec(zmachine, &zmachine.string_literal(address)?)
}

/// Find the Z-characters for a ZSCII character
fn find_char(zscii: u16) -> Vec<u8> {
    if zscii == 0x20 {
        return vec![0];
    }

    for (a, alphabet) in ALPHABETS.iter().enumerate() {
        // A2 index 0 is the escape and index 1 can't be typed
        let start = if a == 2 { 2 } else { 0 };
        if let Some(i) = alphabet[start..].iter().position(|c| *c as u16 == zscii) {
            let z = (i + start + 6) as u8;
            return match a {
                0 => vec![z],
                1 => vec![4, z],
                _ => vec![5, z],
            };
        }
    }

    vec![5, 6, (zscii >> 5 & 0x1F) as u8, (zscii & 0x1F) as u8]
}

/// Encode ZSCII text to a fixed number of words, padding with Z-character 5.
///
/// # Arguments
/// * `text` - ZSCII text, already lower-cased
/// * `words` - Number of words to encode into
///
/// # Returns
/// Encoded words with bit 15 set on the last word
pub fn encode_text(text: &[u16], words: usize) -> Vec<u16> {
    let mut z: Vec<u8> = text.iter().flat_map(|c| find_char(*c)).collect();
    z.resize(words * 3, 5);

    let mut encoded: Vec<u16> = z
        .chunks(3)
        .map(|c| ((c[0] as u16) << 10) | ((c[1] as u16) << 5) | c[2] as u16)
        .collect();
    if let Some(w) = encoded.last_mut() {
        *w |= 0x8000;
    }

    encoded
}

/// Convert a ZSCII output character to a [char]
///
/// # Returns
/// [Option] with the character, or [None] if it has no output representation
pub fn zscii_to_char(zscii: u16) -> Option<char> {
    match zscii {
        13 => Some('\n'),
        32..=126 => Some(zscii as u8 as char),
        155..=223 => Some(EXTRA_CHARACTERS[zscii as usize - 155]),
        _ => None,
    }
}

pub fn zscii_to_string(text: &[u16]) -> String {
    text.iter().filter_map(|c| zscii_to_char(*c)).collect()
}

/// Convert a [char] to ZSCII
///
/// # Returns
/// [Option] with the ZSCII character, or [None] if there is no equivalent
pub fn char_to_zscii(c: char) -> Option<u16> {
    match c {
        '\n' | '\r' => Some(13),
        ' '..='~' => Some(c as u16),
        _ => EXTRA_CHARACTERS
            .iter()
            .position(|x| *x == c)
            .map(|i| i as u16 + 155),
    }
}
