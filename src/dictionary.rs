//! [Dictionary](https://inform-fiction.org/zmachine/standards/z1point1/sect13.html) lookup and lexical analysis
use std::cmp::Ordering;

use crate::{error::*, text, zmachine::ZMachine};

#[derive(Clone, Debug, Eq, PartialEq)]
/// Dictionary header, read from memory
pub struct Dictionary {
    /// Word separator characters
    separators: Vec<u16>,
    /// Address of the first entry
    entries: usize,
    /// Entry size, in bytes
    entry_length: usize,
    entry_count: usize,
    /// Entries may be binary searched
    sorted: bool,
    /// Words in an encoded entry
    words: usize,
}

/// Read the encoded word of an entry
fn entry_word(zmachine: &ZMachine, address: usize, words: usize) -> Result<Vec<u16>, RuntimeError> {
    let mut w = Vec::new();
    for i in 0..words {
        w.push(zmachine.read_word(address + (i * 2))?);
    }
    Ok(w)
}

impl Dictionary {
    /// Read a dictionary header
    ///
    /// # Arguments
    /// * `zmachine` - Reference to the Z-machine
    /// * `address` - Dictionary address
    ///
    /// # Returns
    /// [Result] with the [Dictionary] or a [RuntimeError]
    pub fn new(zmachine: &ZMachine, address: usize) -> Result<Dictionary, RuntimeError> {
        let separator_count = zmachine.read_byte(address)? as usize;
        let mut separators = Vec::new();
        for i in 1..=separator_count {
            separators.push(zmachine.read_byte(address + i)? as u16);
        }

        let entry_length = zmachine.read_byte(address + separator_count + 1)? as usize;
        // A negative count marks an unsorted dictionary
        let count = zmachine.read_word(address + separator_count + 2)? as i16;
        let entries = address + separator_count + 4;
        let words = zmachine.profile().dictionary_words();
        let entry_count = count.unsigned_abs() as usize;

        let sorted = if count > 1 {
            // Trust the sort order only if the first and last entries agree with it
            let first = entry_word(zmachine, entries, words)?;
            let last = entry_word(zmachine, entries + ((entry_count - 1) * entry_length), words)?;
            first <= last
        } else {
            count > 0
        };

        debug!(target: "app::text", "Dictionary at ${:04x}: {} separators, {} entries of {} bytes, sorted: {}", address, separator_count, entry_count, entry_length, sorted);
        Ok(Dictionary {
            separators,
            entries,
            entry_length,
            entry_count,
            sorted,
            words,
        })
    }

    pub fn separators(&self) -> &[u16] {
        &self.separators
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    /// Find an encoded word
    ///
    /// # Arguments
    /// * `zmachine` - Reference to the Z-machine
    /// * `word` - Encoded word
    ///
    /// # Returns
    /// [Result] with the address of the matching entry, 0 if there is none, or a [RuntimeError]
    pub fn lookup(&self, zmachine: &ZMachine, word: &[u16]) -> Result<usize, RuntimeError> {
        if self.sorted {
            self.search(zmachine, word)
        } else {
            self.scan(zmachine, word)
        }
    }

    fn search(&self, zmachine: &ZMachine, word: &[u16]) -> Result<usize, RuntimeError> {
        let mut min = 0;
        let mut max = self.entry_count;
        while min < max {
            let pivot = min + ((max - min) / 2);
            let address = self.entries + (pivot * self.entry_length);
            match entry_word(zmachine, address, self.words)?.as_slice().cmp(word) {
                Ordering::Equal => return Ok(address),
                Ordering::Less => min = pivot + 1,
                Ordering::Greater => max = pivot,
            }
        }

        Ok(0)
    }

    fn scan(&self, zmachine: &ZMachine, word: &[u16]) -> Result<usize, RuntimeError> {
        for i in 0..self.entry_count {
            let address = self.entries + (i * self.entry_length);
            if entry_word(zmachine, address, self.words)? == word {
                return Ok(address);
            }
        }

        Ok(0)
    }
}

/// Split text into tokens.
///
/// Spaces separate tokens.  Each separator character is a token of its own.
///
/// # Arguments
/// * `text` - ZSCII text
/// * `separators` - Separator characters
///
/// # Returns
/// Vector of (start, length) tokens
pub fn tokenize(text: &[u16], separators: &[u16]) -> Vec<(usize, usize)> {
    let mut tokens = Vec::new();
    let mut start = 0;

    for (i, c) in text.iter().enumerate() {
        if *c == 0x20 || separators.contains(c) {
            if i > start {
                tokens.push((start, i - start));
            }
            if *c != 0x20 {
                tokens.push((i, 1));
            }
            start = i + 1;
        }
    }

    if text.len() > start {
        tokens.push((start, text.len() - start));
    }

    tokens
}

/// Encode a token to dictionary resolution
pub fn encode_token(zmachine: &ZMachine, token: &[u16]) -> Vec<u16> {
    text::encode_text(token, zmachine.profile().dictionary_words())
}

/// Read the text from a READ text buffer
///
/// # Returns
/// [Result] with the ZSCII text or a [RuntimeError]
fn buffer_text(zmachine: &ZMachine, text_buffer: usize) -> Result<Vec<u16>, RuntimeError> {
    let mut text = Vec::new();
    if zmachine.version() < 5 {
        // 0-terminated
        let max = (zmachine.read_byte(text_buffer)? as usize).saturating_sub(1);
        for i in 0..max {
            match zmachine.read_byte(text_buffer + 1 + i)? {
                0 => break,
                b => text.push(b as u16),
            }
        }
    } else {
        let n = zmachine.read_byte(text_buffer + 1)? as usize;
        for i in 0..n {
            text.push(zmachine.read_byte(text_buffer + 2 + i)? as u16);
        }
    }

    Ok(text
        .iter()
        .map(|c| match *c {
            0x41..=0x5A => *c + 0x20,
            _ => *c,
        })
        .collect())
}

/// Tokenize a text buffer into a parse buffer
///
/// # Arguments
/// * `zmachine` - Mutable reference to the Z-machine
/// * `text_buffer` - Text buffer address
/// * `parse_buffer` - Parse buffer address
/// * `dictionary` - Dictionary address
/// * `skip_unknown` - If `true`, entries for words not in the dictionary are left unchanged
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn parse_text(
    zmachine: &mut ZMachine,
    text_buffer: usize,
    parse_buffer: usize,
    dictionary: usize,
    skip_unknown: bool,
) -> Result<(), RuntimeError> {
    let dictionary = Dictionary::new(zmachine, dictionary)?;
    let text = buffer_text(zmachine, text_buffer)?;
    let offset = zmachine.profile().text_offset();
    let max_tokens = zmachine.read_byte(parse_buffer)? as usize;

    let tokens = tokenize(&text, dictionary.separators());
    let count = usize::min(tokens.len(), max_tokens);
    for (i, (start, length)) in tokens.iter().take(count).enumerate() {
        let token = &text[*start..*start + *length];
        let encoded = encode_token(zmachine, token);
        let entry = dictionary.lookup(zmachine, &encoded)?;
        debug!(target: "app::text", "Token {:?} => ${:04x}", text::zscii_to_string(token), entry);

        if entry == 0 && skip_unknown {
            continue;
        }

        let address = parse_buffer + 2 + (i * 4);
        zmachine.write_word(address, entry as u16)?;
        zmachine.write_byte(address + 2, *length as u8)?;
        zmachine.write_byte(address + 3, (*start + offset) as u8)?;
    }

    zmachine.write_byte(parse_buffer + 1, count as u8)
}
