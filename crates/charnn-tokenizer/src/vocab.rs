//! Fixed character alphabet

use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

/// Printable characters in canonical order: tab, newline, space, then every
/// single-byte printable glyph in ASCII order.
pub const PRINTABLE: &str = "\t\n !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRST\
UVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";

/// Id of the null symbol. Characters outside the alphabet encode to it.
pub const NULL_ID: u32 = 0;

/// Number of symbols in the alphabet, null symbol included.
pub const VOCAB_SIZE: usize = PRINTABLE.len() + 1;

static ALPHABET: LazyLock<Alphabet> = LazyLock::new(Alphabet::build);

/// Errors that can occur during strict alphabet lookups
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("Character not found in alphabet: {0:?}")]
    CharNotFound(char),
    #[error("ID not found in alphabet: {0}")]
    IdNotFound(u32),
}

/// Bidirectional mapping between characters and ids
///
/// Id 0 is the null symbol, which renders as the empty string. Ids `1..VOCAB_SIZE`
/// follow [`PRINTABLE`] order, so they are identical in every process and in
/// every model trained against this alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    char_to_id: HashMap<char, u32>,
    id_to_char: Vec<Option<char>>,
}

impl Alphabet {
    /// Build the alphabet from [`PRINTABLE`]. Pure and deterministic.
    pub fn build() -> Self {
        let mut id_to_char = Vec::with_capacity(VOCAB_SIZE);
        id_to_char.push(None);
        id_to_char.extend(PRINTABLE.chars().map(Some));

        let char_to_id = id_to_char
            .iter()
            .enumerate()
            .filter_map(|(id, c)| c.map(|c| (c, id as u32)))
            .collect();

        Self {
            char_to_id,
            id_to_char,
        }
    }

    /// The process-wide alphabet, built on first use
    pub fn global() -> &'static Alphabet {
        &ALPHABET
    }

    /// Get the id for a character
    ///
    /// Returns an error if the character is not in the alphabet.
    pub fn char_to_id(&self, c: char) -> Result<u32, VocabularyError> {
        self.char_to_id
            .get(&c)
            .copied()
            .ok_or(VocabularyError::CharNotFound(c))
    }

    /// Get the character for an id
    ///
    /// The null symbol maps to `Ok(None)`; ids past the end are an error.
    pub fn id_to_char(&self, id: u32) -> Result<Option<char>, VocabularyError> {
        self.id_to_char
            .get(id as usize)
            .copied()
            .ok_or(VocabularyError::IdNotFound(id))
    }

    /// Id for `c`, falling back to [`NULL_ID`]
    pub fn lookup(&self, c: char) -> u32 {
        self.char_to_id.get(&c).copied().unwrap_or(NULL_ID)
    }

    /// Character for `id`, `None` for the null symbol and unknown ids
    pub fn symbol(&self, id: u32) -> Option<char> {
        self.id_to_char.get(id as usize).copied().flatten()
    }

    /// Check if a character is part of the alphabet
    pub fn contains_char(&self, c: char) -> bool {
        self.char_to_id.contains_key(&c)
    }

    /// Number of symbols, null symbol included
    pub fn size(&self) -> usize {
        self.id_to_char.len()
    }

    /// Stable string identifying the symbol order.
    ///
    /// Stored in checkpoints so a model is never paired with a different id layout.
    pub fn fingerprint(&self) -> String {
        let symbols: String = self.id_to_char.iter().flatten().collect();
        format!("{}:{}", self.size(), symbols.escape_default())
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_size() {
        let alphabet = Alphabet::build();
        assert_eq!(alphabet.size(), VOCAB_SIZE);
        assert_eq!(VOCAB_SIZE, 98);
    }

    #[test]
    fn test_alphabet_order() {
        let alphabet = Alphabet::build();
        assert_eq!(alphabet.char_to_id('\t').unwrap(), 1);
        assert_eq!(alphabet.char_to_id('\n').unwrap(), 2);
        assert_eq!(alphabet.char_to_id(' ').unwrap(), 3);
        assert_eq!(alphabet.char_to_id('!').unwrap(), 4);
        assert_eq!(alphabet.char_to_id('~').unwrap(), 97);
    }

    #[test]
    fn test_null_symbol() {
        let alphabet = Alphabet::build();
        assert_eq!(alphabet.id_to_char(NULL_ID).unwrap(), None);
        assert_eq!(alphabet.symbol(NULL_ID), None);
    }

    #[test]
    fn test_unknown_char() {
        let alphabet = Alphabet::build();
        assert_eq!(
            alphabet.char_to_id('é'),
            Err(VocabularyError::CharNotFound('é'))
        );
        assert_eq!(alphabet.lookup('é'), NULL_ID);
        assert_eq!(alphabet.lookup('\r'), NULL_ID);
    }

    #[test]
    fn test_unknown_id() {
        let alphabet = Alphabet::build();
        assert_eq!(
            alphabet.id_to_char(VOCAB_SIZE as u32),
            Err(VocabularyError::IdNotFound(VOCAB_SIZE as u32))
        );
        assert_eq!(alphabet.symbol(1000), None);
    }

    #[test]
    fn test_global_matches_build() {
        assert_eq!(Alphabet::global(), &Alphabet::build());
        assert_eq!(Alphabet::global().fingerprint(), Alphabet::build().fingerprint());
    }
}
