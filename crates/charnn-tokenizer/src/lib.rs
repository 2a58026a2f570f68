//! Character-level codec for charnn
//!
//! This crate provides:
//! - The fixed printable-ASCII alphabet with a reserved null symbol
//! - Lossy, total encoding of text to ids
//! - Total decoding of ids back to text
//!
//! # Example
//!
//! ```
//! use charnn_tokenizer::Tokenizer;
//!
//! let tokenizer = Tokenizer::new();
//! let ids = tokenizer.encode("hello world");
//! assert_eq!(tokenizer.decode(&ids), "hello world");
//!
//! // Characters outside the alphabet fall back to the null id
//! assert_eq!(tokenizer.encode("é"), vec![0]);
//! ```

pub mod vocab;

pub use vocab::{Alphabet, VocabularyError, NULL_ID, PRINTABLE, VOCAB_SIZE};

/// Main codec interface
///
/// Cheap to construct and copy: it only borrows the process-wide [`Alphabet`].
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    alphabet: &'static Alphabet,
}

impl Tokenizer {
    /// Create a tokenizer over the global alphabet
    pub fn new() -> Self {
        Self {
            alphabet: Alphabet::global(),
        }
    }

    /// Encode text to token ids
    ///
    /// Each character maps independently; characters outside the alphabet map
    /// to [`NULL_ID`]. Never fails.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(|c| self.alphabet.lookup(c)).collect()
    }

    /// Encode a batch of texts
    pub fn encode_batch(&self, texts: &[&str]) -> Vec<Vec<u32>> {
        texts.iter().map(|text| self.encode(text)).collect()
    }

    /// Decode token ids to text
    ///
    /// The null id and ids with no mapping render as the empty string.
    pub fn decode(&self, ids: &[u32]) -> String {
        ids.iter().filter_map(|&id| self.alphabet.symbol(id)).collect()
    }

    /// Decode a single id, `None` when it renders as the empty string
    pub fn decode_id(&self, id: u32) -> Option<char> {
        self.alphabet.symbol(id)
    }

    /// Decode a batch of token id sequences
    pub fn decode_batch(&self, ids_batch: &[Vec<u32>]) -> Vec<String> {
        ids_batch.iter().map(|ids| self.decode(ids)).collect()
    }

    /// Get vocabulary size
    pub fn vocab_size(&self) -> usize {
        self.alphabet.size()
    }

    /// The alphabet backing this tokenizer
    pub fn alphabet(&self) -> &'static Alphabet {
        self.alphabet
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
