//! Token boundary tracking for the autocomplete host.

use std::any::Any;

/// Token boundary protocol consumed by the autocomplete host.
///
/// The engine implements this itself with [`BoundaryTokenizer`] rather than
/// delegating to the host, since the next token may only begin after the last
/// committed chip.
pub trait Tokenizer: Any {
    /// Offset at which the token containing `cursor` begins.
    fn find_token_start(&self, text: &str, cursor: usize) -> usize;
    /// Offset at which the token containing `cursor` ends.
    fn find_token_end(&self, text: &str, cursor: usize) -> usize;
    /// Terminate a token for insertion into the buffer.
    fn terminate_token(&self, text: &str) -> String;
}

/// Tracks the char offset where the next autocomplete token may begin.
///
/// The tracked start is advanced past each committed chip and its separator,
/// and rewound when chips are removed. This is the only tokenizer the engine
/// accepts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BoundaryTokenizer {
    /// Offset of the first char eligible for tokenization.
    start: usize,
}

impl BoundaryTokenizer {
    /// Create a tracker starting at offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// The tracked start offset.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Move the tracked start offset.
    pub(crate) fn set_start(&mut self, start: usize) {
        self.start = start;
    }
}

impl Tokenizer for BoundaryTokenizer {
    fn find_token_start(&self, text: &str, cursor: usize) -> usize {
        // Skip any leading spaces between the tracked start and the cursor.
        let mut offset = self.start;
        for ch in text.chars().skip(self.start) {
            if offset >= cursor || ch != ' ' {
                break;
            }
            offset += 1;
        }
        offset
    }

    fn find_token_end(&self, text: &str, _cursor: usize) -> usize {
        text.chars().count()
    }

    fn terminate_token(&self, text: &str) -> String {
        text.to_owned()
    }
}
