//! External scanner support.
//!
//! Grammars may declare terminals the DFA cannot express, such as
//! indentation, heredocs or nested comments. Those are recognized by user
//! code implementing [`ExternalScanner`], consulted before the internal
//! lexer whenever the current state admits an external terminal.

use cambium_core::Length;
use cambium_core::grammar::{Symbol, SymbolSet};

use crate::input::InputReader;
use crate::lexer::ScannedToken;

/// User-provided recognizer for external terminals.
pub trait ExternalScanner {
    /// Attempts to recognize one of `valid` at the cursor. Consuming
    /// characters without returning a symbol is fine; the engine rewinds.
    fn scan(&mut self, cursor: &mut ScanCursor<'_, '_>, valid: &SymbolSet) -> Option<Symbol>;

    /// Snapshot of the scanner state. The engine never interprets the
    /// bytes; they exist so a scanner can round-trip itself.
    fn serialize(&self) -> Vec<u8> {
        Vec::new()
    }

    fn deserialize(&mut self, _state: &[u8]) {}
}

/// The character-level view handed to an external scanner.
///
/// `advance(true)` consumes a character as padding; contiguous skipped
/// characters at the front of the scan move the token start instead of
/// widening the token. `mark_end` pins the token end, letting the scanner
/// look further ahead without including that text.
pub struct ScanCursor<'r, 'a> {
    reader: &'r mut InputReader<'a>,
    start: Length,
    /// Position before the lookahead character.
    at: Length,
    /// Position after the lookahead character.
    next: Length,
    lookahead: Option<char>,
    /// End of the skipped prefix.
    padding_end: Length,
    marked: Option<Length>,
}

impl<'r, 'a> ScanCursor<'r, 'a> {
    pub(crate) fn new(reader: &'r mut InputReader<'a>, start: Length) -> ScanCursor<'r, 'a> {
        reader.seek(start);
        let lookahead = reader.next_char().map(|(ch, _)| ch);
        let next = match lookahead {
            Some(_) => reader.position(),
            None => start,
        };
        ScanCursor {
            reader,
            start,
            at: start,
            next,
            lookahead,
            padding_end: start,
            marked: None,
        }
    }

    /// The character at the cursor, or `None` at end of input.
    #[inline]
    pub fn lookahead(&self) -> Option<char> {
        self.lookahead
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.lookahead.is_none()
    }

    /// Consumes the lookahead character. With `skip` set, a character at
    /// the front of the scan becomes padding rather than token content.
    pub fn advance(&mut self, skip: bool) {
        if self.lookahead.is_none() {
            return;
        }
        let was_at = self.at;
        self.at = self.next;
        if skip && was_at == self.padding_end {
            self.padding_end = self.at;
        }
        self.lookahead = self.reader.next_char().map(|(ch, _)| ch);
        self.next = match self.lookahead {
            Some(_) => self.reader.position(),
            None => self.at,
        };
    }

    /// Pins the token end at the current position. Without a mark the
    /// token ends wherever the scan stopped.
    pub fn mark_end(&mut self) {
        self.marked = Some(self.at);
    }

    pub(crate) fn finish(self, symbol: Symbol) -> ScannedToken {
        let mut end = self.marked.unwrap_or(self.at);
        if end.bytes < self.padding_end.bytes {
            end = self.padding_end;
        }
        ScannedToken {
            kind: symbol,
            padding: self.padding_end - self.start,
            size: end - self.padding_end,
            lookahead_bytes: (self.at.bytes - end.bytes) as u32,
            external: true,
        }
    }
}
