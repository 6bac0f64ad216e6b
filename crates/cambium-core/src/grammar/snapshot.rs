//! Grammar snapshots: compile tables once, load them anywhere.
//!
//! Layout:
//! ```text
//! magic: [u8; 4]      b"CAMG"
//! version: u32        format version, little endian
//! checksum: u32       CRC32 of everything after the header
//! payload             postcard-encoded tables
//! ```
//!
//! The lexer DFA is not serialized. It is rebuilt from the terminal
//! definitions on load, which keeps snapshots compact and independent of
//! the DFA representation.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use serde::{Deserialize, Serialize};

use super::GrammarError;
use super::build::build_lex_table;
use super::tables::{Grammar, ParseState, Production, Symbol, SymbolInfo, TerminalDef};

/// Magic bytes identifying a grammar snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"CAMG";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const HEADER_SIZE: usize = 12;

/// Borrowing mirror of the serialized fields, for encoding without clones.
#[derive(Serialize)]
struct PayloadRef<'a> {
    name: &'a str,
    symbols: &'a [SymbolInfo],
    fields: &'a [String],
    productions: &'a [Production],
    states: &'a [ParseState],
    terminals: &'a [TerminalDef],
    extras: &'a [Symbol],
    skips: &'a [Symbol],
    externals: &'a [Symbol],
    supertypes: &'a [Symbol],
    word: Option<Symbol>,
    root: Symbol,
}

/// Owned mirror of [`PayloadRef`] with the same postcard wire shape.
#[derive(Deserialize)]
struct Payload {
    name: String,
    symbols: Vec<SymbolInfo>,
    fields: Vec<String>,
    productions: Vec<Production>,
    states: Vec<ParseState>,
    terminals: Vec<TerminalDef>,
    extras: Vec<Symbol>,
    skips: Vec<Symbol>,
    externals: Vec<Symbol>,
    supertypes: Vec<Symbol>,
    word: Option<Symbol>,
    root: Symbol,
}

impl Grammar {
    /// Serialize the compiled tables to a snapshot blob.
    pub fn to_snapshot(&self) -> Result<Vec<u8>, GrammarError> {
        let payload = PayloadRef {
            name: &self.name,
            symbols: &self.symbols,
            fields: &self.fields,
            productions: &self.productions,
            states: &self.states,
            terminals: &self.terminals,
            extras: &self.extras,
            skips: &self.skips,
            externals: &self.externals,
            supertypes: &self.supertypes,
            word: self.word,
            root: self.root,
        };
        let body = postcard::to_allocvec(&payload).map_err(GrammarError::Binary)?;
        let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
        out.extend_from_slice(&SNAPSHOT_MAGIC);
        out.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        out.extend_from_slice(&crc32fast::hash(&body).to_le_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Decode a grammar from snapshot bytes, rebuilding the lexer DFA.
    pub fn from_snapshot(bytes: &[u8]) -> Result<Grammar, GrammarError> {
        if bytes.len() < HEADER_SIZE {
            return Err(GrammarError::SnapshotHeader);
        }
        if bytes[0..4] != SNAPSHOT_MAGIC {
            return Err(GrammarError::SnapshotHeader);
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        if version != SNAPSHOT_VERSION {
            return Err(GrammarError::SnapshotVersion {
                found: version,
                expected: SNAPSHOT_VERSION,
            });
        }
        let stored = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let computed = crc32fast::hash(&bytes[HEADER_SIZE..]);
        if stored != computed {
            return Err(GrammarError::SnapshotChecksum);
        }
        let payload: Payload =
            postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(GrammarError::Binary)?;
        let lex = build_lex_table(&payload.terminals)?;
        let (named_lookup, anon_lookup) = Grammar::build_lookups(&payload.symbols);
        Ok(Grammar {
            name: payload.name,
            symbols: payload.symbols,
            fields: payload.fields,
            productions: payload.productions,
            states: payload.states,
            terminals: payload.terminals,
            extras: payload.extras,
            skips: payload.skips,
            externals: payload.externals,
            supertypes: payload.supertypes,
            word: payload.word,
            root: payload.root,
            lex,
            named_lookup,
            anon_lookup,
        })
    }

    /// Load a snapshot file without reading it into heap memory first.
    pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this function
        // returns; decoded tables own their data.
        let map = unsafe { Mmap::map(&file)? };
        Grammar::from_snapshot(&map)
    }

    /// Write a snapshot file.
    pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), GrammarError> {
        let bytes = self.to_snapshot()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}
