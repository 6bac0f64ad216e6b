//! Tokenization over the grammar's compiled DFA.
//!
//! The lexer decodes code points through [`InputReader`], re-encodes each
//! one to UTF-8, and feeds the bytes to the dense multi-pattern DFA. Match
//! selection follows the longest eligible match, with literal tokens
//! beating patterns of the same length and declaration order breaking the
//! remaining ties. Anonymous whitespace-like terminals accumulate into the
//! next token's padding instead of becoming tokens of their own.

use cambium_core::Length;
use cambium_core::grammar::{Grammar, Symbol, SymbolSet};
use regex_automata::dfa::Automaton;
use regex_automata::util::primitives::StateID;

use crate::input::InputReader;

/// One lexed token in input coordinates. `padding` covers the skipped text
/// before the token, `size` the token itself.
#[derive(Clone, Debug)]
pub(crate) struct ScannedToken {
    pub kind: Symbol,
    pub padding: Length,
    pub size: Length,
    /// Bytes consulted past the token's end before the DFA gave up.
    pub lookahead_bytes: u32,
    /// Produced by an external scanner.
    pub external: bool,
}

struct Candidate {
    symbol: Symbol,
    end: Length,
    literal: bool,
    pattern: usize,
}

/// Scans one token at `start`. Terminals outside `valid` are ignored
/// unless they are extras or skips, which are admissible everywhere.
/// Returns an `END` token at end of input and an `ERROR` token spanning
/// one code point when nothing matches.
pub(crate) fn scan_token(
    grammar: &Grammar,
    reader: &mut InputReader<'_>,
    start: Length,
    valid: &SymbolSet,
) -> ScannedToken {
    let mut padding = Length::ZERO;
    let mut token_start = start;
    loop {
        let (best, scan_end, saw_input) = scan_once(grammar, reader, token_start, valid);
        match best {
            Some(c) if grammar.is_skip(c.symbol) => {
                padding += c.end - token_start;
                token_start = c.end;
            }
            Some(c) => {
                return ScannedToken {
                    kind: c.symbol,
                    padding,
                    size: c.end - token_start,
                    lookahead_bytes: (scan_end.bytes - c.end.bytes) as u32,
                    external: false,
                };
            }
            None if !saw_input => {
                return ScannedToken {
                    kind: Symbol::END,
                    padding,
                    size: Length::ZERO,
                    lookahead_bytes: 0,
                    external: false,
                };
            }
            None => {
                // Unrecognizable input: emit one code point as an error
                // token and let recovery deal with it.
                reader.seek(token_start);
                reader.next_char();
                let end = reader.position();
                return ScannedToken {
                    kind: Symbol::ERROR,
                    padding,
                    size: end - token_start,
                    lookahead_bytes: (scan_end.bytes - end.bytes) as u32,
                    external: false,
                };
            }
        }
    }
}

/// Runs the DFA once from `start`. Returns the best eligible match, the
/// position after the farthest consulted code point, and whether any input
/// remained at all.
fn scan_once(
    grammar: &Grammar,
    reader: &mut InputReader<'_>,
    start: Length,
    valid: &SymbolSet,
) -> (Option<Candidate>, Length, bool) {
    let lex = grammar.lex_table();
    let dfa = lex.dfa();
    let mut state = lex.start_state();
    let mut best: Option<Candidate> = None;
    // Position before the code point currently being fed. Matches are
    // delayed by one byte, so a match surfacing on a code point's first
    // byte ended at this boundary.
    let mut boundary = start;
    let mut saw_input = false;
    reader.seek(start);
    let scan_end = loop {
        let Some((ch, _width)) = reader.next_char() else {
            let eoi = dfa.next_eoi_state(state);
            if dfa.is_match_state(eoi) {
                record(grammar, lex, dfa, eoi, start, boundary, valid, &mut best);
            }
            break boundary;
        };
        saw_input = true;
        let mut buf = [0u8; 4];
        let bytes = ch.encode_utf8(&mut buf).as_bytes();
        let mut died = false;
        for (i, &byte) in bytes.iter().enumerate() {
            let next = dfa.next_state(state, byte);
            if dfa.is_special_state(next) {
                if dfa.is_match_state(next) && i == 0 {
                    record(grammar, lex, dfa, next, start, boundary, valid, &mut best);
                }
                if dfa.is_dead_state(next) || dfa.is_quit_state(next) {
                    died = true;
                    break;
                }
            }
            state = next;
        }
        if died {
            // The code point that killed the scan still counts as
            // consulted lookahead.
            break reader.position();
        }
        boundary = reader.position();
    };
    (best, scan_end, saw_input)
}

#[allow(clippy::too_many_arguments)]
fn record(
    grammar: &Grammar,
    lex: &cambium_core::grammar::LexTable,
    dfa: &regex_automata::dfa::dense::DFA<Vec<u32>>,
    state: StateID,
    start: Length,
    end: Length,
    valid: &SymbolSet,
    best: &mut Option<Candidate>,
) {
    // Zero-width matches cannot make progress; ignore them.
    if end.bytes == start.bytes {
        return;
    }
    for i in 0..dfa.match_len(state) {
        let pattern = dfa.match_pattern(state, i).as_usize();
        let symbol = lex.symbol_for_pattern(dfa.match_pattern(state, i));
        let eligible =
            valid.contains(symbol) || grammar.is_extra(symbol) || grammar.is_skip(symbol);
        if !eligible {
            continue;
        }
        let literal = grammar
            .terminal_defs()
            .get(pattern)
            .is_some_and(|def| def.is_literal());
        let candidate = Candidate {
            symbol,
            end,
            literal,
            pattern,
        };
        let better = match best {
            None => true,
            Some(b) => {
                candidate.end.bytes > b.end.bytes
                    || (candidate.end.bytes == b.end.bytes
                        && ((candidate.literal && !b.literal)
                            || (candidate.literal == b.literal && candidate.pattern < b.pattern)))
            }
        };
        if better {
            *best = Some(candidate);
        }
    }
}
