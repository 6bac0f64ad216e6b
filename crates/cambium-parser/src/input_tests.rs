use cambium_core::{Length, Point};

use crate::input::{ChunkedInput, InputEncoding, InputReader, TextInput};

fn read_all(input: &mut dyn TextInput, encoding: InputEncoding) -> (Vec<(char, usize)>, Length) {
    let mut reader = InputReader::new(input, encoding);
    let mut decoded = Vec::new();
    while let Some(pair) = reader.next_char() {
        decoded.push(pair);
    }
    (decoded, reader.position())
}

#[test]
fn decodes_ascii() {
    let mut input = "ab";
    let (decoded, end) = read_all(&mut input, InputEncoding::Utf8);
    assert_eq!(decoded, vec![('a', 1), ('b', 1)]);
    assert_eq!(end, Length::new(2, Point::new(0, 2)));
}

#[test]
fn decodes_multibyte_utf8() {
    let mut input = "aé€🎉";
    let (decoded, end) = read_all(&mut input, InputEncoding::Utf8);
    assert_eq!(decoded, vec![('a', 1), ('é', 2), ('€', 3), ('🎉', 4)]);
    assert_eq!(end.bytes, 10);
    assert_eq!(end.extent, Point::new(0, 10));
}

#[test]
fn newlines_advance_rows() {
    let mut input = "ab\ncd";
    let mut reader = InputReader::new(&mut input, InputEncoding::Utf8);
    reader.next_char();
    reader.next_char();
    assert_eq!(reader.position().extent, Point::new(0, 2));
    reader.next_char();
    assert_eq!(reader.position().extent, Point::new(1, 0));
    reader.next_char();
    assert_eq!(reader.position().extent, Point::new(1, 1));
    assert_eq!(reader.position().bytes, 4);
}

#[test]
fn malformed_utf8_decodes_as_replacement() {
    let bytes: &[u8] = &[b'a', 0xFF, b'b'];
    let mut input = bytes;
    let (decoded, _) = read_all(&mut input, InputEncoding::Utf8);
    assert_eq!(decoded, vec![('a', 1), ('\u{FFFD}', 1), ('b', 1)]);
}

#[test]
fn truncated_utf8_sequence_decodes_byte_by_byte() {
    // A three-byte lead with only one continuation, then end of input.
    let bytes: &[u8] = &[0xE2, 0x82];
    let mut input = bytes;
    let (decoded, _) = read_all(&mut input, InputEncoding::Utf8);
    assert_eq!(decoded, vec![('\u{FFFD}', 1), ('\u{FFFD}', 1)]);
}

#[test]
fn overlong_utf8_form_is_rejected() {
    // 0xC0 0xAF is an overlong encoding of '/'.
    let bytes: &[u8] = &[0xC0, 0xAF];
    let mut input = bytes;
    let (decoded, _) = read_all(&mut input, InputEncoding::Utf8);
    assert_eq!(decoded, vec![('\u{FFFD}', 1), ('\u{FFFD}', 1)]);
}

#[test]
fn seek_rewinds_to_an_observed_boundary() {
    let mut input = "xyz";
    let mut reader = InputReader::new(&mut input, InputEncoding::Utf8);
    assert_eq!(reader.next_char(), Some(('x', 1)));
    let after_x = reader.position();
    assert_eq!(reader.next_char(), Some(('y', 1)));
    reader.seek(after_x);
    assert_eq!(reader.next_char(), Some(('y', 1)));
    assert_eq!(reader.next_char(), Some(('z', 1)));
    assert_eq!(reader.next_char(), None);
}

#[test]
fn chunked_input_matches_flat_slice() {
    let text = "let x = 1;\nlet y = 🎉22;";
    let mut flat = text;
    let (from_flat, end_flat) = read_all(&mut flat, InputEncoding::Utf8);

    // Three-byte chunks split every multibyte character.
    let mut chunked = ChunkedInput::new(|offset, _point: Point| {
        let bytes = text.as_bytes();
        let end = (offset + 3).min(bytes.len());
        bytes.get(offset..end).unwrap_or(&[]).to_vec()
    });
    let (from_chunks, end_chunks) = read_all(&mut chunked, InputEncoding::Utf8);

    assert_eq!(from_flat, from_chunks);
    assert_eq!(end_flat, end_chunks);
}

#[test]
fn utf16_decodes_basic_plane() {
    let bytes: &[u8] = &[0x68, 0x00, 0x69, 0x00];
    let mut input = bytes;
    let (decoded, end) = read_all(&mut input, InputEncoding::Utf16);
    assert_eq!(decoded, vec![('h', 2), ('i', 2)]);
    assert_eq!(end.bytes, 4);
    assert_eq!(end.extent, Point::new(0, 4));
}

#[test]
fn utf16_decodes_surrogate_pairs() {
    // U+1F389 as a little-endian surrogate pair.
    let bytes: &[u8] = &[0x3C, 0xD8, 0x89, 0xDF];
    let mut input = bytes;
    let (decoded, _) = read_all(&mut input, InputEncoding::Utf16);
    assert_eq!(decoded, vec![('🎉', 4)]);
}

#[test]
fn utf16_unpaired_lead_surrogate_decodes_as_replacement() {
    let bytes: &[u8] = &[0x3C, 0xD8, 0x41, 0x00];
    let mut input = bytes;
    let (decoded, _) = read_all(&mut input, InputEncoding::Utf16);
    assert_eq!(decoded, vec![('\u{FFFD}', 2), ('A', 2)]);
}

#[test]
fn utf16_odd_trailing_byte_decodes_as_replacement() {
    let bytes: &[u8] = &[0x41, 0x00, 0x7F];
    let mut input = bytes;
    let (decoded, _) = read_all(&mut input, InputEncoding::Utf16);
    assert_eq!(decoded, vec![('A', 2), ('\u{FFFD}', 1)]);
}

#[test]
fn utf16_newline_tracking_counts_code_unit_bytes() {
    // "a\nb" in UTF-16LE.
    let bytes: &[u8] = &[0x61, 0x00, 0x0A, 0x00, 0x62, 0x00];
    let mut input = bytes;
    let (_, end) = read_all(&mut input, InputEncoding::Utf16);
    assert_eq!(end.bytes, 6);
    assert_eq!(end.extent, Point::new(1, 2));
}
