//! Source text access.
//!
//! The parser reads the document through [`TextInput`], which hands out raw
//! byte chunks starting at arbitrary offsets. [`InputReader`] sits on top
//! and decodes one code point at a time, so neither chunk boundaries nor
//! the document encoding leak into the lexer: a chunked callback and a flat
//! slice produce byte-identical trees.

use cambium_core::{Length, Point};

/// Byte encoding of the source document.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InputEncoding {
    #[default]
    Utf8,
    /// Little-endian code units.
    Utf16,
}

/// A source document readable in chunks.
///
/// `read` returns the bytes starting at `byte_offset`; an empty slice means
/// end of input. `point` is the row/column of that offset, for inputs that
/// store their text line-wise.
pub trait TextInput {
    fn read(&mut self, byte_offset: usize, point: Point) -> &[u8];
}

impl TextInput for &[u8] {
    fn read(&mut self, byte_offset: usize, _point: Point) -> &[u8] {
        self.get(byte_offset..).unwrap_or(&[])
    }
}

impl TextInput for &str {
    fn read(&mut self, byte_offset: usize, _point: Point) -> &[u8] {
        self.as_bytes().get(byte_offset..).unwrap_or(&[])
    }
}

/// Adapts a chunk-producing closure to [`TextInput`] by keeping the chunk
/// it most recently returned alive.
pub struct ChunkedInput<F, B> {
    read: F,
    last: Option<B>,
}

impl<F, B> ChunkedInput<F, B>
where
    F: FnMut(usize, Point) -> B,
    B: AsRef<[u8]>,
{
    pub fn new(read: F) -> ChunkedInput<F, B> {
        ChunkedInput { read, last: None }
    }
}

impl<F, B> TextInput for ChunkedInput<F, B>
where
    F: FnMut(usize, Point) -> B,
    B: AsRef<[u8]>,
{
    fn read(&mut self, byte_offset: usize, point: Point) -> &[u8] {
        self.last = Some((self.read)(byte_offset, point));
        match &self.last {
            Some(chunk) => chunk.as_ref(),
            None => &[],
        }
    }
}

/// Decoding layer over a [`TextInput`].
///
/// Buffers the chunk it is currently positioned in and refills on demand.
/// Malformed or truncated sequences decode as U+FFFD spanning one code
/// unit, and decoding resumes at the next unit; the reader never fails.
pub struct InputReader<'a> {
    input: &'a mut dyn TextInput,
    encoding: InputEncoding,
    /// Copy of the chunk covering `chunk_start..chunk_start + chunk.len()`.
    chunk: Vec<u8>,
    chunk_start: usize,
    position: Length,
}

impl<'a> InputReader<'a> {
    pub fn new(input: &'a mut dyn TextInput, encoding: InputEncoding) -> InputReader<'a> {
        InputReader {
            input,
            encoding,
            chunk: Vec::new(),
            chunk_start: 0,
            position: Length::ZERO,
        }
    }

    /// The position of the next code point.
    #[inline]
    pub fn position(&self) -> Length {
        self.position
    }

    /// Repositions the decode point. `position` must sit on a code point
    /// boundary the caller has previously observed.
    pub fn seek(&mut self, position: Length) {
        self.position = position;
    }

    /// Decodes the code point at the current position and advances past
    /// it. Returns the character and its width in input bytes, or `None`
    /// at end of input.
    pub fn next_char(&mut self) -> Option<(char, usize)> {
        let (ch, width) = match self.encoding {
            InputEncoding::Utf8 => self.decode_utf8()?,
            InputEncoding::Utf16 => self.decode_utf16()?,
        };
        self.position.bytes += width;
        if ch == '\n' {
            self.position.extent.row += 1;
            self.position.extent.column = 0;
        } else {
            self.position.extent.column += width;
        }
        Some((ch, width))
    }

    fn byte_at(&mut self, offset: usize) -> Option<u8> {
        if offset < self.chunk_start || offset >= self.chunk_start + self.chunk.len() {
            let point = self.position.extent;
            let chunk = self.input.read(offset, point);
            self.chunk_start = offset;
            self.chunk.clear();
            self.chunk.extend_from_slice(chunk);
        }
        self.chunk.get(offset - self.chunk_start).copied()
    }

    fn decode_utf8(&mut self) -> Option<(char, usize)> {
        let start = self.position.bytes;
        let first = self.byte_at(start)?;
        let width = match first {
            0x00..=0x7F => return Some((first as char, 1)),
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return Some((char::REPLACEMENT_CHARACTER, 1)),
        };
        let mut buf = [first, 0, 0, 0];
        for (i, slot) in buf.iter_mut().enumerate().take(width).skip(1) {
            match self.byte_at(start + i) {
                Some(b) if b & 0xC0 == 0x80 => *slot = b,
                _ => return Some((char::REPLACEMENT_CHARACTER, 1)),
            }
        }
        // from_utf8 rejects overlong forms and surrogates for us.
        match std::str::from_utf8(&buf[..width]) {
            Ok(s) => s.chars().next().map(|ch| (ch, width)),
            Err(_) => Some((char::REPLACEMENT_CHARACTER, 1)),
        }
    }

    fn decode_utf16(&mut self) -> Option<(char, usize)> {
        let start = self.position.bytes;
        let b0 = self.byte_at(start)?;
        let Some(b1) = self.byte_at(start + 1) else {
            // Odd trailing byte.
            return Some((char::REPLACEMENT_CHARACTER, 1));
        };
        let unit = u16::from_le_bytes([b0, b1]);
        match unit {
            0xD800..=0xDBFF => {
                if let (Some(b2), Some(b3)) = (self.byte_at(start + 2), self.byte_at(start + 3)) {
                    let trail = u16::from_le_bytes([b2, b3]);
                    if (0xDC00..=0xDFFF).contains(&trail) {
                        let scalar =
                            0x10000 + ((unit as u32 - 0xD800) << 10) + (trail as u32 - 0xDC00);
                        if let Some(ch) = char::from_u32(scalar) {
                            return Some((ch, 4));
                        }
                    }
                }
                // Unpaired lead surrogate.
                Some((char::REPLACEMENT_CHARACTER, 2))
            }
            0xDC00..=0xDFFF => Some((char::REPLACEMENT_CHARACTER, 2)),
            _ => match char::from_u32(unit as u32) {
                Some(ch) => Some((ch, 2)),
                None => Some((char::REPLACEMENT_CHARACTER, 2)),
            },
        }
    }
}
