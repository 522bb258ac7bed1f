//! Component A: reading a text from its last byte to its first, without
//! holding the whole text in memory.
//!
//! `BackwardByteSource` is the trait the rest of the crate builds on;
//! `FileBackwardReader` buffers chunks of a file from the end, `
//! SliceBackwardReader` walks an in-memory buffer (used by `build_bwt` and by
//! the test suite, where the text is already resident).

use crate::{CwResult, Error};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// A text source that can only be read back-to-front, one byte at a time,
/// and rewound to the end to start a fresh backward pass.
pub trait BackwardByteSource {
    /// Next byte going backward, or `None` once the beginning has been
    /// reached.
    fn read(&mut self) -> Option<u8>;

    /// `true` once `read()` has returned `None` and no further bytes remain.
    fn is_begin(&self) -> bool;

    /// Seek back to just past the last byte, so the next `read()` returns
    /// the last byte of the text again.
    fn rewind(&mut self);

    /// Total length of the text, in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Backward reader over a byte slice already resident in memory.
pub struct SliceBackwardReader<'a> {
    data: &'a [u8],
    pos: usize, // one past the next byte to read; 0 means begin-of-text
}

impl<'a> SliceBackwardReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceBackwardReader {
            pos: data.len(),
            data,
        }
    }
}

impl<'a> BackwardByteSource for SliceBackwardReader<'a> {
    fn read(&mut self) -> Option<u8> {
        if self.pos == 0 {
            return None;
        }
        self.pos -= 1;
        Some(self.data[self.pos])
    }

    fn is_begin(&self) -> bool {
        self.pos == 0
    }

    fn rewind(&mut self) {
        self.pos = self.data.len();
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Backward reader over a file, buffering chunks from the end so the whole
/// file is never resident at once.
///
/// The chunk size is `ceil((log2 n)^2)`, clamped to at least 1 KiB and at
/// most the file length, matching the original reader's `n / log^2 n`
/// trade-off between the number of `seek` calls and peak RAM use.
pub struct FileBackwardReader {
    file: File,
    n: u64,
    chunk_size: u64,
    buffer: Vec<u8>,
    ptr_in_buffer: usize, // next index in `buffer` to hand out, reading backward
    next_chunk_end: u64,  // file offset one past the next chunk to load
    begin_of_file: bool,
    strip_trailing_newline: bool,
    stripped_once: bool,
}

impl FileBackwardReader {
    pub fn open(path: &Path, strip_trailing_newline: bool) -> CwResult<Self> {
        let file = File::open(path)?;
        let n = file.metadata()?.len();
        let chunk_size = Self::chunk_size_for(n);
        let mut reader = FileBackwardReader {
            file,
            n,
            chunk_size,
            buffer: Vec::new(),
            ptr_in_buffer: 0,
            next_chunk_end: n,
            begin_of_file: n == 0,
            strip_trailing_newline,
            stripped_once: false,
        };
        if n > 0 {
            reader.load_previous_chunk()?;
        }
        Ok(reader)
    }

    fn chunk_size_for(n: u64) -> u64 {
        if n <= 1 {
            return n.max(1);
        }
        let log2n = (n as f64).log2();
        let sq = (log2n * log2n).ceil() as u64;
        sq.max(1024).min(n)
    }

    fn load_previous_chunk(&mut self) -> CwResult<()> {
        let end = self.next_chunk_end;
        let size = self.chunk_size.min(end);
        let start = end - size;
        self.file.seek(SeekFrom::Start(start))?;
        self.buffer.resize(size as usize, 0);
        self.file.read_exact(&mut self.buffer)?;
        self.ptr_in_buffer = self.buffer.len();
        self.next_chunk_end = start;
        Ok(())
    }
}

impl BackwardByteSource for FileBackwardReader {
    fn read(&mut self) -> Option<u8> {
        if self.begin_of_file {
            return None;
        }
        if self.ptr_in_buffer == 0 {
            if self.next_chunk_end == 0 {
                self.begin_of_file = true;
                return None;
            }
            if self.load_previous_chunk().is_err() {
                self.begin_of_file = true;
                return None;
            }
        }
        self.ptr_in_buffer -= 1;
        let byte = self.buffer[self.ptr_in_buffer];
        if self.strip_trailing_newline && !self.stripped_once {
            self.stripped_once = true;
            if byte == b'\n' {
                return self.read();
            }
        }
        Some(byte)
    }

    fn is_begin(&self) -> bool {
        self.begin_of_file
    }

    fn rewind(&mut self) {
        self.next_chunk_end = self.n;
        self.buffer.clear();
        self.ptr_in_buffer = 0;
        self.begin_of_file = self.n == 0;
        self.stripped_once = false;
        if self.n > 0 {
            let _ = self.load_previous_chunk();
        }
    }

    fn len(&self) -> u64 {
        self.n
    }
}

pub(crate) fn reject_zero_byte(found: bool) -> CwResult<()> {
    if found {
        Err(Error::InvalidInput {
            reason: "input text contains a 0x00 byte, which is reserved for the terminator"
                .to_string(),
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_reads_backward() {
        let mut r = SliceBackwardReader::new(b"abc");
        assert_eq!(r.read(), Some(b'c'));
        assert_eq!(r.read(), Some(b'b'));
        assert_eq!(r.read(), Some(b'a'));
        assert_eq!(r.read(), None);
        assert!(r.is_begin());
    }

    #[test]
    fn slice_rewind_restarts() {
        let mut r = SliceBackwardReader::new(b"xy");
        r.read();
        r.read();
        assert!(r.is_begin());
        r.rewind();
        assert!(!r.is_begin());
        assert_eq!(r.read(), Some(b'y'));
    }

    #[test]
    fn file_reader_roundtrips_small_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"hello world").unwrap();
        let mut r = FileBackwardReader::open(tmp.path(), false).unwrap();
        let mut out = Vec::new();
        while let Some(b) = r.read() {
            out.push(b);
        }
        out.reverse();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn file_reader_spans_multiple_chunks() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let text: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8 + 1).collect();
        std::io::Write::write_all(&mut tmp, &text).unwrap();
        let mut r = FileBackwardReader::open(tmp.path(), false).unwrap();
        let mut out = Vec::new();
        while let Some(b) = r.read() {
            out.push(b);
        }
        out.reverse();
        assert_eq!(out, text);
    }

    #[test]
    fn strip_trailing_newline_drops_one_byte() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut tmp, b"abc\n").unwrap();
        let mut r = FileBackwardReader::open(tmp.path(), true).unwrap();
        let mut out = Vec::new();
        while let Some(b) = r.read() {
            out.push(b);
        }
        out.reverse();
        assert_eq!(out, b"abc");
    }
}
