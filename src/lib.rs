//! # cw-bwt
//!
//! Builds the Burrows-Wheeler Transform of a text in compressed working
//! memory, using the context-wise incremental construction algorithm
//! (cw-bwt): a fixed-length left-context automaton routes each text position
//! to a per-context dynamic compressed string (a Huffman-shaped wavelet tree
//! over a dynamic packed B+-tree bitvector), and a single backward scan
//! maintains a moving terminator whose position is rewritten at every step.
//!
//! The suffix array is never materialised and the uncompressed text is never
//! held in memory at once; working space is proportional to the k-th order
//! empirical entropy of the input plus lower-order terms.
//!
//! ## Example
//!
//! ```
//! use cw_bwt::{build_bwt, Options};
//!
//! let text = b"banana";
//! let bwt: Vec<u8> = cw_bwt::to_bytes(build_bwt(text, &Options::default()).unwrap());
//! assert_eq!(bwt, b"annb\0aa");
//! ```

mod alphabet;
mod backward_reader;
mod builder;
mod bwt_iterator;
mod context_automaton;
mod tools;

pub use alphabet::Alphabet;
pub use backward_reader::{BackwardByteSource, FileBackwardReader, SliceBackwardReader};
pub use builder::{BuildStats, CwBwtBuilder};
pub use bwt_iterator::BwtIterator;
pub use context_automaton::ContextAutomaton;
pub use tools::cumulative_counters::CumulativeCounters;
pub use tools::dynamic_string::DynamicString;
pub use tools::huffman::HuffmanTree;
pub use tools::packed_bitvector::PackedBitVector;

use std::path::Path;

/// Errors produced by the core. Every fallible operation in this crate
/// returns one of these kinds; none of them are recovered internally.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("invalid parameter: {reason}")]
    InvalidParameter { reason: String },

    #[error("capacity exceeded in {context}")]
    CapacityExceeded { context: String },

    #[error("internal error: {reason}")]
    Internal { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CwResult<T> = Result<T, Error>;

/// How the context length `k` is chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextLength {
    /// Pick the largest `k` such that `sigma^k <= n / ln(n)^3`.
    Auto,
    /// Use exactly this context length.
    Explicit(u32),
}

impl Default for ContextLength {
    fn default() -> Self {
        ContextLength::Auto
    }
}

/// Node/leaf allocation policy for the dynamic packed bitvector substrate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationPolicy {
    /// Reserve the worst-case number of nodes/leaves up front.
    Eager,
    /// Grow containers as nodes/leaves are allocated.
    OnDemand,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        AllocationPolicy::OnDemand
    }
}

/// Options controlling a single `build_bwt` call.
#[derive(Clone, Debug)]
pub struct Options {
    pub k: ContextLength,
    pub allocation: AllocationPolicy,
    pub verbose: bool,
    /// Whether the first `read()` after `rewind()` on a file-backed source
    /// discards a trailing byte ("skip newline at EOF" behaviour some
    /// text-file tools assume). Default `false`: no byte is dropped.
    pub strip_trailing_newline: bool,
}

impl Default for Options {
    fn default() -> Self {
        STD_OPTIONS
    }
}

pub const STD_OPTIONS: Options = Options {
    k: ContextLength::Auto,
    allocation: AllocationPolicy::OnDemand,
    verbose: false,
    strip_trailing_newline: false,
};

/// Build the BWT of `text` (a byte slice already resident in memory) and
/// return a streaming iterator over `BWT(text . '\0')`.
///
/// `text` must not contain a `0x00` byte; this returns `Error::InvalidInput`
/// otherwise. See `build_bwt_from_file` to stream a text file backward
/// without holding it in memory.
pub fn build_bwt(text: &[u8], options: &Options) -> CwResult<BwtIterator> {
    let reader = SliceBackwardReader::new(text);
    let builder = CwBwtBuilder::build(reader, options)?;
    Ok(builder.into_iterator())
}

/// Build the BWT of the file at `path`, streaming it backward in buffered
/// chunks rather than loading it whole.
pub fn build_bwt_from_file(path: &Path, options: &Options) -> CwResult<BwtIterator> {
    let reader = FileBackwardReader::open(path, options.strip_trailing_newline)?;
    let builder = CwBwtBuilder::build(reader, options)?;
    Ok(builder.into_iterator())
}

/// Write the bytes yielded by `iter` to `path`, truncating the file if
/// writing fails partway through (no partial output is left behind).
pub fn to_file(iter: BwtIterator, path: &Path) -> CwResult<u64> {
    use std::io::Write;
    let mut count: u64 = 0;
    let mut file = std::fs::File::create(path)?;
    let mut buf = Vec::with_capacity(1 << 16);
    for byte in iter {
        buf.push(byte);
        count += 1;
        if buf.len() == buf.capacity() {
            if let Err(e) = file.write_all(&buf) {
                drop(file);
                let _ = std::fs::File::create(path);
                return Err(e.into());
            }
            buf.clear();
        }
    }
    if !buf.is_empty() {
        if let Err(e) = file.write_all(&buf) {
            drop(file);
            let _ = std::fs::File::create(path);
            return Err(e.into());
        }
    }
    Ok(count)
}

/// Collect the bytes yielded by `iter` into a `Vec<u8>`.
pub fn to_bytes(iter: BwtIterator) -> Vec<u8> {
    iter.collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banana() {
        let bwt = to_bytes(build_bwt(b"banana", &Options::default()).unwrap());
        assert_eq!(bwt, b"annb\0aa");
    }

    #[test]
    fn mississippi() {
        let mut opt = Options::default();
        opt.k = ContextLength::Explicit(2);
        let bwt = to_bytes(build_bwt(b"mississippi", &opt).unwrap());
        assert_eq!(bwt, b"ipssm\0pissii");
    }

    #[test]
    fn aaaa() {
        let mut opt = Options::default();
        opt.k = ContextLength::Explicit(1);
        let bwt = to_bytes(build_bwt(b"aaaa", &opt).unwrap());
        assert_eq!(bwt, b"aaaa\0");
    }

    #[test]
    fn abracadabra() {
        let mut opt = Options::default();
        opt.k = ContextLength::Explicit(3);
        let bwt = to_bytes(build_bwt(b"abracadabra", &opt).unwrap());
        assert_eq!(bwt, b"ard\0rcaaaabb");
    }

    #[test]
    fn zero_byte_rejected() {
        let err = build_bwt(b"ba\0nana", &Options::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn k_too_large_rejected() {
        let mut opt = Options::default();
        opt.k = ContextLength::Explicit(3);
        let err = build_bwt(b"ab", &opt).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn empty_input_rejected() {
        let err = build_bwt(b"", &Options::default()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }
}
