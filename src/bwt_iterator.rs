//! Component G: streaming the finished transform out of the per-context
//! dynamic strings.
//!
//! The BWT column is the concatenation of every context's dynamic string,
//! contexts visited in ascending state order (state order is window order,
//! which is lexicographic left-context order). The terminator was inserted
//! as a physical entry, coded `0`, into whichever bucket is its own
//! left-context during the build — so walking every bucket's entries in
//! order and mapping a decoded `0` back to the literal `0x00` byte is enough;
//! no separate splicing step is needed.

use crate::alphabet::Alphabet;
use crate::tools::dynamic_string::DynamicString;

/// Iterator over `BWT(text . '\0')`, one byte at a time, without ever
/// materializing the whole column.
pub struct BwtIterator {
    alphabet: Alphabet,
    strings: Vec<DynamicString>,
    current_state: u32,
    pos_in_state: usize,
}

impl BwtIterator {
    pub(crate) fn new(alphabet: Alphabet, strings: Vec<DynamicString>) -> Self {
        BwtIterator {
            alphabet,
            strings,
            current_state: 0,
            pos_in_state: 0,
        }
    }

    /// Total length of the column this iterator will produce, including the
    /// terminator byte.
    pub fn len(&self) -> u64 {
        self.strings.iter().map(|ds| ds.size() as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.iter().all(|ds| ds.size() == 0)
    }
}

impl Iterator for BwtIterator {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            if self.current_state as usize >= self.strings.len() {
                return None;
            }
            let ds = &self.strings[self.current_state as usize];
            if self.pos_in_state < ds.size() {
                let code = ds.access(self.pos_in_state);
                self.pos_in_state += 1;
                return Some(if code == 0 {
                    0u8
                } else {
                    self.alphabet.decode(code as u16)
                });
            }
            self.current_state += 1;
            self.pos_in_state = 0;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len() as usize;
        (remaining, Some(remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backward_reader::SliceBackwardReader;
    use crate::builder::CwBwtBuilder;
    use crate::{ContextLength, Options};

    fn run(text: &[u8], k: u32) -> Vec<u8> {
        let reader = SliceBackwardReader::new(text);
        let mut opt = Options::default();
        opt.k = ContextLength::Explicit(k);
        let builder = CwBwtBuilder::build(reader, &opt).unwrap();
        builder.into_iterator().collect()
    }

    #[test]
    fn contains_exactly_one_terminator() {
        let bwt = run(b"abracadabra", 3);
        assert_eq!(bwt.iter().filter(|&&b| b == 0).count(), 1);
        assert_eq!(bwt.len(), 12);
    }

    #[test]
    fn length_matches_text_plus_terminator() {
        let bwt = run(b"mississippi", 2);
        assert_eq!(bwt.len(), 12);
    }
}
