//! Section 4.9: canonical Huffman shapes for the per-context wavelet trees.
//!
//! Standard merge-the-two-smallest construction over a min-heap, with ties
//! broken by insertion order so the same frequency vector always produces
//! the same tree (needed since the shape is fixed once in pass 1 and then
//! relied on unchanged through all of pass 2). Codewords are stored in one
//! packed bit buffer with an `(offset, length)` pair per symbol rather than
//! a `Vec<bool>` per symbol, following the canonical-coding representation
//! used for succinct Huffman tables.

use crate::{CwResult, Error};
use bit_vec::BitVec;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Clone, Debug)]
enum NodeKind {
    Leaf(u32),
    Internal(Box<HeapNode>, Box<HeapNode>),
}

#[derive(Clone, Debug)]
struct HeapNode {
    freq: u64,
    seq: u64,
    kind: NodeKind,
}

impl PartialEq for HeapNode {
    fn eq(&self, other: &Self) -> bool {
        self.freq == other.freq && self.seq == other.seq
    }
}
impl Eq for HeapNode {}
impl PartialOrd for HeapNode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapNode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.freq, self.seq).cmp(&(other.freq, other.seq))
    }
}

/// A canonical Huffman code over the symbols `0..sigma_0`, some of which may
/// have zero frequency (and therefore no codeword: they cannot occur).
#[derive(Clone, Debug)]
pub struct HuffmanTree {
    sigma_0: usize,
    frequencies: Vec<u64>,
    /// `(offset, length)` into `bits` for each symbol; `length == 0` means
    /// the symbol never occurs.
    table: Vec<(u32, u8)>,
    bits: BitVec,
}

impl HuffmanTree {
    /// Build the tree from absolute per-symbol frequencies (index = symbol
    /// code). At least one frequency must be nonzero.
    pub fn build(frequencies: &[u64]) -> CwResult<HuffmanTree> {
        let sigma_0 = frequencies.len();
        let total: u64 = frequencies.iter().sum();
        if total == 0 {
            return Err(Error::InvalidInput {
                reason: "cannot build a Huffman tree over zero occurrences".to_string(),
            });
        }

        let mut heap = BinaryHeap::new();
        let mut seq = 0u64;
        for (symbol, &freq) in frequencies.iter().enumerate() {
            if freq > 0 {
                heap.push(Reverse(HeapNode {
                    freq,
                    seq,
                    kind: NodeKind::Leaf(symbol as u32),
                }));
                seq += 1;
            }
        }

        if heap.len() == 1 {
            // A single distinct symbol still needs a (length-1) codeword.
            let Reverse(only) = heap.pop().unwrap();
            let symbol = match only.kind {
                NodeKind::Leaf(s) => s,
                NodeKind::Internal(..) => unreachable!(),
            };
            let mut table = vec![(0u32, 0u8); sigma_0];
            let mut bits = BitVec::new();
            bits.push(false);
            table[symbol as usize] = (0, 1);
            return Ok(HuffmanTree {
                sigma_0,
                frequencies: frequencies.to_vec(),
                table,
                bits,
            });
        }

        while heap.len() > 1 {
            let Reverse(a) = heap.pop().unwrap();
            let Reverse(b) = heap.pop().unwrap();
            let merged = HeapNode {
                freq: a.freq + b.freq,
                seq,
                kind: NodeKind::Internal(Box::new(a), Box::new(b)),
            };
            seq += 1;
            heap.push(Reverse(merged));
        }

        let Reverse(root) = heap.pop().unwrap();
        let mut table = vec![(0u32, 0u8); sigma_0];
        let mut bits = BitVec::new();
        let mut path = Vec::new();
        assign_codes(&root, &mut path, &mut bits, &mut table);

        Ok(HuffmanTree {
            sigma_0,
            frequencies: frequencies.to_vec(),
            table,
            bits,
        })
    }

    pub fn sigma_0(&self) -> usize {
        self.sigma_0
    }

    /// Codeword for `symbol`, most significant bit first; `None` if the
    /// symbol never occurred in the frequencies the tree was built from.
    pub fn code_of(&self, symbol: u32) -> Option<Vec<bool>> {
        let (offset, len) = self.table[symbol as usize];
        if len == 0 {
            return None;
        }
        Some((0..len as u32).map(|i| self.bits[(offset + i) as usize]).collect())
    }

    pub fn code_len(&self, symbol: u32) -> u32 {
        self.table[symbol as usize].1 as u32
    }

    /// Empirical (order-0) entropy of the frequency vector, in bits/symbol.
    pub fn empirical_entropy(&self) -> f64 {
        let total: f64 = self.frequencies.iter().sum::<u64>() as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.frequencies
            .iter()
            .filter(|&&f| f > 0)
            .map(|&f| {
                let p = f as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    /// Actual average codeword length achieved by this tree, in bits/symbol
    /// (>= `empirical_entropy`, equal to it only for power-of-two-skewed
    /// frequency distributions).
    pub fn actual_entropy(&self) -> f64 {
        let total: f64 = self.frequencies.iter().sum::<u64>() as f64;
        if total == 0.0 {
            return 0.0;
        }
        self.frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(s, &f)| (f as f64 / total) * self.code_len(s as u32) as f64)
            .sum()
    }
}

/// `path` is a scratch stack of the bits on the root-to-here branch; `bits`
/// is the permanent, append-only codeword buffer each leaf's code is copied
/// into once its full path is known.
fn assign_codes(node: &HeapNode, path: &mut Vec<bool>, bits: &mut BitVec, table: &mut [(u32, u8)]) {
    match &node.kind {
        NodeKind::Leaf(symbol) => {
            let offset = bits.len() as u32;
            for &bit in path.iter() {
                bits.push(bit);
            }
            table[*symbol as usize] = (offset, path.len() as u8);
        }
        NodeKind::Internal(left, right) => {
            path.push(false);
            assign_codes(left, path, bits, table);
            path.pop();
            path.push(true);
            assign_codes(right, path, bits, table);
            path.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_symbol_gets_one_bit_code() {
        let tree = HuffmanTree::build(&[0, 5, 0]).unwrap();
        assert_eq!(tree.code_len(1), 1);
        assert_eq!(tree.code_len(0), 0);
    }

    #[test]
    fn more_frequent_symbol_gets_shorter_or_equal_code() {
        let tree = HuffmanTree::build(&[10, 1, 1, 1]).unwrap();
        assert!(tree.code_len(0) <= tree.code_len(1));
        assert!(tree.code_len(0) <= tree.code_len(2));
    }

    #[test]
    fn codes_are_prefix_free() {
        let tree = HuffmanTree::build(&[5, 3, 2, 7, 1]).unwrap();
        let codes: Vec<Vec<bool>> = (0..5)
            .filter_map(|s| tree.code_of(s))
            .collect();
        for i in 0..codes.len() {
            for j in 0..codes.len() {
                if i == j {
                    continue;
                }
                let a = &codes[i];
                let b = &codes[j];
                if a.len() <= b.len() {
                    assert_ne!(a, &b[..a.len()], "code {i:?} is a prefix of code {j:?}");
                }
            }
        }
    }

    #[test]
    fn empty_frequencies_rejected() {
        let err = HuffmanTree::build(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
    }

    #[test]
    fn actual_entropy_is_at_least_empirical() {
        let tree = HuffmanTree::build(&[10, 7, 3, 1, 1]).unwrap();
        assert!(tree.actual_entropy() + 1e-9 >= tree.empirical_entropy());
    }
}
