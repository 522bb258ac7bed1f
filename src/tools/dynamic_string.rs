//! Section 4.5: the per-context dynamic compressed string.
//!
//! Three shapes, chosen once the context's pass-1 symbol frequencies are
//! known and kept fixed through all of pass 2:
//!
//! - `Empty`: the context never occurs as a left-context in the text.
//! - `Unary`: exactly one distinct symbol ever follows this context, so no
//!   tree is needed at all — `access` is constant, `insert` just bumps a
//!   counter.
//! - `Wavelet`: the general case, a Huffman-shaped wavelet tree built over
//!   `PackedBitVector` nodes. Each internal node corresponds to one
//!   internal node of the canonical Huffman tree; `insert`/`access`/`rank`
//!   walk root-to-leaf, translating a position at one level into a position
//!   at the next via `rank0`/`rank1`, the standard dynamic wavelet-tree
//!   technique.

use crate::tools::huffman::HuffmanTree;
use crate::tools::packed_bitvector::PackedBitVector;
use crate::{AllocationPolicy, CwResult, Error};

#[derive(Clone, Copy, Debug)]
enum Child {
    None,
    Leaf(u32),
    Node(usize),
}

#[derive(Clone, Debug)]
struct WaveletNode {
    bits: PackedBitVector,
    left: Child,
    right: Child,
}

impl WaveletNode {
    fn empty(policy: AllocationPolicy) -> Self {
        WaveletNode {
            bits: PackedBitVector::new(policy),
            left: Child::None,
            right: Child::None,
        }
    }
}

#[derive(Clone, Debug)]
struct WaveletTree {
    huffman: HuffmanTree,
    nodes: Vec<WaveletNode>,
}

impl WaveletTree {
    fn new(huffman: HuffmanTree, policy: AllocationPolicy) -> Self {
        let mut nodes = vec![WaveletNode::empty(policy)];
        for symbol in 0..huffman.sigma_0() as u32 {
            let Some(code) = huffman.code_of(symbol) else {
                continue;
            };
            let mut node_id = 0usize;
            for (depth, &bit) in code.iter().enumerate() {
                let is_last = depth + 1 == code.len();
                let existing = if bit {
                    nodes[node_id].right
                } else {
                    nodes[node_id].left
                };
                match existing {
                    Child::Node(id) => node_id = id,
                    Child::Leaf(_) => break,
                    Child::None => {
                        if is_last {
                            if bit {
                                nodes[node_id].right = Child::Leaf(symbol);
                            } else {
                                nodes[node_id].left = Child::Leaf(symbol);
                            }
                        } else {
                            nodes.push(WaveletNode::empty(policy));
                            let new_id = nodes.len() - 1;
                            if bit {
                                nodes[node_id].right = Child::Node(new_id);
                            } else {
                                nodes[node_id].left = Child::Node(new_id);
                            }
                            node_id = new_id;
                        }
                    }
                }
            }
        }
        WaveletTree { huffman, nodes }
    }

    fn size(&self) -> usize {
        self.nodes[0].bits.len()
    }

    fn insert(&mut self, symbol: u32, pos: usize) -> CwResult<()> {
        let code = self.huffman.code_of(symbol).ok_or_else(|| Error::Internal {
            reason: format!("symbol {symbol} has no Huffman code in this context"),
        })?;
        let mut node_id = 0usize;
        let mut p = pos;
        for &bit in code.iter() {
            let node = &mut self.nodes[node_id];
            node.bits.insert(p, bit);
            let new_p = if bit {
                node.bits.rank1(p)
            } else {
                node.bits.rank0(p)
            };
            let next = if bit { node.right } else { node.left };
            p = new_p;
            match next {
                Child::Node(id) => node_id = id,
                Child::Leaf(_) | Child::None => {}
            }
        }
        Ok(())
    }

    fn access(&self, pos: usize) -> u32 {
        let mut node_id = 0usize;
        let mut p = pos;
        loop {
            let node = &self.nodes[node_id];
            let bit = node.bits.access(p);
            let new_p = if bit {
                node.bits.rank1(p)
            } else {
                node.bits.rank0(p)
            };
            let next = if bit { node.right } else { node.left };
            p = new_p;
            match next {
                Child::Leaf(symbol) => return symbol,
                Child::Node(id) => node_id = id,
                Child::None => unreachable!("wavelet tree path ends without a leaf"),
            }
        }
    }

    fn rank(&self, symbol: u32, pos: usize) -> CwResult<usize> {
        let code = self.huffman.code_of(symbol).ok_or_else(|| Error::Internal {
            reason: format!("symbol {symbol} has no Huffman code in this context"),
        })?;
        let mut node_id = 0usize;
        let mut p = pos;
        for &bit in code.iter() {
            let node = &self.nodes[node_id];
            p = if bit { node.bits.rank1(p) } else { node.bits.rank0(p) };
            let next = if bit { node.right } else { node.left };
            match next {
                Child::Node(id) => node_id = id,
                Child::Leaf(_) | Child::None => {}
            }
        }
        Ok(p)
    }
}

#[derive(Clone, Debug)]
pub enum DynamicString {
    Empty,
    Unary { symbol: u32, count: usize },
    Wavelet(WaveletTree),
}

impl DynamicString {
    /// Build the fixed shape for a context from its pass-1 frequency
    /// vector (index = symbol code within this context's local alphabet).
    pub fn build(frequencies: &[u64], policy: AllocationPolicy) -> CwResult<DynamicString> {
        let distinct: Vec<u32> = frequencies
            .iter()
            .enumerate()
            .filter(|&(_, &f)| f > 0)
            .map(|(s, _)| s as u32)
            .collect();

        match distinct.len() {
            0 => Ok(DynamicString::Empty),
            1 => Ok(DynamicString::Unary {
                symbol: distinct[0],
                count: 0,
            }),
            _ => {
                let huffman = HuffmanTree::build(frequencies)?;
                Ok(DynamicString::Wavelet(WaveletTree::new(huffman, policy)))
            }
        }
    }

    pub fn size(&self) -> usize {
        match self {
            DynamicString::Empty => 0,
            DynamicString::Unary { count, .. } => *count,
            DynamicString::Wavelet(w) => w.size(),
        }
    }

    pub fn insert(&mut self, symbol: u32, pos: usize) -> CwResult<()> {
        match self {
            DynamicString::Empty => Err(Error::Internal {
                reason: "insert into an empty-shaped context".to_string(),
            }),
            DynamicString::Unary { symbol: s, count } => {
                if symbol != *s {
                    return Err(Error::Internal {
                        reason: "symbol does not match this context's only observed symbol"
                            .to_string(),
                    });
                }
                let _ = pos;
                *count += 1;
                Ok(())
            }
            DynamicString::Wavelet(w) => w.insert(symbol, pos),
        }
    }

    pub fn access(&self, pos: usize) -> u32 {
        match self {
            DynamicString::Empty => panic!("access into an empty-shaped context"),
            DynamicString::Unary { symbol, .. } => *symbol,
            DynamicString::Wavelet(w) => w.access(pos),
        }
    }

    pub fn rank(&self, symbol: u32, pos: usize) -> CwResult<usize> {
        match self {
            DynamicString::Empty => Ok(0),
            DynamicString::Unary { symbol: s, count } => {
                if symbol == *s {
                    Ok(pos.min(*count))
                } else {
                    Ok(0)
                }
            }
            DynamicString::Wavelet(w) => w.rank(symbol, pos),
        }
    }

    /// 0-th order empirical entropy of this context, in bits/symbol; `0.0`
    /// for the degenerate shapes.
    pub fn entropy(&self) -> f64 {
        match self {
            DynamicString::Wavelet(w) => w.huffman.empirical_entropy(),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_has_zero_size() {
        let ds = DynamicString::build(&[0, 0, 0], AllocationPolicy::OnDemand).unwrap();
        assert_eq!(ds.size(), 0);
        assert!(matches!(ds, DynamicString::Empty));
    }

    #[test]
    fn unary_context_counts_without_a_tree() {
        let mut ds = DynamicString::build(&[0, 3, 0], AllocationPolicy::OnDemand).unwrap();
        assert!(matches!(ds, DynamicString::Unary { .. }));
        ds.insert(1, 0).unwrap();
        ds.insert(1, 1).unwrap();
        assert_eq!(ds.size(), 2);
        assert_eq!(ds.access(0), 1);
        assert_eq!(ds.rank(1, 2).unwrap(), 2);
    }

    #[test]
    fn wavelet_insert_access_rank_are_consistent() {
        let freqs = [4u64, 4, 4, 4];
        let mut ds = DynamicString::build(&freqs, AllocationPolicy::OnDemand).unwrap();
        // Insert symbols in sorted position (as cumulative counters would
        // direct), building the sequence [0,0,1,1,2,2,3,3].
        let sequence = [0u32, 0, 1, 1, 2, 2, 3, 3];
        let mut counts = [0usize; 4];
        for &s in &sequence {
            let pos: usize = counts[..s as usize].iter().sum();
            ds.insert(s, pos).unwrap();
            counts[s as usize] += 1;
        }
        assert_eq!(ds.size(), 8);
        for (i, &expected) in sequence.iter().enumerate() {
            assert_eq!(ds.access(i), expected);
        }
        assert_eq!(ds.rank(2, 8).unwrap(), 2);
        assert_eq!(ds.rank(0, 0).unwrap(), 0);
    }
}
