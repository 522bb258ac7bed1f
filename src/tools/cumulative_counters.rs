//! Component D: sigma cumulative counters backed by a packed d-ary tree.
//!
//! `increment(s)` conceptually adds 1 to counters `s, s+1, ..., sigma-1`;
//! `prefix(s)` returns how many increments so far had an index `< s`. Both
//! operations cost `O(log_d sigma)` node touches, where `d` counters of
//! width `counter_bits` are packed into each 64-bit node word and a single
//! word-wide addition (`ones_from`) bumps every counter at or past a given
//! slot in one step, the same trick as a Fenwick tree generalized to
//! branching factor `d` instead of 2.

/// Smallest number of bits needed to hold values `0..=max`.
fn bits_for(max: u64) -> u32 {
    64 - max.leading_zeros().min(63)
}

#[derive(Clone, Debug)]
pub struct CumulativeCounters {
    sigma: usize,
    d: usize,
    counter_bits: u32,
    mask: u64,
    /// `ones_from[i]` has a 1 at the low bit of every counter slot `>= i`.
    ones_from: Vec<u64>,
    /// `levels[0]` are leaves (one word per `d` symbols); each higher level
    /// groups `d` nodes of the level below it into one word, up to a single
    /// root.
    levels: Vec<Vec<u64>>,
    /// Marks the single context whose bucket will receive the text
    /// terminator at the end of pass 2. Carries no arithmetic weight of its
    /// own — the terminator's final position falls out of the ordinary
    /// recurrence — but lets the builder assert it landed where pass 1
    /// expected.
    base_counter: bool,
    total: u64,
}

impl CumulativeCounters {
    /// `sigma`: number of distinct counters. `n`: an upper bound on any
    /// single counter's final value, used to size the packed word layout.
    pub fn new(sigma: usize, n: u64) -> Self {
        let counter_bits = bits_for(n.max(1)).max(1);
        let d = ((64 / counter_bits as u64).max(2)) as usize;
        let mask = if counter_bits >= 64 {
            u64::MAX
        } else {
            (1u64 << counter_bits) - 1
        };
        let ones_from: Vec<u64> = (0..=d)
            .map(|from| {
                let mut word = 0u64;
                for slot in from..d {
                    word |= 1u64 << (slot as u32 * counter_bits);
                }
                word
            })
            .collect();

        let mut levels = Vec::new();
        let mut count = sigma.max(1);
        loop {
            let nodes = (count + d - 1) / d;
            levels.push(vec![0u64; nodes.max(1)]);
            if nodes <= 1 {
                break;
            }
            count = nodes;
        }

        CumulativeCounters {
            sigma,
            d,
            counter_bits,
            mask,
            ones_from,
            levels,
            base_counter: false,
            total: 0,
        }
    }

    pub fn sigma(&self) -> usize {
        self.sigma
    }

    pub fn set_base_counter(&mut self) {
        self.base_counter = true;
    }

    /// Whether `set_base_counter` was called on this instance.
    pub fn has_base_counter(&self) -> bool {
        self.base_counter
    }

    fn counter_at(word: u64, slot: usize, counter_bits: u32, mask: u64) -> u64 {
        (word >> (slot as u32 * counter_bits)) & mask
    }

    /// Increment counters `s, s+1, ..., sigma-1` by one.
    pub fn increment(&mut self, s: u16) {
        let mut index = s as usize;
        for level in 0..self.levels.len() {
            let node_idx = index / self.d;
            let local = index % self.d;
            self.levels[level][node_idx] =
                self.levels[level][node_idx].wrapping_add(self.ones_from[local]);
            index = node_idx;
        }
        self.total += 1;
    }

    /// Number of increments so far with an index strictly less than `s`.
    pub fn prefix(&self, s: u16) -> u64 {
        let mut total = 0u64;
        let mut index = s as usize;
        for level in 0..self.levels.len() {
            let node_idx = index / self.d;
            let local = index % self.d;
            if local > 0 {
                total += Self::counter_at(
                    self.levels[level][node_idx],
                    local - 1,
                    self.counter_bits,
                    self.mask,
                );
            }
            index = node_idx;
        }
        total
    }

    /// Total number of increments performed so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Approximate size in bits, for diagnostics.
    pub fn bit_size(&self) -> usize {
        self.levels.iter().map(|l| l.len() * 64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_node_matches_naive_counts() {
        let mut cc = CumulativeCounters::new(4, 100);
        let inserts = [0u16, 2, 1, 1, 3, 0, 2];
        for &s in &inserts {
            cc.increment(s);
        }
        for s in 0..=4u16 {
            let expected = inserts.iter().filter(|&&x| (x as u16) < s).count() as u64;
            assert_eq!(cc.prefix(s), expected, "prefix({s})");
        }
    }

    #[test]
    fn spans_multiple_levels() {
        let sigma = 500;
        let mut cc = CumulativeCounters::new(sigma, 10_000);
        let mut naive = vec![0u64; sigma];
        let pattern: Vec<u16> = (0..3000u32).map(|i| ((i * 37) % sigma as u32) as u16).collect();
        for &s in &pattern {
            cc.increment(s);
            naive[s as usize] += 1;
        }
        let mut prefix_naive = vec![0u64; sigma + 1];
        for i in 0..sigma {
            prefix_naive[i + 1] = prefix_naive[i] + naive[i];
        }
        for s in 0..=sigma {
            assert_eq!(cc.prefix(s as u16), prefix_naive[s], "prefix({s})");
        }
    }

    #[test]
    fn base_counter_is_a_marker_not_an_offset() {
        let mut cc = CumulativeCounters::new(4, 10);
        assert!(!cc.has_base_counter());
        cc.set_base_counter();
        assert!(cc.has_base_counter());
        assert_eq!(cc.prefix(0), 0);
        cc.increment(1);
        assert_eq!(cc.prefix(2), 1);
    }

    #[test]
    fn total_matches_number_of_increments() {
        let mut cc = CumulativeCounters::new(8, 50);
        for s in [0u16, 1, 7, 3, 3, 7] {
            cc.increment(s);
        }
        assert_eq!(cc.total(), 6);
    }
}
