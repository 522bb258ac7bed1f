//! Component C: the fixed-length left-context automaton.
//!
//! States are the distinct length-`k` windows of coded symbols that actually
//! occur in the text (not the full `sigma^k` combinatorial space), numbered
//! densely in ascending lexicographic order of the window itself. A window
//! is encoded as a base-`sigma` integer with the oldest symbol as the most
//! significant digit, so lexicographic order on windows is the same as
//! numeric order on their encodings, and `goTo` is a single multiply-mod-add.

use crate::{CwResult, Error};
use std::collections::BTreeSet;

const MISSING: u32 = u32::MAX;

#[derive(Clone, Debug)]
pub struct ContextAutomaton {
    k: u32,
    sigma: u64,
    sigma_pow_k_minus_1: u64,
    /// Windows in ascending order; state id is the index into this vector.
    windows: Vec<u64>,
    /// `edges[state * sigma + symbol]` -> next state, or `MISSING`.
    edges: Vec<u32>,
    current_state: u32,
}

impl ContextAutomaton {
    /// Choose `k` automatically for a text of length `n` over an alphabet of
    /// size `sigma`: the largest `k` such that `sigma^k <= n / (ln n)^3`,
    /// clamped to at least 1 and to the largest `k` with `sigma^k <= n`.
    pub fn choose_k(sigma: usize, n: u64) -> u32 {
        if sigma <= 1 || n == 0 {
            return 1;
        }
        let sigma = sigma as f64;
        let n_f = n as f64;
        let budget = if n_f > 1.0 {
            n_f / n_f.ln().powi(3).max(1.0)
        } else {
            1.0
        };
        let max_k_by_n = (n_f.ln() / sigma.ln()).floor().max(1.0) as u32;
        let mut k = 1u32;
        while k < max_k_by_n {
            let next = sigma.powi(k as i32 + 1);
            if next > budget {
                break;
            }
            k += 1;
        }
        k.max(1)
    }

    /// Build the automaton from the set of distinct length-`k` windows
    /// observed while scanning the (coded) text, as collected by the
    /// builder's first pass.
    pub fn from_windows(k: u32, sigma: usize, windows: BTreeSet<u64>) -> CwResult<ContextAutomaton> {
        if sigma == 0 {
            return Err(Error::InvalidParameter {
                reason: "alphabet is empty".to_string(),
            });
        }
        if windows.is_empty() {
            return Err(Error::InvalidInput {
                reason: "no context windows observed".to_string(),
            });
        }
        let sigma_u64 = sigma as u64;
        let sigma_pow_k_minus_1 = sigma_u64.pow(k.saturating_sub(1));
        let windows: Vec<u64> = windows.into_iter().collect();
        let n_states = windows.len();

        let mut edges = vec![MISSING; n_states * sigma];
        for (state, &window) in windows.iter().enumerate() {
            for s in 0..sigma_u64 {
                let next_window = (window % sigma_pow_k_minus_1) * sigma_u64 + s;
                if let Ok(next_state) = windows.binary_search(&next_window) {
                    edges[state * sigma + s as usize] = next_state as u32;
                }
            }
        }

        Ok(ContextAutomaton {
            k,
            sigma: sigma_u64,
            sigma_pow_k_minus_1,
            windows,
            edges,
            current_state: 0,
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn num_states(&self) -> usize {
        self.windows.len()
    }

    pub fn rewind(&mut self) {
        self.current_state = 0;
    }

    /// The dense id of the state whose window is the all-zero window
    /// (used as the initial state before any symbol has been read).
    pub fn current_state(&self) -> u32 {
        self.current_state
    }

    /// Advance by reading coded symbol `s`, dropping the oldest symbol of
    /// the current window.
    pub fn go_to(&mut self, s: u16) -> CwResult<u32> {
        let next = self.edges[self.current_state as usize * self.sigma as usize + s as usize];
        if next == MISSING {
            return Err(Error::Internal {
                reason: format!(
                    "context automaton has no edge from state {} on symbol {}",
                    self.current_state, s
                ),
            });
        }
        self.current_state = next;
        Ok(next)
    }

    /// State id for an arbitrary window, if it was observed during
    /// construction.
    pub fn state_of_window(&self, window: u64) -> Option<u32> {
        self.windows.binary_search(&window).ok().map(|i| i as u32)
    }

    /// The window (sequence of `k` coded symbols, oldest first) for a state.
    pub fn window(&self, state: u32) -> u64 {
        self.windows[state as usize]
    }

    pub fn sigma(&self) -> u64 {
        self.sigma
    }

    pub fn sigma_pow_k_minus_1(&self) -> u64 {
        self.sigma_pow_k_minus_1
    }
}
