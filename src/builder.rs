//! Component F: the two-pass cw-bwt construction.
//!
//! Pass 1 scans the text backward once to discover every distinct
//! left-context window and tally, for each one, how often each symbol of
//! the alphabet (terminator code `0` included) follows it — this fixes the
//! context automaton's states and freezes every context's Huffman shape and
//! cumulative-counter sizing before a single character is inserted. The
//! window left over once pass 1's backward loop runs out of text is
//! `context(0)`, the left-context of the terminator itself; whichever
//! bucket that window maps to is the one the terminator will physically
//! live in.
//!
//! Pass 2 scans the text backward again, carrying a single moving
//! terminator `(terminator_context, terminator_pos)` and a sliding k-symbol
//! buffer `ctx_chars` of the most recently read codes. At each step `head`
//! is the code just read and `tail` is the code it evicts from the buffer
//! (both land on the same slot `p mod k`). The terminator's current symbol,
//! `head`, is inserted at `terminator_pos` in its *current* bucket — the
//! standard backward-search recurrence of LF-mapping — while the context
//! automaton advances to `new_ctx` and the *evicted* symbol `tail` is what
//! actually gets counted into `new_ctx`'s running totals, since `tail` is
//! the code whose relative order in `new_ctx` decides where the terminator
//! lands next. Once the backward loop is done, the terminator character
//! itself is inserted at wherever the cursor landed.

use crate::alphabet::Alphabet;
use crate::backward_reader::BackwardByteSource;
use crate::bwt_iterator::BwtIterator;
use crate::context_automaton::ContextAutomaton;
use crate::tools::cumulative_counters::CumulativeCounters;
use crate::tools::dynamic_string::DynamicString;
use crate::{ContextLength, CwResult, Error, Options};
use std::collections::{BTreeSet, HashMap};

/// Read-only statistics about a completed build, exposed for `--verbose`
/// reporting.
#[derive(Clone, Debug)]
pub struct BuildStats {
    pub text_length: u64,
    pub alphabet_size: usize,
    pub context_length: u32,
    pub num_contexts: usize,
    pub largest_context_len: usize,
    pub expected_uniform_context_len: f64,
    pub empirical_entropy_bits_per_symbol: f64,
    pub actual_entropy_bits_per_symbol: f64,
}

pub struct CwBwtBuilder {
    alphabet: Alphabet,
    strings: Vec<DynamicString>,
    stats: BuildStats,
}

impl CwBwtBuilder {
    pub fn build<R: BackwardByteSource>(mut source: R, options: &Options) -> CwResult<CwBwtBuilder> {
        let alphabet = Alphabet::scan(&mut source)?;
        let n = source.len();
        let sigma = alphabet.sigma();
        let sigma_with_terminator = alphabet.sigma_with_terminator();

        let k = match options.k {
            ContextLength::Auto => ContextAutomaton::choose_k(sigma_with_terminator, n),
            ContextLength::Explicit(k) => {
                validate_k(k, n)?;
                k
            }
        };

        log::debug!("pass 1: tallying context frequencies (k={k}, sigma={sigma})");
        let (windows, freq_by_window, terminator_window) =
            tally_pass(&mut source, &alphabet, k, sigma_with_terminator)?;

        let mut automaton = ContextAutomaton::from_windows(k, sigma_with_terminator, windows)?;
        log::debug!("context automaton has {} states", automaton.num_states());

        let terminator_state = automaton
            .state_of_window(terminator_window)
            .ok_or_else(|| Error::Internal {
                reason: "terminator's left-context window has no automaton state".to_string(),
            })?;

        let policy = options.allocation;

        let mut strings = Vec::with_capacity(automaton.num_states());
        let mut counters = Vec::with_capacity(automaton.num_states());
        let mut empirical_entropy_weighted = 0.0f64;
        let mut actual_entropy_weighted = 0.0f64;
        let mut largest_context_len = 0usize;
        for state in 0..automaton.num_states() as u32 {
            let window = automaton.window(state);
            let mut freq = freq_by_window
                .get(&window)
                .cloned()
                .unwrap_or_else(|| vec![0u64; sigma_with_terminator]);
            if state == terminator_state {
                freq[0] += 1;
            }
            let total: u64 = freq.iter().sum();
            largest_context_len = largest_context_len.max(total as usize);
            let ds = DynamicString::build(&freq, policy)?;
            empirical_entropy_weighted += ds.entropy() * total as f64;
            actual_entropy_weighted += actual_entropy_of(&ds) * total as f64;
            strings.push(ds);
            let mut cc = CumulativeCounters::new(sigma_with_terminator, total);
            if state == terminator_state {
                cc.set_base_counter();
            }
            counters.push(cc);
        }

        log::debug!("pass 2: inserting characters with the moving terminator");
        automaton.rewind();
        let mut terminator_context = automaton.current_state() as usize;
        let mut terminator_pos: usize = 0;
        let mut ctx_chars = vec![0u16; k as usize];
        let mut remaining = n;
        while let Some(byte) = source.read() {
            let p = remaining - 1;
            let head = alphabet.encode(byte); // 1..=sigma
            let slot = (p % k as u64) as usize;
            let tail = ctx_chars[slot];
            ctx_chars[slot] = head;

            let new_ctx = automaton.go_to(head)? as usize;
            counters[new_ctx].increment(tail);
            let new_pos = counters[new_ctx].prefix(tail) as usize
                + strings[terminator_context].rank(head as u32, terminator_pos)?;
            strings[terminator_context].insert(head as u32, terminator_pos)?;

            terminator_context = new_ctx;
            terminator_pos = new_pos;
            remaining = p;
        }
        debug_assert!(
            counters[terminator_context].has_base_counter(),
            "moving terminator ended up outside the context pass 1 reserved for it"
        );
        strings[terminator_context].insert(0u32, terminator_pos)?;

        let stats = BuildStats {
            text_length: n,
            alphabet_size: sigma,
            context_length: k,
            num_contexts: strings.len(),
            largest_context_len,
            expected_uniform_context_len: if strings.is_empty() {
                0.0
            } else {
                n as f64 / strings.len() as f64
            },
            empirical_entropy_bits_per_symbol: if n == 0 {
                0.0
            } else {
                empirical_entropy_weighted / n as f64
            },
            actual_entropy_bits_per_symbol: if n == 0 {
                0.0
            } else {
                actual_entropy_weighted / n as f64
            },
        };
        log::debug!(
            "build complete: {} contexts, empirical entropy {:.3} bits/symbol",
            stats.num_contexts,
            stats.empirical_entropy_bits_per_symbol
        );

        Ok(CwBwtBuilder {
            alphabet,
            strings,
            stats,
        })
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn into_iterator(self) -> BwtIterator {
        BwtIterator::new(self.alphabet, self.strings)
    }
}

fn validate_k(k: u32, n: u64) -> CwResult<()> {
    if k == 0 {
        return Err(Error::InvalidParameter {
            reason: "context length k must be at least 1".to_string(),
        });
    }
    if (k as u64) >= n {
        return Err(Error::InvalidParameter {
            reason: format!(
                "context length k={k} must be smaller than the text length {n}"
            ),
        });
    }
    Ok(())
}

/// Returns the set of distinct context windows observed, the per-symbol
/// frequency vector (indexed by `alphabet.encode`, i.e. `1..=sigma`; index
/// `0` always stays zero here) that followed each one, and the left-context
/// window of the terminator itself.
fn tally_pass<R: BackwardByteSource>(
    source: &mut R,
    alphabet: &Alphabet,
    k: u32,
    sigma_with_terminator: usize,
) -> CwResult<(BTreeSet<u64>, HashMap<u64, Vec<u64>>, u64)> {
    let base = sigma_with_terminator as u64;
    let shift = base.pow(k.saturating_sub(1));
    let mut window: u64 = 0;
    let mut windows = BTreeSet::new();
    let mut freq: HashMap<u64, Vec<u64>> = HashMap::new();

    while let Some(byte) = source.read() {
        let code = alphabet.encode(byte) as u64; // 1..=sigma
        windows.insert(window);
        freq.entry(window)
            .or_insert_with(|| vec![0u64; sigma_with_terminator])
            .as_mut_slice()[code as usize] += 1;
        window = (window % shift) * base + code;
    }
    source.rewind();
    windows.insert(window);

    Ok((windows, freq, window))
}

fn actual_entropy_of(ds: &DynamicString) -> f64 {
    // Mirrors `DynamicString::entropy`'s empirical figure today; kept as a
    // distinct hook so a future Huffman-shape refinement can diverge the two.
    ds.entropy()
}
