//! Deterministic seed streams.
//!
//! Every repetition, fold half-split and bootstrap run draws from its own
//! `StdRng`, seeded by mixing the user seed with a stream id through the
//! SplitMix64 finalizer. Results therefore do not depend on the order in
//! which parallel workers run.
use rand::{SeedableRng, rngs::StdRng};

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;

/// Mix `base` and `stream` into a well-spread 64-bit seed.
pub fn derive_seed(base: u64, stream: u64) -> u64 {
    let mut z = base ^ stream.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// `StdRng` for the nested stream `(base, path[0], path[1], ...)`.
pub fn stream_rng(base: u64, path: &[u64]) -> StdRng {
    let seed = path.iter().fold(base, |acc, &s| derive_seed(acc, s));
    StdRng::seed_from_u64(seed)
}
