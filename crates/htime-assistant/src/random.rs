//! Injectable source of randomness for reply selection and reference codes

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;
const CODE_PREFIX: &str = "HT-";

pub trait RandomSource: Send {
    /// Uniform index in `0..len`; `len` must be non-zero
    fn next_index(&mut self, len: usize) -> usize;

    /// Human-readable reference code such as `HT-7KQ2MX`.
    ///
    /// Unique-looking only; not suitable as a secret.
    fn reference_code(&mut self) -> String {
        let mut code = String::with_capacity(CODE_PREFIX.len() + CODE_LENGTH);
        code.push_str(CODE_PREFIX);
        for _ in 0..CODE_LENGTH {
            code.push(CODE_ALPHABET[self.next_index(CODE_ALPHABET.len())] as char);
        }
        code
    }
}

/// [`RandomSource`] backed by `StdRng`
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for tests and demos
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededRandom {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl RandomSource for SeededRandom {
    fn next_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }
}

/// Pick one element with the given source
pub fn pick<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.next_index(items.len()))
}
