use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of randomness injected into every simulation subsystem so that a
/// match is reproducible from its seed.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `[0, bound)`. `bound` must be non-zero.
    fn next_below(&mut self, bound: usize) -> usize;

    fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }

    /// Uniform integer in `[low, high]`.
    fn inclusive(&mut self, low: u32, high: u32) -> u32 {
        low + self.next_below((high - low + 1) as usize) as u32
    }
}

pub fn pick<'a, T>(rng: &mut dyn RandomSource, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.next_below(items.len()))
}

pub struct SessionRng {
    rng: StdRng,
    seed: u64,
}

impl SessionRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn from_random() -> Self {
        let seed: u64 = rand::rng().random();
        Self::new(seed)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SessionRng {
    fn next_unit(&mut self) -> f64 {
        self.rng.random()
    }

    fn next_below(&mut self, bound: usize) -> usize {
        self.rng.random_range(0..bound)
    }
}

/// Replays a fixed list of unit values, wrapping around at the end.
/// `next_below(n)` maps the current value onto `[0, n)`.
#[derive(Clone, Debug)]
pub struct SequenceRng {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRng {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "SequenceRng needs at least one value");
        Self { values, cursor: 0 }
    }

    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for SequenceRng {
    fn next_unit(&mut self) -> f64 {
        let value = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        value.clamp(0.0, 0.999_999_999)
    }

    fn next_below(&mut self, bound: usize) -> usize {
        ((self.next_unit() * bound as f64) as usize).min(bound - 1)
    }
}
