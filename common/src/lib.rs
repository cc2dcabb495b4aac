pub mod config;
pub mod logger;
pub mod rng;

pub use rng::{RandomSource, SequenceRng, SessionRng};
