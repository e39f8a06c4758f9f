//! Deterministic random number generation.
//!
//! RULE: Nothing in the pipeline may call any platform RNG.
//! All randomness flows through SeededStream instances derived
//! from the single master seed of the run.
//!
//! Each consumer gets its own stream, seeded deterministically
//! from (master_seed XOR stream_index). This means:
//!   - Adding a new stream never changes existing streams.
//!   - Each stream is fully reproducible in isolation.

use crate::types::Days;
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use std::f64::consts::TAU;

/// The draws the customer generator consumes.
///
/// Implementors only have to supply uniform primitives; every
/// distribution has a default built on top of them. Tests override
/// the distribution methods to script exact attribute values.
pub trait DrawSource {
    /// Roll a float in [0.0, 1.0).
    fn next_f64(&mut self) -> f64;

    /// Roll a u64 in [0, n).
    fn next_u64_below(&mut self, n: u64) -> u64;

    /// Uniform integer in [lo, hi).
    fn uniform_int(&mut self, lo: Days, hi: Days) -> Days {
        assert!(hi > lo, "empty range [{lo}, {hi})");
        lo + self.next_u64_below((hi - lo) as u64) as Days
    }

    /// Standard normal via Box–Muller. Consumes two uniforms.
    fn normal(&mut self) -> f64 {
        // 1 - u keeps the log argument in (0, 1].
        let u1 = 1.0 - self.next_f64();
        let u2 = self.next_f64();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// Log-normal with the given mean and sigma of the underlying normal.
    fn log_normal(&mut self, mean: f64, sigma: f64) -> f64 {
        (mean + sigma * self.normal()).exp()
    }

    /// Poisson by Knuth's multiplication method. Fine for the small
    /// lambdas used here; cost grows linearly with lambda.
    fn poisson(&mut self, lambda: f64) -> u64 {
        if lambda <= 0.0 {
            return 0;
        }
        let limit = (-lambda).exp();
        let mut k = 0u64;
        let mut p = self.next_f64();
        while p > limit {
            k += 1;
            p *= self.next_f64();
        }
        k
    }

    /// Exponential with the given scale (mean), by inverse CDF.
    fn exponential(&mut self, scale: f64) -> f64 {
        -scale * (1.0 - self.next_f64()).ln()
    }

    /// Binomial as `trials` Bernoulli trials.
    fn binomial(&mut self, trials: u64, p: f64) -> u64 {
        (0..trials).filter(|_| self.next_f64() < p).count() as u64
    }
}

/// A named, deterministic RNG stream.
pub struct SeededStream {
    pub name: &'static str,
    inner: Pcg64Mcg,
}

impl SeededStream {
    /// Create a stream from the master seed and a stable stream
    /// index. The index must never change once assigned.
    pub fn new(master_seed: u64, stream_index: u64) -> Self {
        let derived_seed = master_seed ^ (stream_index.wrapping_mul(0x9e37_79b9_7f4a_7c15));
        Self {
            name: "unnamed",
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }
}

impl DrawSource for SeededStream {
    fn next_f64(&mut self) -> f64 {
        let bits = self.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    fn next_u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "n must be > 0");
        self.next_u64() % n
    }
}

/// All streams for a single run, indexed by stable slot.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    pub fn for_stream(&self, slot: StreamSlot) -> SeededStream {
        SeededStream::new(self.master_seed, slot as u64).with_name(slot.name())
    }
}

/// Stable stream slot assignments.
/// NEVER reorder or remove entries. Only append.
/// Reordering changes every stream's seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u64)]
pub enum StreamSlot {
    Generator = 0,
    // Add new streams here. Append only.
}

impl StreamSlot {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generator => "generator",
        }
    }
}
