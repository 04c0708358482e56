//! Optional network fault injection for deterministic testing.
//!
//! Loopback never drops packets, so the retransmission path would go
//! untested.  A [`Simulator`] attached to a
//! [`crate::channel::ReliableChannel`] decides, for every outbound datagram,
//! how many copies actually reach the socket:
//!
//! | Fault       | Description                                         |
//! |-------------|-----------------------------------------------------|
//! | Scripted    | Drop the next `drop_first` datagrams unconditionally. |
//! | Packet loss | Drop a datagram with probability `loss_rate`.       |
//! | Duplication | Deliver a datagram twice with `duplicate_rate`.     |
//!
//! Randomness comes from a seeded `StdRng`, so a failing run replays exactly.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Configuration for the fault-injection model.
///
/// Probabilities are clamped to `[0.0, 1.0]`; NaN and infinities count as `0.0`.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Number of leading datagrams to drop before random faults apply.
    pub drop_first: u32,
    /// Probability that any given datagram is silently dropped.
    pub loss_rate: f64,
    /// Probability that a datagram is sent twice.
    pub duplicate_rate: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        // Pass-through.
        Self {
            drop_first: 0,
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            seed: 0,
        }
    }
}

/// Per-datagram fault decisions.
#[derive(Debug)]
pub struct Simulator {
    config: SimulatorConfig,
    rng: StdRng,
    dropped: u64,
    duplicated: u64,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            dropped: 0,
            duplicated: 0,
        }
    }

    /// Drop exactly the next `n` datagrams, nothing else.
    pub fn drop_first(n: u32) -> Self {
        Self::new(SimulatorConfig {
            drop_first: n,
            ..SimulatorConfig::default()
        })
    }

    /// How many copies of the next outbound datagram to put on the wire.
    pub fn copies(&mut self) -> usize {
        if self.config.drop_first > 0 {
            self.config.drop_first -= 1;
            self.dropped += 1;
            return 0;
        }
        if self.rng.random_bool(probability(self.config.loss_rate)) {
            self.dropped += 1;
            return 0;
        }
        if self.rng.random_bool(probability(self.config.duplicate_rate)) {
            self.duplicated += 1;
            return 2;
        }
        1
    }

    /// Datagrams swallowed so far.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Datagrams sent twice so far.
    pub fn duplicated(&self) -> u64 {
        self.duplicated
    }
}

fn probability(rate: f64) -> f64 {
    if rate.is_finite() {
        rate.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
