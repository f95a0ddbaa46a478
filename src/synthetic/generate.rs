//! Toy ground-truth and sorter outputs for demos and tests.
//!
//! Ground-truth units fire as Poisson processes with a refractory period.
//! The "sorter" output is derived from them by dropping spikes, jittering
//! the survivors and adding spurious spikes, so the true correspondence is
//! known.

use crate::data::{Sorting, SpikeTrain, TimeBase, UnitId};
use crate::error::{CompareError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for synthetic sorting generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Name/identifier for this dataset.
    pub name: String,
    /// Number of ground-truth units.
    pub n_units: usize,
    /// Recording duration in seconds.
    pub duration_secs: f64,
    /// Mean firing rate per unit in Hz.
    pub firing_rate_hz: f64,
    /// Sampling frequency in Hz.
    pub sampling_frequency: f64,
    /// Refractory period in milliseconds.
    pub refractory_ms: f64,
    /// Maximum absolute spike-time jitter of the sorter, in milliseconds.
    pub jitter_ms: f64,
    /// Fraction of ground-truth spikes the sorter misses (0.0-1.0).
    pub miss_fraction: f64,
    /// Rate of spurious spikes added to each sorted unit, in Hz.
    pub false_positive_rate_hz: f64,
    /// Extra sorted units made of spurious spikes only.
    pub n_noise_units: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "toy".to_string(),
            n_units: 10,
            duration_secs: 10.0,
            firing_rate_hz: 10.0,
            sampling_frequency: 30000.0,
            refractory_ms: 2.0,
            jitter_ms: 0.1,
            miss_fraction: 0.05,
            false_positive_rate_hz: 0.5,
            n_noise_units: 0,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Create a new config with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the number of ground-truth units.
    pub fn with_units(mut self, n_units: usize) -> Self {
        self.n_units = n_units;
        self
    }

    /// Set duration and firing rate.
    pub fn with_activity(mut self, duration_secs: f64, firing_rate_hz: f64) -> Self {
        self.duration_secs = duration_secs;
        self.firing_rate_hz = firing_rate_hz;
        self
    }

    /// Set the sampling frequency in Hz.
    pub fn with_sampling_frequency(mut self, sampling_frequency: f64) -> Self {
        self.sampling_frequency = sampling_frequency;
        self
    }

    /// Set sorter errors: jitter, missed fraction and spurious spike rate.
    pub fn with_errors(
        mut self,
        jitter_ms: f64,
        miss_fraction: f64,
        false_positive_rate_hz: f64,
    ) -> Self {
        self.jitter_ms = jitter_ms.max(0.0);
        self.miss_fraction = miss_fraction.clamp(0.0, 1.0);
        self.false_positive_rate_hz = false_positive_rate_hz.max(0.0);
        self
    }

    /// Set the number of pure-noise sorted units.
    pub fn with_noise_units(mut self, n: usize) -> Self {
        self.n_noise_units = n;
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // Preset configurations

    /// Sorter output identical to ground truth.
    pub fn perfect() -> Self {
        Self::new("perfect").with_errors(0.0, 0.0, 0.0)
    }

    /// Sorter that misses a third of the spikes and adds noise units.
    pub fn noisy() -> Self {
        Self::new("noisy")
            .with_errors(0.3, 0.3, 2.0)
            .with_noise_units(2)
    }

    fn validate(&self) -> Result<()> {
        if self.n_units == 0 {
            return Err(CompareError::Configuration(
                "synthetic data needs at least one unit".to_string(),
            ));
        }
        if !is_positive(self.duration_secs) || !is_positive(self.firing_rate_hz) {
            return Err(CompareError::Configuration(format!(
                "duration ({}) and firing rate ({}) must be positive",
                self.duration_secs, self.firing_rate_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.miss_fraction) {
            return Err(CompareError::Configuration(format!(
                "miss_fraction must be within [0, 1], got {}",
                self.miss_fraction
            )));
        }
        if self.refractory_ms < 0.0 || self.jitter_ms < 0.0 || self.false_positive_rate_hz < 0.0 {
            return Err(CompareError::Configuration(
                "refractory, jitter and false-positive rate must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn is_positive(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

/// Generated ground truth and sorter output.
#[derive(Debug, Clone)]
pub struct SyntheticSortings {
    /// Configuration used.
    pub config: SyntheticConfig,
    /// Ground-truth sorting, units `0..n_units`.
    pub ground_truth: Sorting,
    /// Simulated sorter output.
    pub tested: Sorting,
    /// `(gt unit, tested unit)` pairs derived from each other.
    pub true_mapping: Vec<(UnitId, UnitId)>,
}

/// Simple deterministic RNG (xorshift64).
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    /// Exponentially distributed interval with the given rate.
    fn next_exponential(&mut self, rate: f64) -> f64 {
        let u = (1.0 - self.next_f64()).max(1e-12);
        -u.ln() / rate
    }

    /// Uniform integer in `[-bound, bound]`.
    fn next_offset(&mut self, bound: i64) -> i64 {
        if bound <= 0 {
            return 0;
        }
        let span = (2 * bound + 1) as u64;
        (self.next_u64() % span) as i64 - bound
    }
}

/// Poisson spike times with a refractory period, as frames.
fn poisson_frames(
    rng: &mut Rng,
    rate: f64,
    refractory_secs: f64,
    duration_secs: f64,
    time_base: &TimeBase,
) -> Vec<i64> {
    let mut frames = Vec::new();
    if rate <= 0.0 {
        return frames;
    }
    let mut t = rng.next_exponential(rate);
    while t < duration_secs {
        frames.push(time_base.seconds_to_frame(t));
        t += refractory_secs + rng.next_exponential(rate);
    }
    frames
}

fn into_train(mut frames: Vec<i64>) -> Result<SpikeTrain> {
    frames.sort_unstable();
    frames.dedup();
    SpikeTrain::new(frames)
}

/// Generate a ground-truth sorting and a perturbed sorter output.
///
/// Tested unit `n_units - 1 - u` is derived from gt unit `u`; noise units
/// follow with ids `n_units..`.
pub fn generate_toy_sortings(config: &SyntheticConfig) -> Result<SyntheticSortings> {
    config.validate()?;
    let time_base = TimeBase::new(config.sampling_frequency)?;
    let mut rng = Rng::new(config.seed);

    let refractory = config.refractory_ms / 1000.0;
    let jitter = time_base.ms_to_frames(config.jitter_ms);
    let last_frame = time_base.seconds_to_frame(config.duration_secs);

    let mut gt_units = Vec::with_capacity(config.n_units);
    let mut tested_units = Vec::with_capacity(config.n_units + config.n_noise_units);
    let mut true_mapping = Vec::with_capacity(config.n_units);

    for u in 0..config.n_units {
        let gt_frames = poisson_frames(
            &mut rng,
            config.firing_rate_hz,
            refractory,
            config.duration_secs,
            &time_base,
        );

        let mut sorted_frames = Vec::with_capacity(gt_frames.len());
        for &frame in &gt_frames {
            if rng.next_f64() < config.miss_fraction {
                continue;
            }
            sorted_frames.push((frame + rng.next_offset(jitter)).clamp(0, last_frame));
        }
        sorted_frames.extend(poisson_frames(
            &mut rng,
            config.false_positive_rate_hz,
            0.0,
            config.duration_secs,
            &time_base,
        ));

        let gt_id = UnitId::Int(u as i64);
        let tested_id = UnitId::Int((config.n_units - 1 - u) as i64);
        gt_units.push((gt_id.clone(), SpikeTrain::new(gt_frames)?));
        tested_units.push((tested_id.clone(), into_train(sorted_frames)?));
        true_mapping.push((gt_id, tested_id));
    }

    for k in 0..config.n_noise_units {
        let frames = poisson_frames(
            &mut rng,
            config.firing_rate_hz,
            refractory,
            config.duration_secs,
            &time_base,
        );
        tested_units.push((UnitId::Int((config.n_units + k) as i64), into_train(frames)?));
    }

    Ok(SyntheticSortings {
        config: config.clone(),
        ground_truth: Sorting::new(time_base, gt_units)?,
        tested: Sorting::new(time_base, tested_units)?,
        true_mapping,
    })
}
