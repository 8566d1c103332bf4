//! Pluggable parameter tuning.
//!
//! A fixed bounds table is searched by a [`ParameterTuner`] against an
//! objective computed from accumulated feedback — a weighted
//! combination of satisfaction, response-time score, and
//! classification accuracy. The winning parameters feed the composer's
//! generation settings and nothing else: tuning never changes the
//! pipeline's control flow.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

use crate::feedback::FeedbackLog;
use crate::generate::GenerationParams;

/// One tunable parameter and its allowed range.
#[derive(Debug, Clone, Copy)]
pub struct ParamBound {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub integer: bool,
}

/// The fixed bounds table.
pub const PARAMETER_BOUNDS: &[ParamBound] = &[
    ParamBound { name: "temperature", min: 0.1, max: 1.0, integer: false },
    ParamBound { name: "max_tokens", min: 100.0, max: 500.0, integer: true },
    ParamBound { name: "response_detail_level", min: 0.5, max: 2.0, integer: false },
    ParamBound { name: "confidence_threshold", min: 0.5, max: 0.95, integer: false },
    ParamBound { name: "context_window", min: 1.0, max: 5.0, integer: true },
];

/// Objective weights: satisfaction and accuracy dominate, latency is a
/// minor term. Output is clamped to [0, 1].
const WEIGHT_SATISFACTION: f64 = 0.4;
const WEIGHT_RESPONSE_TIME: f64 = 0.2;
const WEIGHT_ACCURACY: f64 = 0.4;

/// Capability: search the bounds for the best-scoring parameter set.
pub trait ParameterTuner: Send + Sync {
    fn tune(
        &mut self,
        bounds: &[ParamBound],
        objective: &dyn Fn(&HashMap<&'static str, f64>) -> f64,
    ) -> HashMap<&'static str, f64>;
}

/// Seeded random search over the bounds: a fixed number of trials,
/// keep the best. Deterministic for a given seed.
pub struct RandomSearchTuner {
    rng: StdRng,
    trials: usize,
}

impl RandomSearchTuner {
    pub fn new(seed: u64, trials: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            trials,
        }
    }
}

impl Default for RandomSearchTuner {
    fn default() -> Self {
        Self::new(42, 20)
    }
}

impl ParameterTuner for RandomSearchTuner {
    fn tune(
        &mut self,
        bounds: &[ParamBound],
        objective: &dyn Fn(&HashMap<&'static str, f64>) -> f64,
    ) -> HashMap<&'static str, f64> {
        let mut best: Option<(f64, HashMap<&'static str, f64>)> = None;

        for _ in 0..self.trials {
            let mut candidate = HashMap::with_capacity(bounds.len());
            for bound in bounds {
                let mut value = self.rng.gen_range(bound.min..=bound.max);
                if bound.integer {
                    value = value.round();
                }
                candidate.insert(bound.name, value);
            }

            let score = objective(&candidate) - stability_penalty(&candidate);
            let improved = best.as_ref().map(|(s, _)| score > *s).unwrap_or(true);
            if improved {
                best = Some((score, candidate));
            }
        }

        best.map(|(_, params)| params).unwrap_or_default()
    }
}

/// Penalize extremes so tuning does not chase noise: very high
/// temperature, very low confidence, very verbose responses.
fn stability_penalty(params: &HashMap<&'static str, f64>) -> f64 {
    let mut penalty = 0.0;
    if params.get("temperature").copied().unwrap_or(0.7) > 0.9 {
        penalty += 0.1;
    }
    if params.get("confidence_threshold").copied().unwrap_or(0.8) < 0.6 {
        penalty += 0.1;
    }
    if params.get("max_tokens").copied().unwrap_or(200.0) > 400.0 {
        penalty += 0.05;
    }
    penalty
}

/// Compute the tuning objective from accumulated feedback. Missing
/// signals score neutral (0.5) so early sessions do not whipsaw the
/// parameters.
pub fn objective_score(log: &FeedbackLog) -> f64 {
    let satisfaction = log.positive_rate().unwrap_or(0.5);

    let time_score = match log.mean_response_seconds() {
        // Normalized around 1-2 seconds; slower responses score lower.
        Some(mean) => (1.0 - (mean - 1.0) / 10.0).clamp(0.0, 1.0),
        None => 0.5,
    };

    let accuracy = log.overall_accuracy().unwrap_or(0.5);

    let score = WEIGHT_SATISFACTION * satisfaction
        + WEIGHT_RESPONSE_TIME * time_score
        + WEIGHT_ACCURACY * accuracy;
    score.clamp(0.0, 1.0)
}

/// Apply a tuned parameter set onto the generation params, leaving any
/// missing entries unchanged.
pub fn apply_params(params: &HashMap<&'static str, f64>, target: &mut GenerationParams) {
    if let Some(v) = params.get("temperature") {
        target.temperature = *v;
    }
    if let Some(v) = params.get("max_tokens") {
        target.max_tokens = *v as u32;
    }
    if let Some(v) = params.get("response_detail_level") {
        target.response_detail_level = *v;
    }
    if let Some(v) = params.get("confidence_threshold") {
        target.confidence_threshold = *v;
    }
    if let Some(v) = params.get("context_window") {
        target.context_window = *v as u32;
    }
}
