use std::time::Duration;

use serde::{Deserialize, Serialize};

/// USD per 1000 characters of prompt text.
pub const DEFAULT_INPUT_RATE: f64 = 0.000125;
/// USD per 1000 characters of model output.
pub const DEFAULT_OUTPUT_RATE: f64 = 0.000375;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_CHUNK_SIZE: usize = 1000;

pub const DEFAULT_TEMPERATURE: f32 = 0.3;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostRates {
    pub input_per_1k_chars: f64,
    pub output_per_1k_chars: f64,
}

impl Default for CostRates {
    fn default() -> Self {
        Self {
            input_per_1k_chars: DEFAULT_INPUT_RATE,
            output_per_1k_chars: DEFAULT_OUTPUT_RATE,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    pub rates: CostRates,
    /// Maximum number of group calls in flight. Results are still folded in
    /// group order.
    pub concurrency: usize,
    pub call_timeout: Duration,
    /// Sort each group's concepts alphabetically instead of keeping the
    /// model's key order.
    pub sort_concepts: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            rates: CostRates::default(),
            concurrency: 1,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            sort_concepts: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RetrieverConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Preferred caption language; falls back to any English track, then to
    /// whatever the video has.
    pub language: String,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: 0,
            language: "en".to_string(),
        }
    }
}
