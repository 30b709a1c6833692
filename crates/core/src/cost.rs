use std::ops::AddAssign;

use serde::Serialize;

use crate::config::CostRates;

/// Character-based cost estimate. Characters are counted as Unicode scalar
/// values, not bytes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CostEstimate {
    pub input_chars: usize,
    pub output_chars: usize,
    pub input_cost: f64,
    pub output_cost: f64,
}

impl CostEstimate {
    pub fn for_call(input: &str, output: &str, rates: &CostRates) -> Self {
        let input_chars = input.chars().count();
        let output_chars = output.chars().count();
        Self {
            input_chars,
            output_chars,
            input_cost: input_chars as f64 / 1000.0 * rates.input_per_1k_chars,
            output_cost: output_chars as f64 / 1000.0 * rates.output_per_1k_chars,
        }
    }

    pub fn total(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}

impl AddAssign for CostEstimate {
    fn add_assign(&mut self, rhs: Self) {
        self.input_chars += rhs.input_chars;
        self.output_chars += rhs.output_chars;
        self.input_cost += rhs.input_cost;
        self.output_cost += rhs.output_cost;
    }
}
