//! Probability Distributor
//!
//! Turns a target distribution over the 27 bead operations into a 10x10 joint
//! probability table over digit pairs: each operation's mass is spread evenly
//! across the digit pairs that realize it. Also exposes marginal and
//! conditional views of the resulting table, which is what the generator
//! samples from.

use serde::{Deserialize, Serialize};

use crate::error::{DrillError, DrillResult};
use crate::transition::TransitionTable;
use crate::types::{OPERATION_COUNT, PROB_TOLERANCE};

/// The uniform emphasis over all 27 operation slots
pub fn uniform_operation_freq() -> [f64; OPERATION_COUNT] {
    [1.0 / OPERATION_COUNT as f64; OPERATION_COUNT]
}

/// Joint probability table over ordered digit pairs; cells sum to 1.0
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DigitPairProb {
    cells: [[f64; 10]; 10],
}

impl DigitPairProb {
    /// Probability of the transition `(d1, d2)`
    pub fn get(&self, d1: usize, d2: usize) -> f64 {
        self.cells[d1][d2]
    }

    /// Sum of all cells; 1.0 within tolerance by construction
    pub fn total(&self) -> f64 {
        self.cells.iter().flatten().sum()
    }

    /// One row of the table: the joint mass of `(d1, *)`
    pub fn row(&self, d1: usize) -> [f64; 10] {
        self.cells[d1]
    }

    /// Marginal distribution of the first digit (row sums)
    pub fn first_digit_marginal(&self) -> [f64; 10] {
        let mut marginal = [0.0; 10];
        for (d1, row) in self.cells.iter().enumerate() {
            marginal[d1] = row.iter().sum();
        }
        marginal
    }

    /// Conditional distribution of the second digit given the first.
    ///
    /// Fails with `InvalidDistribution` if the row carries no mass, rather
    /// than producing NaN entries.
    pub fn second_given_first(&self, d1: usize) -> DrillResult<[f64; 10]> {
        Self::normalize(&self.cells[d1], || format!("first digit {}", d1))
    }

    /// Conditional distribution of the first digit given the second
    pub fn first_given_second(&self, d2: usize) -> DrillResult<[f64; 10]> {
        let mut column = [0.0; 10];
        for (d1, row) in self.cells.iter().enumerate() {
            column[d1] = row[d2];
        }
        Self::normalize(&column, || format!("second digit {}", d2))
    }

    fn normalize(weights: &[f64; 10], context: impl Fn() -> String) -> DrillResult<[f64; 10]> {
        let total: f64 = weights.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Err(DrillError::InvalidDistribution(format!(
                "no probability mass conditioned on {}",
                context()
            )));
        }
        let mut normalized = *weights;
        for weight in normalized.iter_mut() {
            *weight /= total;
        }
        Ok(normalized)
    }
}

/// Spread each operation's probability evenly over its realizing digit pairs.
///
/// The input vector must sum to 1.0 within tolerance. The output table must
/// too: mass assigned to an operation with no realizing pairs would silently
/// vanish, so the post-condition check turns that into an error.
pub fn digit_pair_prob(
    op_freq: &[f64; OPERATION_COUNT],
    table: &TransitionTable,
) -> DrillResult<DigitPairProb> {
    if op_freq.iter().any(|&p| !p.is_finite() || p < 0.0) {
        return Err(DrillError::InvalidDistribution(
            "operation frequencies must be finite and non-negative".to_string(),
        ));
    }
    let input_total: f64 = op_freq.iter().sum();
    if (input_total - 1.0).abs() > PROB_TOLERANCE {
        return Err(DrillError::InvalidDistribution(format!(
            "operation frequencies sum to {}, expected 1.0",
            input_total
        )));
    }

    let mut cells = [[0.0; 10]; 10];
    for (index, &freq) in op_freq.iter().enumerate() {
        let pairs = table.pairs_for(index);
        if pairs.is_empty() {
            continue;
        }
        let share = freq / pairs.len() as f64;
        for &(d1, d2) in pairs {
            cells[d1 as usize][d2 as usize] = share;
        }
    }

    let output = DigitPairProb { cells };
    let output_total = output.total();
    if (output_total - 1.0).abs() > PROB_TOLERANCE {
        return Err(DrillError::InvalidDistribution(format!(
            "digit-pair table sums to {}: probability mass was assigned to \
             operations no digit pair realizes",
            output_total
        )));
    }

    Ok(output)
}

// ==================== Tests ====================
