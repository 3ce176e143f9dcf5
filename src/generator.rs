//! Mixed Problem Generator
//!
//! Synthesizes multi-operand addition/subtraction problems digit by digit,
//! column by column from the least significant end. Each operand after the
//! first is an addition or a subtraction step; every sampled digit is
//! conditioned on the last digit of the running sum at that column, so the
//! digit-pair transitions the learner performs follow the configured bead
//! operation emphasis. Carries propagate through the running sum exactly as
//! they would on the abacus.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::distribution::{digit_pair_prob, uniform_operation_freq, DigitPairProb};
use crate::error::{DrillError, DrillResult};
use crate::transition::{Direction, TransitionTable};
use crate::types::{GeneratorConfig, Problem};

/// Column-major problem generator with an owned, seedable rng.
pub struct MixedProblemGenerator {
    config: GeneratorConfig,
    /// Sampler for the seed operand's digits (addition first-digit marginal)
    add_first: WeightedIndex<f64>,
    /// Per-context samplers for addition steps, indexed by running-sum digit
    add_second: Vec<WeightedIndex<f64>>,
    /// Per-context samplers for subtraction steps
    sub_second: Vec<WeightedIndex<f64>>,
    rng: ChaCha8Rng,
}

impl MixedProblemGenerator {
    /// Create a generator with the uniform operation emphasis and an
    /// entropy-seeded rng.
    pub fn new(config: GeneratorConfig) -> DrillResult<Self> {
        let (add, sub) = uniform_tables()?;
        Self::from_tables(config, &add, &sub, None)
    }

    /// Create a generator with the uniform operation emphasis and a fixed
    /// seed, for reproducibility.
    pub fn with_seed(config: GeneratorConfig, seed: u64) -> DrillResult<Self> {
        let (add, sub) = uniform_tables()?;
        Self::from_tables(config, &add, &sub, Some(seed))
    }

    /// Create a generator from explicit digit-pair tables, e.g. built from a
    /// skewed operation emphasis.
    ///
    /// Fails with `InvalidDistribution` if any conditioning row of either
    /// table has no probability mass, since such a row could never be
    /// sampled from.
    pub fn from_tables(
        config: GeneratorConfig,
        add: &DigitPairProb,
        sub: &DigitPairProb,
        seed: Option<u64>,
    ) -> DrillResult<Self> {
        config.validate()?;

        let add_first = WeightedIndex::new(add.first_digit_marginal()).map_err(|_| {
            DrillError::InvalidDistribution(
                "addition first-digit marginal has no probability mass".to_string(),
            )
        })?;
        let add_second = conditional_samplers(add, Direction::Addition)?;
        let sub_second = conditional_samplers(sub, Direction::Subtraction)?;

        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            config,
            add_first,
            add_second,
            sub_second,
            rng,
        })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate one problem. The operand sum is guaranteed non-negative.
    pub fn generate(&mut self) -> Problem {
        let num_operands = self.config.num_operands;
        let num_digits = self.config.num_digits;

        // Signed digits per operand, most significant column first
        let mut operand_digits = vec![vec![0i32; num_digits]; num_operands];
        // Running-sum state: row n tracks the sum of operands 0..n. Column
        // num_digits holds the current column's digit, lower indices hold
        // carries into more significant columns.
        let mut sum_digits = vec![vec![0i32; num_digits + 1]; num_operands];

        // One direction draw per operand, reused across all its columns
        let signs: Vec<i32> = (0..num_operands)
            .map(|operand_n| {
                if operand_n == 0 || self.rng.gen::<f64>() <= self.config.addition_prob {
                    1
                } else {
                    -1
                }
            })
            .collect();

        for column in (0..num_digits).rev() {
            for operand_n in 1..num_operands {
                if operand_n == 1 {
                    operand_digits[0][column] =
                        self.add_first.sample(&mut self.rng) as i32;
                }

                // Fold the previous operand's digit into this row's running
                // sum, keeping the column digit and pushing the carry left.
                let s = sum_digits[operand_n][column + 1]
                    + sum_digits[operand_n - 1][column + 1]
                    + operand_digits[operand_n - 1][column];
                sum_digits[operand_n][column] = s.div_euclid(10);
                sum_digits[operand_n][column + 1] = s.rem_euclid(10);

                let context = sum_digits[operand_n][column + 1] as usize;
                let sampler = if signs[operand_n] > 0 {
                    &self.add_second[context]
                } else {
                    &self.sub_second[context]
                };
                operand_digits[operand_n][column] =
                    signs[operand_n] * sampler.sample(&mut self.rng) as i32;
            }
        }

        let mut operands: Vec<i64> = operand_digits
            .iter()
            .map(|digits| assemble_operand(digits))
            .collect();
        correct_negative_sum(&mut operands, num_digits);

        debug!(
            operands = operands.len(),
            answer = operands.iter().sum::<i64>(),
            "generated problem"
        );
        Problem::new(operands)
    }
}

fn uniform_tables() -> DrillResult<(DigitPairProb, DigitPairProb)> {
    let freq = uniform_operation_freq();
    let add = digit_pair_prob(&freq, &TransitionTable::addition()?)?;
    let sub = digit_pair_prob(&freq, &TransitionTable::subtraction()?)?;
    Ok((add, sub))
}

fn conditional_samplers(
    table: &DigitPairProb,
    direction: Direction,
) -> DrillResult<Vec<WeightedIndex<f64>>> {
    (0..10)
        .map(|d1| {
            WeightedIndex::new(table.row(d1)).map_err(|_| {
                DrillError::InvalidDistribution(format!(
                    "{:?} table row {} has no probability mass",
                    direction, d1
                ))
            })
        })
        .collect()
}

/// Positional assembly of signed column digits, most significant first
fn assemble_operand(digits: &[i32]) -> i64 {
    digits
        .iter()
        .fold(0i64, |value, &digit| value * 10 + i64::from(digit))
}

/// Corrective patch for a negative total: lift the seed operand by whole
/// multiples of `10^num_digits` until the sum is non-negative.
///
/// Lower digit columns are untouched, but the seed operand can end up wider
/// than `num_digits`; rejection sampling would preserve the width at the cost
/// of unbounded retries.
fn correct_negative_sum(operands: &mut [i64], num_digits: usize) {
    let total: i64 = operands.iter().sum();
    if total < 0 {
        let span = 10i64.pow(num_digits as u32);
        operands[0] -= span * total.div_euclid(span);
    }
}

// ==================== Tests ====================
