//! Digit-Pair Transition Tables
//!
//! For each arithmetic direction, enumerates every ordered digit pair
//! `(d1, d2)` in [0, 9] x [0, 9], derives the bead operation it induces on an
//! abacus column (carry included), and groups the pairs by operation index.
//! The resulting buckets are the natural combinatorics of single-digit
//! arithmetic: how many of the 100 equally likely pairs realize each bead
//! motion.

use serde::{Deserialize, Serialize};

use crate::bead::{digit_to_beads, BeadOperation};
use crate::error::{DrillError, DrillResult};
use crate::types::OPERATION_COUNT;

/// Arithmetic direction a table describes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Addition,
    Subtraction,
}

/// Operation-indexed digit-pair buckets plus natural frequencies for one
/// direction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionTable {
    direction: Direction,
    /// Realizing digit pairs per operation index, in enumeration order
    pairs: Vec<Vec<(u8, u8)>>,
    /// Fraction of the 100 digit pairs realizing each operation; sums to 1.0
    natural_freq: [f64; OPERATION_COUNT],
}

impl TransitionTable {
    /// Build the addition table
    pub fn addition() -> DrillResult<Self> {
        Self::build(Direction::Addition)
    }

    /// Build the subtraction table
    pub fn subtraction() -> DrillResult<Self> {
        Self::build(Direction::Subtraction)
    }

    fn build(direction: Direction) -> DrillResult<Self> {
        let mut pairs = vec![Vec::new(); OPERATION_COUNT];
        let mut natural_freq = [0.0; OPERATION_COUNT];

        for d1 in 0..10u8 {
            for d2 in 0..10u8 {
                let operation = induced_operation(direction, d1, d2)?;
                let index = operation.index();
                pairs[index].push((d1, d2));
                natural_freq[index] += 1.0;
            }
        }

        for freq in natural_freq.iter_mut() {
            *freq /= 100.0;
        }

        Ok(Self {
            direction,
            pairs,
            natural_freq,
        })
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Digit pairs realizing the given operation index
    pub fn pairs_for(&self, index: usize) -> &[(u8, u8)] {
        &self.pairs[index]
    }

    /// Number of digit pairs realizing the given operation index
    pub fn pair_count(&self, index: usize) -> usize {
        self.pairs[index].len()
    }

    /// Natural frequency of each operation index; entries sum to 1.0
    pub fn natural_freq(&self) -> &[f64; OPERATION_COUNT] {
        &self.natural_freq
    }

    /// Bead operation induced by applying `d2` to a column holding `d1`
    pub fn operation_for(&self, d1: u8, d2: u8) -> DrillResult<BeadOperation> {
        if d1 > 9 || d2 > 9 {
            return Err(DrillError::Configuration(format!(
                "digit pair ({}, {}) out of range",
                d1, d2
            )));
        }
        induced_operation(self.direction, d1, d2)
    }
}

/// Derive the bead motion for one digit transition.
///
/// Subtraction uses Euclidean division so a borrowed column is still
/// represented by non-negative bead counts and the carry comes out as -1.
fn induced_operation(direction: Direction, d1: u8, d2: u8) -> DrillResult<BeadOperation> {
    let (ones_before, fives_before) = digit_to_beads(d1);

    let (result, carry) = match direction {
        Direction::Addition => {
            let sum = i16::from(d1) + i16::from(d2);
            (sum.rem_euclid(10), sum.div_euclid(10))
        }
        Direction::Subtraction => {
            let difference = i16::from(d1) - i16::from(d2);
            (difference.rem_euclid(10), difference.div_euclid(10))
        }
    };

    let (ones_after, fives_after) = digit_to_beads(result as u8);
    BeadOperation::new(
        ones_after as i8 - ones_before as i8,
        fives_after as i8 - fives_before as i8,
        carry as i8,
    )
}

// ==================== Tests ====================
