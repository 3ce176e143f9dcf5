//! Common Types and Constants
//!
//! Shared data structures used across all drill modules.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DrillError, DrillResult};

// ==================== Constants ====================

/// Number of distinct (ones, fives) bead operation slots
pub const OPERATION_COUNT: usize = 27;

/// Tolerance for probability vectors and tables summing to 1.0
pub const PROB_TOLERANCE: f64 = 1e-6;

/// Tolerance for configuration probabilities summing to 1.0
pub const CONFIG_TOLERANCE: f64 = 1e-12;

/// Upper bound on digit columns per operand, so operand sums stay inside i64
pub const MAX_NUM_DIGITS: usize = 15;

/// Display width of a formatted operand
const OPERAND_WIDTH: usize = 10;

// ==================== Configuration ====================

/// Problem generation parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Probability that an operand after the first is an addition step
    pub addition_prob: f64,
    /// Number of decimal digit columns per operand
    pub num_digits: usize,
    /// Number of operands per problem, first operand included
    pub num_operands: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            addition_prob: 0.5,
            num_digits: 6,
            num_operands: 5,
        }
    }
}

impl GeneratorConfig {
    /// Validate structural bounds before any sampling occurs
    pub fn validate(&self) -> DrillResult<()> {
        if !(0.0..=1.0).contains(&self.addition_prob) {
            return Err(DrillError::Configuration(format!(
                "addition_prob must lie in [0, 1], got {}",
                self.addition_prob
            )));
        }
        if self.num_digits < 1 {
            return Err(DrillError::Configuration(
                "num_digits must be at least 1".to_string(),
            ));
        }
        if self.num_digits > MAX_NUM_DIGITS {
            return Err(DrillError::Configuration(format!(
                "num_digits must be at most {}, got {}",
                MAX_NUM_DIGITS, self.num_digits
            )));
        }
        if self.num_operands < 2 {
            return Err(DrillError::Configuration(format!(
                "num_operands must be at least 2, got {}",
                self.num_operands
            )));
        }
        Ok(())
    }
}

/// Probabilities steering fresh generation versus historical replay
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Probability of generating a brand-new problem
    pub new_problem_prob: f64,
    /// Probability of replaying a previously incorrect problem
    pub previous_incorrect_prob: f64,
    /// Probability of replaying a previously slow problem
    pub previous_slow_prob: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            new_problem_prob: 0.5,
            previous_incorrect_prob: 0.4,
            previous_slow_prob: 0.1,
        }
    }
}

impl SelectionConfig {
    /// The three probabilities must be non-negative and sum to 1.0
    pub fn validate(&self) -> DrillResult<()> {
        let parts = [
            ("new_problem_prob", self.new_problem_prob),
            ("previous_incorrect_prob", self.previous_incorrect_prob),
            ("previous_slow_prob", self.previous_slow_prob),
        ];
        for (name, value) in parts {
            if !value.is_finite() || value < 0.0 {
                return Err(DrillError::Configuration(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        let total =
            self.new_problem_prob + self.previous_incorrect_prob + self.previous_slow_prob;
        if (total - 1.0).abs() > CONFIG_TOLERANCE {
            return Err(DrillError::Configuration(format!(
                "problem selection probabilities must sum to 1.0, got {}",
                total
            )));
        }
        Ok(())
    }
}

// ==================== Problems ====================

/// An ordered list of signed operands whose sum is the expected answer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Operands in presentation order
    pub operands: Vec<i64>,
}

impl Problem {
    pub fn new(operands: Vec<i64>) -> Self {
        Self { operands }
    }

    /// The correct answer: the sum of all operands
    pub fn answer(&self) -> i64 {
        self.operands.iter().sum()
    }

    /// Check a submitted response against the correct answer
    pub fn check(&self, response: i64) -> bool {
        response == self.answer()
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self.operands.iter().map(|&op| format_operand(op)).collect();
        let width = rows.iter().map(String::len).max().unwrap_or(0);
        for row in &rows {
            writeln!(f, "{}", row)?;
        }
        write!(f, "{}", "-".repeat(width))
    }
}

/// Format an operand as an explicitly signed, comma-grouped, right-aligned row
pub fn format_operand(operand: i64) -> String {
    let sign = if operand < 0 { '-' } else { '+' };
    let digits = operand.unsigned_abs().to_string();

    let mut formatted = String::with_capacity(OPERAND_WIDTH.max(digits.len() + 4));
    formatted.push(sign);
    for (offset, ch) in digits.chars().enumerate() {
        if offset > 0 && (digits.len() - offset) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(ch);
    }

    format!("{:>width$}", formatted, width = OPERAND_WIDTH)
}

/// Where a served problem came from
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Provenance {
    /// Freshly generated by the mixed problem generator
    Fresh,
    /// Replay of a problem previously answered incorrectly
    ReplayIncorrect { date: NaiveDate },
    /// Replay of a problem previously answered slowly
    ReplaySlow {
        date: NaiveDate,
        max_response_secs: f64,
    },
}

// ==================== Attempt History ====================

/// How a problem's operands were shown to the learner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationStyle {
    Abacus,
    Arabic,
    Verbal,
}

impl PresentationStyle {
    /// Stable tag used in persisted attempt records
    pub fn name(&self) -> &'static str {
        match self {
            PresentationStyle::Abacus => "ABACUS",
            PresentationStyle::Arabic => "ARABIC",
            PresentationStyle::Verbal => "VERBAL",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "ABACUS" => Some(PresentationStyle::Abacus),
            "ARABIC" => Some(PresentationStyle::Arabic),
            "VERBAL" => Some(PresentationStyle::Verbal),
            _ => None,
        }
    }
}

/// One answered problem, as persisted in the per-day history log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// Operands presented, in order
    pub operands: Vec<i64>,
    /// Time to answer, in seconds
    pub response_time_secs: f64,
    /// Answer the learner submitted
    pub response: i64,
    /// Whether the submitted answer was correct
    pub is_correct: bool,
    /// When the answer was submitted
    pub timestamp: NaiveDateTime,
    /// How the problem was presented
    pub style: PresentationStyle,
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    // ============ GeneratorConfig tests ============

    #[test]
    fn test_generator_config_default_is_valid() {
        assert!(GeneratorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_generator_config_rejects_bad_addition_prob() {
        let mut config = GeneratorConfig::default();
        config.addition_prob = 1.5;
        assert!(config.validate().is_err());

        config.addition_prob = -0.1;
        assert!(config.validate().is_err());

        config.addition_prob = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generator_config_rejects_bad_shape() {
        let mut config = GeneratorConfig::default();
        config.num_digits = 0;
        assert!(config.validate().is_err());

        config = GeneratorConfig::default();
        config.num_digits = MAX_NUM_DIGITS + 1;
        assert!(config.validate().is_err());

        config = GeneratorConfig::default();
        config.num_operands = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generator_config_boundary_values() {
        let config = GeneratorConfig {
            addition_prob: 0.0,
            num_digits: 1,
            num_operands: 2,
        };
        assert!(config.validate().is_ok());

        let config = GeneratorConfig {
            addition_prob: 1.0,
            num_digits: MAX_NUM_DIGITS,
            num_operands: 100,
        };
        assert!(config.validate().is_ok());
    }

    // ============ SelectionConfig tests ============

    #[test]
    fn test_selection_config_default_is_valid() {
        assert!(SelectionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_selection_config_rejects_bad_sum() {
        let config = SelectionConfig {
            new_problem_prob: 0.5,
            previous_incorrect_prob: 0.4,
            previous_slow_prob: 0.2,
        };
        assert!(config.validate().is_err(), "sum 1.1 should be rejected");
    }

    #[test]
    fn test_selection_config_rejects_negative() {
        let config = SelectionConfig {
            new_problem_prob: 1.2,
            previous_incorrect_prob: -0.2,
            previous_slow_prob: 0.0,
        };
        assert!(config.validate().is_err(), "negative slice should be rejected");
    }

    #[test]
    fn test_selection_config_degenerate_slices() {
        let config = SelectionConfig {
            new_problem_prob: 1.0,
            previous_incorrect_prob: 0.0,
            previous_slow_prob: 0.0,
        };
        assert!(config.validate().is_ok());
    }

    // ============ Problem tests ============

    #[test]
    fn test_problem_answer_and_check() {
        let problem = Problem::new(vec![100, -40, 7]);
        assert_eq!(problem.answer(), 67);
        assert!(problem.check(67));
        assert!(!problem.check(66));
    }

    #[test]
    fn test_problem_display_layout() {
        let problem = Problem::new(vec![1234567, -40]);
        let rendered = problem.to_string();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "+1,234,567");
        assert_eq!(lines[1], "       -40");
        assert_eq!(lines[2], "----------");
    }

    // ============ format_operand tests ============

    #[test]
    fn test_format_operand_grouping() {
        assert_eq!(format_operand(0), "        +0");
        assert_eq!(format_operand(999), "      +999");
        assert_eq!(format_operand(1000), "    +1,000");
        assert_eq!(format_operand(-1234567), "-1,234,567");
    }

    #[test]
    fn test_format_operand_wide_values_keep_grouping() {
        assert_eq!(format_operand(1_234_567_890), "+1,234,567,890");
    }

    // ============ PresentationStyle tests ============

    #[test]
    fn test_presentation_style_names_round_trip() {
        for style in [
            PresentationStyle::Abacus,
            PresentationStyle::Arabic,
            PresentationStyle::Verbal,
        ] {
            assert_eq!(PresentationStyle::from_name(style.name()), Some(style));
        }
    }

    #[test]
    fn test_presentation_style_from_name_case_insensitive() {
        assert_eq!(
            PresentationStyle::from_name("arabic"),
            Some(PresentationStyle::Arabic)
        );
        assert_eq!(PresentationStyle::from_name("spoken"), None);
        assert_eq!(PresentationStyle::from_name(""), None);
    }

    // ============ Serialization tests ============

    #[test]
    fn test_attempt_record_json_round_trip() {
        let record = AttemptRecord {
            operands: vec![513220, -70683],
            response_time_secs: 12.5,
            response: 442537,
            is_correct: true,
            timestamp: NaiveDate::from_ymd_opt(2024, 3, 1)
                .expect("valid date")
                .and_hms_opt(19, 22, 5)
                .expect("valid time"),
            style: PresentationStyle::Verbal,
        };

        let json = serde_json::to_string(&record).expect("serializable");
        let back: AttemptRecord = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, record);
    }

    #[test]
    fn test_provenance_json_round_trip() {
        let provenance = Provenance::ReplaySlow {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date"),
            max_response_secs: 31.5,
        };

        let json = serde_json::to_string(&provenance).expect("serializable");
        let back: Provenance = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, provenance);
    }
}
