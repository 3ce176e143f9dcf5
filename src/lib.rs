//! # zhusuan-algo - Adaptive Abacus Drill Algorithms
//!
//! Pure Rust algorithms for adaptive mental-arithmetic practice:
//!
//! - **Bead Operation Model** - atomic abacus bead motions and their effects
//! - **Transition Tables** - digit-pair combinatorics per bead operation
//! - **Probability Distributor** - operation emphasis to digit-pair tables
//! - **Mixed Problem Generator** - column-major multi-operand synthesis
//! - **Adaptive Selector** - fresh problems vs. history-weighted replay
//!
//! ## Design goals
//!
//! - **Pure Rust** - no UI, audio, or rendering dependencies; the crate is
//!   the engine behind a presentation layer
//! - **Deterministic when asked** - every sampling component owns a seedable
//!   rng, so drills replay exactly under test
//! - **Append-only history** - attempt logs are flat per-day files that are
//!   never rewritten
//!
//! ## Module structure
//!
//! - [`bead`] - bead operation value type and digit helpers
//! - [`transition`] - digit-pair transition tables per direction
//! - [`distribution`] - probability spreading and conditional views
//! - [`generator`] - mixed addition/subtraction problem generation
//! - [`selector`] - fresh-vs-replay selection against recorded history
//! - [`history`] - per-day attempt record store
//! - [`reading`] - flash-recognition drill with adaptive timing
//! - [`types`] - shared types and constants
//! - [`error`] - error enum and result alias
//!
//! ## Example
//!
//! ```rust
//! use zhusuan_algo::{GeneratorConfig, MixedProblemGenerator};
//!
//! let config = GeneratorConfig {
//!     addition_prob: 0.5,
//!     num_digits: 6,
//!     num_operands: 5,
//! };
//! let mut generator = MixedProblemGenerator::with_seed(config, 42)?;
//!
//! let problem = generator.generate();
//! assert_eq!(problem.operands.len(), 5);
//! assert!(problem.answer() >= 0);
//! # Ok::<(), zhusuan_algo::DrillError>(())
//! ```

// ============================================================================
// Module declarations
// ============================================================================

pub mod bead;
pub mod distribution;
pub mod error;
pub mod generator;
pub mod history;
pub mod reading;
pub mod selector;
pub mod transition;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export the bead operation model
pub use bead::{digit_to_beads, digitize, numerify, BeadOperation};

/// Re-export the probability distributor
pub use distribution::{digit_pair_prob, uniform_operation_freq, DigitPairProb};

/// Re-export the error types
pub use error::{DrillError, DrillResult};

/// Re-export the problem generator
pub use generator::MixedProblemGenerator;

/// Re-export the history store
pub use history::{FileHistoryStore, HistoryStore, DEFAULT_SUFFIX};

/// Re-export the reading drill
pub use reading::{ReadingAttempt, ReadingConfig, ReadingDrill, ReadingLog, READING_SUFFIX};

/// Re-export the adaptive selector
pub use selector::{AdaptiveSelector, ProblemSelection};

/// Re-export the transition tables
pub use transition::{Direction, TransitionTable};

/// Re-export all shared types
pub use types::*;
