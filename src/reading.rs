//! Number Reading Drill
//!
//! Flash-recognition practice: a random n-digit number is shown for a short
//! interval and the learner reproduces its digits from memory. The interval
//! adapts multiplicatively, shrinking on success and growing on failure, so
//! it settles near the learner's recognition threshold. Outcomes append to
//! their own per-day log files.

use chrono::NaiveDateTime;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::bead::digitize;
use crate::error::{DrillError, DrillResult};
use crate::history::FILE_DATE_FORMAT;

/// File suffix for the reading drill history
pub const READING_SUFFIX: &str = "_abacus_reading.dat";

/// Flash interval multiplier after a correct answer
const FLASH_SPEEDUP: f64 = 0.95;

/// Flash interval multiplier after an incorrect answer
const FLASH_SLOWDOWN: f64 = 1.1;

/// Timestamp format inside reading log rows
const READING_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Reading drill parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ReadingConfig {
    /// Number of digits in each flashed number
    pub num_digits: usize,
    /// Initial flash interval in seconds
    pub flash_secs: f64,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            num_digits: 5,
            flash_secs: 1.0,
        }
    }
}

impl ReadingConfig {
    pub fn validate(&self) -> DrillResult<()> {
        if !(1..=9).contains(&self.num_digits) {
            return Err(DrillError::Configuration(format!(
                "num_digits must lie in [1, 9], got {}",
                self.num_digits
            )));
        }
        if !self.flash_secs.is_finite() || self.flash_secs <= 0.0 {
            return Err(DrillError::Configuration(format!(
                "flash_secs must be positive, got {}",
                self.flash_secs
            )));
        }
        Ok(())
    }
}

/// Flash-recognition drill state: number source plus adaptive interval
pub struct ReadingDrill {
    config: ReadingConfig,
    flash_secs: f64,
    rng: ChaCha8Rng,
}

impl ReadingDrill {
    pub fn new(config: ReadingConfig) -> DrillResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            flash_secs: config.flash_secs,
            rng: ChaCha8Rng::from_entropy(),
        })
    }

    pub fn with_seed(config: ReadingConfig, seed: u64) -> DrillResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            flash_secs: config.flash_secs,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    pub fn config(&self) -> &ReadingConfig {
        &self.config
    }

    /// Current flash interval in seconds
    pub fn flash_secs(&self) -> f64 {
        self.flash_secs
    }

    /// Draw the next number to flash: uniform over all values with exactly
    /// the configured digit count.
    pub fn next_number(&mut self) -> u64 {
        let low = 10u64.pow(self.config.num_digits as u32 - 1);
        let high = 10u64.pow(self.config.num_digits as u32);
        self.rng.gen_range(low..high)
    }

    /// Compare an entered digit sequence against the flashed number
    pub fn check(&self, entered_digits: &[u8], number: u64) -> bool {
        entered_digits == digitize(number)
    }

    /// Adapt the flash interval to the outcome: quicker after a success,
    /// slower after a miss.
    pub fn record_outcome(&mut self, is_correct: bool) {
        if is_correct {
            self.flash_secs *= FLASH_SPEEDUP;
        } else {
            self.flash_secs *= FLASH_SLOWDOWN;
        }
        debug!(flash_secs = self.flash_secs, "adapted flash interval");
    }
}

/// One flashed number and its outcome, as persisted in the reading log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReadingAttempt {
    /// When the answer was submitted
    pub timestamp: NaiveDateTime,
    /// The number that was flashed
    pub number: u64,
    /// The number the learner reproduced
    pub response: u64,
    /// Flash interval used for this attempt, in seconds
    pub flash_secs: f64,
    /// Whether the reproduction matched
    pub is_correct: bool,
}

/// Append-only per-day log for reading drill outcomes
#[derive(Clone, Debug)]
pub struct ReadingLog {
    dir: PathBuf,
}

impl ReadingLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one attempt to its day's file
    pub fn append(&self, attempt: &ReadingAttempt) -> DrillResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!(
            "{}{}",
            attempt.timestamp.date().format(FILE_DATE_FORMAT),
            READING_SUFFIX
        ));

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(
            file,
            "{},{},{},{:.3},{}",
            attempt.timestamp.format(READING_TIMESTAMP_FORMAT),
            attempt.number,
            attempt.response,
            attempt.flash_secs,
            attempt.is_correct
        )?;
        Ok(())
    }
}

// ==================== Tests ====================
