//! Adaptive Problem Selector
//!
//! Decides, per drill round, whether to serve a freshly generated problem or
//! to replay one from history. Replays prefer problems previously answered
//! incorrectly; otherwise one is drawn with probability proportional to the
//! slowest recorded response for that problem, so practice time concentrates
//! where the learner struggled. Unusable history days are retried a bounded
//! number of times before the call fails.

use rand::distributions::{Distribution, WeightedIndex};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use chrono::NaiveDate;

use crate::error::{DrillError, DrillResult};
use crate::generator::MixedProblemGenerator;
use crate::history::HistoryStore;
use crate::types::{Problem, Provenance, SelectionConfig};

/// One served problem plus where it came from
#[derive(Clone, Debug, PartialEq)]
pub struct ProblemSelection {
    pub problem: Problem,
    pub provenance: Provenance,
}

/// Pull-based problem source mixing fresh generation with history replay.
///
/// The session-date snapshot is taken at construction; rebuild the selector
/// to pick up days recorded since.
pub struct AdaptiveSelector<H: HistoryStore> {
    generator: MixedProblemGenerator,
    config: SelectionConfig,
    history: H,
    dates: Vec<NaiveDate>,
    rng: ChaCha8Rng,
}

impl<H: HistoryStore> AdaptiveSelector<H> {
    /// Create a selector with an entropy-seeded rng
    pub fn new(
        generator: MixedProblemGenerator,
        config: SelectionConfig,
        history: H,
    ) -> DrillResult<Self> {
        Self::build(generator, config, history, None)
    }

    /// Create a selector with a fixed seed, for reproducibility
    pub fn with_seed(
        generator: MixedProblemGenerator,
        config: SelectionConfig,
        history: H,
        seed: u64,
    ) -> DrillResult<Self> {
        Self::build(generator, config, history, Some(seed))
    }

    fn build(
        generator: MixedProblemGenerator,
        config: SelectionConfig,
        history: H,
        seed: Option<u64>,
    ) -> DrillResult<Self> {
        config.validate()?;
        let dates = history.session_dates()?;
        debug!(sessions = dates.len(), "loaded history snapshot");

        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };

        Ok(Self {
            generator,
            config,
            history,
            dates,
            rng,
        })
    }

    /// Session dates visible to this selector
    pub fn session_dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Produce the next problem to present.
    ///
    /// Days whose history cannot be used (unreadable, corrupt, empty, or
    /// without a positive replay weight) are skipped with a fresh random
    /// draw; once as many days have failed as the snapshot holds, the call
    /// escalates to a fatal `CorruptHistory`.
    pub fn next_problem(&mut self) -> DrillResult<ProblemSelection> {
        let retry_budget = self.dates.len().max(1);
        let mut failures = 0;

        loop {
            let draw: f64 = self.rng.gen();

            if self.dates.is_empty() || draw < self.config.new_problem_prob {
                let problem = self.generator.generate();
                return Ok(ProblemSelection {
                    problem,
                    provenance: Provenance::Fresh,
                });
            }

            let date = self.dates[self.rng.gen_range(0..self.dates.len())];
            match self.replay_from(date, draw) {
                Ok(Some(selection)) => return Ok(selection),
                Ok(None) => {
                    debug!(date = %date, "no replayable history for day");
                }
                Err(DrillError::CorruptHistory(reason)) => {
                    warn!(date = %date, %reason, "skipping unusable session history");
                }
                Err(DrillError::Io(err)) => {
                    warn!(date = %date, error = %err, "skipping unreadable session history");
                }
                Err(other) => return Err(other),
            }

            failures += 1;
            if failures >= retry_budget {
                return Err(DrillError::CorruptHistory(format!(
                    "no usable history found after {} attempts",
                    failures
                )));
            }
        }
    }

    /// Try to replay a problem from one day's records. `Ok(None)` means the
    /// day held nothing replayable and the caller should redraw.
    fn replay_from(&mut self, date: NaiveDate, draw: f64) -> DrillResult<Option<ProblemSelection>> {
        let records = self.history.read_records(date)?;
        if records.is_empty() {
            return Ok(None);
        }

        let incorrect: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| !record.is_correct)
            .map(|(i, _)| i)
            .collect();

        let in_incorrect_slice =
            draw - self.config.new_problem_prob < self.config.previous_incorrect_prob;
        if in_incorrect_slice && !incorrect.is_empty() {
            let pick = incorrect[self.rng.gen_range(0..incorrect.len())];
            let operands = records[pick].operands.clone();
            info!(date = %date, "replaying previously incorrect problem");
            return Ok(Some(ProblemSelection {
                problem: Problem::new(operands),
                provenance: Provenance::ReplayIncorrect { date },
            }));
        }

        // Weight each distinct problem by its slowest recorded response
        let mut groups: BTreeMap<Vec<i64>, f64> = BTreeMap::new();
        for record in &records {
            groups
                .entry(record.operands.clone())
                .and_modify(|slowest| *slowest = slowest.max(record.response_time_secs))
                .or_insert(record.response_time_secs);
        }

        let (problems, weights): (Vec<Vec<i64>>, Vec<f64>) = groups.into_iter().unzip();
        let sampler = match WeightedIndex::new(&weights) {
            Ok(sampler) => sampler,
            // No positive weight to draw from; let the caller redraw
            Err(_) => return Ok(None),
        };

        let pick = sampler.sample(&mut self.rng);
        let max_response_secs = weights[pick];
        info!(
            date = %date,
            seconds = max_response_secs,
            "replaying slow-response problem"
        );
        Ok(Some(ProblemSelection {
            problem: Problem::new(problems[pick].clone()),
            provenance: Provenance::ReplaySlow {
                date,
                max_response_secs,
            },
        }))
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttemptRecord, GeneratorConfig, PresentationStyle};
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    /// In-memory history for selector tests
    struct MemoryHistory {
        days: BTreeMap<NaiveDate, Vec<AttemptRecord>>,
        poisoned: bool,
    }

    impl MemoryHistory {
        fn empty() -> Self {
            Self {
                days: BTreeMap::new(),
                poisoned: false,
            }
        }

        fn with_day(date: NaiveDate, records: Vec<AttemptRecord>) -> Self {
            let mut days = BTreeMap::new();
            days.insert(date, records);
            Self {
                days,
                poisoned: false,
            }
        }

        fn poisoned(dates: &[NaiveDate]) -> Self {
            let mut days = BTreeMap::new();
            for &date in dates {
                days.insert(date, Vec::new());
            }
            Self {
                days,
                poisoned: true,
            }
        }
    }

    impl HistoryStore for MemoryHistory {
        fn session_dates(&self) -> DrillResult<Vec<NaiveDate>> {
            Ok(self.days.keys().copied().collect())
        }

        fn read_records(&self, date: NaiveDate) -> DrillResult<Vec<AttemptRecord>> {
            if self.poisoned {
                return Err(DrillError::CorruptHistory("poisoned test day".to_string()));
            }
            Ok(self.days.get(&date).cloned().unwrap_or_default())
        }
    }

    fn record(operands: Vec<i64>, response_time_secs: f64, is_correct: bool) -> AttemptRecord {
        let timestamp = NaiveDate::from_ymd_opt(2024, 3, 1)
            .expect("valid date")
            .and_hms_opt(9, 0, 0)
            .expect("valid time");
        let response: i64 = operands.iter().sum();
        AttemptRecord {
            operands,
            response_time_secs,
            response,
            is_correct,
            timestamp,
            style: PresentationStyle::Arabic,
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).expect("valid date")
    }

    fn generator(seed: u64) -> MixedProblemGenerator {
        MixedProblemGenerator::with_seed(GeneratorConfig::default(), seed)
            .expect("valid generator")
    }

    fn config(fresh: f64, incorrect: f64, slow: f64) -> SelectionConfig {
        SelectionConfig {
            new_problem_prob: fresh,
            previous_incorrect_prob: incorrect,
            previous_slow_prob: slow,
        }
    }

    // ============ Branch selection ============

    #[test]
    fn test_always_fresh_ignores_history() {
        let history = MemoryHistory::with_day(
            day(),
            vec![record(vec![100, -40], 9.0, false)],
        );
        let mut selector =
            AdaptiveSelector::with_seed(generator(1), config(1.0, 0.0, 0.0), history, 5)
                .expect("valid selector");

        for _ in 0..100 {
            let selection = selector.next_problem().expect("selectable");
            assert_eq!(selection.provenance, Provenance::Fresh);
        }
    }

    #[test]
    fn test_no_history_always_fresh() {
        let mut selector = AdaptiveSelector::with_seed(
            generator(2),
            // Even a replay-only configuration must fall back to generation
            config(0.0, 1.0, 0.0),
            MemoryHistory::empty(),
            5,
        )
        .expect("valid selector");

        for _ in 0..20 {
            let selection = selector.next_problem().expect("selectable");
            assert_eq!(selection.provenance, Provenance::Fresh);
        }
    }

    #[test]
    fn test_incorrect_replay_is_deterministic() {
        let history = MemoryHistory::with_day(
            day(),
            vec![record(vec![100, -40], 3.0, false)],
        );
        let mut selector =
            AdaptiveSelector::with_seed(generator(3), config(0.0, 1.0, 0.0), history, 99)
                .expect("valid selector");

        for _ in 0..20 {
            let selection = selector.next_problem().expect("selectable");
            assert_eq!(selection.problem.operands, vec![100, -40]);
            assert_eq!(
                selection.provenance,
                Provenance::ReplayIncorrect { date: day() }
            );
        }
    }

    #[test]
    fn test_incorrect_slice_falls_through_without_incorrect_records() {
        // Only correct records: the incorrect slice must hand over to the
        // slow-response branch.
        let history = MemoryHistory::with_day(
            day(),
            vec![
                record(vec![10, 20], 2.0, true),
                record(vec![30, 40], 8.0, true),
            ],
        );
        let mut selector =
            AdaptiveSelector::with_seed(generator(4), config(0.0, 1.0, 0.0), history, 7)
                .expect("valid selector");

        for _ in 0..20 {
            let selection = selector.next_problem().expect("selectable");
            assert!(
                matches!(selection.provenance, Provenance::ReplaySlow { .. }),
                "expected slow replay, got {:?}",
                selection.provenance
            );
        }
    }

    #[test]
    fn test_slow_replay_prefers_slow_problems() {
        let history = MemoryHistory::with_day(
            day(),
            vec![
                record(vec![1, 2], 0.5, true),
                record(vec![3, 4], 49.5, true),
            ],
        );
        let mut selector =
            AdaptiveSelector::with_seed(generator(5), config(0.0, 0.0, 1.0), history, 17)
                .expect("valid selector");

        let mut slow_hits = 0;
        for _ in 0..200 {
            let selection = selector.next_problem().expect("selectable");
            if selection.problem.operands == vec![3, 4] {
                slow_hits += 1;
            }
        }
        // 99:1 weighting should dominate
        assert!(
            slow_hits > 180,
            "slow problem picked only {} of 200 times",
            slow_hits
        );
    }

    #[test]
    fn test_slow_replay_uses_group_maximum() {
        // The same problem answered fast and slow counts by its slowest time
        let history = MemoryHistory::with_day(
            day(),
            vec![
                record(vec![7, 8], 1.0, true),
                record(vec![7, 8], 60.0, true),
            ],
        );
        let mut selector =
            AdaptiveSelector::with_seed(generator(6), config(0.0, 0.0, 1.0), history, 23)
                .expect("valid selector");

        let selection = selector.next_problem().expect("selectable");
        assert_eq!(
            selection.provenance,
            Provenance::ReplaySlow {
                date: day(),
                max_response_secs: 60.0
            }
        );
    }

    // ============ Retry and failure behavior ============

    #[test]
    fn test_corrupt_history_escalates_after_bounded_retries() {
        let dates = [day()];
        let mut selector = AdaptiveSelector::with_seed(
            generator(7),
            config(0.0, 0.5, 0.5),
            MemoryHistory::poisoned(&dates),
            31,
        )
        .expect("valid selector");

        assert!(matches!(
            selector.next_problem(),
            Err(DrillError::CorruptHistory(_))
        ));
    }

    #[test]
    fn test_empty_days_escalate_when_replay_only() {
        let history = MemoryHistory::with_day(day(), Vec::new());
        let mut selector =
            AdaptiveSelector::with_seed(generator(8), config(0.0, 0.5, 0.5), history, 37)
                .expect("valid selector");

        assert!(matches!(
            selector.next_problem(),
            Err(DrillError::CorruptHistory(_))
        ));
    }

    #[test]
    fn test_fresh_draws_survive_corrupt_history() {
        // With a fresh slice available the selector keeps making progress
        // even though every history day is poisoned.
        let dates = [day()];
        let mut selector = AdaptiveSelector::with_seed(
            generator(9),
            config(0.5, 0.25, 0.25),
            MemoryHistory::poisoned(&dates),
            41,
        )
        .expect("valid selector");

        let mut fresh = 0;
        for _ in 0..50 {
            match selector.next_problem() {
                Ok(selection) => {
                    assert_eq!(selection.provenance, Provenance::Fresh);
                    fresh += 1;
                }
                Err(DrillError::CorruptHistory(_)) => {}
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert!(fresh > 0, "some calls should land in the fresh slice");
    }

    #[test]
    fn test_zero_weight_groups_are_not_replayable() {
        let history = MemoryHistory::with_day(
            day(),
            vec![record(vec![5, 6], 0.0, true)],
        );
        let mut selector =
            AdaptiveSelector::with_seed(generator(10), config(0.0, 0.0, 1.0), history, 43)
                .expect("valid selector");

        assert!(matches!(
            selector.next_problem(),
            Err(DrillError::CorruptHistory(_))
        ));
    }

    #[test]
    fn test_invalid_selection_config_rejected_at_construction() {
        let result = AdaptiveSelector::with_seed(
            generator(11),
            config(0.6, 0.6, 0.0),
            MemoryHistory::empty(),
            47,
        );
        assert!(matches!(result, Err(DrillError::Configuration(_))));
    }

    #[test]
    fn test_seeded_selectors_replay_identically() {
        let history_a = MemoryHistory::with_day(
            day(),
            vec![
                record(vec![1, 2], 5.0, false),
                record(vec![3, 4], 9.0, true),
            ],
        );
        let history_b = MemoryHistory::with_day(
            day(),
            vec![
                record(vec![1, 2], 5.0, false),
                record(vec![3, 4], 9.0, true),
            ],
        );

        let mut a =
            AdaptiveSelector::with_seed(generator(12), config(0.4, 0.3, 0.3), history_a, 53)
                .expect("valid selector");
        let mut b =
            AdaptiveSelector::with_seed(generator(12), config(0.4, 0.3, 0.3), history_b, 53)
                .expect("valid selector");

        for _ in 0..30 {
            let sa = a.next_problem().expect("selectable");
            let sb = b.next_problem().expect("selectable");
            assert_eq!(sa, sb);
        }
    }
}
