//! Summary numbers for the study set dashboard.
//!
//! Two policies exist for folding the append-only progress history into an
//! overall percentage and a mastered count. They disagree on the same input,
//! so callers choose one explicitly.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ProgressRecord, StudyMode, TermId};

/// Per-session score ratio at which every term of the set counts as mastered
/// under `AggregationPolicy::SumAllRecords`, as a fraction `NUM / DEN`.
const MASTERY_THRESHOLD_NUM: u64 = 4;
const MASTERY_THRESHOLD_DEN: u64 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown aggregation policy: {raw} (expected `all-records` or `latest-per-mode`)")]
pub struct ParsePolicyError {
    raw: String,
}

/// How the progress history is folded into dashboard numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationPolicy {
    /// Average every record ever submitted; a session at or above 80% marks
    /// all of the set's terms as mastered.
    SumAllRecords,
    /// Only the newest record of each mode counts; `mastered` is the best of
    /// those scores.
    #[default]
    LatestPerMode,
}

impl AggregationPolicy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationPolicy::SumAllRecords => "all-records",
            AggregationPolicy::LatestPerMode => "latest-per-mode",
        }
    }
}

impl fmt::Display for AggregationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all-records" | "sum-all-records" | "a" => Ok(AggregationPolicy::SumAllRecords),
            "latest-per-mode" | "latest" | "b" => Ok(AggregationPolicy::LatestPerMode),
            _ => Err(ParsePolicyError { raw: s.to_owned() }),
        }
    }
}

/// Dashboard numbers for one study set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Overall progress, 0..=100.
    pub overall: u32,
    /// Mastered term count.
    pub mastered: u32,
}

/// Pure fold over a snapshot of progress records.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressAggregator {
    policy: AggregationPolicy,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(policy: AggregationPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> AggregationPolicy {
        self.policy
    }

    /// Computes the summary for a set with the given terms.
    ///
    /// An empty term list or an empty history yields the zero summary.
    #[must_use]
    pub fn aggregate(&self, term_ids: &[TermId], records: &[ProgressRecord]) -> ProgressSummary {
        let terms: HashSet<TermId> = term_ids.iter().copied().collect();
        if terms.is_empty() || records.is_empty() {
            return ProgressSummary::default();
        }

        match self.policy {
            AggregationPolicy::SumAllRecords => sum_all_records(&terms, records),
            AggregationPolicy::LatestPerMode => latest_per_mode(terms.len(), records),
        }
    }
}

fn sum_all_records(terms: &HashSet<TermId>, records: &[ProgressRecord]) -> ProgressSummary {
    let term_count = terms.len() as u64;
    let total: u64 = records.iter().map(|r| u64::from(r.score())).sum();
    let overall = rounded_percent(total, term_count * records.len() as u64);

    // Every qualifying session covers the whole set, so the union is either
    // empty or all of `terms`.
    let mut mastered: HashSet<TermId> = HashSet::new();
    for record in records {
        let qualifies =
            u64::from(record.score()) * MASTERY_THRESHOLD_DEN >= term_count * MASTERY_THRESHOLD_NUM;
        if qualifies {
            mastered.extend(terms.iter().copied());
        }
    }

    ProgressSummary {
        overall,
        mastered: saturating_u32(mastered.len() as u64),
    }
}

fn latest_per_mode(term_count: usize, records: &[ProgressRecord]) -> ProgressSummary {
    let mut latest: HashMap<StudyMode, &ProgressRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.mode())
            .and_modify(|current| {
                if (record.created_at(), record.id()) > (current.created_at(), current.id()) {
                    *current = record;
                }
            })
            .or_insert(record);
    }

    let total: u64 = latest.values().map(|r| u64::from(r.score())).sum();
    let overall = rounded_percent(total, term_count as u64 * latest.len() as u64);
    let mastered = latest.values().map(|r| r.score()).max().unwrap_or(0);

    ProgressSummary { overall, mastered }
}

/// `round(100 * numerator / denominator)` with halves rounded up, clamped to
/// 100. A zero denominator yields 0.
fn rounded_percent(numerator: u64, denominator: u64) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let scaled = numerator.saturating_mul(200).saturating_add(denominator) / (2 * denominator);
    saturating_u32(scaled.min(100))
}

fn saturating_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProgressDraft, ProgressId, StudySetId};
    use crate::time::fixed_now;
    use chrono::Duration;
    use proptest::prelude::*;

    fn terms(n: u64) -> Vec<TermId> {
        (1..=n).map(TermId::new).collect()
    }

    fn record(id: u64, mode: StudyMode, score: u32, minutes: i64) -> ProgressRecord {
        ProgressDraft::new(
            "anonymous",
            StudySetId::new(1),
            mode,
            score,
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap()
        .assign_id(ProgressId::new(id))
    }

    #[test]
    fn latest_per_mode_scenario() {
        let records = vec![
            record(1, StudyMode::Quiz, 4, 1),
            record(2, StudyMode::Quiz, 5, 2),
            record(3, StudyMode::Write, 3, 3),
        ];
        let summary =
            ProgressAggregator::new(AggregationPolicy::LatestPerMode).aggregate(&terms(5), &records);
        assert_eq!(summary, ProgressSummary { overall: 80, mastered: 5 });
    }

    #[test]
    fn latest_is_chosen_by_time_not_input_order() {
        let records = vec![
            record(2, StudyMode::Quiz, 5, 10),
            record(1, StudyMode::Quiz, 1, 0),
        ];
        let summary =
            ProgressAggregator::new(AggregationPolicy::LatestPerMode).aggregate(&terms(5), &records);
        assert_eq!(summary, ProgressSummary { overall: 100, mastered: 5 });
    }

    #[test]
    fn latest_ties_break_on_larger_id() {
        let records = vec![
            record(7, StudyMode::Test, 2, 0),
            record(3, StudyMode::Test, 4, 0),
        ];
        let summary =
            ProgressAggregator::new(AggregationPolicy::LatestPerMode).aggregate(&terms(4), &records);
        assert_eq!(summary, ProgressSummary { overall: 50, mastered: 2 });
    }

    #[test]
    fn sum_all_records_averages_history() {
        let records = vec![
            record(1, StudyMode::Quiz, 4, 1),
            record(2, StudyMode::Quiz, 5, 2),
            record(3, StudyMode::Write, 3, 3),
        ];
        let summary =
            ProgressAggregator::new(AggregationPolicy::SumAllRecords).aggregate(&terms(5), &records);
        // 12 / 15 = 80%; sessions scoring 4/5 and 5/5 reach the threshold.
        assert_eq!(summary, ProgressSummary { overall: 80, mastered: 5 });
    }

    #[test]
    fn sum_all_records_below_threshold_masters_nothing() {
        let records = vec![record(1, StudyMode::Flashcard, 3, 0)];
        let summary =
            ProgressAggregator::new(AggregationPolicy::SumAllRecords).aggregate(&terms(5), &records);
        assert_eq!(summary, ProgressSummary { overall: 60, mastered: 0 });
    }

    #[test]
    fn sum_all_records_counts_distinct_terms() {
        let mut ids = terms(3);
        ids.push(TermId::new(1));
        let records = vec![record(1, StudyMode::Quiz, 3, 0)];
        let summary =
            ProgressAggregator::new(AggregationPolicy::SumAllRecords).aggregate(&ids, &records);
        assert_eq!(summary, ProgressSummary { overall: 100, mastered: 3 });
    }

    #[test]
    fn zero_terms_guard_division() {
        let records = vec![record(1, StudyMode::Quiz, 4, 0)];
        for policy in [AggregationPolicy::SumAllRecords, AggregationPolicy::LatestPerMode] {
            let summary = ProgressAggregator::new(policy).aggregate(&[], &records);
            assert_eq!(summary, ProgressSummary::default());
        }
    }

    #[test]
    fn rounding_is_half_up() {
        assert_eq!(rounded_percent(1, 8), 13); // 12.5
        assert_eq!(rounded_percent(1, 3), 33);
        assert_eq!(rounded_percent(2, 3), 67);
        assert_eq!(rounded_percent(9, 4), 100);
        assert_eq!(rounded_percent(3, 0), 0);
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!(
            "all-records".parse::<AggregationPolicy>().unwrap(),
            AggregationPolicy::SumAllRecords
        );
        assert_eq!(
            " Latest-Per-Mode ".parse::<AggregationPolicy>().unwrap(),
            AggregationPolicy::LatestPerMode
        );
        assert!("median".parse::<AggregationPolicy>().is_err());
        assert_eq!(AggregationPolicy::default(), AggregationPolicy::LatestPerMode);
    }

    fn mode_strategy() -> impl Strategy<Value = StudyMode> {
        prop_oneof![
            Just(StudyMode::Flashcard),
            Just(StudyMode::Quiz),
            Just(StudyMode::Write),
            Just(StudyMode::Test),
        ]
    }

    fn history_strategy(max_score: u32) -> impl Strategy<Value = Vec<ProgressRecord>> {
        proptest::collection::vec((mode_strategy(), 0..=max_score, 0i64..1_000), 0..20).prop_map(
            |rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (mode, score, minutes))| record(i as u64 + 1, mode, score, minutes))
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn empty_history_is_zero(term_count in 0u64..50, all in any::<bool>()) {
            let policy = if all {
                AggregationPolicy::SumAllRecords
            } else {
                AggregationPolicy::LatestPerMode
            };
            let summary = ProgressAggregator::new(policy).aggregate(&terms(term_count), &[]);
            prop_assert_eq!(summary, ProgressSummary::default());
        }

        #[test]
        fn perfect_session_never_lowers_overall(
            term_count in 1u64..30,
            history in history_strategy(30),
            mode in mode_strategy(),
        ) {
            let aggregator = ProgressAggregator::new(AggregationPolicy::SumAllRecords);
            let ids = terms(term_count);
            let before = aggregator.aggregate(&ids, &history);

            let mut extended = history.clone();
            let next_id = extended.len() as u64 + 1;
            extended.push(record(next_id, mode, term_count as u32, 2_000));
            let after = aggregator.aggregate(&ids, &extended);

            prop_assert!(after.overall >= before.overall);
        }

        #[test]
        fn overall_stays_in_percent_range(
            term_count in 1u64..30,
            history in history_strategy(60),
            all in any::<bool>(),
        ) {
            let policy = if all {
                AggregationPolicy::SumAllRecords
            } else {
                AggregationPolicy::LatestPerMode
            };
            let summary = ProgressAggregator::new(policy).aggregate(&terms(term_count), &history);
            prop_assert!(summary.overall <= 100);
        }
    }
}
