// Per-participant score aggregation.

use serde::Serialize;

use crate::criteria::{Criterion, ScoreCard};
use crate::store::FeedbackRecord;

/// Mean scores for one participant across all their submissions in a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantAggregate {
    pub participant: String,
    pub submissions: usize,
    /// Per-criterion means. `None` when no submission rated the criterion.
    pub means: ScoreCard,
    /// Mean of the defined per-criterion means.
    pub overall: Option<f64>,
}

/// Aggregate every record, preserving record order. Records with no
/// submissions are skipped.
pub fn aggregate_records(records: &[FeedbackRecord]) -> Vec<ParticipantAggregate> {
    records
        .iter()
        .filter(|r| !r.submissions.is_empty())
        .map(aggregate_one)
        .collect()
}

fn aggregate_one(record: &FeedbackRecord) -> ParticipantAggregate {
    let mut means = [None; Criterion::COUNT];
    for criterion in Criterion::ALL {
        means[criterion.index()] = mean(
            record
                .submissions
                .iter()
                .filter_map(|s| s.scores.get(criterion)),
        );
    }
    let overall = mean(means.iter().flatten().copied());

    ParticipantAggregate {
        participant: record.participant.clone(),
        submissions: record.submissions.len(),
        means: ScoreCard(means),
        overall,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
