// CSV export of a session's feedback, raw or aggregated.

use serde::Deserialize;

use crate::aggregate::ParticipantAggregate;
use crate::criteria::{Criterion, ScoreCard};
use crate::store::FeedbackRecord;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to flush CSV buffer: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Which rows the export contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// One row per submission.
    #[default]
    Raw,
    /// One row per participant, plus an overall score column.
    Aggregated,
}

pub const PARTICIPANT_HEADER: &str = "Participant";
pub const OVERALL_HEADER: &str = "Overall Score";

/// One row per submission, in record order then submission order.
pub fn raw_csv(records: &[FeedbackRecord]) -> Result<String, ExportError> {
    let mut wtr = writer();
    wtr.write_record(header(false))?;
    for record in records {
        for submission in &record.submissions {
            let mut row = vec![record.participant.clone()];
            row.extend(score_fields(&submission.scores));
            wtr.write_record(&row)?;
        }
    }
    finish(wtr)
}

/// One row per aggregated participant.
pub fn aggregated_csv(aggregates: &[ParticipantAggregate]) -> Result<String, ExportError> {
    let mut wtr = writer();
    wtr.write_record(header(true))?;
    for agg in aggregates {
        let mut row = vec![agg.participant.clone()];
        row.extend(score_fields(&agg.means));
        row.push(format_score(agg.overall));
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

/// Render a score for CSV: empty for unrated, shortest decimal otherwise
/// (`10`, `7.5`).
pub fn format_score(score: Option<f64>) -> String {
    score.map(|v| v.to_string()).unwrap_or_default()
}

fn header(with_overall: bool) -> Vec<&'static str> {
    let mut fields = vec![PARTICIPANT_HEADER];
    fields.extend(Criterion::ALL.iter().map(|c| c.label()));
    if with_overall {
        fields.push(OVERALL_HEADER);
    }
    fields
}

fn score_fields(card: &ScoreCard) -> impl Iterator<Item = String> + '_ {
    card.iter().map(|(_, score)| format_score(score))
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
