// In-memory session and scoring store: roster, current session, and feedback
// records keyed by session token.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::{aggregate_records, ParticipantAggregate};
use crate::criteria::{RawRatings, Submission};
use crate::export::{self, ExportError, ExportMode};
use crate::notify::{LiveEvent, Notifier};

// ---------------------------------------------------------------------------
// Session identifiers
// ---------------------------------------------------------------------------

/// Opaque session token. Minted as a UUID v4 string, but any string received
/// from a client is accepted as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Mint a fresh random token.
    pub fn mint() -> Self {
        SessionId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

/// The currently active poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveSession {
    pub id: SessionId,
    pub started_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Feedback records
// ---------------------------------------------------------------------------

/// All submissions recorded for one participant within one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackRecord {
    pub participant: String,
    pub submissions: Vec<Submission>,
}

/// Where the feedback walk goes after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextStep {
    /// The next participant in roster order.
    Participant(String),
    /// The submitter was last in the roster (or not in it at all).
    Complete,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owns the roster, the current session pointer, and every feedback record.
///
/// Created once at process start and handed to the HTTP layer. Only
/// [`Store::reset`] clears it.
pub struct Store {
    roster: Vec<String>,
    current: Option<ActiveSession>,
    /// Records per session, in first-submission order within each session.
    records: HashMap<SessionId, Vec<FeedbackRecord>>,
    notifier: Arc<dyn Notifier>,
}

impl Store {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            roster: Vec::new(),
            current: None,
            records: HashMap::new(),
            notifier,
        }
    }

    pub fn roster(&self) -> &[String] {
        &self.roster
    }

    pub fn current_session(&self) -> Option<&ActiveSession> {
        self.current.as_ref()
    }

    /// Append comma-separated, trimmed names to the roster and return how many
    /// were added. Duplicates and empty pieces are kept; an empty input is a
    /// no-op.
    pub fn add_participants(&mut self, raw: &str) -> usize {
        if raw.is_empty() {
            return 0;
        }
        let before = self.roster.len();
        self.roster.extend(raw.split(',').map(|p| p.trim().to_string()));
        let added = self.roster.len() - before;
        info!("Added {added} participant(s); roster size is now {}", self.roster.len());
        added
    }

    /// Start a new poll if the roster is non-empty.
    ///
    /// Overwrites any current session. Records stored under the previous
    /// token remain retrievable by that token.
    pub fn start_poll(&mut self) -> Option<SessionId> {
        if self.roster.is_empty() {
            debug!("start_poll ignored: roster is empty");
            return None;
        }
        let id = SessionId::mint();
        if let Some(prev) = &self.current {
            info!("Replacing session {} with {id}", prev.id);
        } else {
            info!("Started session {id}");
        }
        self.current = Some(ActiveSession {
            id: id.clone(),
            started_at: Utc::now(),
        });
        Some(id)
    }

    /// Record one feedback form, notify the session's audience, and return
    /// the next step of the roster walk.
    ///
    /// Neither the session nor the participant is validated against the
    /// store: unknown participants still get a record.
    pub fn submit_feedback(
        &mut self,
        session: &SessionId,
        participant: &str,
        ratings: &RawRatings,
    ) -> NextStep {
        let unrecognized = ratings.unrecognized();
        if !unrecognized.is_empty() {
            let labels: Vec<&str> = unrecognized.iter().map(|c| c.label()).collect();
            warn!(
                "Feedback for {participant} in session {session} has unrated criteria: {}",
                labels.join(", ")
            );
        }

        let scores = ratings.score_card();
        let records = self.records.entry(session.clone()).or_default();
        match records.iter_mut().find(|r| r.participant == participant) {
            Some(record) => record.submissions.push(Submission::new(scores)),
            None => records.push(FeedbackRecord {
                participant: participant.to_string(),
                submissions: vec![Submission::new(scores)],
            }),
        }
        info!("Recorded feedback for {participant} in session {session}");

        self.notifier.notify(
            session,
            LiveEvent::NewFeedback {
                participant: participant.to_string(),
                feedback: scores,
            },
        );

        self.next_after(participant)
    }

    /// Roster successor of `participant`, using the first matching position.
    pub fn next_after(&self, participant: &str) -> NextStep {
        match self.roster.iter().position(|p| p == participant) {
            Some(idx) => match self.roster.get(idx + 1) {
                Some(next) => NextStep::Participant(next.clone()),
                None => NextStep::Complete,
            },
            None => {
                warn!("Participant {participant} is not on the roster; ending the walk");
                NextStep::Complete
            }
        }
    }

    /// Submissions recorded for one participant in one session.
    pub fn feedback_record(&self, session: &SessionId, participant: &str) -> Option<&FeedbackRecord> {
        self.records
            .get(session)?
            .iter()
            .find(|r| r.participant == participant)
    }

    /// All records for a session, in first-submission order. Empty for an
    /// unknown session.
    pub fn session_records(&self, session: &SessionId) -> &[FeedbackRecord] {
        self.records.get(session).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Per-participant means for a session. Recomputed on every call.
    pub fn aggregate(&self, session: &SessionId) -> Vec<ParticipantAggregate> {
        aggregate_records(self.session_records(session))
    }

    /// Render the session as CSV.
    pub fn export_csv(&self, session: &SessionId, mode: ExportMode) -> Result<String, ExportError> {
        match mode {
            ExportMode::Raw => export::raw_csv(self.session_records(session)),
            ExportMode::Aggregated => export::aggregated_csv(&self.aggregate(session)),
        }
    }

    /// Clear roster, current session and all records.
    pub fn reset(&mut self) {
        info!(
            "Resetting store ({} participant(s), {} session(s))",
            self.roster.len(),
            self.records.len()
        );
        self.roster.clear();
        self.current = None;
        self.records.clear();
    }
}
