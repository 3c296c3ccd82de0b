// Library root for the session and scoring core: roster, sessions, feedback
// records, aggregation, CSV export and the live-notification seam.

pub mod aggregate;
pub mod criteria;
pub mod export;
pub mod notify;
pub mod store;

pub use aggregate::ParticipantAggregate;
pub use criteria::{Criterion, CriterionKind, RawRatings, ScoreCard, Submission};
pub use export::{ExportError, ExportMode};
pub use notify::{LiveEvent, Notifier, NullNotifier, RecordingNotifier};
pub use store::{ActiveSession, FeedbackRecord, NextStep, SessionId, Store};
