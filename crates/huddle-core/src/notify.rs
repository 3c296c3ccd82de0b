// Live-notification seam between the store and whatever delivers updates to
// connected admin views.

use std::sync::Mutex;

use serde::Serialize;

use crate::criteria::ScoreCard;
use crate::store::SessionId;

/// Events pushed to a session's audience.
///
/// Wire shape: `{"event": "new_feedback", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A participant's feedback was recorded. Scores are raw, not averaged.
    NewFeedback {
        participant: String,
        feedback: ScoreCard,
    },
    /// Informational message, e.g. someone joined the room.
    Status { msg: String },
}

impl LiveEvent {
    pub fn to_json(&self) -> String {
        // Serialization of these variants cannot fail: all keys are strings
        // and all values are plain data.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Fire-and-forget delivery of [`LiveEvent`]s to the audience of a session.
///
/// Implementations must not block and must silently drop events nobody is
/// listening for.
pub trait Notifier: Send + Sync {
    fn notify(&self, audience: &SessionId, event: LiveEvent);
}

/// Notifier that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _audience: &SessionId, _event: LiveEvent) {}
}

/// Notifier that keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(SessionId, LiveEvent)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events published so far.
    pub fn events(&self) -> Vec<(SessionId, LiveEvent)> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, audience: &SessionId, event: LiveEvent) {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push((audience.clone(), event));
    }
}
