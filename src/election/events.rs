use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::Phase;
use super::state::VoterId;

/// Notifications emitted by the engine, in the exact order of the triggering
/// calls. Consumers get no replay and no deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ElectionEvent {
    VoterRegistered { voter: VoterId },
    PhaseChanged { from: Phase, to: Phase },
    ProposalRegistered { id: u32 },
    ProposalRemoved { id: u32 },
    VoteCast { voter: VoterId, proposal: u32 },
    WinnerAnnounced { description: String },
    ElectionReset { at: DateTime<Utc> },
}

/// Injected notification channel. The engine publishes only after the
/// triggering mutation has fully committed, so a sink never observes a
/// half-applied call.
pub trait EventSink {
    fn publish(&mut self, event: ElectionEvent);
}

/// Discards everything. Default sink for engines that nobody listens to.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&mut self, _event: ElectionEvent) {}
}

/// Captures events into a shared buffer so tests can assert exact order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ElectionEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that stays valid after the sink is moved into an engine.
    pub fn handle(&self) -> Arc<Mutex<Vec<ElectionEvent>>> {
        Arc::clone(&self.events)
    }
}

impl EventSink for RecordingSink {
    fn publish(&mut self, event: ElectionEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Logs each event as a structured tracing line. Used by the CLI adapter.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&mut self, event: ElectionEvent) {
        match &event {
            ElectionEvent::VoterRegistered { voter } => {
                tracing::info!(voter = %voter, "voter registered");
            }
            ElectionEvent::PhaseChanged { from, to } => {
                tracing::info!(from = %from, to = %to, "phase changed");
            }
            ElectionEvent::ProposalRegistered { id } => {
                tracing::info!(proposal = %id, "proposal registered");
            }
            ElectionEvent::ProposalRemoved { id } => {
                tracing::info!(proposal = %id, "proposal removed");
            }
            ElectionEvent::VoteCast { voter, proposal } => {
                tracing::info!(voter = %voter, proposal = %proposal, "vote cast");
            }
            ElectionEvent::WinnerAnnounced { description } => {
                tracing::info!(winner = %description, "winner announced");
            }
            ElectionEvent::ElectionReset { at } => {
                tracing::info!(at = %at, "election reset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_sink_preserves_publish_order() {
        let sink = RecordingSink::new();
        let handle = sink.handle();
        let mut sink: Box<dyn EventSink> = Box::new(sink);

        sink.publish(ElectionEvent::ProposalRegistered { id: 1 });
        sink.publish(ElectionEvent::ProposalRemoved { id: 1 });

        let events = handle.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                ElectionEvent::ProposalRegistered { id: 1 },
                ElectionEvent::ProposalRemoved { id: 1 },
            ]
        );
    }
}
