//! Session controller: one request/response cycle at a time

use cirrus_api::{ConversationEntry, FileInfo, decode_frames};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    events::SessionEvent,
    handle::SessionHandle,
    reducer::{SessionView, StreamReducer, Update},
    registry::AgentRegistry,
    transport::Transport,
};

/// Prefix of the entry appended when the backend cannot be reached
pub const FAILURE_PREFIX: &str = "Connection to the agent backend failed";

/// Reply appended after a file attachment
pub const UPLOAD_ACK: &str =
    "File uploads are not processed yet. Please describe your application requirements in text.";

/// How a submission ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The stream reached `[DONE]` or the end of the body
    Completed,
    /// Aborted through a [`SessionHandle`]
    Cancelled,
    /// The request or the stream failed
    Failed { message: String },
}

/// Resets the processing flag even when the submit future is dropped.
struct RunGuard {
    handle: SessionHandle,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.handle.end();
    }
}

/// Conversation state plus the machinery to stream one reply into it.
pub struct Session {
    id: Uuid,
    reducer: StreamReducer,
    transport: Arc<dyn Transport>,
    handle: SessionHandle,
    event_tx: broadcast::Sender<SessionEvent>,
    /// Set while a run is applying events; still set on entry if the previous
    /// submit future was dropped before finishing.
    run_in_flight: bool,
}

impl Session {
    pub fn new(agents: AgentRegistry, transport: Arc<dyn Transport>) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            id: Uuid::new_v4(),
            reducer: StreamReducer::new(agents),
            transport,
            handle: SessionHandle::new(),
            event_tx,
            run_in_flight: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Get a cloneable handle for aborting and idle waits
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.handle.is_processing()
    }

    /// Read-only access to the transcript, agents and snapshots
    pub fn state(&self) -> &StreamReducer {
        &self.reducer
    }

    /// Owned copy of the current state
    pub fn view(&self) -> SessionView {
        self.reducer.view()
    }

    /// Send `text` and apply the streamed reply.
    ///
    /// Rejected with [`Error::AlreadyProcessing`] while another run is in
    /// progress; nothing is appended in that case. Transport failures are not
    /// returned as errors: they end the run with [`SessionOutcome::Failed`] and
    /// an error entry in the transcript.
    pub async fn submit(&mut self, text: &str) -> Result<SessionOutcome> {
        let Some(cancel) = self.handle.try_begin() else {
            return Err(Error::AlreadyProcessing);
        };
        let _guard = RunGuard {
            handle: self.handle.clone(),
        };

        if self.run_in_flight {
            debug!(session_id = %self.id, "Settling state left by an abandoned run");
            self.settle();
        }
        self.run_in_flight = true;

        let run_id = Uuid::new_v4();
        info!(session_id = %self.id, %run_id, chars = text.chars().count(), "Submitting message");

        let history = self.reducer.transcript().entries().to_vec();
        let update = self.reducer.push_user(text);
        self.publish(update);
        self.emit(SessionEvent::ProcessingStarted { run_id });

        let outcome = self.drive(text, &history, &cancel).await;

        if let SessionOutcome::Failed { message } = &outcome {
            let entry = ConversationEntry::error(format!("{FAILURE_PREFIX}: {message}"));
            let update = self.reducer.push_entry(entry);
            self.publish(update);
        }
        self.settle();
        self.run_in_flight = false;

        info!(session_id = %self.id, %run_id, ?outcome, "Run finished");
        self.emit(SessionEvent::ProcessingFinished {
            run_id,
            outcome: outcome.clone(),
        });
        Ok(outcome)
    }

    /// Record attached files and the canned acknowledgement.
    pub fn attach_files(&mut self, files: &[FileInfo], description: Option<&str>) -> Result<()> {
        if self.handle.is_processing() {
            return Err(Error::AlreadyProcessing);
        }

        let summary = match description.map(str::trim).filter(|d| !d.is_empty()) {
            Some(description) => format!("Uploaded {} files: {description}", files.len()),
            None => format!("Uploaded {} files", files.len()),
        };
        debug!(session_id = %self.id, count = files.len(), "Attaching files");

        let update = self.reducer.push_entry(ConversationEntry::file(summary, files));
        self.publish(update);
        let update = self
            .reducer
            .push_entry(ConversationEntry::assistant(UPLOAD_ACK, None));
        self.publish(update);
        Ok(())
    }

    /// Open the stream and apply events until it ends, fails or is cancelled.
    async fn drive(
        &mut self,
        text: &str,
        history: &[ConversationEntry],
        cancel: &CancellationToken,
    ) -> SessionOutcome {
        let transport = Arc::clone(&self.transport);
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return SessionOutcome::Cancelled,
            result = transport.send(text, history) => match result {
                Ok(body) => body,
                Err(e) => return self.failed(e),
            },
        };

        let mut events = decode_frames(body);
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return SessionOutcome::Cancelled,
                next = events.next() => next,
            };

            match next {
                Some(Ok(event)) => {
                    debug!(session_id = %self.id, kind = event.kind(), "Applying event");
                    let update = self.reducer.apply(event);
                    self.publish(update);
                }
                Some(Err(e)) => return self.failed(e),
                None => return SessionOutcome::Completed,
            }
        }
    }

    fn failed(&self, error: cirrus_api::Error) -> SessionOutcome {
        warn!(session_id = %self.id, transport = error.is_transport(), error = %error, "Stream failed");
        SessionOutcome::Failed {
            message: error.to_string(),
        }
    }

    /// Seal the open reply and return every agent to idle
    fn settle(&mut self) {
        for id in self.reducer.finish() {
            self.publish(Update::Agent { id });
        }
    }

    /// Turn a reducer update into an owned event for subscribers
    fn publish(&self, update: Update) {
        let event = match update {
            Update::Entry { index, created } => {
                let Some(entry) = self.reducer.transcript().entries().get(index).cloned() else {
                    return;
                };
                if created {
                    let open = self.reducer.transcript().open_index() == Some(index);
                    SessionEvent::EntryAppended { index, entry, open }
                } else {
                    SessionEvent::EntryUpdated { index, entry }
                }
            }
            Update::Agent { id } => match self.reducer.agents().get(&id) {
                Some(agent) => SessionEvent::AgentUpdated {
                    agent: agent.clone(),
                },
                None => return,
            },
            Update::Architecture => match self.reducer.architecture() {
                Some(snapshot) => SessionEvent::ArchitectureReplaced {
                    snapshot: snapshot.clone(),
                },
                None => return,
            },
            Update::Deployment => match self.reducer.deployment() {
                Some(snapshot) => SessionEvent::DeploymentReplaced {
                    snapshot: snapshot.clone(),
                },
                None => return,
            },
            Update::Ignored => return,
        };
        self.emit(event);
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }
}
