//! Session event types

use cirrus_api::{AgentRecord, ArchitectureSnapshot, ConversationEntry, DeploymentSnapshot};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionOutcome;

/// Events broadcast to presentation code while a session runs.
///
/// Every payload is an owned copy; subscribers never hold a handle into the
/// reducer's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A submission was accepted and the request is being sent
    ProcessingStarted { run_id: Uuid },

    /// A new transcript entry; `open` while more reply text may follow
    EntryAppended {
        index: usize,
        entry: ConversationEntry,
        open: bool,
    },

    /// The open reply grew
    EntryUpdated {
        index: usize,
        entry: ConversationEntry,
    },

    /// An agent record changed
    AgentUpdated { agent: AgentRecord },

    /// The architecture snapshot was replaced
    ArchitectureReplaced { snapshot: ArchitectureSnapshot },

    /// The deployment snapshot was replaced
    DeploymentReplaced { snapshot: DeploymentSnapshot },

    /// The run ended; every agent is idle again
    ProcessingFinished { run_id: Uuid, outcome: SessionOutcome },
}

impl SessionEvent {
    /// Check if this is the last event of a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::ProcessingFinished { .. })
    }
}
