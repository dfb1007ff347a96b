//! Stream reducer: applies backend events to the client-side state
//!
//! Every event touches exactly one of three structures: the transcript, the
//! agent registry, or the architecture/deployment snapshots. Application is
//! synchronous, in arrival order, and never suspends, so handlers cannot
//! interleave.

use chrono::{DateTime, TimeDelta, Utc};
use cirrus_api::{
    AgentRecord, AgentStatus, ArchitectureSnapshot, ConversationEntry, DeploymentSnapshot,
    StreamEvent,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::{registry::AgentRegistry, transcript::Transcript};

/// What a single reducer step changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// A transcript entry was appended (`created`) or extended in place
    Entry { index: usize, created: bool },
    /// An agent record changed
    Agent { id: String },
    /// The architecture snapshot was replaced
    Architecture,
    /// The deployment snapshot was replaced
    Deployment,
    /// Nothing changed (e.g. an unknown agent id)
    Ignored,
}

/// Owned copy of the reducer state, handed to presentation code
#[derive(Debug, Clone)]
pub struct SessionView {
    pub transcript: Vec<ConversationEntry>,
    pub agents: Vec<AgentRecord>,
    pub architecture: Option<ArchitectureSnapshot>,
    pub deployment: Option<DeploymentSnapshot>,
}

/// Per-agent bookkeeping the backend never sends
#[derive(Debug, Default)]
struct TaskTally {
    started_at: Option<DateTime<Utc>>,
    failed: u32,
}

/// Owner of the transcript, agent registry and snapshots for one session
#[derive(Debug)]
pub struct StreamReducer {
    transcript: Transcript,
    agents: AgentRegistry,
    architecture: Option<ArchitectureSnapshot>,
    deployment: Option<DeploymentSnapshot>,
    tallies: HashMap<String, TaskTally>,
}

impl StreamReducer {
    /// Create a reducer over a fixed agent registry
    pub fn new(agents: AgentRegistry) -> Self {
        Self {
            transcript: Transcript::new(),
            agents,
            architecture: None,
            deployment: None,
            tallies: HashMap::new(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    pub fn architecture(&self) -> Option<&ArchitectureSnapshot> {
        self.architecture.as_ref()
    }

    pub fn deployment(&self) -> Option<&DeploymentSnapshot> {
        self.deployment.as_ref()
    }

    /// Copy the full state for a presentation collaborator
    pub fn view(&self) -> SessionView {
        SessionView {
            transcript: self.transcript.entries().to_vec(),
            agents: self.agents.iter().cloned().collect(),
            architecture: self.architecture.clone(),
            deployment: self.deployment.clone(),
        }
    }

    /// Apply one decoded event
    pub fn apply(&mut self, event: StreamEvent) -> Update {
        match event {
            StreamEvent::AgentStatus {
                agent_id,
                status,
                current_task,
                activity,
                ..
            } => self.on_agent_status(&agent_id, status, current_task, activity),
            StreamEvent::Text { content, agent } => self.on_text(&content, agent.as_deref()),
            StreamEvent::Architecture { data } => self.on_architecture(data),
            StreamEvent::DeploymentStatus { data } => self.on_deployment_status(data),
            StreamEvent::Error { message, details } => self.on_error(message, details),
        }
    }

    /// Set an agent's status and task, record the activity note, refresh its timestamp.
    ///
    /// Unknown ids are ignored.
    pub fn on_agent_status(
        &mut self,
        agent_id: &str,
        status: AgentStatus,
        current_task: Option<String>,
        activity: Option<String>,
    ) -> Update {
        let Some(agent) = self.agents.get_mut(agent_id) else {
            tracing::debug!(agent_id, "Ignoring status for unknown agent");
            return Update::Ignored;
        };

        let now = next_activity_time(agent.last_activity_at);
        let tally = self.tallies.entry(agent_id.to_string()).or_default();
        record_transition(agent, tally, status, now);

        agent.status = status;
        agent.current_task = current_task;
        if let Some(note) = activity {
            agent.push_activity(note);
        }
        agent.last_activity_at = Some(now);

        Update::Agent {
            id: agent_id.to_string(),
        }
    }

    /// Extend the open reply, or open a new one
    pub fn on_text(&mut self, content: &str, agent: Option<&str>) -> Update {
        let (index, created) = self.transcript.append_text(content, agent);
        Update::Entry { index, created }
    }

    /// Replace the architecture snapshot wholesale
    pub fn on_architecture(&mut self, data: ArchitectureSnapshot) -> Update {
        self.architecture = Some(data);
        Update::Architecture
    }

    /// Replace the deployment snapshot wholesale
    pub fn on_deployment_status(&mut self, data: DeploymentSnapshot) -> Update {
        self.deployment = Some(data);
        Update::Deployment
    }

    /// Append an error entry. The session keeps streaming.
    pub fn on_error(&mut self, message: String, details: Option<String>) -> Update {
        let mut entry = ConversationEntry::error(message);
        if let Some(details) = details {
            let mut attributes = Map::new();
            attributes.insert("details".to_string(), Value::String(details));
            entry.attributes = Some(attributes);
        }
        self.push_entry(entry)
    }

    /// Append the user's message
    pub fn push_user(&mut self, content: &str) -> Update {
        self.push_entry(ConversationEntry::user(content))
    }

    /// Append a sealed entry
    pub fn push_entry(&mut self, entry: ConversationEntry) -> Update {
        let index = self.transcript.push_closed(entry);
        Update::Entry {
            index,
            created: true,
        }
    }

    /// End of a stream: seal the open reply and return every agent to idle.
    ///
    /// Returns the ids of agents whose record changed.
    pub fn finish(&mut self) -> Vec<String> {
        self.transcript.close();

        let mut changed = Vec::new();
        for agent in self.agents.iter_mut() {
            if agent.status == AgentStatus::Idle && agent.current_task.is_none() {
                continue;
            }
            if let Some(tally) = self.tallies.get_mut(&agent.id) {
                // abandoned mid-task; counts as neither success nor failure
                tally.started_at = None;
            }
            agent.status = AgentStatus::Idle;
            agent.current_task = None;
            agent.last_activity_at = Some(next_activity_time(agent.last_activity_at));
            changed.push(agent.id.clone());
        }
        changed
    }
}

/// Current time, nudged forward so an agent's timestamps strictly increase.
fn next_activity_time(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + TimeDelta::nanoseconds(1),
        _ => now,
    }
}

/// Fold a status transition into the agent's metrics.
fn record_transition(
    agent: &mut AgentRecord,
    tally: &mut TaskTally,
    next: AgentStatus,
    now: DateTime<Utc>,
) {
    match (agent.status, next) {
        (AgentStatus::Working, AgentStatus::Working) => {}
        (_, AgentStatus::Working) => tally.started_at = Some(now),
        (AgentStatus::Working, AgentStatus::Completed) => {
            let metrics = &mut agent.metrics;
            let elapsed = tally
                .started_at
                .take()
                .map(|start| (now - start).num_milliseconds().max(0) as f64 / 1000.0)
                .unwrap_or(0.0);
            let done = metrics.tasks_completed as f64;
            metrics.avg_response_time = (metrics.avg_response_time * done + elapsed) / (done + 1.0);
            metrics.tasks_completed += 1;
        }
        (AgentStatus::Working, AgentStatus::Error) => {
            tally.started_at = None;
            tally.failed += 1;
        }
        _ => return,
    }

    let finished = agent.metrics.tasks_completed + tally.failed;
    if finished > 0 {
        agent.metrics.success_rate =
            agent.metrics.tasks_completed as f64 / finished as f64 * 100.0;
    }
}
