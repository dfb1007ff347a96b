//! Plain-text rendering of session events

use cirrus_api::{
    AgentRecord, AgentStatus, ArchitectureSnapshot, ConversationEntry, DeploymentPhase,
    DeploymentSnapshot, EntryKind, Role,
};
use cirrus_session::{SessionEvent, SessionOutcome};
use std::collections::HashMap;
use std::io::Write;
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

use crate::utils::truncate_chars;

/// Turns session events into terminal text.
///
/// Reply text is printed incrementally: each update only writes the
/// characters not yet shown for that entry.
pub struct Renderer {
    show_agents: bool,
    shown: HashMap<usize, usize>,
    mid_line: bool,
}

impl Renderer {
    pub fn new(show_agents: bool) -> Self {
        Self {
            show_agents,
            shown: HashMap::new(),
            mid_line: false,
        }
    }

    /// Text to write for one event, if any
    pub fn render(&mut self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::ProcessingStarted { .. } => None,
            SessionEvent::EntryAppended { index, entry, open } => {
                self.appended(*index, entry, *open)
            }
            SessionEvent::EntryUpdated { index, entry } => self.updated(*index, entry),
            SessionEvent::AgentUpdated { agent } => {
                if !self.show_agents {
                    return None;
                }
                Some(self.line(&agent_line(agent)))
            }
            SessionEvent::ArchitectureReplaced { snapshot } => {
                Some(self.line(&architecture_summary(snapshot)))
            }
            SessionEvent::DeploymentReplaced { snapshot } => {
                Some(self.line(&deployment_line(snapshot)))
            }
            SessionEvent::ProcessingFinished { outcome, .. } => {
                // Reply entries of a finished run never update again
                self.shown.clear();
                match outcome {
                    SessionOutcome::Cancelled => Some(self.line("[cancelled]")),
                    _ if self.mid_line => {
                        self.mid_line = false;
                        Some("\n".to_string())
                    }
                    _ => None,
                }
            }
        }
    }

    fn appended(&mut self, index: usize, entry: &ConversationEntry, open: bool) -> Option<String> {
        match (entry.role, entry.kind) {
            (Role::User, EntryKind::Text) => None,
            (_, EntryKind::File) => Some(self.line(&format!("[{}]", entry.content))),
            (_, EntryKind::Error) => Some(self.line(&format!("Error: {}", entry.content))),
            (Role::Assistant, EntryKind::Text) if !open => {
                let text = match &entry.source_agent {
                    Some(agent) => format!("[{}] {}", agent, entry.content),
                    None => entry.content.clone(),
                };
                Some(self.line(text.trim_end()))
            }
            (Role::Assistant, EntryKind::Text) => {
                let mut out = String::new();
                if self.mid_line {
                    out.push('\n');
                }
                if let Some(agent) = &entry.source_agent {
                    out.push_str(&format!("[{}] ", agent));
                }
                out.push_str(&entry.content);
                self.shown.insert(index, entry.content.chars().count());
                self.mid_line = !entry.content.ends_with('\n');
                Some(out)
            }
        }
    }

    fn updated(&mut self, index: usize, entry: &ConversationEntry) -> Option<String> {
        let shown = self.shown.entry(index).or_insert(0);
        let delta: String = entry.content.chars().skip(*shown).collect();
        if delta.is_empty() {
            return None;
        }
        *shown += delta.chars().count();
        self.mid_line = !delta.ends_with('\n');
        Some(delta)
    }

    /// A whole line, starting on a fresh one if reply text is mid-line
    fn line(&mut self, text: &str) -> String {
        let prefix = if self.mid_line { "\n" } else { "" };
        self.mid_line = false;
        format!("{}{}\n", prefix, text)
    }
}

/// Print events until the session goes away.
///
/// The outcome of every finished run is forwarded on `finished` once its
/// output has been written, so callers can wait before prompting again.
pub async fn run(
    mut events: broadcast::Receiver<SessionEvent>,
    mut renderer: Renderer,
    finished: mpsc::UnboundedSender<SessionOutcome>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(out) = renderer.render(&event) {
                    print!("{}", out);
                    let _ = std::io::stdout().flush();
                }
                if let SessionEvent::ProcessingFinished { outcome, .. } = event {
                    let _ = finished.send(outcome);
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Renderer fell behind; some updates were not shown");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn status_label(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Idle => "idle",
        AgentStatus::Working => "working",
        AgentStatus::Completed => "done",
        AgentStatus::Error => "failed",
    }
}

/// One-line agent status
pub fn agent_line(agent: &AgentRecord) -> String {
    match &agent.current_task {
        Some(task) => format!(
            "  * {}: {} ({})",
            agent.display_name,
            status_label(agent.status),
            truncate_chars(task, 60)
        ),
        None => format!("  * {}: {}", agent.display_name, status_label(agent.status)),
    }
}

/// Multi-line agent table for the `/agents` command
pub fn agents_table<'a>(agents: impl Iterator<Item = &'a AgentRecord>) -> String {
    let mut out = String::new();
    for agent in agents {
        out.push_str(&agent_line(agent));
        out.push('\n');
        let metrics = &agent.metrics;
        if metrics.tasks_completed > 0 {
            out.push_str(&format!(
                "      {} tasks, {:.1}s avg, {:.0}% success\n",
                metrics.tasks_completed, metrics.avg_response_time, metrics.success_rate
            ));
        }
        if let Some(last) = agent.recent_activities.back() {
            out.push_str(&format!("      last: {}\n", truncate_chars(last, 70)));
        }
    }
    out
}

/// Architecture overview: header plus one line per service
pub fn architecture_summary(snapshot: &ArchitectureSnapshot) -> String {
    let services: Vec<_> = snapshot.services().collect();
    let name = if snapshot.name.is_empty() {
        "untitled"
    } else {
        snapshot.name.as_str()
    };
    let mut out = format!(
        "Architecture: {} ({} services, ${:.2}/month)",
        name,
        services.len(),
        snapshot.total_cost
    );
    for service in services {
        let kind = service.service_type.as_deref().unwrap_or("service");
        out.push_str(&format!(
            "\n  - {} [{}] {}",
            truncate_chars(&service.name, 40),
            kind,
            service.status
        ));
    }
    out
}

fn phase_label(phase: DeploymentPhase) -> &'static str {
    match phase {
        DeploymentPhase::Pending => "pending",
        DeploymentPhase::Planning => "planning",
        DeploymentPhase::Applying => "applying",
        DeploymentPhase::Completed => "completed",
        DeploymentPhase::Failed => "failed",
        DeploymentPhase::RollingBack => "rolling back",
    }
}

/// Deployment progress line
pub fn deployment_line(snapshot: &DeploymentSnapshot) -> String {
    let mut out = format!(
        "Deployment {}: {:.0}%",
        phase_label(snapshot.status),
        snapshot.progress
    );
    if let Some(step) = &snapshot.current_step {
        out.push_str(&format!(" - {}", truncate_chars(step, 60)));
    }
    if let Some(error) = &snapshot.error {
        out.push_str(&format!("\n  error: {}", error));
    }
    out
}
