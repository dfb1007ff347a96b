//! Core types shared between the backend event stream and the client state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};

/// Maximum number of recent activity notes kept per agent
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Author of a conversation entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// What a conversation entry carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Text,
    Error,
    File,
}

/// One exchange turn in the transcript.
///
/// The serialized form is what the backend expects inside
/// `metadata.conversation_history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: EntryKind,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Agent that authored the entry
    #[serde(rename = "agent", default, skip_serializing_if = "Option::is_none")]
    pub source_agent: Option<String>,
    /// Auxiliary key/value pairs (file metadata and the like)
    #[serde(rename = "metadata", default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

impl ConversationEntry {
    fn new(role: Role, kind: EntryKind, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind,
            created_at: Utc::now(),
            source_agent: None,
            attributes: None,
        }
    }

    /// Create a user text entry
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, EntryKind::Text, content)
    }

    /// Create an assistant text entry
    pub fn assistant(content: impl Into<String>, agent: Option<String>) -> Self {
        Self {
            source_agent: agent,
            ..Self::new(Role::Assistant, EntryKind::Text, content)
        }
    }

    /// Create an assistant error entry
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Role::Assistant, EntryKind::Error, message)
    }

    /// Create a user file entry describing a set of uploaded files
    pub fn file(content: impl Into<String>, files: &[FileInfo]) -> Self {
        let mut attributes = Map::new();
        attributes.insert("fileCount".to_string(), Value::from(files.len()));
        attributes.insert(
            "files".to_string(),
            serde_json::to_value(files).unwrap_or(Value::Array(vec![])),
        );
        Self {
            attributes: Some(attributes),
            ..Self::new(Role::User, EntryKind::File, content)
        }
    }

    /// Whether this entry was written by the assistant side
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// Name and size of an attached file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

/// Agent status state machine. Any state may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Idle,
    Working,
    Completed,
    Error,
}

impl AgentStatus {
    /// Get the wire name of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Working => "working",
            AgentStatus::Completed => "completed",
            AgentStatus::Error => "error",
        }
    }
}

/// Running performance figures for an agent
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub tasks_completed: u32,
    /// Mean task duration in seconds
    pub avg_response_time: f64,
    /// Percentage of finished tasks that completed, 0-100
    pub success_rate: f64,
}

/// One named capability of the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub display_name: String,
    pub description: String,
    pub status: AgentStatus,
    pub current_task: Option<String>,
    pub capabilities: Vec<String>,
    pub metrics: AgentMetrics,
    pub recent_activities: VecDeque<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

impl AgentRecord {
    /// Create an idle agent record
    pub fn new<I, S>(
        id: impl Into<String>,
        display_name: impl Into<String>,
        description: impl Into<String>,
        capabilities: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            description: description.into(),
            status: AgentStatus::Idle,
            current_task: None,
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            metrics: AgentMetrics::default(),
            recent_activities: VecDeque::with_capacity(RECENT_ACTIVITY_LIMIT),
            last_activity_at: None,
        }
    }

    /// Record an activity note, evicting the oldest beyond the limit
    pub fn push_activity(&mut self, note: impl Into<String>) {
        while self.recent_activities.len() >= RECENT_ACTIVITY_LIMIT {
            self.recent_activities.pop_front();
        }
        self.recent_activities.push_back(note.into());
    }
}

/// Deserialize a field, treating an explicit `null` like a missing one.
///
/// The backend fills snapshots from generated plans, so any leaf may be `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Monthly cost estimate for a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostEstimate {
    #[serde(deserialize_with = "null_as_default")]
    pub monthly: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub breakdown: String,
    pub currency: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Live figures reported for a service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceMetrics {
    pub cpu: Option<f64>,
    pub memory: Option<f64>,
    pub requests: Option<f64>,
    pub latency: Option<f64>,
    pub errors: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single cloud service inside an application stack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudService {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// Service family, e.g. `cloud-run` or `cloud-sql`
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    pub region: Option<String>,
    pub project_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub configuration: Value,
    pub cost_estimate: Option<CostEstimate>,
    pub metrics: Option<ServiceMetrics>,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Map<String, Value>,
    /// Ids of services this one talks to
    #[serde(deserialize_with = "null_as_default")]
    pub connections: Vec<String>,
    pub health_status: Option<String>,
    pub resource_url: Option<String>,
    /// Fields without a typed home (`tags`, `arn`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A group of services deployed together
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationStack {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub services: Vec<CloudService>,
    #[serde(deserialize_with = "null_as_default")]
    pub primary_service: String,
    #[serde(deserialize_with = "null_as_default")]
    pub labels: Map<String, Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_cost: f64,
    pub health_status: Option<String>,
    pub vpc: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub subnets: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Directed link between two services
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConnection {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target: String,
    /// One of `network`, `iam`, `data`, `api`
    #[serde(deserialize_with = "null_as_default")]
    pub connection_type: String,
    pub protocol: Option<String>,
    pub port: Option<u16>,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Complete description of the designed cloud topology.
///
/// Always replaced wholesale; never merged field by field. Fields the client
/// has no type for are kept in `extra` so nothing the backend sent is lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchitectureSnapshot {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    pub project_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub application_stacks: Vec<ApplicationStack>,
    #[serde(deserialize_with = "null_as_default")]
    pub connections: Vec<ServiceConnection>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cost_breakdown: BTreeMap<String, f64>,
    pub last_refresh: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub has_gcp_access: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArchitectureSnapshot {
    /// Iterate every service across all stacks
    pub fn services(&self) -> impl Iterator<Item = &CloudService> {
        self.application_stacks.iter().flat_map(|s| s.services.iter())
    }
}

/// Deployment pipeline phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentPhase {
    #[default]
    Pending,
    Planning,
    Applying,
    Completed,
    Failed,
    RollingBack,
}

/// Latest deployment progress report, replaced wholesale on every update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentSnapshot {
    pub deployment_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub status: DeploymentPhase,
    /// Percentage, 0-100
    #[serde(deserialize_with = "null_as_default")]
    pub progress: f64,
    pub current_step: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub logs: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub resources_created: Vec<String>,
    pub error: Option<String>,
    /// Fields without a typed home (`outputs`, `architecture`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DeploymentSnapshot {
    /// Whether the deployment reached a final phase
    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            DeploymentPhase::Completed | DeploymentPhase::Failed
        )
    }
}
