//! Streaming event types

use crate::error::Result;
use crate::types::{AgentStatus, ArchitectureSnapshot, DeploymentSnapshot};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Events carried by the backend's chat stream, one per frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An agent changed state
    AgentStatus {
        agent_id: String,
        #[serde(default)]
        agent_name: Option<String>,
        status: AgentStatus,
        #[serde(default)]
        current_task: Option<String>,
        /// Note to append to the agent's recent activities
        #[serde(default)]
        activity: Option<String>,
    },
    /// Reply text fragment
    Text {
        content: String,
        #[serde(default)]
        agent: Option<String>,
    },
    /// Full architecture snapshot
    Architecture { data: ArchitectureSnapshot },
    /// Full deployment progress snapshot
    DeploymentStatus { data: DeploymentSnapshot },
    /// Backend-side failure reported in-band
    Error {
        message: String,
        #[serde(default)]
        details: Option<String>,
    },
}

impl StreamEvent {
    /// Get the wire discriminant of this event
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::AgentStatus { .. } => "agent_status",
            StreamEvent::Text { .. } => "text",
            StreamEvent::Architecture { .. } => "architecture",
            StreamEvent::DeploymentStatus { .. } => "deployment_status",
            StreamEvent::Error { .. } => "error",
        }
    }
}

/// Raw response body chunks, boundaries unrelated to frames
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Decoded events in arrival order; an `Err` item ends the stream
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_status_decodes_backend_shape() {
        let raw = r#"{"type":"agent_status","agent_id":"cloud-architecture","agent_name":"Cloud Architecture Agent","status":"working","current_task":"Designing optimal GCP architecture...","activity":"Designing optimal GCP architecture...","timestamp":"2025-01-01T10:00:00"}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        match event {
            StreamEvent::AgentStatus {
                agent_id,
                status,
                current_task,
                activity,
                ..
            } => {
                assert_eq!(agent_id, "cloud-architecture");
                assert_eq!(status, AgentStatus::Working);
                assert_eq!(current_task.as_deref(), Some("Designing optimal GCP architecture..."));
                assert!(activity.is_some());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_agent_status_optional_fields() {
        let raw = r#"{"type":"agent_status","agent_id":"deployment","status":"completed","current_task":null,"activity":null}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(
            event,
            StreamEvent::AgentStatus {
                agent_id: "deployment".into(),
                agent_name: None,
                status: AgentStatus::Completed,
                current_task: None,
                activity: None,
            }
        );
    }

    #[test]
    fn test_text_without_agent() {
        let event: StreamEvent =
            serde_json::from_str(r#"{"type":"text","content":" your app..."}"#).unwrap();
        assert_eq!(
            event,
            StreamEvent::Text {
                content: " your app...".into(),
                agent: None
            }
        );
        assert_eq!(event.kind(), "text");
    }

    #[test]
    fn test_deployment_status_decodes() {
        let raw = r#"{"type":"deployment_status","data":{"status":"planning","progress":10,"current_step":"Initializing Terraform workspace...","logs":[]}}"#;
        let event: StreamEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind(), "deployment_status");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = serde_json::from_str::<StreamEvent>(r#"{"type":"heartbeat"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let raw = r#"{"type":"agent_status","agent_id":"x","status":"sleeping"}"#;
        assert!(serde_json::from_str::<StreamEvent>(raw).is_err());
    }
}
