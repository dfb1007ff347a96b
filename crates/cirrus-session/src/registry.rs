//! Fixed registry of backend agents

use cirrus_api::{AgentRecord, AgentStatus};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// The backend's agents, keyed by id.
///
/// The id set is fixed at construction; only the mutable fields of each record
/// change afterwards.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentRecord>,
}

impl AgentRegistry {
    /// Build a registry, rejecting repeated ids
    pub fn new(agents: Vec<AgentRecord>) -> Result<Self> {
        let mut seen = HashSet::new();
        for agent in &agents {
            if !seen.insert(agent.id.as_str()) {
                return Err(Error::DuplicateAgent(agent.id.clone()));
            }
        }
        Ok(Self { agents })
    }

    /// The four agents the orchestration backend runs, in pipeline order
    pub fn default_fleet() -> Self {
        Self {
            agents: vec![
                AgentRecord::new(
                    "requirements-analysis",
                    "Requirements Analysis Agent",
                    "Analyzes project requirements and constraints",
                    [
                        "requirement extraction",
                        "constraint analysis",
                        "business logic understanding",
                    ],
                ),
                AgentRecord::new(
                    "cloud-architecture",
                    "Cloud Architecture Agent",
                    "Designs optimal GCP architectures",
                    [
                        "service selection",
                        "architecture design",
                        "cost optimization",
                    ],
                ),
                AgentRecord::new(
                    "iac-generation",
                    "IaC Generation Agent",
                    "Generates Terraform configurations",
                    [
                        "terraform generation",
                        "IaC best practices",
                        "resource management",
                    ],
                ),
                AgentRecord::new(
                    "deployment",
                    "Deployment Agent",
                    "Handles infrastructure provisioning and deployment",
                    [
                        "terraform apply",
                        "deployment orchestration",
                        "resource verification",
                    ],
                ),
            ],
        }
    }

    pub fn get(&self, id: &str) -> Option<&AgentRecord> {
        self.agents.iter().find(|a| a.id == id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut AgentRecord> {
        self.agents.iter_mut().find(|a| a.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentRecord> {
        self.agents.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut AgentRecord> {
        self.agents.iter_mut()
    }

    /// Agent ids in registry order
    pub fn ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Whether any agent is mid-task
    pub fn any_working(&self) -> bool {
        self.agents.iter().any(|a| a.status == AgentStatus::Working)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::default_fleet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fleet_ids() {
        let registry = AgentRegistry::default_fleet();
        assert_eq!(
            registry.ids(),
            vec![
                "requirements-analysis",
                "cloud-architecture",
                "iac-generation",
                "deployment"
            ]
        );
        assert!(registry.iter().all(|a| a.status == AgentStatus::Idle));
        assert!(!registry.any_working());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let agents = vec![
            AgentRecord::new("a", "A", "first", ["x"]),
            AgentRecord::new("a", "A again", "second", ["y"]),
        ];
        match AgentRegistry::new(agents) {
            Err(Error::DuplicateAgent(id)) => assert_eq!(id, "a"),
            other => panic!("expected duplicate error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_lookup() {
        let registry = AgentRegistry::default_fleet();
        assert_eq!(
            registry.get("deployment").unwrap().display_name,
            "Deployment Agent"
        );
        assert!(registry.get("billing").is_none());
        assert_eq!(registry.len(), 4);
    }
}
