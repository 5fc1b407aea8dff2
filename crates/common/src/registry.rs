//! Approved project registry
//!
//! Bidirectional lookup between payout addresses and project ids. Only
//! approved projects are ever inserted; attribution must be unambiguous so
//! a payout address maps to exactly one project.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::Address;
use thiserror::Error;

use crate::address::checksum;
use crate::types::ProjectId;

/// Registry construction errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Invalid registry entry id '{0}': expected 'applicationId-roundId'")]
    InvalidEntryId(String),

    #[error("Payout address {address} is shared by projects {first} and {second}")]
    DuplicatePayoutAddress {
        address: String,
        first: ProjectId,
        second: ProjectId,
    },

    #[error("Project {0} is listed more than once")]
    DuplicateProject(ProjectId),
}

/// Parsed registry entry id of the form `applicationId-roundId`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntryId {
    pub application_id: String,
    pub round_id: String,
}

impl RegistryEntryId {
    pub fn project_id(&self) -> ProjectId {
        ProjectId::new(self.application_id.clone())
    }
}

impl FromStr for RegistryEntryId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(app), Some(round), None) if !app.is_empty() && !round.is_empty() => Ok(Self {
                application_id: app.to_string(),
                round_id: round.to_string(),
            }),
            _ => Err(RegistryError::InvalidEntryId(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectRegistry {
    by_payout: BTreeMap<Address, ProjectId>,
    by_project: BTreeMap<ProjectId, Address>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an approved project
    pub fn insert(&mut self, project: ProjectId, payout: Address) -> Result<(), RegistryError> {
        if let Some(existing) = self.by_payout.get(&payout) {
            return Err(RegistryError::DuplicatePayoutAddress {
                address: checksum(&payout),
                first: existing.clone(),
                second: project,
            });
        }
        if self.by_project.contains_key(&project) {
            return Err(RegistryError::DuplicateProject(project));
        }
        self.by_payout.insert(payout, project.clone());
        self.by_project.insert(project, payout);
        Ok(())
    }

    pub fn project_for(&self, payout: &Address) -> Option<&ProjectId> {
        self.by_payout.get(payout)
    }

    pub fn payout_for(&self, project: &ProjectId) -> Option<Address> {
        self.by_project.get(project).copied()
    }

    pub fn len(&self) -> usize {
        self.by_project.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_project.is_empty()
    }

    /// Projects in id order
    pub fn iter(&self) -> impl Iterator<Item = (&ProjectId, &Address)> {
        self.by_project.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_entry_id_split() {
        let id: RegistryEntryId = "7-0xabc".parse().unwrap();
        assert_eq!(id.application_id, "7");
        assert_eq!(id.round_id, "0xabc");
        assert_eq!(id.project_id(), ProjectId::new("7"));
    }

    #[test]
    fn test_entry_id_rejects_malformed() {
        for bad in ["7", "7-", "-0xabc", "7-0xabc-extra", ""] {
            assert_matches!(
                bad.parse::<RegistryEntryId>(),
                Err(RegistryError::InvalidEntryId(_)),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_bidirectional_lookup() {
        let mut registry = ProjectRegistry::new();
        let payout = Address::repeat_byte(1);
        registry.insert(ProjectId::new("a"), payout).unwrap();

        assert_eq!(registry.project_for(&payout), Some(&ProjectId::new("a")));
        assert_eq!(registry.payout_for(&ProjectId::new("a")), Some(payout));
        assert_eq!(registry.project_for(&Address::repeat_byte(2)), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_payout_rejected() {
        let mut registry = ProjectRegistry::new();
        let payout = Address::repeat_byte(1);
        registry.insert(ProjectId::new("a"), payout).unwrap();

        assert_matches!(
            registry.insert(ProjectId::new("b"), payout),
            Err(RegistryError::DuplicatePayoutAddress { first, second, .. })
                if first == ProjectId::new("a") && second == ProjectId::new("b")
        );
    }

    #[test]
    fn test_duplicate_project_rejected() {
        let mut registry = ProjectRegistry::new();
        registry.insert(ProjectId::new("a"), Address::repeat_byte(1)).unwrap();
        assert_matches!(
            registry.insert(ProjectId::new("a"), Address::repeat_byte(2)),
            Err(RegistryError::DuplicateProject(_))
        );
    }
}
