//! Project registry resolver

use std::sync::Arc;

use common::{canonical_address, MetaPtr, ProjectRegistry, RegistryEntryId};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{Result, RoundDataError};
use crate::metadata::IPFS_PROTOCOL;
use crate::source::ContentSource;

pub const APPROVED: &str = "APPROVED";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegistryEntry {
    id: String,
    status: String,
    payout_address: String,
}

/// Builds the approved-project registry from the round's projects document
#[derive(Clone)]
pub struct ProjectResolver {
    content: Arc<dyn ContentSource>,
}

impl ProjectResolver {
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self { content }
    }

    pub async fn resolve_projects(
        &self,
        projects_meta_ptr: Option<&MetaPtr>,
    ) -> Result<ProjectRegistry> {
        let Some(ptr) = projects_meta_ptr else {
            debug!("Round has no projects pointer; registry is empty");
            return Ok(ProjectRegistry::new());
        };
        if ptr.protocol != IPFS_PROTOCOL {
            return Err(RoundDataError::validation(format!(
                "unsupported projects protocol {}",
                ptr.protocol
            )));
        }

        let raw = self.content.fetch(&ptr.pointer).await?;
        let entries: Vec<RegistryEntry> = serde_json::from_value(raw)
            .map_err(|e| RoundDataError::validation(format!("projects document: {}", e)))?;

        let total = entries.len();
        let mut registry = ProjectRegistry::new();
        for entry in entries.into_iter().filter(|e| e.status == APPROVED) {
            let entry_id: RegistryEntryId = entry.id.parse()?;
            let payout = canonical_address(&entry.payout_address).map_err(|e| {
                RoundDataError::validation(format!("project {}: {}", entry.id, e))
            })?;
            registry.insert(entry_id.project_id(), payout)?;
        }

        info!(
            pointer = %ptr.pointer,
            listed = total,
            approved = registry.len(),
            "Resolved project registry"
        );
        Ok(registry)
    }
}
