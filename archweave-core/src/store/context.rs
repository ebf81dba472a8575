//! Architecture context snapshots
//!
//! Issue-thread requests are grounded in the latest architecture exchange of
//! their project. A missing snapshot is normal ("no context yet") and is
//! distinct from a snapshot with an empty summary.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::persistence::{keys, PersistenceLayer};
use crate::types::ArchitectureContextSnapshot;

use super::lock;

type SnapshotMap = BTreeMap<String, ArchitectureContextSnapshot>;

/// Holds at most one live snapshot per project. Last write wins.
pub struct ContextBridge {
    persistence: Arc<PersistenceLayer>,
    snapshots: Mutex<SnapshotMap>,
}

impl ContextBridge {
    /// Hydrate from the persisted snapshot map.
    pub fn init(persistence: Arc<PersistenceLayer>) -> Self {
        let snapshots: SnapshotMap = persistence
            .load(keys::ARCHITECTURE_CONTEXT)
            .unwrap_or_default();
        tracing::debug!(count = snapshots.len(), "Loaded architecture context snapshots");
        Self {
            persistence,
            snapshots: Mutex::new(snapshots),
        }
    }

    /// Replace the snapshot for `project_id`.
    pub fn update(&self, project_id: &str, mut snapshot: ArchitectureContextSnapshot) {
        snapshot.project_id = project_id.to_string();
        let mut snapshots = lock(&self.snapshots);
        snapshots.insert(project_id.to_string(), snapshot);
        self.mirror(&snapshots);
        tracing::debug!(project_id, "Architecture context updated");
    }

    pub fn get(&self, project_id: &str) -> Option<ArchitectureContextSnapshot> {
        lock(&self.snapshots).get(project_id).cloned()
    }

    /// Whether a snapshot exists and carries at least one message.
    pub fn has_context(&self, project_id: &str) -> bool {
        lock(&self.snapshots)
            .get(project_id)
            .is_some_and(|s| !s.copied_messages.is_empty())
    }

    /// Drop the snapshot of a deleted project.
    pub fn purge(&self, project_id: &str) {
        let mut snapshots = lock(&self.snapshots);
        if snapshots.remove(project_id).is_some() {
            self.mirror(&snapshots);
        }
    }

    fn mirror(&self, snapshots: &SnapshotMap) {
        if let Err(e) = self.persistence.save(keys::ARCHITECTURE_CONTEXT, snapshots) {
            tracing::warn!(error = %e, "Failed to persist architecture context");
        }
    }
}
