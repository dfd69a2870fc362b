use crate::cancellation::{AbortScope, AbortToken};
use crate::devices::Telescope;
use crate::models::Target;
use crate::scheduler::DispatchOutcome;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

/// One in-flight dispatch.
#[derive(Debug)]
pub struct RegistryEntry {
    pub action_id: Uuid,
    pub target: Target,
    pub telescopes: Vec<Telescope>,
    pub scope: AbortScope,
    pub token: AbortToken,
    pub dispatched_at: DateTime<Utc>,
    handle: Option<JoinHandle<DispatchOutcome>>,
}

impl RegistryEntry {
    pub fn new(
        target: Target,
        telescopes: Vec<Telescope>,
        scope: AbortScope,
        token: AbortToken,
    ) -> Self {
        Self {
            action_id: Uuid::new_v4(),
            target,
            telescopes,
            scope,
            token,
            dispatched_at: Utc::now(),
            handle: None,
        }
    }

    pub fn telescope_names(&self) -> Vec<String> {
        self.telescopes.iter().map(|t| t.name().to_string()).collect()
    }
}

/// Monitoring view of a registry entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InFlight {
    pub action_id: Uuid,
    pub target_id: String,
    pub target_name: String,
    pub telescopes: Vec<String>,
    pub scope: AbortScope,
    pub dispatched_at: DateTime<Utc>,
}

/// In-flight dispatches keyed by action id.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    entries: Arc<DashMap<Uuid, RegistryEntry>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entry: RegistryEntry) -> Uuid {
        let action_id = entry.action_id;
        debug!(
            action_id = %action_id,
            target_id = %entry.target.id,
            scope = %entry.scope,
            "Dispatch registered"
        );
        self.entries.insert(action_id, entry);
        action_id
    }

    /// Store the task handle of a registered dispatch. Returns false when the
    /// dispatch already finished and unregistered itself; the handle is
    /// dropped in that case.
    pub fn attach_handle(&self, action_id: Uuid, handle: JoinHandle<DispatchOutcome>) -> bool {
        match self.entries.get_mut(&action_id) {
            Some(mut entry) => {
                entry.handle = Some(handle);
                true
            }
            None => false,
        }
    }

    pub fn unregister(&self, action_id: Uuid) -> Option<RegistryEntry> {
        let removed = self.entries.remove(&action_id).map(|(_, entry)| entry);
        if removed.is_some() {
            debug!(action_id = %action_id, "Dispatch unregistered");
        }
        removed
    }

    /// Take the task handles of every dispatch in `scope`, so the caller can
    /// wait for them to reach a terminal state. Entries stay registered
    /// until their task unregisters them.
    pub fn take_handles(&self, scope: AbortScope) -> Vec<(Uuid, JoinHandle<DispatchOutcome>)> {
        self.entries
            .iter_mut()
            .filter(|entry| entry.scope == scope)
            .filter_map(|mut entry| {
                let action_id = entry.action_id;
                entry.handle.take().map(|handle| (action_id, handle))
            })
            .collect()
    }

    pub fn count_scope(&self, scope: AbortScope) -> usize {
        self.entries.iter().filter(|e| e.scope == scope).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<InFlight> {
        let mut in_flight: Vec<InFlight> = self
            .entries
            .iter()
            .map(|e| InFlight {
                action_id: e.action_id,
                target_id: e.target.id.clone(),
                target_name: e.target.name.clone(),
                telescopes: e.telescope_names(),
                scope: e.scope,
                dispatched_at: e.dispatched_at,
            })
            .collect();
        in_flight.sort_by(|a, b| a.dispatched_at.cmp(&b.dispatched_at));
        in_flight
    }
}
