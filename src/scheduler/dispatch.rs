//! Non-blocking dispatch of one target onto allocated telescopes.
//!
//! A dispatch is registered before its task is spawned, so it is visible to
//! preemption from the moment the loop hands control back. The task reports
//! its terminal status to the store, unregisters itself, and only then
//! returns its telescopes to the pool.

use super::collaborators::TargetStore;
use super::modes::{ModeContext, ModeRun, ModeTable};
use crate::action::{FocusHistory, ObservationProgress};
use crate::cancellation::{AbortScope, AbortToken};
use crate::config::AutofocusConfig;
use crate::constants::TargetStatus;
use crate::devices::Telescope;
use crate::error::{ActionError, PilotError, Result};
use crate::logging::{log_dispatch_operation, log_error};
use crate::models::Target;
use crate::pool::{ActionRegistry, RegistryEntry, ResourcePool};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What a dispatch task hands back when it terminates.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub action_id: Uuid,
    pub target: Target,
    pub telescopes: Vec<String>,
    pub scope: AbortScope,
    pub status: TargetStatus,
    pub error: Option<ActionError>,
    /// Per-telescope progress at termination; the resume hint after an abort.
    pub progress: BTreeMap<String, ObservationProgress>,
}

/// Spawns dispatch tasks and keeps registry, pool and store consistent.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn TargetStore>,
    pool: Arc<ResourcePool>,
    registry: ActionRegistry,
    modes: ModeTable,
    autofocus: AutofocusConfig,
    history: FocusHistory,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("modes", &self.modes)
            .field("in_flight", &self.registry.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn TargetStore>,
        pool: Arc<ResourcePool>,
        registry: ActionRegistry,
        modes: ModeTable,
        autofocus: AutofocusConfig,
        history: FocusHistory,
    ) -> Self {
        Self {
            store,
            pool,
            registry,
            modes,
            autofocus,
            history,
        }
    }

    pub fn modes(&self) -> &ModeTable {
        &self.modes
    }

    /// Start `target` on `telescopes` under `token` and return immediately.
    ///
    /// The telescopes must already be allocated to the caller. On error they
    /// are returned to the pool and nothing is registered.
    pub async fn dispatch(
        &self,
        target: Target,
        telescopes: Vec<Telescope>,
        scope: AbortScope,
        token: AbortToken,
        resume: BTreeMap<String, ObservationProgress>,
    ) -> Result<Uuid> {
        if telescopes.is_empty() {
            return Err(PilotError::Allocation(format!(
                "target {} dispatched without telescopes",
                target.id
            )));
        }
        let Some(runner) = self.modes.runner(target.mode.kind()) else {
            self.pool.release(&telescopes);
            return Err(PilotError::Dispatch(format!(
                "no runner registered for mode {}",
                target.mode.kind()
            )));
        };

        if let Err(e) = self
            .store
            .update_status(&target.id, TargetStatus::Scheduled)
            .await
        {
            self.pool.release(&telescopes);
            return Err(e);
        }

        let entry = RegistryEntry::new(target.clone(), telescopes.clone(), scope, token.clone());
        let names = entry.telescope_names();
        let action_id = self.registry.register(entry);
        log_dispatch_operation(
            "dispatched",
            &action_id.to_string(),
            &target.id,
            &scope.to_string(),
            &names,
            if resume.is_empty() { None } else { Some("resumed") },
        );

        let ctx = ModeContext {
            target: target.clone(),
            telescopes: telescopes.clone(),
            abort: token,
            resume: resume.clone(),
            autofocus: self.autofocus.clone(),
            history: self.history.clone(),
        };
        let store = self.store.clone();
        let pool = self.pool.clone();
        let registry = self.registry.clone();

        let handle = tokio::spawn(async move {
            // Run in a nested task so a panicking action still releases its telescopes
            let run = match tokio::spawn(async move { runner.run(ctx).await }).await {
                Ok(run) => run,
                Err(join_error) => ModeRun {
                    result: Err(ActionError::failed(
                        "Dispatch",
                        &names.join(","),
                        format!("action task ended abnormally: {join_error}"),
                    )),
                    progress: resume,
                },
            };

            let (status, error) = match run.result {
                Ok(()) => (TargetStatus::Observed, None),
                Err(e) if e.is_aborted() => (TargetStatus::Aborted, Some(e)),
                Err(e) => (TargetStatus::Failed, Some(e)),
            };

            if let Err(e) = store.update_status(&target.id, status).await {
                log_error(
                    "dispatch",
                    "update_status",
                    &e.to_string(),
                    Some(&format!("target {} -> {status}", target.id)),
                );
            }

            registry.unregister(action_id);
            pool.release(&telescopes);

            match &error {
                None => info!(
                    action_id = %action_id,
                    target_id = %target.id,
                    telescopes = ?names,
                    "Dispatch observed"
                ),
                Some(e) => warn!(
                    action_id = %action_id,
                    target_id = %target.id,
                    status = %status,
                    error = %e,
                    "Dispatch ended without observing"
                ),
            }
            log_dispatch_operation(
                "finished",
                &action_id.to_string(),
                &target.id,
                &scope.to_string(),
                &names,
                Some(&status.to_string()),
            );

            DispatchOutcome {
                action_id,
                target,
                telescopes: names,
                scope,
                status,
                error,
                progress: run.progress,
            }
        });

        self.registry.attach_handle(action_id, handle);
        Ok(action_id)
    }
}
