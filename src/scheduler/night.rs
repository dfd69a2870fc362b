//! # Night Scheduler
//!
//! One long-lived control loop per night:
//!
//! ```text
//! WaitingForWindow ──► Running ──► Finished
//!                      │    ▲
//!                      ▼    │
//!          AwaitingToo / AwaitingSafe
//! ```
//!
//! The loop only suspends at its polling sleeps and at explicit drain points
//! (preemption, ToO drain, shutdown). Dispatched work runs in its own tasks;
//! see [`Dispatcher`].

use super::collaborators::{Clock, Ephemeris, ObservingWindow, SafetyMonitor, TargetStore};
use super::dispatch::Dispatcher;
use super::modes::ModeTable;
use crate::action::{FocusHistory, ObservationProgress};
use crate::cancellation::{AbortScope, AbortToken};
use crate::config::PilotConfig;
use crate::constants::{SchedulerPhase, TargetStatus};
use crate::error::{PilotError, Result};
use crate::logging::log_error;
use crate::models::Target;
use crate::pool::{ActionRegistry, Allocation, InFlight, ResourcePool};
use crate::scoring::{ScoringConstraints, TargetScorer};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// External systems the scheduler consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn TargetStore>,
    pub ephemeris: Arc<dyn Ephemeris>,
    pub safety: Arc<dyn SafetyMonitor>,
    pub clock: Arc<dyn Clock>,
}

/// Work cancelled by a preemption, waiting to be resumed.
#[derive(Debug, Clone)]
pub struct PreemptedEntry {
    pub target: Target,
    pub telescopes: Vec<String>,
    pub progress: BTreeMap<String, ObservationProgress>,
    pub preempted_at: DateTime<Utc>,
}

/// Counters of one night.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NightSummary {
    pub dispatched: usize,
    pub resumed: usize,
    pub preempted: usize,
    pub abandoned: usize,
    pub too_dispatched: usize,
    /// Targets marked `failed` by the scheduler itself because they can
    /// never be run (too many telescopes, unrepresentable exposure).
    pub rejected: usize,
}

#[derive(Debug)]
struct ScopeTokens {
    observation: AbortToken,
    too: AbortToken,
}

impl ScopeTokens {
    fn new() -> Self {
        Self {
            observation: AbortToken::new(&AbortScope::Observation.to_string()),
            too: AbortToken::new(&AbortScope::TargetOfOpportunity.to_string()),
        }
    }

    fn get(&self, scope: AbortScope) -> AbortToken {
        match scope {
            AbortScope::Observation => self.observation.clone(),
            AbortScope::TargetOfOpportunity => self.too.clone(),
        }
    }

    fn renew(&mut self, scope: AbortScope) {
        let fresh = AbortToken::new(&scope.to_string());
        match scope {
            AbortScope::Observation => self.observation = fresh,
            AbortScope::TargetOfOpportunity => self.too = fresh,
        }
    }
}

/// What happened to one dispatch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Dispatched,
    /// Not now; the target stays pending.
    Deferred,
    /// Never; the target has been marked failed.
    Rejected,
}

/// Why a ToO sub-loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TooExit {
    /// No ToO pending and none in flight.
    Drained,
    WindowClosed,
    Unsafe,
    Shutdown,
}

pub struct NightScheduler {
    config: PilotConfig,
    collaborators: Collaborators,
    pool: Arc<ResourcePool>,
    registry: ActionRegistry,
    scorer: TargetScorer,
    dispatcher: Dispatcher,
    scopes: Mutex<ScopeTokens>,
    shutdown: AbortToken,
    phase: Mutex<SchedulerPhase>,
    preempted: Mutex<Vec<PreemptedEntry>>,
    summary: Mutex<NightSummary>,
}

impl std::fmt::Debug for NightScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NightScheduler")
            .field("phase", &self.phase())
            .field("idle", &self.pool.idle_count())
            .field("in_flight", &self.registry.len())
            .field("preempted", &self.preempted.lock().len())
            .finish()
    }
}

impl NightScheduler {
    /// Scheduler with the built-in mode table.
    pub fn new(config: PilotConfig, pool: Arc<ResourcePool>, collaborators: Collaborators) -> Self {
        let modes = ModeTable::standard(config.spectroscopy.clone());
        Self::with_modes(config, pool, collaborators, modes)
    }

    pub fn with_modes(
        config: PilotConfig,
        pool: Arc<ResourcePool>,
        collaborators: Collaborators,
        modes: ModeTable,
    ) -> Self {
        let registry = ActionRegistry::new();
        let dispatcher = Dispatcher::new(
            collaborators.store.clone(),
            pool.clone(),
            registry.clone(),
            modes,
            config.autofocus.clone(),
            FocusHistory::new(),
        );
        Self {
            scorer: TargetScorer::new(ScoringConstraints::from(&config.scoring)),
            config,
            collaborators,
            pool,
            registry,
            dispatcher,
            scopes: Mutex::new(ScopeTokens::new()),
            shutdown: AbortToken::new("scheduler"),
            phase: Mutex::new(SchedulerPhase::WaitingForWindow),
            preempted: Mutex::new(Vec::new()),
            summary: Mutex::new(NightSummary::default()),
        }
    }

    /// Global cancellation handle. Aborting it terminates [`run`](Self::run)
    /// after all in-flight work has been preempted.
    pub fn shutdown_handle(&self) -> AbortToken {
        self.shutdown.clone()
    }

    pub fn phase(&self) -> SchedulerPhase {
        *self.phase.lock()
    }

    pub fn in_flight(&self) -> Vec<InFlight> {
        self.registry.snapshot()
    }

    pub fn preempted(&self) -> Vec<PreemptedEntry> {
        self.preempted.lock().clone()
    }

    pub fn pool(&self) -> &Arc<ResourcePool> {
        &self.pool
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn summary(&self) -> NightSummary {
        self.summary.lock().clone()
    }

    /// Current token of a cancellation scope.
    pub fn scope_token(&self, scope: AbortScope) -> AbortToken {
        self.scopes.lock().get(scope)
    }

    /// Run the night to completion.
    ///
    /// Returns the night's counters when the observing window ends, or
    /// [`PilotError::SchedulerAborted`] when the shutdown handle fires.
    pub async fn run(&self) -> Result<NightSummary> {
        let window = self
            .collaborators
            .ephemeris
            .observing_window(self.now());
        info!(
            start = %window.start,
            end = %window.end,
            "Night scheduler waiting for observing window"
        );

        self.set_phase(SchedulerPhase::WaitingForWindow);
        loop {
            if self.shutdown.is_aborted() {
                return self.shut_down().await;
            }
            let now = self.now();
            if now >= window.end {
                return Ok(self.finish());
            }
            if now >= window.start {
                break;
            }
            self.pause(self.config.scheduler.window_poll_interval()).await;
        }

        info!("Observing window open, scheduler running");
        self.set_phase(SchedulerPhase::Running);

        loop {
            if self.shutdown.is_aborted() {
                return self.shut_down().await;
            }
            let now = self.now();
            if now >= window.end {
                return Ok(self.finish());
            }

            self.iterate(now, &window).await;
            self.pause(self.config.scheduler.loop_interval()).await;
        }
    }

    /// One pass of the main loop body.
    async fn iterate(&self, now: DateTime<Utc>, window: &ObservingWindow) {
        let store = &self.collaborators.store;

        match store.refresh_stale(now).await {
            Ok(0) => {}
            Ok(refreshed) => debug!(refreshed = refreshed, "Refreshed stale targets"),
            Err(e) => log_error("scheduler", "refresh_stale", &e.to_string(), None),
        }

        let candidates = match store.pending_targets().await {
            Ok(candidates) => candidates,
            Err(e) => {
                log_error("scheduler", "pending_targets", &e.to_string(), None);
                return;
            }
        };
        let best = self
            .scorer
            .best_target(&candidates, now, self.collaborators.ephemeris.as_ref());

        if !self.collaborators.safety.is_safe().await {
            if self.phase() != SchedulerPhase::AwaitingSafe {
                warn!("Conditions unsafe, preempting all in-flight work");
            }
            self.preempt_all().await;
            self.set_phase(SchedulerPhase::AwaitingSafe);
            return;
        }
        if self.phase() == SchedulerPhase::AwaitingSafe {
            info!("Conditions safe again");
            self.set_phase(SchedulerPhase::Running);
        }

        if !self.preempted.lock().is_empty() {
            self.resume_preempted(now).await;
            return;
        }

        let Some(best) = best else {
            debug!("No observable target");
            return;
        };

        if best.target.is_too() {
            self.handle_too(window).await;
            return;
        }

        debug!(target_id = %best.target.id, score = best.score, "Best target selected");
        if self.dispatch_new(best.target, AbortScope::Observation).await == Attempt::Dispatched {
            self.summary.lock().dispatched += 1;
        }
    }

    /// Allocate telescopes for `target` per its mode and dispatch it.
    async fn dispatch_new(&self, target: Target, scope: AbortScope) -> Attempt {
        let Some(runner) = self.dispatcher.modes().runner(target.mode.kind()) else {
            warn!(target_id = %target.id, mode = %target.mode.kind(), "No runner for observation mode");
            return Attempt::Deferred;
        };

        let telescopes = match self.pool.allocate(runner.allocation(&target.mode)) {
            Allocation::Granted(telescopes) => telescopes,
            Allocation::Unavailable { requested, idle } => {
                debug!(
                    target_id = %target.id,
                    requested = requested,
                    idle = idle,
                    "Not enough idle telescopes, retrying later"
                );
                return Attempt::Deferred;
            }
            Allocation::Exceeded {
                requested,
                capacity,
            } => {
                self.reject(
                    &target,
                    &format!("needs {requested} telescopes, the fleet has {capacity}"),
                )
                .await;
                return Attempt::Rejected;
            }
        };

        let token = self.scope_token(scope);
        match self
            .dispatcher
            .dispatch(target.clone(), telescopes, scope, token, BTreeMap::new())
            .await
        {
            Ok(_) => Attempt::Dispatched,
            Err(e) => {
                log_error("scheduler", "dispatch", &e.to_string(), Some(&target.id));
                Attempt::Deferred
            }
        }
    }

    /// Mark a target that can never run as `failed` so it stops heading the
    /// candidate list.
    async fn reject(&self, target: &Target, reason: &str) {
        warn!(target_id = %target.id, reason = reason, "Target can never run, marking failed");
        match self
            .collaborators
            .store
            .update_status(&target.id, TargetStatus::Failed)
            .await
        {
            Ok(()) => self.summary.lock().rejected += 1,
            Err(e) => log_error("scheduler", "reject", &e.to_string(), Some(&target.id)),
        }
    }

    /// Preempt both scopes, ToO first.
    async fn preempt_all(&self) -> usize {
        let too = self.preempt(AbortScope::TargetOfOpportunity).await;
        too + self.preempt(AbortScope::Observation).await
    }

    /// Abort every in-flight dispatch of `scope`, wait for each to reach a
    /// terminal state, and move the aborted ones into the preempted list.
    /// The scope gets a fresh token afterwards.
    async fn preempt(&self, scope: AbortScope) -> usize {
        let handles = self.registry.take_handles(scope);
        let token = self.scope_token(scope);
        token.abort();

        let mut preempted = 0;
        for (action_id, handle) in handles {
            match handle.await {
                Ok(outcome) if outcome.status == TargetStatus::Aborted => {
                    info!(
                        action_id = %action_id,
                        target_id = %outcome.target.id,
                        scope = %scope,
                        "Dispatch preempted"
                    );
                    self.preempted.lock().push(PreemptedEntry {
                        target: outcome.target,
                        telescopes: outcome.telescopes,
                        progress: outcome.progress,
                        preempted_at: self.now(),
                    });
                    preempted += 1;
                }
                Ok(outcome) => debug!(
                    action_id = %action_id,
                    target_id = %outcome.target.id,
                    status = %outcome.status,
                    "Dispatch finished before preemption took effect"
                ),
                Err(join_error) => log_error(
                    "scheduler",
                    "preempt",
                    &join_error.to_string(),
                    Some(&action_id.to_string()),
                ),
            }
        }

        self.scopes.lock().renew(scope);
        if preempted > 0 {
            self.summary.lock().preempted += preempted;
        }
        preempted
    }

    /// Redispatch preempted work that is still observable for its whole
    /// exposure, on the same telescopes and under the current (fresh) scope.
    /// ToO entries go first. Entries whose telescopes are busy stay queued.
    async fn resume_preempted(&self, now: DateTime<Utc>) {
        let mut entries = std::mem::take(&mut *self.preempted.lock());
        entries.sort_by_key(|entry| !entry.target.is_too());
        let mut waiting = Vec::new();
        let mut first = true;

        for entry in entries {
            if self.shutdown.is_aborted() {
                waiting.push(entry);
                continue;
            }

            let finish_at = match finish_time(&entry.target, now) {
                Ok(finish_at) => finish_at,
                Err(e) => {
                    self.reject(&entry.target, &e.to_string()).await;
                    continue;
                }
            };
            if !self.scorer.is_observable(
                &entry.target,
                finish_at,
                self.collaborators.ephemeris.as_ref(),
            ) {
                info!(
                    target_id = %entry.target.id,
                    finish_at = %finish_at,
                    "Preempted target no longer observable, left aborted"
                );
                self.summary.lock().abandoned += 1;
                continue;
            }

            let telescopes = match self.pool.allocate_named(&entry.telescopes) {
                Allocation::Granted(telescopes) => telescopes,
                Allocation::Unavailable { .. } | Allocation::Exceeded { .. } => {
                    debug!(
                        target_id = %entry.target.id,
                        telescopes = ?entry.telescopes,
                        "Telescopes of preempted target still busy"
                    );
                    waiting.push(entry);
                    continue;
                }
            };

            if !first {
                self.pause(self.config.scheduler.resume_stagger()).await;
            }
            first = false;

            let scope = if entry.target.is_too() {
                AbortScope::TargetOfOpportunity
            } else {
                AbortScope::Observation
            };
            let token = self.scope_token(scope);
            match self
                .dispatcher
                .dispatch(entry.target.clone(), telescopes, scope, token, entry.progress.clone())
                .await
            {
                Ok(action_id) => {
                    info!(
                        action_id = %action_id,
                        target_id = %entry.target.id,
                        "Preempted target resumed"
                    );
                    self.summary.lock().resumed += 1;
                }
                Err(e) => {
                    log_error("scheduler", "resume", &e.to_string(), Some(&entry.target.id));
                    waiting.push(entry);
                }
            }
        }

        self.preempted.lock().extend(waiting);
    }

    /// Preempt ordinary work, then keep dispatching ToO targets under the ToO
    /// scope and wait for them to drain. Safety and shutdown are polled the
    /// whole time: unsafe conditions preempt the ToO dispatches, so they are
    /// resumed with the rest once it is safe again.
    async fn handle_too(&self, window: &ObservingWindow) {
        info!("Target of opportunity detected, preempting ordinary observations");
        self.set_phase(SchedulerPhase::AwaitingToo);
        self.preempt(AbortScope::Observation).await;

        let exit = loop {
            if self.shutdown.is_aborted() {
                break TooExit::Shutdown;
            }
            if !self.collaborators.safety.is_safe().await {
                break TooExit::Unsafe;
            }
            let now = self.now();
            if now >= window.end {
                break TooExit::WindowClosed;
            }

            let candidates = match self.collaborators.store.pending_targets().await {
                Ok(candidates) => candidates,
                Err(e) => {
                    log_error("scheduler", "pending_targets", &e.to_string(), Some("too"));
                    self.pause(self.config.scheduler.loop_interval()).await;
                    continue;
                }
            };
            let Some(best) = self.scorer.best_matching(
                &candidates,
                now,
                self.collaborators.ephemeris.as_ref(),
                Target::is_too,
            ) else {
                if self.registry.count_scope(AbortScope::TargetOfOpportunity) == 0 {
                    break TooExit::Drained;
                }
                self.pause(self.config.scheduler.drain_poll_interval()).await;
                continue;
            };

            match self
                .dispatch_new(best.target, AbortScope::TargetOfOpportunity)
                .await
            {
                Attempt::Dispatched => self.summary.lock().too_dispatched += 1,
                Attempt::Deferred | Attempt::Rejected => {}
            }
            self.pause(self.config.scheduler.loop_interval()).await;
        };

        info!(reason = ?exit, "Leaving ToO handling");
        match exit {
            TooExit::Drained | TooExit::WindowClosed => self.set_phase(SchedulerPhase::Running),
            TooExit::Unsafe => {
                warn!("Conditions unsafe during ToO handling, preempting ToO dispatches");
                self.preempt(AbortScope::TargetOfOpportunity).await;
                self.set_phase(SchedulerPhase::AwaitingSafe);
            }
            // the main loop preempts everything on its way out
            TooExit::Shutdown => {}
        }
    }

    async fn shut_down(&self) -> Result<NightSummary> {
        warn!(
            in_flight = self.registry.len(),
            "Shutdown requested, preempting all in-flight work"
        );
        self.preempt_all().await;

        if self.config.scheduler.retract_too_on_shutdown {
            self.retract_pending_too().await;
        }

        self.set_phase(SchedulerPhase::Finished);
        Err(PilotError::SchedulerAborted(
            "global abort signal received".to_string(),
        ))
    }

    async fn retract_pending_too(&self) {
        let store = &self.collaborators.store;
        let pending = match store.pending_targets().await {
            Ok(pending) => pending,
            Err(e) => {
                log_error("scheduler", "retract_too", &e.to_string(), None);
                return;
            }
        };
        for target in pending
            .iter()
            .filter(|t| t.is_too() && t.status == TargetStatus::Unscheduled)
        {
            match store
                .update_status(&target.id, TargetStatus::Retracted)
                .await
            {
                Ok(()) => info!(target_id = %target.id, "Pending ToO retracted"),
                Err(e) => log_error("scheduler", "retract_too", &e.to_string(), Some(&target.id)),
            }
        }
    }

    fn finish(&self) -> NightSummary {
        self.set_phase(SchedulerPhase::Finished);
        let summary = self.summary();
        info!(
            dispatched = summary.dispatched,
            resumed = summary.resumed,
            preempted = summary.preempted,
            still_running = self.registry.len(),
            "Observing window closed, scheduler finished"
        );
        summary
    }

    fn now(&self) -> DateTime<Utc> {
        self.collaborators.clock.now()
    }

    fn set_phase(&self, phase: SchedulerPhase) {
        let mut current = self.phase.lock();
        if *current != phase {
            debug!(from = %*current, to = %phase, "Scheduler phase change");
            *current = phase;
        }
    }

    /// Sleep, waking early if shutdown fires.
    async fn pause(&self, duration: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.aborted() => {}
        }
    }
}

/// When `target` would finish if started at `now`.
fn finish_time(target: &Target, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let exposure = target.total_exposure()?;
    ChronoDuration::from_std(exposure)
        .ok()
        .and_then(|exposure| now.checked_add_signed(exposure))
        .ok_or_else(|| PilotError::InvalidTarget {
            target_id: target.id.clone(),
            reason: format!("exposure of {exposure:?} ends beyond the representable date range"),
        })
}
