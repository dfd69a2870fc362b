use super::{Autofocus, AutofocusParams};
use crate::action::level1::{ChangeFilter, ChangeFilterParams, Exposure, ExposureParams, Slew};
use crate::action::{Action, ActionContext, FocusHistory, ObservationProgress};
use crate::cancellation::AbortToken;
use crate::config::AutofocusConfig;
use crate::devices::{Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::{log_action_operation, log_error};
use crate::models::{Coordinates, ExposurePlan};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

const NAME: &str = "SingleObservation";

/// Everything one telescope needs to observe one target.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationParams {
    pub target_id: String,
    pub coordinates: Coordinates,
    pub plan: ExposurePlan,
    pub autofocus: AutofocusConfig,
    /// Frames completed by an earlier, preempted attempt.
    pub resume: Option<ObservationProgress>,
}

/// Slew, optionally autofocus, then expose every frame of the plan.
///
/// The cancellation scope is checked between every stage and every frame.
/// Frames already taken stay in [`ObservationProgress`] whatever the outcome.
#[derive(Debug)]
pub struct SingleObservation {
    ctx: ActionContext,
    history: FocusHistory,
    progress: ObservationProgress,
    last_autofocus: Option<DateTime<Utc>>,
}

impl SingleObservation {
    pub fn new(telescope: Telescope, abort: AbortToken, history: FocusHistory) -> Self {
        Self {
            ctx: ActionContext::new(telescope, abort),
            history,
            progress: ObservationProgress::default(),
            last_autofocus: None,
        }
    }

    fn should_autofocus(
        &self,
        policy: &AutofocusConfig,
        filter: &str,
        first_stage: bool,
        filter_changed: bool,
    ) -> bool {
        let now = Utc::now();
        let elapsed_due = policy.when_elapsed
            && self.last_autofocus.is_some_and(|at| {
                now.signed_duration_since(at)
                    .to_std()
                    .is_ok_and(|age| age >= policy.elapsed_duration())
            });
        let wanted = (first_stage && policy.before_start)
            || (!first_stage && filter_changed && policy.when_filter_change)
            || elapsed_due;
        if !wanted {
            return false;
        }

        if policy.use_history {
            if let Some(record) = self.history.fresh(
                self.ctx.telescope_name(),
                filter,
                now,
                policy.history_duration(),
            ) {
                debug!(
                    telescope = %self.ctx.telescope_name(),
                    filter = %filter,
                    position = record.position,
                    "Reusing recent autofocus solution"
                );
                return false;
            }
        }
        true
    }

    async fn stage<T, F>(&self, stage: &str, target_id: &str, fut: F) -> ActionResult<T>
    where
        F: std::future::Future<Output = ActionResult<T>> + Send,
        T: Send,
    {
        fut.await.map_err(|e| {
            if !e.is_aborted() {
                log_error(
                    NAME,
                    stage,
                    &e.to_string(),
                    Some(&format!("target {target_id} on {}", self.ctx.telescope_name())),
                );
            }
            e.within(NAME)
        })
    }
}

#[async_trait]
impl Action for SingleObservation {
    type Params = ObservationParams;
    type Output = ObservationProgress;
    type Progress = ObservationProgress;

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&mut self, params: ObservationParams) -> ActionResult<ObservationProgress> {
        // Filter changes apply focus offsets, so the focuser is always needed
        let subsystems = &Subsystem::ALL;
        let telescope = self.ctx.telescope().clone();
        let abort = self.ctx.abort_token().clone();
        self.progress = params.resume.clone().unwrap_or_default();

        self.ctx.enter(NAME, subsystems).await?;

        if params.plan.steps.is_empty() {
            return Err(ActionError::failed(
                NAME,
                telescope.name(),
                "exposure plan has no steps",
            ));
        }
        if self.progress.is_complete(&params.plan) {
            info!(
                telescope = %telescope.name(),
                target_id = %params.target_id,
                "Nothing left to observe"
            );
            return Ok(self.progress.clone());
        }

        let resumed = self.progress.total_completed();
        log_action_operation(
            NAME,
            telescope.name(),
            "started",
            Some(&format!(
                "target {} ({} of {} frames already done)",
                params.target_id,
                resumed,
                params.plan.total_frames()
            )),
        );

        let mut slew = Slew::new(telescope.clone(), abort.clone());
        self.stage("slew", &params.target_id, slew.run(params.coordinates))
            .await?;

        let mut previous_filter: Option<String> = None;
        let mut first_stage = true;

        for (index, step) in params.plan.steps.iter().enumerate() {
            let done = self.progress.completed_in_step(index);
            if done >= step.count {
                continue;
            }
            self.ctx.checkpoint(NAME, subsystems).await?;

            let filter_changed = previous_filter.as_deref() != Some(step.filter.as_str());
            if self.should_autofocus(&params.autofocus, &step.filter, first_stage, filter_changed) {
                let mut autofocus = Autofocus::new(telescope.clone(), abort.clone())
                    .with_history(self.history.clone());
                let focus = autofocus.run(AutofocusParams {
                    filter: step.filter.clone(),
                    use_offset: true,
                });
                self.stage("autofocus", &params.target_id, focus).await?;
                self.last_autofocus = Some(Utc::now());
            } else if filter_changed {
                let mut change = ChangeFilter::new(telescope.clone(), abort.clone());
                let params_filter = ChangeFilterParams::new(step.filter.clone()).with_focus_offset();
                self.stage("change_filter", &params.target_id, change.run(params_filter))
                    .await?;
            }
            previous_filter = Some(step.filter.clone());
            first_stage = false;

            for frame_number in done..step.count {
                self.ctx.checkpoint(NAME, subsystems).await?;
                let mut exposure = Exposure::new(telescope.clone(), abort.clone());
                let shot = exposure.run(ExposureParams {
                    exptime: step.exptime,
                    filter: step.filter.clone(),
                    binning: step.binning,
                    gain: params.plan.gain,
                    frame_number,
                });
                let frame = self.stage("exposure", &params.target_id, shot).await?;
                self.progress.record_frame(index, frame);
            }
        }

        log_action_operation(
            NAME,
            telescope.name(),
            "completed",
            Some(&format!(
                "target {} ({} frames)",
                params.target_id,
                self.progress.total_completed()
            )),
        );
        Ok(self.progress.clone())
    }

    async fn abort(&self) {
        self.ctx.halt(&Subsystem::ALL).await;
    }

    fn progress(&self) -> ObservationProgress {
        self.progress.clone()
    }
}
