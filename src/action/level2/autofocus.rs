use crate::action::level1::{ChangeFilter, ChangeFilterParams, ChangeFocus, FocusMove};
use crate::action::{Action, ActionContext, FocusHistory, FocusRecord};
use crate::cancellation::AbortToken;
use crate::devices::{DeviceCommand, DeviceReply, Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::{log_action_operation, log_error};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

const NAME: &str = "Autofocus";
const SUBSYSTEMS: [Subsystem; 3] = [Subsystem::Camera, Subsystem::FilterWheel, Subsystem::Focuser];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutofocusParams {
    pub filter: String,
    /// Apply the filter focus offset when switching filters first.
    pub use_offset: bool,
}

/// Select the filter, then run the device autofocus routine.
///
/// On `ActionFailed` the focuser is moved back to where it started and the
/// failure is re-raised. Results are written to the shared [`FocusHistory`]
/// when one is attached.
#[derive(Debug)]
pub struct Autofocus {
    ctx: ActionContext,
    history: Option<FocusHistory>,
}

impl Autofocus {
    pub fn new(telescope: Telescope, abort: AbortToken) -> Self {
        Self {
            ctx: ActionContext::new(telescope, abort),
            history: None,
        }
    }

    pub fn with_history(mut self, history: FocusHistory) -> Self {
        self.history = Some(history);
        self
    }

    fn remember(&self, filter: &str, position: i32, succeeded: bool) {
        if let Some(history) = &self.history {
            history.record(
                self.ctx.telescope_name(),
                filter,
                FocusRecord {
                    position,
                    succeeded,
                    at: Utc::now(),
                },
            );
        }
    }

    async fn restore_focus(&self, position: i32) {
        // Skipped when the scope is already cancelled
        let mut restore = ChangeFocus::new(self.ctx.telescope().clone(), self.ctx.abort_token().clone());
        if let Err(e) = restore.run(FocusMove::To(position)).await {
            log_error(
                NAME,
                "restore_focus",
                &e.to_string(),
                Some(self.ctx.telescope_name()),
            );
        } else {
            info!(
                telescope = %self.ctx.telescope_name(),
                position = position,
                "Focuser restored after failed autofocus"
            );
        }
    }
}

#[async_trait]
impl Action for Autofocus {
    type Params = AutofocusParams;
    type Output = i32;
    type Progress = ();

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&mut self, params: AutofocusParams) -> ActionResult<i32> {
        self.ctx.enter(NAME, &SUBSYSTEMS).await?;

        let telescope = self.ctx.telescope_name().to_string();
        let prior_position = self
            .ctx
            .telescope()
            .device()
            .focus_position()
            .await
            .map_err(|e| ActionError::from_device(NAME, &telescope, e))?;

        let mut filter_params = ChangeFilterParams::new(params.filter.clone());
        if params.use_offset {
            filter_params = filter_params.with_focus_offset();
        }
        ChangeFilter::new(self.ctx.telescope().clone(), self.ctx.abort_token().clone())
            .run(filter_params)
            .await
            .map_err(|e| e.within(NAME))?;
        self.ctx.checkpoint(NAME, &SUBSYSTEMS).await?;

        log_action_operation(NAME, &telescope, "started", Some(&params.filter));
        let result = self
            .ctx
            .execute(
                NAME,
                DeviceCommand::Autofocus {
                    filter: params.filter.clone(),
                },
            )
            .await;

        match result {
            Ok(DeviceReply::FocusPosition { position }) => {
                self.remember(&params.filter, position, true);
                log_action_operation(NAME, &telescope, "completed", Some(&format!("position {position}")));
                Ok(position)
            }
            Ok(other) => {
                self.remember(&params.filter, prior_position, false);
                self.restore_focus(prior_position).await;
                Err(ActionError::failed(
                    NAME,
                    &telescope,
                    format!("autofocus returned no position: {other:?}"),
                ))
            }
            Err(e @ ActionError::ActionFailed { .. }) => {
                warn!(
                    telescope = %telescope,
                    filter = %params.filter,
                    prior_position = prior_position,
                    error = %e,
                    "Autofocus failed, restoring focuser"
                );
                self.remember(&params.filter, prior_position, false);
                self.restore_focus(prior_position).await;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn abort(&self) {
        self.ctx.halt(&SUBSYSTEMS).await;
    }
}
