use super::{ChangeFocus, FocusMove};
use crate::action::{Action, ActionContext};
use crate::cancellation::AbortToken;
use crate::devices::{DeviceCommand, Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::log_action_operation;
use async_trait::async_trait;
use tracing::warn;

const NAME: &str = "ChangeFilter";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilterParams {
    pub filter: String,
    /// Move the focuser by the filter-pair offset before selecting the filter.
    pub apply_focus_offset: bool,
}

impl ChangeFilterParams {
    pub fn new<F: Into<String>>(filter: F) -> Self {
        Self {
            filter: filter.into(),
            apply_focus_offset: false,
        }
    }

    pub fn with_focus_offset(mut self) -> Self {
        self.apply_focus_offset = true;
        self
    }
}

/// Select a filter, optionally preceded by the relative focus-offset move.
/// If the offset move fails the filter wheel is not touched.
#[derive(Debug)]
pub struct ChangeFilter {
    ctx: ActionContext,
}

impl ChangeFilter {
    pub fn new(telescope: Telescope, abort: AbortToken) -> Self {
        Self {
            ctx: ActionContext::new(telescope, abort),
        }
    }

    fn subsystems(params: &ChangeFilterParams) -> &'static [Subsystem] {
        if params.apply_focus_offset {
            &[Subsystem::FilterWheel, Subsystem::Focuser]
        } else {
            &[Subsystem::FilterWheel]
        }
    }
}

#[async_trait]
impl Action for ChangeFilter {
    type Params = ChangeFilterParams;
    type Output = ();
    type Progress = ();

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&mut self, params: ChangeFilterParams) -> ActionResult<()> {
        let subsystems = Self::subsystems(&params);
        self.ctx.enter(NAME, subsystems).await?;

        let device = self.ctx.telescope().device().clone();
        let telescope = self.ctx.telescope_name().to_string();

        let current = device
            .current_filter()
            .await
            .map_err(|e| ActionError::from_device(NAME, &telescope, e))?;
        if current == params.filter {
            log_action_operation(NAME, &telescope, "skipped", Some(&format!("already at {current}")));
            return Ok(());
        }

        if params.apply_focus_offset {
            let offset = device
                .focus_offset(&params.filter)
                .await
                .map_err(|e| ActionError::from_device(NAME, &telescope, e))?;
            let mut focus = ChangeFocus::new(self.ctx.telescope().clone(), self.ctx.abort_token().clone());
            if let Err(e) = focus.run(FocusMove::By(offset)).await {
                warn!(
                    telescope = %telescope,
                    from = %current,
                    to = %params.filter,
                    offset = offset,
                    error = %e,
                    "Focus offset failed, filter left unchanged"
                );
                return Err(e.within(NAME));
            }
            self.ctx.checkpoint(NAME, subsystems).await?;
        }

        log_action_operation(
            NAME,
            &telescope,
            "started",
            Some(&format!("{current} -> {}", params.filter)),
        );
        self.ctx
            .execute(
                NAME,
                DeviceCommand::MoveFilter {
                    filter: params.filter.clone(),
                },
            )
            .await?;
        self.ctx.checkpoint(NAME, subsystems).await?;
        log_action_operation(NAME, &telescope, "completed", None);
        Ok(())
    }

    async fn abort(&self) {
        self.ctx
            .halt(&[Subsystem::FilterWheel, Subsystem::Focuser])
            .await;
    }
}
