use crate::action::{Action, ActionContext};
use crate::cancellation::AbortToken;
use crate::devices::{DeviceCommand, Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::log_action_operation;
use async_trait::async_trait;

const NAME: &str = "ChangeFocus";

/// Focuser move in steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMove {
    By(i32),
    To(i32),
}

#[derive(Debug)]
pub struct ChangeFocus {
    ctx: ActionContext,
}

impl ChangeFocus {
    pub fn new(telescope: Telescope, abort: AbortToken) -> Self {
        Self {
            ctx: ActionContext::new(telescope, abort),
        }
    }
}

#[async_trait]
impl Action for ChangeFocus {
    type Params = FocusMove;
    type Output = ();
    type Progress = ();

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&mut self, movement: FocusMove) -> ActionResult<()> {
        self.ctx.enter(NAME, &[Subsystem::Focuser]).await?;

        if self.ctx.telescope().device().status(Subsystem::Focuser).await.is_busy() {
            return Err(ActionError::failed(
                NAME,
                self.ctx.telescope_name(),
                "focuser is busy",
            ));
        }

        let command = match movement {
            FocusMove::By(0) => return Ok(()),
            FocusMove::By(offset) => DeviceCommand::MoveFocuserBy { offset },
            FocusMove::To(position) => DeviceCommand::MoveFocuserTo { position },
        };

        log_action_operation(NAME, self.ctx.telescope_name(), "started", Some(&format!("{movement:?}")));
        self.ctx.execute(NAME, command).await?;
        self.ctx.checkpoint(NAME, &[Subsystem::Focuser]).await?;
        log_action_operation(NAME, self.ctx.telescope_name(), "completed", None);
        Ok(())
    }

    async fn abort(&self) {
        self.ctx.halt(&[Subsystem::Focuser]).await;
    }
}
