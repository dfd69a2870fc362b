use crate::action::{Action, ActionContext};
use crate::cancellation::AbortToken;
use crate::devices::{DeviceCommand, Subsystem, SubsystemStatus, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::log_action_operation;
use crate::models::Coordinates;
use async_trait::async_trait;

const NAME: &str = "Slew";

/// Point the mount at RA/Dec or Alt/Az. `Coordinates::Fixed` keeps the
/// current pointing and touches no hardware.
#[derive(Debug)]
pub struct Slew {
    ctx: ActionContext,
}

impl Slew {
    pub fn new(telescope: Telescope, abort: AbortToken) -> Self {
        Self {
            ctx: ActionContext::new(telescope, abort),
        }
    }
}

#[async_trait]
impl Action for Slew {
    type Params = Coordinates;
    type Output = ();
    type Progress = ();

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&mut self, coordinates: Coordinates) -> ActionResult<()> {
        self.ctx.enter(NAME, &[Subsystem::Mount]).await?;

        let command = match coordinates {
            Coordinates::RaDec { ra, dec } => DeviceCommand::SlewRaDec { ra, dec },
            Coordinates::AltAz { alt, az } => {
                if !(0.0..=90.0).contains(&alt) {
                    return Err(ActionError::failed(
                        NAME,
                        self.ctx.telescope_name(),
                        format!("altitude {alt} is below the horizon or out of range"),
                    ));
                }
                DeviceCommand::SlewAltAz { alt, az }
            }
            Coordinates::Fixed => {
                log_action_operation(NAME, self.ctx.telescope_name(), "skipped", Some("fixed pointing"));
                return Ok(());
            }
        };

        if self.ctx.telescope().device().status(Subsystem::Mount).await == SubsystemStatus::Parked {
            return Err(ActionError::failed(
                NAME,
                self.ctx.telescope_name(),
                "mount is parked",
            ));
        }

        log_action_operation(NAME, self.ctx.telescope_name(), "started", None);
        self.ctx.execute(NAME, command).await?;
        self.ctx.checkpoint(NAME, &[Subsystem::Mount]).await?;
        log_action_operation(NAME, self.ctx.telescope_name(), "completed", None);
        Ok(())
    }

    async fn abort(&self) {
        self.ctx.halt(&[Subsystem::Mount]).await;
    }
}
