use crate::action::{Action, ActionContext, FrameRecord};
use crate::cancellation::AbortToken;
use crate::devices::{DeviceCommand, DeviceReply, Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::log_action_operation;
use async_trait::async_trait;

const NAME: &str = "Exposure";

#[derive(Debug, Clone, PartialEq)]
pub struct ExposureParams {
    pub exptime: f64,
    pub filter: String,
    pub binning: u32,
    pub gain: u32,
    pub frame_number: u32,
}

/// Take one frame with the filter already in place.
///
/// A frame that finished reading out is returned even if the scope fires
/// right after; the caller records it before its next checkpoint.
#[derive(Debug)]
pub struct Exposure {
    ctx: ActionContext,
}

impl Exposure {
    pub fn new(telescope: Telescope, abort: AbortToken) -> Self {
        Self {
            ctx: ActionContext::new(telescope, abort),
        }
    }
}

#[async_trait]
impl Action for Exposure {
    type Params = ExposureParams;
    type Output = FrameRecord;
    type Progress = ();

    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(&mut self, params: ExposureParams) -> ActionResult<FrameRecord> {
        self.ctx.enter(NAME, &[Subsystem::Camera]).await?;

        let details = format!(
            "frame {} [{}] {}s bin{}",
            params.frame_number, params.filter, params.exptime, params.binning
        );
        log_action_operation(NAME, self.ctx.telescope_name(), "started", Some(&details));

        let reply = self
            .ctx
            .execute(
                NAME,
                DeviceCommand::Expose {
                    exptime: params.exptime,
                    filter: params.filter.clone(),
                    binning: params.binning,
                    gain: params.gain,
                    frame_number: params.frame_number,
                },
            )
            .await?;

        match reply {
            DeviceReply::Frame { path } => {
                log_action_operation(NAME, self.ctx.telescope_name(), "completed", Some(&path));
                Ok(FrameRecord {
                    filter: params.filter,
                    frame_number: params.frame_number,
                    path,
                })
            }
            other => Err(ActionError::failed(
                NAME,
                self.ctx.telescope_name(),
                format!("camera returned no frame: {other:?}"),
            )),
        }
    }

    async fn abort(&self) {
        self.ctx.halt(&[Subsystem::Camera]).await;
    }
}
