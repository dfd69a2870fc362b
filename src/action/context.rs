use crate::cancellation::AbortToken;
use crate::devices::{DeviceCommand, DeviceReply, Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::logging::log_action_operation;
use tracing::{debug, warn};

/// Binding of one action instance to its telescope and cancellation scope.
///
/// Shared by every action level; owns the entry checks and the
/// abort-aware device call.
#[derive(Debug, Clone)]
pub struct ActionContext {
    telescope: Telescope,
    abort: AbortToken,
}

impl ActionContext {
    pub fn new(telescope: Telescope, abort: AbortToken) -> Self {
        Self { telescope, abort }
    }

    pub fn telescope(&self) -> &Telescope {
        &self.telescope
    }

    pub fn telescope_name(&self) -> &str {
        self.telescope.name()
    }

    pub fn abort_token(&self) -> &AbortToken {
        &self.abort
    }

    pub fn is_aborted(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Fail with `Connection` for the first required subsystem that is
    /// disconnected. Performs no device I/O beyond status reads.
    pub async fn ensure_connected(
        &self,
        action: &str,
        subsystems: &[Subsystem],
    ) -> ActionResult<()> {
        for subsystem in subsystems {
            let status = self.telescope.device().status(*subsystem).await;
            if !status.is_connected() {
                warn!(
                    action = action,
                    telescope = %self.telescope.name(),
                    subsystem = %subsystem,
                    "Required subsystem is disconnected"
                );
                return Err(ActionError::connection(
                    action,
                    self.telescope.name(),
                    *subsystem,
                ));
            }
        }
        Ok(())
    }

    /// Entry sequence of every action: connection first, then cancellation.
    pub async fn enter(&self, action: &str, subsystems: &[Subsystem]) -> ActionResult<()> {
        self.ensure_connected(action, subsystems).await?;
        self.checkpoint(action, subsystems).await
    }

    /// Cancellation check between stages. Stops the given subsystems and
    /// fails with `Aborted` if the scope has been cancelled.
    pub async fn checkpoint(&self, action: &str, subsystems: &[Subsystem]) -> ActionResult<()> {
        if self.abort.is_aborted() {
            self.halt(subsystems).await;
            log_action_operation(action, self.telescope.name(), "aborted", None);
            return Err(ActionError::aborted(action, self.telescope.name()));
        }
        Ok(())
    }

    /// Hardware abort for every listed subsystem that is currently busy.
    pub async fn halt(&self, subsystems: &[Subsystem]) {
        let device = self.telescope.device();
        for subsystem in subsystems {
            if device.status(*subsystem).await.is_busy() {
                debug!(
                    telescope = %self.telescope.name(),
                    subsystem = %subsystem,
                    "Issuing hardware abort"
                );
                device.abort(*subsystem).await;
            }
        }
    }

    /// Run one device command, racing it against the cancellation scope.
    ///
    /// When the scope fires first the command future is dropped, the driven
    /// subsystem is stopped and the result is `Aborted`.
    pub async fn execute(&self, action: &str, command: DeviceCommand) -> ActionResult<DeviceReply> {
        let subsystem = command.subsystem();
        let device = self.telescope.device().clone();

        tokio::select! {
            biased;
            _ = self.abort.aborted() => {
                self.halt(&[subsystem]).await;
                log_action_operation(action, self.telescope.name(), "aborted", Some("cancelled mid-operation"));
                Err(ActionError::aborted(action, self.telescope.name()))
            }
            reply = device.run(command) => {
                reply.map_err(|e| ActionError::from_device(action, self.telescope.name(), e))
            }
        }
    }
}
