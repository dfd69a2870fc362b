use async_trait::async_trait;
use parking_lot::Mutex;
use pilot_core::devices::{DeviceCommand, DeviceFacade, DeviceReply, Subsystem, SubsystemStatus};
use pilot_core::{DeviceError, Telescope};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Scriptable in-process device facade.
///
/// Every command marks its subsystem busy for the configured latency, then
/// idle again. Failures, disconnections and latencies can be changed while
/// actions are running.
#[derive(Debug)]
pub struct MockTelescope {
    name: String,
    state: Mutex<MockState>,
}

#[derive(Debug)]
struct MockState {
    statuses: HashMap<Subsystem, SubsystemStatus>,
    filter: String,
    focus: i32,
    autofocus_result: i32,
    offsets: HashMap<String, i32>,
    latency: HashMap<&'static str, Duration>,
    failures: HashMap<&'static str, String>,
    commands: Vec<DeviceCommand>,
    aborts: Vec<Subsystem>,
}

/// Short name of a command, used to script failures and latencies.
pub fn op_name(command: &DeviceCommand) -> &'static str {
    match command {
        DeviceCommand::SlewRaDec { .. } | DeviceCommand::SlewAltAz { .. } => "slew",
        DeviceCommand::Expose { .. } => "expose",
        DeviceCommand::MoveFilter { .. } => "move_filter",
        DeviceCommand::MoveFocuserBy { .. } | DeviceCommand::MoveFocuserTo { .. } => "move_focuser",
        DeviceCommand::Autofocus { .. } => "autofocus",
    }
}

impl MockTelescope {
    pub fn new(name: &str) -> Arc<Self> {
        let statuses = Subsystem::ALL
            .iter()
            .map(|s| (*s, SubsystemStatus::Idle))
            .collect();
        Arc::new(Self {
            name: name.to_string(),
            state: Mutex::new(MockState {
                statuses,
                filter: "g".to_string(),
                focus: 10_000,
                autofocus_result: 10_500,
                offsets: HashMap::new(),
                latency: HashMap::new(),
                failures: HashMap::new(),
                commands: Vec::new(),
                aborts: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn telescope(self: &Arc<Self>) -> Telescope {
        Telescope::new(self.name.clone(), self.clone())
    }

    pub fn set_latency(&self, op: &'static str, latency: Duration) {
        self.state.lock().latency.insert(op, latency);
    }

    pub fn fail_on(&self, op: &'static str, reason: &str) {
        self.state.lock().failures.insert(op, reason.to_string());
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    pub fn set_status(&self, subsystem: Subsystem, status: SubsystemStatus) {
        self.state.lock().statuses.insert(subsystem, status);
    }

    pub fn set_filter(&self, filter: &str) {
        self.state.lock().filter = filter.to_string();
    }

    pub fn set_offset(&self, filter: &str, offset: i32) {
        self.state.lock().offsets.insert(filter.to_string(), offset);
    }

    pub fn status_of(&self, subsystem: Subsystem) -> SubsystemStatus {
        self.state
            .lock()
            .statuses
            .get(&subsystem)
            .copied()
            .unwrap_or(SubsystemStatus::Unknown)
    }

    pub fn filter(&self) -> String {
        self.state.lock().filter.clone()
    }

    pub fn focus(&self) -> i32 {
        self.state.lock().focus
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.lock().commands.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.state
            .lock()
            .commands
            .iter()
            .filter(|c| op_name(c) == op)
            .count()
    }

    /// (filter, frame number) of every exposure that completed.
    pub fn frames(&self) -> Vec<(String, u32)> {
        self.state
            .lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::Expose {
                    filter,
                    frame_number,
                    ..
                } => Some((filter.clone(), *frame_number)),
                _ => None,
            })
            .collect()
    }

    pub fn aborts(&self) -> Vec<Subsystem> {
        self.state.lock().aborts.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.state
            .lock()
            .statuses
            .values()
            .all(|s| *s == SubsystemStatus::Idle)
    }

    fn apply(&self, command: &DeviceCommand) -> DeviceReply {
        let mut state = self.state.lock();
        state.statuses.insert(command.subsystem(), SubsystemStatus::Idle);
        state.commands.push(command.clone());
        match command {
            DeviceCommand::Expose {
                filter,
                frame_number,
                ..
            } => DeviceReply::Frame {
                path: format!("/data/{}/{}_{:04}.fits", self.name, filter, frame_number),
            },
            DeviceCommand::MoveFilter { filter } => {
                state.filter = filter.clone();
                DeviceReply::Done
            }
            DeviceCommand::MoveFocuserBy { offset } => {
                state.focus += offset;
                DeviceReply::Done
            }
            DeviceCommand::MoveFocuserTo { position } => {
                state.focus = *position;
                DeviceReply::Done
            }
            DeviceCommand::Autofocus { .. } => {
                state.focus = state.autofocus_result;
                DeviceReply::FocusPosition {
                    position: state.focus,
                }
            }
            DeviceCommand::SlewRaDec { .. } | DeviceCommand::SlewAltAz { .. } => DeviceReply::Done,
        }
    }
}

#[async_trait]
impl DeviceFacade for MockTelescope {
    async fn status(&self, subsystem: Subsystem) -> SubsystemStatus {
        self.state
            .lock()
            .statuses
            .get(&subsystem)
            .copied()
            .unwrap_or(SubsystemStatus::Unknown)
    }

    async fn run(&self, command: DeviceCommand) -> Result<DeviceReply, DeviceError> {
        let subsystem = command.subsystem();
        let op = op_name(&command);
        let latency = {
            let mut state = self.state.lock();
            if state.statuses.get(&subsystem) == Some(&SubsystemStatus::Disconnected) {
                return Err(DeviceError::Disconnected(subsystem));
            }
            state.statuses.insert(subsystem, SubsystemStatus::Busy);
            state.latency.get(op).copied().unwrap_or(Duration::from_millis(1))
        };

        tokio::time::sleep(latency).await;

        let failure = self.state.lock().failures.get(op).cloned();
        if let Some(reason) = failure {
            self.state
                .lock()
                .statuses
                .insert(subsystem, SubsystemStatus::Idle);
            return Err(DeviceError::Failed { subsystem, reason });
        }
        Ok(self.apply(&command))
    }

    async fn abort(&self, subsystem: Subsystem) {
        let mut state = self.state.lock();
        state.aborts.push(subsystem);
        state.statuses.insert(subsystem, SubsystemStatus::Idle);
    }

    async fn current_filter(&self) -> Result<String, DeviceError> {
        Ok(self.state.lock().filter.clone())
    }

    async fn focus_position(&self) -> Result<i32, DeviceError> {
        Ok(self.state.lock().focus)
    }

    async fn focus_offset(&self, filter: &str) -> Result<i32, DeviceError> {
        Ok(self.state.lock().offsets.get(filter).copied().unwrap_or(0))
    }
}

/// Fleet of `n` mock telescopes named 7DT01..
pub fn fleet(n: usize) -> Vec<Arc<MockTelescope>> {
    (1..=n)
        .map(|i| MockTelescope::new(&format!("7DT{i:02}")))
        .collect()
}

pub fn telescopes(mocks: &[Arc<MockTelescope>]) -> Vec<Telescope> {
    mocks.iter().map(MockTelescope::telescope).collect()
}
