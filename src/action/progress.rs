use crate::models::ExposurePlan;
use serde::{Deserialize, Serialize};

/// One frame written by the camera.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub filter: String,
    pub frame_number: u32,
    pub path: String,
}

/// Frames completed per exposure step.
///
/// Captured after an aborted or failed observation and passed back in on
/// resume so completed frames are not repeated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationProgress {
    /// `completed[i]` frames of plan step `i` are done.
    pub completed: Vec<u32>,
    pub frames: Vec<FrameRecord>,
}

impl ObservationProgress {
    pub fn completed_in_step(&self, step: usize) -> u32 {
        self.completed.get(step).copied().unwrap_or(0)
    }

    pub fn record_frame(&mut self, step: usize, frame: FrameRecord) {
        if self.completed.len() <= step {
            self.completed.resize(step + 1, 0);
        }
        self.completed[step] += 1;
        self.frames.push(frame);
    }

    pub fn total_completed(&self) -> u32 {
        self.completed.iter().sum()
    }

    /// Every step of `plan` has all of its frames.
    pub fn is_complete(&self, plan: &ExposurePlan) -> bool {
        plan.steps
            .iter()
            .enumerate()
            .all(|(i, step)| self.completed_in_step(i) >= step.count)
    }
}
