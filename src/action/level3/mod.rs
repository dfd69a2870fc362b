//! Multi-telescope campaigns. Each fans a [`SingleObservation`] out across
//! its telescopes through the [`FanOutExecutor`]; they differ only in how
//! per-telescope parameters are derived from the target.

mod deep;
mod search;
mod spec;

pub use deep::DeepObservation;
pub use search::SearchObservation;
pub use spec::SpecObservation;

use crate::action::level2::{ObservationParams, SingleObservation};
use crate::action::{FocusHistory, ObservationProgress};
use crate::cancellation::AbortToken;
use crate::config::AutofocusConfig;
use crate::devices::{Subsystem, Telescope};
use crate::error::{ActionError, ActionResult};
use crate::execution::{FanOutError, FanOutExecutor, FanOutReport};
use crate::logging::log_action_operation;
use crate::models::{Coordinates, ExposurePlan};
use std::collections::BTreeMap;
use tracing::warn;

/// Result of a campaign: every telescope's outcome and progress.
pub type CampaignReport = FanOutReport<ObservationProgress, ObservationProgress>;

/// Parameters shared by every campaign variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignParams {
    pub target_id: String,
    pub coordinates: Coordinates,
    pub plan: ExposurePlan,
    pub autofocus: AutofocusConfig,
    /// Per-telescope progress of an earlier, preempted attempt.
    pub resume: BTreeMap<String, ObservationProgress>,
}

impl CampaignParams {
    fn observation(&self, telescope: &str, plan: ExposurePlan) -> ObservationParams {
        ObservationParams {
            target_id: self.target_id.clone(),
            coordinates: self.coordinates,
            plan,
            autofocus: self.autofocus.clone(),
            resume: self.resume.get(telescope).cloned(),
        }
    }
}

/// Telescopes, scope and shared state common to every campaign.
#[derive(Debug)]
struct Campaign {
    name: &'static str,
    telescopes: Vec<Telescope>,
    abort: AbortToken,
    history: FocusHistory,
    progress: BTreeMap<String, ObservationProgress>,
}

impl Campaign {
    fn new(
        name: &'static str,
        telescopes: Vec<Telescope>,
        abort: AbortToken,
        history: FocusHistory,
    ) -> Self {
        Self {
            name,
            telescopes,
            abort,
            history,
            progress: BTreeMap::new(),
        }
    }

    fn label(&self) -> String {
        self.telescopes
            .iter()
            .map(Telescope::name)
            .collect::<Vec<_>>()
            .join(",")
    }

    async fn run(
        &mut self,
        params: BTreeMap<String, ObservationParams>,
    ) -> ActionResult<CampaignReport> {
        if self.abort.is_aborted() {
            self.halt().await;
            return Err(ActionError::aborted(self.name, &self.label()));
        }

        log_action_operation(self.name, &self.label(), "started", None);
        let history = self.history.clone();
        let executor = FanOutExecutor::new(move |telescope: Telescope, abort: AbortToken| {
            SingleObservation::new(telescope, abort, history.clone())
        });

        match executor.run(&self.telescopes, params, &self.abort).await {
            Ok(report) => {
                self.progress = report.progress();
                if report.succeeded().is_empty() {
                    warn!(
                        campaign = self.name,
                        failed = ?report.failed(),
                        "No telescope completed the observation"
                    );
                    return Err(ActionError::failed(
                        self.name,
                        &self.label(),
                        format!("every telescope failed: {:?}", report.failed()),
                    ));
                }
                log_action_operation(self.name, &self.label(), "completed", None);
                Ok(report)
            }
            Err(FanOutError::Aborted { report }) => {
                self.progress = report.progress();
                log_action_operation(self.name, &self.label(), "aborted", None);
                Err(ActionError::aborted(self.name, &self.label()))
            }
        }
    }

    async fn halt(&self) {
        for telescope in &self.telescopes {
            let device = telescope.device();
            for subsystem in Subsystem::ALL {
                if device.status(subsystem).await.is_busy() {
                    device.abort(subsystem).await;
                }
            }
        }
    }
}
