use super::{Campaign, CampaignParams, CampaignReport};
use crate::action::{Action, FocusHistory, ObservationProgress};
use crate::cancellation::AbortToken;
use crate::devices::Telescope;
use crate::error::{ActionError, ActionResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

/// Spectroscopic campaign: each telescope exposes through its own set of
/// medium-band filters, taken from the spec-mode table. Telescopes absent
/// from the mode are skipped.
#[derive(Debug)]
pub struct SpecObservation {
    campaign: Campaign,
    specmode: String,
    filters: BTreeMap<String, Vec<String>>,
}

impl SpecObservation {
    pub fn new(
        telescopes: Vec<Telescope>,
        abort: AbortToken,
        history: FocusHistory,
        specmode: &str,
        filters: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            campaign: Campaign::new("SpecObservation", telescopes, abort, history),
            specmode: specmode.to_string(),
            filters,
        }
    }
}

#[async_trait]
impl Action for SpecObservation {
    type Params = CampaignParams;
    type Output = CampaignReport;
    type Progress = BTreeMap<String, ObservationProgress>;

    fn name(&self) -> &'static str {
        self.campaign.name
    }

    async fn run(&mut self, params: CampaignParams) -> ActionResult<CampaignReport> {
        if self.filters.is_empty() {
            return Err(ActionError::failed(
                self.campaign.name,
                &self.campaign.label(),
                format!("spectroscopic mode '{}' is not configured", self.specmode),
            ));
        }

        let mut per_telescope = BTreeMap::new();
        for telescope in &self.campaign.telescopes {
            match self.filters.get(telescope.name()) {
                Some(filters) if !filters.is_empty() => {
                    let plan = params.plan.for_filters(filters);
                    per_telescope.insert(
                        telescope.name().to_string(),
                        params.observation(telescope.name(), plan),
                    );
                }
                _ => debug!(
                    telescope = %telescope.name(),
                    specmode = %self.specmode,
                    "Telescope not part of spectroscopic mode"
                ),
            }
        }
        self.campaign.run(per_telescope).await
    }

    async fn abort(&self) {
        self.campaign.halt().await;
    }

    fn progress(&self) -> Self::Progress {
        self.campaign.progress.clone()
    }
}
