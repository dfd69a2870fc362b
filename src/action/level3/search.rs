use super::{Campaign, CampaignParams, CampaignReport};
use crate::action::{Action, FocusHistory, ObservationProgress};
use crate::cancellation::AbortToken;
use crate::devices::Telescope;
use crate::error::{ActionError, ActionResult};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// One tile of a one-of-N search: a single telescope observes the target.
#[derive(Debug)]
pub struct SearchObservation {
    campaign: Campaign,
}

impl SearchObservation {
    pub fn new(telescope: Telescope, abort: AbortToken, history: FocusHistory) -> Self {
        Self {
            campaign: Campaign::new("SearchObservation", vec![telescope], abort, history),
        }
    }
}

#[async_trait]
impl Action for SearchObservation {
    type Params = CampaignParams;
    type Output = CampaignReport;
    type Progress = BTreeMap<String, ObservationProgress>;

    fn name(&self) -> &'static str {
        self.campaign.name
    }

    async fn run(&mut self, params: CampaignParams) -> ActionResult<CampaignReport> {
        let Some(telescope) = self.campaign.telescopes.first().map(|t| t.name().to_string()) else {
            return Err(ActionError::failed(self.campaign.name, "-", "no telescope assigned"));
        };
        let mut per_telescope = BTreeMap::new();
        per_telescope.insert(
            telescope.clone(),
            params.observation(&telescope, params.plan.clone()),
        );
        self.campaign.run(per_telescope).await
    }

    async fn abort(&self) {
        self.campaign.halt().await;
    }

    fn progress(&self) -> Self::Progress {
        self.campaign.progress.clone()
    }
}
