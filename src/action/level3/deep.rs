use super::{Campaign, CampaignParams, CampaignReport};
use crate::action::{Action, FocusHistory, ObservationProgress};
use crate::cancellation::AbortToken;
use crate::devices::Telescope;
use crate::error::ActionResult;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Every telescope observes the target with the same plan; frames are
/// co-added downstream.
#[derive(Debug)]
pub struct DeepObservation {
    campaign: Campaign,
}

impl DeepObservation {
    pub fn new(telescopes: Vec<Telescope>, abort: AbortToken, history: FocusHistory) -> Self {
        Self {
            campaign: Campaign::new("DeepObservation", telescopes, abort, history),
        }
    }
}

#[async_trait]
impl Action for DeepObservation {
    type Params = CampaignParams;
    type Output = CampaignReport;
    type Progress = BTreeMap<String, ObservationProgress>;

    fn name(&self) -> &'static str {
        self.campaign.name
    }

    async fn run(&mut self, params: CampaignParams) -> ActionResult<CampaignReport> {
        let per_telescope: BTreeMap<_, _> = self
            .campaign
            .telescopes
            .iter()
            .map(|t| (t.name().to_string(), params.observation(t.name(), params.plan.clone())))
            .collect();
        self.campaign.run(per_telescope).await
    }

    async fn abort(&self) {
        self.campaign.halt().await;
    }

    fn progress(&self) -> Self::Progress {
        self.campaign.progress.clone()
    }
}
