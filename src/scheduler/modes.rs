//! Observation-mode dispatch table.
//!
//! Each [`ModeKind`] maps to a [`ModeRunner`] that knows the allocation policy
//! of the mode and which action to build for the allocated telescopes. New
//! modes are added by registering a runner; the scheduler never branches on
//! the mode itself.

use crate::action::level2::{ObservationParams, SingleObservation};
use crate::action::level3::{CampaignParams, DeepObservation, SearchObservation, SpecObservation};
use crate::action::{Action, FocusHistory, ObservationProgress};
use crate::cancellation::AbortToken;
use crate::config::{AutofocusConfig, SpectroscopyConfig};
use crate::devices::Telescope;
use crate::error::{ActionError, ActionResult};
use crate::models::{ModeKind, ObservationMode, Target};
use crate::pool::AllocationPolicy;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Everything a runner needs for one dispatch.
#[derive(Debug, Clone)]
pub struct ModeContext {
    pub target: Target,
    pub telescopes: Vec<Telescope>,
    pub abort: AbortToken,
    /// Per-telescope progress of a preempted attempt; empty for fresh work.
    pub resume: BTreeMap<String, ObservationProgress>,
    pub autofocus: AutofocusConfig,
    pub history: FocusHistory,
}

impl ModeContext {
    fn campaign_params(&self) -> CampaignParams {
        CampaignParams {
            target_id: self.target.id.clone(),
            coordinates: self.target.coordinates,
            plan: self.target.exposure.clone(),
            autofocus: self.autofocus.clone(),
            resume: self.resume.clone(),
        }
    }
}

/// Terminal result of a runner plus the per-telescope progress to carry into
/// a resume.
#[derive(Debug, Clone)]
pub struct ModeRun {
    pub result: ActionResult<()>,
    pub progress: BTreeMap<String, ObservationProgress>,
}

#[async_trait]
pub trait ModeRunner: Send + Sync {
    fn allocation(&self, mode: &ObservationMode) -> AllocationPolicy;

    async fn run(&self, ctx: ModeContext) -> ModeRun;
}

/// One telescope, one [`SingleObservation`].
#[derive(Debug, Default)]
pub struct SingleRunner;

#[async_trait]
impl ModeRunner for SingleRunner {
    fn allocation(&self, _mode: &ObservationMode) -> AllocationPolicy {
        AllocationPolicy::Single
    }

    async fn run(&self, ctx: ModeContext) -> ModeRun {
        let Some(telescope) = ctx.telescopes.first().cloned() else {
            return ModeRun {
                result: Err(ActionError::failed("SingleObservation", "-", "no telescope assigned")),
                progress: ctx.resume,
            };
        };
        let name = telescope.name().to_string();
        let mut action = SingleObservation::new(telescope, ctx.abort.clone(), ctx.history.clone());
        let result = action
            .run(ObservationParams {
                target_id: ctx.target.id.clone(),
                coordinates: ctx.target.coordinates,
                plan: ctx.target.exposure.clone(),
                autofocus: ctx.autofocus.clone(),
                resume: ctx.resume.get(&name).cloned(),
            })
            .await
            .map(|_| ());

        let mut progress = BTreeMap::new();
        progress.insert(name, action.progress());
        ModeRun { result, progress }
    }
}

/// One tile of a one-of-N search on any one telescope.
#[derive(Debug, Default)]
pub struct SearchRunner;

#[async_trait]
impl ModeRunner for SearchRunner {
    fn allocation(&self, _mode: &ObservationMode) -> AllocationPolicy {
        AllocationPolicy::Single
    }

    async fn run(&self, ctx: ModeContext) -> ModeRun {
        let Some(telescope) = ctx.telescopes.first().cloned() else {
            return ModeRun {
                result: Err(ActionError::failed("SearchObservation", "-", "no telescope assigned")),
                progress: ctx.resume,
            };
        };
        let params = ctx.campaign_params();
        let mut action = SearchObservation::new(telescope, ctx.abort.clone(), ctx.history.clone());
        let result = action.run(params).await.map(|_| ());
        ModeRun {
            result,
            progress: action.progress(),
        }
    }
}

/// `ntelescope` telescopes co-adding the same plan.
#[derive(Debug, Default)]
pub struct DeepRunner;

#[async_trait]
impl ModeRunner for DeepRunner {
    fn allocation(&self, mode: &ObservationMode) -> AllocationPolicy {
        match mode {
            ObservationMode::Deep { ntelescope } => AllocationPolicy::Exactly(*ntelescope),
            _ => AllocationPolicy::Single,
        }
    }

    async fn run(&self, ctx: ModeContext) -> ModeRun {
        let params = ctx.campaign_params();
        let mut action =
            DeepObservation::new(ctx.telescopes.clone(), ctx.abort.clone(), ctx.history.clone());
        let result = action.run(params).await.map(|_| ());
        ModeRun {
            result,
            progress: action.progress(),
        }
    }
}

/// Whole fleet, each telescope with the filters of the spectroscopic mode.
#[derive(Debug)]
pub struct SpecRunner {
    spectroscopy: SpectroscopyConfig,
}

impl SpecRunner {
    pub fn new(spectroscopy: SpectroscopyConfig) -> Self {
        Self { spectroscopy }
    }
}

#[async_trait]
impl ModeRunner for SpecRunner {
    fn allocation(&self, _mode: &ObservationMode) -> AllocationPolicy {
        AllocationPolicy::All
    }

    async fn run(&self, ctx: ModeContext) -> ModeRun {
        let specmode = match &ctx.target.mode {
            ObservationMode::Spec { specmode } => specmode.clone(),
            other => {
                return ModeRun {
                    result: Err(ActionError::failed(
                        "SpecObservation",
                        "-",
                        format!("target mode {:?} is not spectroscopic", other.kind()),
                    )),
                    progress: ctx.resume,
                }
            }
        };
        let filters = self
            .spectroscopy
            .modes
            .get(&specmode)
            .cloned()
            .unwrap_or_default();
        let params = ctx.campaign_params();
        let mut action = SpecObservation::new(
            ctx.telescopes.clone(),
            ctx.abort.clone(),
            ctx.history.clone(),
            &specmode,
            filters,
        );
        let result = action.run(params).await.map(|_| ());
        ModeRun {
            result,
            progress: action.progress(),
        }
    }
}

/// Mode → runner.
#[derive(Clone)]
pub struct ModeTable {
    runners: HashMap<ModeKind, Arc<dyn ModeRunner>>,
}

impl ModeTable {
    pub fn empty() -> Self {
        Self {
            runners: HashMap::new(),
        }
    }

    /// The four built-in modes.
    pub fn standard(spectroscopy: SpectroscopyConfig) -> Self {
        Self::empty()
            .with(ModeKind::Single, Arc::new(SingleRunner))
            .with(ModeKind::Search, Arc::new(SearchRunner))
            .with(ModeKind::Deep, Arc::new(DeepRunner))
            .with(ModeKind::Spec, Arc::new(SpecRunner::new(spectroscopy)))
    }

    pub fn with(mut self, kind: ModeKind, runner: Arc<dyn ModeRunner>) -> Self {
        self.runners.insert(kind, runner);
        self
    }

    pub fn runner(&self, kind: ModeKind) -> Option<Arc<dyn ModeRunner>> {
        self.runners.get(&kind).cloned()
    }
}

impl std::fmt::Debug for ModeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.runners.keys().collect();
        kinds.sort();
        f.debug_struct("ModeTable").field("modes", &kinds).finish()
    }
}
