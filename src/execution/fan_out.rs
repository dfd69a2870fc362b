//! # Fan-Out Executor
//!
//! Runs one action variant concurrently across a set of telescopes, one
//! independently parameterized instance per telescope, and joins them all.
//!
//! ## Guarantees
//!
//! - **Per-telescope outcomes**: the result maps telescope name to that
//!   telescope's own outcome and progress; partial success is observable.
//! - **Isolation**: one instance failing never cancels its siblings.
//! - **No orphaned workers**: when the shared scope fires every instance
//!   observes it and terminates on its own; [`FanOutError::Aborted`] is
//!   returned only after every instance has reached a terminal state.

use crate::action::Action;
use crate::cancellation::AbortToken;
use crate::devices::Telescope;
use crate::error::ActionError;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::fmt::Debug;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Terminal state of one telescope's instance.
#[derive(Debug, Clone, PartialEq)]
pub enum TelescopeOutcome<O> {
    Succeeded(O),
    Failed(ActionError),
    Aborted,
    /// No parameters were assigned to this telescope; nothing ran.
    Skipped,
}

impl<O> TelescopeOutcome<O> {
    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Outcome plus the progress the instance reported when it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct TelescopeReport<O, P> {
    pub outcome: TelescopeOutcome<O>,
    pub progress: P,
}

/// Full per-telescope result of one fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutReport<O, P> {
    pub outcomes: BTreeMap<String, TelescopeReport<O, P>>,
}

impl<O, P: Clone> FanOutReport<O, P> {
    pub fn get(&self, telescope: &str) -> Option<&TelescopeReport<O, P>> {
        self.outcomes.get(telescope)
    }

    /// Names of telescopes whose instance succeeded.
    pub fn succeeded(&self) -> Vec<&str> {
        self.filter_names(|outcome| outcome.is_succeeded())
    }

    pub fn failed(&self) -> Vec<&str> {
        self.filter_names(|outcome| matches!(outcome, TelescopeOutcome::Failed(_)))
    }

    pub fn aborted(&self) -> Vec<&str> {
        self.filter_names(TelescopeOutcome::is_aborted)
    }

    /// At least one telescope ran and every one that ran succeeded.
    pub fn all_succeeded(&self) -> bool {
        let mut ran = false;
        for report in self.outcomes.values() {
            match report.outcome {
                TelescopeOutcome::Succeeded(_) => ran = true,
                TelescopeOutcome::Skipped => {}
                _ => return false,
            }
        }
        ran
    }

    pub fn progress(&self) -> BTreeMap<String, P> {
        self.outcomes
            .iter()
            .map(|(name, report)| (name.clone(), report.progress.clone()))
            .collect()
    }

    fn filter_names(&self, predicate: impl Fn(&TelescopeOutcome<O>) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, report)| predicate(&report.outcome))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug, Error)]
pub enum FanOutError<O: Debug, P: Debug> {
    /// The shared scope fired; every instance has terminated.
    #[error("fan-out aborted")]
    Aborted { report: FanOutReport<O, P> },
}

pub type FanOutResult<A> = Result<
    FanOutReport<<A as Action>::Output, <A as Action>::Progress>,
    FanOutError<<A as Action>::Output, <A as Action>::Progress>,
>;

/// Constructs and runs one `A` per telescope.
pub struct FanOutExecutor<A, F>
where
    F: Fn(Telescope, AbortToken) -> A,
{
    factory: F,
}

impl<A, F> FanOutExecutor<A, F>
where
    A: Action + 'static,
    A::Output: Debug,
    A::Progress: Debug,
    F: Fn(Telescope, AbortToken) -> A,
{
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    /// Run every telescope that has an entry in `params` concurrently under
    /// `abort`, and wait for all of them. Telescopes without parameters are
    /// reported as [`TelescopeOutcome::Skipped`].
    pub async fn run(
        &self,
        telescopes: &[Telescope],
        mut params: BTreeMap<String, A::Params>,
        abort: &AbortToken,
    ) -> FanOutResult<A> {
        let mut outcomes = BTreeMap::new();
        let mut names = Vec::new();
        let mut handles = Vec::new();

        for telescope in telescopes {
            let name = telescope.name().to_string();
            let Some(instance_params) = params.remove(&name) else {
                debug!(telescope = %name, "No parameters assigned, skipping");
                outcomes.insert(
                    name,
                    TelescopeReport {
                        outcome: TelescopeOutcome::Skipped,
                        progress: A::Progress::default(),
                    },
                );
                continue;
            };

            let mut action = (self.factory)(telescope.clone(), abort.clone());
            names.push(name);
            handles.push(tokio::spawn(async move {
                let result = action.run(instance_params).await;
                let progress = action.progress();
                (result, progress)
            }));
        }

        info!(
            running = handles.len(),
            skipped = outcomes.len(),
            scope = %abort.label(),
            "Fan-out started"
        );

        for (name, joined) in names.into_iter().zip(join_all(handles).await) {
            let report = match joined {
                Ok((Ok(output), progress)) => TelescopeReport {
                    outcome: TelescopeOutcome::Succeeded(output),
                    progress,
                },
                Ok((Err(error), progress)) if error.is_aborted() => TelescopeReport {
                    outcome: TelescopeOutcome::Aborted,
                    progress,
                },
                Ok((Err(error), progress)) => {
                    warn!(telescope = %name, error = %error, "Fan-out instance failed");
                    TelescopeReport {
                        outcome: TelescopeOutcome::Failed(error),
                        progress,
                    }
                }
                Err(join_error) => {
                    warn!(telescope = %name, error = %join_error, "Fan-out instance panicked");
                    TelescopeReport {
                        outcome: TelescopeOutcome::Failed(ActionError::failed(
                            "FanOut",
                            &name,
                            format!("worker task ended abnormally: {join_error}"),
                        )),
                        progress: A::Progress::default(),
                    }
                }
            };
            outcomes.insert(name, report);
        }

        let report = FanOutReport { outcomes };
        info!(
            succeeded = report.succeeded().len(),
            failed = report.failed().len(),
            aborted = report.aborted().len(),
            "Fan-out joined"
        );

        if abort.is_aborted() {
            return Err(FanOutError::Aborted { report });
        }
        Ok(report)
    }
}
