//! Exposure recipes: an ordered list of (filter, exposure time, frame count, binning).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One filter's worth of frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureStep {
    pub filter: String,
    /// Seconds per frame
    pub exptime: f64,
    pub count: u32,
    #[serde(default = "default_binning")]
    pub binning: u32,
}

fn default_binning() -> u32 {
    1
}

fn default_gain() -> u32 {
    2750
}

/// Ordered exposure recipe for one telescope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposurePlan {
    pub steps: Vec<ExposureStep>,
    #[serde(default = "default_gain")]
    pub gain: u32,
}

impl ExposurePlan {
    pub fn new(steps: Vec<ExposureStep>) -> Self {
        Self {
            steps,
            gain: default_gain(),
        }
    }

    /// Build a plan from the comma-separated columns used by target tables,
    /// e.g. `filters = "g,r"`, `exptimes = "60"`, `counts = "5,3"`.
    ///
    /// Columns shorter than the filter list are broadcast from their first value.
    pub fn from_columns(
        filters: &str,
        exptimes: &str,
        counts: &str,
        binnings: &str,
    ) -> Result<Self, String> {
        let filters: Vec<String> = split_column(filters).map(str::to_string).collect();
        if filters.is_empty() {
            return Err("exposure plan requires at least one filter".to_string());
        }
        let exptimes = broadcast(parse_column::<f64>("exptime", exptimes)?, filters.len())?;
        let counts = broadcast(parse_column::<u32>("count", counts)?, filters.len())?;
        let binnings = if binnings.trim().is_empty() {
            vec![default_binning(); filters.len()]
        } else {
            broadcast(parse_column::<u32>("binning", binnings)?, filters.len())?
        };

        let steps = filters
            .into_iter()
            .enumerate()
            .map(|(i, filter)| ExposureStep {
                filter,
                exptime: exptimes[i],
                count: counts[i],
                binning: binnings[i],
            })
            .collect();
        Ok(Self::new(steps))
    }

    /// Same timing recipe applied to a different filter set (used by
    /// spectroscopic modes, where each telescope carries its own filters).
    pub fn for_filters(&self, filters: &[String]) -> Self {
        let steps = filters
            .iter()
            .enumerate()
            .filter_map(|(i, filter)| {
                let template = if self.steps.len() == filters.len() {
                    self.steps.get(i)
                } else {
                    self.steps.first()
                }?;
                Some(ExposureStep {
                    filter: filter.clone(),
                    exptime: template.exptime,
                    count: template.count,
                    binning: template.binning,
                })
            })
            .collect();
        Self {
            steps,
            gain: self.gain,
        }
    }

    pub fn total_frames(&self) -> u32 {
        self.steps.iter().map(|s| s.count).sum()
    }

    /// Σ exptime × count. Fails when the sum is not a representable duration.
    pub fn total_duration(&self) -> Result<Duration, String> {
        let seconds: f64 = self
            .steps
            .iter()
            .map(|s| s.exptime.max(0.0) * f64::from(s.count))
            .sum();
        Duration::try_from_secs_f64(seconds)
            .map_err(|e| format!("total exposure of {seconds} s is not a valid duration: {e}"))
    }
}

fn split_column(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|v| !v.is_empty())
}

fn parse_column<T: std::str::FromStr>(name: &str, raw: &str) -> Result<Vec<T>, String> {
    split_column(raw)
        .map(|v| {
            v.parse::<T>()
                .map_err(|_| format!("invalid {name} value '{v}'"))
        })
        .collect()
}

fn broadcast<T: Clone>(values: Vec<T>, len: usize) -> Result<Vec<T>, String> {
    match values.len() {
        0 => Err("empty exposure column".to_string()),
        n if n == len => Ok(values),
        _ => Ok(vec![values[0].clone(); len]),
    }
}
