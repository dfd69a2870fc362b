//! # Cancellation Scopes
//!
//! Cooperative cancellation handle passed into every action at construction.
//! Cancelling an [`AbortToken`] is observed by every clone of it and by
//! nothing else, so independent scopes (ordinary observations, ToO
//! observations, the scheduler itself) never interfere.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Which cancellation domain a dispatch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortScope {
    Observation,
    TargetOfOpportunity,
}

impl fmt::Display for AbortScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Observation => write!(f, "observation"),
            Self::TargetOfOpportunity => write!(f, "too"),
        }
    }
}

/// Broadcast cancellation signal. Once aborted it stays aborted; a fresh
/// scope requires a fresh token.
#[derive(Clone)]
pub struct AbortToken {
    signal: Arc<watch::Sender<bool>>,
    label: Arc<str>,
}

impl AbortToken {
    pub fn new(label: &str) -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
            label: Arc::from(label),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Signal every holder of this token.
    pub fn abort(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_aborted(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once the token is aborted. Resolves immediately if it already is.
    pub async fn aborted(&self) {
        let mut receiver = self.signal.subscribe();
        // The sender lives as long as `self`, so the wait cannot observe a closed channel.
        let _ = receiver.wait_for(|aborted| *aborted).await;
    }
}

impl fmt::Debug for AbortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortToken")
            .field("label", &self.label)
            .field("aborted", &self.is_aborted())
            .finish()
    }
}
