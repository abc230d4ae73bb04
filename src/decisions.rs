use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{Decision, ProfileKey, Status};
use crate::error::MatchError;
use crate::store::Store;

/// Applies accept/decline outcomes to single records.
///
/// Repeating an outcome leaves the record as it is; the opposite outcome
/// overwrites the earlier one.
#[derive(Clone)]
pub struct StatusTransitions {
    store: Arc<Store>,
}

impl StatusTransitions {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn decide(&self, key: &ProfileKey, outcome: Status) -> Result<(), MatchError> {
        let decision = Decision::try_from(outcome).inspect_err(|err| {
            warn!(key = %key, error = %err, "rejected decision");
        })?;
        self.apply(key, decision)
    }

    pub fn apply(&self, key: &ProfileKey, decision: Decision) -> Result<(), MatchError> {
        let status = decision.status();
        let found = self.store.set_status(key, status).inspect_err(|err| {
            warn!(key = %key, status = %status, error = %err, "decision not recorded");
        })?;
        if found {
            info!(key = %key, status = %status, "decision recorded");
        } else {
            debug!(key = %key, status = %status, "decision for unknown key ignored");
        }
        Ok(())
    }

    pub fn accept(&self, key: &ProfileKey) -> Result<(), MatchError> {
        self.apply(key, Decision::Accepted)
    }

    pub fn decline(&self, key: &ProfileKey) -> Result<(), MatchError> {
        self.apply(key, Decision::Declined)
    }
}
