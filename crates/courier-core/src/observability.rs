use serde::{Deserialize, Serialize};

use crate::domain::{CorrelatorId, ExchangeState};

/// correlator 1 つ分のスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelatorStats {
    pub correlator: CorrelatorId,
    pub queued_messages: usize,
    pub routes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeCounts {
    pub pending: usize,
    pub in_flight: usize,
    pub accepted: usize,
    pub replied: usize,
    pub faulted: usize,
    pub failed: usize,
}

impl ExchangeCounts {
    pub fn record(&mut self, state: ExchangeState) {
        match state {
            ExchangeState::Pending => self.pending += 1,
            ExchangeState::InFlight => self.in_flight += 1,
            ExchangeState::Accepted => self.accepted += 1,
            ExchangeState::Replied => self.replied += 1,
            ExchangeState::Faulted => self.faulted += 1,
            ExchangeState::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.in_flight + self.accepted + self.replied + self.faulted + self.failed
    }
}
