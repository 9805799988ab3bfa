use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::risk::types::{FeedEntry, LiveTransaction, RiskLevel, Transaction};
use crate::stream::buffer::FeedBuffer;

pub type SharedDashboard = Arc<Mutex<Dashboard>>;

/// Per-level counts over the rows currently in the feed.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStats {
    pub total: usize,
    pub normal: usize,
    pub suspicious: usize,
    pub fraud: usize,
    /// Live rows whose label is not a known level.
    pub unclassified: usize,
}

/// Owns the single display buffer shared by the mock and live feeds.
pub struct Dashboard {
    feed: FeedBuffer<FeedEntry>,
}

impl Dashboard {
    pub fn new(capacity: usize) -> Self {
        Self {
            feed: FeedBuffer::new(capacity),
        }
    }

    pub fn shared(capacity: usize) -> SharedDashboard {
        Arc::new(Mutex::new(Self::new(capacity)))
    }

    pub fn push_mock(&mut self, tx: Transaction) {
        self.push(FeedEntry::Mock(tx));
    }

    pub fn push_live(&mut self, tx: LiveTransaction) {
        self.push(FeedEntry::Live(tx));
    }

    fn push(&mut self, entry: FeedEntry) {
        if let Some(evicted) = self.feed.push(entry) {
            tracing::trace!(id = evicted.id(), "Evicted feed entry");
        }
    }

    /// Newest first.
    pub fn snapshot(&self) -> Vec<FeedEntry> {
        self.feed.snapshot()
    }

    pub fn stats(&self) -> FeedStats {
        let mut stats = FeedStats::default();
        for entry in self.feed.iter() {
            stats.total += 1;
            match entry.risk_level() {
                Some(RiskLevel::Normal) => stats.normal += 1,
                Some(RiskLevel::Suspicious) => stats.suspicious += 1,
                Some(RiskLevel::Fraud) => stats.fraud += 1,
                None => stats.unclassified += 1,
            }
        }
        stats
    }
}
