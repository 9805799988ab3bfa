pub mod types;

pub use types::{
    AnalysisOutcome, AnalysisResult, FeedEntry, LiveTransaction, RiskLevel, Transaction,
};
