use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::config::MockConfig;
use crate::risk::types::{dedup_reasons, RiskLevel, Transaction};

pub const NETWORKS: [&str; 5] = ["Ethereum", "BSC", "Polygon", "Solana", "Arbitrum"];
pub const TOKENS: [&str; 8] = ["ETH", "USDT", "USDC", "BNB", "SOL", "MATIC", "DAI", "WBTC"];

pub const FRAUD_REASONS: [&str; 3] = [
    "Wallet linked to known scam address",
    "Unusually large transaction amount",
    "High-frequency trading pattern detected",
];
pub const SUSPICIOUS_REASONS: [&str; 2] = [
    "Transaction amount above average",
    "Unusual time-of-day activity",
];
pub const NORMAL_REASONS: [&str; 2] = ["All checks passed", "Known verified contract"];

/// Upper bound (exclusive) of the backdating applied to generated timestamps.
const MAX_AGE_MS: i64 = 3_600_000;

/// Reason pool for a risk level.
pub fn reason_pool(level: RiskLevel) -> &'static [&'static str] {
    match level {
        RiskLevel::Fraud => &FRAUD_REASONS,
        RiskLevel::Suspicious => &SUSPICIOUS_REASONS,
        RiskLevel::Normal => &NORMAL_REASONS,
    }
}

/// Map a uniform roll in `[0, 1)` to a level: 50% normal, 30% suspicious, 20% fraud.
pub fn level_for_roll(roll: f64) -> RiskLevel {
    if roll < 0.5 {
        RiskLevel::Normal
    } else if roll < 0.8 {
        RiskLevel::Suspicious
    } else {
        RiskLevel::Fraud
    }
}

/// Synthesizes demo transactions with a risk score that always lies inside
/// its level's band. Deterministic for a seeded RNG and a fixed `now`.
pub struct MockGenerator<R: Rng> {
    rng: R,
    amount_ceiling: f64,
}

impl MockGenerator<StdRng> {
    pub fn seeded(seed: u64, config: &MockConfig) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed), config)
    }

    pub fn from_entropy(config: &MockConfig) -> Self {
        Self::with_rng(StdRng::from_entropy(), config)
    }
}

impl<R: Rng> MockGenerator<R> {
    pub fn with_rng(rng: R, config: &MockConfig) -> Self {
        Self {
            rng,
            amount_ceiling: config.amount_ceiling,
        }
    }

    pub fn generate_transaction(&mut self) -> Transaction {
        self.generate_at(Utc::now())
    }

    pub fn generate_at(&mut self, now: DateTime<Utc>) -> Transaction {
        let level = level_for_roll(self.rng.gen::<f64>());
        let risk_score = self.rng.gen_range(level.band());
        let reason = self.pick(reason_pool(level));

        let id = format!("tx-{}", self.random_hex(4));
        let wallet_address = format!("0x{}...{}", self.random_hex(2), self.random_hex(2));
        let token_name = self.pick(&TOKENS).to_string();
        let amount = round_cents(self.rng.gen::<f64>() * self.amount_ceiling);
        let network = self.pick(&NETWORKS).to_string();
        let age = Duration::milliseconds(self.rng.gen_range(0..MAX_AGE_MS));

        Transaction {
            id,
            wallet_address,
            token_name,
            amount,
            network,
            timestamp: now - age,
            risk_level: level,
            risk_score,
            reasons: dedup_reasons([reason]),
        }
    }

    /// `count` independent draws, all relative to the current wall clock.
    pub fn generate_initial_transactions(&mut self, count: usize) -> Vec<Transaction> {
        self.generate_batch_at(count, Utc::now())
    }

    pub fn generate_batch_at(&mut self, count: usize, now: DateTime<Utc>) -> Vec<Transaction> {
        (0..count).map(|_| self.generate_at(now)).collect()
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        // Pools are non-empty constants.
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn random_hex(&mut self, bytes: usize) -> String {
        let buf: Vec<u8> = (0..bytes).map(|_| self.rng.gen()).collect();
        hex::encode(buf)
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
