pub mod analyzer;
pub mod error;
pub mod wire;

pub use analyzer::RiskClient;
pub use error::{InputError, ServiceError};
