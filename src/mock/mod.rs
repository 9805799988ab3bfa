pub mod feed;
pub mod generator;

pub use generator::MockGenerator;
