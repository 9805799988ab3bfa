pub mod api;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod mock;
pub mod risk;
pub mod stream;
