pub mod client;
pub mod filter;
pub mod report;
