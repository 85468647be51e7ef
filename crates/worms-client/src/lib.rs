pub mod bridge;
pub mod cli;
pub mod error;
pub mod net_client;
