pub mod cli;
pub mod config;
pub mod error;
pub mod excludes;
pub mod logging;
pub mod ops;
pub mod parse;
pub mod ssh;
pub mod transfer;

pub use error::DeployError;
pub use transfer::{Executor, Outcome, TransferPlan};
