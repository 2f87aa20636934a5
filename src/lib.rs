//! Background ZIP compression and extraction jobs with progress reporting and cooperative
//! cancellation.

pub mod config;
pub mod models;
pub mod system;
pub mod utils;
pub mod worker;

pub use config::WorkerSettings;
pub use models::{DirFilter, JobEvent, JobOutcome, JobResult, ReportSettings};
pub use utils::error::{Result, ZipWorkerError};
pub use worker::JobController;
