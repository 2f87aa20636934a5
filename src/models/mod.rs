// Data Models
pub mod job;
pub mod progress;
pub mod result;

pub use job::{DirFilter, JobConfiguration, JobMode, OperationShape};
pub use progress::{ByteCount, JobEvent, ProgressCounters, ProgressReporter, ReportSettings};
pub use result::{JobOutcome, JobResult};
