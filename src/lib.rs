pub mod batch;
pub mod completion;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flatten;
pub mod invoker;
pub mod listing;
pub mod naming;
pub mod progress;
pub mod stages;

pub use batch::{BatchDriver, BatchSummary, ItemReport, Stage, Step};
pub use config::{PipelineConfig, ResolvedPaths};
pub use discovery::{ItemStatus, WorkItem};
pub use error::{Error, ItemError};
pub use invoker::{ProcessRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use listing::{DiskFs, Listing, MemFs};
pub use progress::{BatchReporter, SilentReporter};
