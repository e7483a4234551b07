//! Label-driven renaming of the raw video corpus.
//!
//! Planning (`plan`) is pure and reads the folder through a `Listing`;
//! only `apply` touches the disk.

pub mod apply;
pub mod labels;
pub mod plan;
pub mod sanitize;

pub use apply::{apply, ApplyFailure, ApplyReport};
pub use labels::{load_labels, read_labels, LabelRecord};
pub use plan::{plan, CollisionStrategy, NameCase, PlanOptions, PlanWarning, RenameEntry, RenamePlan};
pub use sanitize::sanitize_label;
