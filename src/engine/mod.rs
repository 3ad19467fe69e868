//! The stateful components that drive remote calls

mod draft;
mod finalize;
mod reorder;
mod uploads;

pub use draft::{delete_with_retry, DraftSynchronizer, SyncPhase};
pub use finalize::{FinalizeMode, FinalizeOutcome, SubmissionFinalizer};
pub use reorder::ReorderCoordinator;
pub use uploads::{SweepReport, TempUploadManager};
