pub mod refresh;

pub use refresh::{RefreshJob, RefreshTrigger, RefreshWorker};
