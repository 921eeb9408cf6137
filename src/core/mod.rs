pub mod input;
pub mod list;
pub mod progress;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod task;
