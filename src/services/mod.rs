pub mod classifier;
pub mod dedup;
pub mod metadata;
pub mod pipeline;
pub mod relocate;
pub mod watcher;
