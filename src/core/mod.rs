pub mod detector;
pub mod engine;
pub mod executor;
pub mod snapshot;
