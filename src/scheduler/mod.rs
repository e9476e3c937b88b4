pub mod artifacts;
pub mod chunks;
pub mod runner;

pub use artifacts::ArtifactsManager;
pub use chunks::{merge, sort_windows, Chunk};
pub use runner::{RunOutcome, Runner, SystemClock};
