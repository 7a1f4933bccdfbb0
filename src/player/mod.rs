pub mod scheduler;

pub use scheduler::{Emit, PlaybackScheduler};
