//! Device registry, timed relay actuation and worker threads.

pub mod registry;
pub mod relay;
pub mod task;
