//! Block runtime: per-block wrappers, the runner that composes them, and
//! the bar lifecycle around both

mod lifecycle;
mod scheduler;
mod wrapper;

pub use lifecycle::{assemble, run_bar, termination, SignalBinding};
pub use scheduler::{Compositor, RegisterOptions, Runner, WrapperId};
pub use wrapper::{StatusSnapshot, WrapperState};
