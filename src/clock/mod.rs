//! Clock model: local monotonic time, the offset/skew PLL, and the
//! shared read-side conversion API.

mod model;
mod monotonic;
mod shared;

#[cfg(test)]
mod tests;

pub use model::{
    CONVERGED_ERROR_US, ClockModel, ClockSnapshot, ClockState, ConvergenceStatus, ModelPhase,
    OFFSET_GAIN, SKEW_BASELINE_US, SKEW_GAIN,
};
pub use monotonic::{MonotonicClock, SystemClock};
pub use shared::{ClockReader, SharedClockModel};
