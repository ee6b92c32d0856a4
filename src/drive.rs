// Drive module
// Speed ramp and inertia simulation for the train motor duty cycle

pub mod convergence;
pub mod ramp;

// Re-export main types for easier access
pub use convergence::{kick, DriveConvergence, DriveStep};
pub use ramp::{RampMode, RampProfile};
