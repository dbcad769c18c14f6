pub mod simulated;

pub use simulated::{SimOperation, SimulatedEngine};
