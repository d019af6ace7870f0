mod node;
mod point;
mod sensor;

pub use node::*;
pub use point::*;
pub use sensor::*;

pub type Id = i64;

/// Stable device identifier burned into a node or sensor, distinct from any row id
pub type HardwareId = i64;
