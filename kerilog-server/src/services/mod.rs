mod dispatcher;
mod gateway;
mod handshake;
mod publisher;
mod registry;
mod status;
mod store;
mod telemetry;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use dispatcher::*;
pub use gateway::*;
pub use handshake::*;
pub use publisher::*;
pub use registry::*;
pub use status::*;
pub use store::*;
pub use telemetry::*;
