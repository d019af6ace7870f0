mod health_handle;
mod node_handle;
mod series_handle;

pub use health_handle::*;
pub use node_handle::*;
pub use series_handle::*;
