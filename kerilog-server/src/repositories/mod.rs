mod data_point;
mod node;
mod sensor;

pub use data_point::DataPointRepository;
pub use node::NodeRepository;
pub use sensor::SensorRepository;
