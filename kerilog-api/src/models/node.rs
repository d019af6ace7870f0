use alloc::format;
use alloc::string::String;

use serde::{Deserialize, Serialize};

use super::{HardwareId, Id};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Registry identifier
    pub id: Id,
    /// Hardware identifier carried in topics
    pub hw_id: HardwareId,
    /// Display name
    pub name: String,
}

impl Node {
    /// Series key under which non-data events of this node are recorded
    pub fn lifecycle_series(&self) -> String {
        format!("{}-node", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_series() {
        let node = Node {
            id: 1,
            hw_id: 42,
            name: "boiler".into(),
        };

        assert_eq!(node.lifecycle_series(), "boiler-node");
    }
}
