use kerilog_api::Node;
use serde::{Deserialize, Serialize};

use crate::models::Table;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct NodeRow {
    pub id: i64,
    pub hw_id: i64,
    pub name: String,
    /// Free-form JSON maintained by the registry owner
    pub misc: Option<String>,
}

impl From<NodeRow> for Node {
    fn from(row: NodeRow) -> Self {
        Node {
            id: row.id,
            hw_id: row.hw_id,
            name: row.name,
        }
    }
}

#[derive(Clone)]
pub struct NodeTable;

impl Table for NodeTable {
    fn name(&self) -> &'static str {
        "nodes"
    }

    fn create(&self) -> String {
        String::from(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hw_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL UNIQUE,
                misc TEXT
            );
            "#,
        )
    }

    fn dispose(&self) -> String {
        String::from("DROP TABLE IF EXISTS nodes;")
    }

    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }
}
