use std::sync::Arc;

use kerilog_api::{HardwareId, Id, Node};
use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::NodeRow;

pub struct NodeRepository {
    storage: Arc<Storage>,
}

impl NodeRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl NodeRepository {
    // Register a node, returns its row id
    pub async fn create(&self, item: &Node, transaction: &mut Transaction<'_, Sqlite>) -> Result<Id, Error> {
        let id = sqlx::query(
            r#"
            INSERT INTO nodes (hw_id, name)
            VALUES ($1, $2)
            "#,
        )
        .bind(item.hw_id)
        .bind(&item.name)
        .execute(&mut **transaction)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn find_by_id(&self, id: Id) -> Result<Option<Node>, Error> {
        let row: Option<NodeRow> = sqlx::query_as("SELECT * FROM nodes WHERE id = $1")
            .bind(id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(row.map(Node::from))
    }

    pub async fn find_by_hw_id(&self, hw_id: HardwareId) -> Result<Option<Node>, Error> {
        let row: Option<NodeRow> = sqlx::query_as("SELECT * FROM nodes WHERE hw_id = $1")
            .bind(hw_id)
            .fetch_optional(self.storage.get_pool())
            .await?;

        Ok(row.map(Node::from))
    }

    pub async fn find_all(&self) -> Result<Vec<Node>, Error> {
        let rows: Vec<NodeRow> = sqlx::query_as("SELECT * FROM nodes ORDER BY id")
            .fetch_all(self.storage.get_pool())
            .await?;

        Ok(rows.into_iter().map(Node::from).collect())
    }
}
