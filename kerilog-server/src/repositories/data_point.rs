use std::sync::Arc;

use sqlx::{Error, Sqlite, Transaction};

use crate::configs::Storage;
use crate::models::DataPoint;

pub struct DataPointRepository {
    storage: Arc<Storage>,
}

impl DataPointRepository {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl DataPointRepository {
    /// Inserts a point unless `(series, time)` is already stored.
    ///
    /// Returns the number of rows written, 0 for a duplicate.
    pub async fn insert_ignore(
        &self,
        item: &DataPoint,
        transaction: &mut Transaction<'_, Sqlite>,
    ) -> Result<u64, Error> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO data_points (series, time, value)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&item.series)
        .bind(item.time)
        .bind(&item.value)
        .execute(&mut **transaction)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_series(&self, series: &str) -> Result<Vec<DataPoint>, Error> {
        let points: Vec<DataPoint> = sqlx::query_as(
            r#"
            SELECT * FROM data_points
            WHERE series = $1
            ORDER BY time ASC
            "#,
        )
        .bind(series)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(points)
    }

    // Both bounds are inclusive
    pub async fn find_by_series_and_time_range(
        &self,
        series: &str,
        start_time: i64,
        end_time: i64,
    ) -> Result<Vec<DataPoint>, Error> {
        let points: Vec<DataPoint> = sqlx::query_as(
            r#"
            SELECT * FROM data_points
            WHERE series = $1 AND time >= $2 AND time <= $3
            ORDER BY time ASC
            "#,
        )
        .bind(series)
        .bind(start_time)
        .bind(end_time)
        .fetch_all(self.storage.get_pool())
        .await?;

        Ok(points)
    }
}
