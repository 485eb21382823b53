//! Bucket enumeration and deletion.

use chrono::Utc;
use tokio_rusqlite::params;

use super::connection::CacheDb;
use crate::Error;

impl CacheDb {
    /// Create the bucket if it does not exist yet.
    pub async fn open_bucket(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All bucket names, in creation order.
    pub async fn list_buckets(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY created_at ASC, name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and every entry in it.
    ///
    /// Returns whether the bucket existed.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Entry counts for every bucket, including empty ones.
    pub async fn bucket_counts(&self) -> Result<Vec<(String, u64)>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<(String, u64)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT b.name, COUNT(e.key) FROM buckets b
                     LEFT JOIN entries e ON e.bucket = b.name
                     GROUP BY b.name ORDER BY b.name ASC",
                )?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }
}
