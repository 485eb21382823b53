//! Cached response CRUD operations.
//!
//! Every stored entry carries a synthetic `sw-cache-date` header. The same
//! instant is mirrored into `cached_at_ms` so eviction can order entries
//! without decoding headers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::compute_cache_key;
use crate::Error;
use crate::fetch::{CACHE_DATE_HEADER, Request, Response, ResponseSource};

/// A stored response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
}

impl CacheEntry {
    /// Capture a response for storage, stamping it with `stored_at`.
    pub fn from_response(request: &Request, response: &Response, stored_at: DateTime<Utc>) -> Self {
        let mut headers = response.headers.clone();
        headers.insert(CACHE_DATE_HEADER.to_string(), stored_at.to_rfc3339());
        Self {
            key: compute_cache_key(&request.method, request.url.as_str()),
            method: request.method.clone(),
            url: request.url.to_string(),
            status: response.status,
            headers,
            body: response.body.clone(),
        }
    }

    /// The stored-at instant, if the header is present and parses.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        self.headers
            .get(CACHE_DATE_HEADER)
            .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Milliseconds since the epoch; entries without a usable date sort first.
    pub fn timestamp_ms(&self) -> i64 {
        self.cached_at().map(|dt| dt.timestamp_millis()).unwrap_or(0)
    }

    /// Whether the entry is younger than `max_age_seconds` at `now`.
    pub fn is_fresh(&self, max_age_seconds: u64, now: DateTime<Utc>) -> bool {
        let age_ms = now.timestamp_millis() - self.timestamp_ms();
        let max_age_ms = i64::try_from(max_age_seconds).unwrap_or(i64::MAX).saturating_mul(1000);
        age_ms < max_age_ms
    }

    pub fn into_response(self) -> Response {
        Response { url: self.url, status: self.status, headers: self.headers, body: self.body, source: ResponseSource::Cache }
    }
}

impl CacheDb {
    /// Look up the entry stored for `request` in `bucket`.
    pub async fn match_entry(&self, bucket: &str, request: &Request) -> Result<Option<CacheEntry>, Error> {
        self.get_entry(bucket, &compute_cache_key(&request.method, request.url.as_str()))
            .await
    }

    /// Get an entry by key.
    ///
    /// Returns None if the bucket or key doesn't exist.
    pub async fn get_entry(&self, bucket: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(CacheEntry, String)>, Error> {
                let result = conn.query_row(
                    "SELECT key, method, url, status, headers_json, body
                     FROM entries WHERE bucket = ?1 AND key = ?2",
                    params![bucket, key],
                    |row| {
                        Ok((
                            CacheEntry {
                                key: row.get(0)?,
                                method: row.get(1)?,
                                url: row.get(2)?,
                                status: row.get(3)?,
                                headers: BTreeMap::new(),
                                body: row.get(5)?,
                            },
                            row.get::<_, String>(4)?,
                        ))
                    },
                );

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((mut entry, headers_json)) = row else {
            return Ok(None);
        };
        entry.headers = serde_json::from_str(&headers_json).unwrap_or_else(|e| {
            tracing::warn!(key = %entry.key, "discarding unreadable stored headers: {e}");
            BTreeMap::new()
        });
        Ok(Some(entry))
    }

    /// Insert or replace an entry, opening the bucket if needed.
    ///
    /// Last write wins for concurrent writers of the same key.
    pub async fn put_entry(&self, bucket: &str, entry: &CacheEntry) -> Result<(), Error> {
        self.put_entries(bucket, std::slice::from_ref(entry)).await
    }

    /// Insert or replace several entries in one transaction.
    ///
    /// Either every entry lands or none does.
    pub async fn put_entries(&self, bucket: &str, entries: &[CacheEntry]) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let rows = entries
            .iter()
            .map(|e| {
                let headers_json = serde_json::to_string(&e.headers)
                    .map_err(|err| Error::InvalidInput(format!("unserializable headers for {}: {err}", e.url)))?;
                Ok((e.clone(), headers_json, e.timestamp_ms()))
            })
            .collect::<Result<Vec<_>, Error>>()?;

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![bucket, Utc::now().to_rfc3339()],
                )?;
                for (entry, headers_json, cached_at_ms) in &rows {
                    tx.execute(
                        "INSERT INTO entries (bucket, key, method, url, status, headers_json, body, cached_at_ms)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                         ON CONFLICT(bucket, key) DO UPDATE SET
                            method = excluded.method,
                            url = excluded.url,
                            status = excluded.status,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            cached_at_ms = excluded.cached_at_ms",
                        params![
                            bucket,
                            entry.key,
                            entry.method,
                            entry.url,
                            entry.status,
                            headers_json,
                            entry.body,
                            cached_at_ms,
                        ],
                    )?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry. Returns whether anything was removed.
    pub async fn delete_entry(&self, bucket: &str, key: &str) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM entries WHERE bucket = ?1 AND key = ?2", params![bucket, key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Snapshot of every key in the bucket with its stored timestamp.
    pub async fn entry_timestamps(&self, bucket: &str) -> Result<Vec<(String, i64)>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<(String, i64)>, Error> {
                let mut stmt = conn.prepare("SELECT key, cached_at_ms FROM entries WHERE bucket = ?1")?;
                let rows = stmt
                    .query_map(params![bucket], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn count_entries(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
