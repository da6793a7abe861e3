//! The station registry: durable id → identity/coordinates cache.
//!
//! Rows are created on first successful coordinate resolution and updated on
//! re-resolution; the pipeline never deletes them. A station present here
//! never needs another detail-page fetch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// Persisted static identity of a station.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RegistryEntry {
    pub id: String,
    pub name: String,
    pub address: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub updated_at: DateTime<Utc>,
}

impl RegistryEntry {
    /// Builds an entry for upsert; `updated_at` is assigned by the database.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: Option<String>,
        lat: f64,
        lng: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address,
            lat,
            lng,
            updated_at: Utc::now(),
        }
    }
}

/// Batched read: returns a map of the ids that exist. Missing ids are simply
/// absent, never an error.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn lookup_stations(
    pool: &PgPool,
    ids: &[String],
) -> Result<HashMap<String, RegistryEntry>, DbError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<RegistryEntry> = sqlx::query_as(
        "SELECT id, name, address, lat, lng, updated_at \
         FROM stations WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| (r.id.clone(), r)).collect())
}

/// Idempotent batched write keyed by id, one round-trip per batch.
///
/// Uses `INSERT … SELECT * FROM UNNEST(…) ON CONFLICT (id) DO UPDATE` so the
/// whole batch lands in a single statement. Returns the number of rows
/// written. Callers are expected to pass only entries with resolved
/// coordinates; re-upserting identical data is a no-op beyond `updated_at`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn upsert_stations(pool: &PgPool, entries: &[RegistryEntry]) -> Result<u64, DbError> {
    if entries.is_empty() {
        return Ok(0);
    }

    let mut ids: Vec<String> = Vec::with_capacity(entries.len());
    let mut names: Vec<String> = Vec::with_capacity(entries.len());
    let mut addresses: Vec<Option<String>> = Vec::with_capacity(entries.len());
    let mut lats: Vec<f64> = Vec::with_capacity(entries.len());
    let mut lngs: Vec<f64> = Vec::with_capacity(entries.len());

    for entry in entries {
        ids.push(entry.id.clone());
        names.push(entry.name.clone());
        addresses.push(entry.address.clone());
        lats.push(entry.lat);
        lngs.push(entry.lng);
    }

    let result = sqlx::query(
        "INSERT INTO stations (id, name, address, lat, lng, updated_at) \
         SELECT *, NOW() FROM UNNEST($1::text[], $2::text[], $3::text[], $4::float8[], $5::float8[]) \
         ON CONFLICT (id) DO UPDATE SET \
             name       = EXCLUDED.name, \
             address    = COALESCE(EXCLUDED.address, stations.address), \
             lat        = EXCLUDED.lat, \
             lng        = EXCLUDED.lng, \
             updated_at = NOW()",
    )
    .bind(&ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&lats)
    .bind(&lngs)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Every registry row, for proximity queries served straight from the cache.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_stations(pool: &PgPool) -> Result<Vec<RegistryEntry>, DbError> {
    let rows = sqlx::query_as(
        "SELECT id, name, address, lat, lng, updated_at FROM stations ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
