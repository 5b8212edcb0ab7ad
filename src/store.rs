use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::{debug, trace};

use crate::db::now_timestamp;
use crate::errors::{AppError, AppResult};
use crate::model::{Destination, Place};

/// Policy deciding when a cached destination is still usable. The original
/// behavior is `Permanent`: any existing non-empty row set is fresh forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Permanent,
    MaxAge(Duration),
}

impl Freshness {
    pub fn from_max_age_secs(secs: Option<u64>) -> Self {
        match secs {
            Some(secs) => Freshness::MaxAge(Duration::seconds(secs as i64)),
            None => Freshness::Permanent,
        }
    }

    fn is_fresh(&self, created_at: &str) -> bool {
        match self {
            Freshness::Permanent => true,
            Freshness::MaxAge(max_age) => DateTime::parse_from_rfc3339(created_at)
                .map(|created| Utc::now().signed_duration_since(created) <= *max_age)
                .unwrap_or(false),
        }
    }
}

#[derive(Debug)]
pub enum CacheDecision {
    Hit(Vec<Place>),
    Miss,
}

pub struct PlaceStore {
    db: Arc<Mutex<Connection>>,
}

impl PlaceStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Cache gate: hit requires a destination row that is fresh by policy and
    /// at least one associated non-excluded place. Hit carries the filtered
    /// rows.
    pub fn cache_lookup(
        &self,
        destination_key: &str,
        freshness: Freshness,
    ) -> AppResult<CacheDecision> {
        let Some(destination) = self.destination(destination_key)? else {
            return Ok(CacheDecision::Miss);
        };

        if !freshness.is_fresh(&destination.created_at) {
            debug!(
                destination_key,
                created_at = %destination.created_at,
                "cached destination is stale"
            );
            return Ok(CacheDecision::Miss);
        }

        let places = self.places_for_destination(destination_key)?;
        if places.is_empty() {
            return Ok(CacheDecision::Miss);
        }
        Ok(CacheDecision::Hit(places))
    }

    /// Idempotent create: no-op when the key already exists. Destinations are
    /// never updated or deleted.
    pub fn insert_destination(&self, key: &str, name: &str) -> AppResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "INSERT INTO destinations (key, name, created_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO NOTHING",
            (key, name, now_timestamp()),
        )?;
        Ok(changed == 1)
    }

    /// Idempotent create keyed by spot id: the first successful write wins and
    /// later conflicting writes are discarded, never merged.
    pub fn insert_place(&self, place: &Place) -> AppResult<bool> {
        let conn = self.db.lock();
        let changed = conn.execute(
            "INSERT INTO places (
                spot_id, destination_key, name, description, address,
                business_status, rating, categories, review_count, opening_hours,
                phone, website, photo_url, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ON CONFLICT(spot_id) DO NOTHING",
            rusqlite::params![
                place.spot_id,
                place.destination_key,
                place.name,
                place.description,
                place.address,
                place.business_status,
                place.rating,
                encode_lines(&place.categories),
                place.review_count,
                encode_lines(&place.opening_hours),
                place.phone,
                place.website,
                place.photo_url,
                now_timestamp(),
            ],
        )?;
        trace!(spot_id = %place.spot_id, inserted = changed == 1, "place write");
        Ok(changed == 1)
    }

    /// All non-excluded places for a destination, in insertion order.
    pub fn places_for_destination(&self, destination_key: &str) -> AppResult<Vec<Place>> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare(
            "SELECT spot_id, destination_key, name, description, address,
                business_status, rating, categories, review_count, opening_hours,
                phone, website, photo_url
            FROM places
            WHERE destination_key = ?1
            ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([destination_key], parse_place)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows.into_iter().filter(|place| !place.is_excluded()).collect())
    }

    /// Single-row accessor consumed by the detail lookup endpoint.
    pub fn place_by_id(&self, spot_id: &str) -> AppResult<Option<Place>> {
        let conn = self.db.lock();
        conn.query_row(
            "SELECT spot_id, destination_key, name, description, address,
                business_status, rating, categories, review_count, opening_hours,
                phone, website, photo_url
            FROM places
            WHERE spot_id = ?1",
            [spot_id],
            parse_place,
        )
        .optional()
        .map_err(AppError::from)
    }

    pub fn destination(&self, key: &str) -> AppResult<Option<Destination>> {
        let conn = self.db.lock();
        conn.query_row(
            "SELECT key, name, created_at FROM destinations WHERE key = ?1",
            [key],
            |row| {
                Ok(Destination {
                    key: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(AppError::from)
    }
}

fn encode_lines(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(serde_json::to_string(values).unwrap_or_default())
    }
}

fn decode_lines(value: Option<String>) -> Vec<String> {
    value
        .and_then(|text| serde_json::from_str::<Vec<String>>(&text).ok())
        .unwrap_or_default()
}

fn parse_place(row: &Row<'_>) -> rusqlite::Result<Place> {
    Ok(Place {
        spot_id: row.get(0)?,
        destination_key: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        address: row.get(4)?,
        business_status: row.get(5)?,
        rating: row.get(6)?,
        categories: decode_lines(row.get(7)?),
        review_count: row.get(8)?,
        opening_hours: decode_lines(row.get(9)?),
        phone: row.get(10)?,
        website: row.get(11)?,
        photo_url: row.get(12)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::bootstrap;
    use tempfile::tempdir;

    fn test_store(dir: &std::path::Path) -> PlaceStore {
        let ctx = bootstrap(dir, "store.db").unwrap();
        PlaceStore::new(Arc::new(Mutex::new(ctx.connection)))
    }

    fn sample_place(spot_id: &str, destination_key: &str) -> Place {
        Place {
            spot_id: spot_id.into(),
            destination_key: destination_key.into(),
            name: format!("Place {spot_id}"),
            description: "A place".into(),
            address: "1 Main St".into(),
            business_status: "OPERATIONAL".into(),
            rating: Some(4.2),
            categories: vec!["museum".into()],
            review_count: 12,
            opening_hours: vec!["Monday: 9-5".into()],
            phone: "12345".into(),
            website: "https://example.com".into(),
            photo_url: String::new(),
        }
    }

    #[test]
    fn first_write_wins_for_places() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.insert_destination("city-1", "Testville").unwrap();

        let mut first = sample_place("spot-1", "city-1");
        first.name = "Original".into();
        assert!(store.insert_place(&first).unwrap());

        let mut second = sample_place("spot-1", "city-1");
        second.name = "Overwrite attempt".into();
        assert!(!store.insert_place(&second).unwrap());

        let stored = store.place_by_id("spot-1").unwrap().unwrap();
        assert_eq!(stored.name, "Original");
    }

    #[test]
    fn destination_insert_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        assert!(store.insert_destination("city-1", "Testville").unwrap());
        assert!(!store.insert_destination("city-1", "Renamed").unwrap());
    }

    #[test]
    fn cache_misses_without_destination_or_places() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());

        assert!(matches!(
            store.cache_lookup("city-1", Freshness::Permanent).unwrap(),
            CacheDecision::Miss
        ));

        store.insert_destination("city-1", "Testville").unwrap();
        assert!(matches!(
            store.cache_lookup("city-1", Freshness::Permanent).unwrap(),
            CacheDecision::Miss
        ));
    }

    #[test]
    fn cache_hit_filters_excluded_places() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.insert_destination("city-1", "Testville").unwrap();
        store.insert_place(&sample_place("spot-1", "city-1")).unwrap();

        let mut agency = sample_place("spot-2", "city-1");
        agency.categories = vec!["travel_agency".into()];
        store.insert_place(&agency).unwrap();

        match store.cache_lookup("city-1", Freshness::Permanent).unwrap() {
            CacheDecision::Hit(places) => {
                assert_eq!(places.len(), 1);
                assert_eq!(places[0].spot_id, "spot-1");
            }
            CacheDecision::Miss => panic!("expected a hit"),
        }
    }

    #[test]
    fn excluded_only_row_set_is_a_miss() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.insert_destination("city-1", "Testville").unwrap();
        let mut agency = sample_place("spot-2", "city-1");
        agency.categories = vec!["travel_agency".into()];
        store.insert_place(&agency).unwrap();

        assert!(matches!(
            store.cache_lookup("city-1", Freshness::Permanent).unwrap(),
            CacheDecision::Miss
        ));
    }

    #[test]
    fn max_age_policy_expires_old_destinations() {
        let dir = tempdir().unwrap();
        let store = test_store(dir.path());
        store.insert_destination("city-1", "Testville").unwrap();
        store.insert_place(&sample_place("spot-1", "city-1")).unwrap();

        // Backdate the destination past any reasonable max age.
        {
            let conn = store.db.lock();
            conn.execute(
                "UPDATE destinations SET created_at = ?1 WHERE key = 'city-1'",
                [(Utc::now() - Duration::hours(48)).to_rfc3339()],
            )
            .unwrap();
        }

        assert!(matches!(
            store
                .cache_lookup("city-1", Freshness::MaxAge(Duration::hours(1)))
                .unwrap(),
            CacheDecision::Miss
        ));
        assert!(matches!(
            store.cache_lookup("city-1", Freshness::Permanent).unwrap(),
            CacheDecision::Hit(_)
        ));
    }
}
