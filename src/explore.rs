use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::enrich::Enricher;
use crate::errors::{AppError, AppResult};
use crate::google::SpotProvider;
use crate::model::Place;
use crate::rank::rank_places;
use crate::store::{CacheDecision, Freshness, PlaceStore};
use crate::wikipedia::WikiProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct ExploreRequest {
    #[serde(rename = "destinationKey")]
    pub destination_key: String,
    #[serde(rename = "cityName")]
    pub city_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExploreResponse {
    pub data: Vec<Place>,
}

/// Wires the cache gate, raw fetcher, enricher, persistence writer and ranker
/// together for one request.
pub struct ExploreService {
    store: PlaceStore,
    spots: Arc<dyn SpotProvider>,
    enricher: Enricher,
    freshness: Freshness,
}

impl ExploreService {
    pub fn new(
        store: PlaceStore,
        spots: Arc<dyn SpotProvider>,
        wiki: Arc<dyn WikiProvider>,
        freshness: Freshness,
        enrich_concurrency: usize,
    ) -> Self {
        let enricher = Enricher::new(Arc::clone(&spots), wiki, enrich_concurrency);
        Self {
            store,
            spots,
            enricher,
            freshness,
        }
    }

    pub async fn build_destination_result(
        &self,
        request: &ExploreRequest,
    ) -> AppResult<ExploreResponse> {
        let destination_key = required_field(&request.destination_key, "destinationKey")?;
        let city_name = required_field(&request.city_name, "cityName")?;

        if let CacheDecision::Hit(mut places) =
            self.store.cache_lookup(destination_key, self.freshness)?
        {
            info!(destination_key, count = places.len(), "cache hit");
            rank_places(&mut places);
            return Ok(ExploreResponse { data: places });
        }

        info!(destination_key, city_name, "cache miss; fetching from providers");
        self.store.insert_destination(destination_key, city_name)?;

        let candidates = self.spots.search_spots(city_name).await;
        let mut places = self.enricher.enrich_all(destination_key, candidates).await;

        for place in &places {
            // A failed row write does not exclude the record from the
            // response; the store stays eventually consistent on a later miss.
            if let Err(err) = self.store.insert_place(place) {
                warn!(?err, spot_id = %place.spot_id, "place write failed");
            }
        }

        rank_places(&mut places);
        info!(destination_key, count = places.len(), "built destination result");
        Ok(ExploreResponse { data: places })
    }

    /// Read-only lookup consumed by the single-place detail endpoint.
    pub fn place_details(&self, spot_id: &str) -> AppResult<Option<Place>> {
        self.store.place_by_id(spot_id)
    }
}

fn required_field<'a>(value: &'a str, field: &str) -> AppResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("missing {field}")));
    }
    Ok(trimmed)
}
