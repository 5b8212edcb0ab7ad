use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::model::{RawCandidate, SpotDetail};

const DETAIL_FIELDS: &str = "formatted_address,business_status,rating,user_ratings_total,type,opening_hours/weekday_text,formatted_phone_number,website,photos,name";
const PHOTO_MAX_WIDTH: u32 = 1024;
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Primary place-search provider: broad text search, per-spot detail record
/// and a photo-serving URL for provider photo references.
#[async_trait]
pub trait SpotProvider: Send + Sync {
    /// Paginated broad search. Terminates early on any provider or transport
    /// failure and returns whatever accumulated; never surfaces an error.
    async fn search_spots(&self, city_name: &str) -> Vec<RawCandidate>;

    async fn spot_detail(&self, spot_id: &str) -> AppResult<SpotDetail>;

    fn photo_url(&self, photo_reference: &str) -> String;
}

#[derive(Clone)]
pub struct GooglePlacesClient {
    http: Client,
    api_base: String,
    api_key: SecretString,
    max_pages: usize,
    page_delay: Duration,
}

impl GooglePlacesClient {
    pub fn maybe_new(config: &AppConfig) -> AppResult<Option<Self>> {
        let Some(api_key) = config.google_places_api_key.clone() else {
            return Ok(None);
        };

        let http = Client::builder()
            .user_agent(concat!("travel-guide/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Some(Self {
            http,
            api_base: config.google_places_api_base.clone(),
            api_key,
            max_pages: config.max_search_pages,
            page_delay: Duration::from_millis(config.page_delay_ms),
        }))
    }

    fn endpoint(&self, path: &str) -> AppResult<Url> {
        Url::parse(&format!("{}/{path}", self.api_base))
            .map_err(|err| AppError::Config(format!("invalid Places API base: {err}")))
    }

    fn search_url(&self, city_name: &str) -> AppResult<Url> {
        let mut url = self.endpoint("place/textsearch/json")?;
        url.query_pairs_mut()
            .append_pair("query", &format!("places to visit in {city_name}"))
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    fn next_page_url(&self, token: &str) -> AppResult<Url> {
        let mut url = self.endpoint("place/textsearch/json")?;
        url.query_pairs_mut()
            .append_pair("pagetoken", token)
            .append_pair("key", self.api_key.expose_secret());
        Ok(url)
    }

    async fn fetch_search_page(&self, url: Url) -> AppResult<SearchResponse> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl SpotProvider for GooglePlacesClient {
    async fn search_spots(&self, city_name: &str) -> Vec<RawCandidate> {
        let mut candidates = Vec::new();
        let mut url = match self.search_url(city_name) {
            Ok(url) => url,
            Err(err) => {
                warn!(?err, "could not build text search URL");
                return candidates;
            }
        };

        for page in 0..self.max_pages {
            debug!(page = page + 1, city_name, "fetching text search page");
            let parsed = match self.fetch_search_page(url).await {
                Ok(parsed) => parsed,
                Err(err) => {
                    warn!(?err, page = page + 1, "text search request failed");
                    break;
                }
            };

            if parsed.status != "OK" && parsed.status != "ZERO_RESULTS" {
                warn!(
                    status = %parsed.status,
                    error_message = parsed.error_message.as_deref().unwrap_or("unknown"),
                    "text search returned a failure status"
                );
                break;
            }

            if let Some(results) = parsed.results {
                candidates.extend(results.into_iter().map(RawCandidate::from));
            }

            let Some(token) = parsed.next_page_token else {
                break;
            };
            // Per provider contract the token is not valid until the delay
            // has elapsed.
            sleep(self.page_delay).await;
            url = match self.next_page_url(&token) {
                Ok(url) => url,
                Err(err) => {
                    warn!(?err, "could not build continuation URL");
                    break;
                }
            };
        }

        debug!(count = candidates.len(), city_name, "text search complete");
        candidates
    }

    async fn spot_detail(&self, spot_id: &str) -> AppResult<SpotDetail> {
        let mut url = self.endpoint("place/details/json")?;
        url.query_pairs_mut()
            .append_pair("place_id", spot_id)
            .append_pair("fields", DETAIL_FIELDS)
            .append_pair("key", self.api_key.expose_secret());

        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: DetailsResponse = response.json().await?;

        if parsed.status != "OK" {
            return Err(AppError::Provider(format!(
                "details lookup for {spot_id} returned {}: {}",
                parsed.status,
                parsed.error_message.as_deref().unwrap_or("no details")
            )));
        }

        Ok(parsed.result.map(SpotDetail::from).unwrap_or_default())
    }

    fn photo_url(&self, photo_reference: &str) -> String {
        let mut url = match self.endpoint("place/photo") {
            Ok(url) => url,
            Err(_) => return String::new(),
        };
        url.query_pairs_mut()
            .append_pair("maxwidth", &PHOTO_MAX_WIDTH.to_string())
            .append_pair("photoreference", photo_reference)
            .append_pair("key", self.api_key.expose_secret());
        url.to_string()
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    status: String,
    error_message: Option<String>,
    results: Option<Vec<SearchResult>>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct SearchResult {
    place_id: Option<String>,
    name: Option<String>,
    geometry: Option<SearchGeometry>,
    types: Option<Vec<String>>,
    photos: Option<Vec<PhotoEntry>>,
}

#[derive(Deserialize)]
struct SearchGeometry {
    location: Option<SearchLocation>,
}

#[derive(Deserialize)]
struct SearchLocation {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Deserialize)]
struct PhotoEntry {
    photo_reference: Option<String>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    error_message: Option<String>,
    result: Option<DetailsResult>,
}

#[derive(Deserialize)]
struct DetailsResult {
    formatted_address: Option<String>,
    business_status: Option<String>,
    rating: Option<f64>,
    user_ratings_total: Option<u32>,
    types: Option<Vec<String>>,
    opening_hours: Option<DetailsHours>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    photos: Option<Vec<PhotoEntry>>,
}

#[derive(Deserialize)]
struct DetailsHours {
    weekday_text: Option<Vec<String>>,
}

impl From<SearchResult> for RawCandidate {
    fn from(value: SearchResult) -> Self {
        let location = value.geometry.and_then(|g| g.location);
        Self {
            spot_id: value.place_id,
            name: value.name,
            lat: location.as_ref().and_then(|l| l.lat),
            lng: location.as_ref().and_then(|l| l.lng),
            categories: value.types.unwrap_or_default(),
            photo_reference: value
                .photos
                .and_then(|mut photos| photos.drain(..).next())
                .and_then(|photo| photo.photo_reference),
        }
    }
}

impl From<DetailsResult> for SpotDetail {
    fn from(value: DetailsResult) -> Self {
        Self {
            address: value.formatted_address.unwrap_or_default(),
            business_status: value.business_status.unwrap_or_default(),
            rating: value.rating,
            review_count: value.user_ratings_total.unwrap_or(0),
            categories: value.types.unwrap_or_default(),
            opening_hours: value
                .opening_hours
                .and_then(|hours| hours.weekday_text)
                .unwrap_or_default(),
            phone: value.formatted_phone_number.unwrap_or_default(),
            website: value.website.unwrap_or_default(),
            photo_reference: value
                .photos
                .and_then(|mut photos| photos.drain(..).next())
                .and_then(|photo| photo.photo_reference),
        }
    }
}
