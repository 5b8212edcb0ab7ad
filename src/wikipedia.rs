use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::model::WikiSummary;

const GEOSEARCH_RADIUS_M: u32 = 1_000;
const GEOSEARCH_LIMIT: u32 = 5;
const HTTP_TIMEOUT_SECS: u64 = 10;

/// Secondary encyclopedia provider. All three lookups are best-effort from
/// the pipeline's point of view; errors are contained by the caller.
#[async_trait]
pub trait WikiProvider: Send + Sync {
    /// Full-text search; top hit's title, if any.
    async fn search_title(&self, name: &str) -> AppResult<Option<String>>;

    /// Proximity lookup around a coordinate; nearest title, if any.
    async fn nearby_title(&self, lat: f64, lng: f64) -> AppResult<Option<String>>;

    /// Summary record for a title: description text plus optional thumbnail.
    async fn summary(&self, title: &str) -> AppResult<Option<WikiSummary>>;
}

#[derive(Clone)]
pub struct WikipediaClient {
    http: Client,
    api_base: String,
    rest_base: String,
}

impl WikipediaClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("travel-guide/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_base: config.wikipedia_api_base.clone(),
            rest_base: config.wikipedia_rest_base.clone(),
        })
    }

    fn action_url(&self) -> AppResult<Url> {
        Url::parse(&self.api_base)
            .map_err(|err| AppError::Config(format!("invalid Wikipedia API base: {err}")))
    }

    fn summary_url(&self, title: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.rest_base)
            .map_err(|err| AppError::Config(format!("invalid Wikipedia REST base: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| AppError::Config("invalid Wikipedia REST base".into()))?
            .push("page")
            .push("summary")
            .push(title);
        Ok(url)
    }
}

#[async_trait]
impl WikiProvider for WikipediaClient {
    async fn search_title(&self, name: &str) -> AppResult<Option<String>> {
        let mut url = self.action_url()?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "search")
            .append_pair("srsearch", name)
            .append_pair("format", "json")
            .append_pair("origin", "*");

        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: SearchEnvelope = response.json().await?;
        Ok(parsed
            .query
            .and_then(|q| q.search)
            .and_then(|mut hits| hits.drain(..).next())
            .map(|hit| hit.title))
    }

    async fn nearby_title(&self, lat: f64, lng: f64) -> AppResult<Option<String>> {
        let mut url = self.action_url()?;
        url.query_pairs_mut()
            .append_pair("action", "query")
            .append_pair("list", "geosearch")
            .append_pair("gscoord", &format!("{lat}|{lng}"))
            .append_pair("gsradius", &GEOSEARCH_RADIUS_M.to_string())
            .append_pair("gslimit", &GEOSEARCH_LIMIT.to_string())
            .append_pair("format", "json")
            .append_pair("origin", "*");

        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: GeoEnvelope = response.json().await?;
        Ok(parsed
            .query
            .and_then(|q| q.geosearch)
            .and_then(|mut hits| hits.drain(..).next())
            .map(|hit| hit.title))
    }

    async fn summary(&self, title: &str) -> AppResult<Option<WikiSummary>> {
        let url = self.summary_url(title)?;
        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: SummaryResponse = response.json().await?;
        Ok(Some(WikiSummary {
            description: parsed.extract.unwrap_or_default(),
            thumbnail: parsed.thumbnail.and_then(|t| t.source),
        }))
    }
}

#[derive(Deserialize)]
struct SearchEnvelope {
    query: Option<SearchQuery>,
}

#[derive(Deserialize)]
struct SearchQuery {
    search: Option<Vec<TitledHit>>,
}

#[derive(Deserialize)]
struct GeoEnvelope {
    query: Option<GeoQuery>,
}

#[derive(Deserialize)]
struct GeoQuery {
    geosearch: Option<Vec<TitledHit>>,
}

#[derive(Deserialize)]
struct TitledHit {
    title: String,
}

#[derive(Deserialize)]
struct SummaryResponse {
    extract: Option<String>,
    thumbnail: Option<SummaryThumbnail>,
}

#[derive(Deserialize)]
struct SummaryThumbnail {
    source: Option<String>,
}
