use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

const DEFAULT_GOOGLE_PLACES_API_BASE: &str = "https://maps.googleapis.com/maps/api";
const DEFAULT_WIKIPEDIA_API_BASE: &str = "https://en.wikipedia.org/w/api.php";
const DEFAULT_WIKIPEDIA_REST_BASE: &str = "https://en.wikipedia.org/api/rest_v1";
const DEFAULT_PAGE_DELAY_MS: u64 = 2_000;
const DEFAULT_MAX_SEARCH_PAGES: usize = 3;
const DEFAULT_ENRICH_CONCURRENCY: usize = 8;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub google_places_api_key: Option<SecretString>,
    pub google_places_api_base: String,
    pub wikipedia_api_base: String,
    pub wikipedia_rest_base: String,
    /// Pages of text-search results fetched per destination.
    pub max_search_pages: usize,
    /// Wait before a continuation token becomes usable, per provider contract.
    pub page_delay_ms: u64,
    /// Upper bound on concurrent enrichment tasks.
    pub enrich_concurrency: usize,
    /// Cached destinations older than this are refetched. None means a hit
    /// never expires.
    pub cache_max_age_secs: Option<u64>,
    pub database_file_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub has_google_places_key: bool,
    pub google_places_api_base: String,
    pub wikipedia_api_base: String,
    pub wikipedia_rest_base: String,
    pub max_search_pages: usize,
    pub page_delay_ms: u64,
    pub enrich_concurrency: usize,
    pub cache_max_age_secs: Option<u64>,
    pub database_file_name: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            google_places_api_key: env::var("GOOGLE_PLACES_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            google_places_api_base: base_url("GOOGLE_PLACES_API_BASE", DEFAULT_GOOGLE_PLACES_API_BASE),
            wikipedia_api_base: base_url("WIKIPEDIA_API_BASE", DEFAULT_WIKIPEDIA_API_BASE),
            wikipedia_rest_base: base_url("WIKIPEDIA_REST_BASE", DEFAULT_WIKIPEDIA_REST_BASE),
            max_search_pages: parse_usize("MAX_SEARCH_PAGES", DEFAULT_MAX_SEARCH_PAGES).max(1),
            page_delay_ms: parse_u64("PAGE_DELAY_MS", DEFAULT_PAGE_DELAY_MS),
            enrich_concurrency: parse_usize("ENRICH_CONCURRENCY", DEFAULT_ENRICH_CONCURRENCY).max(1),
            cache_max_age_secs: env::var("CACHE_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok()),
            database_file_name: env::var("DATABASE_FILE_NAME")
                .unwrap_or_else(|_| "travel-guide.db".to_string()),
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            has_google_places_key: self.google_places_api_key.is_some(),
            google_places_api_base: self.google_places_api_base.clone(),
            wikipedia_api_base: self.wikipedia_api_base.clone(),
            wikipedia_rest_base: self.wikipedia_rest_base.clone(),
            max_search_pages: self.max_search_pages,
            page_delay_ms: self.page_delay_ms,
            enrich_concurrency: self.enrich_concurrency,
            cache_max_age_secs: self.cache_max_age_secs,
            database_file_name: self.database_file_name.clone(),
        }
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn base_url(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}
