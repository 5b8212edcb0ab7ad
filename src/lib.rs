mod config;
mod db;
mod enrich;
mod errors;
mod explore;
mod google;
mod model;
mod rank;
mod store;
mod wikipedia;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::{AppConfig, PublicAppConfig};
pub use db::{bootstrap, DatabaseContext};
pub use enrich::Enricher;
pub use errors::{AppError, AppResult, ErrorPayload, Fault};
pub use explore::{ExploreRequest, ExploreResponse, ExploreService};
pub use google::{GooglePlacesClient, SpotProvider};
pub use model::{Destination, Place, RawCandidate, SpotDetail, WikiSummary, EXCLUDED_CATEGORY};
pub use rank::rank_places;
pub use store::{CacheDecision, Freshness, PlaceStore};
pub use wikipedia::{WikiProvider, WikipediaClient};

/// Fully wired explore pipeline over a local database and the live providers.
pub struct ExploreApp {
    pub service: ExploreService,
    pub db_path: PathBuf,
}

impl ExploreApp {
    pub fn initialize<P: AsRef<Path>>(data_dir: P, config: &AppConfig) -> AppResult<Self> {
        init_tracing();

        let ctx = db::bootstrap(data_dir, &config.database_file_name)?;
        let db = Arc::new(Mutex::new(ctx.connection));

        let spots = GooglePlacesClient::maybe_new(config)?.ok_or_else(|| {
            AppError::Config("GOOGLE_PLACES_API_KEY is required to fetch destinations".into())
        })?;
        let wiki = WikipediaClient::new(config)?;

        let service = ExploreService::new(
            PlaceStore::new(db),
            Arc::new(spots),
            Arc::new(wiki),
            Freshness::from_max_age_secs(config.cache_max_age_secs),
            config.enrich_concurrency,
        );

        Ok(Self {
            service,
            db_path: ctx.path,
        })
    }
}

fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,travel_guide=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
