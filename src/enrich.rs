use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::errors::AppResult;
use crate::google::SpotProvider;
use crate::model::{has_excluded_category, Place, RawCandidate, SpotDetail, WikiSummary};
use crate::wikipedia::WikiProvider;

/// Fans enrichment out across candidates. Each task is independent: a failed
/// or panicking task drops only its own candidate. The semaphore bounds how
/// many provider calls run at once.
pub struct Enricher {
    spots: Arc<dyn SpotProvider>,
    wiki: Arc<dyn WikiProvider>,
    concurrency: usize,
}

impl Enricher {
    pub fn new(spots: Arc<dyn SpotProvider>, wiki: Arc<dyn WikiProvider>, concurrency: usize) -> Self {
        Self {
            spots,
            wiki,
            concurrency: concurrency.max(1),
        }
    }

    /// Enriches every candidate concurrently and returns the survivors in
    /// candidate order, drops removed.
    pub async fn enrich_all(
        &self,
        destination_key: &str,
        candidates: Vec<RawCandidate>,
    ) -> Vec<Place> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, candidate) in candidates.into_iter().enumerate() {
            let spots = Arc::clone(&self.spots);
            let wiki = Arc::clone(&self.wiki);
            let permit_source = Arc::clone(&semaphore);
            let destination_key = destination_key.to_string();
            tasks.spawn(async move {
                let _permit = permit_source.acquire_owned().await;
                let place = enrich_candidate(&*spots, &*wiki, &destination_key, candidate).await;
                (index, place)
            });
        }

        let mut enriched = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Some(place))) => enriched.push((index, place)),
                Ok((_, None)) => {}
                Err(err) => {
                    warn!(?err, "enrichment task aborted; dropping its candidate");
                }
            }
        }

        enriched.sort_by_key(|(index, _)| *index);
        enriched.into_iter().map(|(_, place)| place).collect()
    }
}

async fn enrich_candidate(
    spots: &dyn SpotProvider,
    wiki: &dyn WikiProvider,
    destination_key: &str,
    candidate: RawCandidate,
) -> Option<Place> {
    let (Some(spot_id), Some(name), Some(lat), Some(lng)) = (
        candidate.spot_id,
        candidate.name,
        candidate.lat,
        candidate.lng,
    ) else {
        warn!("skipping candidate with missing id, name or coordinates");
        return None;
    };

    if has_excluded_category(&candidate.categories) {
        debug!(name, "skipping excluded candidate before detail lookup");
        return None;
    }

    let detail = match spots.spot_detail(&spot_id).await {
        Ok(detail) => detail,
        Err(err) => {
            warn!(?err, spot_id, name, "detail lookup failed; using empty detail record");
            SpotDetail::default()
        }
    };

    if has_excluded_category(&detail.categories) {
        debug!(name, "skipping excluded candidate after detail lookup");
        return None;
    }

    let provider_photo = detail
        .photo_reference
        .as_deref()
        .or(candidate.photo_reference.as_deref())
        .map(|reference| spots.photo_url(reference));

    let summary = resolve_wiki_summary(wiki, &name, lat, lng).await;
    let (description, thumbnail) = match summary {
        Some(summary) => (summary.description, summary.thumbnail),
        None => (String::new(), None),
    };

    Some(Place {
        spot_id,
        destination_key: destination_key.to_string(),
        name,
        description,
        address: detail.address,
        business_status: detail.business_status,
        rating: detail.rating,
        categories: detail.categories,
        review_count: detail.review_count,
        opening_hours: detail.opening_hours,
        phone: detail.phone,
        website: detail.website,
        photo_url: provider_photo.or(thumbnail).unwrap_or_default(),
    })
}

/// Best-effort description and fallback image: title search first, then a
/// proximity lookup, then the summary record. Failures anywhere end the chain
/// with no summary.
async fn resolve_wiki_summary(
    wiki: &dyn WikiProvider,
    name: &str,
    lat: f64,
    lng: f64,
) -> Option<WikiSummary> {
    let mut title = contained(wiki.search_title(name).await, "title search");
    if title.is_none() {
        title = contained(wiki.nearby_title(lat, lng).await, "proximity search");
    }
    let title = title?;
    contained(wiki.summary(&title).await, "summary fetch")
}

fn contained<T>(result: AppResult<Option<T>>, stage: &str) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(?err, stage, "encyclopedia lookup failed");
            None
        }
    }
}
