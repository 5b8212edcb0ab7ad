use serde::Serialize;

/// Provider category that unconditionally removes a candidate from results.
pub const EXCLUDED_CATEGORY: &str = "travel_agency";

/// A searchable area a request is scoped to, e.g. a city.
#[derive(Debug, Clone, Serialize)]
pub struct Destination {
    pub key: String,
    pub name: String,
    pub created_at: String,
}

/// One point of interest belonging to a destination.
#[derive(Debug, Clone, Serialize)]
pub struct Place {
    pub spot_id: String,
    pub destination_key: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub business_status: String,
    pub rating: Option<f64>,
    pub categories: Vec<String>,
    pub review_count: u32,
    pub opening_hours: Vec<String>,
    pub phone: String,
    pub website: String,
    pub photo_url: String,
}

impl Place {
    pub fn is_excluded(&self) -> bool {
        has_excluded_category(&self.categories)
    }
}

pub fn has_excluded_category(categories: &[String]) -> bool {
    categories.iter().any(|c| c == EXCLUDED_CATEGORY)
}

/// A broad text-search result before enrichment. Coordinates and identifiers
/// are optional because the provider payload offers no such guarantee.
#[derive(Debug, Clone, Default)]
pub struct RawCandidate {
    pub spot_id: Option<String>,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub categories: Vec<String>,
    pub photo_reference: Option<String>,
}

/// Detail record for one candidate. All fields default to empty when the
/// detail call fails, per the partial-success policy.
#[derive(Debug, Clone, Default)]
pub struct SpotDetail {
    pub address: String,
    pub business_status: String,
    pub rating: Option<f64>,
    pub review_count: u32,
    pub categories: Vec<String>,
    pub opening_hours: Vec<String>,
    pub phone: String,
    pub website: String,
    pub photo_reference: Option<String>,
}

/// Encyclopedia summary used for description and fallback imagery.
#[derive(Debug, Clone)]
pub struct WikiSummary {
    pub description: String,
    pub thumbnail: Option<String>,
}
