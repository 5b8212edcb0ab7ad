use httptest::matchers::{all_of, contains, request, url_decoded};
use httptest::responders::json_encoded;
use httptest::{Expectation, Server};
use serde_json::json;
use tempfile::tempdir;

use travel_guide::{AppConfig, ExploreApp, ExploreRequest, Fault};

fn search_page_one() -> serde_json::Value {
    json!({
        "status": "OK",
        "results": [
            {
                "place_id": "spot-1",
                "name": "Grand Fort",
                "geometry": { "location": { "lat": 12.97, "lng": 77.59 } },
                "types": ["tourist_attraction", "point_of_interest"],
                "photos": [{ "photo_reference": "raw-ref-1" }]
            },
            {
                "place_id": "spot-2",
                "name": "Travel Hub",
                "geometry": { "location": { "lat": 12.98, "lng": 77.60 } },
                "types": ["travel_agency", "point_of_interest"]
            }
        ],
        "next_page_token": "token-2"
    })
}

fn search_page_two() -> serde_json::Value {
    json!({
        "status": "OK",
        "results": [
            {
                "place_id": "spot-3",
                "name": "Quiet Garden",
                "geometry": { "location": { "lat": 12.99, "lng": 77.61 } },
                "types": ["park"]
            }
        ]
    })
}

#[tokio::test]
async fn build_destination_result_roundtrip() {
    let server = Server::run();

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/maps/api/place/textsearch/json"),
            request::query(url_decoded(contains((
                "query",
                "places to visit in Testville"
            ))))
        ))
        .respond_with(json_encoded(search_page_one())),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/maps/api/place/textsearch/json"),
            request::query(url_decoded(contains(("pagetoken", "token-2"))))
        ))
        .respond_with(json_encoded(search_page_two())),
    );

    // The raw travel agency (spot-2) must never reach the details endpoint,
    // so only two detail expectations exist.
    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/maps/api/place/details/json"),
            request::query(url_decoded(contains(("place_id", "spot-1"))))
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "result": {
                "formatted_address": "1 Fort Rd",
                "business_status": "OPERATIONAL",
                "rating": 4.5,
                "user_ratings_total": 100,
                "types": ["tourist_attraction"],
                "opening_hours": { "weekday_text": ["Monday: 9 AM - 5 PM"] },
                "formatted_phone_number": "080 1234",
                "website": "https://fort.example.com",
                "photos": [{ "photo_reference": "detail-ref-1" }]
            }
        }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/maps/api/place/details/json"),
            request::query(url_decoded(contains(("place_id", "spot-3"))))
        ))
        .respond_with(json_encoded(json!({
            "status": "OK",
            "result": {
                "formatted_address": "Garden Lane",
                "rating": 4.8,
                "user_ratings_total": 50,
                "types": ["park"]
            }
        }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/w/api.php"),
            request::query(url_decoded(contains(("srsearch", "Grand Fort"))))
        ))
        .respond_with(json_encoded(json!({
            "query": { "search": [{ "title": "Grand_Fort" }] }
        }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/w/api.php"),
            request::query(url_decoded(contains(("srsearch", "Quiet Garden"))))
        ))
        .respond_with(json_encoded(json!({ "query": { "search": [] } }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/w/api.php"),
            request::query(url_decoded(contains(("list", "geosearch"))))
        ))
        .respond_with(json_encoded(json!({ "query": { "geosearch": [] } }))),
    );

    server.expect(
        Expectation::matching(all_of!(
            request::method("GET"),
            request::path("/api/rest_v1/page/summary/Grand_Fort")
        ))
        .respond_with(json_encoded(json!({
            "extract": "A 16th century fort.",
            "thumbnail": { "source": "https://wiki.test/fort.jpg" }
        }))),
    );

    std::env::set_var("GOOGLE_PLACES_API_KEY", "test-key");
    std::env::set_var(
        "GOOGLE_PLACES_API_BASE",
        server.url("/maps/api").to_string(),
    );
    std::env::set_var("WIKIPEDIA_API_BASE", server.url("/w/api.php").to_string());
    std::env::set_var(
        "WIKIPEDIA_REST_BASE",
        server.url("/api/rest_v1").to_string(),
    );
    std::env::set_var("PAGE_DELAY_MS", "25");
    std::env::set_var("ENRICH_CONCURRENCY", "4");

    let config = AppConfig::from_env();
    let dir = tempdir().unwrap();
    let app = ExploreApp::initialize(dir.path(), &config).expect("app init");

    let request = ExploreRequest {
        destination_key: "city-42".into(),
        city_name: "Testville".into(),
    };
    let response = app
        .service
        .build_destination_result(&request)
        .await
        .expect("build result");

    // Travel agency filtered; spot-1 outranks spot-3 on review count.
    let ids: Vec<&str> = response.data.iter().map(|p| p.spot_id.as_str()).collect();
    assert_eq!(ids, vec!["spot-1", "spot-3"]);

    let fort = &response.data[0];
    assert_eq!(fort.description, "A 16th century fort.");
    assert!(fort.photo_url.contains("place/photo"));
    assert!(fort.photo_url.contains("detail-ref-1"));
    assert_eq!(fort.opening_hours, vec!["Monday: 9 AM - 5 PM"]);

    let garden = &response.data[1];
    assert!(garden.description.is_empty());
    assert!(garden.photo_url.is_empty());
    assert_eq!(garden.phone, "");

    // Persisted rows are readable through the single-place accessor.
    let stored = app.service.place_details("spot-1").expect("lookup").unwrap();
    assert_eq!(stored.name, "Grand Fort");
    assert_eq!(stored.review_count, 100);
    assert!(app.service.place_details("spot-2").expect("lookup").is_none());

    // Second request is served from the cache; the server sees no new calls.
    let cached = app
        .service
        .build_destination_result(&request)
        .await
        .expect("cached result");
    let cached_ids: Vec<&str> = cached.data.iter().map(|p| p.spot_id.as_str()).collect();
    assert_eq!(cached_ids, vec!["spot-1", "spot-3"]);

    // Blank destination key never reaches the store or the providers.
    let invalid = ExploreRequest {
        destination_key: "  ".into(),
        city_name: "Testville".into(),
    };
    let err = app
        .service
        .build_destination_result(&invalid)
        .await
        .unwrap_err();
    assert_eq!(err.fault(), Fault::Client);
}
