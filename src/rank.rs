use std::cmp::Ordering;

use crate::model::Place;

/// Deterministic ranking over a cleaned place set: review count desc, rating
/// desc (missing ranks below any real value), then presence of phone and
/// website. `sort_by` is stable, so ties keep their input order.
pub fn rank_places(places: &mut [Place]) {
    places.sort_by(compare);
}

fn compare(a: &Place, b: &Place) -> Ordering {
    b.review_count
        .cmp(&a.review_count)
        .then_with(|| compare_rating(b.rating, a.rating))
        .then_with(|| has_value(&b.phone).cmp(&has_value(&a.phone)))
        .then_with(|| has_value(&b.website).cmp(&has_value(&a.website)))
}

fn compare_rating(b: Option<f64>, a: Option<f64>) -> Ordering {
    match (b, a) {
        (Some(b), Some(a)) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn has_value(text: &str) -> bool {
    !text.is_empty()
}
