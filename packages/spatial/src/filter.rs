//! Pre-buffer filters over transit features.

use etod_map_site_models::TransitFeature;

/// Keeps only corridors whose route identifier is on the allow-list.
///
/// Route identifiers match exactly; `"9"` and `"X9"` are different routes.
#[must_use]
pub fn filter_corridors(features: Vec<TransitFeature>, allow: &[String]) -> Vec<TransitFeature> {
    let before = features.len();
    let kept: Vec<TransitFeature> = features
        .into_iter()
        .filter(|feature| allow.iter().any(|route| route == &feature.name))
        .collect();
    log::info!(
        "kept {} of {before} corridors on the high-frequency allow-list",
        kept.len()
    );
    kept
}

/// Keeps stations whose municipality matches the target city exactly.
///
/// A station with a blank municipality cell cannot be placed in the
/// target city and is dropped. Apply this only to feeds that publish the
/// column; the rail and bus feeds never carry it.
#[must_use]
pub fn filter_municipality(features: Vec<TransitFeature>, target: &str) -> Vec<TransitFeature> {
    let before = features.len();
    let kept: Vec<TransitFeature> = features
        .into_iter()
        .filter(|feature| feature.municipality.as_deref() == Some(target))
        .collect();
    log::info!("kept {} of {before} stations in {target}", kept.len());
    kept
}

#[cfg(test)]
mod tests {
    use etod_map_site_models::{TransitChannel, TransitGeometry};
    use geo::{LineString, MultiLineString, Point};

    use super::*;

    fn corridor(route: &str) -> TransitFeature {
        TransitFeature::new(
            TransitChannel::Bus,
            route.to_string(),
            TransitGeometry::Corridor(MultiLineString::new(vec![LineString::new(vec![
                Point::new(-87.63, 41.87).0,
                Point::new(-87.63, 41.90).0,
            ])])),
        )
    }

    fn station(name: &str, municipality: Option<&str>) -> TransitFeature {
        let mut feature = TransitFeature::new(
            TransitChannel::Metra,
            name.to_string(),
            TransitGeometry::Stop(Point::new(-87.64, 41.88)),
        );
        feature.municipality = municipality.map(String::from);
        feature
    }

    #[test]
    fn allow_list_matches_routes_exactly() {
        let allow: Vec<String> = ["9", "X9", "55"].into_iter().map(String::from).collect();

        let kept = filter_corridors(
            vec![corridor("9"), corridor("X9"), corridor("92"), corridor("8")],
            &allow,
        );

        let names: Vec<&str> = kept.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["9", "X9"]);
    }

    #[test]
    fn municipality_filter_drops_other_cities_and_blank_cells() {
        let kept = filter_municipality(
            vec![
                station("Ravenswood", Some("Chicago")),
                station("Oak Park", Some("Oak Park")),
                station("Unlabeled", None),
            ],
            "Chicago",
        );

        let names: Vec<&str> = kept.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Ravenswood"]);
    }
}
