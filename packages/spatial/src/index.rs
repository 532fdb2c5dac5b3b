//! R-tree indexes over polygon layers.
//!
//! Layers are immutable for a run: built once with [`rstar::RTree::bulk_load`]
//! and queried many times. When several polygons match, the one earliest in
//! source order wins, which keeps lookups deterministic no matter how the
//! tree happens to be shaped.

use etod_map_site_models::{TransitChannel, TransitFeature};
use geo::{BoundingRect, Contains, Intersects, MultiLineString, MultiPolygon, Point, Rect};
use rstar::{AABB, RTree, RTreeObject};

/// A polygon stored in the R-tree with its source position.
struct PolygonEntry {
    idx: usize,
    envelope: AABB<[f64; 2]>,
    polygon: MultiPolygon<f64>,
}

impl RTreeObject for PolygonEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// An indexed polygon layer carrying a payload per polygon.
///
/// Used for every reference layer: TIF districts, zoning districts,
/// neighborhood boundaries, ADU areas, and transit buffers.
pub struct PolygonLayer<T> {
    tree: RTree<PolygonEntry>,
    payloads: Vec<T>,
}

impl<T> PolygonLayer<T> {
    /// Builds the index. Source order is preserved for tie-breaking.
    #[must_use]
    pub fn build(items: impl IntoIterator<Item = (T, MultiPolygon<f64>)>) -> Self {
        let mut payloads = Vec::new();
        let mut entries = Vec::new();

        for (idx, (payload, polygon)) in items.into_iter().enumerate() {
            let envelope = compute_envelope(&polygon);
            payloads.push(payload);
            entries.push(PolygonEntry {
                idx,
                envelope,
                polygon,
            });
        }

        Self {
            tree: RTree::bulk_load(entries),
            payloads,
        }
    }

    /// Payload of the first polygon whose **interior** contains the point.
    ///
    /// Boundary-exclusive: a point exactly on a polygon edge matches
    /// nothing.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<&T> {
        let envelope = AABB::from_point([point.x(), point.y()]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.polygon.contains(&point))
            .map(|entry| entry.idx)
            .min()
            .map(|idx| &self.payloads[idx])
    }

    /// Payload of the first polygon intersecting the geometry, boundary
    /// included.
    #[must_use]
    pub fn first_intersecting(&self, polygon: &MultiPolygon<f64>) -> Option<&T> {
        let envelope = compute_envelope(polygon);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.polygon.intersects(polygon))
            .map(|entry| entry.idx)
            .min()
            .map(|idx| &self.payloads[idx])
    }

    /// Payload of the first polygon a corridor crosses or touches.
    #[must_use]
    pub fn first_crossing(&self, line: &MultiLineString<f64>) -> Option<&T> {
        let envelope = compute_envelope(line);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|entry| entry.polygon.intersects(line))
            .map(|entry| entry.idx)
            .min()
            .map(|idx| &self.payloads[idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// Indexed buffers of one transit channel.
pub struct BufferLayer {
    channel: TransitChannel,
    layer: PolygonLayer<String>,
}

impl BufferLayer {
    /// Indexes the computed buffers of the channel's features. Features
    /// without a buffer (never buffered, or filtered out) are skipped.
    #[must_use]
    pub fn build(channel: TransitChannel, features: &[TransitFeature]) -> Self {
        let layer = PolygonLayer::build(
            features
                .iter()
                .filter(|feature| feature.channel == channel)
                .filter_map(|feature| {
                    feature
                        .buffer
                        .clone()
                        .map(|buffer| (feature.name.clone(), buffer))
                }),
        );
        log::debug!("indexed {} {channel} buffers", layer.len());

        Self { channel, layer }
    }

    #[must_use]
    pub const fn channel(&self) -> TransitChannel {
        self.channel
    }

    /// Name of the feature whose buffer interior contains the point.
    #[must_use]
    pub fn locate(&self, point: Point<f64>) -> Option<&str> {
        self.layer.locate(point).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, point: Point<f64>) -> bool {
        self.layer.locate(point).is_some()
    }
}

fn compute_envelope<G>(geometry: &G) -> AABB<[f64; 2]>
where
    G: BoundingRect<f64, Output = Option<Rect<f64>>>,
{
    geometry.bounding_rect().map_or_else(
        || AABB::from_point([0.0, 0.0]),
        |rect| AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
    )
}

#[cfg(test)]
mod tests {
    use etod_map_site_models::TransitGeometry;
    use geo::{line_string, polygon};

    use super::*;

    fn square(min: f64, max: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: min, y: min),
            (x: max, y: min),
            (x: max, y: max),
            (x: min, y: max),
            (x: min, y: min),
        ]])
    }

    #[test]
    fn locate_is_boundary_exclusive() {
        let layer = PolygonLayer::build([("a", square(0.0, 1.0))]);

        assert_eq!(layer.locate(Point::new(0.5, 0.5)), Some(&"a"));
        assert_eq!(layer.locate(Point::new(0.5, 0.0)), None);
        assert_eq!(layer.locate(Point::new(0.0, 0.0)), None);
        assert_eq!(layer.locate(Point::new(1.5, 0.5)), None);
    }

    #[test]
    fn overlapping_polygons_resolve_to_source_order() {
        let layer = PolygonLayer::build([
            ("first", square(0.0, 2.0)),
            ("second", square(1.0, 3.0)),
        ]);

        // (1.5, 1.5) is inside both; the earlier layer entry wins.
        assert_eq!(layer.locate(Point::new(1.5, 1.5)), Some(&"first"));
        assert_eq!(layer.locate(Point::new(2.5, 2.5)), Some(&"second"));
    }

    #[test]
    fn intersects_counts_shared_edges_where_containment_does_not() {
        let layer = PolygonLayer::build([("district", square(0.0, 1.0))]);

        // Abuts the district along x = 1 without overlapping its interior.
        let neighbor = square(1.0, 2.0);

        assert_eq!(layer.first_intersecting(&neighbor), Some(&"district"));
        assert_eq!(layer.locate(Point::new(1.0, 0.5)), None);
    }

    #[test]
    fn disjoint_geometry_intersects_nothing() {
        let layer = PolygonLayer::build([("district", square(0.0, 1.0))]);

        assert_eq!(layer.first_intersecting(&square(5.0, 6.0)), None);
    }

    #[test]
    fn corridor_crossing_a_district_matches_it() {
        let layer = PolygonLayer::build([("district", square(0.0, 1.0))]);

        let crossing = MultiLineString::new(vec![line_string![
            (x: -1.0, y: 0.5),
            (x: 2.0, y: 0.5),
        ]]);
        let distant = MultiLineString::new(vec![line_string![
            (x: 5.0, y: 5.0),
            (x: 6.0, y: 5.0),
        ]]);

        assert_eq!(layer.first_crossing(&crossing), Some(&"district"));
        assert_eq!(layer.first_crossing(&distant), None);
    }

    #[test]
    fn empty_layer_matches_nothing() {
        let layer: PolygonLayer<&str> = PolygonLayer::build([]);

        assert!(layer.is_empty());
        assert_eq!(layer.locate(Point::new(0.0, 0.0)), None);
    }

    #[test]
    fn buffer_layer_skips_unbuffered_features() {
        let mut buffered = TransitFeature::new(
            TransitChannel::Rail,
            "Logan Square".to_string(),
            TransitGeometry::Stop(Point::new(0.5, 0.5)),
        );
        buffered.buffer = Some(square(0.0, 1.0));

        let unbuffered = TransitFeature::new(
            TransitChannel::Rail,
            "California".to_string(),
            TransitGeometry::Stop(Point::new(5.0, 5.0)),
        );

        let layer = BufferLayer::build(TransitChannel::Rail, &[buffered, unbuffered]);

        assert_eq!(layer.locate(Point::new(0.5, 0.5)), Some("Logan Square"));
        assert!(!layer.contains(Point::new(5.0, 5.0)));
        assert_eq!(layer.channel(), TransitChannel::Rail);
    }

    #[test]
    fn buffer_layer_ignores_other_channels() {
        let mut bus = TransitFeature::new(
            TransitChannel::Bus,
            "55".to_string(),
            TransitGeometry::Stop(Point::new(0.5, 0.5)),
        );
        bus.buffer = Some(square(0.0, 1.0));

        let layer = BufferLayer::build(TransitChannel::Rail, &[bus]);

        assert!(!layer.contains(Point::new(0.5, 0.5)));
    }
}
