//! Walkable-radius buffer construction.
//!
//! Point buffers approximate a circle with a regular polygon; the segment
//! count is chosen so the polygon area stays within 0.1% of the true circle
//! and every boundary vertex lies under half a meter off the arc at the
//! rail radius. Line buffers are per-segment capsules merged with boolean
//! union.
//!
//! Radii are Web Mercator meters. Inputs and outputs are WGS84; projection
//! happens inside.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use etod_map_geometry::project;
use etod_map_site_models::{TransitFeature, TransitGeometry};
use geo::{BooleanOps, Coord, LineString, MultiLineString, MultiPolygon, Point, Polygon};

/// Vertices in a full circle approximation.
pub const CIRCLE_SEGMENTS: usize = 96;

#[allow(clippy::cast_precision_loss)]
fn circle_3857(center: Coord<f64>, radius_m: f64) -> Polygon<f64> {
    let mut ring = Vec::with_capacity(CIRCLE_SEGMENTS);
    for i in 0..CIRCLE_SEGMENTS {
        let angle = TAU * (i as f64) / (CIRCLE_SEGMENTS as f64);
        ring.push(Coord {
            x: radius_m.mul_add(angle.cos(), center.x),
            y: radius_m.mul_add(angle.sin(), center.y),
        });
    }
    Polygon::new(LineString::new(ring), vec![])
}

/// Stadium shape around one segment: a rectangle with semicircular caps.
#[allow(clippy::cast_precision_loss)]
fn capsule_3857(start: Coord<f64>, end: Coord<f64>, radius_m: f64) -> Polygon<f64> {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    if dx.hypot(dy) == 0.0 {
        return circle_3857(start, radius_m);
    }

    let heading = dy.atan2(dx);
    let half = CIRCLE_SEGMENTS / 2;
    let mut ring = Vec::with_capacity(CIRCLE_SEGMENTS + 2);

    // Cap beyond `end`, sweeping counterclockwise through the heading.
    for i in 0..=half {
        let angle = PI.mul_add((i as f64) / (half as f64), heading - FRAC_PI_2);
        ring.push(Coord {
            x: radius_m.mul_add(angle.cos(), end.x),
            y: radius_m.mul_add(angle.sin(), end.y),
        });
    }
    // Cap behind `start`.
    for i in 0..=half {
        let angle = PI.mul_add((i as f64) / (half as f64), heading + FRAC_PI_2);
        ring.push(Coord {
            x: radius_m.mul_add(angle.cos(), start.x),
            y: radius_m.mul_add(angle.sin(), start.y),
        });
    }

    Polygon::new(LineString::new(ring), vec![])
}

/// Buffers a WGS84 point at a Web Mercator radius.
#[must_use]
pub fn buffer_point(point: Point<f64>, radius_m: f64) -> MultiPolygon<f64> {
    let center = project::forward(point.0);
    let circle = MultiPolygon::new(vec![circle_3857(center, radius_m)]);
    project::to_wgs84(&circle)
}

/// Buffers every segment of a WGS84 line and merges the capsules.
#[must_use]
pub fn buffer_multi_line(lines: &MultiLineString<f64>, radius_m: f64) -> MultiPolygon<f64> {
    let projected = project::to_mercator(lines);

    let mut merged = MultiPolygon::new(Vec::new());
    for line in &projected {
        for segment in line.lines() {
            let capsule = MultiPolygon::new(vec![capsule_3857(segment.start, segment.end, radius_m)]);
            merged = if merged.0.is_empty() {
                capsule
            } else {
                merged.union(&capsule)
            };
        }
    }

    project::to_wgs84(&merged)
}

/// Buffers a transit feature at the given radius.
#[must_use]
pub fn buffer_transit_feature(feature: &TransitFeature, radius_m: f64) -> MultiPolygon<f64> {
    match &feature.geometry {
        TransitGeometry::Stop(point) => buffer_point(*point, radius_m),
        TransitGeometry::Corridor(lines) => buffer_multi_line(lines, radius_m),
    }
}

#[cfg(test)]
mod tests {
    use geo::{Area, Contains};

    use super::*;

    const HALF_MILE_M: f64 = 804.67;
    const QUARTER_MILE_M: f64 = 402.335;

    const CHICAGO: Point<f64> = Point(Coord {
        x: -87.6298,
        y: 41.8781,
    });

    fn offset_wgs84(origin: Point<f64>, east_m: f64, north_m: f64) -> Point<f64> {
        let center = project::forward(origin.0);
        Point::from(project::inverse(Coord {
            x: center.x + east_m,
            y: center.y + north_m,
        }))
    }

    #[test]
    fn point_buffer_area_matches_circle_within_a_tenth_percent() {
        let buffer = buffer_point(CHICAGO, HALF_MILE_M);

        let area = project::to_mercator(&buffer).unsigned_area();
        let circle_area = PI * HALF_MILE_M * HALF_MILE_M;

        assert!((area - circle_area).abs() / circle_area < 0.001);
    }

    #[test]
    fn point_buffer_contains_800m_and_excludes_810m() {
        let buffer = buffer_point(CHICAGO, HALF_MILE_M);

        for (east, north) in [
            (800.0, 0.0),
            (0.0, 800.0),
            (-800.0, 0.0),
            (565.7, 565.7),
        ] {
            assert!(
                buffer.contains(&offset_wgs84(CHICAGO, east, north)),
                "({east}, {north}) should be inside"
            );
        }

        for (east, north) in [(810.0, 0.0), (0.0, -810.0), (572.8, 572.8)] {
            assert!(
                !buffer.contains(&offset_wgs84(CHICAGO, east, north)),
                "({east}, {north}) should be outside"
            );
        }
    }

    #[test]
    fn buffer_boundary_vertex_is_not_contained() {
        let buffer = buffer_point(CHICAGO, HALF_MILE_M);

        let vertex = Point::from(buffer.0[0].exterior().0[0]);
        assert!(!buffer.contains(&vertex));
    }

    #[test]
    fn buffer_center_is_contained() {
        let buffer = buffer_point(CHICAGO, QUARTER_MILE_M);

        assert!(buffer.contains(&CHICAGO));
    }

    #[test]
    fn corridor_buffer_covers_perpendicular_offsets() {
        let start = CHICAGO;
        let end = offset_wgs84(CHICAGO, 2000.0, 0.0);
        let corridor = MultiLineString::new(vec![LineString::new(vec![start.0, end.0])]);

        let buffer = buffer_multi_line(&corridor, QUARTER_MILE_M);

        let midpoint_north = offset_wgs84(CHICAGO, 1000.0, 395.0);
        let midpoint_far = offset_wgs84(CHICAGO, 1000.0, 410.0);
        let beyond_cap = offset_wgs84(CHICAGO, 2410.0, 0.0);

        assert!(buffer.contains(&midpoint_north));
        assert!(!buffer.contains(&midpoint_far));
        assert!(buffer.contains(&offset_wgs84(CHICAGO, 2300.0, 0.0)));
        assert!(!buffer.contains(&beyond_cap));
    }

    #[test]
    fn multi_segment_corridor_merges_into_one_footprint() {
        let a = CHICAGO.0;
        let b = project::inverse(Coord {
            x: project::forward(a).x + 1000.0,
            y: project::forward(a).y,
        });
        let c = project::inverse(Coord {
            x: project::forward(a).x + 1000.0,
            y: project::forward(a).y + 1000.0,
        });
        let corridor = MultiLineString::new(vec![LineString::new(vec![a, b, c])]);

        let buffer = buffer_multi_line(&corridor, QUARTER_MILE_M);

        // The elbow region belongs to both capsules; union must not
        // double-count its area.
        let area = project::to_mercator(&buffer).unsigned_area();
        let two_capsules = 2.0 * (1000.0 * 2.0 * QUARTER_MILE_M + PI * QUARTER_MILE_M * QUARTER_MILE_M);
        assert!(area < two_capsules);

        assert!(buffer.contains(&Point::from(b)));
    }

    #[test]
    fn empty_corridor_buffers_to_nothing() {
        let buffer = buffer_multi_line(&MultiLineString::new(Vec::new()), QUARTER_MILE_M);

        assert!(buffer.0.is_empty());
    }
}
