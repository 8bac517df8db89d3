//! Geographic shapes for spatial property values.
//!
//! Coordinates are WGS84 degrees. Rectangles do not wrap the antimeridian.

use std::fmt;

use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance in kilometres (haversine).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A spatial value or query region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape")]
pub enum GeoShape {
    Point(GeoPoint),
    Circle { center: GeoPoint, radius_km: f64 },
    Rect { top_left: GeoPoint, bottom_right: GeoPoint },
}

impl GeoShape {
    pub fn point(latitude: f64, longitude: f64) -> Self {
        GeoShape::Point(GeoPoint::new(latitude, longitude))
    }

    pub fn circle(latitude: f64, longitude: f64, radius_km: f64) -> Self {
        GeoShape::Circle { center: GeoPoint::new(latitude, longitude), radius_km }
    }

    pub fn rect(top_left: GeoPoint, bottom_right: GeoPoint) -> Self {
        GeoShape::Rect { top_left, bottom_right }
    }

    /// True iff `other` lies entirely inside `self`.
    pub fn contains(&self, other: &GeoShape) -> bool {
        match (self, other) {
            (GeoShape::Point(a), GeoShape::Point(b)) => a == b,
            (GeoShape::Point(_), _) => false,

            (GeoShape::Circle { center, radius_km }, GeoShape::Point(p)) => {
                center.distance_km(p) <= *radius_km
            }
            (GeoShape::Circle { center, radius_km }, GeoShape::Circle { center: c2, radius_km: r2 }) => {
                center.distance_km(c2) + r2 <= *radius_km
            }
            (GeoShape::Circle { .. }, GeoShape::Rect { top_left, bottom_right }) => {
                rect_corners(top_left, bottom_right)
                    .iter()
                    .all(|p| self.contains(&GeoShape::Point(*p)))
            }

            (GeoShape::Rect { top_left, bottom_right }, GeoShape::Point(p)) => {
                rect_contains_point(top_left, bottom_right, p)
            }
            (GeoShape::Rect { top_left, bottom_right }, GeoShape::Rect { top_left: tl2, bottom_right: br2 }) => {
                rect_contains_point(top_left, bottom_right, tl2)
                    && rect_contains_point(top_left, bottom_right, br2)
            }
            (GeoShape::Rect { top_left, bottom_right }, GeoShape::Circle { center, radius_km }) => {
                // the circle's extreme points along the meridian and the parallel
                let dlat = (radius_km / EARTH_RADIUS_KM).to_degrees();
                let dlon = dlat / center.latitude.to_radians().cos().max(f64::EPSILON);
                [
                    GeoPoint::new(center.latitude + dlat, center.longitude),
                    GeoPoint::new(center.latitude - dlat, center.longitude),
                    GeoPoint::new(center.latitude, center.longitude + dlon),
                    GeoPoint::new(center.latitude, center.longitude - dlon),
                ]
                .iter()
                .all(|p| rect_contains_point(top_left, bottom_right, p))
            }
        }
    }

    /// True iff `self` lies entirely inside `region`.
    pub fn within(&self, region: &GeoShape) -> bool {
        region.contains(self)
    }
}

fn rect_contains_point(top_left: &GeoPoint, bottom_right: &GeoPoint, p: &GeoPoint) -> bool {
    p.latitude <= top_left.latitude
        && p.latitude >= bottom_right.latitude
        && p.longitude >= top_left.longitude
        && p.longitude <= bottom_right.longitude
}

fn rect_corners(top_left: &GeoPoint, bottom_right: &GeoPoint) -> [GeoPoint; 4] {
    [
        *top_left,
        *bottom_right,
        GeoPoint::new(top_left.latitude, bottom_right.longitude),
        GeoPoint::new(bottom_right.latitude, top_left.longitude),
    ]
}

impl fmt::Display for GeoShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoShape::Point(p) => write!(f, "point({}, {})", p.latitude, p.longitude),
            GeoShape::Circle { center, radius_km } => {
                write!(f, "circle({}, {}, {}km)", center.latitude, center.longitude, radius_km)
            }
            GeoShape::Rect { top_left, bottom_right } => write!(
                f,
                "rect(({}, {}), ({}, {}))",
                top_left.latitude, top_left.longitude, bottom_right.latitude, bottom_right.longitude
            ),
        }
    }
}
