//! Great-circle geometry on the spherical Earth approximation.
//!
//! Interpolation and projection work on unit vectors (nalgebra) rather than
//! raw lat/lon, so antimeridian crossings need no longitude unwrapping; only
//! the outputs are re-wrapped to [-180, 180].

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// WGS84 mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Knots to meters per second.
pub const KNOTS_TO_MPS: f64 = 0.514444;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// A geographic position with altitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat_deg: f64,
    pub lon_deg: f64,
    pub alt_m: f64,
}

impl GeoPosition {
    pub fn new(lat_deg: f64, lon_deg: f64, alt_m: f64) -> Self {
        Self {
            lat_deg,
            lon_deg,
            alt_m,
        }
    }
}

/// Wrap a longitude into [-180, 180].
pub fn wrap_lon_deg(lon_deg: f64) -> f64 {
    let mut lon = (lon_deg + 180.0) % 360.0;
    if lon < 0.0 {
        lon += 360.0;
    }
    lon - 180.0
}

/// Haversine great-circle distance in meters.
pub fn haversine_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let phi1 = lat1_deg * DEG_TO_RAD;
    let phi2 = lat2_deg * DEG_TO_RAD;
    let dphi = (lat2_deg - lat1_deg) * DEG_TO_RAD;
    let dlambda = (lon2_deg - lon1_deg) * DEG_TO_RAD;

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin() * EARTH_RADIUS_M
}

/// Initial bearing from point 1 to point 2, degrees clockwise from North in [0, 360).
pub fn initial_bearing_deg(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let phi1 = lat1_deg * DEG_TO_RAD;
    let phi2 = lat2_deg * DEG_TO_RAD;
    let dlambda = (lon2_deg - lon1_deg) * DEG_TO_RAD;

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    let bearing = y.atan2(x) * RAD_TO_DEG;
    if bearing < 0.0 {
        bearing + 360.0
    } else {
        bearing
    }
}

/// Unit vector on the sphere for a lat/lon pair.
fn to_unit(lat_deg: f64, lon_deg: f64) -> Vector3<f64> {
    let lat = lat_deg * DEG_TO_RAD;
    let lon = lon_deg * DEG_TO_RAD;
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Lat/lon (degrees, lon wrapped to [-180, 180]) from a unit vector.
fn from_unit(v: &Vector3<f64>) -> (f64, f64) {
    let lat = v.z.atan2((v.x * v.x + v.y * v.y).sqrt()) * RAD_TO_DEG;
    let lon = v.y.atan2(v.x) * RAD_TO_DEG;
    (lat, wrap_lon_deg(lon))
}

/// Angular separation between two positions in radians.
pub fn angular_distance_rad(a: &GeoPosition, b: &GeoPosition) -> f64 {
    to_unit(a.lat_deg, a.lon_deg)
        .dot(&to_unit(b.lat_deg, b.lon_deg))
        .clamp(-1.0, 1.0)
        .acos()
}

/// Spherical linear interpolation between two positions, `f` in [0, 1].
/// Altitude interpolates linearly.
pub fn slerp(a: &GeoPosition, b: &GeoPosition, f: f64) -> GeoPosition {
    let va = to_unit(a.lat_deg, a.lon_deg);
    let vb = to_unit(b.lat_deg, b.lon_deg);
    let d = va.dot(&vb).clamp(-1.0, 1.0).acos();

    let v = if d < 1e-12 {
        va
    } else {
        (va * ((1.0 - f) * d).sin() + vb * (f * d).sin()) / d.sin()
    };

    let (lat, lon) = from_unit(&v.normalize());
    GeoPosition {
        lat_deg: lat,
        lon_deg: lon,
        alt_m: a.alt_m + (b.alt_m - a.alt_m) * f,
    }
}

/// Projection of a point onto a single great-circle arc.
#[derive(Debug, Clone, Copy)]
pub struct ArcProjection {
    /// Distance from the arc start to the (clamped) foot, meters.
    pub along_m: f64,
    /// Distance from the query point to the (clamped) foot, meters.
    pub cross_m: f64,
    /// Foot position as a fraction of the arc, clamped to [0, 1].
    pub fraction: f64,
}

/// Project `q` onto the great-circle arc from `a` to `b`.
///
/// If the perpendicular foot falls outside the arc, the nearest endpoint is
/// used and `cross_m` becomes the distance to that endpoint.
pub fn project_onto_arc(a: &GeoPosition, b: &GeoPosition, q: &GeoPosition) -> ArcProjection {
    let seg_rad = angular_distance_rad(a, b);
    if seg_rad < 1e-12 {
        return ArcProjection {
            along_m: 0.0,
            cross_m: haversine_m(a.lat_deg, a.lon_deg, q.lat_deg, q.lon_deg),
            fraction: 0.0,
        };
    }

    let d13 = angular_distance_rad(a, q);
    let theta13 = initial_bearing_deg(a.lat_deg, a.lon_deg, q.lat_deg, q.lon_deg) * DEG_TO_RAD;
    let theta12 = initial_bearing_deg(a.lat_deg, a.lon_deg, b.lat_deg, b.lon_deg) * DEG_TO_RAD;

    let cross_rad = (d13.sin() * (theta13 - theta12).sin()).asin();
    let mut along_rad = (d13.cos() / cross_rad.cos()).clamp(-1.0, 1.0).acos();
    if (theta13 - theta12).cos() < 0.0 {
        along_rad = -along_rad;
    }

    let seg_len_m = seg_rad * EARTH_RADIUS_M;
    if along_rad <= 0.0 {
        ArcProjection {
            along_m: 0.0,
            cross_m: haversine_m(a.lat_deg, a.lon_deg, q.lat_deg, q.lon_deg),
            fraction: 0.0,
        }
    } else if along_rad >= seg_rad {
        ArcProjection {
            along_m: seg_len_m,
            cross_m: haversine_m(b.lat_deg, b.lon_deg, q.lat_deg, q.lon_deg),
            fraction: 1.0,
        }
    } else {
        ArcProjection {
            along_m: along_rad * EARTH_RADIUS_M,
            cross_m: cross_rad.abs() * EARTH_RADIUS_M,
            fraction: along_rad / seg_rad,
        }
    }
}
