//! Footprint Coverage Evaluator
//!
//! Ka satellite footprints arrive as GeoJSON (multi)polygons with optional
//! validity windows. Footprints are loaded once, longitude-unwrapped around
//! the antimeridian, and kept process-wide immutable. Queries answer whether
//! a satellite covers `(lat, lon)` at a time `t`, and which satellites of a
//! configured set cover it (stable configuration order).

use chrono::{DateTime, Utc};
use geo::{Contains, MultiPolygon, Point, Polygon};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoverageError {
    #[error("footprint for '{0}' is not a Polygon or MultiPolygon")]
    UnsupportedGeometry(String),
    #[error("footprint geometry for '{0}' failed to parse: {1}")]
    InvalidGeometry(String, String),
    #[error("degenerate footprint polygon for '{0}' (ring with fewer than 3 points)")]
    DegeneratePolygon(String),
    #[error("unknown satellite id: {0}")]
    UnknownSatellite(String),
}

pub type Result<T> = std::result::Result<T, CoverageError>;

/// A satellite footprint as configured: GeoJSON-compatible polygon plus an
/// optional validity window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintSpec {
    pub polygon: geojson::Geometry,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// One loaded footprint, longitude-unwrapped for planar containment.
struct LoadedFootprint {
    sat_id: String,
    polygons: MultiPolygon<f64>,
    valid_from: Option<i64>,
    valid_until: Option<i64>,
}

impl LoadedFootprint {
    fn valid_at(&self, unix_s: i64) -> bool {
        if let Some(from) = self.valid_from {
            if unix_s < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if unix_s > until {
                return false;
            }
        }
        true
    }

    fn contains(&self, lat_deg: f64, lon_deg: f64) -> bool {
        // Unwrapped rings may extend past ±180; test the point in all three
        // wrappings so a footprint straddling the IDL matches either side.
        for lon in [lon_deg, lon_deg + 360.0, lon_deg - 360.0] {
            if self.polygons.contains(&Point::new(lon, lat_deg)) {
                return true;
            }
        }
        false
    }
}

/// Point-in-footprint evaluation over a fixed satellite configuration.
pub struct CoverageEvaluator {
    footprints: Vec<LoadedFootprint>,
}

impl CoverageEvaluator {
    /// Load footprints in configuration order. Order is preserved by every
    /// covering-set query.
    pub fn new(specs: Vec<(String, FootprintSpec)>) -> Result<Self> {
        let mut footprints = Vec::with_capacity(specs.len());
        for (sat_id, spec) in specs {
            let geometry = geo::Geometry::<f64>::try_from(spec.polygon.value.clone())
                .map_err(|e| CoverageError::InvalidGeometry(sat_id.clone(), e.to_string()))?;
            let polygons = match geometry {
                geo::Geometry::Polygon(p) => MultiPolygon(vec![p]),
                geo::Geometry::MultiPolygon(mp) => mp,
                _ => return Err(CoverageError::UnsupportedGeometry(sat_id)),
            };
            for poly in &polygons {
                if poly.exterior().0.len() < 4 {
                    // closed ring: 3 distinct points + repeated first
                    return Err(CoverageError::DegeneratePolygon(sat_id));
                }
            }
            let polygons = MultiPolygon(polygons.into_iter().map(unwrap_polygon).collect());
            footprints.push(LoadedFootprint {
                sat_id,
                polygons,
                valid_from: spec.valid_from.map(|t| t.timestamp()),
                valid_until: spec.valid_until.map(|t| t.timestamp()),
            });
        }
        Ok(Self { footprints })
    }

    pub fn known_satellite(&self, sat_id: &str) -> bool {
        self.footprints.iter().any(|f| f.sat_id == sat_id)
    }

    /// Does `sat_id` cover the point at time `t`? Unknown satellites and
    /// expired validity windows answer `false`.
    pub fn is_covered(&self, sat_id: &str, lat_deg: f64, lon_deg: f64, t: DateTime<Utc>) -> bool {
        self.footprints
            .iter()
            .find(|f| f.sat_id == sat_id)
            .map(|f| f.valid_at(t.timestamp()) && f.contains(lat_deg, lon_deg))
            .unwrap_or(false)
    }

    /// Subset of `among` covering the point at `t`, in configuration order.
    pub fn covering_set(
        &self,
        among: &[String],
        lat_deg: f64,
        lon_deg: f64,
        t: DateTime<Utc>,
    ) -> Vec<String> {
        let ts = t.timestamp();
        self.footprints
            .iter()
            .filter(|f| among.iter().any(|id| *id == f.sat_id))
            .filter(|f| f.valid_at(ts) && f.contains(lat_deg, lon_deg))
            .map(|f| f.sat_id.clone())
            .collect()
    }
}

/// Unwrap each ring so consecutive longitudes never jump more than 180°.
/// A footprint authored as +175 → -175 becomes +175 → +185.
fn unwrap_polygon(poly: Polygon<f64>) -> Polygon<f64> {
    let (exterior, interiors) = poly.into_inner();
    Polygon::new(
        unwrap_ring(exterior),
        interiors.into_iter().map(unwrap_ring).collect(),
    )
}

fn unwrap_ring(ring: geo::LineString<f64>) -> geo::LineString<f64> {
    let mut out: Vec<geo::Coord<f64>> = Vec::with_capacity(ring.0.len());
    let mut offset = 0.0;
    for (i, c) in ring.0.iter().enumerate() {
        let mut x = c.x + offset;
        if i > 0 {
            let prev = out[i - 1].x;
            while x - prev > 180.0 {
                x -= 360.0;
                offset -= 360.0;
            }
            while x - prev < -180.0 {
                x += 360.0;
                offset += 360.0;
            }
        }
        out.push(geo::Coord { x, y: c.y });
    }
    geo::LineString(out)
}
