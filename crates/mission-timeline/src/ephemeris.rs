//! Satellite ephemeris interface for the X transport.
//!
//! The timeline core only needs the compass azimuth from the platform to a
//! named satellite. The shipped implementation models the steered X fleet as
//! geostationary satellites at fixed longitudes; azimuth comes from the
//! standard ECEF → ENU look-angle transform.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::{Result, TimelineError};

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;
const EARTH_RADIUS_KM: f64 = 6378.137;
const GEO_ALTITUDE_KM: f64 = 35_786.0;

/// Azimuth provider from platform position to a satellite.
pub trait SatelliteEphemeris: Send + Sync {
    /// Compass azimuth (degrees from North, [0, 360)) from the platform at
    /// `(lat, lon)` to `sat_id` at time `t`.
    fn azimuth_from_platform(
        &self,
        lat_deg: f64,
        lon_deg: f64,
        sat_id: &str,
        t: DateTime<Utc>,
    ) -> Result<f64>;

    fn known_satellite(&self, sat_id: &str) -> bool;
}

/// A geostationary X satellite at a fixed longitude.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoSatellite {
    pub id: String,
    pub longitude_deg: f64,
}

/// Fixed-longitude geostationary fleet.
pub struct GeostationaryEphemeris {
    satellites: Vec<GeoSatellite>,
}

impl GeostationaryEphemeris {
    pub fn new(satellites: Vec<GeoSatellite>) -> Self {
        Self { satellites }
    }

    fn longitude_of(&self, sat_id: &str) -> Option<f64> {
        self.satellites
            .iter()
            .find(|s| s.id == sat_id)
            .map(|s| s.longitude_deg)
    }
}

impl SatelliteEphemeris for GeostationaryEphemeris {
    fn azimuth_from_platform(
        &self,
        lat_deg: f64,
        lon_deg: f64,
        sat_id: &str,
        _t: DateTime<Utc>,
    ) -> Result<f64> {
        let sat_lon = self
            .longitude_of(sat_id)
            .ok_or_else(|| TimelineError::UnknownSatellite(sat_id.to_string()))?;
        Ok(look_azimuth_deg(lat_deg, lon_deg, 0.0, sat_lon, GEO_ALTITUDE_KM))
    }

    fn known_satellite(&self, sat_id: &str) -> bool {
        self.longitude_of(sat_id).is_some()
    }
}

/// Azimuth of the ECEF range vector from platform to satellite, rotated into
/// the platform's East-North-Up frame.
fn look_azimuth_deg(
    plat_lat_deg: f64,
    plat_lon_deg: f64,
    sat_lat_deg: f64,
    sat_lon_deg: f64,
    sat_alt_km: f64,
) -> f64 {
    let lat = plat_lat_deg * DEG_TO_RAD;
    let lon = plat_lon_deg * DEG_TO_RAD;
    let sat_lat = sat_lat_deg * DEG_TO_RAD;
    let sat_lon = sat_lon_deg * DEG_TO_RAD;

    // Platform ECEF (surface)
    let px = EARTH_RADIUS_KM * lat.cos() * lon.cos();
    let py = EARTH_RADIUS_KM * lat.cos() * lon.sin();
    let pz = EARTH_RADIUS_KM * lat.sin();

    // Satellite ECEF
    let sr = EARTH_RADIUS_KM + sat_alt_km;
    let sx = sr * sat_lat.cos() * sat_lon.cos();
    let sy = sr * sat_lat.cos() * sat_lon.sin();
    let sz = sr * sat_lat.sin();

    let dx = sx - px;
    let dy = sy - py;
    let dz = sz - pz;

    // ENU rotation
    let east = -lon.sin() * dx + lon.cos() * dy;
    let north = -lat.sin() * lon.cos() * dx - lat.sin() * lon.sin() * dy + lat.cos() * dz;

    let azimuth = east.atan2(north) * RAD_TO_DEG;
    if azimuth < 0.0 {
        azimuth + 360.0
    } else {
        azimuth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 27, 17, 0, 0).unwrap()
    }

    #[test]
    fn test_azimuth_due_south_from_northern_hemisphere() {
        let eph = GeostationaryEphemeris::new(vec![GeoSatellite {
            id: "x-1".into(),
            longitude_deg: 0.0,
        }]);
        // Platform due north of the subsatellite point looks south.
        let az = eph.azimuth_from_platform(45.0, 0.0, "x-1", now()).unwrap();
        assert!((az - 180.0).abs() < 1.0, "azimuth {}", az);
    }

    #[test]
    fn test_azimuth_east_west() {
        let eph = GeostationaryEphemeris::new(vec![GeoSatellite {
            id: "x-1".into(),
            longitude_deg: 10.0,
        }]);
        // Satellite east of an equatorial platform.
        let az = eph.azimuth_from_platform(0.0, 0.0, "x-1", now()).unwrap();
        assert!((az - 90.0).abs() < 1.0, "azimuth {}", az);
    }

    #[test]
    fn test_unknown_satellite() {
        let eph = GeostationaryEphemeris::new(vec![]);
        assert!(!eph.known_satellite("ghost"));
        assert!(matches!(
            eph.azimuth_from_platform(0.0, 0.0, "ghost", now()),
            Err(TimelineError::UnknownSatellite(_))
        ));
    }
}
