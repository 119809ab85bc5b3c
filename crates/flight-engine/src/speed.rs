//! Ground-speed smoothing.
//!
//! Exponentially weighted average over a 120 s window of position samples.
//! Samples closer than 1 s apart are ignored; a gap longer than the window
//! resets the average to the instantaneous speed.

use chrono::{DateTime, Utc};

use route_model::{haversine_m, KNOTS_TO_MPS};

const WINDOW_S: f64 = 120.0;
const MIN_SAMPLE_SPACING_S: f64 = 1.0;

// Decay time constant: a sample's weight fades to ~2% across the window.
const TAU_S: f64 = WINDOW_S / 4.0;

#[derive(Debug, Clone, Default)]
pub struct SpeedSmoother {
    last_sample: Option<(DateTime<Utc>, f64, f64)>, // (t, lat, lon)
    smoothed_kn: Option<f64>,
}

impl SpeedSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest a position sample; returns the updated smoothed speed in
    /// knots once two usable samples have been seen.
    pub fn add_position(&mut self, now: DateTime<Utc>, lat_deg: f64, lon_deg: f64) -> Option<f64> {
        if let Some((prev_t, prev_lat, prev_lon)) = self.last_sample {
            let dt = (now - prev_t).num_milliseconds() as f64 / 1000.0;
            if dt < MIN_SAMPLE_SPACING_S {
                return self.smoothed_kn;
            }
            let instantaneous_kn =
                haversine_m(prev_lat, prev_lon, lat_deg, lon_deg) / dt / KNOTS_TO_MPS;

            self.smoothed_kn = Some(match self.smoothed_kn {
                Some(prev) if dt <= WINDOW_S => {
                    let alpha = 1.0 - (-dt / TAU_S).exp();
                    prev + alpha * (instantaneous_kn - prev)
                }
                _ => instantaneous_kn,
            });
        }
        self.last_sample = Some((now, lat_deg, lon_deg));
        self.smoothed_kn
    }

    pub fn smoothed_kn(&self) -> Option<f64> {
        self.smoothed_kn
    }

    pub fn reset(&mut self) {
        self.last_sample = None;
        self.smoothed_kn = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(s: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_761_583_500 + s, 0).unwrap()
    }

    #[test]
    fn test_steady_speed_converges() {
        let mut smoother = SpeedSmoother::new();
        // ~0.0025° of longitude per 2 s at the equator ≈ 270 kn
        let mut lon = 0.0;
        let mut result = None;
        for i in 0..60 {
            result = smoother.add_position(t(i * 2), 0.0, lon);
            lon += 0.0025;
        }
        let kn = result.unwrap();
        assert!((kn - 270.0).abs() < 10.0, "smoothed {}", kn);
    }

    #[test]
    fn test_subsecond_samples_ignored() {
        let mut smoother = SpeedSmoother::new();
        smoother.add_position(t(0), 0.0, 0.0);
        let before = smoother.add_position(t(2), 0.0, 0.005);
        // 200 ms later, absurd jump; must be ignored.
        let after = smoother.add_position(
            Utc.timestamp_opt(1_761_583_502, 200_000_000).unwrap(),
            0.0,
            1.0,
        );
        assert_eq!(before, after);
    }

    #[test]
    fn test_long_gap_resets_to_instantaneous() {
        let mut smoother = SpeedSmoother::new();
        smoother.add_position(t(0), 0.0, 0.0);
        smoother.add_position(t(2), 0.0, 0.005); // fast
        // 10 minute gap, then slow movement: smoothed follows instantaneous.
        smoother.add_position(t(602), 0.0, 0.006);
        let kn = smoother.add_position(t(604), 0.0, 0.0061).unwrap();
        assert!(kn < 50.0, "smoothed {}", kn);
    }

    #[test]
    fn test_smoothing_damps_spikes() {
        let mut smoother = SpeedSmoother::new();
        let mut lon = 0.0;
        for i in 0..30 {
            smoother.add_position(t(i * 2), 0.0, lon);
            lon += 0.0025;
        }
        let steady = smoother.smoothed_kn().unwrap();
        // One spurious double-distance step.
        let spiked = smoother.add_position(t(62), 0.0, lon + 0.005).unwrap();
        assert!(spiked < steady * 1.5, "spike {} vs steady {}", spiked, steady);
    }
}
