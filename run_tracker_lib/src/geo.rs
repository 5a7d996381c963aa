//! Distance, pace and calorie math shared by the tracker and the archive tools.

use geo_types::Point;
use serde::{Deserialize, Serialize};

use crate::position::Position;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default linear calorie model, kcal burned per km.
pub const KCAL_PER_KM: f64 = 60.0;

pub const EMPTY_PACE: &str = "0:00";

/// Great-circle distance in km between two points (x = longitude, y = latitude).
pub fn distance_km(a: Point, b: Point) -> f64 {
    let d_lat = (b.y() - a.y()).to_radians();
    let d_lon = (b.x() - a.x()).to_radians();
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();

    let h = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    // Rounding can push h a hair above 1 for antipodal points
    let c = 2. * f64::asin(f64::sqrt(h.min(1.)));

    EARTH_RADIUS_KM * c
}

/// Sum of the distances between consecutive positions.
pub fn path_distance_km(positions: &[Position]) -> f64 {
    positions
        .windows(2)
        .map(|pair| distance_km(pair[0].point(), pair[1].point()))
        .sum()
}

/// `HH:MM:SS`, hours are never truncated.
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

fn has_progress(distance_km: f64, seconds: u64) -> bool {
    seconds > 0 && distance_km.is_finite() && distance_km > 0.
}

/// Minutes per km as `M:SS`, or `0:00` when there is nothing to divide.
pub fn pace_per_km(distance_km: f64, seconds: u64) -> String {
    if !has_progress(distance_km, seconds) {
        return EMPTY_PACE.to_string();
    }

    let seconds_per_km = seconds as f64 / distance_km;
    if !seconds_per_km.is_finite() {
        return EMPTY_PACE.to_string();
    }

    let total = seconds_per_km.round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Average speed in km/h, 0 when there is nothing to divide.
pub fn speed_kmh(distance_km: f64, seconds: u64) -> f64 {
    if !has_progress(distance_km, seconds) {
        return 0.;
    }

    let speed = distance_km / (seconds as f64 / 3600.);
    if speed.is_finite() { speed } else { 0. }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Pace,
    Speed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PaceOrSpeed {
    Pace(String),
    Speed(f64),
}

impl std::fmt::Display for PaceOrSpeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaceOrSpeed::Pace(pace) => write!(f, "{pace} /km"),
            PaceOrSpeed::Speed(speed) => write!(f, "{speed:.1} km/h"),
        }
    }
}

pub fn pace_or_speed(mode: DisplayMode, distance_km: f64, seconds: u64) -> PaceOrSpeed {
    match mode {
        DisplayMode::Pace => PaceOrSpeed::Pace(pace_per_km(distance_km, seconds)),
        DisplayMode::Speed => PaceOrSpeed::Speed(speed_kmh(distance_km, seconds)),
    }
}

pub fn estimate_calories(distance_km: f64) -> u32 {
    estimate_calories_at(distance_km, KCAL_PER_KM)
}

pub fn estimate_calories_at(distance_km: f64, kcal_per_km: f64) -> u32 {
    let kcal = distance_km * kcal_per_km;
    if !kcal.is_finite() || kcal <= 0. {
        return 0;
    }
    kcal.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> Point {
        Point::new(lon, lat)
    }

    #[test]
    fn identical_points_are_zero_apart() {
        for (lat, lon) in [(0., 0.), (55.6761, 12.5683), (-33.8688, 151.2093), (89.9, -179.9)] {
            assert_eq!(distance_km(p(lat, lon), p(lat, lon)), 0.);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (p(55.6761, 12.5683), p(56.1629, 10.2039)),
            (p(0., 0.), p(0., 1.)),
            (p(-33.8688, 151.2093), p(51.5074, -0.1278)),
        ];
        for (a, b) in pairs {
            assert_eq!(distance_km(a, b), distance_km(b, a));
        }
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let d = distance_km(p(0., 0.), p(0., 1.));
        assert!((d - 111.19).abs() < 111.19 * 0.005, "got {d}");
    }

    #[test]
    fn antipodal_points_do_not_produce_nan() {
        let d = distance_km(p(0., 0.), p(0., 180.));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn path_distance_sums_pairs() {
        let positions = [
            Position::new(0., 0., 0),
            Position::new(0., 0.001, 1000),
            Position::new(0., 0.002, 2000),
        ];
        let d = path_distance_km(&positions);
        assert!((d - 0.2224).abs() < 0.001, "got {d}");
        assert_eq!(path_distance_km(&positions[..1]), 0.);
        assert_eq!(path_distance_km(&[]), 0.);
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(100 * 3600 + 5), "100:00:05");
        assert_eq!(format_duration(12_345 * 3600), "12345:00:00");
    }

    #[test]
    fn pace_guards_against_zero() {
        assert_eq!(pace_per_km(0., 600), "0:00");
        assert_eq!(pace_per_km(1., 0), "0:00");
        assert_eq!(pace_per_km(-1., 60), "0:00");
        assert_eq!(pace_per_km(f64::NAN, 60), "0:00");
        assert_eq!(pace_per_km(f64::MIN_POSITIVE, 60), "0:00");
    }

    #[test]
    fn pace_formatting() {
        assert_eq!(pace_per_km(1., 330), "5:30");
        assert_eq!(pace_per_km(2., 600), "5:00");
        assert_eq!(pace_per_km(1., 300), "5:00");
        // 299.6 s/km rounds up into the next minute
        assert_eq!(pace_per_km(10., 2996), "5:00");
    }

    #[test]
    fn speed_guards_against_zero() {
        assert_eq!(speed_kmh(0., 600), 0.);
        assert_eq!(speed_kmh(5., 0), 0.);
        assert!((speed_kmh(10., 3600) - 10.).abs() < 1e-9);
        assert!((speed_kmh(1., 360) - 10.).abs() < 1e-9);
    }

    #[test]
    fn pace_or_speed_display() {
        assert_eq!(pace_or_speed(DisplayMode::Pace, 1., 330).to_string(), "5:30 /km");
        assert_eq!(pace_or_speed(DisplayMode::Speed, 10., 3600).to_string(), "10.0 km/h");
        assert_eq!(pace_or_speed(DisplayMode::Speed, 0., 0), PaceOrSpeed::Speed(0.));
    }

    #[test]
    fn calories_are_linear_and_monotonic() {
        assert_eq!(estimate_calories(0.), 0);
        assert_eq!(estimate_calories(1.), 60);
        assert_eq!(estimate_calories(5.), 300);
        assert_eq!(estimate_calories(0.0083), 0);
        assert_eq!(estimate_calories(0.0084), 1);
        assert_eq!(estimate_calories(-3.), 0);
        assert_eq!(estimate_calories_at(2., 75.), 150);

        let mut last = 0;
        for i in 0..1000 {
            let kcal = estimate_calories(i as f64 * 0.037);
            assert!(kcal >= last);
            last = kcal;
        }
    }
}
