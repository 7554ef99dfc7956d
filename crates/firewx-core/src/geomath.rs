//! Great-circle geometry, wind decomposition and series aggregation.
//!
//! All functions are pure. Angles are degrees at the API surface.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Coordinate, Polygon, Rollups, SeriesPoint, ValidationError};

/// Output unit for great-circle distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Miles,
    Kilometers,
    Meters,
}

impl DistanceUnit {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Miles => "miles",
            Self::Kilometers => "kilometers",
            Self::Meters => "meters",
        }
    }

    /// Mean Earth radius expressed in this unit.
    pub const fn earth_radius(self) -> f64 {
        match self {
            Self::Miles => 3_958.761_3,
            Self::Kilometers => 6_371.008_8,
            Self::Meters => 6_371_008.8,
        }
    }

    /// Converts a length in this unit to meters.
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Miles => value * METERS_PER_MILE,
            Self::Kilometers => value * 1_000.0,
            Self::Meters => value,
        }
    }
}

impl Display for DistanceUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceUnit {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mi" | "mile" | "miles" => Ok(Self::Miles),
            "km" | "kilometer" | "kilometers" => Ok(Self::Kilometers),
            "m" | "meter" | "meters" => Ok(Self::Meters),
            other => Err(ValidationError::InvalidDistanceUnit {
                value: other.to_owned(),
            }),
        }
    }
}

pub const METERS_PER_MILE: f64 = 1_609.344;

/// Haversine great-circle distance between two coordinates.
pub fn distance(p: Coordinate, q: Coordinate, unit: DistanceUnit) -> f64 {
    let phi1 = p.lat().to_radians();
    let phi2 = q.lat().to_radians();
    let d_phi = (q.lat() - p.lat()).to_radians();
    let d_lambda = (q.lon() - p.lon()).to_radians();

    let h = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1 for antipodal points.
    2.0 * unit.earth_radius() * h.sqrt().min(1.0).asin()
}

/// Initial great-circle bearing from `p` toward `q`, in `[0, 360)`.
pub fn bearing(p: Coordinate, q: Coordinate) -> f64 {
    let phi1 = p.lat().to_radians();
    let phi2 = q.lat().to_radians();
    let d_lambda = (q.lon() - p.lon()).to_radians();

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let degrees = (y.atan2(x).to_degrees() + 360.0) % 360.0;
    if degrees >= 360.0 {
        0.0
    } else {
        degrees
    }
}

/// Smallest distance from `point` to any vertex of `polygon`.
///
/// This is a vertex-only approximation: edges and containment are ignored, so
/// the result is an upper bound on the true distance to the polygon.
pub fn nearest_polygon_vertex_distance(
    point: Coordinate,
    polygon: &Polygon,
    unit: DistanceUnit,
) -> Option<f64> {
    polygon
        .vertices()
        .map(|vertex| distance(point, vertex, unit))
        .min_by(f64::total_cmp)
}

/// Splits a meteorological wind (blowing FROM `direction_from_deg`) into
/// `(along, cross)` components relative to a path heading of `path_bearing_deg`.
///
/// `along` is positive for a tailwind. `cross` is the projection onto the
/// left-of-track unit vector.
pub fn project_wind(speed: f64, direction_from_deg: f64, path_bearing_deg: f64) -> (f64, f64) {
    let d = direction_from_deg.to_radians();
    let u = -speed * d.sin();
    let v = -speed * d.cos();

    let theta = path_bearing_deg.to_radians();
    let (ex, ey) = (theta.sin(), theta.cos());
    let (ax, ay) = (-ey, ex);

    (u * ex + v * ey, u * ax + v * ay)
}

/// Vapor-pressure deficit in kPa (Tetens), never negative.
pub fn vapor_pressure_deficit(temp_c: f64, dewpoint_c: f64) -> f64 {
    (saturation_vapor_pressure(temp_c) - saturation_vapor_pressure(dewpoint_c)).max(0.0)
}

fn saturation_vapor_pressure(temp_c: f64) -> f64 {
    0.6108 * ((17.27 * temp_c) / (temp_c + 237.3)).exp()
}

/// Aggregates a series. An empty series yields `Rollups::default()`.
pub fn rollup(samples: &[SeriesPoint]) -> Rollups {
    if samples.is_empty() {
        return Rollups::default();
    }

    let max_gust_ms = samples
        .iter()
        .filter_map(|point| point.wind.gust_ms)
        .max_by(f64::total_cmp);
    let max_along_ms = samples
        .iter()
        .filter_map(|point| point.wind.along_ms)
        .max_by(f64::total_cmp);
    let max_cross_ms_abs = samples
        .iter()
        .filter_map(|point| point.wind.cross_ms.map(f64::abs))
        .max_by(f64::total_cmp);
    let min_rh_pct = samples.iter().filter_map(|point| point.wx.rh_pct).min();
    let vpds = samples
        .iter()
        .filter_map(|point| point.wx.vpd_kpa)
        .collect::<Vec<_>>();
    let hours_rh_below_20 = samples
        .iter()
        .filter(|point| point.wx.rh_pct.is_some_and(|rh| rh < 20))
        .count();

    Rollups {
        max_gust_ms,
        max_along_ms,
        max_cross_ms_abs,
        min_rh_pct,
        vpd_kpa_p95: p95(vpds),
        hours_rh_below_20: Some(u32::try_from(hours_rh_below_20).unwrap_or(u32::MAX)),
    }
}

/// Nearest-rank 95th percentile: index `round(0.95 * (n - 1))` of the sorted values.
fn p95(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let last = values.len() - 1;
    let rank = (0.95 * last as f64).round_ties_even();
    let index = (rank.max(0.0) as usize).min(last);
    values.get(index).copied()
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Quality, UtcDateTime, Wind, Wx};

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    fn sample(gust: f64, along: f64, cross: f64, rh: u8, vpd: Option<f64>) -> SeriesPoint {
        SeriesPoint {
            time_utc: UtcDateTime::parse("2025-10-04T20:00:00Z").expect("valid"),
            wind: Wind::new(5.0, 180.0)
                .expect("valid")
                .with_gust_ms(Some(gust))
                .with_components(along, cross),
            wx: Wx {
                rh_pct: Some(rh),
                vpd_kpa: vpd,
                ..Wx::default()
            },
            quality: Quality::new("opaque-test"),
        }
    }

    #[test]
    fn distance_is_zero_for_identical_points_and_symmetric() {
        let sf = coord(37.7749, -122.4194);
        let la = coord(34.0522, -118.2437);

        assert_eq!(distance(sf, sf, DistanceUnit::Miles), 0.0);
        let ab = distance(sf, la, DistanceUnit::Kilometers);
        let ba = distance(la, sf, DistanceUnit::Kilometers);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 500.0 && ab < 600.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let a = coord(0.0, 0.0);
        let b = coord(0.0, 1.0);

        assert!((distance(a, b, DistanceUnit::Miles) - 69.17).abs() <= 0.7);
        assert!((distance(a, b, DistanceUnit::Kilometers) - 111.2).abs() < 0.1);
        assert!((distance(a, b, DistanceUnit::Meters) - 111_195.0).abs() < 10.0);
    }

    #[test]
    fn quarter_meridian_uses_mean_earth_radius() {
        let pole = coord(90.0, 0.0);
        let equator = coord(0.0, 0.0);
        let quarter = std::f64::consts::FRAC_PI_2;

        let miles = distance(equator, pole, DistanceUnit::Miles);
        let kilometers = distance(equator, pole, DistanceUnit::Kilometers);

        assert!((miles - 3_958.761_3 * quarter).abs() < 1e-6);
        assert!((kilometers - 6_371.008_8 * quarter).abs() < 1e-6);
    }

    #[test]
    fn bearing_stays_in_range() {
        let origin = coord(0.0, 0.0);
        assert!(bearing(origin, coord(1.0, 0.0)).abs() < 1e-6);
        assert!((bearing(origin, coord(0.0, 1.0)) - 90.0).abs() < 1e-6);
        assert!((bearing(origin, coord(0.0, -1.0)) - 270.0).abs() < 1e-6);

        for (lat, lon) in [(-45.0, 170.0), (89.9, -179.9), (0.0, 0.0), (-0.5, -0.0001)] {
            let value = bearing(origin, coord(lat, lon));
            assert!((0.0..360.0).contains(&value), "bearing {value} out of range");
        }
    }

    #[test]
    fn polygon_distance_uses_nearest_vertex() {
        let point = coord(0.0, 0.0);
        let polygon = Polygon::new(vec![
            vec![coord(0.0, 2.0), coord(0.0, 3.0)],
            vec![coord(0.0, 1.0)],
        ]);

        let nearest = nearest_polygon_vertex_distance(point, &polygon, DistanceUnit::Kilometers)
            .expect("non-empty polygon");
        let expected = distance(point, coord(0.0, 1.0), DistanceUnit::Kilometers);
        assert!((nearest - expected).abs() < 1e-9);
        assert_eq!(
            nearest_polygon_vertex_distance(point, &Polygon::default(), DistanceUnit::Miles),
            None
        );
    }

    #[test]
    fn southerly_wind_on_northbound_path_is_pure_tailwind() {
        let (along, cross) = project_wind(10.0, 180.0, 0.0);
        assert!((along - 10.0).abs() < 1e-6);
        assert!(cross.abs() < 1e-6);
    }

    #[test]
    fn westerly_wind_on_northbound_path_is_pure_crosswind() {
        let (along, cross) = project_wind(10.0, 270.0, 0.0);
        assert!(along.abs() < 1e-6);
        assert!((cross + 10.0).abs() < 1e-6);
    }

    #[test]
    fn vpd_is_positive_for_dry_air_and_clamped() {
        assert!(vapor_pressure_deficit(30.0, 10.0) > 0.0);
        assert_eq!(vapor_pressure_deficit(10.0, 12.0), 0.0);
    }

    #[test]
    fn rollup_of_empty_series_is_all_absent() {
        assert_eq!(rollup(&[]), Rollups::default());
    }

    #[test]
    fn rollup_of_single_sample() {
        let rollups = rollup(&[sample(7.0, 3.0, 4.0, 20, Some(2.0))]);

        assert_eq!(rollups.max_gust_ms, Some(7.0));
        assert_eq!(rollups.max_along_ms, Some(3.0));
        assert_eq!(rollups.max_cross_ms_abs, Some(4.0));
        assert_eq!(rollups.min_rh_pct, Some(20));
        assert_eq!(rollups.vpd_kpa_p95, Some(2.0));
        assert_eq!(rollups.hours_rh_below_20, Some(0));
    }

    #[test]
    fn rollup_counts_low_humidity_and_takes_abs_cross() {
        let rollups = rollup(&[
            sample(3.0, -1.0, -6.0, 15, None),
            sample(9.0, 2.0, 1.0, 40, None),
            sample(4.0, 0.5, 2.0, 19, None),
        ]);

        assert_eq!(rollups.max_gust_ms, Some(9.0));
        assert_eq!(rollups.max_cross_ms_abs, Some(6.0));
        assert_eq!(rollups.min_rh_pct, Some(15));
        assert_eq!(rollups.hours_rh_below_20, Some(2));
        assert_eq!(rollups.vpd_kpa_p95, None);
    }

    #[test]
    fn p95_uses_nearest_rank_index() {
        let values = (1..=21).map(f64::from).rev().collect::<Vec<_>>();
        // round(0.95 * 20) = 19
        assert_eq!(p95(values), Some(20.0));
        assert_eq!(p95(vec![4.0]), Some(4.0));
    }

    #[test]
    fn parses_distance_units() {
        assert_eq!("KM".parse::<DistanceUnit>(), Ok(DistanceUnit::Kilometers));
        assert_eq!("miles".parse::<DistanceUnit>(), Ok(DistanceUnit::Miles));
        assert!("furlongs".parse::<DistanceUnit>().is_err());
        assert!((DistanceUnit::Miles.to_meters(1.0) - 1_609.344).abs() < 1e-9);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(0.004, 2), 0.0);
    }
}
