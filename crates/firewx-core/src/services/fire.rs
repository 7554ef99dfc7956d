use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::data_source::NearbyQuery;
use crate::geomath::{distance, nearest_polygon_vertex_distance, round_to};
use crate::routing::{IncidentRouter, RouteResult};
use crate::{Coordinate, DistanceUnit, Geometry, Incident, UtcDateTime, ValidationError};

/// Coarse size class derived from burned acres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    Unknown,
}

impl Severity {
    /// `>= 10000` acres is high, `>= 1000` medium, anything else low.
    pub fn from_acres(acres: Option<f64>) -> Self {
        match acres {
            None => Self::Unknown,
            Some(acres) if acres >= 10_000.0 => Self::High,
            Some(acres) if acres >= 1_000.0 => Self::Medium,
            Some(_) => Self::Low,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which geometry produced a reported distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBasis {
    Point,
    PolygonVertices,
}

/// Validated input of [`FireFinderService::search_nearby`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyFiresRequest {
    query: NearbyQuery,
}

impl NearbyFiresRequest {
    pub fn new(
        center: Coordinate,
        radius: f64,
        unit: DistanceUnit,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            query: NearbyQuery::new(center, radius, unit)?,
        })
    }

    pub fn center(&self) -> Coordinate {
        self.query.center
    }

    pub fn radius(&self) -> f64 {
        self.query.radius
    }

    pub fn unit(&self) -> DistanceUnit {
        self.query.unit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyFire {
    pub id: String,
    pub name: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub created: Option<UtcDateTime>,
    pub containment_percent: Option<f64>,
    pub acres: Option<f64>,
    pub severity: Severity,
    pub distance: Option<f64>,
    pub distance_basis: Option<DistanceBasis>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyFiresResponse {
    pub unit: DistanceUnit,
    pub fires: Vec<NearbyFire>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceResponse {
    pub incident_id: String,
    pub incident_name: String,
    pub distance: f64,
    pub unit: DistanceUnit,
    pub basis: DistanceBasis,
}

/// Nearby-fire search and point-to-incident distance over an [`IncidentRouter`].
pub struct FireFinderService {
    router: IncidentRouter,
}

impl FireFinderService {
    pub fn new(router: IncidentRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &IncidentRouter {
        &self.router
    }

    /// Incidents around the request center, closest first.
    ///
    /// Rows without usable geometry carry no distance and sort last. Equal
    /// distances are ordered by name.
    pub async fn search_nearby(
        &self,
        request: &NearbyFiresRequest,
    ) -> RouteResult<NearbyFiresResponse> {
        let center = request.center();
        let unit = request.unit();
        let routed = self.router.search_nearby(request.query).await?;

        Ok(routed.map(|incidents| {
            let mut fires = incidents
                .into_iter()
                .map(|incident| to_nearby_fire(incident, center, unit))
                .collect::<Vec<_>>();
            fires.sort_by(compare_rows);
            NearbyFiresResponse { unit, fires }
        }))
    }

    pub async fn incident(&self, incident_id: &str) -> RouteResult<Option<Incident>> {
        self.router.lookup_by_id(incident_id).await
    }

    /// Distance from `point` to the incident, or `None` when the incident is
    /// unknown or has no geometry.
    pub async fn distance_to(
        &self,
        point: Coordinate,
        incident_id: &str,
        unit: DistanceUnit,
    ) -> RouteResult<Option<DistanceResponse>> {
        let routed = self.router.lookup_by_id(incident_id).await?;

        Ok(routed.map(|incident| {
            let incident = incident?;
            let (basis, distance) = closest(point, incident.geometry.as_ref(), unit)?;
            Some(DistanceResponse {
                incident_id: incident.id,
                incident_name: incident.name,
                distance: round_to(distance, 2),
                unit,
                basis,
            })
        }))
    }
}

/// Smaller of the point and nearest-vertex distances; the point wins ties.
pub fn closest(
    from: Coordinate,
    geometry: Option<&Geometry>,
    unit: DistanceUnit,
) -> Option<(DistanceBasis, f64)> {
    let geometry = geometry?;
    let by_point = geometry
        .point
        .map(|point| (DistanceBasis::Point, distance(from, point, unit)));
    let by_polygon = geometry
        .polygon
        .as_ref()
        .and_then(|polygon| nearest_polygon_vertex_distance(from, polygon, unit))
        .map(|nearest| (DistanceBasis::PolygonVertices, nearest));

    match (by_point, by_polygon) {
        (Some(point), Some(polygon)) if polygon.1 < point.1 => Some(polygon),
        (Some(point), _) => Some(point),
        (None, polygon) => polygon,
    }
}

fn to_nearby_fire(incident: Incident, center: Coordinate, unit: DistanceUnit) -> NearbyFire {
    let nearest = closest(center, incident.geometry.as_ref(), unit);
    let sources = incident
        .quality
        .as_ref()
        .map(|quality| vec![quality.source_token.clone()])
        .unwrap_or_default();

    NearbyFire {
        severity: Severity::from_acres(incident.acres),
        distance: nearest.map(|(_, distance)| round_to(distance, 2)),
        distance_basis: nearest.map(|(basis, _)| basis),
        id: incident.id,
        name: incident.name,
        state: incident.state,
        county: incident.county,
        created: incident.created,
        containment_percent: incident.containment_percent,
        acres: incident.acres,
        sources,
    }
}

fn compare_rows(left: &NearbyFire, right: &NearbyFire) -> Ordering {
    let by_distance = match (left.distance, right.distance) {
        (Some(l), Some(r)) => l.total_cmp(&r),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_distance.then_with(|| left.name.cmp(&right.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Polygon;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    #[test]
    fn severity_thresholds() {
        assert_eq!(Severity::from_acres(None), Severity::Unknown);
        assert_eq!(Severity::from_acres(Some(999.9)), Severity::Low);
        assert_eq!(Severity::from_acres(Some(1_000.0)), Severity::Medium);
        assert_eq!(Severity::from_acres(Some(9_999.0)), Severity::Medium);
        assert_eq!(Severity::from_acres(Some(10_000.0)), Severity::High);
        assert_eq!(Severity::High.to_string(), "high");
    }

    #[test]
    fn closest_prefers_nearer_candidate() {
        let origin = coord(0.0, 0.0);
        let geometry = Geometry::point(coord(0.0, 1.0))
            .with_polygon(Polygon::new(vec![vec![coord(0.0, 0.5), coord(0.0, 2.0)]]));

        let (basis, distance) =
            closest(origin, Some(&geometry), DistanceUnit::Kilometers).expect("has geometry");
        assert_eq!(basis, DistanceBasis::PolygonVertices);
        assert!((distance - 55.6).abs() < 0.1);

        let point_only = Geometry::point(coord(0.0, 1.0));
        assert_eq!(
            closest(origin, Some(&point_only), DistanceUnit::Kilometers).map(|(b, _)| b),
            Some(DistanceBasis::Point)
        );
        assert!(closest(origin, None, DistanceUnit::Miles).is_none());
    }

    #[test]
    fn rows_sort_by_distance_then_name_with_unknown_last() {
        let row = |name: &str, distance: Option<f64>| NearbyFire {
            id: name.to_owned(),
            name: name.to_owned(),
            state: None,
            county: None,
            created: None,
            containment_percent: None,
            acres: None,
            severity: Severity::Unknown,
            distance,
            distance_basis: None,
            sources: Vec::new(),
        };
        let mut rows = vec![
            row("Zeta", None),
            row("Bravo", Some(2.5)),
            row("Alpha", Some(2.5)),
            row("Charlie", Some(0.4)),
        ];

        rows.sort_by(compare_rows);

        let names = rows.iter().map(|row| row.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Charlie", "Alpha", "Bravo", "Zeta"]);
    }

    #[test]
    fn basis_serializes_as_snake_case() {
        let value = serde_json::to_value(DistanceBasis::PolygonVertices).expect("serialize");
        assert_eq!(value, "polygon_vertices");
    }
}
