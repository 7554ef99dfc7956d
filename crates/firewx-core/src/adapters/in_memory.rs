use crate::data_source::{FireDataSource, NearbyQuery, SourceFuture};
use crate::geomath::{distance, nearest_polygon_vertex_distance};
use crate::{Coordinate, Geometry, Incident, ProviderId, Quality, ValidationError};

pub const SEED_SOURCE_TOKEN: &str = "opaque-seed-1";

/// Fixed incident list, used as the offline fallback at the end of the fire chain.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFireAdapter {
    incidents: Vec<Incident>,
}

impl InMemoryFireAdapter {
    pub fn new(incidents: Vec<Incident>) -> Self {
        Self { incidents }
    }

    /// The single seed incident shipped with the default chain.
    pub fn seeded() -> Result<Self, ValidationError> {
        let garnet = Incident::new("IRWIN123", "Garnet Fire (seed)")?
            .with_geometry(Geometry::point(Coordinate::new(39.20, -120.25)?))
            .with_acres(Some(3_200.0))
            .with_containment_percent(Some(45.0))
            .with_quality(Quality::new(SEED_SOURCE_TOKEN));

        Ok(Self::new(vec![garnet]))
    }

    pub fn incidents(&self) -> &[Incident] {
        &self.incidents
    }

    fn within(incident: &Incident, query: &NearbyQuery) -> bool {
        let Some(geometry) = &incident.geometry else {
            return false;
        };

        let by_point = geometry
            .point
            .is_some_and(|point| distance(query.center, point, query.unit) <= query.radius);
        if by_point {
            return true;
        }

        geometry
            .polygon
            .as_ref()
            .and_then(|polygon| nearest_polygon_vertex_distance(query.center, polygon, query.unit))
            .is_some_and(|nearest| nearest <= query.radius)
    }
}

impl FireDataSource for InMemoryFireAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Seed
    }

    fn search_nearby<'a>(&'a self, query: NearbyQuery) -> SourceFuture<'a, Vec<Incident>> {
        Box::pin(async move {
            Ok(self
                .incidents
                .iter()
                .filter(|incident| Self::within(incident, &query))
                .cloned()
                .collect())
        })
    }

    fn lookup_by_id<'a>(&'a self, incident_id: String) -> SourceFuture<'a, Option<Incident>> {
        Box::pin(async move {
            Ok(self
                .incidents
                .iter()
                .find(|incident| incident.id == incident_id)
                .cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::block_on;
    use crate::{DistanceUnit, Polygon};

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).expect("valid coordinate")
    }

    #[test]
    fn seed_contains_garnet_fire() {
        let adapter = InMemoryFireAdapter::seeded().expect("seed is valid");
        let incident = block_on(adapter.lookup_by_id(String::from("IRWIN123")))
            .expect("lookup succeeds")
            .expect("seed incident present");

        assert_eq!(incident.name, "Garnet Fire (seed)");
        assert_eq!(incident.acres, Some(3_200.0));
        assert_eq!(incident.containment_percent, Some(45.0));
    }

    #[test]
    fn search_filters_by_point_radius() {
        let adapter = InMemoryFireAdapter::seeded().expect("seed is valid");
        let near = NearbyQuery::new(coord(39.21, -120.25), 5.0, DistanceUnit::Miles).expect("valid");
        let far = NearbyQuery::new(coord(40.0, -120.25), 5.0, DistanceUnit::Miles).expect("valid");

        assert_eq!(block_on(adapter.search_nearby(near)).expect("ok").len(), 1);
        assert!(block_on(adapter.search_nearby(far)).expect("ok").is_empty());
    }

    #[test]
    fn search_matches_polygon_vertex_within_radius() {
        let incident = Incident::new("POLY1", "Perimeter only")
            .expect("valid")
            .with_geometry(Geometry::polygon(Polygon::new(vec![vec![
                coord(10.0, 10.0),
                coord(0.0, 0.05),
            ]])));
        let adapter = InMemoryFireAdapter::new(vec![incident]);
        let query = NearbyQuery::new(coord(0.0, 0.0), 10.0, DistanceUnit::Kilometers).expect("valid");

        assert_eq!(block_on(adapter.search_nearby(query)).expect("ok").len(), 1);
    }

    #[test]
    fn unknown_id_is_absent_not_error() {
        let adapter = InMemoryFireAdapter::default();
        let result = block_on(adapter.lookup_by_id(String::from("missing"))).expect("ok");
        assert!(result.is_none());
    }
}
