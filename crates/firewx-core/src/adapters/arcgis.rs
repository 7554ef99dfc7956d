use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::data_source::{FireDataSource, NearbyQuery, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, DEFAULT_TIMEOUT_MS};
use crate::{
    resolve_incident_id, Coordinate, DistanceUnit, Geometry, Incident, Polygon, ProviderId, Quality,
    UtcDateTime,
};

/// WFIGS current incident locations (points).
pub const DEFAULT_INCIDENTS_URL: &str = concat!(
    "https://services3.arcgis.com/T4QMspbfLg3qTGWY/ArcGIS/rest/services/",
    "WFIGS_Incident_Locations_Current/FeatureServer/0/query"
);
/// WFIGS interagency perimeters, year to date (polygons).
pub const DEFAULT_PERIMETERS_URL: &str = concat!(
    "https://services3.arcgis.com/T4QMspbfLg3qTGWY/ArcGIS/rest/services/",
    "WFIGS_Interagency_Fire_Perimeters_to_Date_2025/FeatureServer/0/query"
);
pub const ARCGIS_SOURCE_TOKEN: &str = "opaque-gis-1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArcGisConfig {
    pub incidents_url: String,
    /// Perimeter layer used to attach polygons; `None` disables enrichment.
    pub perimeters_url: Option<String>,
    pub timeout_ms: u64,
    pub source_token: String,
}

impl Default for ArcGisConfig {
    fn default() -> Self {
        Self {
            incidents_url: String::from(DEFAULT_INCIDENTS_URL),
            perimeters_url: Some(String::from(DEFAULT_PERIMETERS_URL)),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            source_token: String::from(ARCGIS_SOURCE_TOKEN),
        }
    }
}

/// ArcGIS FeatureServer `/query` client for WFIGS incident layers.
#[derive(Clone)]
pub struct ArcGisRestAdapter {
    config: ArcGisConfig,
    http_client: Arc<dyn HttpClient>,
}

impl ArcGisRestAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, config: ArcGisConfig) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ArcGisConfig {
        &self.config
    }

    async fn query(
        &self,
        url: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<Vec<Feature>, SourceError> {
        let request = HttpRequest::get(url)
            .with_query(params)
            .with_timeout_ms(self.config.timeout_ms);

        let response = self.http_client.execute(request).await.map_err(|error| {
            if error.retryable() {
                SourceError::unavailable(format!("arcgis transport error: {}", error.message()))
            } else {
                SourceError::internal(format!("arcgis transport error: {}", error.message()))
            }
        })?;

        if !response.is_success() {
            return Err(SourceError::unavailable(format!(
                "arcgis upstream returned status {}",
                response.status
            )));
        }

        let payload: FeatureSet = serde_json::from_str(&response.body).map_err(|e| {
            SourceError::malformed_payload(format!("failed to parse arcgis response: {e}"))
        })?;

        // ArcGIS reports query errors with HTTP 200 and an `error` member.
        if let Some(error) = payload.error {
            return Err(SourceError::unavailable(error.describe()));
        }

        Ok(payload.features)
    }

    async fn search_incidents(&self, query: &NearbyQuery) -> Result<Vec<Incident>, SourceError> {
        let mut last_error = None;

        for (variant, params) in search_variants(query).into_iter().enumerate() {
            match self.query(&self.config.incidents_url, params).await {
                Ok(features) => {
                    debug!(variant, features = features.len(), "arcgis search variant succeeded");
                    let incidents = features
                        .iter()
                        .filter_map(|feature| {
                            let incident = normalize_feature(feature, &self.config.source_token);
                            if incident.is_none() {
                                warn!("skipping arcgis feature without a usable identifier");
                            }
                            incident
                        })
                        .collect();
                    return Ok(incidents);
                }
                Err(error) => {
                    debug!(variant, error = %error, "arcgis search variant failed");
                    last_error = Some(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            SourceError::unavailable("arcgis query failed for all parameter variants")
        }))
    }

    async fn perimeters(
        &self,
        query: &NearbyQuery,
        url: &str,
    ) -> Result<HashMap<String, Perimeter>, SourceError> {
        let mut params = base_search_params(query);
        params.push(("outFields", String::from("*")));
        params.push(("distance", query.radius_in(DistanceUnit::Meters).to_string()));
        params.push(("units", String::from("esriSRUnit_Meter")));

        let features = self.query(url, params).await?;
        let mut perimeters = HashMap::new();
        for feature in &features {
            let attributes = feature.attributes();
            let key = attr_str(attributes, &["IrwinID", "IRWINID", "attr_IrwinID"])
                .map(|id| id_key(&id))
                .or_else(|| {
                    attr_str(attributes, &["IncidentName", "poly_IncidentName"])
                        .map(|name| name_key(&name))
                });
            let Some(key) = key else {
                continue;
            };

            let perimeter = Perimeter {
                polygon: feature.polygon(),
                acres: attr_f64(attributes, &["GISAcres", "poly_GISAcres", "DailyAcres"]),
            };
            perimeters.entry(key).or_insert(perimeter);
        }
        Ok(perimeters)
    }

    fn enrich(incidents: Vec<Incident>, perimeters: &HashMap<String, Perimeter>) -> Vec<Incident> {
        incidents
            .into_iter()
            .map(|incident| {
                let perimeter = perimeters
                    .get(&id_key(&incident.id))
                    .or_else(|| perimeters.get(&name_key(&incident.name)));
                let Some(perimeter) = perimeter else {
                    return incident;
                };

                let acres = perimeter.acres.or(incident.acres);
                let geometry = match (incident.geometry.clone(), perimeter.polygon.clone()) {
                    (Some(geometry), Some(polygon)) => geometry.with_polygon(polygon),
                    (None, Some(polygon)) => Geometry::polygon(polygon),
                    (geometry, None) => geometry.unwrap_or_default(),
                };
                incident.with_geometry(geometry).with_acres(acres)
            })
            .collect()
    }
}

impl FireDataSource for ArcGisRestAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Arcgis
    }

    fn search_nearby<'a>(&'a self, query: NearbyQuery) -> SourceFuture<'a, Vec<Incident>> {
        Box::pin(async move {
            let incidents = self.search_incidents(&query).await?;

            let Some(url) = self.config.perimeters_url.as_deref() else {
                return Ok(incidents);
            };
            if incidents.is_empty() {
                return Ok(incidents);
            }

            match self.perimeters(&query, url).await {
                Ok(perimeters) => Ok(Self::enrich(incidents, &perimeters)),
                Err(error) => {
                    warn!(error = %error, "perimeter enrichment failed, returning points only");
                    Ok(incidents)
                }
            }
        })
    }

    fn lookup_by_id<'a>(&'a self, incident_id: String) -> SourceFuture<'a, Option<Incident>> {
        Box::pin(async move {
            let incident_id = incident_id.trim();
            if incident_id.is_empty() {
                return Err(SourceError::invalid_request("incident id must not be empty"));
            }

            let params = vec![
                ("where", lookup_where_clause(incident_id)),
                ("outFields", String::from("*")),
                ("returnGeometry", String::from("true")),
                ("f", String::from("json")),
            ];
            let features = self.query(&self.config.incidents_url, params).await?;

            let Some(first) = features.first() else {
                return Ok(None);
            };
            normalize_feature(first, &self.config.source_token)
                .map(Some)
                .ok_or_else(|| {
                    SourceError::malformed_payload("arcgis feature has no usable identifier")
                })
        })
    }
}

fn base_search_params(query: &NearbyQuery) -> Vec<(&'static str, String)> {
    let geometry = serde_json::json!({
        "x": query.center.lon(),
        "y": query.center.lat(),
        "spatialReference": { "wkid": 4326 },
    });

    vec![
        ("where", String::from("1=1")),
        ("returnGeometry", String::from("true")),
        ("geometry", geometry.to_string()),
        ("geometryType", String::from("esriGeometryPoint")),
        ("inSR", String::from("4326")),
        ("outSR", String::from("4326")),
        ("spatialRel", String::from("esriSpatialRelIntersects")),
        ("f", String::from("json")),
    ]
}

/// Parameter sets tried in order: statute miles + geodesic, meters, then layer units.
fn search_variants(query: &NearbyQuery) -> Vec<Vec<(&'static str, String)>> {
    let radius_meters = query.radius_in(DistanceUnit::Meters);
    let radius_miles = query.radius_in(DistanceUnit::Miles);

    let with = |extra: &[(&'static str, String)]| {
        let mut params = base_search_params(query);
        params.push(("outFields", String::from("*")));
        params.extend_from_slice(extra);
        params
    };

    vec![
        with(&[
            ("distance", radius_miles.to_string()),
            ("units", String::from("esriSRUnit_StatuteMile")),
            ("geodesic", String::from("true")),
        ]),
        with(&[
            ("distance", radius_meters.to_string()),
            ("units", String::from("esriSRUnit_Meter")),
        ]),
        with(&[("distance", radius_miles.to_string())]),
    ]
}

/// `OR` of id equalities, numeric `OBJECTID`, and a name match for non-GUID input.
fn lookup_where_clause(incident_id: &str) -> String {
    let escaped = incident_id.replace('\'', "''");
    let mut candidates = vec![
        format!("IrwinID='{escaped}'"),
        format!("IRWINID='{escaped}'"),
        format!("GlobalID='{escaped}'"),
    ];

    if !incident_id.is_empty() && incident_id.chars().all(|ch| ch.is_ascii_digit()) {
        candidates.push(format!("OBJECTID={incident_id}"));
    }

    if !looks_like_guid(incident_id) {
        candidates.push(format!("UPPER(IncidentName) LIKE UPPER('%{escaped}%')"));
    }

    candidates.join(" OR ")
}

fn looks_like_guid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::try_parse(value).is_ok()
}

fn normalize_feature(feature: &Feature, source_token: &str) -> Option<Incident> {
    let attributes = feature.attributes();
    let name = attr_str(attributes, &["IncidentName"]);

    let id = resolve_incident_id(
        [
            attr_str(attributes, &["IrwinID"]).as_deref(),
            attr_str(attributes, &["IRWINID"]).as_deref(),
            attr_str(attributes, &["GlobalID"]).as_deref(),
        ],
        attr_i64(attributes, "OBJECTID"),
        name.as_deref(),
    )?;

    // A zero GISAcres means "not measured"; fall back to the reported size.
    let acres = attr_f64(attributes, &["GISAcres"])
        .filter(|acres| *acres > 0.0)
        .or_else(|| attr_f64(attributes, &["IncidentSize"]));

    let mut geometry = Geometry::default();
    if let Some(point) = feature.point() {
        geometry.point = Some(point);
    }
    if let Some(polygon) = feature.polygon() {
        geometry.polygon = Some(polygon);
    }

    let incident = Incident::new(id, name.unwrap_or_default())
        .ok()?
        .with_state(attr_str(attributes, &["POOState"]))
        .with_county(attr_str(attributes, &["POOCounty"]))
        .with_created(
            attr_i64(attributes, "CreatedOnDateTime").and_then(UtcDateTime::from_unix_millis),
        )
        .with_containment_percent(attr_f64(attributes, &["PercentContained"]))
        .with_acres(acres)
        .with_geometry(geometry)
        .with_quality(Quality::new(source_token));
    Some(incident)
}

fn id_key(id: &str) -> String {
    id.trim()
        .trim_start_matches('{')
        .trim_end_matches('}')
        .to_ascii_uppercase()
}

fn name_key(name: &str) -> String {
    format!("name:{}", name.trim().to_ascii_lowercase())
}

/// First non-empty string-ish attribute among `keys`.
fn attr_str(attributes: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match attributes.get(*key)? {
        Value::String(value) if !value.trim().is_empty() => Some(value.trim().to_owned()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    })
}

/// First numeric attribute among `keys`; numeric strings are accepted.
fn attr_f64(attributes: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match attributes.get(*key)? {
        Value::Number(value) => value.as_f64(),
        Value::String(value) => value.trim().parse::<f64>().ok(),
        _ => None,
    })
    .filter(|value| value.is_finite())
}

fn attr_i64(attributes: &Map<String, Value>, key: &str) -> Option<i64> {
    match attributes.get(key)? {
        Value::Number(value) => value.as_i64().or_else(|| value.as_f64().map(|v| v as i64)),
        Value::String(value) => value.trim().parse::<i64>().ok(),
        _ => None,
    }
}

struct Perimeter {
    polygon: Option<Polygon>,
    acres: Option<f64>,
}

// ArcGIS REST response structures

#[derive(Debug, Deserialize)]
struct FeatureSet {
    #[serde(default, deserialize_with = "null_as_default")]
    features: Vec<Feature>,
    #[serde(default)]
    error: Option<ArcGisErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ArcGisErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<Vec<Value>>,
}

impl ArcGisErrorBody {
    fn describe(&self) -> String {
        let message = self
            .message
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or("ArcGIS REST error");
        let details = self
            .details
            .iter()
            .flatten()
            .map(|detail| match detail {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("; ");

        match self.code {
            Some(code) => format!("arcgis error {code}: {message}: {details}"),
            None => format!("arcgis error: {message}: {details}"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Feature {
    #[serde(default, deserialize_with = "null_as_default")]
    attributes: Map<String, Value>,
    #[serde(default)]
    geometry: Option<FeatureGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureGeometry {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    rings: Option<Vec<Vec<Vec<f64>>>>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Feature {
    fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Point from `x` (lon) / `y` (lat).
    fn point(&self) -> Option<Coordinate> {
        let geometry = self.geometry.as_ref()?;
        Coordinate::new(geometry.y?, geometry.x?).ok()
    }

    /// Rings of `[x, y]` pairs. Invalid vertices are dropped.
    fn polygon(&self) -> Option<Polygon> {
        let rings = self.geometry.as_ref()?.rings.as_ref()?;
        let rings = rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter_map(|pair| match pair.as_slice() {
                        [x, y, ..] => Coordinate::new(*y, *x).ok(),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .filter(|ring| !ring.is_empty())
            .collect::<Vec<_>>();

        let polygon = Polygon::new(rings);
        (!polygon.is_empty()).then_some(polygon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};
    use crate::test_support::{block_on, RecordingHttpClient};

    const FEATURES: &str = r#"{
        "features": [
            {
                "attributes": {
                    "IrwinID": "{8A1F2C3D-0000-4000-8000-000000000001}",
                    "GlobalID": "g-1",
                    "OBJECTID": 17,
                    "IncidentName": "Ridge Fire",
                    "POOState": "US-CA",
                    "POOCounty": "Nevada",
                    "CreatedOnDateTime": 1700000000000,
                    "PercentContained": 20,
                    "GISAcres": null,
                    "IncidentSize": "1500.5"
                },
                "geometry": { "x": -120.3, "y": 39.3 }
            },
            {
                "attributes": { "OBJECTID": 18, "IncidentName": null, "GISAcres": 12000 },
                "geometry": { "x": -120.1, "y": 39.1 }
            }
        ]
    }"#;

    fn adapter(client: Arc<RecordingHttpClient>, perimeters: bool) -> ArcGisRestAdapter {
        let config = ArcGisConfig {
            incidents_url: String::from("https://arcgis.test/incidents/query"),
            perimeters_url: perimeters
                .then(|| String::from("https://arcgis.test/perimeters/query")),
            ..ArcGisConfig::default()
        };
        ArcGisRestAdapter::new(client, config)
    }

    fn query() -> NearbyQuery {
        let center = Coordinate::new(39.2, -120.25).expect("valid");
        NearbyQuery::new(center, 25.0, DistanceUnit::Miles).expect("valid")
    }

    #[test]
    fn search_normalizes_features() {
        let client = Arc::new(RecordingHttpClient::ok(FEATURES));
        let incidents = block_on(adapter(client.clone(), false).search_nearby(query()))
            .expect("search succeeds");

        assert_eq!(incidents.len(), 2);
        let ridge = &incidents[0];
        assert_eq!(ridge.id, "{8A1F2C3D-0000-4000-8000-000000000001}");
        assert_eq!(ridge.name, "Ridge Fire");
        assert_eq!(ridge.state.as_deref(), Some("US-CA"));
        assert_eq!(ridge.acres, Some(1500.5));
        assert_eq!(ridge.containment_percent, Some(20.0));
        assert_eq!(
            ridge.created.map(UtcDateTime::format_rfc3339).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        let point = ridge.geometry.as_ref().and_then(|g| g.point).expect("point");
        assert_eq!((point.lat(), point.lon()), (39.3, -120.3));
        assert_eq!(
            ridge.quality.as_ref().map(|q| q.source_token.as_str()),
            Some(ARCGIS_SOURCE_TOKEN)
        );

        let unnamed = &incidents[1];
        assert_eq!(unnamed.id, "18");
        assert_eq!(unnamed.name, "(unknown)");
        assert_eq!(unnamed.acres, Some(12000.0));

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.contains("units=esriSRUnit_StatuteMile"));
        assert!(requests[0].url.contains("geodesic=true"));
    }

    #[test]
    fn error_envelope_triggers_next_parameter_variant() {
        let error = r#"{"error": {"code": 400, "message": "Invalid query", "details": ["units"]}}"#;
        let client = Arc::new(RecordingHttpClient::new(vec![
            Ok(HttpResponse::ok(error)),
            Ok(HttpResponse::ok(FEATURES)),
        ]));

        let incidents = block_on(adapter(client.clone(), false).search_nearby(query()))
            .expect("second variant succeeds");
        assert_eq!(incidents.len(), 2);

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].url.contains("units=esriSRUnit_Meter"));
        assert!(requests[1].url.contains("distance=40233."));
    }

    #[test]
    fn all_variants_failing_raises_last_error() {
        let client = Arc::new(RecordingHttpClient::new(vec![
            Err(HttpError::new("timeout")),
            Ok(HttpResponse::with_status(503, "")),
            Ok(HttpResponse::ok(r#"{"error": {"message": "Unable to complete operation."}}"#)),
        ]));

        let error = block_on(adapter(client.clone(), false).search_nearby(query()))
            .expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        assert!(error.message().contains("Unable to complete operation."));
        assert_eq!(client.recorded_requests().len(), 3);
        assert!(!client.recorded_requests()[2].url.contains("units="));
    }

    #[test]
    fn malformed_body_is_a_failure_not_empty() {
        let client = Arc::new(RecordingHttpClient::new(vec![
            Ok(HttpResponse::ok("<html>")),
            Ok(HttpResponse::ok("<html>")),
            Ok(HttpResponse::ok("<html>")),
        ]));

        let error = block_on(adapter(client, false).search_nearby(query())).expect_err("must fail");
        assert_eq!(error.kind(), SourceErrorKind::MalformedPayload);
    }

    #[test]
    fn perimeters_attach_polygons_and_acres() {
        let perimeters = r#"{
            "features": [{
                "attributes": { "IrwinID": "{8a1f2c3d-0000-4000-8000-000000000001}", "GISAcres": 1800.0 },
                "geometry": { "rings": [[[-120.31, 39.31], [-120.29, 39.31], [-120.3, 39.29], [-120.31, 39.31]]] }
            }]
        }"#;
        let client = Arc::new(RecordingHttpClient::new(vec![
            Ok(HttpResponse::ok(FEATURES)),
            Ok(HttpResponse::ok(perimeters)),
        ]));

        let incidents =
            block_on(adapter(client, true).search_nearby(query())).expect("search succeeds");
        let ridge = &incidents[0];
        assert_eq!(ridge.acres, Some(1800.0));
        let polygon = ridge
            .geometry
            .as_ref()
            .and_then(|g| g.polygon.as_ref())
            .expect("polygon attached");
        assert_eq!(polygon.vertices().count(), 4);
        assert!(ridge.geometry.as_ref().and_then(|g| g.point).is_some());
        assert!(incidents[1].geometry.as_ref().and_then(|g| g.polygon.as_ref()).is_none());
    }

    #[test]
    fn perimeter_failure_does_not_fail_search() {
        let client = Arc::new(RecordingHttpClient::new(vec![
            Ok(HttpResponse::ok(FEATURES)),
            Err(HttpError::new("perimeter layer down")),
        ]));

        let incidents =
            block_on(adapter(client, true).search_nearby(query())).expect("search succeeds");
        assert_eq!(incidents.len(), 2);
    }

    #[test]
    fn lookup_where_clause_covers_ids_and_names() {
        assert_eq!(
            lookup_where_clause("42"),
            "IrwinID='42' OR IRWINID='42' OR GlobalID='42' OR OBJECTID=42 OR UPPER(IncidentName) LIKE UPPER('%42%')"
        );
        assert_eq!(
            lookup_where_clause("O'Brien"),
            "IrwinID='O''Brien' OR IRWINID='O''Brien' OR GlobalID='O''Brien' OR UPPER(IncidentName) LIKE UPPER('%O''Brien%')"
        );

        let guid = "8a1f2c3d-0000-4000-8000-000000000001";
        assert!(!lookup_where_clause(guid).contains("LIKE"));
    }

    #[test]
    fn lookup_returns_first_feature_or_none() {
        let client = Arc::new(RecordingHttpClient::new(vec![
            Ok(HttpResponse::ok(FEATURES)),
            Ok(HttpResponse::ok(r#"{"features": []}"#)),
        ]));
        let adapter = adapter(client.clone(), false);

        let found = block_on(adapter.lookup_by_id(String::from("Ridge"))).expect("ok");
        assert_eq!(found.map(|incident| incident.name).as_deref(), Some("Ridge Fire"));

        let missing = block_on(adapter.lookup_by_id(String::from("nothing"))).expect("ok");
        assert!(missing.is_none());

        let first = &client.recorded_requests()[0];
        assert!(first.url.contains("where=IrwinID%3D%27Ridge%27"));
    }
}
