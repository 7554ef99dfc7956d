use serde::{Deserialize, Serialize};

use crate::{Geometry, UtcDateTime, ValidationError};

/// Provenance marker attached to normalized records.
///
/// `source_token` is opaque on purpose: it identifies the feed without naming it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quality {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_age_min: Option<u32>,
    pub source_token: String,
    pub qflags: Vec<String>,
}

impl Quality {
    pub fn new(source_token: impl Into<String>) -> Self {
        Self {
            data_age_min: None,
            source_token: source_token.into(),
            qflags: vec![String::from("ok")],
        }
    }

    pub fn with_data_age_min(mut self, minutes: Option<u32>) -> Self {
        self.data_age_min = minutes;
        self
    }
}

/// Canonical wildfire incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub name: String,
    pub state: Option<String>,
    pub county: Option<String>,
    pub created: Option<UtcDateTime>,
    pub containment_percent: Option<f64>,
    pub acres: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<Quality>,
}

impl Incident {
    /// Blank names normalize to `(unknown)`.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyIncidentId);
        }

        let name = name.into();
        let name = if name.trim().is_empty() {
            String::from("(unknown)")
        } else {
            name
        };

        Ok(Self {
            id,
            name,
            state: None,
            county: None,
            created: None,
            containment_percent: None,
            acres: None,
            geometry: None,
            quality: None,
        })
    }

    pub fn with_state(mut self, state: Option<String>) -> Self {
        self.state = state;
        self
    }

    pub fn with_county(mut self, county: Option<String>) -> Self {
        self.county = county;
        self
    }

    pub fn with_created(mut self, created: Option<UtcDateTime>) -> Self {
        self.created = created;
        self
    }

    pub fn with_containment_percent(mut self, percent: Option<f64>) -> Self {
        self.containment_percent = percent.filter(|value| value.is_finite());
        self
    }

    pub fn with_acres(mut self, acres: Option<f64>) -> Self {
        self.acres = acres.filter(|value| value.is_finite());
        self
    }

    /// An empty geometry is stored as no geometry.
    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = if geometry.is_empty() {
            None
        } else {
            Some(geometry)
        };
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Picks the most stable identifier a provider offers for a record.
///
/// Global ids win in the order given, then the provider-local numeric id, then a
/// key derived from the name. Returns `None` when nothing usable is present.
pub fn resolve_incident_id<'a>(
    global_ids: impl IntoIterator<Item = Option<&'a str>>,
    local_id: Option<i64>,
    name: Option<&str>,
) -> Option<String> {
    let global = global_ids
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty());
    if let Some(global) = global {
        return Some(global.to_owned());
    }

    if let Some(local_id) = local_id {
        return Some(local_id.to_string());
    }

    name.and_then(name_key)
}

fn name_key(name: &str) -> Option<String> {
    let mut key = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            key.push(ch.to_ascii_lowercase());
        } else if !key.is_empty() && !key.ends_with('-') {
            key.push('-');
        }
    }

    let key = key.trim_end_matches('-');
    if key.is_empty() {
        None
    } else {
        Some(format!("name:{key}"))
    }
}
