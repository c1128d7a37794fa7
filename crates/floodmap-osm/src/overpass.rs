//! Overpass API client with an on-disk response cache.
//!
//! Infrastructure is queried as nodes, ways and relations carrying the
//! kind's tag, reduced to a single point (`out center`). Roads are every way
//! with a `highway` tag, returned with full geometry (`out geom`).
//!
//! Responses are cached under `<cache_dir>/<sha256 of endpoint and query>.json`
//! so repeated runs over the same area do not hit the public server.

use crate::source::{BoundingBox, VectorSource};
use crate::{Result, SourceError};
use floodmap_impact::{FeatureCollection, InfrastructureKind, Properties, VectorFeature};
use floodmap_raster::Crs;
use geo::{Coord, LineString, Point};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Public Overpass endpoint used when none is configured.
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// HTTP timeout for a single query.
const REQUEST_TIMEOUT_SECS: u64 = 120;

/// Server-side query timeout in seconds.
const QUERY_TIMEOUT_SECS: u64 = 90;

/// Name given to roads without one.
pub const UNNAMED_ROAD: &str = "Unnamed Road";

/// `highway` value for roads without one.
const DEFAULT_HIGHWAY: &str = "road";

/// Longest response excerpt kept in error messages.
const ERROR_BODY_CHARS: usize = 200;

/// Overpass API client.
pub struct OverpassClient {
    /// Interpreter URL.
    endpoint: String,
    /// Directory for cached responses, if caching is enabled.
    cache_dir: Option<PathBuf>,
    /// HTTP client.
    client: reqwest::blocking::Client,
}

impl std::fmt::Debug for OverpassClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverpassClient")
            .field("endpoint", &self.endpoint)
            .field("cache_dir", &self.cache_dir)
            .finish()
    }
}

impl OverpassClient {
    /// Create a client for the public endpoint without caching.
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_OVERPASS_URL)
    }

    /// Create a client for a specific interpreter URL.
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("floodmap/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            cache_dir: None,
            client,
        })
    }

    /// Cache responses in `cache_dir`, creating it if needed.
    pub fn with_cache_dir<P: AsRef<Path>>(mut self, cache_dir: P) -> Result<Self> {
        let cache_dir = cache_dir.as_ref().to_path_buf();
        fs::create_dir_all(&cache_dir)?;
        self.cache_dir = Some(cache_dir);
        Ok(self)
    }

    /// Interpreter URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Get the cache directory, if caching is enabled.
    pub fn cache_dir(&self) -> Option<&Path> {
        self.cache_dir.as_deref()
    }

    /// Cache file for a query.
    pub fn cache_path(&self, query: &str) -> Option<PathBuf> {
        let dir = self.cache_dir.as_ref()?;
        let mut hasher = Sha256::new();
        hasher.update(self.endpoint.as_bytes());
        hasher.update(b"\n");
        hasher.update(query.as_bytes());
        Some(dir.join(format!("{}.json", hex::encode(hasher.finalize()))))
    }

    /// Run a query, using the cache if available.
    ///
    /// Returns the raw response body.
    pub fn run_query(&self, query: &str) -> Result<Vec<u8>> {
        let cache_path = self.cache_path(query);

        // Fast path: cached response
        if let Some(path) = &cache_path {
            if path.exists() {
                debug!(path = %path.display(), "Overpass cache hit");
                return Ok(fs::read(path)?);
            }
        }

        debug!(endpoint = %self.endpoint, "sending Overpass query");
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", query)])
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message: body.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes()?;
        debug!(bytes = bytes.len(), "received Overpass response");

        // Only cache answers that parse and carry no runtime error
        check_remark(&bytes)?;
        if let Some(path) = &cache_path {
            let mut file = fs::File::create(path)?;
            file.write_all(&bytes)?;
        }

        Ok(bytes.to_vec())
    }
}

impl VectorSource for OverpassClient {
    fn name(&self) -> &str {
        "overpass"
    }

    fn infrastructure(&self, bbox: &BoundingBox, kind: &InfrastructureKind) -> Result<FeatureCollection> {
        let body = self.run_query(&infrastructure_query(bbox, kind))?;
        let collection = parse_infrastructure(&body, kind)?;
        info!(kind = %kind.name, features = collection.len(), "fetched infrastructure");
        Ok(collection)
    }

    fn roads(&self, bbox: &BoundingBox) -> Result<FeatureCollection> {
        let body = self.run_query(&roads_query(bbox))?;
        let collection = parse_roads(&body)?;
        info!(features = collection.len(), "fetched road network");
        Ok(collection)
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Overpass QL for one infrastructure kind.
pub fn infrastructure_query(bbox: &BoundingBox, kind: &InfrastructureKind) -> String {
    let filter = format!(
        "[\"{}\"=\"{}\"]({})",
        escape(&kind.osm_key),
        escape(&kind.osm_value),
        bbox.overpass_filter()
    );
    format!(
        "[out:json][timeout:{}];\n(\n  node{f};\n  way{f};\n  relation{f};\n);\nout center tags;",
        QUERY_TIMEOUT_SECS,
        f = filter
    )
}

/// Overpass QL for the road network.
pub fn roads_query(bbox: &BoundingBox) -> String {
    format!(
        "[out:json][timeout:{}];\nway[\"highway\"]({});\nout geom tags;",
        QUERY_TIMEOUT_SECS,
        bbox.overpass_filter()
    )
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<LatLon>,
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

impl From<LatLon> for Coord<f64> {
    fn from(p: LatLon) -> Self {
        Coord { x: p.lon, y: p.lat }
    }
}

impl Element {
    fn position(&self) -> Option<Coord<f64>> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(Coord { x: lon, y: lat }),
            _ => self.center.map(Coord::from),
        }
    }

    fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str).filter(|n| !n.is_empty())
    }

    fn base_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.insert("osm_id".to_string(), Value::from(self.id));
        properties.insert("osm_type".to_string(), Value::from(self.kind.clone()));
        properties
    }
}

fn decode(body: &[u8]) -> Result<OverpassResponse> {
    let response: OverpassResponse = serde_json::from_slice(body)?;
    if let Some(remark) = &response.remark {
        if remark.contains("error") {
            return Err(SourceError::Overpass(remark.clone()));
        }
    }
    Ok(response)
}

fn check_remark(body: &[u8]) -> Result<()> {
    decode(body).map(|_| ())
}

/// Turn an Overpass `out center` response into infrastructure points.
pub fn parse_infrastructure(body: &[u8], kind: &InfrastructureKind) -> Result<FeatureCollection> {
    let response = decode(body)?;
    let mut collection = FeatureCollection::new(Crs::Wgs84);

    for element in &response.elements {
        let Some(position) = element.position() else {
            continue;
        };
        let mut properties = element.base_properties();
        let name = element
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| kind.unnamed_label());
        properties.insert("name".to_string(), Value::from(name));
        properties.insert("infrastructure_type".to_string(), Value::from(kind.name.clone()));
        properties.insert("group".to_string(), Value::from(kind.group.clone()));
        properties.insert("description".to_string(), Value::from(kind.description.clone()));
        properties.insert(kind.osm_key.clone(), Value::from(kind.osm_value.clone()));

        collection.push(VectorFeature::new(Point(position), properties));
    }

    Ok(collection)
}

/// Turn an Overpass `out geom` response into road lines.
pub fn parse_roads(body: &[u8]) -> Result<FeatureCollection> {
    let response = decode(body)?;
    let mut collection = FeatureCollection::new(Crs::Wgs84);

    for element in response.elements.iter().filter(|e| e.kind == "way") {
        let coords: Vec<Coord<f64>> = element
            .geometry
            .iter()
            .flatten()
            .map(|&p| Coord::from(p))
            .collect();
        if coords.len() < 2 {
            continue;
        }

        let mut properties = element.base_properties();
        properties.insert(
            "name".to_string(),
            Value::from(element.name().unwrap_or(UNNAMED_ROAD)),
        );
        properties.insert(
            "highway".to_string(),
            Value::from(
                element
                    .tags
                    .get("highway")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_HIGHWAY),
            ),
        );

        collection.push(VectorFeature::new(LineString(coords), properties));
    }

    Ok(collection)
}
