//! Core record types shared by the adapters, the orchestrator and the API
//!
//! # Records
//! - [`EntityReference`] - canonical subject of a query (title + graph id)
//! - [`RelationSet`] - deduplicated knowledge-graph edges
//! - [`NeighbourEdge`] - incoming or outgoing edge for the relationship graph
//! - [`GeoMention`] - linked page with a coordinate location
//! - [`TopicRecord`] - merged, partially populated result of one query
//!
//! # Step results
//! Every orchestrator step reports a [`StepResult`], so merging is a total
//! function over "fetched", "nothing found", "not attempted" and "failed".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// ============================================================================
// Entity
// ============================================================================

/// How confidently a free-text query was pinned to a knowledge-graph entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceConfidence {
    /// Unambiguous page with a knowledge-graph identifier
    Exact,
    /// Identifier found, but the page was one of several plausible matches
    Ambiguous,
    /// No identifier; usable for text, images and coordinates only
    None,
}

/// Canonical reference produced by the entity resolver
///
/// Immutable once produced: fields are only readable through accessors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityReference {
    display_title: String,
    knowledge_graph_id: Option<String>,
    source_confidence: SourceConfidence,
}

impl EntityReference {
    /// Build a reference; a missing identifier always means `SourceConfidence::None`
    pub fn new(
        display_title: impl Into<String>,
        knowledge_graph_id: Option<String>,
        source_confidence: SourceConfidence,
    ) -> Self {
        let source_confidence = if knowledge_graph_id.is_some() {
            source_confidence
        } else {
            SourceConfidence::None
        };
        Self {
            display_title: display_title.into(),
            knowledge_graph_id,
            source_confidence,
        }
    }

    /// Reference to a page that has no knowledge-graph counterpart
    pub fn untracked(display_title: impl Into<String>) -> Self {
        Self::new(display_title, None, SourceConfidence::None)
    }

    pub fn display_title(&self) -> &str {
        &self.display_title
    }

    pub fn knowledge_graph_id(&self) -> Option<&str> {
        self.knowledge_graph_id.as_deref()
    }

    pub fn source_confidence(&self) -> SourceConfidence {
        self.source_confidence
    }
}

// ============================================================================
// Geography, country and weather
// ============================================================================

/// WGS84 point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// Validated constructor; rejects NaN and out-of-range values
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Parse a knowledge-graph WKT literal: `Point(LON LAT)`
    pub fn from_wkt_point(literal: &str) -> Option<Self> {
        let inner = literal
            .trim()
            .strip_prefix("Point(")?
            .strip_suffix(')')?;
        let mut parts = inner.split_whitespace();
        let lon = parts.next()?.parse::<f64>().ok()?;
        let lat = parts.next()?.parse::<f64>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(lat, lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

/// Page linked from the topic's article that has a coordinate location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoMention {
    pub title: String,
    pub knowledge_graph_id: String,
    pub coordinates: Coordinates,
}

/// Country facts from the country-metadata service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryMeta {
    /// Common English name (e.g. "Brazil")
    pub common_name: String,
    /// Official English name (e.g. "Federative Republic of Brazil")
    pub official_name: String,
    /// Capital cities (some countries have several)
    pub capitals: Vec<String>,
    pub region: Option<String>,
    pub subregion: Option<String>,
    pub population: Option<u64>,
    /// Land area in square kilometres
    pub area_km2: Option<f64>,
    /// PNG flag URL (SVG when no PNG is published)
    pub flag_url: Option<String>,
    /// Representative point for the whole country
    pub coordinates: Option<Coordinates>,
    /// ISO 3166-1 alpha-3 code
    pub cca3: Option<String>,
}

/// Current conditions at a coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Air temperature in °C
    pub temperature_c: f64,
    /// Wind speed in km/h
    pub windspeed_kmh: f64,
    /// Wind direction in degrees
    pub wind_direction_deg: f64,
    /// WMO weather interpretation code
    pub weather_code: Option<u32>,
    /// Observation time as reported upstream (ISO 8601, UTC)
    pub observed_at: Option<String>,
    pub is_day: Option<bool>,
}

// ============================================================================
// Relations
// ============================================================================

/// One direct property edge of a knowledge-graph entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationEdge {
    /// Property identifier (e.g. "P31")
    pub property: String,
    /// Human-readable property label (e.g. "instance of")
    pub property_label: String,
    /// Target identifier, or the literal value for non-entity targets
    pub target_id: String,
    /// Human-readable target label
    pub target_label: String,
}

/// Edges deduplicated by `(property, target_id)`; first occurrence wins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<RelationEdge>", into = "Vec<RelationEdge>")]
pub struct RelationSet {
    edges: Vec<RelationEdge>,
    seen: HashSet<(String, String)>,
}

impl RelationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect at most `cap` distinct edges from `edges`
    pub fn from_edges_capped(edges: impl IntoIterator<Item = RelationEdge>, cap: usize) -> Self {
        let mut set = Self::new();
        for edge in edges {
            if set.len() >= cap {
                break;
            }
            set.insert(edge);
        }
        set
    }

    /// Insert an edge; returns false when `(property, target_id)` is already present
    pub fn insert(&mut self, edge: RelationEdge) -> bool {
        let key = (edge.property.clone(), edge.target_id.clone());
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push(edge);
        true
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &RelationEdge> {
        self.edges.iter()
    }

    /// Edges with a given property identifier
    pub fn with_property<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a RelationEdge> {
        self.edges.iter().filter(move |e| e.property == property)
    }

    /// Stable display order: property label, property id, then target label
    /// (case-insensitive codepoint comparison), then target id
    pub fn sorted_for_display(&self) -> Vec<&RelationEdge> {
        let mut edges: Vec<&RelationEdge> = self.edges.iter().collect();
        edges.sort_by(|a, b| display_order(a, b));
        edges
    }
}

fn display_order(a: &RelationEdge, b: &RelationEdge) -> Ordering {
    a.property_label
        .to_lowercase()
        .cmp(&b.property_label.to_lowercase())
        .then_with(|| a.property.cmp(&b.property))
        .then_with(|| {
            a.target_label
                .to_lowercase()
                .cmp(&b.target_label.to_lowercase())
        })
        .then_with(|| a.target_id.cmp(&b.target_id))
}

/// Direction of a neighbourhood edge relative to the centre entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    /// centre → other
    Outgoing,
    /// other → centre
    Incoming,
}

/// Entity-to-entity edge touching the centre entity in either direction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighbourEdge {
    pub direction: EdgeDirection,
    pub property: String,
    pub property_label: String,
    pub other_id: String,
    pub other_label: String,
}

impl From<Vec<RelationEdge>> for RelationSet {
    fn from(edges: Vec<RelationEdge>) -> Self {
        let mut set = Self::new();
        for edge in edges {
            set.insert(edge);
        }
        set
    }
}

impl From<RelationSet> for Vec<RelationEdge> {
    fn from(set: RelationSet) -> Self {
        set.edges
    }
}

// ============================================================================
// Failures and step results
// ============================================================================

/// Category of a recoverable, field-scoped failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Call exceeded the per-call timeout
    Timeout,
    /// Connection or transport failure
    Network,
    /// Upstream answered with an error status
    Upstream,
    /// Upstream throttled the request
    RateLimited,
    /// Response did not have the expected shape
    Malformed,
}

/// Recoverable failure of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SoftFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for SoftFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Field of a [`TopicRecord`] a notice refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicField {
    /// Knowledge-graph link of the resolved entity
    Entity,
    Summary,
    /// Infobox pairs and page coordinates
    Infobox,
    Country,
    Weather,
    Relations,
    Images,
    /// Linked places with coordinates
    GeoMentions,
    /// Incoming and outgoing neighbours for the relationship graph
    Neighbourhood,
}

impl fmt::Display for TopicField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TopicField::Entity => "entity",
            TopicField::Summary => "summary",
            TopicField::Infobox => "infobox",
            TopicField::Country => "country",
            TopicField::Weather => "weather",
            TopicField::Relations => "relations",
            TopicField::Images => "images",
            TopicField::GeoMentions => "geo_mentions",
            TopicField::Neighbourhood => "neighbourhood",
        };
        f.write_str(name)
    }
}

/// User-facing notice that one field is degraded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNotice {
    pub field: TopicField,
    pub failure: SoftFailure,
}

/// Outcome of one orchestrator step
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult<T> {
    /// Upstream returned data
    Fetched(T),
    /// Upstream answered but found nothing
    NoResult,
    /// Preconditions not met, no call made
    Skipped,
    /// Soft failure; the field stays absent
    Failed(SoftFailure),
}

impl<T> StepResult<T> {
    /// Convert an adapter result where `Ok(None)` means "nothing found"
    pub fn from_lookup<E>(result: Result<Option<T>, E>) -> Self
    where
        E: Into<SoftFailure>,
    {
        match result {
            Ok(Some(value)) => StepResult::Fetched(value),
            Ok(None) => StepResult::NoResult,
            Err(e) => StepResult::Failed(e.into()),
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            StepResult::Fetched(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SoftFailure> {
        match self {
            StepResult::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

// ============================================================================
// Topic record
// ============================================================================

/// Merged result of one query; every field may be absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Query text as entered (trimmed)
    pub query: String,
    pub entity: EntityReference,
    pub summary_text: Option<String>,
    pub infobox: BTreeMap<String, String>,
    pub coordinates: Option<Coordinates>,
    pub country_meta: Option<CountryMeta>,
    pub weather: Option<WeatherSnapshot>,
    /// Image URLs, most representative first
    pub images: Vec<String>,
    pub relations: RelationSet,
    /// Linked places with coordinates, in link order
    #[serde(default)]
    pub geo_mentions: Vec<GeoMention>,
    /// Plausible years from the summary, in order of first occurrence
    pub extracted_years: Vec<i32>,
    /// Soft failures, one per degraded field
    pub notices: Vec<FieldNotice>,
    pub generated_at: DateTime<Utc>,
}

impl TopicRecord {
    /// Empty record for a resolved entity; the orchestrator fills it step by step
    pub fn new(query: impl Into<String>, entity: EntityReference, generated_at: DateTime<Utc>) -> Self {
        Self {
            query: query.into(),
            entity,
            summary_text: None,
            infobox: BTreeMap::new(),
            coordinates: None,
            country_meta: None,
            weather: None,
            images: Vec::new(),
            relations: RelationSet::new(),
            geo_mentions: Vec::new(),
            extracted_years: Vec::new(),
            notices: Vec::new(),
            generated_at,
        }
    }

    /// Record a soft failure for `field`
    pub fn note_failure(&mut self, field: TopicField, failure: SoftFailure) {
        self.notices.push(FieldNotice { field, failure });
    }

    /// First notice recorded for `field`
    pub fn notice_for(&self, field: TopicField) -> Option<&FieldNotice> {
        self.notices.iter().find(|n| n.field == field)
    }

    pub fn is_degraded(&self) -> bool {
        !self.notices.is_empty()
    }
}

/// Result of resolving a topic
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopicOutcome {
    /// Entity resolved; the record may still be partially populated
    Found { record: Box<TopicRecord> },
    /// Search answered with zero candidates
    NoResults,
    /// The search itself failed, so there is nothing to build on
    Unavailable { failure: SoftFailure },
}

impl TopicOutcome {
    pub fn record(&self) -> Option<&TopicRecord> {
        match self {
            TopicOutcome::Found { record } => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<TopicRecord> {
        match self {
            TopicOutcome::Found { record } => Some(*record),
            _ => None,
        }
    }
}
