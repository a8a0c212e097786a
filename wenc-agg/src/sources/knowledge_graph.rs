//! Knowledge-graph adapter (Wikidata SPARQL endpoint)
//!
//! Queries are sent as `GET ?query=...&format=json` with the SPARQL JSON
//! results media type. Identifiers are validated before they are spliced
//! into a query, and label literals are escaped.
//!
//! Label lookup goes through the `EntitySearch` MediaWiki API service, which
//! returns a small ranked candidate set; the case-insensitive label comparison
//! happens here rather than as a `FILTER(LCASE(...))` scan over every label.
//!
//! API Documentation: https://www.wikidata.org/wiki/Wikidata:SPARQL_query_service

use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::{SourceClient, SourceError, SourceKind, UpstreamRequest};
use crate::types::{Coordinates, EdgeDirection, NeighbourEdge, RelationEdge};

/// Media type of SPARQL JSON results
pub const SPARQL_JSON: &str = "application/sparql-results+json";

/// Namespace prefix of entity URIs
const ENTITY_NAMESPACE: &str = "http://www.wikidata.org/entity/";

/// Candidates considered by [`KnowledgeGraphSource::find_by_label`]
const LABEL_CANDIDATES: usize = 10;

/// One bound variable in a result row
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlTerm {
    /// "uri", "literal" or "bnode"
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// One result row
pub type Binding = HashMap<String, SparqlTerm>;

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    #[serde(default)]
    bindings: Vec<Binding>,
}

/// Entity found by label
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatch {
    pub id: String,
    pub label: String,
}

/// `true` for item, property and lexeme identifiers such as `Q937`, `P31`, `L7`
pub fn is_entity_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('Q' | 'P' | 'L'))
        && id.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// Strip the entity namespace from a URI; other URIs are returned unchanged
pub fn entity_id_from_uri(uri: &str) -> &str {
    uri.strip_prefix(ENTITY_NAMESPACE).unwrap_or(uri)
}

/// Query text for all direct properties of `id` with English labels
///
/// The caller guarantees `id` passed [`is_entity_id`].
pub fn direct_relations_query(id: &str, limit: usize) -> String {
    format!(
        "SELECT ?prop ?propLabel ?value ?valueLabel WHERE {{\n  \
           wd:{id} ?direct ?value .\n  \
           ?prop wikibase:directClaim ?direct .\n  \
           SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }}\n\
         }}\nLIMIT {limit}"
    )
}

/// Query text for entity neighbours of `id` in both directions
///
/// The caller guarantees `id` passed [`is_entity_id`].
pub fn neighbourhood_query(id: &str, limit: usize) -> String {
    format!(
        "SELECT ?prop ?propLabel ?item ?itemLabel ?link WHERE {{\n  \
           {{ wd:{id} ?direct ?item . BIND(\"outgoing\" AS ?link) }}\n  \
           UNION\n  \
           {{ ?item ?direct wd:{id} . BIND(\"incoming\" AS ?link) }}\n  \
           ?prop wikibase:directClaim ?direct .\n  \
           FILTER(isIRI(?item))\n  \
           SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }}\n\
         }}\nLIMIT {limit}"
    )
}

/// Query text for the `P625` coordinate location of each of `ids`
///
/// The caller guarantees every id passed [`is_entity_id`].
pub fn coordinates_query(ids: &[&str]) -> String {
    let values: Vec<String> = ids.iter().map(|id| format!("wd:{id}")).collect();
    format!(
        "SELECT ?item ?coord WHERE {{\n  \
           VALUES ?item {{ {} }}\n  \
           ?item wdt:P625 ?coord .\n\
         }}",
        values.join(" ")
    )
}

/// Query text for the top `limit` entity-search hits for `label`, in rank order
pub fn label_lookup_query(label: &str, limit: usize) -> String {
    format!(
        "SELECT ?item ?itemLabel ?num WHERE {{\n  \
           SERVICE wikibase:mwapi {{\n    \
             bd:serviceParam wikibase:endpoint \"www.wikidata.org\";\n                    \
                             wikibase:api \"EntitySearch\";\n                    \
                             mwapi:search \"{}\";\n                    \
                             mwapi:language \"en\".\n    \
             ?item wikibase:apiOutputItem mwapi:item.\n    \
             ?num wikibase:apiOrdinal true.\n  \
           }}\n  \
           SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }}\n\
         }}\nORDER BY ?num\nLIMIT {limit}",
        escape_literal(label)
    )
}

fn escape_literal(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Wikidata SPARQL client
#[derive(Clone)]
pub struct KnowledgeGraphSource {
    client: SourceClient,
    endpoint: String,
}

impl KnowledgeGraphSource {
    pub fn new(client: SourceClient, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// Run a SELECT query and return its rows
    pub async fn select(&self, sparql: &str) -> Result<Vec<Binding>, SourceError> {
        let request = UpstreamRequest::get(SourceKind::KnowledgeGraph, self.endpoint.as_str())
            .param("query", sparql)
            .param("format", "json")
            .accept(SPARQL_JSON);
        let response: SparqlResponse = self.client.get_decoded(request).await?;
        Ok(response.results.bindings)
    }

    /// Raw direct-property edges of `id`, at most `limit` rows, in upstream order
    ///
    /// Rows missing the property or the value are skipped. Deduplication is
    /// left to the caller.
    pub async fn direct_relations(&self, id: &str, limit: usize) -> Result<Vec<RelationEdge>, SourceError> {
        let rows = self.select(&direct_relations_query(id, limit)).await?;
        let total = rows.len();
        let edges: Vec<RelationEdge> = rows.iter().filter_map(edge_from_binding).collect();
        debug!(id = %id, rows = total, edges = edges.len(), "Knowledge-graph relations fetched");
        Ok(edges)
    }

    /// Entity neighbours of `id`, incoming and outgoing, at most `limit` rows
    ///
    /// Rows whose other end is not an entity are skipped.
    pub async fn neighbourhood(&self, id: &str, limit: usize) -> Result<Vec<NeighbourEdge>, SourceError> {
        let rows = self.select(&neighbourhood_query(id, limit)).await?;
        let edges: Vec<NeighbourEdge> = rows.iter().filter_map(neighbour_from_binding).collect();
        debug!(id = %id, rows = rows.len(), edges = edges.len(), "Knowledge-graph neighbourhood fetched");
        Ok(edges)
    }

    /// Coordinate location of each entity in `ids` that has one
    ///
    /// Invalid ids are dropped before the query is built; with none left, no
    /// call is made. The first point of an entity wins.
    pub async fn coordinates_of(&self, ids: &[String]) -> Result<HashMap<String, Coordinates>, SourceError> {
        let valid: Vec<&str> = ids
            .iter()
            .map(String::as_str)
            .filter(|id| is_entity_id(id))
            .collect();
        if valid.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = self.select(&coordinates_query(&valid)).await?;
        let mut points = HashMap::new();
        for row in &rows {
            let (Some(item), Some(coord)) = (row.get("item"), row.get("coord")) else {
                continue;
            };
            if let Some(point) = Coordinates::from_wkt_point(&coord.value) {
                points
                    .entry(entity_id_from_uri(&item.value).to_string())
                    .or_insert(point);
            }
        }
        Ok(points)
    }

    /// Best-ranked entity whose English label equals `label`, ignoring case
    pub async fn find_by_label(&self, label: &str) -> Result<Option<LabelMatch>, SourceError> {
        let wanted = label.trim().to_lowercase();
        if wanted.is_empty() {
            return Ok(None);
        }
        let rows = self.select(&label_lookup_query(label.trim(), LABEL_CANDIDATES)).await?;
        let found = rows.into_iter().find_map(|row| {
            let id = entity_id_from_uri(&row.get("item")?.value);
            let item_label = &row.get("itemLabel")?.value;
            (is_entity_id(id) && item_label.to_lowercase() == wanted).then(|| LabelMatch {
                id: id.to_string(),
                label: item_label.clone(),
            })
        });
        debug!(label = %label, found = found.is_some(), "Knowledge-graph label lookup");
        Ok(found)
    }
}

fn neighbour_from_binding(row: &Binding) -> Option<NeighbourEdge> {
    let direction = match row.get("link")?.value.as_str() {
        "outgoing" => EdgeDirection::Outgoing,
        "incoming" => EdgeDirection::Incoming,
        _ => return None,
    };
    let property = entity_id_from_uri(&row.get("prop")?.value).to_string();
    let other_id = entity_id_from_uri(&row.get("item")?.value).to_string();
    if !is_entity_id(&property) || !is_entity_id(&other_id) {
        return None;
    }
    let property_label = row
        .get("propLabel")
        .map(|t| t.value.clone())
        .unwrap_or_else(|| property.clone());
    let other_label = row
        .get("itemLabel")
        .map(|t| t.value.clone())
        .unwrap_or_else(|| other_id.clone());
    Some(NeighbourEdge {
        direction,
        property,
        property_label,
        other_id,
        other_label,
    })
}

fn edge_from_binding(row: &Binding) -> Option<RelationEdge> {
    let prop = row.get("prop")?;
    let value = row.get("value")?;

    let property = entity_id_from_uri(&prop.value).to_string();
    let target_id = if value.kind == "uri" {
        entity_id_from_uri(&value.value).to_string()
    } else {
        value.value.clone()
    };
    if property.is_empty() || target_id.is_empty() {
        return None;
    }

    let property_label = row
        .get("propLabel")
        .map(|t| t.value.clone())
        .unwrap_or_else(|| property.clone());
    let target_label = row
        .get("valueLabel")
        .map(|t| t.value.clone())
        .unwrap_or_else(|| target_id.clone());

    Some(RelationEdge {
        property,
        property_label,
        target_id,
        target_label,
    })
}
