//! Relationship fetcher: knowledge-graph id → [`RelationSet`]
//!
//! One bounded query per entity. Upstream trouble never escapes as an error:
//! the caller gets an empty set and the failure, and renders what it has.
//!
//! The relationship graph uses a second, separately capped query that also
//! follows incoming edges ([`RelationFetcher::neighbourhood`]). It never
//! changes the record's [`RelationSet`].

use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::RelationError;
use crate::sources::knowledge_graph::{is_entity_id, KnowledgeGraphSource};
use crate::sources::with_deadline;
use crate::types::{NeighbourEdge, RelationSet, SoftFailure};

/// Neighbourhood rows requested unless configured otherwise
const DEFAULT_GRAPH_EDGES: usize = 80;

/// Edges of one entity, plus the soft failure when they could not be fetched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationsOutcome {
    pub edges: RelationSet,
    pub failure: Option<SoftFailure>,
}

/// Incoming and outgoing neighbours, plus the soft failure when they could
/// not be fetched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbourhood {
    pub edges: Vec<NeighbourEdge>,
    pub failure: Option<SoftFailure>,
}

/// Fetches the direct-property neighbourhood of an entity
#[derive(Clone)]
pub struct RelationFetcher {
    source: KnowledgeGraphSource,
    max_relations: usize,
    max_graph_edges: usize,
    call_timeout: Duration,
}

impl RelationFetcher {
    pub fn new(source: KnowledgeGraphSource, max_relations: usize, call_timeout: Duration) -> Self {
        Self {
            source,
            max_relations,
            max_graph_edges: DEFAULT_GRAPH_EDGES,
            call_timeout,
        }
    }

    /// Cap the relationship-graph neighbourhood at `max` edges
    pub fn with_graph_edges(mut self, max: usize) -> Self {
        self.max_graph_edges = max;
        self
    }

    /// Deduplicated edges of `id`, never more than `max_relations`
    ///
    /// An id that is not `Q`/`P`/`L` followed by digits is rejected before
    /// it can reach the query text.
    pub async fn fetch(&self, id: &str) -> Result<RelationsOutcome, RelationError> {
        if !is_entity_id(id) {
            return Err(RelationError::InvalidInput(id.to_string()));
        }

        let call = self.source.direct_relations(id, self.max_relations);
        match with_deadline(self.call_timeout, call).await {
            Ok(raw) => {
                let raw_count = raw.len();
                let edges = RelationSet::from_edges_capped(raw, self.max_relations);
                debug!(id = %id, raw = raw_count, kept = edges.len(), "Relations collected");
                Ok(RelationsOutcome {
                    edges,
                    failure: None,
                })
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Relations unavailable");
                Ok(RelationsOutcome {
                    edges: RelationSet::new(),
                    failure: Some(e.into()),
                })
            }
        }
    }

    /// Incoming and outgoing entity neighbours of `id`, deduplicated by
    /// `(direction, property, other_id)`, never more than the graph cap
    pub async fn neighbourhood(&self, id: &str) -> Result<Neighbourhood, RelationError> {
        if !is_entity_id(id) {
            return Err(RelationError::InvalidInput(id.to_string()));
        }

        let call = self.source.neighbourhood(id, self.max_graph_edges);
        match with_deadline(self.call_timeout, call).await {
            Ok(raw) => {
                let mut seen = HashSet::new();
                let edges: Vec<NeighbourEdge> = raw
                    .into_iter()
                    .filter(|e| seen.insert((e.direction, e.property.clone(), e.other_id.clone())))
                    .take(self.max_graph_edges)
                    .collect();
                debug!(id = %id, kept = edges.len(), "Neighbourhood collected");
                Ok(Neighbourhood {
                    edges,
                    failure: None,
                })
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Neighbourhood unavailable");
                Ok(Neighbourhood {
                    edges: Vec::new(),
                    failure: Some(e.into()),
                })
            }
        }
    }
}
