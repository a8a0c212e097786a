//! Entity resolver: free-text query → [`EntityReference`]
//!
//! 1. Encyclopedia full-text search; the top hit wins.
//! 2. Page properties of that hit give the knowledge-graph id and the
//!    disambiguation marker.
//!
//! A failed property lookup does not fail the resolution. The title is
//! still good for text, images and coordinates, so the reference is
//! returned untracked together with the failure.

use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ResolveError;
use crate::sources::encyclopedia::EncyclopediaSource;
use crate::sources::knowledge_graph::KnowledgeGraphSource;
use crate::sources::with_deadline;
use crate::types::{EntityReference, SoftFailure, SourceConfidence};

/// Resolved entity plus the soft failure that degraded it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub entity: EntityReference,
    /// Why the knowledge-graph link is missing, when it is missing because of a failure
    pub notice: Option<SoftFailure>,
}

/// Free text → canonical entity
#[derive(Clone)]
pub struct EntityResolver {
    encyclopedia: EncyclopediaSource,
    label_fallback: Option<KnowledgeGraphSource>,
    call_timeout: Duration,
}

impl EntityResolver {
    pub fn new(encyclopedia: EncyclopediaSource, call_timeout: Duration) -> Self {
        Self {
            encyclopedia,
            label_fallback: None,
            call_timeout,
        }
    }

    /// When search finds nothing, look the query up as an English label
    /// (case-insensitive) in the knowledge graph
    pub fn with_label_fallback(mut self, knowledge_graph: KnowledgeGraphSource) -> Self {
        self.label_fallback = Some(knowledge_graph);
        self
    }

    /// Resolve `query`; `Ok(None)` when nothing matches
    pub async fn resolve(&self, query: &str) -> Result<Option<Resolution>, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ResolveError::InvalidInput("query is empty".to_string()));
        }

        let candidates = with_deadline(self.call_timeout, self.encyclopedia.search(query)).await?;
        let Some(top) = candidates.first() else {
            debug!(query = %query, "No search candidates");
            return Ok(self.resolve_by_label(query).await);
        };

        let props = with_deadline(self.call_timeout, self.encyclopedia.page_props(top)).await;
        let resolution = match props {
            Ok(Some(props)) => {
                let confident = !props.disambiguation
                    && (top.to_lowercase() == query.to_lowercase() || candidates.len() == 1);
                let confidence = if confident {
                    SourceConfidence::Exact
                } else {
                    SourceConfidence::Ambiguous
                };
                Resolution {
                    entity: EntityReference::new(props.title, props.wikibase_item, confidence),
                    notice: None,
                }
            }
            Ok(None) => Resolution {
                entity: EntityReference::untracked(top.as_str()),
                notice: None,
            },
            Err(e) => {
                warn!(title = %top, error = %e, "Page properties unavailable, continuing untracked");
                Resolution {
                    entity: EntityReference::untracked(top.as_str()),
                    notice: Some(e.into()),
                }
            }
        };

        debug!(
            query = %query,
            title = %resolution.entity.display_title(),
            id = ?resolution.entity.knowledge_graph_id(),
            confidence = ?resolution.entity.source_confidence(),
            "Entity resolved"
        );
        Ok(Some(resolution))
    }

    async fn resolve_by_label(&self, query: &str) -> Option<Resolution> {
        let knowledge_graph = self.label_fallback.as_ref()?;
        match with_deadline(self.call_timeout, knowledge_graph.find_by_label(query)).await {
            Ok(Some(found)) => Some(Resolution {
                entity: EntityReference::new(found.label, Some(found.id), SourceConfidence::Ambiguous),
                notice: None,
            }),
            Ok(None) => None,
            Err(e) => {
                warn!(query = %query, error = %e, "Label lookup failed");
                None
            }
        }
    }
}
