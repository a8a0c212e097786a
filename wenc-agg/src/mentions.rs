//! Geographic mentions: pages linked from the article that have a
//! coordinate location
//!
//! Three bounded calls per topic: the article's links, their knowledge-graph
//! ids (batched), and one `P625` query over all ids. Links whose titles look
//! like places are checked first.

use std::time::Duration;
use tracing::debug;

use crate::sources::encyclopedia::EncyclopediaSource;
use crate::sources::knowledge_graph::KnowledgeGraphSource;
use crate::sources::{with_deadline, SourceError};
use crate::types::GeoMention;

/// Title words that suggest a linked page is a place
const PLACE_WORDS: &[&str] = &[
    "city", "town", "river", "mount", "island", "country", "state", "province",
];

#[derive(Clone)]
pub struct GeoMentionFetcher {
    encyclopedia: EncyclopediaSource,
    knowledge_graph: KnowledgeGraphSource,
    max_mentions: usize,
    call_timeout: Duration,
}

impl GeoMentionFetcher {
    pub fn new(
        encyclopedia: EncyclopediaSource,
        knowledge_graph: KnowledgeGraphSource,
        max_mentions: usize,
        call_timeout: Duration,
    ) -> Self {
        Self {
            encyclopedia,
            knowledge_graph,
            max_mentions,
            call_timeout,
        }
    }

    /// Located pages linked from `title`, in candidate order
    ///
    /// `Ok(None)` when no candidate has coordinates. Each call runs under the
    /// per-call timeout; the first failure ends the lookup.
    pub async fn fetch(&self, title: &str) -> Result<Option<Vec<GeoMention>>, SourceError> {
        let links = with_deadline(self.call_timeout, self.encyclopedia.links(title)).await?;
        let candidates = place_candidates(links, title, self.max_mentions);
        if candidates.is_empty() {
            return Ok(None);
        }

        let ids = with_deadline(self.call_timeout, self.encyclopedia.wikibase_items(&candidates)).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let qids: Vec<String> = ids.iter().map(|(_, id)| id.clone()).collect();
        let points = with_deadline(self.call_timeout, self.knowledge_graph.coordinates_of(&qids)).await?;

        let mentions: Vec<GeoMention> = ids
            .into_iter()
            .filter_map(|(title, knowledge_graph_id)| {
                let coordinates = *points.get(&knowledge_graph_id)?;
                Some(GeoMention {
                    title,
                    knowledge_graph_id,
                    coordinates,
                })
            })
            .collect();
        debug!(
            title = %title,
            candidates = candidates.len(),
            located = mentions.len(),
            "Geographic mentions collected"
        );
        Ok((!mentions.is_empty()).then_some(mentions))
    }
}

/// Up to `max` distinct link titles other than `own_title`, place-like
/// titles first, otherwise in link order
pub fn place_candidates(links: Vec<String>, own_title: &str, max: usize) -> Vec<String> {
    let mut distinct: Vec<String> = Vec::with_capacity(links.len());
    for link in links {
        if link != own_title && !distinct.contains(&link) {
            distinct.push(link);
        }
    }
    let (mut places, others): (Vec<String>, Vec<String>) =
        distinct.into_iter().partition(|t| looks_like_place(t));
    places.extend(others);
    places.truncate(max);
    places
}

fn looks_like_place(title: &str) -> bool {
    let lower = title.to_lowercase();
    PLACE_WORDS.iter().any(|word| lower.contains(word))
}
